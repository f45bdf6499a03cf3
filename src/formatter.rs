//! The formatter (spec §6.3): stringifies a compiled [`OutputArena`] tree
//! into the final CSS text, in one of three styles. Out of the evaluator's
//! core scope per spec §1 ("external collaborator"), but the crate still
//! ships a minimal one so `Compiler::compile` (§6.1) is actually runnable
//! end to end, the way `f90d130d_dellyoung-less-oxide`'s `CompileOptions`
//! pairs a parser with a serializer rather than stopping at an AST.
//!
//! `Rule` output blocks nest lexically under their declaring parent in the
//! tree (so mixin/selector scoping can walk it), but render as *sibling*
//! top-level CSS rules once `&` has already expanded their selectors —
//! only `Media`/`Directive` blocks actually wrap their children in braces
//! in the emitted text.

use crate::output::{OutputArena, OutputBlock, OutputBlockType, OutputId, OutputLine};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatterStyle {
    /// Single line per rule, no optional whitespace, hex colors shortened.
    Compressed,
    /// One selector and one declaration per line, 2-space indent.
    Classic,
    /// less.js's own default layout: same as `Classic` but blank lines
    /// between adjacent top-level rules (less.js's `toCSS()` default).
    LessJs,
}

impl Default for FormatterStyle {
    fn default() -> Self {
        FormatterStyle::LessJs
    }
}

impl std::str::FromStr for FormatterStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compressed" => Ok(FormatterStyle::Compressed),
            "classic" => Ok(FormatterStyle::Classic),
            "lessjs" => Ok(FormatterStyle::LessJs),
            other => Err(format!("unknown formatter style {other:?}")),
        }
    }
}

/// Consumed interface (spec §6.3): `property`/`block` plus the two fields
/// callers (here, just this crate's own `Value::stringify_styled`) read to
/// adapt their own rendering to the chosen style.
#[derive(Debug, Clone)]
pub struct Formatter {
    pub style: FormatterStyle,
    pub selector_separator: String,
    pub compress_colors: bool,
}

impl Formatter {
    #[must_use]
    pub fn new(style: FormatterStyle) -> Self {
        let (selector_separator, compress_colors) = match style {
            FormatterStyle::Compressed => (",".to_string(), true),
            FormatterStyle::Classic | FormatterStyle::LessJs => (",\n".to_string(), false),
        };
        Self { style, selector_separator, compress_colors }
    }

    /// `property(name, value) -> line_string` (spec §6.3).
    #[must_use]
    pub fn property(&self, name: &str, value: &Value) -> String {
        let rendered = value.stringify_styled(self.compress_colors);
        match self.style {
            FormatterStyle::Compressed => format!("{name}:{rendered}"),
            FormatterStyle::Classic | FormatterStyle::LessJs => format!("{name}: {rendered};"),
        }
    }

    /// `block(output_block) -> css` (spec §6.3): renders the whole output
    /// tree rooted at `root` (normally the `Root` block returned by
    /// `Evaluator::compile_root`).
    #[must_use]
    pub fn format(&self, arena: &OutputArena, root: OutputId) -> String {
        let mut out = String::new();
        self.write_block(arena, root, 0, &mut out);
        if self.style != FormatterStyle::Compressed {
            while out.ends_with('\n') {
                out.pop();
            }
            out.push('\n');
        }
        out
    }

    fn indent(&self, depth: usize) -> String {
        if self.style == FormatterStyle::Compressed { String::new() } else { "  ".repeat(depth) }
    }

    fn write_block(&self, arena: &OutputArena, id: OutputId, depth: usize, out: &mut String) {
        let block = arena.get(id);
        match block.block_type {
            OutputBlockType::Root => {
                for &child in &block.children {
                    self.write_block(arena, child, depth, out);
                }
            }
            OutputBlockType::Rule => {
                if !block.selectors.is_empty() || !block.lines.is_empty() {
                    self.write_rule(block, depth, out);
                }
                // `&`-expansion already flattened nested selectors to their
                // own `Rule` blocks; they render as siblings, not nested.
                for &child in &block.children {
                    self.write_block(arena, child, depth, out);
                }
            }
            OutputBlockType::Media => {
                let indent = self.indent(depth);
                let sep = if self.style == FormatterStyle::Compressed { " and " } else { " and " };
                out.push_str(&indent);
                out.push_str("@media ");
                out.push_str(&block.queries.join(sep));
                self.open_brace(out);
                for &child in &block.children {
                    self.write_block(arena, child, depth + 1, out);
                }
                self.close_brace(&indent, out);
            }
            OutputBlockType::Directive => {
                let indent = self.indent(depth);
                out.push_str(&indent);
                // `block.directive` already carries its leading `@` (the
                // parser captures it as part of the at-rule head text).
                out.push_str(block.directive.as_deref().unwrap_or(""));
                if block.children.is_empty() && block.lines.is_empty() {
                    out.push_str(";\n");
                    return;
                }
                self.open_brace(out);
                for line in &block.lines {
                    self.write_line(line, depth + 1, out);
                }
                for &child in &block.children {
                    self.write_block(arena, child, depth + 1, out);
                }
                self.close_brace(&indent, out);
            }
        }
    }

    fn write_rule(&self, block: &OutputBlock, depth: usize, out: &mut String) {
        let indent = self.indent(depth);
        if !block.selectors.is_empty() {
            out.push_str(&indent);
            let joined = block.selectors.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(&self.selector_separator);
            out.push_str(&joined);
        }
        self.open_brace(out);
        for line in &block.lines {
            self.write_line(line, depth + 1, out);
        }
        self.close_brace(&indent, out);
        if self.style == FormatterStyle::LessJs {
            out.push('\n');
        }
    }

    fn write_line(&self, line: &OutputLine, depth: usize, out: &mut String) {
        let indent = self.indent(depth);
        match line {
            OutputLine::Declaration(name, value) => {
                out.push_str(&indent);
                out.push_str(&self.property(name, value));
                if self.style == FormatterStyle::Compressed {
                    out.push(';');
                } else {
                    out.push('\n');
                }
            }
            OutputLine::Raw(text) => {
                out.push_str(&indent);
                out.push_str(text);
                if self.style != FormatterStyle::Compressed {
                    out.push('\n');
                }
            }
            OutputLine::Comment(text) => {
                out.push_str(&indent);
                out.push_str(text);
                if self.style != FormatterStyle::Compressed {
                    out.push('\n');
                }
            }
        }
    }

    fn open_brace(&self, out: &mut String) {
        if self.style == FormatterStyle::Compressed {
            out.push('{');
        } else {
            out.push_str(" {\n");
        }
    }

    fn close_brace(&self, indent: &str, out: &mut String) {
        if self.style == FormatterStyle::Compressed {
            if out.ends_with(';') {
                out.pop();
            }
            out.push('}');
        } else {
            out.push_str(indent);
            out.push_str("}\n");
        }
    }
}
