//! The compiled output tree: CSS rules ready for textual emission. Built by
//! the block compiler, consumed by the formatter.

use indexmap::IndexMap;

use crate::value::Value;

/// Stable arena index for an [`OutputBlock`], independent from the input
/// tree's `BlockId` (one input block can expand into several output blocks
/// under nested `&`/media multiplication, or zero if it's pure mixin
/// scaffolding never itself emitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBlockType {
    Root,
    Rule,
    Media,
    Directive,
}

/// One emitted line inside an output block, in the order it was produced.
/// Comments are tracked as their own variant (rather than pre-formatted
/// text) so deduplication can find and re-home them independently of the
/// declaration line they precede.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// Property name and its already-reduced value, kept apart (rather than
    /// pre-stringified) so the formatter can apply `compress_colors`/
    /// style-specific punctuation at serialization time (spec §6.3).
    Declaration(String, Value),
    Comment(String),
    Raw(String),
}

impl OutputLine {
    /// Dedup/display key: `"name: value"` (rendered uncompressed — dedup
    /// cares only about textual identity, not the formatter's final style)
    /// for a declaration, the literal text otherwise.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            OutputLine::Declaration(name, value) => format!("{name}: {}", value.stringify()),
            OutputLine::Comment(s) | OutputLine::Raw(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self, OutputLine::Comment(_))
    }
}

#[derive(Debug, Clone)]
pub struct OutputBlock {
    pub id: OutputId,
    pub block_type: OutputBlockType,
    pub selectors: Vec<String>,
    /// `@media (...)` query text, only meaningful for `Media` blocks.
    pub queries: Vec<String>,
    /// Directive text (`@name value`), only meaningful for `Directive`.
    pub directive: Option<String>,
    pub lines: Vec<OutputLine>,
    pub children: Vec<OutputId>,
    pub parent: Option<OutputId>,
}

impl OutputBlock {
    #[must_use]
    pub fn new(id: OutputId, block_type: OutputBlockType, parent: Option<OutputId>) -> Self {
        Self {
            id,
            block_type,
            selectors: Vec::new(),
            queries: Vec::new(),
            directive: None,
            lines: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

#[derive(Debug, Default)]
pub struct OutputArena {
    blocks: IndexMap<u32, OutputBlock>,
    next_id: u32,
}

impl OutputArena {
    #[must_use]
    pub fn new() -> Self {
        Self { blocks: IndexMap::new(), next_id: 0 }
    }

    pub fn alloc(&mut self, block_type: OutputBlockType, parent: Option<OutputId>) -> OutputId {
        let id = OutputId(self.next_id);
        self.next_id += 1;
        self.blocks.insert(id.0, OutputBlock::new(id, block_type, parent));
        id
    }

    #[must_use]
    pub fn get(&self, id: OutputId) -> &OutputBlock {
        &self.blocks[&id.0]
    }

    pub fn get_mut(&mut self, id: OutputId) -> &mut OutputBlock {
        self.blocks.get_mut(&id.0).expect("output block id always valid")
    }

    /// Appends `line` to `parent` verbatim, in compilation order. The
    /// deduplication pass (spec §4.5.4) runs separately, once a block's
    /// lines are all produced — see [`dedup_lines`].
    pub fn push_line(&mut self, parent: OutputId, line: OutputLine) {
        self.get_mut(parent).lines.push(line);
    }

    /// Collapses duplicate declaration lines in `id`'s line buffer in
    /// place. Comment lines are buffered as they're walked; the first time
    /// a non-comment line is seen it is kept and any buffered comments stay
    /// right where they are (immediately preceding it). On a *repeat*
    /// occurrence, the buffered comments are spliced in just before the
    /// originally kept occurrence instead, and the repeat itself is
    /// dropped. Comments trailing the last declaration are kept at the end.
    pub fn dedup_lines(&mut self, id: OutputId) {
        let block = self.get_mut(id);
        let mut result: Vec<OutputLine> = Vec::with_capacity(block.lines.len());
        let mut seen_at: IndexMap<String, usize> = IndexMap::new();
        let mut pending_comments: Vec<OutputLine> = Vec::new();

        for line in std::mem::take(&mut block.lines) {
            if line.is_comment() {
                pending_comments.push(line);
                continue;
            }
            if let Some(&pos) = seen_at.get(&line.text()) {
                // Spliced *before* the kept occurrence (spec §4.5.4), not
                // after it.
                let insert_at = pos;
                for (offset, comment) in pending_comments.drain(..).enumerate() {
                    result.insert(insert_at + offset, comment);
                    for v in seen_at.values_mut() {
                        if *v >= insert_at + offset {
                            *v += 1;
                        }
                    }
                }
            } else {
                result.extend(pending_comments.drain(..));
                seen_at.insert(line.text(), result.len());
                result.push(line);
            }
        }
        result.extend(pending_comments);
        block.lines = result;
    }

    #[must_use]
    pub fn ids(&self) -> Vec<OutputId> {
        self.blocks.values().map(|b| b.id).collect()
    }
}
