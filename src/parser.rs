//! A focused recursive-descent LESS parser (spec §6.2): produces
//! `tree::Block`/`tree::Prop` trees directly into a shared [`BlockArena`].
//! Grounded on `f90d130d_dellyoung-less-oxide` (the only parser in the pack)
//! for the overall parse→evaluate split, but written from scratch against
//! this crate's tree shapes rather than ported — full CSS lexical fidelity
//! is an explicit non-goal, so unrecognized syntax degrades to a verbatim
//! [`Prop::Raw`] rather than a parse error.

use indexmap::IndexMap;

use crate::error::{ErrorKind, EvalError, EvalResult};
use crate::tree::{ArgSpec, BlockArena, BlockId, BlockType, GuardTerm, Prop};
use crate::value::{Op, StringPart, UnaryOp, Value, VariableName};

pub struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Parses the whole source into a freshly allocated root block of
    /// `arena`, tagging every block it creates with `source_id`.
    pub fn parse_into(&mut self, arena: &mut BlockArena, source_id: u32) -> EvalResult<BlockId> {
        let root = arena.alloc_root();
        arena.get_mut(root).source_id = source_id;
        self.parse_props(arena, root)?;
        Ok(root)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn skip_string(&mut self, quote: char) {
        self.pos += quote.len_utf8();
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\\' {
                if let Some(n) = self.peek() {
                    self.pos += n.len_utf8();
                }
                continue;
            }
            if c == quote {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while !self.eof() && !self.starts_with("*/") {
            self.pos += self.peek().map_or(1, char::len_utf8);
        }
        if self.starts_with("*/") {
            self.pos += 2;
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Scans forward tracking `()`/`[]` nesting, treating string literals
    /// and comments as opaque spans, until a character in `stops` is seen
    /// at depth zero (or EOF). Returns the scanned text (stop char
    /// excluded, not consumed) and which stop was hit.
    fn scan_until(&mut self, stops: &[char]) -> (String, Option<char>) {
        let start = self.pos;
        let mut depth = 0i32;
        loop {
            let Some(c) = self.peek() else {
                return (self.text[start..self.pos].to_string(), None);
            };
            if depth == 0 && stops.contains(&c) {
                return (self.text[start..self.pos].to_string(), Some(c));
            }
            match c {
                '(' | '[' => {
                    depth += 1;
                    self.pos += c.len_utf8();
                }
                ')' | ']' => {
                    depth -= 1;
                    self.pos += c.len_utf8();
                }
                '\'' | '"' => self.skip_string(c),
                '/' if self.peek2() == Some('*') => self.skip_block_comment(),
                '/' if self.peek2() == Some('/') => self.skip_line_comment(),
                _ => self.pos += c.len_utf8(),
            }
        }
    }

    fn expect_close_brace(&mut self) -> EvalResult<()> {
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            Ok(())
        } else {
            Err(EvalError::new(ErrorKind::Parse, "expected closing }"))
        }
    }

    fn push_prop(arena: &mut BlockArena, block: BlockId, prop: Prop, offset: usize) {
        let b = arena.get_mut(block);
        b.props.push(prop);
        b.prop_offsets.push(offset);
    }

    fn parse_props(&mut self, arena: &mut BlockArena, block: BlockId) -> EvalResult<()> {
        loop {
            self.skip_ws();
            loop {
                if self.starts_with("/*") {
                    let start = self.pos;
                    self.skip_block_comment();
                    let comment = self.text[start..self.pos].to_string();
                    Self::push_prop(arena, block, Prop::Comment(comment), start);
                    self.skip_ws();
                    continue;
                }
                if self.starts_with("//") {
                    self.skip_line_comment();
                    self.skip_ws();
                    continue;
                }
                break;
            }
            if self.eof() || self.peek() == Some('}') {
                break;
            }
            self.parse_statement(arena, block)?;
        }
        Ok(())
    }

    fn parse_statement(&mut self, arena: &mut BlockArena, block: BlockId) -> EvalResult<()> {
        let start = self.pos;
        if self.peek() == Some('@') {
            return self.parse_at_rule(arena, block, start);
        }
        self.parse_selector_or_decl(arena, block, start)
    }

    fn parse_at_rule(&mut self, arena: &mut BlockArena, block: BlockId, start: usize) -> EvalResult<()> {
        if self.starts_with("@import") {
            self.pos += "@import".len();
            let (body, stop) = self.scan_until(&[';']);
            if stop == Some(';') {
                self.pos += 1;
            }
            Self::push_prop(arena, block, Prop::Import(extract_import_url(&body)), start);
            return Ok(());
        }

        if self.starts_with("@media") {
            self.pos += "@media".len();
            let (query_text, stop) = self.scan_until(&['{']);
            if stop != Some('{') {
                return Err(EvalError::new(ErrorKind::Parse, "expected { after @media"));
            }
            self.pos += 1;
            let queries = split_top_level(&query_text, ',').into_iter().map(|q| parse_tag_text(q.trim())).collect();
            let source_id = arena.get(block).source_id;
            let child = arena.alloc(BlockType::Media, block);
            arena.get_mut(child).source_id = source_id;
            arena.get_mut(child).queries = queries;
            self.parse_props(arena, child)?;
            self.expect_close_brace()?;
            Self::push_prop(arena, block, Prop::Block(child), start);
            return Ok(());
        }

        let (head, stop) = self.scan_until(&[':', ';', '{']);
        match stop {
            Some(':') => {
                let name = head.trim().to_string();
                self.pos += 1;
                let (value_text, vstop) = self.scan_until(&[';', '}']);
                if vstop == Some(';') {
                    self.pos += 1;
                }
                Self::push_prop(arena, block, Prop::Assign(name, parse_value(value_text.trim())), start);
                Ok(())
            }
            Some('{') => {
                self.pos += 1;
                let source_id = arena.get(block).source_id;
                let child = arena.alloc(BlockType::Directive, block);
                arena.get_mut(child).source_id = source_id;
                arena.get_mut(child).name = Some(head.trim().to_string());
                self.parse_props(arena, child)?;
                self.expect_close_brace()?;
                Self::push_prop(arena, block, Prop::Block(child), start);
                Ok(())
            }
            Some(';') | None => {
                if stop.is_some() {
                    self.pos += 1;
                }
                let trimmed = head.trim();
                if trimmed.is_empty() {
                    return Ok(());
                }
                let (name, rest) = split_first_word(trimmed);
                Self::push_prop(arena, block, Prop::Directive(name.to_string(), parse_value(rest.trim())), start);
                Ok(())
            }
            _ => unreachable!(),
        }
    }

    fn parse_selector_or_decl(&mut self, arena: &mut BlockArena, block: BlockId, start: usize) -> EvalResult<()> {
        let (head, stop) = self.scan_until(&[';', '{']);
        match stop {
            Some('{') => {
                self.pos += 1;
                self.parse_rule_or_mixin_def(arena, block, &head, start)
            }
            Some(';') => {
                self.pos += 1;
                self.parse_decl_or_call(arena, block, &head, start)
            }
            _ => {
                let trimmed = head.trim();
                if !trimmed.is_empty() {
                    Self::push_prop(arena, block, Prop::Raw(trimmed.to_string()), start);
                }
                Ok(())
            }
        }
    }

    fn parse_rule_or_mixin_def(&mut self, arena: &mut BlockArena, block: BlockId, head: &str, start: usize) -> EvalResult<()> {
        let trimmed = head.trim();
        let source_id = arena.get(block).source_id;

        if let Some((name, args_text, guard_text)) = split_mixin_def_head(trimmed) {
            let child = arena.alloc(BlockType::Rule, block);
            arena.get_mut(child).source_id = source_id;
            arena.get_mut(child).tags = vec![parse_tag_text(&name)];
            let (args, is_vararg) = parse_arg_specs(&args_text);
            // Reaching this branch at all means the definition used explicit
            // parens (`split_mixin_def_head` only matches that syntax), so
            // `args` is always `Some` here even when the list is empty —
            // that's what tells `compiler.rs`'s `is_mixin_def` check apart
            // from a plain nested rule with no parens at all, which must
            // still render its own selector as CSS.
            arena.get_mut(child).args = Some(args);
            arena.get_mut(child).is_vararg = is_vararg;
            if let Some(guard_src) = guard_text {
                arena.get_mut(child).guards = Some(parse_guards(&guard_src));
            }
            arena.get_mut(block).children.entry(name).or_default().push(child);
            self.parse_props(arena, child)?;
            self.expect_close_brace()?;
            Self::push_prop(arena, block, Prop::Block(child), start);
            return Ok(());
        }

        let selectors: Vec<String> = split_top_level(trimmed, ',').into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        let child = arena.alloc(BlockType::Rule, block);
        arena.get_mut(child).source_id = source_id;
        arena.get_mut(child).tags = selectors.iter().map(|s| parse_tag_text(s)).collect();
        for sel in &selectors {
            arena.get_mut(block).children.entry(sel.clone()).or_default().push(child);
        }
        self.parse_props(arena, child)?;
        self.expect_close_brace()?;
        Self::push_prop(arena, block, Prop::Block(child), start);
        Ok(())
    }

    fn parse_decl_or_call(&mut self, arena: &mut BlockArena, block: BlockId, head: &str, start: usize) -> EvalResult<()> {
        let trimmed = head.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if let Some((path, is_ruleset, args_text, suffix)) = split_call_head(trimmed) {
            let (args, kwargs) = parse_call_args(&args_text);
            Self::push_prop(arena, block, Prop::Call { path, is_ruleset, args, kwargs, suffix }, start);
            return Ok(());
        }

        if let Some(colon) = find_top_level_char(trimmed, ':') {
            let name = trimmed[..colon].trim().to_string();
            let value = parse_value(trimmed[colon + 1..].trim());
            Self::push_prop(arena, block, Prop::Assign(name, value), start);
            return Ok(());
        }

        Self::push_prop(arena, block, Prop::Raw(format!("{trimmed};")), start);
        Ok(())
    }
}

fn extract_import_url(body: &str) -> String {
    let trimmed = body.trim();
    if let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return inner.to_string();
    }
    if let Some(inner) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return inner.to_string();
    }
    trimmed
        .strip_prefix("url(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn split_first_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

/// Splits `s` on `sep` wherever it appears outside `()`/`[]` nesting and
/// outside quoted strings.
fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let mut in_string: Option<char> = None;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = in_string {
            if c == '\\' {
                chars.next();
                continue;
            }
            if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_string = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ if c == sep && depth == 0 => {
                out.push(s[start..i].to_string());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(s[start..].to_string());
    out
}

fn find_top_level_char(s: &str, target: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if let Some(q) = in_string {
            if c == '\\' {
                chars.next();
                continue;
            }
            if c == q {
                in_string = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => in_string = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Returns the byte offset (relative to `s`, which must start with `(`) of
/// the matching closing paren.
fn find_matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut chars = s.char_indices();
    chars.next()?;
    depth += 1;
    for (i, c) in chars {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level_word(s: &str, word: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let word_chars: Vec<char> = word.chars().collect();
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    let mut in_string: Option<char> = None;
    let mut i = 0usize;
    while i < chars.len() {
        let (byte_i, c) = chars[i];
        if let Some(q) = in_string {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                in_string = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                in_string = Some(c);
                i += 1;
            }
            '(' | '[' => {
                depth += 1;
                i += 1;
            }
            ')' | ']' => {
                depth -= 1;
                i += 1;
            }
            _ => {
                let matches_word = depth == 0
                    && i + word_chars.len() <= chars.len()
                    && (0..word_chars.len()).all(|k| chars[i + k].1.eq_ignore_ascii_case(&word_chars[k]))
                    && (i == 0 || !chars[i - 1].1.is_alphanumeric())
                    && (i + word_chars.len() == chars.len() || !chars[i + word_chars.len()].1.is_alphanumeric());
                if matches_word {
                    out.push(s[start..byte_i].to_string());
                    i += word_chars.len();
                    start = chars.get(i).map_or(s.len(), |&(b, _)| b);
                    continue;
                }
                i += 1;
            }
        }
    }
    out.push(s[start..].to_string());
    out
}

/// Recognizes a mixin/ruleset definition head: a single `.name`/`#name`
/// selector directly followed by `(args)` and nothing after but an
/// optional `when (guard)` clause.
fn split_mixin_def_head(s: &str) -> Option<(String, String, Option<String>)> {
    if !(s.starts_with('.') || s.starts_with('#')) {
        return None;
    }
    let paren_pos = s.find('(')?;
    let name = &s[..paren_pos];
    if name.contains(',') || name.contains(char::is_whitespace) {
        return None;
    }
    let rest = &s[paren_pos..];
    let close_rel = find_matching_paren(rest)?;
    let args_text = rest[1..close_rel].to_string();
    let after = s[paren_pos + close_rel + 1..].trim();
    let guard = if let Some(g) = after.strip_prefix("when") {
        Some(g.trim().to_string())
    } else if after.is_empty() {
        None
    } else {
        return None;
    };
    Some((name.to_string(), args_text, guard))
}

fn parse_arg_specs(text: &str) -> (Vec<ArgSpec>, bool) {
    let mut specs = Vec::new();
    let mut is_vararg = false;
    for item in split_top_level(text, ',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if item == "..." {
            is_vararg = true;
            continue;
        }
        if let Some(name) = item.strip_suffix("...") {
            specs.push(ArgSpec::Rest(name.trim().to_string()));
            is_vararg = true;
            continue;
        }
        if item.starts_with('@') {
            if let Some(colon) = find_top_level_char(item, ':') {
                let name = item[..colon].trim().to_string();
                let default = parse_value(item[colon + 1..].trim());
                specs.push(ArgSpec::Arg(name, Some(default)));
            } else {
                specs.push(ArgSpec::Arg(item.to_string(), None));
            }
            continue;
        }
        specs.push(ArgSpec::Lit(parse_value(item)));
    }
    (specs, is_vararg)
}

fn parse_guards(text: &str) -> Vec<Vec<GuardTerm>> {
    split_top_level(text, ',')
        .into_iter()
        .map(|group| split_top_level_word(&group, "and").into_iter().map(|term| parse_guard_term(term.trim())).collect())
        .collect()
}

fn parse_guard_term(term: &str) -> GuardTerm {
    let (negate, rest) = if let Some(r) = term.strip_prefix("not") {
        if r.is_empty() || r.starts_with(char::is_whitespace) || r.starts_with('(') {
            (true, r.trim_start())
        } else {
            (false, term)
        }
    } else {
        (false, term)
    };
    let inner = rest.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(rest);
    GuardTerm { expr: parse_value(inner.trim()), negate }
}

/// Splits a mixin/ruleset call head (e.g. `.border-radius(4px) !important`
/// or `$reset()`) into its path, ruleset flag, raw argument text, and an
/// optional trailing suffix keyword. Returns `None` for anything that isn't
/// shaped like a call (most importantly, plain property declarations).
fn split_call_head(s: &str) -> Option<(Vec<String>, bool, String, Option<String>)> {
    let (s, is_ruleset) = match s.strip_prefix('$') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    if !(s.starts_with('.') || s.starts_with('#')) {
        return None;
    }

    let (body, suffix) = match s.rfind('!') {
        Some(i) => {
            let tail = s[i + 1..].trim();
            if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                (s[..i].trim_end(), Some(tail.to_lowercase()))
            } else {
                (s, None)
            }
        }
        None => (s, None),
    };

    let paren_pos = body.find('(');
    let (name_part, args_text) = match paren_pos {
        Some(p) => {
            let rest = &body[p..];
            let close = find_matching_paren(rest)?;
            (&body[..p], body[p + 1..p + close].to_string())
        }
        None => (body, String::new()),
    };

    let name_trimmed = name_part.trim();
    if name_trimmed.is_empty() || name_trimmed.contains(':') {
        return None;
    }

    let path: Vec<String> = split_top_level(name_trimmed, '>').into_iter().map(|seg| seg.trim().to_string()).filter(|seg| !seg.is_empty()).collect();
    if path.is_empty() {
        return None;
    }
    Some((path, is_ruleset, args_text, suffix))
}

fn parse_call_args(text: &str) -> (Vec<Value>, IndexMap<String, Value>) {
    let mut args = Vec::new();
    let mut kwargs = IndexMap::new();
    for item in split_top_level(text, ',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if let Some(colon) = find_top_level_char(item, ':') {
            let name = item[..colon].trim().trim_start_matches('@').to_string();
            kwargs.insert(name, parse_value(item[colon + 1..].trim()));
        } else {
            args.push(parse_value(item));
        }
    }
    (args, kwargs)
}

fn is_bare_variable_ref(s: &str) -> bool {
    let mut chars = s.chars();
    if chars.next() != Some('@') {
        return false;
    }
    let Some(c0) = chars.next() else { return false };
    if !(c0.is_alphabetic() || c0 == '_' || c0 == '-') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Parses selector/media-query text, which is emitted mostly verbatim but
/// may contain `@{var}` interpolation or (as its whole content) a bare
/// `@var` reference (the `@media @tablet { }` pattern).
fn parse_tag_text(s: &str) -> Value {
    if is_bare_variable_ref(s) {
        return Value::Variable(VariableName::Named(s.to_string()));
    }
    if !s.contains("@{") {
        return Value::Keyword(s.to_string());
    }
    let mut parts = Vec::new();
    let mut rest = s;
    loop {
        match rest.find("@{") {
            None => {
                parts.push(StringPart::Literal(rest.to_string()));
                break;
            }
            Some(idx) => {
                if idx > 0 {
                    parts.push(StringPart::Literal(rest[..idx].to_string()));
                }
                let after = &rest[idx + 2..];
                let Some(end) = after.find('}') else {
                    parts.push(StringPart::Literal(rest[idx..].to_string()));
                    break;
                };
                parts.push(StringPart::Inner(Value::Interpolate(Box::new(Value::Keyword(after[..end].to_string())), true)));
                rest = &after[end + 1..];
            }
        }
    }
    Value::Str(None, parts)
}

/// Parses a property/argument/default value (spec §3.1's grammar): a
/// space-separated list of comparison-or-lower expressions, each built from
/// the usual `+ - * /` precedence climb over atoms (numbers, colors,
/// strings, variables, function calls, parens).
fn parse_value(text: &str) -> Value {
    let mut p = ValueParser { s: text, pos: 0 };
    p.skip_ws();
    if p.eof() {
        return Value::Keyword(String::new());
    }
    p.parse_space_list()
}

struct ValueParser<'s> {
    s: &'s str,
    pos: usize,
}

impl<'s> ValueParser<'s> {
    fn rest(&self) -> &'s str {
        &self.s[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.s.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, t: &str) -> bool {
        self.rest().starts_with(t)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn parse_space_list(&mut self) -> Value {
        let mut items = vec![self.parse_comparison()];
        loop {
            let save = self.pos;
            self.skip_ws();
            if self.eof() || self.peek() == Some(',') || self.pos == save {
                self.pos = save;
                break;
            }
            items.push(self.parse_comparison());
        }
        if items.len() == 1 {
            items.pop().unwrap()
        } else {
            Value::List(" ".to_string(), items)
        }
    }

    fn parse_comparison(&mut self) -> Value {
        let mut left = self.parse_additive();
        loop {
            self.skip_ws();
            let op = if self.starts_with(">=") {
                Some((Op::Ge, 2))
            } else if self.starts_with("=<") {
                Some((Op::Le, 2))
            } else if self.starts_with('>') {
                Some((Op::Gt, 1))
            } else if self.starts_with('<') {
                Some((Op::Lt, 1))
            } else if self.starts_with('=') {
                Some((Op::Eq, 1))
            } else {
                None
            };
            let Some((op, len)) = op else { break };
            self.pos += len;
            self.skip_ws();
            let right = self.parse_additive();
            left = Value::Expression(op, Box::new(left), Box::new(right), true, true);
        }
        left
    }

    fn parse_additive(&mut self) -> Value {
        let mut left = self.parse_term();
        loop {
            let before = self.pos;
            let ws_before = {
                let save = self.pos;
                self.skip_ws();
                self.pos != save
            };
            let op = match self.peek() {
                Some('+') => Some(Op::Add),
                Some('-') => Some(Op::Sub),
                _ => None,
            };
            let Some(op) = op else {
                self.pos = before;
                break;
            };
            self.pos += 1;
            let ws_after_save = self.pos;
            self.skip_ws();
            let ws_after = self.pos != ws_after_save;
            if op == Op::Sub && !ws_before && !ws_after {
                // No surrounding whitespace: a unary sign glued to the next
                // atom, not a binary operator — leave it for `parse_term`.
                self.pos = before;
                break;
            }
            let right = self.parse_term();
            left = Value::Expression(op, Box::new(left), Box::new(right), ws_before, ws_after);
        }
        left
    }

    fn parse_term(&mut self) -> Value {
        let mut left = self.parse_unary();
        loop {
            let before = self.pos;
            self.skip_ws();
            let op = match self.peek() {
                Some('*') => Some(Op::Mul),
                Some('/') => Some(Op::Div),
                Some('%') => Some(Op::Mod),
                _ => None,
            };
            let Some(op) = op else {
                self.pos = before;
                break;
            };
            self.pos += 1;
            self.skip_ws();
            let right = self.parse_unary();
            left = Value::Expression(op, Box::new(left), Box::new(right), true, true);
        }
        left
    }

    fn parse_unary(&mut self) -> Value {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Value::Unary(UnaryOp::Minus, Box::new(self.parse_unary()))
            }
            Some('+') => {
                self.pos += 1;
                Value::Unary(UnaryOp::Plus, Box::new(self.parse_unary()))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Value {
        self.skip_ws();
        match self.peek() {
            None => Value::Keyword(String::new()),
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_comparison();
                self.skip_ws();
                if self.peek() == Some(')') {
                    self.pos += 1;
                }
                inner
            }
            Some('"' | '\'') => self.parse_string(),
            Some('@') => self.parse_variable_or_interpolation(),
            Some('#') => self.parse_hash(),
            Some('~') => self.parse_escape(),
            Some(c) if c.is_ascii_digit() || (c == '.' && self.peek_digit_after_dot()) => self.parse_number(),
            _ => self.parse_ident_or_function(),
        }
    }

    fn peek_digit_after_dot(&self) -> bool {
        self.rest().chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    }

    fn parse_string(&mut self) -> Value {
        let quote = self.bump().unwrap();
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            match self.peek() {
                None => break,
                Some(c) if c == quote => {
                    self.pos += c.len_utf8();
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    if let Some(n) = self.bump() {
                        literal.push(n);
                    }
                }
                Some('@') if self.rest().starts_with("@{") => {
                    if !literal.is_empty() {
                        parts.push(StringPart::Literal(std::mem::take(&mut literal)));
                    }
                    self.pos += 2;
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c != '}') {
                        self.pos += 1;
                    }
                    let ident = self.s[start..self.pos].to_string();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                    }
                    parts.push(StringPart::Inner(Value::Interpolate(Box::new(Value::Keyword(ident)), true)));
                }
                Some(c) => {
                    literal.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(StringPart::Literal(literal));
        }
        Value::Str(Some(quote), parts)
    }

    fn parse_variable_or_interpolation(&mut self) -> Value {
        self.pos += 1;
        if self.peek() == Some('@') {
            self.pos += 1;
            let ident = self.read_ident();
            return Value::Variable(VariableName::Dynamic(Box::new(Value::Variable(VariableName::Named(format!("@{ident}"))))));
        }
        if self.peek() == Some('{') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(|c| c != '}') {
                self.pos += 1;
            }
            let ident = self.s[start..self.pos].to_string();
            if self.peek() == Some('}') {
                self.pos += 1;
            }
            return Value::Interpolate(Box::new(Value::Keyword(ident)), false);
        }
        let ident = self.read_ident();
        Value::Variable(VariableName::Named(format!("@{ident}")))
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.s[start..self.pos].to_string()
    }

    fn parse_hash(&mut self) -> Value {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c.is_ascii_hexdigit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.s[start..self.pos].to_string();
        if matches!(text.len() - 1, 3 | 4 | 6 | 8) {
            Value::RawColor(text)
        } else {
            Value::Keyword(text)
        }
    }

    fn parse_escape(&mut self) -> Value {
        self.pos += 1;
        self.skip_ws();
        match self.peek() {
            Some('"' | '\'') => Value::Escape(Box::new(self.parse_string())),
            Some('(') => {
                self.pos += 1;
                let inner = self.parse_comparison();
                self.skip_ws();
                if self.peek() == Some(')') {
                    self.pos += 1;
                }
                Value::Escape(Box::new(inner))
            }
            _ => Value::Escape(Box::new(self.parse_atom())),
        }
    }

    fn parse_number(&mut self) -> Value {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.rest()[1..].chars().next().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let n: f64 = self.s[start..self.pos].parse().unwrap_or(0.0);
        let unit_start = self.pos;
        if self.peek() == Some('%') {
            self.pos += 1;
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                self.pos += 1;
            }
        }
        Value::Number(n, self.s[unit_start..self.pos].to_string())
    }

    fn parse_ident_or_function(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let ident = self.s[start..self.pos].to_string();
        if ident.is_empty() {
            return match self.bump() {
                Some(c) => Value::Keyword(c.to_string()),
                None => Value::Keyword(String::new()),
            };
        }
        if self.peek() == Some('(') {
            self.pos += 1;
            let args_start = self.pos;
            let mut depth = 1i32;
            while let Some(c) = self.peek() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                self.pos += c.len_utf8();
            }
            let args_text = self.s[args_start..self.pos].to_string();
            if self.peek() == Some(')') {
                self.pos += 1;
            }
            let items: Vec<Value> = split_top_level(&args_text, ',')
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .map(|a| parse_value(&a))
                .collect();
            return Value::Function(ident, Box::new(Value::List(",".to_string(), items)));
        }
        Value::Keyword(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variable_and_declaration() {
        let mut arena = BlockArena::new();
        let mut parser = Parser::new(".magic { color: @color; width: @base - 200; }");
        let root = parser.parse_into(&mut arena, 0).unwrap();
        assert_eq!(arena.get(root).props.len(), 1);
        let Prop::Block(rule) = &arena.get(root).props[0] else { panic!("expected block") };
        assert_eq!(arena.get(*rule).tags, vec![Value::Keyword(".magic".to_string())]);
        assert_eq!(arena.get(*rule).props.len(), 2);
    }

    #[test]
    fn parses_mixin_definition_with_guard() {
        let mut arena = BlockArena::new();
        let mut parser = Parser::new(".flipped(@x) when (@x =< 10) { rule: value; }");
        let root = parser.parse_into(&mut arena, 0).unwrap();
        let Prop::Block(mixin) = &arena.get(root).props[0] else { panic!("expected block") };
        let block = arena.get(*mixin);
        assert!(block.args.is_some());
        assert!(block.guards.is_some());
        assert!(arena.get(root).children.contains_key(".flipped"));
    }

    #[test]
    fn parses_mixin_call_with_important_suffix() {
        let mut arena = BlockArena::new();
        let mut parser = Parser::new(".x { .rounded(4px) !important; }");
        let root = parser.parse_into(&mut arena, 0).unwrap();
        let Prop::Block(rule) = &arena.get(root).props[0] else { panic!("expected block") };
        let Prop::Call { path, suffix, .. } = &arena.get(*rule).props[0] else { panic!("expected call") };
        assert_eq!(path, &vec![".rounded".to_string()]);
        assert_eq!(suffix.as_deref(), Some("important"));
    }

    #[test]
    fn parses_nested_media_with_bare_variable_query() {
        let mut arena = BlockArena::new();
        let mut parser = Parser::new("@media @tablet { .a { color: red; } }");
        let root = parser.parse_into(&mut arena, 0).unwrap();
        let Prop::Block(media) = &arena.get(root).props[0] else { panic!("expected block") };
        assert_eq!(arena.get(*media).queries, vec![Value::Variable(VariableName::Named("@tablet".to_string()))]);
    }
}
