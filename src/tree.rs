//! The parsed input tree: blocks and props, arena-indexed so mixin/child
//! links and the temporary re-parenting a mixin call performs don't need
//! owned cycles.

use crate::value::Value;
use indexmap::IndexMap;

/// Stable arena index for a [`Block`]. Kept as a plain `u32` newtype rather
/// than a reference so parent links, child lists, and the mixin resolver's
/// visited-set can all just be `Copy` integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    Root,
    Rule,
    Media,
    Directive,
}

/// One parameter in a mixin/ruleset's declared argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgSpec {
    /// A literal value the caller's positional argument must match exactly.
    Lit(Value),
    /// A named parameter, optionally with a default value expression.
    Arg(String, Option<Value>),
    /// Absorbs every remaining ordered caller value as `list(" ", ...)`.
    Rest(String),
}

/// One conjunction term in a guard's disjunction-of-conjunctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardTerm {
    pub expr: Value,
    pub negate: bool,
}

/// A parsed LESS scope: a CSS rule, the document root, an `@media` block, an
/// at-directive, or a mixin/ruleset definition (which is just a `Rule` block
/// reachable from its parent's `children` map under its selector name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub block_type: BlockType,
    /// Parent in the arena; the root block is its own parent (sentinel).
    pub parent: BlockId,
    /// Unexpanded selector list (for `Rule`) — each entry may itself embed
    /// an interpolated `Value`, rendered to text only at `&`-expansion time.
    pub tags: Vec<Value>,
    /// Directive name (`@name value;`), if `block_type == Directive`.
    pub name: Option<String>,
    pub directive_value: Option<Value>,
    /// Media query list, if `block_type == Media`.
    pub queries: Vec<Value>,
    pub props: Vec<Prop>,
    /// Declared mixin/ruleset name -> child blocks with that name, in
    /// declaration order. A plain nested rule is *also* registered here
    /// under its literal selector text so it can be called as a mixin.
    pub children: IndexMap<String, Vec<BlockId>>,
    pub args: Option<Vec<ArgSpec>>,
    /// Disjunction of conjunctions; outer `Vec` is OR, inner is AND.
    pub guards: Option<Vec<Vec<GuardTerm>>>,
    pub is_vararg: bool,
    /// Index into the compiler's source table identifying which parsed file
    /// this block came from (root input, or a spliced `@import`).
    pub source_id: u32,
    /// Byte offset of each entry in `props`, parallel to that vector, used
    /// to recover a line/culprit for an error raised while compiling that
    /// prop. `0` when the parser didn't track a precise offset (e.g. a
    /// prop synthesized during prop sorting).
    pub prop_offsets: Vec<usize>,
}

impl Block {
    #[must_use]
    pub fn new(id: BlockId, block_type: BlockType, parent: BlockId) -> Self {
        Self {
            id,
            block_type,
            parent,
            tags: Vec::new(),
            name: None,
            directive_value: None,
            queries: Vec::new(),
            props: Vec::new(),
            children: IndexMap::new(),
            args: None,
            guards: None,
            is_vararg: false,
            source_id: 0,
            prop_offsets: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id == self.parent
    }
}

/// A single statement inside a block's prop list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Prop {
    /// `name: value;` — if `name` starts with `@`, this binds a variable
    /// instead of emitting a declaration.
    Assign(String, Value),
    /// A nested rule/media/directive block, compiled recursively.
    Block(BlockId),
    /// A mixin or ruleset call: dotted/nested name path, ordered argument
    /// values, keyword argument values, and an optional trailing
    /// `!important`-style suffix keyword.
    Call { path: Vec<String>, is_ruleset: bool, args: Vec<Value>, kwargs: IndexMap<String, Value>, suffix: Option<String> },
    /// Verbatim passthrough text (unparsed CSS fragment).
    Raw(String),
    Comment(String),
    /// `@name value;` at-rule that is not one of the recognized block
    /// keywords (`@media`, mixin calls, etc.) — emitted literally.
    Directive(String, Value),
    Import(String),
}

/// Arena owning every `Block` produced while parsing one compilation unit
/// (including blocks spliced in via `@import`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    #[must_use]
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn alloc(&mut self, block_type: BlockType, parent: BlockId) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id, block_type, parent));
        id
    }

    /// Allocates a root block that is its own parent (the sentinel
    /// `is_root` checks for), anywhere in the arena — used by the parser
    /// both for the main source and for each spliced `@import`.
    pub fn alloc_root(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id, BlockType::Root, id));
        id
    }

    #[must_use]
    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
