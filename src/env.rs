//! The environment/scope stack: linked frames holding variable bindings,
//! the block currently being compiled, expanded selectors, and the
//! `@arguments` binding for the active mixin call.
//!
//! Grounded on the teacher's frame-arena push/pop/reuse design, but shaped
//! as a linked parent chain with a secondary `store_parent` chain instead of
//! flat slot indices — mixin scope capture needs a frame to remember an
//! *additional* outward chain (the scope it was declared in), which a flat
//! namespace table has no room for.

use ahash::AHashSet;
use std::collections::HashMap;

use crate::error::{EvalError, EvalResult};
use crate::tree::BlockId;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u32);

/// A resolved `@import` kept per-frame so a nested reference to the same
/// import id (reached again via `import_mixin`) doesn't re-resolve.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub resolved_path: Option<std::path::PathBuf>,
}

#[derive(Debug)]
pub struct Frame {
    parent: Option<FrameId>,
    store: HashMap<String, Value>,
    pub block: Option<BlockId>,
    pub selectors: Vec<String>,
    pub media_queries: Vec<String>,
    arguments: Option<Vec<Value>>,
    store_parent: Option<FrameId>,
    seen_names: AHashSet<String>,
    pub imports: HashMap<u32, ImportRecord>,
}

impl Frame {
    fn new(parent: Option<FrameId>) -> Self {
        Self {
            parent,
            store: HashMap::new(),
            block: None,
            selectors: Vec::new(),
            media_queries: Vec::new(),
            arguments: None,
            store_parent: None,
            seen_names: AHashSet::new(),
            imports: HashMap::new(),
        }
    }
}

/// Owns every frame ever pushed during one compilation (frames are never
/// freed individually — the whole `Env` is dropped with the `Compiler` call
/// that owns it — so `FrameId`s stay valid across pops, which lets a mixin
/// call keep a `FrameId` captured at declaration time and reuse it later as
/// a `store_parent`).
#[derive(Debug)]
pub struct Env {
    frames: Vec<Frame>,
    current: FrameId,
}

impl Env {
    #[must_use]
    pub fn new() -> Self {
        let root = Frame::new(None);
        Self { frames: vec![root], current: FrameId(0) }
    }

    #[must_use]
    pub fn current(&self) -> FrameId {
        self.current
    }

    fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0 as usize]
    }

    fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0 as usize]
    }

    /// Pushes a new frame as a child of the current one and makes it
    /// current. `block` records the input block this frame was pushed for,
    /// if any (mixins carry this back out as their captured `scope`).
    pub fn push(&mut self, block: Option<BlockId>) -> FrameId {
        let mut frame = Frame::new(Some(self.current));
        frame.block = block;
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(frame);
        self.current = id;
        id
    }

    /// Pops back to the pushed frame's parent. Returns the id of the frame
    /// that was just popped (the caller may still reference its bindings,
    /// e.g. to capture it as a `store_parent` for a later mixin call).
    pub fn pop(&mut self) -> FrameId {
        let popped = self.current;
        if let Some(parent) = self.frame(popped).parent {
            self.current = parent;
        }
        popped
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.frame_mut(self.current).store.insert(name.to_string(), value);
    }

    pub fn set_on(&mut self, frame: FrameId, name: &str, value: Value) {
        self.frame_mut(frame).store.insert(name.to_string(), value);
    }

    pub fn set_arguments(&mut self, args: Vec<Value>) {
        self.frame_mut(self.current).arguments = Some(args);
    }

    /// Links `frame`'s secondary outward chain to `target` — the scope a
    /// mixin was declared in, surfaced so the mixin's body can still see
    /// its declaration-site variables even though it's being compiled while
    /// temporarily re-parented to the call site.
    pub fn set_store_parent(&mut self, frame: FrameId, target: FrameId) {
        self.frame_mut(frame).store_parent = Some(target);
    }

    pub fn selectors_mut(&mut self) -> &mut Vec<String> {
        &mut self.frame_mut(self.current).selectors
    }

    pub fn media_queries_mut(&mut self) -> &mut Vec<String> {
        &mut self.frame_mut(self.current).media_queries
    }

    #[must_use]
    pub fn nearest_selectors(&self) -> Vec<String> {
        let mut id = Some(self.current);
        while let Some(fid) = id {
            let frame = self.frame(fid);
            if !frame.selectors.is_empty() {
                return frame.selectors.clone();
            }
            id = frame.parent;
        }
        Vec::new()
    }

    #[must_use]
    pub fn nearest_media_queries(&self) -> Vec<String> {
        let mut id = Some(self.current);
        while let Some(fid) = id {
            let frame = self.frame(fid);
            if !frame.media_queries.is_empty() {
                return frame.media_queries.clone();
            }
            id = frame.parent;
        }
        Vec::new()
    }

    /// Resolves `name` by walking the primary parent chain first, queueing
    /// any `store_parent` encountered along the way; if the primary walk
    /// fails, each queued secondary chain is then walked in FIFO order
    /// (following *its* primary parents and enqueuing further
    /// `store_parent`s), matching the spec's described search order.
    pub fn get(&self, name: &str) -> EvalResult<Value> {
        if name == "@arguments" {
            if let Some(args) = self.find_arguments() {
                return Ok(Value::List(" ".to_string(), args));
            }
        }
        let mut secondary_queue: Vec<FrameId> = Vec::new();
        let mut id = Some(self.current);
        while let Some(fid) = id {
            let frame = self.frame(fid);
            if let Some(v) = frame.store.get(name) {
                return Ok(v.clone());
            }
            if let Some(sp) = frame.store_parent {
                secondary_queue.push(sp);
            }
            id = frame.parent;
        }
        let mut i = 0;
        while i < secondary_queue.len() {
            let mut id = Some(secondary_queue[i]);
            while let Some(fid) = id {
                let frame = self.frame(fid);
                if let Some(v) = frame.store.get(name) {
                    return Ok(v.clone());
                }
                if let Some(sp) = frame.store_parent {
                    secondary_queue.push(sp);
                }
                id = frame.parent;
            }
            i += 1;
        }
        Err(EvalError::undefined_variable(name))
    }

    fn find_arguments(&self) -> Option<Vec<Value>> {
        let mut id = Some(self.current);
        while let Some(fid) = id {
            let frame = self.frame(fid);
            if let Some(args) = &frame.arguments {
                return Some(args.clone());
            }
            id = frame.parent;
        }
        None
    }

    /// Per-frame re-entrance guard for a single variable name during
    /// reduction: returns `true` (and records the name) the first time it's
    /// asked about `name` on `frame`, `false` (signalling a cycle) if it
    /// was already marked. Callers clear the mark once the reduce of that
    /// name's value returns, so sibling references aren't falsely flagged.
    pub fn mark_seen(&mut self, frame: FrameId, name: &str) -> bool {
        self.frame_mut(frame).seen_names.insert(name.to_string())
    }

    pub fn clear_seen(&mut self, frame: FrameId, name: &str) {
        self.frame_mut(frame).seen_names.remove(name);
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
