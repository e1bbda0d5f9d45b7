//! Bidirectional identity mirrors.
//!
//! A mirror hands out stable integer ids so the mutation layer can reference
//! already-serialized entities without re-serializing them.
//!
//! Invariants:
//! - Both directions stay bijective: no two entities share an id, no id maps
//!   to two entities.
//! - Entries survive node removal; only `reset` (a session boundary) clears
//!   them, and it clears both directions atomically.
//! - Sequential ids start at 1 and never repeat within a session.

use dom::{NodeRef, SheetRef};
use std::collections::HashMap;

pub type MirrorId = i32;

/// Reserved sentinel for "unknown/absent" identity.
pub const ABSENT: MirrorId = -1;

const FIRST_ID: MirrorId = 1;

/// id ⇄ node bijection for one recording session.
#[derive(Debug)]
pub struct NodeMirror {
    ids: HashMap<NodeRef, MirrorId>,
    nodes: HashMap<MirrorId, NodeRef>,
    next: MirrorId,
}

impl Default for NodeMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeMirror {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            nodes: HashMap::new(),
            next: FIRST_ID,
        }
    }

    /// Assign the next sequential id to an unseen node, or return the id it
    /// already holds.
    pub fn add(&mut self, node: NodeRef) -> MirrorId {
        if let Some(&id) = self.ids.get(&node) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(node, id);
        self.nodes.insert(id, node);
        id
    }

    pub fn has(&self, node: NodeRef) -> bool {
        self.ids.contains_key(&node)
    }

    /// The node's id, or `ABSENT` when it was never mirrored.
    pub fn id_of(&self, node: NodeRef) -> MirrorId {
        self.ids.get(&node).copied().unwrap_or(ABSENT)
    }

    pub fn node_of(&self, id: MirrorId) -> Option<NodeRef> {
        self.nodes.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Clear both directions and restart the id counter.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.nodes.clear();
        self.next = FIRST_ID;
    }
}

/// id ⇄ stylesheet bijection; separate id space from the node mirror.
#[derive(Debug)]
pub struct StyleSheetMirror {
    ids: HashMap<SheetRef, MirrorId>,
    sheets: HashMap<MirrorId, SheetRef>,
    next: MirrorId,
}

impl Default for StyleSheetMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleSheetMirror {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            sheets: HashMap::new(),
            next: FIRST_ID,
        }
    }

    pub fn add(&mut self, sheet: SheetRef) -> MirrorId {
        if let Some(&id) = self.ids.get(&sheet) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.store(sheet, id);
        id
    }

    /// Store an unseen sheet under a caller-chosen id, used to rehydrate a
    /// mirror to match a previously emitted snapshot. The caller owns
    /// collision freedom between explicit ids; the sequential counter is
    /// raised past `id` so later `add` calls cannot collide with it.
    pub fn add_with_id(&mut self, sheet: SheetRef, id: MirrorId) -> MirrorId {
        if let Some(&existing) = self.ids.get(&sheet) {
            return existing;
        }
        self.store(sheet, id);
        self.next = self.next.max(id + 1);
        id
    }

    fn store(&mut self, sheet: SheetRef, id: MirrorId) {
        self.ids.insert(sheet, id);
        self.sheets.insert(id, sheet);
    }

    pub fn has(&self, sheet: SheetRef) -> bool {
        self.ids.contains_key(&sheet)
    }

    pub fn id_of(&self, sheet: SheetRef) -> MirrorId {
        self.ids.get(&sheet).copied().unwrap_or(ABSENT)
    }

    /// The sheet stored under `id`, or `None` for unknown ids and after a
    /// reset.
    pub fn style_of(&self, id: MirrorId) -> Option<SheetRef> {
        self.sheets.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn reset(&mut self) {
        self.ids.clear();
        self.sheets.clear();
        self.next = FIRST_ID;
    }
}
