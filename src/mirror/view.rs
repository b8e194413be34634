use crate::icons::Icon;
use bevy_ecs::prelude::Entity;
use bitflags::bitflags;
use smallvec::SmallVec;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId {
    index: u32,
    generation: u32,
}

impl ViewId {
    pub fn index(self) -> u32 {
        self.index
    }
}

bitflags! {
    /// Interaction affordances of a row in the explorer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViewFlags: u8 {
        const SELECTABLE = 1;
        const DRAGGABLE = 1 << 1;
        const DROP_TARGET = 1 << 2;
    }
}

impl Default for ViewFlags {
    fn default() -> Self {
        ViewFlags::SELECTABLE | ViewFlags::DRAGGABLE | ViewFlags::DROP_TARGET
    }
}

/// One row of the explorer tree.
///
/// `instance` is a lookup key back into the engine, not an owning handle.
#[derive(Debug, Clone)]
pub struct ViewNode {
    label: String,
    class_name: String,
    icon: Icon,
    flags: ViewFlags,
    instance: Entity,
    parent: Option<ViewId>,
    children: SmallVec<[ViewId; 8]>,
    selected: bool,
}

impl ViewNode {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn icon(&self) -> &Icon {
        &self.icon
    }

    pub fn flags(&self) -> ViewFlags {
        self.flags
    }

    pub fn instance(&self) -> Entity {
        self.instance
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

struct Slot {
    generation: u32,
    node: Option<ViewNode>,
}

/// Arena-backed presentation tree with a native multi-selection.
///
/// Nodes are either attached (a top-level row or the child of an attached node's subtree)
/// or detached, in which case they keep their own subtree and stay addressable until
/// `remove` frees them.
#[derive(Default)]
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<ViewId>,
    selection: Vec<ViewId>,
    selection_changed: bool,
    live: usize,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached node.
    pub fn create(&mut self, instance: Entity, label: &str, class_name: &str, icon: Icon) -> ViewId {
        let node = ViewNode {
            label: label.to_string(),
            class_name: class_name.to_string(),
            icon,
            flags: ViewFlags::default(),
            instance,
            parent: None,
            children: SmallVec::new(),
            selected: false,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return ViewId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, node: Some(node) });
        ViewId { index, generation: 0 }
    }

    pub fn get(&self, id: ViewId) -> Option<&ViewNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: ViewId) -> Option<&mut ViewNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn roots(&self) -> &[ViewId] {
        &self.roots
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.get(id).map(|node| node.children()).unwrap_or(&[])
    }

    pub fn instance(&self, id: ViewId) -> Option<Entity> {
        self.get(id).map(|node| node.instance)
    }

    /// True when `id` is reachable from a top-level row.
    pub fn is_attached(&self, id: ViewId) -> bool {
        let mut cursor = id;
        loop {
            match self.parent(cursor) {
                Some(parent) => cursor = parent,
                None => return self.roots.contains(&cursor),
            }
        }
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ViewId, id: ViewId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Moves `child` (with its subtree) under `parent`, or to the top level when `None`.
    ///
    /// Refuses to create a cycle and returns false in that case or when either node is gone.
    pub fn attach(&mut self, child: ViewId, parent: Option<ViewId>) -> bool {
        if !self.contains(child) {
            return false;
        }
        if let Some(parent) = parent {
            if !self.contains(parent) || self.is_ancestor_or_self(child, parent) {
                return false;
            }
        }
        self.detach(child);
        match parent {
            Some(parent) => {
                if let Some(node) = self.get_mut(parent) {
                    node.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
        }
        true
    }

    /// Unlinks `id` from its parent (or the top level). The subtree stays intact.
    pub fn detach(&mut self, id: ViewId) -> bool {
        let Some(parent) = self.get(id).map(|node| node.parent) else {
            return false;
        };
        match parent {
            Some(parent) => {
                if let Some(node) = self.get_mut(parent) {
                    node.children.retain(|child| *child != id);
                }
                if let Some(node) = self.get_mut(id) {
                    node.parent = None;
                }
                true
            }
            None => {
                let before = self.roots.len();
                self.roots.retain(|root| *root != id);
                before != self.roots.len()
            }
        }
    }

    /// Frees `id` and its whole subtree, returning the instances they mirrored (pre-order).
    pub fn remove(&mut self, id: ViewId) -> Vec<(ViewId, Entity)> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);
        let doomed = self.subtree(id);
        let mut removed = Vec::with_capacity(doomed.len());
        for view in doomed {
            let slot = &mut self.slots[view.index as usize];
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(view.index);
                self.live -= 1;
                if node.selected {
                    self.selection.retain(|selected| *selected != view);
                    self.selection_changed = true;
                }
                removed.push((view, node.instance));
            }
        }
        removed
    }

    /// Pre-order walk of `id` and its descendants.
    pub fn subtree(&self, id: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Updates the row text. Label edits never count as a selection change.
    pub fn set_label(&mut self, id: ViewId, label: &str) -> bool {
        match self.get_mut(id) {
            Some(node) => {
                if node.label != label {
                    node.label = label.to_string();
                }
                true
            }
            None => false,
        }
    }

    pub fn set_flags(&mut self, id: ViewId, flags: ViewFlags) -> bool {
        self.get_mut(id).map(|node| node.flags = flags).is_some()
    }

    /// Selects `id`; without `additive` the previous selection is replaced.
    pub fn select(&mut self, id: ViewId, additive: bool) -> bool {
        let selectable = self.get(id).is_some_and(|node| node.flags.contains(ViewFlags::SELECTABLE));
        if !selectable {
            return false;
        }
        if !additive {
            self.clear_selection();
        }
        let newly_selected = match self.get_mut(id) {
            Some(node) if !node.selected => {
                node.selected = true;
                true
            }
            _ => false,
        };
        if newly_selected {
            self.selection.push(id);
            self.selection_changed = true;
        }
        true
    }

    pub fn deselect(&mut self, id: ViewId) -> bool {
        let Some(node) = self.get_mut(id) else {
            return false;
        };
        if !node.selected {
            return false;
        }
        node.selected = false;
        self.selection.retain(|selected| *selected != id);
        self.selection_changed = true;
        true
    }

    /// Selects `id` if unselected and deselects it otherwise (ctrl-click).
    pub fn toggle_selection(&mut self, id: ViewId) -> bool {
        if self.get(id).is_some_and(|node| node.selected) {
            self.deselect(id)
        } else {
            self.select(id, true)
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        for id in std::mem::take(&mut self.selection) {
            if let Some(node) = self.get_mut(id) {
                node.selected = false;
            }
        }
        self.selection_changed = true;
    }

    /// Selected rows in the order they were selected.
    pub fn selected(&self) -> &[ViewId] {
        &self.selection
    }

    pub fn selection_changed(&self) -> bool {
        self.selection_changed
    }

    /// Reads and resets the "selection changed" signal.
    pub fn take_selection_changed(&mut self) -> bool {
        std::mem::take(&mut self.selection_changed)
    }

    /// Indented text rendering of the attached rows: `label [Class]` per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(ViewId, usize)> = self.roots.iter().rev().map(|root| (*root, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            let marker = if node.selected { "*" } else { "" };
            let _ = writeln!(out, "{}{}{} [{}]", "  ".repeat(depth), marker, node.label, node.class_name);
            stack.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tree: &mut ViewTree, raw: u32, label: &str) -> ViewId {
        tree.create(Entity::from_raw(raw), label, "Folder", Icon::empty())
    }

    #[test]
    fn attach_moves_subtree_and_refuses_cycles() {
        let mut tree = ViewTree::new();
        let root = node(&mut tree, 0, "Game");
        let a = node(&mut tree, 1, "A");
        let b = node(&mut tree, 2, "B");
        let leaf = node(&mut tree, 3, "Leaf");
        assert!(tree.attach(root, None));
        assert!(tree.attach(a, Some(root)));
        assert!(tree.attach(b, Some(root)));
        assert!(tree.attach(leaf, Some(a)));

        assert!(tree.attach(a, Some(b)));
        assert_eq!(tree.children(root), &[b]);
        assert_eq!(tree.children(b), &[a]);
        assert_eq!(tree.children(a), &[leaf]);

        assert!(!tree.attach(b, Some(leaf)), "b is an ancestor of leaf");
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn detached_nodes_keep_their_subtree_until_removed() {
        let mut tree = ViewTree::new();
        let root = node(&mut tree, 0, "Game");
        let a = node(&mut tree, 1, "A");
        let leaf = node(&mut tree, 2, "Leaf");
        tree.attach(root, None);
        tree.attach(a, Some(root));
        tree.attach(leaf, Some(a));

        assert!(tree.detach(a));
        assert!(!tree.is_attached(a));
        assert!(!tree.is_attached(leaf));
        assert_eq!(tree.children(a), &[leaf]);

        let removed = tree.remove(a);
        assert_eq!(removed.len(), 2);
        assert!(!tree.contains(a));
        assert!(!tree.contains(leaf));
        assert_eq!(tree.len(), 1);

        let reused = node(&mut tree, 9, "Reused");
        assert_ne!(reused, a, "recycled slots must not alias old ids");
        assert!(tree.get(a).is_none());
    }

    #[test]
    fn removing_selected_rows_signals_a_selection_change() {
        let mut tree = ViewTree::new();
        let root = node(&mut tree, 0, "Game");
        let a = node(&mut tree, 1, "A");
        tree.attach(root, None);
        tree.attach(a, Some(root));
        tree.select(root, false);
        tree.select(a, true);
        assert_eq!(tree.selected(), &[root, a]);
        assert!(tree.take_selection_changed());

        tree.set_label(a, "Renamed");
        assert!(!tree.selection_changed(), "relabels must not look like selection changes");

        tree.remove(a);
        assert_eq!(tree.selected(), &[root]);
        assert!(tree.take_selection_changed());
    }

    #[test]
    fn toggle_and_non_selectable_rows() {
        let mut tree = ViewTree::new();
        let a = node(&mut tree, 1, "A");
        let b = node(&mut tree, 2, "B");
        tree.attach(a, None);
        tree.attach(b, None);
        tree.set_flags(b, ViewFlags::DROP_TARGET);
        assert!(!tree.select(b, false));
        assert!(tree.toggle_selection(a));
        assert_eq!(tree.selected(), &[a]);
        assert!(tree.toggle_selection(a));
        assert!(tree.selected().is_empty());
    }

    #[test]
    fn outline_marks_selection_and_indents_children() {
        let mut tree = ViewTree::new();
        let root = node(&mut tree, 0, "Game");
        let a = node(&mut tree, 1, "A");
        tree.attach(root, None);
        tree.attach(a, Some(root));
        tree.select(a, false);
        assert_eq!(tree.outline(), "Game [Folder]\n  *A [Folder]\n");
    }
}
