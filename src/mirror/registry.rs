use super::ViewId;
use bevy_ecs::prelude::Entity;
use std::collections::HashMap;

/// Instance identity to view node lookup. Keyed on `Entity`, never on name or class.
#[derive(Debug, Default)]
pub struct NodePresentationRegistry {
    views: HashMap<Entity, ViewId>,
}

impl NodePresentationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the view previously registered for `node`, if any.
    pub fn put(&mut self, node: Entity, view: ViewId) -> Option<ViewId> {
        self.views.insert(node, view)
    }

    pub fn get(&self, node: Entity) -> Option<ViewId> {
        self.views.get(&node).copied()
    }

    pub fn remove(&mut self, node: Entity) -> Option<ViewId> {
        self.views.remove(&node)
    }

    pub fn contains(&self, node: Entity) -> bool {
        self.views.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, ViewId)> + '_ {
        self.views.iter().map(|(node, view)| (*node, *view))
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::ViewTree;

    #[test]
    fn misses_are_plain_none() {
        let mut tree = ViewTree::new();
        let mut registry = NodePresentationRegistry::new();
        let node = Entity::from_raw(7);
        assert_eq!(registry.get(node), None);
        assert_eq!(registry.remove(node), None);

        let view = tree.create(node, "Part", "Part", Default::default());
        assert_eq!(registry.put(node, view), None);
        assert_eq!(registry.get(node), Some(view));
        assert_eq!(registry.remove(node), Some(view));
        assert!(registry.is_empty());
    }
}
