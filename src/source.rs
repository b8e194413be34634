//! Interfaces the explorer consumes from, and exposes to, its collaborators.

use bevy_ecs::prelude::Entity;

use crate::error::MirrorError;

/// Read/subscribe/destroy access to the engine's instance graph.
///
/// Handles are `Entity` values: the explorer never borrows engine storage across calls, and a
/// handle whose instance has been destroyed simply stops resolving (`contains` returns false).
pub trait SceneSource {
    fn contains(&self, node: Entity) -> bool;
    fn name(&self, node: Entity) -> Option<&str>;
    fn class_name(&self, node: Entity) -> Option<&str>;
    /// Children in the engine's current order.
    fn children(&self, node: Entity) -> Vec<Entity>;
    fn parent(&self, node: Entity) -> Option<Entity>;
    fn is_parent_locked(&self, node: Entity) -> bool;

    /// Starts delivering `ChildAdded`/`ChildRemoved`/`Changed` notifications raised by `node`.
    fn subscribe(&mut self, node: Entity);
    fn unsubscribe(&mut self, node: Entity);
    fn is_subscribed(&self, node: Entity) -> bool;

    /// Destroys `node` and its descendants. Returns false if it was already gone.
    fn destroy(&mut self, node: Entity) -> bool;
}

/// Receiver side of the per-instance notifications.
pub trait NodeObserver {
    fn on_child_added(&mut self, source: &mut dyn SceneSource, parent: Entity, child: Entity)
        -> Result<(), MirrorError>;
    fn on_child_removed(&mut self, source: &mut dyn SceneSource, parent: Entity, child: Entity)
        -> Result<(), MirrorError>;
    fn on_changed(&mut self, source: &mut dyn SceneSource, node: Entity, property: &str)
        -> Result<(), MirrorError>;
}

/// Property inspector fed by the selection controller.
pub trait PropertyPanel {
    /// Replaces the set of instances being inspected.
    fn update_selection(&mut self, nodes: &[Entity]);
    /// Refreshes a single property row for the current selection.
    fn update_value(&mut self, property: &str);
}

/// Class inheritance lookup used by the icon resolver.
pub trait ClassHierarchy {
    fn parent_class_name(&self, class_name: &str) -> Option<String>;
}
