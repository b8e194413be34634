use super::*;
use crate::events::{EventBus, NodeEvent};
use crate::source::SceneSource;
use anyhow::{anyhow, bail, Result};
use bevy_ecs::prelude::{Entity, World};
use tracing::debug;

pub const NAME_PROPERTY: &str = "Name";
pub const PARENT_PROPERTY: &str = "Parent";
pub const PARENT_LOCKED_PROPERTY: &str = "ParentLocked";

// ---------- World container ----------
/// Reference instance graph backed by a bevy `World`.
///
/// Each instance is an entity carrying a name, an immutable class name and
/// `Parent`/`Children` links. Notifications are queued on the `EventBus`
/// resource, but only for instances that somebody subscribed to.
pub struct EcsWorld {
    pub world: World,
    root: Option<Entity>,
}

impl Default for EcsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl EcsWorld {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(EventBus::default());
        world.insert_resource(Subscriptions::default());
        Self { world, root: None }
    }

    /// A data model root named `Game` with the default services underneath.
    pub fn with_default_services() -> Self {
        let mut ecs = Self::new();
        let root = ecs.spawn_root("DataModel", "Game");
        for service in DEFAULT_SERVICES {
            let entity = ecs.spawn_detached(service, service);
            ecs.attach_child_to_parent(entity, root);
        }
        ecs
    }

    pub fn root(&self) -> Option<Entity> {
        self.root
    }

    /// Replaces the root instance. The previous root (if any) is left untouched.
    pub fn spawn_root(&mut self, class_name: &str, name: &str) -> Entity {
        let root = self.spawn_detached(class_name, name);
        self.root = Some(root);
        root
    }

    fn spawn_detached(&mut self, class_name: &str, name: &str) -> Entity {
        self.world
            .spawn((
                InstanceName(name.to_string()),
                InstanceClass(class_name.to_string()),
                Children::default(),
                ParentLocked::default(),
            ))
            .id()
    }

    pub fn spawn_instance(&mut self, class_name: &str, name: &str, parent: Option<Entity>) -> Result<Entity> {
        if let Some(parent) = parent {
            if !self.entity_exists(parent) {
                bail!("Cannot parent new {class_name} '{name}' to missing instance {parent:?}");
            }
        }
        let entity = self.spawn_detached(class_name, name);
        if let Some(parent) = parent {
            self.attach_child_to_parent(entity, parent);
            self.emit(NodeEvent::ChildAdded { parent, child: entity });
        }
        Ok(entity)
    }

    fn attach_child_to_parent(&mut self, child_entity: Entity, parent_entity: Entity) {
        self.world.entity_mut(child_entity).insert(Parent(parent_entity));
        if let Some(mut children) = self.world.get_mut::<Children>(parent_entity) {
            if !children.0.contains(&child_entity) {
                children.0.push(child_entity);
            }
        } else {
            self.world.entity_mut(parent_entity).insert(Children(vec![child_entity]));
        }
    }

    fn detach_from_parent(&mut self, entity: Entity) -> Option<Entity> {
        let parent = self.world.get::<Parent>(entity).copied()?;
        if let Some(mut siblings) = self.world.get_mut::<Children>(parent.0) {
            siblings.0.retain(|&child| child != entity);
        }
        self.world.entity_mut(entity).remove::<Parent>();
        Some(parent.0)
    }

    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok() && self.world.get::<InstanceClass>(entity).is_some()
    }

    pub fn instance_count(&self) -> usize {
        self.world.iter_entities().filter(|entity| entity.contains::<InstanceClass>()).count()
    }

    pub fn instance_info(&self, entity: Entity) -> Option<InstanceInfo> {
        let name = self.world.get::<InstanceName>(entity)?;
        let class = self.world.get::<InstanceClass>(entity)?;
        Some(InstanceInfo {
            name: name.0.clone(),
            class_name: class.0.clone(),
            parent: self.world.get::<Parent>(entity).map(|p| p.0),
            child_count: self.world.get::<Children>(entity).map(|c| c.0.len()).unwrap_or(0),
            parent_locked: self.world.get::<ParentLocked>(entity).map(|l| l.0).unwrap_or(false),
        })
    }

    pub fn set_name(&mut self, entity: Entity, name: &str) -> bool {
        let Some(mut current) = self.world.get_mut::<InstanceName>(entity) else {
            return false;
        };
        if current.0 == name {
            return true;
        }
        current.0 = name.to_string();
        self.emit(NodeEvent::changed(entity, NAME_PROPERTY));
        true
    }

    /// Moves `entity` under `new_parent`, or out of the tree when `None`.
    ///
    /// Emits `ChildRemoved` on the old parent, `ChildAdded` on the new one and
    /// `Changed("Parent")` on the instance, in that order.
    pub fn set_parent(&mut self, entity: Entity, new_parent: Option<Entity>) -> Result<()> {
        let info = self.instance_info(entity).ok_or_else(|| anyhow!("Instance {entity:?} does not exist"))?;
        if info.parent_locked {
            bail!("The Parent property of {} is locked", info.name);
        }
        if info.parent == new_parent {
            return Ok(());
        }
        if let Some(target) = new_parent {
            if !self.entity_exists(target) {
                bail!("Cannot parent {} to missing instance {target:?}", info.name);
            }
            if target == entity || self.is_ancestor_of(entity, target) {
                bail!("Attempt to set parent of {} would result in circular reference", info.name);
            }
        }
        if let Some(old_parent) = self.detach_from_parent(entity) {
            self.emit(NodeEvent::ChildRemoved { parent: old_parent, child: entity });
        }
        if let Some(target) = new_parent {
            self.attach_child_to_parent(entity, target);
            self.emit(NodeEvent::ChildAdded { parent: target, child: entity });
        }
        self.emit(NodeEvent::changed(entity, PARENT_PROPERTY));
        Ok(())
    }

    pub fn set_parent_locked(&mut self, entity: Entity, locked: bool) -> bool {
        let Some(mut lock) = self.world.get_mut::<ParentLocked>(entity) else {
            return false;
        };
        if lock.0 != locked {
            lock.0 = locked;
            self.emit(NodeEvent::changed(entity, PARENT_LOCKED_PROPERTY));
        }
        true
    }

    /// Raises `Changed(property)` for properties this graph does not model itself.
    pub fn notify_property_changed(&mut self, entity: Entity, property: &str) -> bool {
        if !self.entity_exists(entity) {
            return false;
        }
        self.emit(NodeEvent::changed(entity, property));
        true
    }

    pub fn is_ancestor_of(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut cursor = self.world.get::<Parent>(entity).map(|p| p.0);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.world.get::<Parent>(current).map(|p| p.0);
        }
        false
    }

    /// Destroys `entity` and everything below it.
    ///
    /// Only the former parent reports the removal; the destroyed instances raise nothing.
    pub fn destroy_instance(&mut self, entity: Entity) -> bool {
        if !self.entity_exists(entity) {
            return false;
        }
        if let Some(parent) = self.detach_from_parent(entity) {
            self.emit(NodeEvent::ChildRemoved { parent, child: entity });
        }
        if self.root == Some(entity) {
            self.root = None;
        }
        self.despawn_entity(entity)
    }

    fn despawn_entity(&mut self, entity: Entity) -> bool {
        let child_ids = self.world.get::<Children>(entity).map(|c| c.0.clone()).unwrap_or_default();
        for child in child_ids {
            self.despawn_entity(child);
        }
        self.world.resource_mut::<Subscriptions>().0.remove(&entity);
        self.world.despawn(entity)
    }

    pub fn find_child(&self, parent: Entity, name: &str) -> Option<Entity> {
        let children = self.world.get::<Children>(parent)?;
        children.0.iter().copied().find(|&child| self.world.get::<InstanceName>(child).is_some_and(|n| n.0 == name))
    }

    /// Resolves a dot separated path of names starting below the root, e.g. `Workspace.Part`.
    /// An empty path resolves to the root itself.
    pub fn find_path(&self, path: &str) -> Option<Entity> {
        let mut cursor = self.root?;
        for segment in path.split('.').map(str::trim).filter(|segment| !segment.is_empty()) {
            cursor = self.find_child(cursor, segment)?;
        }
        Some(cursor)
    }

    /// Dot separated path from below the root; `None` once detached from the root.
    pub fn path_of(&self, entity: Entity) -> Option<String> {
        let root = self.root?;
        let mut segments = Vec::new();
        let mut cursor = entity;
        while cursor != root {
            segments.push(self.world.get::<InstanceName>(cursor)?.0.clone());
            cursor = self.world.get::<Parent>(cursor)?.0;
        }
        segments.reverse();
        Some(segments.join("."))
    }

    /// Pre-order walk of `entity` and its descendants.
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            if !self.entity_exists(current) {
                continue;
            }
            out.push(current);
            if let Some(children) = self.world.get::<Children>(current) {
                stack.extend(children.0.iter().rev().copied());
            }
        }
        out
    }

    fn emit(&mut self, event: NodeEvent) {
        if !self.world.resource::<Subscriptions>().0.contains(&event.source()) {
            return;
        }
        debug!(target: "engine", "queued {event}");
        self.world.resource_mut::<EventBus>().push(event);
    }

    pub fn drain_events(&mut self) -> Vec<NodeEvent> {
        self.world.resource_mut::<EventBus>().drain()
    }

    pub fn pending_events(&self) -> usize {
        self.world.resource::<EventBus>().len()
    }
}

impl SceneSource for EcsWorld {
    fn contains(&self, node: Entity) -> bool {
        self.entity_exists(node)
    }

    fn name(&self, node: Entity) -> Option<&str> {
        self.world.get::<InstanceName>(node).map(|n| n.0.as_str())
    }

    fn class_name(&self, node: Entity) -> Option<&str> {
        self.world.get::<InstanceClass>(node).map(|c| c.0.as_str())
    }

    fn children(&self, node: Entity) -> Vec<Entity> {
        self.world.get::<Children>(node).map(|c| c.0.clone()).unwrap_or_default()
    }

    fn parent(&self, node: Entity) -> Option<Entity> {
        self.world.get::<Parent>(node).map(|p| p.0)
    }

    fn is_parent_locked(&self, node: Entity) -> bool {
        self.world.get::<ParentLocked>(node).map(|l| l.0).unwrap_or(false)
    }

    fn subscribe(&mut self, node: Entity) {
        if self.entity_exists(node) {
            self.world.resource_mut::<Subscriptions>().0.insert(node);
        }
    }

    fn unsubscribe(&mut self, node: Entity) {
        self.world.resource_mut::<Subscriptions>().0.remove(&node);
    }

    fn is_subscribed(&self, node: Entity) -> bool {
        self.world.resource::<Subscriptions>().0.contains(&node)
    }

    fn destroy(&mut self, node: Entity) -> bool {
        self.destroy_instance(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_services_hang_off_the_root() {
        let ecs = EcsWorld::with_default_services();
        let root = ecs.root().expect("root");
        assert_eq!(ecs.children(root).len(), DEFAULT_SERVICES.len());
        let workspace = ecs.find_path("Workspace").expect("workspace");
        assert_eq!(ecs.class_name(workspace), Some("Workspace"));
        assert_eq!(ecs.path_of(workspace).as_deref(), Some("Workspace"));
    }

    #[test]
    fn events_are_only_queued_for_subscribed_instances() {
        let mut ecs = EcsWorld::with_default_services();
        let workspace = ecs.find_path("Workspace").expect("workspace");
        ecs.spawn_instance("Part", "Unheard", Some(workspace)).expect("spawn");
        assert_eq!(ecs.pending_events(), 0);

        ecs.subscribe(workspace);
        let part = ecs.spawn_instance("Part", "Heard", Some(workspace)).expect("spawn");
        assert_eq!(ecs.drain_events(), vec![NodeEvent::ChildAdded { parent: workspace, child: part }]);
    }

    #[test]
    fn reparent_emits_removed_added_then_changed() {
        let mut ecs = EcsWorld::with_default_services();
        let workspace = ecs.find_path("Workspace").expect("workspace");
        let lighting = ecs.find_path("Lighting").expect("lighting");
        let part = ecs.spawn_instance("Part", "Part", Some(workspace)).expect("spawn");
        for node in [workspace, lighting, part] {
            ecs.subscribe(node);
        }

        ecs.set_parent(part, Some(lighting)).expect("reparent");
        assert_eq!(
            ecs.drain_events(),
            vec![
                NodeEvent::ChildRemoved { parent: workspace, child: part },
                NodeEvent::ChildAdded { parent: lighting, child: part },
                NodeEvent::changed(part, PARENT_PROPERTY),
            ]
        );
        assert_eq!(ecs.path_of(part).as_deref(), Some("Lighting.Part"));
    }

    #[test]
    fn reparent_rejects_cycles_and_locked_instances() {
        let mut ecs = EcsWorld::with_default_services();
        let workspace = ecs.find_path("Workspace").expect("workspace");
        let model = ecs.spawn_instance("Model", "Model", Some(workspace)).expect("spawn");
        let part = ecs.spawn_instance("Part", "Part", Some(model)).expect("spawn");

        let err = ecs.set_parent(model, Some(part)).unwrap_err();
        assert!(err.to_string().contains("circular"), "unexpected error: {err}");

        ecs.set_parent_locked(part, true);
        assert!(ecs.set_parent(part, Some(workspace)).is_err());
        assert_eq!(ecs.parent(part), Some(model));
    }

    #[test]
    fn destroy_only_reports_on_the_former_parent() {
        let mut ecs = EcsWorld::with_default_services();
        let workspace = ecs.find_path("Workspace").expect("workspace");
        let model = ecs.spawn_instance("Model", "Model", Some(workspace)).expect("spawn");
        let part = ecs.spawn_instance("Part", "Part", Some(model)).expect("spawn");
        for node in [workspace, model, part] {
            ecs.subscribe(node);
        }

        assert!(ecs.destroy_instance(model));
        assert_eq!(ecs.drain_events(), vec![NodeEvent::ChildRemoved { parent: workspace, child: model }]);
        assert!(!ecs.contains(model));
        assert!(!ecs.contains(part));
        assert!(!ecs.is_subscribed(part));
        assert!(!ecs.destroy_instance(model));
    }
}
