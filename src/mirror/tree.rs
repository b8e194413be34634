use super::{NodePresentationRegistry, ViewFlags, ViewId, ViewTree};
use crate::ecs::{NAME_PROPERTY, PARENT_LOCKED_PROPERTY, PARENT_PROPERTY};
use crate::error::MirrorError;
use crate::icons::ClassIconResolver;
use crate::source::{NodeObserver, SceneSource};
use bevy_ecs::prelude::Entity;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Outcome of [`TreeMirror::settle`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettleReport {
    /// Instances whose view nodes were freed because they left the mirrored tree.
    pub removed: Vec<Entity>,
    /// Instances found back under a mirrored parent and re-attached instead.
    pub reattached: Vec<Entity>,
}

impl SettleReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.reattached.is_empty()
    }
}

/// Keeps a [`ViewTree`] isomorphic to the subtree below a root instance.
///
/// Removals are two-phase. `ChildRemoved` only detaches the view node so that a
/// re-parent (`ChildRemoved` followed by `ChildAdded` elsewhere) can move the existing
/// subtree. Whatever is still detached when [`settle`](Self::settle) runs at the end of
/// the notification batch has left the tree for good and is unregistered.
pub struct TreeMirror {
    view: ViewTree,
    registry: NodePresentationRegistry,
    icons: ClassIconResolver,
    root: Option<Entity>,
    pending_removal: Vec<Entity>,
    /// Classes whose rows are never draggable.
    pinned_classes: BTreeSet<String>,
}

impl TreeMirror {
    pub fn new(icons: ClassIconResolver) -> Self {
        Self {
            view: ViewTree::new(),
            registry: NodePresentationRegistry::new(),
            icons,
            root: None,
            pending_removal: Vec::new(),
            pinned_classes: BTreeSet::new(),
        }
    }

    pub fn with_pinned_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pinned_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn view(&self) -> &ViewTree {
        &self.view
    }

    /// Mutable access for the presentation surface (selection clicks and the like).
    pub fn view_mut(&mut self) -> &mut ViewTree {
        &mut self.view
    }

    pub fn registry(&self) -> &NodePresentationRegistry {
        &self.registry
    }

    pub fn icons(&self) -> &ClassIconResolver {
        &self.icons
    }

    /// The instance the explorer is anchored at. With a hidden root this instance has no row.
    pub fn root(&self) -> Option<Entity> {
        self.root
    }

    /// Anchors the mirror at `root` without giving it a row; its children are mirrored separately.
    pub fn set_root(&mut self, root: Entity) {
        self.root = Some(root);
    }

    pub fn view_of(&self, node: Entity) -> Option<ViewId> {
        self.registry.get(node)
    }

    pub fn instance_of(&self, view: ViewId) -> Option<Entity> {
        self.view.instance(view)
    }

    pub fn outline(&self) -> String {
        self.view.outline()
    }

    /// Mirrors `root` and everything below it as a top-level row.
    ///
    /// Calling it again for an instance that already has a view node returns that node.
    /// The first mirrored instance becomes the anchor unless [`set_root`](Self::set_root) ran first.
    pub fn mirror(&mut self, source: &mut dyn SceneSource, root: Entity) -> Option<ViewId> {
        let view = self.build(source, root)?;
        if !self.view.is_attached(view) {
            self.view.attach(view, None);
        }
        if self.root.is_none() {
            self.root = Some(root);
        }
        debug!(target: "mirror", "mirrored {} instance(s) below {root:?}", self.view.subtree(view).len());
        Some(view)
    }

    /// Detaches a top-level row whose instance left an unmirrored parent.
    /// Like `ChildRemoved`, the row is only freed by the next `settle`.
    pub fn release(&mut self, node: Entity) -> Result<(), MirrorError> {
        let view = self.registry.get(node).ok_or_else(|| MirrorError::stale(node, "ChildRemoved"))?;
        self.view.detach(view);
        if !self.pending_removal.contains(&node) {
            self.pending_removal.push(node);
        }
        Ok(())
    }

    fn build(&mut self, source: &mut dyn SceneSource, node: Entity) -> Option<ViewId> {
        if let Some(existing) = self.registry.get(node) {
            return Some(existing);
        }
        if !source.contains(node) {
            return None;
        }
        let class_name = source.class_name(node).unwrap_or_default().to_string();
        let label = source.name(node).unwrap_or_default().to_string();
        let icon = self.icons.resolve(&class_name);
        let view = self.view.create(node, &label, &class_name, icon);
        let flags = self.flags_for(source, node);
        self.view.set_flags(view, flags);
        self.registry.put(node, view);
        source.subscribe(node);

        for child in source.children(node) {
            if let Some(child_view) = self.build(source, child) {
                self.view.attach(child_view, Some(view));
            }
        }
        Some(view)
    }

    fn flags_for(&self, source: &dyn SceneSource, node: Entity) -> ViewFlags {
        let mut flags = ViewFlags::SELECTABLE | ViewFlags::DROP_TARGET;
        let pinned = source.class_name(node).is_some_and(|class_name| self.pinned_classes.contains(class_name));
        if !pinned && !source.is_parent_locked(node) {
            flags |= ViewFlags::DRAGGABLE;
        }
        flags
    }

    /// Frees every view node that was detached during the batch and never re-attached.
    pub fn settle(&mut self, source: &mut dyn SceneSource) -> SettleReport {
        let mut report = SettleReport::default();
        for node in std::mem::take(&mut self.pending_removal) {
            let Some(view) = self.registry.get(node) else {
                continue;
            };
            if self.view.is_attached(view) {
                continue;
            }
            if let Some(parent_view) = self.live_parent_view(source, node) {
                if self.view.attach(view, Some(parent_view)) {
                    debug!(target: "mirror", "{node:?} is still parented in the engine, re-attached");
                    report.reattached.push(node);
                    continue;
                }
            }
            for (_, instance) in self.view.remove(view) {
                self.registry.remove(instance);
                if source.contains(instance) {
                    source.unsubscribe(instance);
                }
                report.removed.push(instance);
            }
        }
        if !report.removed.is_empty() {
            trace!(target: "mirror", "unregistered {} instance(s)", report.removed.len());
        }
        report
    }

    fn live_parent_view(&self, source: &dyn SceneSource, node: Entity) -> Option<ViewId> {
        if !source.contains(node) {
            return None;
        }
        let parent_view = self.registry.get(source.parent(node)?)?;
        self.view.is_attached(parent_view).then_some(parent_view)
    }
}

impl NodeObserver for TreeMirror {
    fn on_child_added(
        &mut self,
        source: &mut dyn SceneSource,
        parent: Entity,
        child: Entity,
    ) -> Result<(), MirrorError> {
        let parent_view = self.registry.get(parent).ok_or_else(|| MirrorError::stale(parent, "ChildAdded"))?;
        self.pending_removal.retain(|pending| *pending != child);

        if let Some(child_view) = self.registry.get(child) {
            if self.view.parent(child_view) == Some(parent_view) {
                return Ok(());
            }
            if !self.view.attach(child_view, Some(parent_view)) {
                return Err(MirrorError::Cycle { node: child });
            }
            trace!(target: "mirror", "moved {child:?} under {parent:?}");
            return Ok(());
        }

        let child_view = self.build(source, child).ok_or_else(|| MirrorError::stale(child, "ChildAdded"))?;
        if !self.view.attach(child_view, Some(parent_view)) {
            return Err(MirrorError::Cycle { node: child });
        }
        trace!(target: "mirror", "mirrored new {child:?} under {parent:?}");
        Ok(())
    }

    fn on_child_removed(
        &mut self,
        _source: &mut dyn SceneSource,
        parent: Entity,
        child: Entity,
    ) -> Result<(), MirrorError> {
        let parent_view = self.registry.get(parent).ok_or_else(|| MirrorError::stale(parent, "ChildRemoved"))?;
        let child_view = self.registry.get(child).ok_or_else(|| MirrorError::stale(child, "ChildRemoved"))?;
        if self.view.parent(child_view) != Some(parent_view) {
            // Already moved by a later ChildAdded that arrived through another subtree.
            return Ok(());
        }
        self.view.detach(child_view);
        if !self.pending_removal.contains(&child) {
            self.pending_removal.push(child);
        }
        trace!(target: "mirror", "detached {child:?} from {parent:?}");
        Ok(())
    }

    fn on_changed(&mut self, source: &mut dyn SceneSource, node: Entity, property: &str) -> Result<(), MirrorError> {
        let view = self.registry.get(node).ok_or_else(|| MirrorError::stale(node, "Changed"))?;
        match property {
            NAME_PROPERTY => {
                let Some(name) = source.name(node) else {
                    return Err(MirrorError::stale(node, "Changed"));
                };
                self.view.set_label(view, name);
            }
            PARENT_PROPERTY | PARENT_LOCKED_PROPERTY => {
                let flags = self.flags_for(source, node);
                self.view.set_flags(view, flags);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassRegistry;
    use crate::ecs::EcsWorld;
    use crate::icons::{Icon, MemoryIconSource};

    fn mirror_with_icons() -> TreeMirror {
        let icons = MemoryIconSource::new().with("Instance", Icon::solid("Instance", [0, 0, 0, 255], 1));
        TreeMirror::new(ClassIconResolver::new(Box::new(ClassRegistry::with_builtin_classes()), Box::new(icons)))
    }

    fn pump(mirror: &mut TreeMirror, ecs: &mut EcsWorld) -> SettleReport {
        for event in ecs.drain_events() {
            let _ = event.dispatch(mirror, ecs);
        }
        mirror.settle(ecs)
    }

    #[test]
    fn mirror_is_idempotent_and_subscribes() {
        let mut ecs = EcsWorld::with_default_services();
        let root = ecs.root().expect("root");
        let mut mirror = mirror_with_icons();
        let first = mirror.mirror(&mut ecs, root).expect("root view");
        let second = mirror.mirror(&mut ecs, root).expect("root view");
        assert_eq!(first, second);
        assert_eq!(mirror.view().roots(), &[first]);
        assert_eq!(mirror.registry().len(), ecs.instance_count());
        assert!(ecs.is_subscribed(root));
        let workspace = ecs.find_path("Workspace").expect("workspace");
        let view = mirror.view_of(workspace).expect("workspace view");
        assert_eq!(mirror.view().get(view).map(|node| node.icon().is_empty()), Some(false));
    }

    #[test]
    fn rename_relabels_row() {
        let mut ecs = EcsWorld::with_default_services();
        let root = ecs.root().expect("root");
        let mut mirror = mirror_with_icons();
        mirror.mirror(&mut ecs, root);
        let lighting = ecs.find_path("Lighting").expect("lighting");
        ecs.set_name(lighting, "Sunlight");
        pump(&mut mirror, &mut ecs);
        let view = mirror.view_of(lighting).expect("view");
        assert_eq!(mirror.view().get(view).map(|node| node.label()), Some("Sunlight"));
    }

    #[test]
    fn parent_lock_clears_draggable_flag() {
        let mut ecs = EcsWorld::with_default_services();
        let root = ecs.root().expect("root");
        let mut mirror = mirror_with_icons();
        mirror.mirror(&mut ecs, root);
        let workspace = ecs.find_path("Workspace").expect("workspace");
        ecs.set_parent_locked(workspace, true);
        pump(&mut mirror, &mut ecs);
        let flags = mirror.view().get(mirror.view_of(workspace).expect("view")).expect("node").flags();
        assert!(!flags.contains(ViewFlags::DRAGGABLE));
        assert!(flags.contains(ViewFlags::SELECTABLE));
    }

    #[test]
    fn pinned_classes_are_not_draggable() {
        let mut ecs = EcsWorld::with_default_services();
        let root = ecs.root().expect("root");
        let workspace = ecs.find_path("Workspace").expect("workspace");
        let part = ecs.spawn_instance("Part", "Part", Some(workspace)).expect("spawn");
        let mut mirror = mirror_with_icons().with_pinned_classes(["Workspace"]);
        mirror.mirror(&mut ecs, root);
        let flags_of = |node| mirror.view().get(mirror.view_of(node).expect("view")).expect("node").flags();
        assert!(!flags_of(workspace).contains(ViewFlags::DRAGGABLE));
        assert!(flags_of(part).contains(ViewFlags::DRAGGABLE));
    }

    #[test]
    fn stale_events_are_reported_not_fatal() {
        let mut ecs = EcsWorld::with_default_services();
        let mut mirror = mirror_with_icons();
        let ghost = Entity::from_raw(4242);
        let err = mirror.on_changed(&mut ecs, ghost, "Name").unwrap_err();
        assert!(err.is_stale());
        let err = mirror.on_child_added(&mut ecs, ghost, ghost).unwrap_err();
        assert!(err.is_stale());
    }

    #[test]
    fn removal_without_readd_is_settled_away() {
        let mut ecs = EcsWorld::with_default_services();
        let root = ecs.root().expect("root");
        let workspace = ecs.find_path("Workspace").expect("workspace");
        let part = ecs.spawn_instance("Part", "Part", Some(workspace)).expect("spawn");
        let mut mirror = mirror_with_icons();
        mirror.mirror(&mut ecs, root);

        ecs.set_parent(part, None).expect("unparent");
        let report = pump(&mut mirror, &mut ecs);
        assert_eq!(report.removed, vec![part]);
        assert!(mirror.view_of(part).is_none());
        assert!(ecs.contains(part), "unparenting keeps the engine instance alive");
        assert!(!ecs.is_subscribed(part));

        ecs.set_parent(part, Some(workspace)).expect("reparent");
        pump(&mut mirror, &mut ecs);
        assert!(mirror.view_of(part).is_some(), "re-entering the tree mirrors it again");
    }
}
