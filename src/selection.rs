use crate::error::MirrorError;
use crate::mirror::{ViewId, ViewTree};
use crate::source::{PropertyPanel, SceneSource};
use bevy_ecs::prelude::Entity;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Services the engine cannot run without; user deletes skip them.
pub const DEFAULT_PROTECTED_CLASSES: &[&str] =
    &["Workspace", "Lighting", "ContentProvider", "LogService", "RunService", "ReplicatedFirst"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub destroyed: Vec<Entity>,
    pub skipped: Vec<MirrorError>,
}

/// Tracks which instances are selected in the explorer and keeps the
/// property panel and the delete action in step with it.
pub struct SelectionController {
    selected: Vec<Entity>,
    protected: BTreeSet<String>,
    delete_enabled: bool,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_CLASSES.iter().copied())
    }
}

impl SelectionController {
    pub fn new<I, S>(protected_classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: Vec::new(),
            protected: protected_classes.into_iter().map(Into::into).collect(),
            delete_enabled: false,
        }
    }

    pub fn nodes(&self) -> &[Entity] {
        &self.selected
    }

    pub fn contains(&self, node: Entity) -> bool {
        self.selected.contains(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn delete_enabled(&self) -> bool {
        self.delete_enabled
    }

    pub fn is_protected(&self, class_name: &str) -> bool {
        self.protected.contains(class_name)
    }

    pub fn protected_classes(&self) -> impl Iterator<Item = &str> {
        self.protected.iter().map(String::as_str)
    }

    /// Rebuilds the selection from the explorer's selected rows and pushes it to the panel.
    pub fn on_selection_changed(
        &mut self,
        source: &dyn SceneSource,
        view: &ViewTree,
        selected_views: &[ViewId],
        panel: &mut dyn PropertyPanel,
    ) {
        self.selected.clear();
        for &row in selected_views {
            let Some(node) = view.instance(row) else {
                continue;
            };
            if !source.contains(node) {
                debug!(target: "selection", "dropping dead instance {node:?} from selection");
                continue;
            }
            if !self.selected.contains(&node) {
                self.selected.push(node);
            }
        }
        panel.update_selection(&self.selected);
        self.delete_enabled = !self.selected.is_empty();
        debug!(target: "selection", "{} instance(s) selected", self.selected.len());
    }

    /// Forwards a property change of a selected instance to the panel.
    /// Returns true when the panel was notified.
    pub fn on_property_changed(&self, node: Entity, property: &str, panel: &mut dyn PropertyPanel) -> bool {
        if !self.contains(node) {
            return false;
        }
        panel.update_value(property);
        true
    }

    /// Destroys every selected instance whose class is not protected.
    ///
    /// The selection itself is left alone: destruction comes back as `ChildRemoved`
    /// notifications and the explorer drops the rows from there.
    pub fn delete_selection(&self, source: &mut dyn SceneSource) -> DeleteReport {
        let mut report = DeleteReport::default();
        for &node in &self.selected {
            let Some(class_name) = source.class_name(node).map(str::to_string) else {
                continue;
            };
            if self.is_protected(&class_name) {
                let skipped = MirrorError::ProtectedNode { node, class_name };
                info!(target: "selection", "{skipped}");
                report.skipped.push(skipped);
                continue;
            }
            if source.destroy(node) {
                report.destroyed.push(node);
            } else {
                warn!(target: "selection", "instance {node:?} was already gone when deleting");
            }
        }
        report
    }
}
