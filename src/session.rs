use crate::classes::ClassRegistry;
use crate::config::StudioConfig;
use crate::ecs::{EcsWorld, NAME_PROPERTY};
use crate::error::MirrorError;
use crate::events::NodeEvent;
use crate::icons::{ClassIconResolver, DirectoryIconSource, IconSource, MemoryIconSource};
use crate::mirror::{SettleReport, TreeMirror, ViewId};
use crate::selection::{DeleteReport, SelectionController};
use crate::source::{PropertyPanel, SceneSource};
use bevy_ecs::prelude::Entity;
use tracing::{debug, info, warn};

/// Outcome of one notification batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PumpReport {
    pub dispatched: usize,
    pub stale: usize,
    pub refused: Vec<MirrorError>,
    pub settled: SettleReport,
    pub selection_refreshed: bool,
}

/// The explorer as a whole: tree mirror, selection and the panel wiring between them.
pub struct ExplorerSession {
    mirror: TreeMirror,
    selection: SelectionController,
    root: Option<Entity>,
    /// Set when the root has no row of its own and its children are top-level rows.
    hidden_root: Option<Entity>,
    title: String,
}

impl ExplorerSession {
    pub fn new(mirror: TreeMirror, selection: SelectionController) -> Self {
        Self { mirror, selection, root: None, hidden_root: None, title: String::new() }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        let mut classes = ClassRegistry::with_builtin_classes();
        classes.extend(&config.classes);
        for class_name in config.classes.keys() {
            if !classes.is_a(class_name, "Instance") {
                warn!(target: "config", "class {class_name} does not derive from Instance, it may show no icon");
            }
        }
        let source: Box<dyn IconSource> = match &config.icons.directory {
            Some(directory) => {
                if !directory.is_dir() {
                    warn!(target: "icons", "icon directory {} does not exist", directory.display());
                }
                Box::new(DirectoryIconSource::new(directory.clone(), config.icons.extension.clone()))
            }
            None => Box::new(MemoryIconSource::new()),
        };
        let icons = ClassIconResolver::new(Box::new(classes), source);
        let protected = &config.explorer.protected_classes;
        let mirror = TreeMirror::new(icons).with_pinned_classes(protected.iter().cloned());
        Self::new(mirror, SelectionController::new(protected.iter().cloned()))
    }

    pub fn mirror(&self) -> &TreeMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut TreeMirror {
        &mut self.mirror
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    /// Starts mirroring `root`. When `show_root` is false each child of `root` becomes a top-level row.
    pub fn attach(&mut self, source: &mut dyn SceneSource, root: Entity, show_root: bool) -> Vec<ViewId> {
        self.root = Some(root);
        self.title = source.name(root).unwrap_or_default().to_string();
        let rows = if show_root {
            self.hidden_root = None;
            self.mirror.mirror(source, root).into_iter().collect()
        } else {
            self.hidden_root = Some(root);
            self.mirror.set_root(root);
            source.subscribe(root);
            source.children(root).into_iter().filter_map(|child| self.mirror.mirror(source, child)).collect()
        };
        info!(target: "mirror", "explorer attached with {} row(s)", self.mirror.view().len());
        rows
    }

    /// Name of the attached root, kept current through its rename notifications.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Drains the engine's queued notifications and applies them as one batch.
    pub fn pump(&mut self, engine: &mut EcsWorld, panel: &mut dyn PropertyPanel) -> PumpReport {
        let events = engine.drain_events();
        self.process(engine, events, panel)
    }

    /// Applies a batch of notifications, settles removals, then refreshes the selection if rows went away.
    pub fn process<I>(&mut self, source: &mut dyn SceneSource, events: I, panel: &mut dyn PropertyPanel) -> PumpReport
    where
        I: IntoIterator<Item = NodeEvent>,
    {
        let mut report = PumpReport::default();
        for event in events {
            report.dispatched += 1;
            let outcome = match (&event, self.hidden_root) {
                (NodeEvent::ChildAdded { parent, child }, Some(hidden)) if *parent == hidden => {
                    self.mirror.mirror(source, *child).map(|_| ()).ok_or_else(|| MirrorError::stale(*child, "ChildAdded"))
                }
                (NodeEvent::ChildRemoved { parent, child }, Some(hidden)) if *parent == hidden => {
                    self.mirror.release(*child)
                }
                (NodeEvent::Changed { node, .. }, Some(hidden)) if *node == hidden => Ok(()),
                _ => event.dispatch(&mut self.mirror, source),
            };
            match outcome {
                Ok(()) => {}
                Err(err) if err.is_stale() => {
                    debug!(target: "mirror", "ignored {event}: {err}");
                    report.stale += 1;
                    continue;
                }
                Err(err) => {
                    warn!(target: "mirror", "refused {event}: {err}");
                    report.refused.push(err);
                    continue;
                }
            }
            if let NodeEvent::Changed { node, property } = &event {
                self.selection.on_property_changed(*node, property, panel);
                if property == NAME_PROPERTY && Some(*node) == self.root {
                    self.title = source.name(*node).unwrap_or_default().to_string();
                    debug!(target: "mirror", "root renamed, title is now {:?}", self.title);
                }
            }
        }
        report.settled = self.mirror.settle(source);
        report.selection_refreshed = self.sync_selection(source, panel);
        report
    }

    /// Selects a row, replacing or extending the current selection.
    pub fn select(
        &mut self,
        source: &dyn SceneSource,
        row: ViewId,
        additive: bool,
        panel: &mut dyn PropertyPanel,
    ) -> bool {
        let changed = self.mirror.view_mut().select(row, additive);
        self.sync_selection(source, panel);
        changed
    }

    /// Selects the rows of the given instances; instances without a row are ignored.
    pub fn select_nodes(&mut self, source: &dyn SceneSource, nodes: &[Entity], panel: &mut dyn PropertyPanel) -> usize {
        self.mirror.view_mut().clear_selection();
        let mut selected = 0;
        for &node in nodes {
            if let Some(row) = self.mirror.view_of(node) {
                if self.mirror.view_mut().select(row, true) {
                    selected += 1;
                }
            }
        }
        self.sync_selection(source, panel);
        selected
    }

    pub fn clear_selection(&mut self, source: &dyn SceneSource, panel: &mut dyn PropertyPanel) {
        self.mirror.view_mut().clear_selection();
        self.sync_selection(source, panel);
    }

    /// Forwards a pending widget selection change to the controller.
    pub fn sync_selection(&mut self, source: &dyn SceneSource, panel: &mut dyn PropertyPanel) -> bool {
        if !self.mirror.view_mut().take_selection_changed() {
            return false;
        }
        let rows = self.mirror.view().selected().to_vec();
        self.selection.on_selection_changed(source, self.mirror.view(), &rows, panel);
        true
    }

    /// Destroys the deletable part of the selection. The rows disappear on the next pump.
    pub fn delete_selection(&mut self, source: &mut dyn SceneSource) -> DeleteReport {
        let report = self.selection.delete_selection(source);
        info!(
            target: "selection",
            "deleted {} instance(s), skipped {} protected",
            report.destroyed.len(),
            report.skipped.len()
        );
        report
    }
}
