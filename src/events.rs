use bevy_ecs::prelude::{Entity, Resource};
use std::fmt;

use crate::error::MirrorError;
use crate::source::{NodeObserver, SceneSource};

/// Structural and property notifications emitted by an instance.
///
/// `ChildAdded`/`ChildRemoved` are raised by the parent, `Changed` by the node whose
/// property changed. Destruction has no dedicated variant: it shows up as a `ChildRemoved`
/// on the former parent and the destroyed node emits nothing afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    ChildAdded { parent: Entity, child: Entity },
    ChildRemoved { parent: Entity, child: Entity },
    Changed { node: Entity, property: String },
}

impl NodeEvent {
    pub fn changed(node: Entity, property: impl Into<String>) -> Self {
        NodeEvent::Changed { node, property: property.into() }
    }

    /// The instance that raised the notification.
    pub fn source(&self) -> Entity {
        match self {
            NodeEvent::ChildAdded { parent, .. } | NodeEvent::ChildRemoved { parent, .. } => *parent,
            NodeEvent::Changed { node, .. } => *node,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NodeEvent::ChildAdded { .. } => "ChildAdded",
            NodeEvent::ChildRemoved { .. } => "ChildRemoved",
            NodeEvent::Changed { .. } => "Changed",
        }
    }

    /// Routes the notification to the matching observer callback.
    pub fn dispatch<O>(&self, observer: &mut O, source: &mut dyn SceneSource) -> Result<(), MirrorError>
    where
        O: NodeObserver + ?Sized,
    {
        match self {
            NodeEvent::ChildAdded { parent, child } => observer.on_child_added(source, *parent, *child),
            NodeEvent::ChildRemoved { parent, child } => observer.on_child_removed(source, *parent, *child),
            NodeEvent::Changed { node, property } => observer.on_changed(source, *node, property),
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeEvent::ChildAdded { parent, child } => {
                write!(f, "ChildAdded parent={} child={}", parent.index(), child.index())
            }
            NodeEvent::ChildRemoved { parent, child } => {
                write!(f, "ChildRemoved parent={} child={}", parent.index(), child.index())
            }
            NodeEvent::Changed { node, property } => write!(f, "Changed node={} property={property}", node.index()),
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<NodeEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: NodeEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<NodeEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
