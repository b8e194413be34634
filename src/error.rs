use bevy_ecs::prelude::Entity;
use thiserror::Error;

/// Recoverable conditions raised while keeping the explorer in sync.
///
/// None of these are fatal. The session logs them and carries on, so a late
/// notification or a protected service degrades into a no-op instead of a crash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    #[error("{event} references instance {node:?} which has no view node")]
    StaleReference { node: Entity, event: &'static str },
    #[error("instance {node:?} of protected class '{class_name}' cannot be deleted")]
    ProtectedNode { node: Entity, class_name: String },
    #[error("attaching instance {node:?} would make it its own ancestor")]
    Cycle { node: Entity },
}

impl MirrorError {
    pub fn stale(node: Entity, event: &'static str) -> Self {
        MirrorError::StaleReference { node, event }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, MirrorError::StaleReference { .. })
    }
}
