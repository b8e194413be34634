pub mod classes;
pub mod cli;
pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
#[cfg(feature = "editor")]
pub mod explorer_ui;
pub mod icons;
pub mod mirror;
pub mod panel;
pub mod scene;
pub mod selection;
pub mod session;
pub mod source;

pub use ecs::EcsWorld;
pub use error::MirrorError;
pub use events::NodeEvent;
pub use mirror::{TreeMirror, ViewId, ViewTree};
pub use selection::SelectionController;
pub use session::{ExplorerSession, PumpReport};
pub use source::{NodeObserver, PropertyPanel, SceneSource};
