//! Presentation-side mirror of the engine's instance tree.

mod registry;
mod tree;
mod view;

pub use registry::NodePresentationRegistry;
pub use tree::{SettleReport, TreeMirror};
pub use view::{ViewFlags, ViewId, ViewNode, ViewTree};
