pub use instance_mirror::*;

pub mod app;
pub mod logging;

pub use app::{Command, ConsoleKind, StudioApp};
