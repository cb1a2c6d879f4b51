//! eva-controller - stage-manager and pinned-group layout controller for Hyprland.
//!
//! The daemon (`eva-controllerd`, see `src/main.rs`) wires these modules
//! together: an IPC transport to the compositor's two Unix sockets, a
//! read-through state cache, an event router, a window/pin controller, a
//! float-layout controller, a stage-manager controller, and a Unix-socket
//! control server that resolves user commands to one of the above.

pub mod cache;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod ipc;
pub mod layout;
pub mod model;
pub mod notify;
pub mod pin;
pub mod stage;

pub use config::Config;
pub use error::{ControllerError, Result};
pub use ipc::Transport;
pub use layout::LayoutController;
pub use pin::WindowController;
pub use stage::StageController;
