//! Command Resolver & Control Server strategy table (spec §4.G).
//!
//! Each control-socket request is `command [args…]`; `Dispatcher::dispatch`
//! resolves `command` against the closed strategy table below and invokes
//! it with whichever controller its `ControlMode` calls for.

use crate::error::{ControllerError, Result};
use crate::layout::LayoutController;
use crate::model::{Address, MonitorRect};
use crate::pin::{CycleDirection, WindowController};
use crate::stage::StageController;
use parking_lot::Mutex;
use std::sync::Arc;

/// Which controller a strategy needs passed to it (spec §4.G: "Each
/// strategy declares a *control mode*").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlMode {
    Window,
    Layout,
}

/// Bounded recent-focus history used by `toggle` to ping-pong between the
/// active window and whatever it focused before. Mirrors the original's
/// `WindowStack.resizeStack`: rather than evicting the oldest entry, the
/// whole stack is cleared once it would exceed the buffer size.
struct RecentFocusStack {
    stack: Vec<Address>,
}

const STACK_BUFFER_SIZE: usize = 20;

impl RecentFocusStack {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn prev(&self) -> Option<&Address> {
        self.stack.last()
    }

    fn push(&mut self, address: Address) {
        if self.stack.len() >= STACK_BUFFER_SIZE {
            self.stack.clear();
        }
        self.stack.push(address);
    }
}

/// Resolves control-socket commands to the window, layout and stage
/// controllers they operate on. One instance lives for the daemon's
/// lifetime; `recent_focus` is its only piece of strategy-local state.
pub struct Dispatcher {
    windows: Arc<WindowController>,
    layout: Arc<LayoutController>,
    stage: Arc<StageController>,
    recent_focus: Mutex<RecentFocusStack>,
}

impl Dispatcher {
    pub fn new(windows: Arc<WindowController>, layout: Arc<LayoutController>, stage: Arc<StageController>) -> Self {
        Self {
            windows,
            layout,
            stage,
            recent_focus: Mutex::new(RecentFocusStack::new()),
        }
    }

    /// Human-readable descriptions for `get_actions` (spec §4.G).
    pub fn available_actions() -> Vec<(&'static str, &'static str)> {
        vec![
            ("toggle", "Toggle between two windows"),
            ("lockpin", "Lock the current window"),
            ("toggle-lock", "Toggle between pinned windows"),
            ("switch-group", "Cycle the active pin group"),
            ("pin", "Pinning window for toggle"),
            ("generate-lock", "Generate window lock group"),
            ("toggle-float", "Toggle floating layout for the active workspace"),
            ("estage", "Toggle stage-manager mode for the active workspace"),
            ("cycle-stage", "Cycle the main window of the active stage group"),
            ("get_actions", "List available control-socket actions"),
        ]
    }

    /// The control mode each strategy declares (spec §4.G), used below to
    /// pick which controller the dispatcher hands the strategy.
    fn control_mode(command: &str) -> Option<ControlMode> {
        match command {
            "toggle" | "lockpin" | "toggle-lock" | "switch-group" | "pin" | "generate-lock" => Some(ControlMode::Window),
            "toggle-float" | "estage" | "cycle-stage" => Some(ControlMode::Layout),
            _ => None,
        }
    }

    /// Parse and run one control-socket request line. Returns the bytes to
    /// write back to the client, or `None` to close the connection with no
    /// payload (spec §6: "Reply: empty or JSON bytes").
    pub async fn dispatch(&self, line: &str) -> Option<Vec<u8>> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return None;
        };
        let args: Vec<&str> = parts.collect();

        let result = if command == "get_actions" {
            Ok(Some(self.get_actions()))
        } else {
            match Self::control_mode(command) {
                Some(ControlMode::Window) => self.dispatch_window(&self.windows, command, &args).await,
                Some(ControlMode::Layout) => self.dispatch_layout(&self.layout, &self.stage, command, &args).await,
                None => {
                    log::warn!("unknown command: {}", command);
                    Err(ControllerError::UnknownCommand(command.to_string()))
                }
            }
        };

        match result {
            Ok(payload) => payload,
            Err(ControllerError::MissingInput(msg)) => {
                println!("{}", msg);
                None
            }
            Err(e) => {
                log::warn!("command {} failed: {}", command, e);
                None
            }
        }
    }

    fn get_actions(&self) -> Vec<u8> {
        let map: std::collections::BTreeMap<&str, &str> = Self::available_actions().into_iter().collect();
        serde_json::to_vec(&map).unwrap_or_default()
    }

    // ---- window-mode strategies ----------------------------------------

    /// Run a window-mode strategy, passed the `WindowController` its
    /// `ControlMode` calls for.
    async fn dispatch_window(&self, windows: &WindowController, command: &str, args: &[&str]) -> Result<Option<Vec<u8>>> {
        match command {
            "toggle" => self.toggle(windows, args).await,
            "lockpin" => Self::lockpin(windows).await,
            "toggle-lock" => Self::toggle_lock(windows, args).await,
            "switch-group" => Self::switch_group(windows).await,
            "pin" => Self::pin(windows, args).await,
            "generate-lock" => Self::generate_lock(windows, args).await,
            other => unreachable!("control_mode routed {} to dispatch_window", other),
        }
    }

    /// Ping-pong focus between the window of class `args[0]` and whichever
    /// window was focused last time `toggle` ran (spec §4.G `toggle`).
    async fn toggle(&self, windows: &WindowController, args: &[&str]) -> Result<Option<Vec<u8>>> {
        let Some(class) = args.first() else {
            return Err(ControllerError::MissingInput("Must supply argument to toggle window".to_string()));
        };

        let Some(target) = windows.get_window_by_class(class).await? else {
            println!("Invalid window classname");
            return Ok(None);
        };

        let prev = self.recent_focus.lock().prev().cloned();
        match prev {
            None => {
                let Some(active) = windows.get_active_window().await? else {
                    return Ok(None);
                };
                self.recent_focus.lock().push(active.address);
                windows.focus(&target).await?;
            }
            Some(prev) => {
                windows.focus(&prev).await?;
                self.recent_focus.lock().push(target);
            }
        }
        Ok(None)
    }

    async fn lockpin(windows: &WindowController) -> Result<Option<Vec<u8>>> {
        windows.pin_current_window().await?;
        Ok(None)
    }

    async fn toggle_lock(windows: &WindowController, args: &[&str]) -> Result<Option<Vec<u8>>> {
        let direction = match args.first().copied().unwrap_or("forward") {
            "backward" => CycleDirection::Backward,
            _ => CycleDirection::Forward,
        };
        windows.toggle_within_group(direction).await?;
        Ok(None)
    }

    async fn switch_group(windows: &WindowController) -> Result<Option<Vec<u8>>> {
        windows.cycle_group();
        Ok(None)
    }

    /// Requires >=2 args (group name, window class) but — matching the
    /// original's behaviour, preserved per SPEC_FULL.md's open question —
    /// ignores their content and pins the active window's own class.
    async fn pin(windows: &WindowController, args: &[&str]) -> Result<Option<Vec<u8>>> {
        if args.len() < 2 {
            return Err(ControllerError::MissingInput("Must supply group name and window class.".to_string()));
        }
        windows.pin_current_window().await?;
        Ok(None)
    }

    async fn generate_lock(windows: &WindowController, args: &[&str]) -> Result<Option<Vec<u8>>> {
        windows.create_group(args.first().map(|s| s.to_string()));
        Ok(None)
    }

    // ---- layout-mode strategies -----------------------------------------

    /// Run a layout-mode strategy, passed the `LayoutController` and
    /// `StageController` its `ControlMode` calls for.
    async fn dispatch_layout(&self, layout: &LayoutController, stage: &StageController, command: &str, _args: &[&str]) -> Result<Option<Vec<u8>>> {
        match command {
            "toggle-float" => self.toggle_float(layout).await,
            "estage" => self.estage(stage).await,
            "cycle-stage" => self.cycle_stage(stage).await,
            other => unreachable!("control_mode routed {} to dispatch_layout", other),
        }
    }

    async fn toggle_float(&self, layout: &LayoutController) -> Result<Option<Vec<u8>>> {
        let Some(active) = self.windows.get_active_window().await? else {
            return Ok(None);
        };
        let ws = active.workspace_id();
        let Some(monitor) = self.monitor_for_workspace(ws).await? else {
            return Ok(None);
        };
        layout.toggle_float_mode(monitor).await?;
        Ok(None)
    }

    async fn estage(&self, stage: &StageController) -> Result<Option<Vec<u8>>> {
        let Some(active) = self.windows.get_active_window().await? else {
            return Ok(None);
        };
        stage.toggle_layout_mode(active.workspace_id()).await?;
        Ok(None)
    }

    async fn cycle_stage(&self, stage: &StageController) -> Result<Option<Vec<u8>>> {
        let Some(active) = self.windows.get_active_window().await? else {
            return Ok(None);
        };
        stage.cycle_main_window(active.workspace_id()).await?;
        Ok(None)
    }

    async fn monitor_for_workspace(&self, ws: i64) -> Result<Option<MonitorRect>> {
        let monitors = self.windows.monitors().await?;
        Ok(monitors
            .iter()
            .find(|m| m.active_workspace.id == ws)
            .map(MonitorRect::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_focus_stack_clears_instead_of_evicting() {
        let mut stack = RecentFocusStack::new();
        for i in 0..STACK_BUFFER_SIZE {
            stack.push(Address::from(format!("0x{}", i)));
        }
        assert_eq!(stack.prev(), Some(&Address::from(format!("0x{}", STACK_BUFFER_SIZE - 1))));
        stack.push(Address::from("0xnew"));
        // Pushing past the buffer size clears everything first, so only
        // the new entry remains.
        assert_eq!(stack.stack.len(), 1);
        assert_eq!(stack.prev(), Some(&Address::from("0xnew")));
    }

    #[test]
    fn available_actions_cover_every_control_socket_command() {
        let actions = Dispatcher::available_actions();
        for cmd in [
            "toggle",
            "lockpin",
            "toggle-lock",
            "switch-group",
            "pin",
            "generate-lock",
            "toggle-float",
            "estage",
            "cycle-stage",
            "get_actions",
        ] {
            assert!(actions.iter().any(|(name, _)| *name == cmd), "missing action {}", cmd);
        }
    }

    #[test]
    fn control_mode_covers_every_dispatched_command() {
        for cmd in ["toggle", "lockpin", "toggle-lock", "switch-group", "pin", "generate-lock"] {
            assert_eq!(Dispatcher::control_mode(cmd), Some(ControlMode::Window));
        }
        for cmd in ["toggle-float", "estage", "cycle-stage"] {
            assert_eq!(Dispatcher::control_mode(cmd), Some(ControlMode::Layout));
        }
        assert_eq!(Dispatcher::control_mode("get_actions"), None);
        assert_eq!(Dispatcher::control_mode("nonsense"), None);
    }
}
