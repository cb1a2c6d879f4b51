//! Data model shared by the window, layout and stage controllers.
//!
//! Mirrors the entities in the compositor's IPC JSON plus the controller's
//! own bookkeeping structures (pin groups, position ledger).

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// A compositor window address, e.g. `"0x55affd2b4c20"`.
///
/// The compositor hands these out as opaque hex strings; wrapping them keeps
/// them from being confused with window classes or monitor names at call
/// sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

/// A window as reported by `clients`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Window {
    pub address: Address,
    pub class: String,
    #[serde(rename = "workspace")]
    pub workspace: WorkspaceRef,
    pub at: (i32, i32),
    pub size: (i32, i32),
    #[serde(default)]
    pub floating: bool,
    #[serde(rename = "focusHistoryID", default)]
    pub focus_history_id: i64,
}

impl Window {
    pub fn x(&self) -> i32 {
        self.at.0
    }
    pub fn y(&self) -> i32 {
        self.at.1
    }
    pub fn w(&self) -> i32 {
        self.size.0
    }
    pub fn h(&self) -> i32 {
        self.size.1
    }
    pub fn workspace_id(&self) -> i64 {
        self.workspace.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WorkspaceRef {
    pub id: i64,
}

/// A monitor as reported by `monitors`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Monitor {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "activeWorkspace")]
    pub active_workspace: WorkspaceRef,
}

/// A monitor rectangle, stripped of everything the layout math doesn't need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorRect {
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
}

impl From<&Monitor> for MonitorRect {
    fn from(m: &Monitor) -> Self {
        MonitorRect {
            width: m.width,
            height: m.height,
            x: m.x,
            y: m.y,
        }
    }
}

/// One stage-manager group: a main window plus its side (mini) windows.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGroup {
    pub main_window: Window,
    pub side_windows: Vec<Window>,
}

impl WindowGroup {
    /// All windows in the group, main first.
    pub fn all(&self) -> impl Iterator<Item = &Window> {
        std::iter::once(&self.main_window).chain(self.side_windows.iter())
    }

    /// Rotate the group one position left: the first side window becomes
    /// main, the old main becomes the last side window. No-op on a group
    /// with no side windows.
    pub fn rotate_main_left(&self) -> WindowGroup {
        if self.side_windows.is_empty() {
            return self.clone();
        }
        let mut windows: Vec<Window> = self.all().cloned().collect();
        let new_main = windows.remove(0);
        windows.push(new_main);
        let new_main = windows.remove(0);
        WindowGroup {
            main_window: new_main,
            side_windows: windows,
        }
    }
}

/// A single entry in a workspace's stage-manager position ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub address: Address,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub monitor: String,
}

/// Layout mode of a single workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Tiled,
    StageManager,
}

/// In-memory, workspace-independent registry of named window groups users
/// cycle through with `toggle-lock` / `switch-group`.
#[derive(Debug, Default, Clone)]
pub struct PinRegistry {
    pub groups: HashMap<String, Vec<Address>>,
    pub group_orders: Vec<String>,
    pub group_states: HashMap<String, usize>,
    pub class_lookup: HashMap<String, Address>,
    pub current_group: Option<String>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}
