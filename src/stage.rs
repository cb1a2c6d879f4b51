//! Stage Controller (spec §4.F): stage-manager mode, group composition,
//! cycling, and debounced incremental event handling.

use crate::config::StageConfig;
use crate::error::{ControllerError, Result};
use crate::model::{Address, LayoutMode, Monitor, MonitorRect, PositionRecord, Window, WindowGroup};
use crate::pin::WindowController;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Chunk `clients` into groups of up to `max_group_size`, first window in
/// each chunk becomes the group's main window (spec §4.F.1).
pub fn create_window_groups(clients: &[Window], max_group_size: usize) -> Vec<WindowGroup> {
    clients
        .chunks(max_group_size.max(1))
        .map(|chunk| WindowGroup {
            main_window: chunk[0].clone(),
            side_windows: chunk[1..].to_vec(),
        })
        .collect()
}

fn find_monitor<'a>(monitors: &'a [Monitor], hint: Option<&str>, ws: i64) -> Option<&'a Monitor> {
    match hint {
        Some(name) => monitors.iter().find(|m| m.name == name),
        None => monitors.iter().find(|m| m.active_workspace.id == ws),
    }
}

#[derive(Default)]
struct WorkspaceState {
    mode: LayoutMode,
    groups: Vec<WindowGroup>,
    active_group_index: usize,
    ledger: Vec<PositionRecord>,
}

/// A stage-entry deferred because it was requested from a workspace other
/// than the one the window actually opened on (spec §4.F.4: "queue the
/// operation keyed by the event's monitor hint").
struct PendingEntry {
    workspace_id: i64,
    monitor_hint: Option<String>,
}

pub struct StageController {
    windows: Arc<WindowController>,
    config: StageConfig,
    debounce: Duration,
    states: Mutex<HashMap<i64, WorkspaceState>>,
    tracked_workspace: Mutex<Option<i64>>,
    pending: Mutex<VecDeque<PendingEntry>>,
    last_event_at: Mutex<Option<Instant>>,
}

impl StageController {
    pub fn new(windows: Arc<WindowController>, config: StageConfig, debounce_ms: u64) -> Self {
        Self {
            windows,
            config,
            debounce: Duration::from_millis(debounce_ms),
            states: Mutex::new(HashMap::new()),
            tracked_workspace: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
            last_event_at: Mutex::new(None),
        }
    }

    pub fn mode_of(&self, ws: i64) -> LayoutMode {
        self.states.lock().get(&ws).map(|s| s.mode).unwrap_or_default()
    }

    fn ledger_len(&self, ws: i64) -> usize {
        self.states.lock().get(&ws).map(|s| s.ledger.len()).unwrap_or(0)
    }

    // ---- Mode transitions (§4.F.3) ------------------------------------

    /// Enter stage-manager mode for `ws` (or the active window's workspace
    /// if `ws` is `None`), rebuilding groups from a fresh `clients` fetch
    /// and applying the layout. Retries up to
    /// `config.apply_retry_attempts` times if the ledger length doesn't
    /// change across the apply (spec §4.F.6).
    pub async fn enter_stage_manager(&self, ws: Option<i64>, monitor_hint: Option<String>) -> Result<()> {
        let ws = match ws {
            Some(ws) => ws,
            None => match self.windows.get_active_window().await? {
                Some(w) => w.workspace_id(),
                None => return Ok(()),
            },
        };
        *self.tracked_workspace.lock() = Some(ws);

        {
            let mut states = self.states.lock();
            states.entry(ws).or_default().mode = LayoutMode::StageManager;
        }

        self.reload_groups(ws).await?;

        let before = self.ledger_len(ws);
        self.apply_stage_layout(ws, monitor_hint.as_deref()).await?;

        if self.ledger_len(ws) == before {
            for attempt in 0..self.config.apply_retry_attempts {
                tokio::time::sleep(Duration::from_secs(self.config.apply_retry_spacing_secs)).await;
                self.apply_stage_layout(ws, monitor_hint.as_deref()).await?;
                if self.ledger_len(ws) != before {
                    return Ok(());
                }
                log::debug!("stage layout retry {} for workspace {} made no progress", attempt + 1, ws);
            }
            log::warn!("giving up re-applying stage layout for workspace {} after {} retries", ws, self.config.apply_retry_attempts);
        }
        Ok(())
    }

    /// Leave stage-manager mode: tile every grouped window and drop the
    /// workspace's groups.
    pub async fn exit_stage_manager(&self, ws: i64) -> Result<()> {
        let windows: Vec<Window> = {
            let states = self.states.lock();
            states
                .get(&ws)
                .map(|s| s.groups.iter().flat_map(|g| g.all().cloned().collect::<Vec<_>>()).collect())
                .unwrap_or_default()
        };
        for w in &windows {
            self.windows.dispatch_raw(&format!("settiled address:{}", w.address)).await?;
        }
        let mut states = self.states.lock();
        let state = states.entry(ws).or_default();
        state.groups.clear();
        state.ledger.clear();
        state.mode = LayoutMode::Tiled;
        Ok(())
    }

    pub async fn toggle_layout_mode(&self, ws: i64) -> Result<()> {
        match self.mode_of(ws) {
            LayoutMode::Tiled => self.enter_stage_manager(Some(ws), None).await,
            LayoutMode::StageManager => self.exit_stage_manager(ws).await,
        }
    }

    async fn reload_groups(&self, ws: i64) -> Result<()> {
        self.windows.invalidate_clients().await;
        let clients = self.windows.windows_in_workspace(ws).await?;
        let groups = create_window_groups(&clients, self.config.max_group_size);
        let mut states = self.states.lock();
        let state = states.entry(ws).or_default();
        state.groups = groups;
        if state.active_group_index >= state.groups.len() {
            state.active_group_index = 0;
        }
        Ok(())
    }

    // ---- Layout application (§4.F.2) ----------------------------------

    /// Apply the stage-manager layout for `ws`'s current groups. No-op (no
    /// dispatches) if there are no groups.
    pub async fn apply_stage_layout(&self, ws: i64, monitor_hint: Option<&str>) -> Result<()> {
        let (groups, active_index) = {
            let states = self.states.lock();
            match states.get(&ws) {
                Some(s) if !s.groups.is_empty() => (s.groups.clone(), s.active_group_index),
                _ => return Ok(()),
            }
        };

        let monitors = self.windows.monitors().await?;
        let Some(monitor) = find_monitor(&monitors, monitor_hint, ws) else {
            return Ok(());
        };
        let rect = MonitorRect::from(monitor);
        let monitor_name = monitor.name.clone();

        for group in &groups {
            for w in group.all() {
                self.windows.dispatch_raw(&format!("setfloating address:{}", w.address)).await?;
            }
        }

        let active = &groups[active_index];
        let main_w = (rect.width as f64 * self.config.main_width_fraction) as i32;
        let main_h = (rect.height as f64 * self.config.main_height_fraction) as i32;
        let main_x = rect.x + (rect.width - main_w) - self.config.main_right_padding;
        let main_y = rect.y + (rect.height - main_h) / 2;

        self.move_and_resize(&active.main_window.address, main_x, main_y, main_w, main_h).await?;
        self.windows
            .dispatch_raw(&format!("alterzorder top address:{}", active.main_window.address))
            .await?;
        self.windows.focus(&active.main_window.address).await?;

        let mini_w = (rect.width as f64 * self.config.mini_width_fraction) as i32;
        let mini_h = (rect.height as f64 * self.config.mini_height_fraction) as i32;
        let mut mini_windows: Vec<&Window> = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            if i != active_index {
                mini_windows.push(&group.main_window);
            }
            mini_windows.extend(group.side_windows.iter());
        }

        let max_per_col = (((rect.height - rect.y) / (mini_h + self.config.mini_vertical_gap)).max(1)) as usize;
        let mut ledger = Vec::with_capacity(mini_windows.len());
        for (i, w) in mini_windows.iter().enumerate() {
            let (x, y) = mini_slot_position(&self.config, rect, i, max_per_col, mini_w, mini_h);
            self.move_and_resize(&w.address, x, y, mini_w, mini_h).await?;
            ledger.push(PositionRecord {
                address: w.address.clone(),
                x,
                y,
                w: mini_w,
                h: mini_h,
                monitor: monitor_name.clone(),
            });
        }

        self.states.lock().entry(ws).or_default().ledger = ledger;
        Ok(())
    }

    async fn move_and_resize(&self, address: &Address, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        self.windows
            .dispatch_raw(&format!("movewindowpixel exact {} {},address:{}", x, y, address))
            .await?;
        self.windows
            .dispatch_raw(&format!("resizewindowpixel exact {} {},address:{}", w, h, address))
            .await?;
        Ok(())
    }

    // ---- Cycling (§4.F.5) ----------------------------------------------

    /// Rotate the active group's window order one position left, focus the
    /// new main, and re-apply the layout. No-op unless `ws` is in
    /// stage-manager mode with at least one group.
    pub async fn cycle_main_window(&self, ws: i64) -> Result<()> {
        if self.mode_of(ws) != LayoutMode::StageManager {
            return Ok(());
        }
        let new_main_addr = {
            let mut states = self.states.lock();
            let Some(state) = states.get_mut(&ws) else {
                return Ok(());
            };
            if state.groups.is_empty() {
                return Ok(());
            }
            let idx = state.active_group_index;
            let rotated = state.groups[idx].rotate_main_left();
            let addr = rotated.main_window.address.clone();
            state.groups[idx] = rotated;
            addr
        };
        self.windows.focus(&new_main_addr).await?;
        self.apply_stage_layout(ws, None).await
    }

    // ---- Incremental event handling (§4.F.4) ---------------------------

    /// Handle an `openwindow` event. `address` is the first comma-separated
    /// field of the event payload.
    pub async fn on_open_window(&self, address: &str) -> Result<()> {
        if !self.debounce_ok() {
            return Ok(());
        }
        let Some(active) = self.windows.get_active_window().await? else {
            return Ok(());
        };
        let current_ws = active.workspace_id();

        let tracked = *self.tracked_workspace.lock();
        if tracked != Some(current_ws) {
            if let Some(tracked_ws) = tracked {
                log::debug!("{}", ControllerError::StateDesync { tracked: tracked_ws, active: current_ws });
            }
            self.pending.lock().push_back(PendingEntry {
                workspace_id: current_ws,
                monitor_hint: None,
            });
            return Ok(());
        }
        if self.mode_of(current_ws) != LayoutMode::StageManager {
            return Ok(());
        }

        self.reload_groups(current_ws).await?;

        let monitors = self.windows.monitors().await?;
        let Some(monitor) = find_monitor(&monitors, None, current_ws) else {
            return Ok(());
        };
        let rect = MonitorRect::from(monitor);
        let monitor_name = monitor.name.clone();
        let mini_w = (rect.width as f64 * self.config.mini_width_fraction) as i32;
        let mini_h = (rect.height as f64 * self.config.mini_height_fraction) as i32;
        let max_per_col = (((rect.height - rect.y) / (mini_h + self.config.mini_vertical_gap)).max(1)) as usize;

        let next_index = self.ledger_len(current_ws);
        let (x, y) = mini_slot_position(&self.config, rect, next_index, max_per_col, mini_w, mini_h);

        self.windows.dispatch_raw(&format!("setfloating address:{}", address)).await?;
        self.move_and_resize(&Address::from(address), x, y, mini_w, mini_h).await?;
        self.windows.invalidate_clients().await;
        self.windows
            .dispatch_raw(&format!("alterzorder bottom address:{}", address))
            .await?;

        self.states.lock().entry(current_ws).or_default().ledger.push(PositionRecord {
            address: Address::from(address),
            x,
            y,
            w: mini_w,
            h: mini_h,
            monitor: monitor_name,
        });
        Ok(())
    }

    /// Handle a `closewindow` event: reload groups and repack the mini
    /// stack so surviving minis compact top-to-bottom per column.
    pub async fn on_close_window(&self, address: &str) -> Result<()> {
        if !self.debounce_ok() {
            return Ok(());
        }
        let Some(active) = self.windows.get_active_window().await? else {
            return Ok(());
        };
        let current_ws = active.workspace_id();

        let tracked = *self.tracked_workspace.lock();
        if tracked != Some(current_ws) {
            if let Some(tracked_ws) = tracked {
                log::debug!("{}", ControllerError::StateDesync { tracked: tracked_ws, active: current_ws });
            }
            self.pending.lock().push_back(PendingEntry {
                workspace_id: current_ws,
                monitor_hint: None,
            });
            return Ok(());
        }
        if self.mode_of(current_ws) != LayoutMode::StageManager {
            return Ok(());
        }

        self.reload_groups(current_ws).await?;
        self.apply_stage_layout(current_ws, None).await?;
        let _ = address; // the closed window is simply absent from the reloaded groups
        Ok(())
    }

    /// Run every queued stage-entry deferred by a workspace mismatch
    /// (spec §4.F.4: executed when a later `workspace` event fires).
    pub async fn execute_queued_tasks(&self) -> Result<()> {
        loop {
            let next = self.pending.lock().pop_front();
            let Some(entry) = next else { break };
            self.enter_stage_manager(Some(entry.workspace_id), entry.monitor_hint).await?;
        }
        Ok(())
    }

    fn debounce_ok(&self) -> bool {
        let mut last = self.last_event_at.lock();
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.debounce {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

fn mini_slot_position(config: &StageConfig, rect: MonitorRect, index: usize, max_per_col: usize, mini_w: i32, mini_h: i32) -> (i32, i32) {
    let column = (index / max_per_col) as i32;
    let row = (index % max_per_col) as i32;
    let x = rect.x + column * (mini_w + config.mini_horizontal_gap);
    let y = rect.y + row * (mini_h + config.mini_vertical_gap);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkspaceRef;

    fn window(addr: &str, ws: i64) -> Window {
        Window {
            address: Address::from(addr),
            class: "test".to_string(),
            workspace: WorkspaceRef { id: ws },
            at: (0, 0),
            size: (100, 100),
            floating: false,
            focus_history_id: 0,
        }
    }

    #[test]
    fn groups_of_up_to_ten() {
        let clients: Vec<Window> = (0..23).map(|i| window(&format!("0x{}", i), 4)).collect();
        let groups = create_window_groups(&clients, 10);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].side_windows.len(), 9);
        assert_eq!(groups[2].side_windows.len(), 2);
    }

    #[test]
    fn single_window_group_has_empty_side_windows() {
        let clients = vec![window("0xa", 4)];
        let groups = create_window_groups(&clients, 10);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].side_windows.is_empty());
    }

    #[test]
    fn mini_slot_wraps_to_next_column() {
        let config = StageConfig::default();
        let rect = MonitorRect {
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
        };
        let mini_h = (1080.0 * config.mini_height_fraction) as i32;
        let max_per_col = (1080 / (mini_h + config.mini_vertical_gap)) as usize;
        let (x0, _) = mini_slot_position(&config, rect, 0, max_per_col, 345, mini_h);
        let (x_next_col, y_wrapped) = mini_slot_position(&config, rect, max_per_col, max_per_col, 345, mini_h);
        assert_eq!(x0, 0);
        assert!(x_next_col > x0);
        assert_eq!(y_wrapped, 0);
    }

    #[test]
    fn max_per_col_accounts_for_monitor_y_offset() {
        // Spec §4.F.2 step 3: overflow at floor((SH - OY) / (MH + 30)), not
        // floor(SH / (MH + 30)); a monitor with a non-zero OY must wrap one
        // row earlier than an otherwise identical monitor at OY = 0.
        let config = StageConfig::default();
        let mini_h = (1080.0 * config.mini_height_fraction) as i32;
        let gap = config.mini_vertical_gap;

        let max_per_col_at_origin = (1080 / (mini_h + gap)).max(1) as usize;
        let offset_y = mini_h + gap; // shifts the usable height down by one row
        let max_per_col_offset = (((1080 - offset_y) / (mini_h + gap)).max(1)) as usize;

        assert_eq!(max_per_col_offset, max_per_col_at_origin - 1);
    }
}
