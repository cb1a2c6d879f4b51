//! Layout Controller (spec §4.E): floating-layout geometry and the
//! tiled/floating toggle.

use crate::model::{Address, MonitorRect, Window};
use crate::pin::WindowController;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// A computed rectangle for one window, independent of how it gets applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub address: Address,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Bidirectional proximity links for one window (spec §4.E.2). `None` means
/// no neighbor within the threshold on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub left: Option<Address>,
    pub right: Option<Address>,
    pub top: Option<Address>,
    pub bottom: Option<Address>,
}

const NEIGHBOR_THRESHOLD: i32 = 50;

/// Build the left/right/top/bottom neighbor map for every window in
/// `windows`. Pure and diagnostics-only — no compositor I/O.
pub fn find_neighbors(windows: &[Window]) -> HashMap<Address, Neighbors> {
    let mut out: HashMap<Address, Neighbors> = HashMap::new();
    for w in windows {
        out.insert(w.address.clone(), Neighbors::default());
    }
    for a in windows {
        for b in windows {
            if a.address == b.address {
                continue;
            }
            let vertical_overlap = a.y() < b.y() + b.h() && a.y() + a.h() > b.y();
            let horizontal_overlap = a.x() < b.x() + b.w() && a.x() + a.w() > b.x();

            let entry = out.get_mut(&a.address).expect("inserted above");
            if vertical_overlap && (a.x() + a.w() - b.x()).abs() <= NEIGHBOR_THRESHOLD {
                entry.right = Some(b.address.clone());
            }
            if vertical_overlap && (b.x() + b.w() - a.x()).abs() <= NEIGHBOR_THRESHOLD {
                entry.left = Some(b.address.clone());
            }
            if horizontal_overlap && (b.y() + b.h() - a.y()).abs() <= NEIGHBOR_THRESHOLD {
                entry.top = Some(b.address.clone());
            }
            if horizontal_overlap && (a.y() + a.h() - b.y()).abs() <= NEIGHBOR_THRESHOLD {
                entry.bottom = Some(b.address.clone());
            }
        }
    }
    out
}

/// Source of the jitter used by the 4/5/6+ window layouts. Production code
/// uses `rand::thread_rng`; tests pass a deterministic stand-in.
pub trait Jitter {
    /// A uniform integer in `[-overlap, overlap]`.
    fn sample(&mut self, overlap: i32) -> i32;
}

pub struct ThreadRngJitter;

impl Jitter for ThreadRngJitter {
    fn sample(&mut self, overlap: i32) -> i32 {
        if overlap == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(-overlap..=overlap)
    }
}

/// Compute the floating-layout rectangles for `clients` on `monitor`
/// (spec §4.E.1). Caller order is preserved in the output.
pub fn floating_layout(clients: &[Window], monitor: MonitorRect, jitter: &mut dyn Jitter) -> Vec<Placement> {
    match clients.len() {
        0 => Vec::new(),
        1 => float_single(clients, monitor),
        2 => float_two(clients, monitor),
        3 => float_three(clients, monitor),
        4 => float_four(clients, monitor, jitter),
        5 => float_five(clients, monitor, jitter),
        _ => float_many(clients, monitor, jitter),
    }
}

fn float_single(clients: &[Window], m: MonitorRect) -> Vec<Placement> {
    let w = (m.width as f64 * 0.6) as i32;
    let h = (m.height as f64 * 0.6) as i32;
    let x = m.x + (m.width - w) / 2;
    let y = m.y + (m.height - h) / 2;
    vec![Placement {
        address: clients[0].address.clone(),
        x,
        y,
        w,
        h,
    }]
}

fn float_two(clients: &[Window], m: MonitorRect) -> Vec<Placement> {
    let w = (m.width as f64 * 0.5) as i32;
    let h = (m.height as f64 * 0.5) as i32;
    let overlap = (w as f64 * 0.1) as i32;
    let cx = m.x + (m.width - w) / 2;
    let cy = m.y + (m.height - h) / 2;
    let positions = [(cx, cy - overlap), (cx, cy + overlap)];
    clients
        .iter()
        .zip(positions)
        .map(|(c, (x, y))| Placement {
            address: c.address.clone(),
            x,
            y,
            w,
            h,
        })
        .collect()
}

fn float_three(clients: &[Window], m: MonitorRect) -> Vec<Placement> {
    let back_w = (m.width as f64 * 0.45) as i32;
    let back_h = (m.height as f64 * 0.45) as i32;
    let center_w = (m.width as f64 * 0.5) as i32;
    let center_h = (m.height as f64 * 0.5) as i32;
    let overlap = (back_w as f64 * 0.1) as i32;

    let back_x = m.x + (m.width - back_w) / 2;
    let back_y = m.y + (m.height - back_h) / 2;
    let center_x = m.x + (m.width - center_w) / 2;
    let center_y = m.y + (m.height - center_h) / 2;

    let slots = [
        (back_x, back_y - overlap, back_w, back_h),
        (back_x, back_y + overlap, back_w, back_h),
        (center_x, center_y, center_w, center_h),
    ];
    clients
        .iter()
        .zip(slots)
        .map(|(c, (x, y, w, h))| Placement {
            address: c.address.clone(),
            x,
            y,
            w,
            h,
        })
        .collect()
}

fn float_four(clients: &[Window], m: MonitorRect, jitter: &mut dyn Jitter) -> Vec<Placement> {
    let w = (m.width as f64 * 0.45) as i32;
    let h = (m.height as f64 * 0.45) as i32;
    let overlap = (w as f64 * 0.1) as i32;
    let base = [
        (m.x, m.y),
        (m.x + m.width - w, m.y),
        (m.x, m.y + m.height - h),
        (m.x + m.width - w, m.y + m.height - h),
    ];
    clients
        .iter()
        .zip(base)
        .map(|(c, (bx, by))| Placement {
            address: c.address.clone(),
            x: bx + jitter.sample(overlap),
            y: by + jitter.sample(overlap),
            w,
            h,
        })
        .collect()
}

fn float_five(clients: &[Window], m: MonitorRect, jitter: &mut dyn Jitter) -> Vec<Placement> {
    let outer_w = (m.width as f64 * 0.4) as i32;
    let outer_h = (m.height as f64 * 0.4) as i32;
    let center_w = ((outer_w as f64 * 0.8) as i32).max(400);
    let center_h = ((outer_h as f64 * 0.8) as i32).max(400);
    let overlap = (outer_w as f64 * 0.1) as i32;

    let base = [
        (m.x, m.y),
        (m.x + m.width - outer_w, m.y),
        (m.x, m.y + m.height - outer_h),
        (m.x + m.width - outer_w, m.y + m.height - outer_h),
        (m.x + (m.width - center_w) / 2, m.y + (m.height - center_h) / 2),
    ];
    clients
        .iter()
        .enumerate()
        .zip(base)
        .map(|((i, c), (bx, by))| {
            let (w, h) = if i == 4 { (center_w, center_h) } else { (outer_w, outer_h) };
            Placement {
                address: c.address.clone(),
                x: bx + jitter.sample(overlap),
                y: by + jitter.sample(overlap),
                w,
                h,
            }
        })
        .collect()
}

fn float_many(clients: &[Window], m: MonitorRect, jitter: &mut dyn Jitter) -> Vec<Placement> {
    let n = clients.len();
    let grid = ((n - 1) as f64).sqrt().ceil() as i32 + 1;
    let grid = grid.max(2);
    let w = m.width / grid;
    let h = m.height / grid;
    let overlap = (w as f64 * 0.1) as i32;

    clients
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let i = i as i32;
            let bx = m.x + (i % grid) * w;
            let by = m.y + (i / grid) * h;
            Placement {
                address: c.address.clone(),
                x: bx + jitter.sample(overlap),
                y: by + jitter.sample(overlap),
                w,
                h,
            }
        })
        .collect()
}

/// Geometry, focus and pin-state for the controller's float/tile toggle and
/// diagnostic neighbor queries. Talks to the compositor only through the
/// shared `WindowController`.
pub struct LayoutController {
    windows: Arc<WindowController>,
    is_floating: Mutex<bool>,
    current_workspace_id: Mutex<Option<i64>>,
    layout_history: Mutex<HashMap<i64, Vec<Window>>>,
}

impl LayoutController {
    pub fn new(windows: Arc<WindowController>) -> Self {
        Self {
            windows,
            is_floating: Mutex::new(false),
            current_workspace_id: Mutex::new(None),
            layout_history: Mutex::new(HashMap::new()),
        }
    }

    async fn move_and_resize(&self, address: &Address, x: i32, y: i32, w: i32, h: i32) -> crate::error::Result<()> {
        self.windows
            .dispatch_raw(&format!("movewindowpixel exact {} {},address:{}", x, y, address))
            .await?;
        self.windows
            .dispatch_raw(&format!("resizewindowpixel exact {} {},address:{}", w, h, address))
            .await?;
        Ok(())
    }

    async fn apply_placements(&self, placements: &[Placement]) -> crate::error::Result<()> {
        for p in placements {
            self.move_and_resize(&p.address, p.x, p.y, p.w, p.h).await?;
        }
        Ok(())
    }

    /// Enter or leave floating mode for the active window's workspace,
    /// then unconditionally (re-)apply the floating-layout algorithm. The
    /// unconditional re-apply on the exit branch mirrors the controller's
    /// observed behavior; both the entry and exit paths end up calling the
    /// algorithm on whatever set of windows is current.
    pub async fn toggle_float_mode(&self, monitor: MonitorRect) -> crate::error::Result<()> {
        let Some(active) = self.windows.get_active_window().await? else {
            return Ok(());
        };
        let ws = active.workspace_id();
        *self.current_workspace_id.lock() = Some(ws);

        let clients = self.windows.windows_in_workspace(ws).await?;

        let was_floating = *self.is_floating.lock();
        if !was_floating {
            for c in &clients {
                self.windows.dispatch_raw(&format!("setfloating address:{}", c.address)).await?;
            }
        } else {
            let history = clients.clone();
            self.layout_history.lock().insert(ws, history.clone());
            for w in &history {
                self.move_and_resize(&w.address, w.x(), w.y(), w.w(), w.h()).await?;
            }
            for c in &clients {
                self.windows.dispatch_raw(&format!("settiled address:{}", c.address)).await?;
            }
        }

        let placements = floating_layout(&clients, monitor, &mut ThreadRngJitter);
        self.apply_placements(&placements).await?;

        *self.is_floating.lock() = !was_floating;
        Ok(())
    }

    pub fn is_floating(&self) -> bool {
        *self.is_floating.lock()
    }

    pub async fn find_neighbors(&self, workspace_id: i64) -> crate::error::Result<HashMap<Address, Neighbors>> {
        let clients = self.windows.windows_in_workspace(workspace_id).await?;
        Ok(find_neighbors(&clients))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkspaceRef;

    struct ZeroJitter;
    impl Jitter for ZeroJitter {
        fn sample(&mut self, _overlap: i32) -> i32 {
            0
        }
    }

    fn window(addr: &str, x: i32, y: i32, w: i32, h: i32) -> Window {
        Window {
            address: Address::from(addr),
            class: "test".to_string(),
            workspace: WorkspaceRef { id: 4 },
            at: (x, y),
            size: (w, h),
            floating: false,
            focus_history_id: 0,
        }
    }

    fn monitor() -> MonitorRect {
        MonitorRect {
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
        }
    }

    #[test]
    fn zero_clients_no_placements() {
        let out = floating_layout(&[], monitor(), &mut ZeroJitter);
        assert!(out.is_empty());
    }

    #[test]
    fn single_window_centered_60_percent() {
        let clients = vec![window("0xa", 0, 0, 100, 100)];
        let out = floating_layout(&clients, monitor(), &mut ZeroJitter);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].w, 1152);
        assert_eq!(out[0].h, 648);
        assert_eq!(out[0].x, (1920 - 1152) / 2);
        assert_eq!(out[0].y, (1080 - 648) / 2);
    }

    #[test]
    fn two_windows_overlap_by_ten_percent_of_width() {
        let clients = vec![window("0xa", 0, 0, 1, 1), window("0xb", 0, 0, 1, 1)];
        let out = floating_layout(&clients, monitor(), &mut ZeroJitter);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].w, 960);
        assert_eq!(out[0].h, 540);
        let overlap = (960.0 * 0.1) as i32;
        assert_eq!(out[1].y - out[0].y, overlap * 2);
    }

    #[test]
    fn four_windows_land_in_corners_without_jitter() {
        let clients: Vec<Window> = (0..4).map(|i| window(&format!("0x{}", i), 0, 0, 1, 1)).collect();
        let out = floating_layout(&clients, monitor(), &mut ZeroJitter);
        let w = (1920.0 * 0.45) as i32;
        let h = (1080.0 * 0.45) as i32;
        assert_eq!((out[0].x, out[0].y), (0, 0));
        assert_eq!((out[1].x, out[1].y), (1920 - w, 0));
        assert_eq!((out[2].x, out[2].y), (0, 1080 - h));
        assert_eq!((out[3].x, out[3].y), (1920 - w, 1080 - h));
    }

    #[test]
    fn neighbor_detects_adjacent_right() {
        let a = window("0xa", 0, 0, 500, 500);
        let b = window("0xb", 500, 0, 500, 500);
        let neighbors = find_neighbors(&[a.clone(), b.clone()]);
        assert_eq!(neighbors[&a.address].right, Some(b.address.clone()));
        assert_eq!(neighbors[&b.address].left, Some(a.address));
    }
}
