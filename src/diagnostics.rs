//! ASCII-art layout grid renderer (spec §4.E, `render_layout_grid`). Debug
//! tooling only — reads a workspace snapshot, produces text, touches no
//! sockets.

use crate::layout::Neighbors;
use crate::model::{Address, Window};
use std::collections::HashMap;

fn is_overlapping(x1: i32, y1: i32, w1: i32, h1: i32, x2: i32, y2: i32, w2: i32, h2: i32) -> bool {
    x1 < x2 + w2 && x1 + w1 > x2 && y1 < y2 + h2 && y1 + h1 > y2
}

fn improved_scale(value: i32, max_value: i32, target_size: usize) -> usize {
    if max_value <= 0 {
        return 1;
    }
    (((value as f64 / max_value as f64) * target_size as f64) as usize).max(1)
}

fn z_index(floating: bool, focus_history_id: i64) -> i64 {
    let base = if floating { 0 } else { -1000 };
    base - focus_history_id
}

type Cell = (char, i64);

fn draw_window(grid: &mut [Vec<Cell>], x: usize, y: usize, w: usize, h: usize, label: &str, z: i64) {
    let height = grid.len();
    let width = if height > 0 { grid[0].len() } else { 0 };
    let x_end = (x + w).min(width);
    let y_end = (y + h).min(height);

    for i in x..x_end {
        for j in y..y_end {
            let is_border = i == x || i == x_end.saturating_sub(1) || j == y || j == y_end.saturating_sub(1);
            if is_border {
                let ch = if i == x || i == x_end.saturating_sub(1) { '|' } else { '=' };
                grid[j][i] = (ch, z);
            } else if grid[j][i].1 < z {
                grid[j][i] = ('-', z);
            }
        }
    }

    if w > label.len() + 2 && h > 2 {
        let center_x = x + w / 2 - label.len().min(w) / 2;
        let center_y = y + h / 2;
        if center_y < height {
            for (k, ch) in label.chars().enumerate() {
                let col = center_x + k;
                if col < width {
                    grid[center_y][col] = (ch, z);
                }
            }
        }
    } else if y < height && x < width {
        grid[y][x] = ('>', z);
    }
}

/// One window's normalized rectangle and label, for the coordinate listing
/// printed under the grid.
pub struct NormalizedWindow {
    pub address: Address,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Render `windows` (a workspace's last known snapshot) as an ASCII grid
/// sized to fit `term_width` x `term_height`, highest z-index drawn last.
pub fn render_layout_grid(windows: &[Window], term_width: usize, term_height: usize) -> (String, Vec<NormalizedWindow>) {
    if windows.is_empty() {
        return ("No clients in the workspace.".to_string(), Vec::new());
    }

    let grid_width = term_width.saturating_sub(1).max(1);
    let grid_height = term_height.saturating_sub(5).max(1);

    let max_x = windows.iter().map(|w| w.x() + w.w()).max().unwrap_or(1).max(1);
    let max_y = windows.iter().map(|w| w.y() + w.h()).max().unwrap_or(1).max(1);

    let mut grid: Vec<Vec<Cell>> = vec![vec![(' ', i64::MIN); grid_width]; grid_height];

    let mut sorted: Vec<&Window> = windows.iter().collect();
    sorted.sort_by_key(|w| z_index(w.floating, w.focus_history_id));

    let mut normalized = Vec::with_capacity(sorted.len());
    for w in sorted {
        let norm_x = improved_scale(w.x(), max_x, grid_width);
        let norm_y = improved_scale(w.y(), max_y, grid_height);
        let norm_w = improved_scale(w.w(), max_x, grid_width);
        let norm_h = improved_scale(w.h(), max_y, grid_height);

        let label = format!("{}x{} {}", w.w(), w.h(), &w.address.0[..w.address.0.len().min(10)]);
        let z = z_index(w.floating, w.focus_history_id);
        draw_window(&mut grid, norm_x, norm_y, norm_w, norm_h, &label, z);

        normalized.push(NormalizedWindow {
            address: w.address.clone(),
            x: norm_x,
            y: norm_y,
            w: norm_w,
            h: norm_h,
        });
    }

    let mut out = String::new();
    for row in &grid {
        for (ch, _) in row {
            out.push(*ch);
        }
        out.push('\n');
    }

    out.push_str("\nNormalized Coordinates:\n");
    for n in &normalized {
        out.push_str(&format!("Window {}: ({}, {}, {}, {})\n", n.address, n.x, n.y, n.w, n.h));
    }

    (out, normalized)
}

/// Append a textual neighbor summary (as `print_neighbors` would show) to
/// the rendered grid.
pub fn format_neighbors(neighbors: &HashMap<Address, Neighbors>) -> String {
    let mut out = String::new();
    for (address, adjacency) in neighbors {
        out.push_str(&format!("\nWindow {}:\n", address));
        out.push_str(&format!("  Top: {}\n", opt_str(&adjacency.top)));
        out.push_str(&format!("  Right: {}\n", opt_str(&adjacency.right)));
        out.push_str(&format!("  Bottom: {}\n", opt_str(&adjacency.bottom)));
        out.push_str(&format!("  Left: {}\n", opt_str(&adjacency.left)));
    }
    out
}

fn opt_str(addr: &Option<Address>) -> String {
    addr.as_ref().map(|a| a.to_string()).unwrap_or_else(|| "None".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkspaceRef;

    fn window(addr: &str, x: i32, y: i32, w: i32, h: i32) -> Window {
        Window {
            address: Address::from(addr),
            class: "test".to_string(),
            workspace: WorkspaceRef { id: 1 },
            at: (x, y),
            size: (w, h),
            floating: false,
            focus_history_id: 0,
        }
    }

    #[test]
    fn overlap_detection_matches_axis_aligned_rectangle_intersection() {
        assert!(is_overlapping(0, 0, 10, 10, 5, 5, 10, 10));
        assert!(!is_overlapping(0, 0, 10, 10, 20, 20, 10, 10));
    }

    #[test]
    fn empty_workspace_reports_no_clients() {
        let (text, coords) = render_layout_grid(&[], 80, 24);
        assert_eq!(text, "No clients in the workspace.");
        assert!(coords.is_empty());
    }

    #[test]
    fn renders_without_panicking_for_a_typical_workspace() {
        let windows = vec![window("0xaaaaaaaaaa", 0, 0, 1536, 972), window("0xbbbbbbbbbb", 1536, 0, 345, 259)];
        let (text, coords) = render_layout_grid(&windows, 80, 24);
        assert!(!text.is_empty());
        assert_eq!(coords.len(), 2);
    }
}
