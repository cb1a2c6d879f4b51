//! Window Controller (spec §4.D): stateless compositor queries plus the
//! pin-group registry.

use crate::cache::Cache;
use crate::error::{ControllerError, Result};
use crate::ipc::Transport;
use crate::model::{Address, Monitor, PinRegistry, Window};
use crate::notify;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Direction to advance the cursor within a pin group (spec §4.D,
/// `toggle_within_group`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Backward,
}

pub struct WindowController {
    transport: Arc<Transport>,
    clients_cache: Cache<Vec<Window>>,
    monitors_cache: Cache<Vec<Monitor>>,
    registry: Mutex<PinRegistry>,
}

impl WindowController {
    pub fn new(transport: Arc<Transport>, short_ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(short_ttl_secs);
        Self {
            transport,
            clients_cache: Cache::new(ttl),
            monitors_cache: Cache::new(ttl),
            registry: Mutex::new(PinRegistry::new()),
        }
    }

    // ---- Stateless compositor queries --------------------------------

    pub async fn clients(&self) -> Result<Vec<Window>> {
        let transport = self.transport.clone();
        self.clients_cache
            .fetch(|| async move { query_json(&transport, "clients").await })
            .await
    }

    pub async fn invalidate_clients(&self) {
        self.clients_cache.revoke().await;
    }

    pub async fn monitors(&self) -> Result<Vec<Monitor>> {
        let transport = self.transport.clone();
        self.monitors_cache
            .fetch(|| async move { query_json(&transport, "monitors").await })
            .await
    }

    pub async fn get_active_window(&self) -> Result<Option<Window>> {
        match self.transport.command("activewindow").await? {
            None => Ok(None),
            Some(bytes) => {
                if bytes.iter().all(|b| b.is_ascii_whitespace()) {
                    return Ok(None);
                }
                serde_json::from_slice(&bytes)
                    .map(Some)
                    .map_err(|e| ControllerError::MalformedResponse(e.to_string()))
            }
        }
    }

    pub async fn get_window_by_class(&self, class: &str) -> Result<Option<Address>> {
        let clients = self.clients().await?;
        Ok(clients
            .into_iter()
            .find(|w| w.class == class)
            .map(|w| w.address))
    }

    pub async fn windows_in_workspace(&self, ws: i64) -> Result<Vec<Window>> {
        let clients = self.clients().await?;
        Ok(clients
            .into_iter()
            .filter(|w| w.workspace_id() == ws)
            .collect())
    }

    /// Focus `address` and raise it to the top (spec §4.D: "— (also raises
    /// to top)"; original `focus_window` issues `bringactivetotop` right
    /// after `focuswindow`, window.py:136-139).
    pub async fn focus(&self, address: &Address) -> Result<()> {
        self.dispatch(&format!("focuswindow address:{}", address))
            .await?;
        self.dispatch("bringactivetotop").await
    }

    pub async fn move_to_workspace(&self, address: &Address, ws: i64) -> Result<()> {
        self.dispatch(&format!("movetoworkspace {} address:{}", ws, address))
            .await
    }

    async fn dispatch(&self, action: &str) -> Result<()> {
        self.dispatch_raw(action).await
    }

    /// Issue a raw `dispatch <action>` call. Exposed for the layout and
    /// stage controllers, which need dispatch verbs `focus`/`move`/`pin`
    /// don't cover (`setfloating`, `alterzorder`, …).
    pub async fn dispatch_raw(&self, action: &str) -> Result<()> {
        self.transport
            .command(&format!("dispatch {}", action))
            .await?;
        Ok(())
    }

    /// Run an arbitrary command-socket query (not a `dispatch`), e.g.
    /// `"version"`. Exposed for completeness/diagnostics.
    pub async fn raw_command(&self, text: &str) -> Result<Option<Vec<u8>>> {
        self.transport.command(text).await
    }

    // ---- Pin-group registry (in-memory only) -------------------------

    /// Create a pin group, generating a unique name if `name` is absent.
    /// Idempotent on an existing name.
    pub fn create_group(&self, name: Option<String>) -> String {
        let mut reg = self.registry.lock();
        let name = name.unwrap_or_else(|| format!("group-{}", &uuid::Uuid::new_v4().to_string()[..8]));
        if reg.groups.contains_key(&name) {
            reg.current_group = Some(name.clone());
            return name;
        }
        reg.groups.insert(name.clone(), Vec::new());
        reg.group_states.insert(name.clone(), 0);
        reg.group_orders.push(name.clone());
        reg.current_group = Some(name.clone());
        name
    }

    /// Pin the active window into the current group, creating `"Default"`
    /// if none exists yet. Emits a desktop notification on success.
    pub async fn pin_current_window(&self) -> Result<()> {
        let Some(window) = self.get_active_window().await? else {
            return Ok(());
        };

        let group_name = {
            let mut reg = self.registry.lock();
            if reg.current_group.is_none() {
                drop(reg);
                self.create_group(Some("Default".to_string()));
                reg = self.registry.lock();
            }
            let name = reg.current_group.clone().expect("just ensured present");
            let entry = reg.groups.entry(name.clone()).or_default();
            if !entry.contains(&window.address) {
                entry.push(window.address.clone());
            }
            reg.class_lookup
                .insert(window.class.clone(), window.address.clone());
            name
        };
        let _ = group_name;

        notify::notify(&format!("Lock window {}", window.class), None, 2000).await;
        Ok(())
    }

    /// Advance the cursor within the current group to the first address
    /// different from the active window, in `direction`. Wraps modulo the
    /// group length.
    pub async fn toggle_within_group(&self, direction: CycleDirection) -> Result<bool> {
        let active = self.get_active_window().await?;
        let active_addr = active.map(|w| w.address);

        let target = {
            let mut reg = self.registry.lock();
            let Some(name) = reg.current_group.clone() else {
                return Ok(false);
            };
            let Some(members) = reg.groups.get(&name).cloned() else {
                return Ok(false);
            };
            if members.is_empty() {
                return Ok(false);
            }
            let cursor = *reg.group_states.get(&name).unwrap_or(&0);
            let len = members.len();
            let mut found = None;
            for step in 1..=len {
                let idx = match direction {
                    CycleDirection::Forward => (cursor + step) % len,
                    CycleDirection::Backward => (cursor + len - (step % len)) % len,
                };
                if Some(&members[idx]) != active_addr.as_ref() {
                    found = Some((idx, members[idx].clone()));
                    break;
                }
            }
            let Some((idx, addr)) = found else {
                return Ok(false);
            };
            reg.group_states.insert(name, idx);
            addr
        };

        self.focus(&target).await?;
        Ok(true)
    }

    /// Advance `current_group` to the next name in `group_orders`, modulo
    /// wrap. A group absent from `group_orders` is treated as index `-1`
    /// so the next group is the first one.
    pub fn cycle_group(&self) -> Option<String> {
        let mut reg = self.registry.lock();
        if reg.group_orders.is_empty() {
            return None;
        }
        let current_idx = reg
            .current_group
            .as_ref()
            .and_then(|name| reg.group_orders.iter().position(|g| g == name))
            .map(|i| i as i64)
            .unwrap_or(-1);
        let next_idx = ((current_idx + 1) as usize) % reg.group_orders.len();
        let next = reg.group_orders[next_idx].clone();
        reg.current_group = Some(next.clone());
        Some(next)
    }

    pub fn add_to_group(&self, group: &str, address: Address) {
        let mut reg = self.registry.lock();
        if !reg.groups.contains_key(group) {
            reg.groups.insert(group.to_string(), Vec::new());
            reg.group_states.insert(group.to_string(), 0);
            reg.group_orders.push(group.to_string());
        }
        let entry = reg.groups.get_mut(group).expect("inserted above");
        if !entry.contains(&address) {
            entry.push(address);
        }
    }

    pub fn remove_from_group(&self, group: &str, address: &Address) {
        let mut reg = self.registry.lock();
        if let Some(entry) = reg.groups.get_mut(group) {
            entry.retain(|a| a != address);
        }
    }

    pub fn clear_group(&self, group: &str) {
        let mut reg = self.registry.lock();
        if let Some(entry) = reg.groups.get_mut(group) {
            entry.clear();
        }
        reg.group_states.insert(group.to_string(), 0);
    }

    pub fn delete_group(&self, group: &str) {
        let mut reg = self.registry.lock();
        reg.groups.remove(group);
        reg.group_states.remove(group);
        reg.group_orders.retain(|g| g != group);
        if reg.current_group.as_deref() == Some(group) {
            reg.current_group = None;
        }
    }

    pub fn list_groups(&self) -> Vec<String> {
        self.registry.lock().group_orders.clone()
    }

    pub fn list_windows(&self, group: &str) -> Vec<Address> {
        self.registry
            .lock()
            .groups
            .get(group)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove the active window's class from `class_lookup` and its
    /// address from the current group, if present. Internal bookkeeping
    /// only; not exposed on the control socket.
    pub async fn unpin_current_window(&self) -> Result<()> {
        let Some(window) = self.get_active_window().await? else {
            return Ok(());
        };
        let mut reg = self.registry.lock();
        if reg.class_lookup.get(&window.class) == Some(&window.address) {
            reg.class_lookup.remove(&window.class);
        }
        if let Some(name) = reg.current_group.clone() {
            if let Some(entry) = reg.groups.get_mut(&name) {
                entry.retain(|a| a != &window.address);
            }
        }
        Ok(())
    }

    pub fn current_group(&self) -> Option<String> {
        self.registry.lock().current_group.clone()
    }
}

async fn query_json<T: serde::de::DeserializeOwned>(transport: &Transport, text: &str) -> Result<T> {
    match transport.command(text).await? {
        None => serde_json::from_str("[]").map_err(|e| ControllerError::MalformedResponse(e.to_string())),
        Some(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| ControllerError::MalformedResponse(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> WindowController {
        WindowController::new(
            Arc::new(Transport::with_paths(
                "/tmp/nonexistent-eva-test.sock".into(),
                "/tmp/nonexistent-eva-test2.sock".into(),
            )),
            1,
        )
    }

    #[test]
    fn create_group_generates_unique_name_and_is_idempotent() {
        let c = controller();
        let name = c.create_group(None);
        assert!(c.list_groups().contains(&name));
        let again = c.create_group(Some(name.clone()));
        assert_eq!(again, name);
        assert_eq!(c.list_groups().iter().filter(|g| **g == name).count(), 1);
    }

    #[test]
    fn cycle_group_treats_missing_current_as_minus_one() {
        let c = controller();
        c.create_group(Some("a".to_string()));
        c.create_group(Some("b".to_string()));
        {
            let mut reg = c.registry.lock();
            reg.current_group = None;
        }
        let next = c.cycle_group();
        assert_eq!(next, Some("a".to_string()));
    }

    #[test]
    fn cycle_group_wraps() {
        let c = controller();
        c.create_group(Some("a".to_string()));
        c.create_group(Some("b".to_string()));
        c.create_group(Some("a".to_string())); // back to a, idempotent
        let reg_current = c.current_group();
        assert_eq!(reg_current, Some("a".to_string()));
        let next = c.cycle_group();
        assert_eq!(next, Some("b".to_string()));
        let wrapped = c.cycle_group();
        assert_eq!(wrapped, Some("a".to_string()));
    }

    #[test]
    fn delete_current_group_clears_current() {
        let c = controller();
        let name = c.create_group(None);
        c.delete_group(&name);
        assert_eq!(c.current_group(), None);
        assert!(!c.list_groups().contains(&name));
    }

    #[test]
    fn add_dedups_addresses() {
        let c = controller();
        c.add_to_group("g", Address::from("0xaaa"));
        c.add_to_group("g", Address::from("0xaaa"));
        assert_eq!(c.list_windows("g").len(), 1);
    }
}
