//! Event Router (spec §4.C): turns raw `TYPE>>DATA` frames off the event
//! socket into typed events and fans them out to subscribers.

use crate::ipc::RawFrame;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The closed set of Hyprland IPC v2 event types the controller recognises.
/// Anything else parses to `Other` and is dropped by the router rather than
/// routed to a subscriber.
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum HyprEvent {
    Workspace(String),
    WorkspaceV2(String),
    FocusedMon(String),
    ActiveWindow(String),
    ActiveWindowV2(String),
    Fullscreen(String),
    MonitorRemoved(String),
    MonitorAdded(String),
    MonitorAddedV2(String),
    CreateWorkspace(String),
    CreateWorkspaceV2(String),
    DestroyWorkspace(String),
    DestroyWorkspaceV2(String),
    MoveWorkspace(String),
    MoveWorkspaceV2(String),
    RenameWorkspace(String),
    ActiveSpecial(String),
    ActiveLayout(String),
    OpenWindow(String),
    CloseWindow(String),
    MoveWindow(String),
    MoveWindowV2(String),
    OpenLayer(String),
    CloseLayer(String),
    Submap(String),
    ChangeFloatingMode(String),
    Urgent(String),
    Minimize(String),
    Screencast(String),
    WindowTitle(String),
    WindowTitleV2(String),
    ToggleGroup(String),
    MoveIntoGroup(String),
    MoveOutOfGroup(String),
    IgnoreGroupLock(String),
    LockGroups(String),
    ConfigReloaded(String),
    EmptyPin(String),
    /// Anything not in the catalogue above; the router never dispatches
    /// these to a subscriber.
    Other(String, String),
}

/// The event kind alone, used as a subscriber-map key. `HyprEvent` keeps the
/// payload so a single match arm can both route and read `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Workspace,
    WorkspaceV2,
    FocusedMon,
    ActiveWindow,
    ActiveWindowV2,
    Fullscreen,
    MonitorRemoved,
    MonitorAdded,
    MonitorAddedV2,
    CreateWorkspace,
    CreateWorkspaceV2,
    DestroyWorkspace,
    DestroyWorkspaceV2,
    MoveWorkspace,
    MoveWorkspaceV2,
    RenameWorkspace,
    ActiveSpecial,
    ActiveLayout,
    OpenWindow,
    CloseWindow,
    MoveWindow,
    MoveWindowV2,
    OpenLayer,
    CloseLayer,
    Submap,
    ChangeFloatingMode,
    Urgent,
    Minimize,
    Screencast,
    WindowTitle,
    WindowTitleV2,
    ToggleGroup,
    MoveIntoGroup,
    MoveOutOfGroup,
    IgnoreGroupLock,
    LockGroups,
    ConfigReloaded,
    EmptyPin,
}

impl HyprEvent {
    pub fn kind(&self) -> Option<EventKind> {
        use EventKind::*;
        Some(match self {
            HyprEvent::Workspace(_) => Workspace,
            HyprEvent::WorkspaceV2(_) => WorkspaceV2,
            HyprEvent::FocusedMon(_) => FocusedMon,
            HyprEvent::ActiveWindow(_) => ActiveWindow,
            HyprEvent::ActiveWindowV2(_) => ActiveWindowV2,
            HyprEvent::Fullscreen(_) => Fullscreen,
            HyprEvent::MonitorRemoved(_) => MonitorRemoved,
            HyprEvent::MonitorAdded(_) => MonitorAdded,
            HyprEvent::MonitorAddedV2(_) => MonitorAddedV2,
            HyprEvent::CreateWorkspace(_) => CreateWorkspace,
            HyprEvent::CreateWorkspaceV2(_) => CreateWorkspaceV2,
            HyprEvent::DestroyWorkspace(_) => DestroyWorkspace,
            HyprEvent::DestroyWorkspaceV2(_) => DestroyWorkspaceV2,
            HyprEvent::MoveWorkspace(_) => MoveWorkspace,
            HyprEvent::MoveWorkspaceV2(_) => MoveWorkspaceV2,
            HyprEvent::RenameWorkspace(_) => RenameWorkspace,
            HyprEvent::ActiveSpecial(_) => ActiveSpecial,
            HyprEvent::ActiveLayout(_) => ActiveLayout,
            HyprEvent::OpenWindow(_) => OpenWindow,
            HyprEvent::CloseWindow(_) => CloseWindow,
            HyprEvent::MoveWindow(_) => MoveWindow,
            HyprEvent::MoveWindowV2(_) => MoveWindowV2,
            HyprEvent::OpenLayer(_) => OpenLayer,
            HyprEvent::CloseLayer(_) => CloseLayer,
            HyprEvent::Submap(_) => Submap,
            HyprEvent::ChangeFloatingMode(_) => ChangeFloatingMode,
            HyprEvent::Urgent(_) => Urgent,
            HyprEvent::Minimize(_) => Minimize,
            HyprEvent::Screencast(_) => Screencast,
            HyprEvent::WindowTitle(_) => WindowTitle,
            HyprEvent::WindowTitleV2(_) => WindowTitleV2,
            HyprEvent::ToggleGroup(_) => ToggleGroup,
            HyprEvent::MoveIntoGroup(_) => MoveIntoGroup,
            HyprEvent::MoveOutOfGroup(_) => MoveOutOfGroup,
            HyprEvent::IgnoreGroupLock(_) => IgnoreGroupLock,
            HyprEvent::LockGroups(_) => LockGroups,
            HyprEvent::ConfigReloaded(_) => ConfigReloaded,
            HyprEvent::EmptyPin(_) => EmptyPin,
            HyprEvent::Other(..) => return None,
        })
    }

    pub fn data(&self) -> &str {
        match self {
            HyprEvent::Other(_, data) => data,
            HyprEvent::Workspace(d)
            | HyprEvent::WorkspaceV2(d)
            | HyprEvent::FocusedMon(d)
            | HyprEvent::ActiveWindow(d)
            | HyprEvent::ActiveWindowV2(d)
            | HyprEvent::Fullscreen(d)
            | HyprEvent::MonitorRemoved(d)
            | HyprEvent::MonitorAdded(d)
            | HyprEvent::MonitorAddedV2(d)
            | HyprEvent::CreateWorkspace(d)
            | HyprEvent::CreateWorkspaceV2(d)
            | HyprEvent::DestroyWorkspace(d)
            | HyprEvent::DestroyWorkspaceV2(d)
            | HyprEvent::MoveWorkspace(d)
            | HyprEvent::MoveWorkspaceV2(d)
            | HyprEvent::RenameWorkspace(d)
            | HyprEvent::ActiveSpecial(d)
            | HyprEvent::ActiveLayout(d)
            | HyprEvent::OpenWindow(d)
            | HyprEvent::CloseWindow(d)
            | HyprEvent::MoveWindow(d)
            | HyprEvent::MoveWindowV2(d)
            | HyprEvent::OpenLayer(d)
            | HyprEvent::CloseLayer(d)
            | HyprEvent::Submap(d)
            | HyprEvent::ChangeFloatingMode(d)
            | HyprEvent::Urgent(d)
            | HyprEvent::Minimize(d)
            | HyprEvent::Screencast(d)
            | HyprEvent::WindowTitle(d)
            | HyprEvent::WindowTitleV2(d)
            | HyprEvent::ToggleGroup(d)
            | HyprEvent::MoveIntoGroup(d)
            | HyprEvent::MoveOutOfGroup(d)
            | HyprEvent::IgnoreGroupLock(d)
            | HyprEvent::LockGroups(d)
            | HyprEvent::ConfigReloaded(d)
            | HyprEvent::EmptyPin(d) => d,
        }
    }
}

/// Parse a raw frame's event type into a typed `HyprEvent`, carrying its
/// data payload along for the ride.
pub fn classify(frame: RawFrame) -> HyprEvent {
    let RawFrame { event_type, data } = frame;
    match event_type.as_str() {
        "workspace" => HyprEvent::Workspace(data),
        "workspacev2" => HyprEvent::WorkspaceV2(data),
        "focusedmon" => HyprEvent::FocusedMon(data),
        "activewindow" => HyprEvent::ActiveWindow(data),
        "activewindowv2" => HyprEvent::ActiveWindowV2(data),
        "fullscreen" => HyprEvent::Fullscreen(data),
        "monitorremoved" => HyprEvent::MonitorRemoved(data),
        "monitoradded" => HyprEvent::MonitorAdded(data),
        "monitoraddedv2" => HyprEvent::MonitorAddedV2(data),
        "createworkspace" => HyprEvent::CreateWorkspace(data),
        "createworkspacev2" => HyprEvent::CreateWorkspaceV2(data),
        "destroyworkspace" => HyprEvent::DestroyWorkspace(data),
        "destroyworkspacev2" => HyprEvent::DestroyWorkspaceV2(data),
        "moveworkspace" => HyprEvent::MoveWorkspace(data),
        "moveworkspacev2" => HyprEvent::MoveWorkspaceV2(data),
        "renameworkspace" => HyprEvent::RenameWorkspace(data),
        "activespecial" => HyprEvent::ActiveSpecial(data),
        "activelayout" => HyprEvent::ActiveLayout(data),
        "openwindow" => HyprEvent::OpenWindow(data),
        "closewindow" => HyprEvent::CloseWindow(data),
        "movewindow" => HyprEvent::MoveWindow(data),
        "movewindowv2" => HyprEvent::MoveWindowV2(data),
        "openlayer" => HyprEvent::OpenLayer(data),
        "closelayer" => HyprEvent::CloseLayer(data),
        "submap" => HyprEvent::Submap(data),
        "changefloatingmode" => HyprEvent::ChangeFloatingMode(data),
        "urgent" => HyprEvent::Urgent(data),
        "minimize" => HyprEvent::Minimize(data),
        "screencast" => HyprEvent::Screencast(data),
        "windowtitle" => HyprEvent::WindowTitle(data),
        "windowtitlev2" => HyprEvent::WindowTitleV2(data),
        "togglegroup" => HyprEvent::ToggleGroup(data),
        "moveintogroup" => HyprEvent::MoveIntoGroup(data),
        "moveoutofgroup" => HyprEvent::MoveOutOfGroup(data),
        "ignoregrouplock" => HyprEvent::IgnoreGroupLock(data),
        "lockgroups" => HyprEvent::LockGroups(data),
        "configreloaded" => HyprEvent::ConfigReloaded(data),
        "emptypin" => HyprEvent::EmptyPin(data),
        other => HyprEvent::Other(other.to_string(), data),
    }
}

pub type Subscriber = Arc<dyn Fn(HyprEvent) + Send + Sync>;

/// Dispatch table from event kind to the subscribers interested in it.
/// Populated once at startup; subscribers run on a spawned task each so a
/// slow handler never stalls the reader loop.
#[derive(Default, Clone)]
pub struct Router {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, handler: Subscriber) {
        self.subscribers.entry(kind).or_default().push(handler);
    }

    fn dispatch(&self, event: HyprEvent) {
        let Some(kind) = event.kind() else {
            return;
        };
        let Some(handlers) = self.subscribers.get(&kind) else {
            return;
        };
        for handler in handlers {
            let handler = handler.clone();
            let event = event.clone();
            tokio::spawn(async move { handler(event) });
        }
    }

    /// Drain `rx` forever, classifying and dispatching each frame. Returns
    /// once the sending side (the transport's `event_stream`) is gone.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<RawFrame>) {
        while let Some(frame) = rx.recv().await {
            self.dispatch(classify(frame));
        }
    }
}

impl Clone for HyprEvent {
    fn clone(&self) -> Self {
        match self {
            HyprEvent::Workspace(d) => HyprEvent::Workspace(d.clone()),
            HyprEvent::WorkspaceV2(d) => HyprEvent::WorkspaceV2(d.clone()),
            HyprEvent::FocusedMon(d) => HyprEvent::FocusedMon(d.clone()),
            HyprEvent::ActiveWindow(d) => HyprEvent::ActiveWindow(d.clone()),
            HyprEvent::ActiveWindowV2(d) => HyprEvent::ActiveWindowV2(d.clone()),
            HyprEvent::Fullscreen(d) => HyprEvent::Fullscreen(d.clone()),
            HyprEvent::MonitorRemoved(d) => HyprEvent::MonitorRemoved(d.clone()),
            HyprEvent::MonitorAdded(d) => HyprEvent::MonitorAdded(d.clone()),
            HyprEvent::MonitorAddedV2(d) => HyprEvent::MonitorAddedV2(d.clone()),
            HyprEvent::CreateWorkspace(d) => HyprEvent::CreateWorkspace(d.clone()),
            HyprEvent::CreateWorkspaceV2(d) => HyprEvent::CreateWorkspaceV2(d.clone()),
            HyprEvent::DestroyWorkspace(d) => HyprEvent::DestroyWorkspace(d.clone()),
            HyprEvent::DestroyWorkspaceV2(d) => HyprEvent::DestroyWorkspaceV2(d.clone()),
            HyprEvent::MoveWorkspace(d) => HyprEvent::MoveWorkspace(d.clone()),
            HyprEvent::MoveWorkspaceV2(d) => HyprEvent::MoveWorkspaceV2(d.clone()),
            HyprEvent::RenameWorkspace(d) => HyprEvent::RenameWorkspace(d.clone()),
            HyprEvent::ActiveSpecial(d) => HyprEvent::ActiveSpecial(d.clone()),
            HyprEvent::ActiveLayout(d) => HyprEvent::ActiveLayout(d.clone()),
            HyprEvent::OpenWindow(d) => HyprEvent::OpenWindow(d.clone()),
            HyprEvent::CloseWindow(d) => HyprEvent::CloseWindow(d.clone()),
            HyprEvent::MoveWindow(d) => HyprEvent::MoveWindow(d.clone()),
            HyprEvent::MoveWindowV2(d) => HyprEvent::MoveWindowV2(d.clone()),
            HyprEvent::OpenLayer(d) => HyprEvent::OpenLayer(d.clone()),
            HyprEvent::CloseLayer(d) => HyprEvent::CloseLayer(d.clone()),
            HyprEvent::Submap(d) => HyprEvent::Submap(d.clone()),
            HyprEvent::ChangeFloatingMode(d) => HyprEvent::ChangeFloatingMode(d.clone()),
            HyprEvent::Urgent(d) => HyprEvent::Urgent(d.clone()),
            HyprEvent::Minimize(d) => HyprEvent::Minimize(d.clone()),
            HyprEvent::Screencast(d) => HyprEvent::Screencast(d.clone()),
            HyprEvent::WindowTitle(d) => HyprEvent::WindowTitle(d.clone()),
            HyprEvent::WindowTitleV2(d) => HyprEvent::WindowTitleV2(d.clone()),
            HyprEvent::ToggleGroup(d) => HyprEvent::ToggleGroup(d.clone()),
            HyprEvent::MoveIntoGroup(d) => HyprEvent::MoveIntoGroup(d.clone()),
            HyprEvent::MoveOutOfGroup(d) => HyprEvent::MoveOutOfGroup(d.clone()),
            HyprEvent::IgnoreGroupLock(d) => HyprEvent::IgnoreGroupLock(d.clone()),
            HyprEvent::LockGroups(d) => HyprEvent::LockGroups(d.clone()),
            HyprEvent::ConfigReloaded(d) => HyprEvent::ConfigReloaded(d.clone()),
            HyprEvent::EmptyPin(d) => HyprEvent::EmptyPin(d.clone()),
            HyprEvent::Other(t, d) => HyprEvent::Other(t.clone(), d.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_event() {
        let frame = RawFrame {
            event_type: "openwindow".to_string(),
            data: "addr,1,class,title".to_string(),
        };
        let event = classify(frame);
        assert_eq!(event.kind(), Some(EventKind::OpenWindow));
        assert_eq!(event.data(), "addr,1,class,title");
    }

    #[test]
    fn unknown_event_has_no_kind() {
        let frame = RawFrame {
            event_type: "somethingnew".to_string(),
            data: "x".to_string(),
        };
        let event = classify(frame);
        assert_eq!(event.kind(), None);
        assert!(matches!(event, HyprEvent::Other(_, _)));
    }

    #[tokio::test]
    async fn router_dispatches_to_subscriber() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut router = Router::new();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
        router.on(
            EventKind::CloseWindow,
            Arc::new(move |_event| {
                let _ = done_tx.send(());
            }),
        );
        let router = Arc::new(router);
        tokio::spawn(router.run(rx));

        tx.send(RawFrame {
            event_type: "closewindow".to_string(),
            data: "addr".to_string(),
        })
        .unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(1), done_rx.recv())
            .await
            .unwrap()
            .unwrap();
    }
}
