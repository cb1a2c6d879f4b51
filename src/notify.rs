//! Notification sink (spec §4.H): fire-and-forget desktop notifications
//! over the session bus. Never fails visibly.

use zbus::Connection;

/// Send a single desktop notification via `org.freedesktop.Notifications`.
/// Errors (no session bus, no notification daemon, …) are logged at debug
/// level and otherwise swallowed — notifications are a convenience, never
/// a dependency of control flow.
pub async fn notify(summary: &str, body: Option<&str>, timeout_ms: i32) {
    if let Err(e) = send(summary, body.unwrap_or(""), timeout_ms).await {
        log::debug!("notification send failed: {}", e);
    }
}

async fn send(summary: &str, body: &str, timeout_ms: i32) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection
        .call_method(
            Some("org.freedesktop.Notifications"),
            "/org/freedesktop/Notifications",
            Some("org.freedesktop.Notifications"),
            "Notify",
            &(
                "eva-controller",
                0u32,
                "",
                summary,
                body,
                Vec::<&str>::new(),
                std::collections::HashMap::<&str, zbus::zvariant::Value>::new(),
                timeout_ms,
            ),
        )
        .await?;
    Ok(())
}
