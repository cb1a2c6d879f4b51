//! Derivation of the Hyprland IPC directory (spec §4.A, §6).

use std::env;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

/// Unix socket paths are bounded; beyond this many bytes we symlink to a
/// shorter path instead. Matches the original's
/// `MAX_SOCKET_PATH_LEN(107) - MAX_SOCKET_FILE_LEN(15) = 92`.
const MAX_IPC_DIR_LEN: usize = 92;

/// Resolve the directory Hyprland's command/event sockets live in,
/// shortening it via a symlink if it's too long for `sockaddr_un`.
pub fn resolve_ipc_dir(short_path_prefix: &str) -> std::io::Result<PathBuf> {
    let signature = env::var("HYPRLAND_INSTANCE_SIGNATURE").unwrap_or_else(|_| "NO_INSTANCE".to_string());

    let candidate = match env::var("XDG_RUNTIME_DIR") {
        Ok(runtime_dir) => {
            let under_runtime = Path::new(&runtime_dir).join("hypr").join(&signature);
            if under_runtime.exists() {
                under_runtime
            } else {
                PathBuf::from(format!("/tmp/hypr/{}", signature))
            }
        }
        Err(_) => PathBuf::from(format!("/tmp/hypr/{}", signature)),
    };

    let candidate_str = candidate.to_string_lossy().into_owned();
    if candidate_str.len() <= MAX_IPC_DIR_LEN {
        return Ok(candidate);
    }

    let link_path = PathBuf::from(format!("{}-{}", short_path_prefix, signature));
    if !link_path.exists() {
        symlink(&candidate, &link_path)?;
    }
    Ok(link_path)
}

pub fn command_socket_path(short_path_prefix: &str) -> std::io::Result<PathBuf> {
    Ok(resolve_ipc_dir(short_path_prefix)?.join(".socket.sock"))
}

pub fn event_socket_path(short_path_prefix: &str) -> std::io::Result<PathBuf> {
    Ok(resolve_ipc_dir(short_path_prefix)?.join(".socket2.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_dir_is_used_as_is() {
        std::env::set_var("XDG_RUNTIME_DIR", "/tmp");
        std::env::set_var("HYPRLAND_INSTANCE_SIGNATURE", "abc123");
        let dir = resolve_ipc_dir("/tmp/.eva-controller-test").unwrap();
        assert!(dir.to_string_lossy().len() <= MAX_IPC_DIR_LEN);
        assert!(dir.ends_with("hypr/abc123") || dir.to_string_lossy().contains("abc123"));
    }

    #[test]
    fn long_signature_gets_symlinked() {
        std::env::remove_var("XDG_RUNTIME_DIR");
        let long_sig = "x".repeat(100);
        std::env::set_var("HYPRLAND_INSTANCE_SIGNATURE", &long_sig);
        let prefix = format!("/tmp/.eva-controller-test-{}", std::process::id());
        let dir = resolve_ipc_dir(&prefix).unwrap();
        assert!(dir.to_string_lossy().starts_with(&prefix));
        let _ = std::fs::remove_file(format!("{}-{}", prefix, long_sig));
    }
}
