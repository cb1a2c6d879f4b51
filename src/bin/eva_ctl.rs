//! eva-ctl - thin client for the control socket (spec §6 "CLI surface").
//!
//! Sends `<action> [args…]` to the daemon's Unix control socket and prints
//! whatever comes back, mirroring the original `control-actions.py`.

use clap::Parser;
use eva_controller::config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "eva-ctl")]
#[command(about = "Send an action to the eva-controller control socket", long_about = None)]
struct Cli {
    /// Path to the config file the daemon was started with, used only to
    /// resolve the control socket path when `--socket` is not given.
    #[arg(long, default_value = "/etc/eva-controller.toml")]
    config: PathBuf,

    /// Override the control socket path.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Action name, e.g. `toggle-float`.
    action: String,

    /// Arguments forwarded to the action.
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let socket_path = match &cli.socket {
        Some(p) => p.clone(),
        None => Config::load(&cli.config).map(|c| c.socket.control_path).unwrap_or_else(|_| {
            PathBuf::from("/tmp/hyprland_controller.sock")
        }),
    };

    match send_action(&socket_path, &cli.action, &cli.args).await {
        Ok(Some(reply)) => print_reply(&reply),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error communicating with server: {}", e);
            std::process::exit(1);
        }
    }
}

async fn send_action(socket_path: &PathBuf, action: &str, args: &[String]) -> std::io::Result<Option<Vec<u8>>> {
    let mut stream = UnixStream::connect(socket_path).await?;
    let command = if args.is_empty() {
        action.to_string()
    } else {
        format!("{} {}", action, args.join(" "))
    };
    stream.write_all(command.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    let read = tokio::time::timeout(READ_TIMEOUT, stream.read_to_end(&mut buf)).await;
    match read {
        Ok(Ok(_)) if buf.is_empty() => Ok(None),
        Ok(Ok(_)) => Ok(Some(buf)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "control socket read timed out")),
    }
}

fn print_reply(bytes: &[u8]) {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => println!("{}", value),
        Err(_) => println!("{}", String::from_utf8_lossy(bytes)),
    }
}
