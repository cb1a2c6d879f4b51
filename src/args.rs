use clap::Parser;
use std::path::PathBuf;

use crate::config;

#[derive(Parser, Debug)]
#[command(name = "eva-controllerd")]
#[command(author = "eva-controller contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stage-manager and pinned-group layout controller for Hyprland", long_about = None)]
pub struct Args {
    /// Configuration file path.
    #[arg(short, long, default_value = "/etc/eva-controller.toml")]
    pub config: PathBuf,

    /// Override the control socket path from the config file.
    #[arg(long)]
    pub control_socket: Option<PathBuf>,

    /// Override the Hyprland IPC symlink prefix used when the runtime
    /// directory path is too long for a Unix socket address.
    #[arg(long)]
    pub short_path_prefix: Option<String>,

    /// Verbose (debug-level) logging.
    #[arg(short, long, action)]
    pub verbose: bool,
}

impl Args {
    pub fn load_config(&self) -> Result<config::Config, Box<dyn std::error::Error>> {
        let mut cfg = config::Config::load(&self.config)?;
        if let Some(path) = &self.control_socket {
            cfg.socket.control_path = path.clone();
        }
        if let Some(prefix) = &self.short_path_prefix {
            cfg.socket.short_path_prefix = prefix.clone();
        }
        Ok(cfg)
    }
}
