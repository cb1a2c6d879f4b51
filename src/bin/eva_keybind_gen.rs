//! eva-keybind-gen - interactive keybind file generator (spec §6 "CLI
//! surface"). Fetches the action catalogue from a running daemon via
//! `get_actions` and prompts the user to build `bind=` lines for Hyprland's
//! config, mirroring the original `run.py`.

use eva_controller::config::Config;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const OUTPUT_FILE: &str = "hyprland_eva_controller_keybinds.conf";

#[tokio::main]
async fn main() {
    let socket_path = Config::load(&PathBuf::from("/etc/eva-controller.toml"))
        .map(|c| c.socket.control_path)
        .unwrap_or_else(|_| PathBuf::from("/tmp/hyprland_controller.sock"));

    let actions = match fetch_actions(&socket_path).await {
        Ok(actions) if !actions.is_empty() => actions,
        Ok(_) => {
            println!("No actions available. Exiting.");
            return;
        }
        Err(e) => {
            eprintln!("Error communicating with server: {}", e);
            println!("No actions available. Exiting.");
            return;
        }
    };

    let mut keybinds = Vec::new();
    loop {
        let key = prompt_key();
        let action = prompt_action(&actions);
        let args = prompt_args();

        let keybind = generate_keybind(&key, &action, &args);
        println!("\nKeybind added: {}", keybind);
        keybinds.push(keybind);

        if !prompt_yes_no("\nDo you want to add another keybind? (y/n): ") {
            break;
        }
    }

    write_keybinds(&keybinds);
}

async fn fetch_actions(socket_path: &PathBuf) -> io::Result<BTreeMap<String, String>> {
    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(b"get_actions").await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    tokio::time::timeout(READ_TIMEOUT, stream.read_to_end(&mut buf))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "control socket read timed out"))??;

    if buf.is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_slice(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn prompt_key() -> String {
    loop {
        let line = read_line("Enter the key for the keybind (e.g., d, l, g):");
        let key = line.trim().to_lowercase();
        if key.chars().count() == 1 && key.chars().all(|c| c.is_alphabetic()) {
            return key;
        }
        println!("Please enter a single alphabetic character.");
    }
}

fn prompt_action(actions: &BTreeMap<String, String>) -> String {
    println!("\nAvailable actions:");
    let entries: Vec<(&String, &String)> = actions.iter().collect();
    for (i, (name, description)) in entries.iter().enumerate() {
        println!("{}. {}: {}", i + 1, name, description);
    }
    loop {
        let choice = read_line("\nEnter the number of the action: ");
        if let Ok(n) = choice.trim().parse::<usize>() {
            if n >= 1 && n <= entries.len() {
                return entries[n - 1].0.clone();
            }
        }
        println!("Please enter a valid number.");
    }
}

fn prompt_args() -> Vec<String> {
    let line = read_line("Enter arguments for the action (press Enter if none): ");
    line.split_whitespace().map(|s| s.to_string()).collect()
}

fn prompt_yes_no(message: &str) -> bool {
    read_line(message).trim().eq_ignore_ascii_case("y")
}

fn read_line(prompt: &str) -> String {
    print!("{} ", prompt);
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().read_line(&mut line).ok();
    line
}

fn generate_keybind(key: &str, action: &str, args: &[String]) -> String {
    let args_str = args.join(" ");
    format!("bind=SUPER,{},exec,eva-ctl {} {}", key, action, args_str)
        .trim_end()
        .to_string()
}

fn write_keybinds(keybinds: &[String]) {
    let mut file = match std::fs::File::create(OUTPUT_FILE) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to write {}: {}", OUTPUT_FILE, e);
            return;
        }
    };
    for keybind in keybinds {
        let _ = writeln!(file, "{}", keybind);
    }
    println!("\nKeybinds have been written to {}", OUTPUT_FILE);
    println!("You can now include this file in your Hyprland config with:");
    if let Ok(abs) = std::fs::canonicalize(OUTPUT_FILE) {
        println!("source = {}", abs.display());
    }
}
