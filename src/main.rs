//! eva-controllerd - daemon entry point.
//!
//! Wires together the IPC transport (§4.A), the event router (§4.C) on its
//! own OS thread, the window/pin, layout and stage controllers (§4.D-F),
//! and the Unix-socket control server (§4.G). See spec §5 for the
//! concurrency model this wiring implements.

mod args;
mod cache;
mod commands;
mod config;
mod diagnostics;
mod error;
mod events;
mod ipc;
mod layout;
mod model;
mod notify;
mod pin;
mod stage;

use args::Args;
use clap::Parser;
use commands::Dispatcher;
use config::Config;
use events::EventKind;
use ipc::{RawFrame, Transport};
use layout::LayoutController;
use log::{debug, error, info, warn};
use pin::WindowController;
use stage::StageController;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::new()
        .parse_filters(&format!("eva_controller={},eva_controllerd={}", log_level, log_level))
        .init();

    info!("eva-controllerd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match args.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // The control server, command dispatch and event-router fan-out all run
    // on this single-threaded scheduler (spec §5: "a main scheduler that
    // runs the control server, command invocations, and compositor I/O").
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        eprintln!("Fatal error: {}", e);
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(Transport::new(&config.socket.short_path_prefix)?);
    let windows = Arc::new(WindowController::new(transport.clone(), config.cache.short_ttl_secs));
    let layout = Arc::new(LayoutController::new(windows.clone()));
    let stage = Arc::new(StageController::new(
        windows.clone(),
        config.stage.clone(),
        config.debounce.stage_event_ms,
    ));
    let dispatcher = Arc::new(Dispatcher::new(windows.clone(), layout.clone(), stage.clone()));

    // Event socket reader runs on its own OS thread with its own
    // current-thread runtime; it is a pure producer onto `frame_tx` (spec
    // §5, §9: "the event thread is a pure producer; all state mutation
    // happens on the main scheduler").
    let (frame_tx, frame_rx) = mpsc::unbounded_channel::<RawFrame>();
    let event_transport = transport.clone();
    std::thread::Builder::new()
        .name("eva-event-socket".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    error!("failed to start event-socket runtime: {}", e);
                    return;
                }
            };
            rt.block_on(event_transport.event_stream(frame_tx));
        })?;

    let router = build_router(stage.clone());
    tokio::spawn(router.run(frame_rx));

    run_control_server(&config, dispatcher).await
}

/// Wire the stage controller's incremental handlers to the three event
/// kinds it cares about (spec §4.F.4); every other registered event type
/// is recognised by `events::classify` but has no subscriber here.
fn build_router(stage: Arc<StageController>) -> Arc<events::Router> {
    let mut router = events::Router::new();

    let open_stage = stage.clone();
    router.on(
        EventKind::OpenWindow,
        Arc::new(move |event| {
            let stage = open_stage.clone();
            let address = event.data().split(',').next().unwrap_or("").to_string();
            tokio::spawn(async move {
                if let Err(e) = stage.on_open_window(&address).await {
                    warn!("openwindow handling failed: {}", e);
                }
            });
        }),
    );

    let close_stage = stage.clone();
    router.on(
        EventKind::CloseWindow,
        Arc::new(move |event| {
            let stage = close_stage.clone();
            let address = event.data().split(',').next().unwrap_or("").to_string();
            tokio::spawn(async move {
                if let Err(e) = stage.on_close_window(&address).await {
                    warn!("closewindow handling failed: {}", e);
                }
            });
        }),
    );

    let workspace_stage = stage;
    router.on(
        EventKind::Workspace,
        Arc::new(move |_event| {
            let stage = workspace_stage.clone();
            tokio::spawn(async move {
                if let Err(e) = stage.execute_queued_tasks().await {
                    warn!("queued stage-entry task failed: {}", e);
                }
            });
        }),
    );

    Arc::new(router)
}

/// Accept loop for the control socket (spec §4.G, §6): one connection per
/// request, read up to 1024 bytes, dispatch, write the reply if any, close.
async fn run_control_server(config: &Config, dispatcher: Arc<Dispatcher>) -> Result<(), Box<dyn std::error::Error>> {
    let socket_path = &config.socket.control_path;
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    let listener = UnixListener::bind(socket_path)?;
    info!("control server listening on {}", socket_path.display());

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _addr) = accepted?;
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, dispatcher).await {
                        debug!("control connection error: {}", e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                let _ = std::fs::remove_file(socket_path);
                return Ok(());
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Ok(());
    }
    let msg = String::from_utf8_lossy(&buf[..n]);
    let msg = msg.trim();
    debug!("received message: {}", msg);

    if let Some(reply) = dispatcher.dispatch(msg).await {
        stream.write_all(&reply).await?;
    }
    stream.shutdown().await?;
    Ok(())
}
