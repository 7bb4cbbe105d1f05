//! framewm
//!
//! A small reparenting X11 window manager: every client gets a slim or a
//! fully decorated frame, driven by X events and a line-based command socket.

mod commands;
mod config;
mod ipc;
mod shared;
mod wm;
mod x11_async;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::protocol::Event;

use config::Config;
use ipc::{IpcHandle, IpcServer};
use wm::WindowManager;

/// Main application state
struct FramewmApp {
    /// X11 async event stream (non-blocking polling)
    x11_stream: x11_async::X11EventStream,

    wm: WindowManager,

    ipc: IpcHandle,
}

impl FramewmApp {
    async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Config::load(config_path.as_deref())?;

        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        info!("Connected to X server, screen {}", screen_num);

        let mut wm = WindowManager::new(conn.clone(), screen_num, &config)?;
        wm.scan_existing()?;

        let x11_stream = x11_async::X11EventStream::new(conn)?;
        let ipc = IpcServer::new(config.ipc.socket_path()).start().await?;

        Ok(Self { x11_stream, wm, ipc })
    }

    /// Main event loop (event buffering: drain everything queued, then handle)
    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!("Starting main event loop");
        let mut event_buffer: Vec<Event> = Vec::new();

        loop {
            if let Err(e) = self.x11_stream.flush() {
                error!("X11 connection lost: {}", e);
                break;
            }

            // Replies read while handling events can queue more events
            if let Err(e) = self.x11_stream.drain(&mut event_buffer) {
                error!("Error polling for X11 events: {}", e);
                break;
            }
            if !event_buffer.is_empty() {
                for event in event_buffer.drain(..) {
                    if let Err(e) = self.wm.handle_event(event) {
                        warn!("Failed to handle X11 event: {}", e);
                    }
                }
                continue;
            }

            tokio::select! {
                () = self.x11_stream.wait_readable() => {}

                request = self.ipc.recv(), if self.ipc.is_open() => {
                    let Some(request) = request else {
                        warn!("IPC server stopped, commands are no longer accepted");
                        continue;
                    };
                    debug!("IPC command: {}", request.line);
                    let reply = self.wm.run_command(&request.line);
                    if request.reply.send(reply).is_err() {
                        debug!("IPC client went away before the reply");
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, releasing clients...");
                    break;
                }
            }
        }

        self.wm.shutdown()
    }
}

/// `--config <path>` is the only option
fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            other => warn!("Ignoring unknown argument '{}'", other),
        }
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "framewm=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting framewm");
    let config_path = parse_args()?;

    // Handle SIGTERM and SIGINT
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    let app = FramewmApp::new(config_path).await?;
    if let Err(e) = app.run(shutdown_rx).await {
        error!("Application error: {}", e);
        return Err(e);
    }
    Ok(())
}
