//! Command socket
//!
//! Line-oriented commands over a Unix socket. Each line is forwarded to the
//! main loop together with a oneshot channel for its reply, so commands
//! only ever run on the main task.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A command line waiting to be executed
#[derive(Debug)]
pub struct IpcRequest {
    pub line: String,
    pub reply: oneshot::Sender<String>,
}

/// IPC server accepting command connections
pub struct IpcServer {
    path: PathBuf,
}

impl IpcServer {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Bind the socket and spawn the acceptor task
    pub async fn start(self) -> Result<IpcHandle> {
        // Remove a stale socket left by a previous run
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove stale IPC socket")?;
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.path)
            .with_context(|| format!("Failed to bind IPC socket {:?}", self.path))?;
        info!("IPC server listening on {:?}", self.path);

        let (request_tx, request_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        debug!("IPC client connected");
                        tokio::spawn(handle_client(stream, request_tx.clone()));
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        });

        Ok(IpcHandle {
            path: self.path,
            requests: request_rx,
            open: true,
        })
    }
}

/// Receiving end of the command socket; removes the socket file on drop
pub struct IpcHandle {
    path: PathBuf,
    requests: mpsc::Receiver<IpcRequest>,
    open: bool,
}

impl IpcHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False once every sender is gone; `recv` would return `None` forever
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Next command line from any client
    pub async fn recv(&mut self) -> Option<IpcRequest> {
        let request = self.requests.recv().await;
        if request.is_none() {
            self.open = false;
        }
        request
    }
}

impl Drop for IpcHandle {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Failed to remove IPC socket {:?}: {}", self.path, e);
        }
    }
}

/// Handle a connected client: one reply line per command line
async fn handle_client(stream: UnixStream, request_tx: mpsc::Sender<IpcRequest>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("IPC read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = IpcRequest {
            line,
            reply: reply_tx,
        };
        if request_tx.send(request).await.is_err() {
            break;
        }
        let reply = reply_rx
            .await
            .unwrap_or_else(|_| "error: manager is shutting down".to_string());

        if writer.write_all(format!("{}\n", reply).as_bytes()).await.is_err() {
            break;
        }
    }
    debug!("IPC client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("framewm-{}-{}.sock", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_round_trip_through_main_loop() {
        let path = socket_path("roundtrip");
        let mut handle = IpcServer::new(path.clone()).start().await.unwrap();

        let client = tokio::spawn(async move {
            let stream = UnixStream::connect(&path).await.unwrap();
            let (reader, mut writer) = stream.into_split();
            writer.write_all(b"\nFindClient xterm Any\n").await.unwrap();
            let mut lines = BufReader::new(reader).lines();
            lines.next_line().await.unwrap()
        });

        let request = handle.recv().await.unwrap();
        assert_eq!(request.line, "FindClient xterm Any");
        request.reply.send(":void:".to_string()).unwrap();

        assert_eq!(client.await.unwrap(), Some(":void:".to_string()));
    }

    #[tokio::test]
    async fn test_closed_channel_is_reported() {
        let (request_tx, request_rx) = mpsc::channel(1);
        drop(request_tx);
        let mut handle = IpcHandle {
            path: socket_path("closed"),
            requests: request_rx,
            open: true,
        };

        assert!(handle.is_open());
        assert!(handle.recv().await.is_none());
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_socket_removed_on_drop() {
        let path = socket_path("drop");
        let handle = IpcServer::new(path.clone()).start().await.unwrap();
        assert!(handle.path().exists());
        drop(handle);
        assert!(!path.exists());
    }
}
