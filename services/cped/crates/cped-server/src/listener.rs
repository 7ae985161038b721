//! Unix-socket listener.
//!
//! Connections are accepted and drained; each chunk read is logged. There
//! is no framing and nothing is ever written back.

use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::UnixListener;

/// Largest chunk read from a connection at once.
pub const CHUNK_SIZE: usize = 1024;

/// Pause after a failed accept. Errors such as EMFILE persist until
/// connections close, so retrying at once only spins.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind the listener, replacing a stale socket file left by a previous run.
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("removing stale socket {}", path.display()))?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    UnixListener::bind(path).with_context(|| format!("binding {}", path.display()))
}

/// Accept connections forever, draining each on its own task.
pub async fn serve(listener: UnixListener) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tracing::debug!("connection accepted");
                tokio::spawn(async move {
                    drain(stream).await;
                });
            }
            Err(e) => accept_failed(&e).await,
        }
    }
}

/// Log an accept error and back off before the next attempt.
async fn accept_failed(e: &io::Error) {
    if e.kind() == ErrorKind::WouldBlock {
        return;
    }
    tracing::warn!(error = %e, "accept failed; backing off");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Read until EOF or error, logging every chunk. Returns the byte count.
pub async fn drain<S: AsyncRead + Unpin>(mut stream: S) -> usize {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0;
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                tracing::info!(bytes = n, data = %String::from_utf8_lossy(&buf[..n]), "received");
            }
            Err(e) => {
                tracing::debug!(error = %e, "read failed");
                break;
            }
        }
    }
    tracing::info!(total, "closing connection");
    total
}
