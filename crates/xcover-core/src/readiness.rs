//! Readiness Server (spec §4.6): a Unix domain socket that tells external
//! test harnesses when every probe batch is armed, so they can avoid
//! launching the functional test suite before instrumentation is live.
//!
//! Grounded on the same one-shot-broadcast-on-accept design as a health
//! check server: a single `tokio::sync::watch` takes the place of the
//! close-a-channel idiom, each connection gets its own task, and a dead
//! peer (EPIPE, ECONNRESET) is logged and dropped rather than propagated.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use xcover_common::READY_BYTE;

use crate::error::CoreError;

/// Listens on a Unix domain socket and writes a single sentinel byte to
/// every connected peer once [`ReadinessServer::notify_ready`] has been
/// called. Peers that connect before readiness simply wait; peers that
/// connect after receive the byte immediately.
pub struct ReadinessServer {
    socket_path: PathBuf,
    ready_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl ReadinessServer {
    /// Binds `socket_path`, removing any stale socket file left behind by a
    /// previous run.
    pub async fn bind(socket_path: &Path) -> Result<Self, CoreError> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path).map_err(CoreError::Io)?;
        }
        let listener = UnixListener::bind(socket_path).map_err(CoreError::Io)?;
        let (ready_tx, ready_rx) = watch::channel(false);

        let accept_task = tokio::spawn(accept_loop(listener, ready_rx));

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            ready_tx,
            accept_task,
        })
    }

    /// Signals every connected and future peer that probes are armed.
    pub fn notify_ready(&self) {
        let _ = self.ready_tx.send(true);
    }

    /// Stops accepting new connections and removes the socket file. Already
    /// connected peers that have not yet been notified are dropped.
    pub async fn shutdown(self) {
        self.accept_task.abort();
        let _ = self.accept_task.await;
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn accept_loop(listener: UnixListener, ready_rx: watch::Receiver<bool>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let ready_rx = ready_rx.clone();
                tokio::spawn(serve_connection(stream, ready_rx));
            }
            Err(err) => {
                tracing::warn!(%err, "readiness server accept failed");
            }
        }
    }
}

async fn serve_connection(mut stream: UnixStream, mut ready_rx: watch::Receiver<bool>) {
    if !*ready_rx.borrow() {
        if ready_rx.changed().await.is_err() {
            return;
        }
    }

    // Zero-byte liveness probe: a peer that dialed in and hung up again
    // before we got around to notifying it reads back as an immediate EOF
    // here rather than a write error, so check for it and skip the write
    // silently instead of logging a spurious disconnect (spec §4.6 point 3).
    let mut probe = [0u8; 0];
    if let Ok(0) = stream.try_read(&mut probe) {
        return;
    }

    if let Err(err) = stream.write_all(&[READY_BYTE]).await {
        tracing::debug!(%err, "readiness peer disconnected before notification");
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn peer_blocks_until_ready() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("ready.sock");
        let server = ReadinessServer::bind(&socket_path).await.unwrap();

        let socket_path_clone = socket_path.clone();
        let client = tokio::spawn(async move {
            let mut stream = UnixStream::connect(&socket_path_clone).await.unwrap();
            let mut byte = [0u8; 1];
            stream.read_exact(&mut byte).await.unwrap();
            byte[0]
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        server.notify_ready();

        let byte = client.await.unwrap();
        assert_eq!(byte, READY_BYTE);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn peer_connecting_after_ready_gets_byte_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("ready.sock");
        let server = ReadinessServer::bind(&socket_path).await.unwrap();
        server.notify_ready();

        let mut stream = UnixStream::connect(&socket_path).await.unwrap();
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await.unwrap();
        assert_eq!(byte[0], READY_BYTE);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn peer_closed_before_ready_is_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("ready.sock");
        let server = ReadinessServer::bind(&socket_path).await.unwrap();

        let stream = UnixStream::connect(&socket_path).await.unwrap();
        drop(stream);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Notifying after the peer already hung up must not panic or log a
        // write failure on a stream nobody is reading anymore.
        server.notify_ready();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        server.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_removes_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("ready.sock");
        let server = ReadinessServer::bind(&socket_path).await.unwrap();
        server.shutdown().await;
        assert!(!socket_path.exists());
    }
}
