//! The accept loop every fleet tier runs.
//!
//! One connection at a time: accept, read one request, hand it to the
//! policy (which may itself open a connection to the next tier), write one
//! response, close, then accept again. Nothing is queued beyond the OS
//! listen backlog.
//!
//! The accept is polled with a short timeout so an idle tier still notices
//! a terminate request within one poll interval.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};

use fleet_core::config::RelayConfig;
use fleet_core::{Request, Response, Slot};

use crate::codec::{read_record, within, write_record};
use crate::policy::TierPolicy;
use crate::shutdown::ShutdownFlag;
use crate::stats::TierStats;

/// Timing knobs for one relay. Derived from [`RelayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind {0}: {1}")]
    Bind(PathBuf, std::io::Error),
}

/// Listening socket that unlinks its path when dropped.
struct BoundEndpoint {
    listener: UnixListener,
    path: PathBuf,
}

impl BoundEndpoint {
    /// Remove any stale socket left by a crashed predecessor, then bind.
    fn bind(path: &Path) -> Result<Self, RelayError> {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RelayError::Bind(path.to_path_buf(), e)),
        }
        let listener =
            UnixListener::bind(path).map_err(|e| RelayError::Bind(path.to_path_buf(), e))?;
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for BoundEndpoint {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove socket");
            }
        }
    }
}

pub struct TieredRelay<P> {
    slot: Slot,
    endpoint: BoundEndpoint,
    policy: P,
    settings: RelaySettings,
    stats: TierStats,
    shutdown: ShutdownFlag,
}

impl<P: TierPolicy> TieredRelay<P> {
    /// Bind `path` and return a relay ready to [`run`](Self::run).
    /// Must be called from inside a tokio runtime.
    pub fn bind(
        slot: Slot,
        path: &Path,
        policy: P,
        settings: RelaySettings,
        shutdown: ShutdownFlag,
    ) -> Result<Self, RelayError> {
        let endpoint = BoundEndpoint::bind(path)?;
        tracing::info!(%slot, path = %path.display(), "listening");
        Ok(Self {
            slot,
            endpoint,
            policy,
            settings,
            stats: TierStats::new(),
            shutdown,
        })
    }

    pub fn stats(&self) -> TierStats {
        self.stats.clone()
    }

    pub fn path(&self) -> &Path {
        &self.endpoint.path
    }

    /// Serve until the shutdown flag is set. The socket is closed and
    /// unlinked on return.
    pub async fn run(mut self) {
        while !self.shutdown.is_triggered() {
            let accepted =
                tokio::time::timeout(self.settings.poll_interval, self.endpoint.listener.accept())
                    .await;

            let stream = match accepted {
                // Idle tick: go round and re-check the flag.
                Err(_) => continue,
                Ok(Ok((stream, _))) => stream,
                Ok(Err(e)) => {
                    tracing::warn!(slot = %self.slot, error = %e, "accept failed");
                    continue;
                }
            };

            self.serve(stream).await;
        }

        tracing::info!(slot = %self.slot, "terminating");
        self.stats.log_summary(self.slot);
    }

    async fn serve(&mut self, mut stream: UnixStream) {
        let request = match within(
            self.settings.request_timeout,
            read_record::<Request, _>(&mut stream),
        )
        .await
        {
            Ok(r) => r,
            Err(e) => {
                // No reply: the caller sees the connection close.
                tracing::warn!(slot = %self.slot, error = %e, "error reading request");
                self.stats.record_dropped();
                return;
            }
        };

        let outcome = self.policy.handle(request, &self.stats).await;
        self.stats.record_outcome(&outcome);

        if let Err(e) = write_record(&mut stream, &Response::from(outcome)).await {
            tracing::warn!(
                slot = %self.slot,
                requester_id = request.requester_id,
                error = %e,
                "error sending response"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{Failure, Outcome};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Doubles the value; fails on zero.
    struct Doubler;

    impl TierPolicy for Doubler {
        async fn handle(&mut self, request: Request, _stats: &TierStats) -> Outcome {
            if request.value == 0.0 {
                Outcome::Failed(Failure::Downstream)
            } else {
                Outcome::Value(request.value * 2.0)
            }
        }
    }

    fn fast() -> RelaySettings {
        RelaySettings {
            poll_interval: Duration::from_millis(20),
            request_timeout: Some(Duration::from_millis(200)),
        }
    }

    async fn ask(path: &Path, request: Request) -> Response {
        let mut stream = UnixStream::connect(path).await.unwrap();
        write_record(&mut stream, &request).await.unwrap();
        read_record(&mut stream).await.unwrap()
    }

    #[tokio::test]
    async fn serves_requests_sequentially_and_stops_on_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doubler.sock");
        let shutdown = ShutdownFlag::new();

        let relay =
            TieredRelay::bind(Slot::dispatch(), &path, Doubler, fast(), shutdown.clone()).unwrap();
        let stats = relay.stats();
        let task = tokio::spawn(relay.run());

        assert_eq!(ask(&path, Request::new(1, 2.0)).await.result, 4.0);
        assert!(ask(&path, Request::new(2, 0.0)).await.is_failure());
        assert_eq!(stats.served(), 1);
        assert_eq!(stats.failed(), 1);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("relay should stop within a few poll intervals")
            .unwrap();
        assert!(!path.exists(), "socket must be unlinked on exit");
    }

    #[tokio::test]
    async fn short_request_is_dropped_without_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.sock");
        let shutdown = ShutdownFlag::new();

        let relay =
            TieredRelay::bind(Slot::dispatch(), &path, Doubler, fast(), shutdown.clone()).unwrap();
        let stats = relay.stats();
        let task = tokio::spawn(relay.run());

        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream.write_all(&[0u8; 5]).await.unwrap();
        stream.shutdown().await.unwrap();

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        assert!(reply.is_empty(), "no bytes may be sent for a short request");
        assert_eq!(stats.dropped(), 1);
        assert_eq!(stats.handled(), 0);

        // The tier keeps serving after a drop.
        assert_eq!(ask(&path, Request::new(1, 1.5)).await.result, 3.0);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stalled_client_is_dropped_after_request_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stall.sock");
        let shutdown = ShutdownFlag::new();

        let relay =
            TieredRelay::bind(Slot::dispatch(), &path, Doubler, fast(), shutdown.clone()).unwrap();
        let stats = relay.stats();
        let task = tokio::spawn(relay.run());

        // Connect and send nothing; keep the socket open.
        let _idle = UnixStream::connect(&path).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(stats.dropped(), 1);

        assert_eq!(ask(&path, Request::new(1, 5.0)).await.result, 10.0);

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stale_socket_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale.sock");
        std::fs::write(&path, b"left over").unwrap();

        let relay = TieredRelay::bind(
            Slot::dispatch(),
            &path,
            Doubler,
            fast(),
            ShutdownFlag::new(),
        );
        assert!(relay.is_ok());
    }

    #[tokio::test]
    async fn bind_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.sock");

        let err = TieredRelay::bind(Slot::dispatch(), &path, Doubler, fast(), ShutdownFlag::new())
            .err()
            .expect("bind must fail");
        assert!(matches!(err, RelayError::Bind(..)));
    }
}
