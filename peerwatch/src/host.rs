//! Tokio readiness driver for [`PeerWatcher`].
//!
//! Registers the watcher's descriptor with the runtime's reactor and runs one
//! drain per readable edge. Meant for a `current_thread` runtime: the drain
//! itself is synchronous and never yields.

use std::future::Future;
use std::os::fd::AsRawFd;

use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::{debug, info};

use crate::dispatch::PeerConfigSink;
use crate::endpoint::Endpoint;
use crate::error::{Result, WatchError};
use crate::watcher::PeerWatcher;

/// Drains `watcher` into `sink` every time it becomes readable, until
/// `shutdown` completes.
///
/// # Errors
///
/// Returns the first fatal error from a drain, or [`WatchError::Read`] if the
/// descriptor cannot be registered with the reactor.
pub async fn run_until<E, S, F>(
    watcher: &mut PeerWatcher<E>,
    sink: &mut S,
    shutdown: F,
) -> Result<()>
where
    E: Endpoint + AsRawFd,
    S: PeerConfigSink + ?Sized,
    F: Future<Output = ()>,
{
    // The raw fd stays owned by the endpoint, which outlives `readiness`.
    let readiness = AsyncFd::with_interest(watcher.as_raw_fd(), Interest::READABLE)
        .map_err(WatchError::Read)?;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping watcher");
                return Ok(());
            }

            guard = readiness.readable() => {
                let mut guard = guard.map_err(WatchError::Read)?;
                let stats = watcher.handle_readable(sink)?;
                // The drain stopped on "would block", so readiness is stale.
                guard.clear_ready();
                debug!(records = stats.records, "Handled readiness");
            }
        }
    }
}
