//! Peer directory watcher.
//!
//! [`PeerWatcher`] is the context the host threads through its event loop. It
//! owns the notification endpoint and the watch registry, and drains the
//! endpoint whenever the host reports it readable.
//!
//! # Architecture
//!
//! Each readiness signal runs one drain: read a buffer, decode its records,
//! classify and dispatch each one in order, then read again until the endpoint
//! reports it would block. Buffer N is fully dispatched before buffer N+1 is
//! read. Everything happens on the caller's thread; no reads block.
//!
//! # Example
//!
//! ```no_run
//! use peerwatch::dispatch::{PeerConfigSink, WatchRegistrar};
//! use peerwatch::watcher::PeerWatcher;
//!
//! struct Peers;
//!
//! impl PeerConfigSink for Peers {
//!     fn load_peer_config(&mut self, _: &mut dyn WatchRegistrar, dir: &str, file: &str) {
//!         println!("load {dir}/{file}");
//!     }
//!     fn delete_peer_config(&mut self, _: &mut dyn WatchRegistrar, dir: &str, file: &str) {
//!         println!("delete {dir}/{file}");
//!     }
//! }
//!
//! let mut watcher = PeerWatcher::open()?;
//! watcher.add_watch("/etc/fastd/peers");
//!
//! // Call whenever the watcher's descriptor becomes readable.
//! let stats = watcher.handle_readable(&mut Peers)?;
//! println!("{} records", stats.records);
//! # Ok::<(), peerwatch::WatchError>(())
//! ```

use std::io;

use tracing::{error, trace};

use crate::decoder::decode;
use crate::dispatch::{classify, dispatch, Action, PeerConfigSink, WatchRegistrar};
use crate::endpoint::Endpoint;
use crate::error::{Result, WatchError};
use crate::registry::{Registration, WatchRegistry};

/// Bytes requested per read; holds many records.
pub const EVENT_BUFFER_SIZE: usize = 4096;

/// Read buffer aligned like the kernel's `struct inotify_event`.
#[repr(C, align(4))]
struct EventBuffer([u8; EVENT_BUFFER_SIZE]);

#[cfg(target_os = "linux")]
const _: () = assert!(
    std::mem::align_of::<EventBuffer>() >= std::mem::align_of::<libc::inotify_event>()
);

/// Counters for one drain invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Non-empty buffers read from the endpoint.
    pub buffers: usize,
    /// Records decoded across all buffers.
    pub records: usize,
    /// Reload actions dispatched.
    pub reloads: usize,
    /// Delete actions dispatched.
    pub deletes: usize,
    /// Records that produced no action.
    pub ignored: usize,
}

/// Owns the notification endpoint and the directories watched through it.
#[derive(Debug)]
pub struct PeerWatcher<E> {
    endpoint: E,
    registry: WatchRegistry,
}

#[cfg(target_os = "linux")]
impl PeerWatcher<crate::endpoint::InotifyEndpoint> {
    /// Opens an inotify endpoint with an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::EndpointInit`] if inotify cannot be initialized.
    /// Hosts should treat this as fatal.
    pub fn open() -> Result<Self> {
        let endpoint =
            crate::endpoint::InotifyEndpoint::open().map_err(WatchError::EndpointInit)?;
        Ok(Self::with_endpoint(endpoint))
    }
}

impl<E: Endpoint> PeerWatcher<E> {
    /// Wraps an existing endpoint.
    pub fn with_endpoint(endpoint: E) -> Self {
        Self {
            endpoint,
            registry: WatchRegistry::new(),
        }
    }

    /// Watches `directory` for peer configuration changes.
    ///
    /// Idempotent. If the kernel refuses the watch the failure is logged and
    /// the directory stays unwatched; calling again later is safe.
    pub fn add_watch(&mut self, directory: &str) {
        if let Err(e) = self.try_add_watch(directory) {
            error!(directory = %directory, error = %e, "Failed to add watch");
        }
    }

    /// Watches each of `directories`, logging failures.
    ///
    /// Returns how many directories are watched afterwards, so a host can
    /// refuse to start when none are.
    pub fn watch_directories<I>(&mut self, directories: I) -> usize
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for directory in directories {
            self.add_watch(directory.as_ref());
        }
        self.registry.len()
    }

    /// Like [`add_watch`](Self::add_watch) but reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::AddWatch`] if the kernel refuses the watch.
    pub fn try_add_watch(&mut self, directory: &str) -> Result<Registration> {
        self.registry.add_watch(&mut self.endpoint, directory)
    }

    /// The watched directories.
    #[must_use]
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    #[must_use]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut E {
        &mut self.endpoint
    }

    /// Drains the endpoint, dispatching every queued change to `sink`.
    ///
    /// Returns once the endpoint reports no more data.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Read`] for any read failure other than "would
    /// block", and [`WatchError::Decode`] if a buffer does not hold whole
    /// records. Both are fatal.
    pub fn handle_readable<S>(&mut self, sink: &mut S) -> Result<DrainStats>
    where
        S: PeerConfigSink + ?Sized,
    {
        let mut buf = EventBuffer([0u8; EVENT_BUFFER_SIZE]);
        let mut stats = DrainStats::default();

        loop {
            let len = match self.endpoint.read(&mut buf.0) {
                Ok(0) => break,
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WatchError::Read(e)),
            };

            stats.buffers += 1;
            trace!(bytes = len, "Read event buffer");

            for record in decode(&buf.0[..len]) {
                let record = record?;
                stats.records += 1;

                let action = classify(&record, &self.registry);
                match action {
                    Action::Reload { .. } => stats.reloads += 1,
                    Action::Delete { .. } => stats.deletes += 1,
                    Action::Ignore => {
                        stats.ignored += 1;
                        continue;
                    }
                }
                dispatch(&action, sink, self);
            }
        }

        trace!(
            buffers = stats.buffers,
            records = stats.records,
            reloads = stats.reloads,
            deletes = stats.deletes,
            ignored = stats.ignored,
            "Drained notification endpoint"
        );

        Ok(stats)
    }
}

impl<E: Endpoint> WatchRegistrar for PeerWatcher<E> {
    fn watch_directory(&mut self, directory: &str) {
        self.add_watch(directory);
    }
}

#[cfg(unix)]
impl<E: std::os::fd::AsRawFd> std::os::fd::AsRawFd for PeerWatcher<E> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.endpoint.as_raw_fd()
    }
}
