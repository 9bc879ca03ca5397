//! Table of watched peer directories.
//!
//! Each distinct directory string is watched at most once. Entries are never
//! removed; the table only grows as configuration loading discovers new peer
//! directories. Lookups are linear scans, which is fine for the handful of
//! directories a node typically watches.

use std::fmt;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, WatchError};
use crate::mask::WATCH_INTEREST;

/// Kernel watch descriptor returned by `inotify_add_watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub i32);

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    /// Directory path exactly as it was registered.
    pub directory: String,
    /// Handle the kernel assigned to the watch.
    pub handle: WatchHandle,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new kernel watch was created.
    Added(WatchHandle),
    /// The directory was already registered; nothing was asked of the kernel.
    AlreadyWatched(WatchHandle),
}

impl Registration {
    /// The handle for the directory, regardless of whether it was new.
    #[must_use]
    pub fn handle(self) -> WatchHandle {
        match self {
            Registration::Added(handle) | Registration::AlreadyWatched(handle) => handle,
        }
    }
}

/// Registry mapping directories to kernel watch handles.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: Vec<WatchEntry>,
}

impl WatchRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watches `directory` unless an entry with the identical string exists.
    ///
    /// Matching is by exact string, so `/etc/peers` and `/etc/peers/` are
    /// distinct entries.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::AddWatch`] if the kernel rejects the watch. The
    /// registry is left unchanged in that case.
    pub fn add_watch<E>(&mut self, endpoint: &mut E, directory: &str) -> Result<Registration>
    where
        E: Endpoint + ?Sized,
    {
        if let Some(entry) = self.entries.iter().find(|e| e.directory == directory) {
            return Ok(Registration::AlreadyWatched(entry.handle));
        }

        let handle = endpoint
            .add_watch(directory, WATCH_INTEREST)
            .map_err(|source| WatchError::AddWatch {
                directory: directory.to_string(),
                source,
            })?;

        debug!(directory = %directory, handle = %handle, "Added watch");

        self.entries.push(WatchEntry {
            directory: directory.to_string(),
            handle,
        });

        Ok(Registration::Added(handle))
    }

    /// Returns the directory watched under `handle`, if any.
    #[must_use]
    pub fn resolve(&self, handle: WatchHandle) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.directory.as_str())
    }

    /// Number of watched directories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.iter()
    }
}
