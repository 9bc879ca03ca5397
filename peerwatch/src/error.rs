//! Error types for peerwatch.
//!
//! The library distinguishes fatal conditions (the notification endpoint is
//! unusable) from recoverable ones (a single directory could not be watched).
//! Fatal errors are returned to the host loop, which decides whether to
//! terminate the process.

use std::io;

use thiserror::Error;

use crate::decoder::DecodeError;

/// Errors that can occur while watching peer configuration directories.
///
/// # Examples
///
/// ```ignore
/// use peerwatch::error::WatchError;
///
/// fn drain(watcher: &mut PeerWatcher<InotifyEndpoint>) -> Result<(), WatchError> {
///     watcher.handle_readable(&mut sink)?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum WatchError {
    /// The kernel notification endpoint could not be created.
    #[error("failed to initialize notification endpoint: {0}")]
    EndpointInit(#[source] io::Error),

    /// Reading from the notification endpoint failed with something other
    /// than "would block".
    #[error("failed to read from notification endpoint: {0}")]
    Read(#[source] io::Error),

    /// The kernel handed back a buffer that does not decode into whole records.
    #[error("malformed event buffer: {0}")]
    Decode(#[from] DecodeError),

    /// The kernel refused to watch a directory.
    ///
    /// The directory stays unwatched; calling `add_watch` again is safe.
    #[error("failed to watch {directory}: {source}")]
    AddWatch {
        directory: String,
        #[source]
        source: io::Error,
    },
}

impl WatchError {
    /// Returns `true` if the error leaves the notification endpoint unusable.
    ///
    /// Hosts are expected to terminate on fatal errors.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchError::EndpointInit(_) | WatchError::Read(_) | WatchError::Decode(_)
        )
    }
}

/// A specialized `Result` type for watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;
