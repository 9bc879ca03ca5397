//! Maps decoded records to peer actions.
//!
//! Policy, in order:
//!
//! 1. Records without a name (events on the watched directory itself) are
//!    ignored. This includes deletion of the watched directory.
//! 2. Records whose handle is not in the registry are ignored with a warning.
//! 3. Names ending in [`BACKUP_SIGIL`] are ignored, so editor backup writes do
//!    not trigger reloads.
//! 4. A set delete bit yields [`Action::Delete`], whatever else is set.
//! 5. Any reload-triggering bit yields exactly one [`Action::Reload`].
//! 6. Anything else is ignored.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::decoder::RawRecord;
use crate::mask::EventMask;
use crate::registry::WatchRegistry;

/// Trailing character editors use for backup copies.
pub const BACKUP_SIGIL: char = '~';

/// What to do in response to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// (Re)load the peer configuration file.
    Reload { directory: String, filename: String },
    /// Remove the peer whose configuration file was deleted.
    Delete { directory: String, filename: String },
    /// Nothing to do.
    Ignore,
}

/// Registers additional directories while configuration is being loaded.
///
/// Handed to [`PeerConfigSink`] so a loaded configuration can pull in further
/// peer directories on the same thread.
pub trait WatchRegistrar {
    /// Watches `directory`; failures are logged, not returned.
    fn watch_directory(&mut self, directory: &str);
}

/// Peer lifecycle operations driven by the watcher.
pub trait PeerConfigSink {
    /// Loads or reloads the peer described by `directory/filename`.
    fn load_peer_config(
        &mut self,
        watches: &mut dyn WatchRegistrar,
        directory: &str,
        filename: &str,
    );

    /// Removes the peer whose configuration file `directory/filename` is gone.
    fn delete_peer_config(
        &mut self,
        watches: &mut dyn WatchRegistrar,
        directory: &str,
        filename: &str,
    );
}

/// Decides what `record` means for the peer set.
#[must_use]
pub fn classify(record: &RawRecord, registry: &WatchRegistry) -> Action {
    let Some(name) = record.name.as_deref() else {
        trace!(handle = %record.handle, mask = ?record.mask, "Ignoring directory-level event");
        return Action::Ignore;
    };

    let Some(directory) = registry.resolve(record.handle) else {
        warn!(handle = %record.handle, "Failed to find directory for watch handle");
        return Action::Ignore;
    };

    if name.ends_with(BACKUP_SIGIL) {
        debug!(filename = %name, "Ignoring file as it seems to be a backup file");
        return Action::Ignore;
    }

    if record.mask.contains(EventMask::DELETE) {
        info!(filename = %name, directory = %directory, "Removing peer");
        return Action::Delete {
            directory: directory.to_string(),
            filename: name.to_string(),
        };
    }

    if record.mask.triggers_reload() {
        info!(
            event = record.mask.label(),
            filename = %name,
            directory = %directory,
            "Reloading peer"
        );
        return Action::Reload {
            directory: directory.to_string(),
            filename: name.to_string(),
        };
    }

    trace!(filename = %name, mask = ?record.mask, "Ignoring unrecognized event");
    Action::Ignore
}

/// Hands `action` to the sink. [`Action::Ignore`] is a no-op.
pub fn dispatch<S>(action: &Action, sink: &mut S, watches: &mut dyn WatchRegistrar)
where
    S: PeerConfigSink + ?Sized,
{
    match action {
        Action::Reload {
            directory,
            filename,
        } => sink.load_peer_config(watches, directory, filename),
        Action::Delete {
            directory,
            filename,
        } => sink.delete_peer_config(watches, directory, filename),
        Action::Ignore => {}
    }
}
