//! JSON-lines peer action sink.
//!
//! Writes one JSON object per action, e.g.
//! `{"action":"reload","directory":"/etc/fastd/peers","filename":"alice"}`.
//! Used by the `peerwatch` binary so another process can consume the actions.

use std::io::Write;

use tracing::warn;

use crate::dispatch::{Action, PeerConfigSink, WatchRegistrar};

/// Serializes every dispatched action as a line of JSON.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, action: &Action) {
        let result = serde_json::to_writer(&mut self.writer, action)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());

        if let Err(e) = result {
            warn!(error = %e, "Failed to write action");
        }
    }
}

impl<W: Write> PeerConfigSink for JsonLinesSink<W> {
    fn load_peer_config(
        &mut self,
        _watches: &mut dyn WatchRegistrar,
        directory: &str,
        filename: &str,
    ) {
        self.emit(&Action::Reload {
            directory: directory.to_string(),
            filename: filename.to_string(),
        });
    }

    fn delete_peer_config(
        &mut self,
        _watches: &mut dyn WatchRegistrar,
        directory: &str,
        filename: &str,
    ) {
        self.emit(&Action::Delete {
            directory: directory.to_string(),
            filename: filename.to_string(),
        });
    }
}
