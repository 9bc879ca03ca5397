//! peerwatch - live reload of peer configuration directories.
//!
//! This crate turns Linux inotify notifications on a set of peer configuration
//! directories into discrete "reload this peer" and "remove this peer"
//! actions, so a long-running daemon can pick up configuration changes without
//! restarting.
//!
//! # Overview
//!
//! A [`PeerWatcher`] owns one non-blocking inotify descriptor and a registry of
//! watched directories. When the host's event loop reports the descriptor
//! readable, [`PeerWatcher::handle_readable`] drains the kernel queue, decodes
//! the packed event records and hands each resulting [`Action`] to a
//! [`PeerConfigSink`]. Deletes take priority over reloads, and editor backup
//! files (names ending in `~`) are ignored.
//!
//! # Modules
//!
//! - [`watcher`]: Host context and drain loop
//! - [`registry`]: Directory to watch-handle table
//! - [`decoder`]: Packed inotify record decoder
//! - [`dispatch`]: Record classification and sink traits
//! - [`mask`]: Inotify event mask bits
//! - [`endpoint`]: Kernel notification endpoint
//! - [`host`]: Tokio readiness driver
//! - [`sink`]: JSON-lines action sink
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types

pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod endpoint;
pub mod error;
#[cfg(target_os = "linux")]
pub mod host;
pub mod mask;
pub mod registry;
pub mod sink;
pub mod watcher;

pub use config::{Config, ConfigError, LogFormat};
pub use decoder::{decode, DecodeError, RawRecord};
pub use dispatch::{classify, Action, PeerConfigSink, WatchRegistrar};
pub use endpoint::Endpoint;
#[cfg(target_os = "linux")]
pub use endpoint::InotifyEndpoint;
pub use error::{Result, WatchError};
pub use mask::EventMask;
pub use registry::{Registration, WatchEntry, WatchHandle, WatchRegistry};
pub use sink::JsonLinesSink;
pub use watcher::{DrainStats, PeerWatcher};
