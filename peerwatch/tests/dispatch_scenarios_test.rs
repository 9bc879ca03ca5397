//! Integration tests for the decode → classify → dispatch pipeline.
//!
//! These tests drive a [`PeerWatcher`] through a scripted endpoint that
//! replays hand-built kernel buffers, so they run on any platform.

use std::collections::VecDeque;
use std::io;

use peerwatch::decoder::{decode, HEADER_SIZE};
use peerwatch::{
    classify, Action, Endpoint, EventMask, PeerConfigSink, PeerWatcher, WatchHandle,
    WatchRegistrar, WatchRegistry,
};

// =============================================================================
// Test Helpers
// =============================================================================

const PEER_DIR: &str = "/etc/fastd/peers";

/// Endpoint that assigns handle 7 to the first directory and replays queued
/// read results.
#[derive(Default)]
struct FakeEndpoint {
    watch_requests: Vec<String>,
    reads: VecDeque<io::Result<Vec<u8>>>,
}

impl Endpoint for FakeEndpoint {
    fn add_watch(&mut self, directory: &str, _mask: EventMask) -> io::Result<WatchHandle> {
        self.watch_requests.push(directory.to_string());
        Ok(WatchHandle(6 + self.watch_requests.len() as i32))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(Ok(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
        }
    }
}

/// Sink that records every action it receives.
#[derive(Default)]
struct ActionLog {
    actions: Vec<Action>,
}

impl PeerConfigSink for ActionLog {
    fn load_peer_config(
        &mut self,
        _watches: &mut dyn WatchRegistrar,
        directory: &str,
        filename: &str,
    ) {
        self.actions.push(Action::Reload {
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
        self.actions.push(Action::Delete {
            directory: directory.to_string(),
            filename: filename.to_string(),
        });
    }
}

/// Encodes one record in the kernel's layout with the name padded to 4 bytes.
fn record(handle: i32, mask: EventMask, name: Option<&str>) -> Vec<u8> {
    let padded = name.map_or(0, |n| (n.len() + 1).div_ceil(4) * 4);
    let mut out = Vec::new();
    out.extend_from_slice(&handle.to_ne_bytes());
    out.extend_from_slice(&mask.bits().to_ne_bytes());
    out.extend_from_slice(&0u32.to_ne_bytes());
    out.extend_from_slice(&(padded as u32).to_ne_bytes());
    if let Some(name) = name {
        out.extend_from_slice(name.as_bytes());
        out.resize(HEADER_SIZE + padded, 0);
    }
    out
}

/// Watcher with [`PEER_DIR`] registered under handle 7.
fn peer_watcher() -> PeerWatcher<FakeEndpoint> {
    let mut watcher = PeerWatcher::with_endpoint(FakeEndpoint::default());
    watcher.add_watch(PEER_DIR);
    assert_eq!(watcher.registry().resolve(WatchHandle(7)), Some(PEER_DIR));
    watcher
}

/// Queues `buffers` and runs one drain, returning the dispatched actions.
fn drain(buffers: Vec<Vec<u8>>) -> Vec<Action> {
    let mut watcher = peer_watcher();
    watcher.endpoint_mut().reads.extend(buffers.into_iter().map(Ok));

    let mut log = ActionLog::default();
    watcher.handle_readable(&mut log).expect("drain should succeed");
    log.actions
}

fn reload(filename: &str) -> Action {
    Action::Reload {
        directory: PEER_DIR.to_string(),
        filename: filename.to_string(),
    }
}

fn delete(filename: &str) -> Action {
    Action::Delete {
        directory: PEER_DIR.to_string(),
        filename: filename.to_string(),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn close_write_reloads_peer() {
    let actions = drain(vec![record(7, EventMask::CLOSE_WRITE, Some("alice"))]);
    assert_eq!(actions, vec![reload("alice")]);
}

#[test]
fn delete_removes_peer() {
    let actions = drain(vec![record(7, EventMask::DELETE, Some("bob"))]);
    assert_eq!(actions, vec![delete("bob")]);
}

#[test]
fn backup_file_is_ignored() {
    let actions = drain(vec![record(7, EventMask::MODIFY, Some("carol~"))]);
    assert!(actions.is_empty());
}

#[test]
fn delete_wins_over_modify() {
    let actions = drain(vec![record(
        7,
        EventMask::MODIFY | EventMask::DELETE,
        Some("dave"),
    )]);
    assert_eq!(actions, vec![delete("dave")]);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn registering_twice_creates_one_watch() {
    let mut watcher = peer_watcher();
    watcher.add_watch(PEER_DIR);

    assert_eq!(watcher.registry().len(), 1);
    assert_eq!(watcher.endpoint().watch_requests, vec![PEER_DIR.to_string()]);
}

#[test]
fn decode_is_lossless_across_many_records() {
    let names = ["a", "bb", "ccc", "dddd", "peer-with-a-long-file-name", "x~"];
    let mut buf = Vec::new();
    for (i, name) in names.iter().enumerate() {
        buf.extend(record(i as i32, EventMask::MODIFY, Some(name)));
    }
    buf.extend(record(99, EventMask::IGNORED, None));

    let mut records = decode(&buf);
    let decoded: Vec<_> = records.by_ref().map(|r| r.unwrap()).collect();

    assert_eq!(decoded.len(), names.len() + 1);
    for (record, name) in decoded.iter().zip(names) {
        assert_eq!(record.name.as_deref(), Some(name));
    }
    assert_eq!(decoded.last().unwrap().name, None);
    assert_eq!(records.consumed(), buf.len());
}

#[test]
fn backup_names_never_produce_actions() {
    let masks = [
        EventMask::MODIFY,
        EventMask::CLOSE_WRITE,
        EventMask::MOVED_TO,
        EventMask::DELETE,
        EventMask::DELETE | EventMask::CLOSE_WRITE,
        EventMask::ATTRIB,
    ];
    let buffers = masks
        .iter()
        .map(|&mask| record(7, mask, Some("x~")))
        .collect();

    assert!(drain(buffers).is_empty());
}

#[test]
fn unknown_handle_does_not_abort_buffer() {
    let mut buf = record(3, EventMask::CLOSE_WRITE, Some("stranger"));
    buf.extend(record(7, EventMask::CLOSE_WRITE, Some("alice")));
    buf.extend(record(7, EventMask::DELETE, Some("bob")));

    assert_eq!(drain(vec![buf]), vec![reload("alice"), delete("bob")]);
}

#[test]
fn multiple_reload_bits_collapse_into_one_action() {
    let mask = EventMask::CLOSE_WRITE | EventMask::MODIFY | EventMask::MOVED_TO;
    assert_eq!(
        drain(vec![record(7, mask, Some("erin"))]),
        vec![reload("erin")]
    );
}

#[test]
fn order_is_preserved_across_buffers() {
    let first = {
        let mut buf = record(7, EventMask::MODIFY, Some("one"));
        buf.extend(record(7, EventMask::DELETE, Some("two")));
        buf
    };
    let second = record(7, EventMask::MOVED_TO, Some("three"));

    assert_eq!(
        drain(vec![first, second]),
        vec![reload("one"), delete("two"), reload("three")]
    );
}

#[test]
fn nameless_directory_events_are_ignored() {
    let actions = drain(vec![
        record(7, EventMask::DELETE_SELF, None),
        record(7, EventMask::IGNORED, None),
    ]);
    assert!(actions.is_empty());
}

#[test]
fn classify_without_watcher() {
    let mut registry = WatchRegistry::new();
    let mut endpoint = FakeEndpoint::default();
    registry.add_watch(&mut endpoint, PEER_DIR).unwrap();

    let raw = record(7, EventMask::CLOSE_WRITE, Some("alice"));
    let parsed = decode(&raw).next().unwrap().unwrap();

    assert_eq!(classify(&parsed, &registry), reload("alice"));
}

#[test]
fn fatal_read_error_surfaces_to_host() {
    let mut watcher = peer_watcher();
    watcher
        .endpoint_mut()
        .reads
        .push_back(Err(io::Error::from_raw_os_error(9)));

    let mut log = ActionLog::default();
    let err = watcher.handle_readable(&mut log).unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("failed to read"));
}
