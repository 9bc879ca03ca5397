//! Inotify event mask bits.
//!
//! Bit values match `<sys/inotify.h>` on Linux so the decoder can work on raw
//! kernel buffers on any host.

use bitflags::bitflags;

bitflags! {
    /// Kinds of change a record signals.
    ///
    /// Unknown bits are retained when decoding so they can be logged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const ACCESS = 0x0000_0001;
        const MODIFY = 0x0000_0002;
        const ATTRIB = 0x0000_0004;
        const CLOSE_WRITE = 0x0000_0008;
        const CLOSE_NOWRITE = 0x0000_0010;
        const OPEN = 0x0000_0020;
        const MOVED_FROM = 0x0000_0040;
        const MOVED_TO = 0x0000_0080;
        const CREATE = 0x0000_0100;
        const DELETE = 0x0000_0200;
        const DELETE_SELF = 0x0000_0400;
        const MOVE_SELF = 0x0000_0800;
        const UNMOUNT = 0x0000_2000;
        const Q_OVERFLOW = 0x0000_4000;
        const IGNORED = 0x0000_8000;
        /// Only watch the path if it is a directory (watch request flag).
        const ONLYDIR = 0x0100_0000;
        const ISDIR = 0x4000_0000;
    }
}

/// Interest mask requested for every peer directory.
pub const WATCH_INTEREST: EventMask = EventMask::CLOSE_WRITE
    .union(EventMask::MODIFY)
    .union(EventMask::DELETE)
    .union(EventMask::MOVED_TO)
    .union(EventMask::ONLYDIR);

/// Bits that cause a peer to be reloaded.
pub const RELOAD_TRIGGERS: EventMask = EventMask::CLOSE_WRITE
    .union(EventMask::MODIFY)
    .union(EventMask::MOVED_TO);

impl EventMask {
    /// Short label naming the change, used in log lines.
    ///
    /// With several bits set, moved-in beats modify, which beats
    /// close-after-write, which beats delete.
    #[must_use]
    pub fn label(self) -> &'static str {
        if self.contains(EventMask::MOVED_TO) {
            "IN_MOVED_TO"
        } else if self.contains(EventMask::MODIFY) {
            "IN_MODIFY"
        } else if self.contains(EventMask::CLOSE_WRITE) {
            "IN_CLOSE_WRITE"
        } else if self.contains(EventMask::DELETE) {
            "IN_DELETE"
        } else {
            "unknown"
        }
    }

    /// Returns `true` if any reload-triggering bit is set.
    #[must_use]
    pub fn triggers_reload(self) -> bool {
        self.intersects(RELOAD_TRIGGERS)
    }
}
