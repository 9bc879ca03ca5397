//! Kernel notification endpoint.
//!
//! [`Endpoint`] is the seam between the watch logic and the OS. The Linux
//! implementation, [`InotifyEndpoint`], owns one non-blocking, close-on-exec
//! inotify descriptor for the lifetime of the process.

use std::io;

use crate::mask::EventMask;
use crate::registry::WatchHandle;

/// Source of watch handles and raw event bytes.
pub trait Endpoint {
    /// Asks the OS to watch `directory` for the bits in `mask`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the watch cannot be created.
    fn add_watch(&mut self, directory: &str, mask: EventMask) -> io::Result<WatchHandle>;

    /// Reads queued event bytes without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::WouldBlock`] when the queue is empty.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

#[cfg(target_os = "linux")]
pub use self::inotify::InotifyEndpoint;

#[cfg(target_os = "linux")]
mod inotify {
    use std::ffi::CString;
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

    use tracing::debug;

    use super::Endpoint;
    use crate::mask::EventMask;
    use crate::registry::WatchHandle;

    /// Inotify descriptor opened with `IN_NONBLOCK | IN_CLOEXEC`.
    #[derive(Debug)]
    pub struct InotifyEndpoint {
        fd: OwnedFd,
    }

    impl InotifyEndpoint {
        /// Opens a new inotify instance.
        ///
        /// # Errors
        ///
        /// Returns the OS error, e.g. when the per-user instance limit is hit.
        pub fn open() -> io::Result<Self> {
            // SAFETY: inotify_init1 takes no pointers; the result is checked below.
            let fd = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }

            debug!(fd, "Opened inotify endpoint");

            // SAFETY: fd is a freshly created descriptor that nothing else owns.
            let fd = unsafe { OwnedFd::from_raw_fd(fd) };
            Ok(Self { fd })
        }
    }

    impl Endpoint for InotifyEndpoint {
        fn add_watch(&mut self, directory: &str, mask: EventMask) -> io::Result<WatchHandle> {
            let c_path = CString::new(directory)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

            // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
            let wd = unsafe {
                libc::inotify_add_watch(self.fd.as_raw_fd(), c_path.as_ptr(), mask.bits())
            };
            if wd < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(WatchHandle(wd))
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            // SAFETY: buf is valid for writes of buf.len() bytes.
            let res = unsafe {
                libc::read(
                    self.fd.as_raw_fd(),
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    buf.len(),
                )
            };
            if res < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(res as usize)
        }
    }

    impl AsRawFd for InotifyEndpoint {
        fn as_raw_fd(&self) -> RawFd {
            self.fd.as_raw_fd()
        }
    }

}
