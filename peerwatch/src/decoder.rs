//! Decoder for the packed inotify event stream.
//!
//! A single `read` on an inotify descriptor returns whole records laid out
//! back to back:
//!
//! ```text
//! offset  size  field
//!      0     4  wd      (i32, native endian)
//!      4     4  mask    (u32)
//!      8     4  cookie  (u32, unused here)
//!     12     4  len     (u32, bytes of name that follow)
//!     16   len  name    (NUL terminated, NUL padded)
//! ```
//!
//! Fields are extracted by bounds-checked slicing rather than by casting the
//! buffer to a struct, so the decoder places no alignment requirement on its
//! input.

use thiserror::Error;
use tracing::warn;

use crate::mask::EventMask;
use crate::registry::WatchHandle;

/// Size of the fixed record header.
pub const HEADER_SIZE: usize = 16;

const WD_OFFSET: usize = 0;
const MASK_OFFSET: usize = 4;
const LEN_OFFSET: usize = 12;

/// One decoded change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Watch the record belongs to.
    pub handle: WatchHandle,
    /// Change bits, including any the kernel set that this crate ignores.
    pub mask: EventMask,
    /// Entry name within the watched directory.
    ///
    /// `None` when the record concerns the watched directory itself, or when
    /// the name is not valid UTF-8 and so cannot be handed on unchanged.
    pub name: Option<String>,
}

/// Errors produced when a buffer does not hold whole records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than [`HEADER_SIZE`] bytes remained at a record boundary.
    #[error("truncated record header at offset {offset} ({remaining} bytes remaining)")]
    TruncatedHeader { offset: usize, remaining: usize },

    /// The header announced more name bytes than the buffer holds.
    #[error("truncated record name at offset {offset} (expected {expected} bytes, {remaining} remaining)")]
    TruncatedName {
        offset: usize,
        expected: usize,
        remaining: usize,
    },
}

/// Decodes every record in `buf`.
///
/// ```
/// use peerwatch::decoder::decode;
///
/// let records: Vec<_> = decode(&[]).collect();
/// assert!(records.is_empty());
/// ```
#[must_use]
pub fn decode(buf: &[u8]) -> Records<'_> {
    Records {
        buf,
        offset: 0,
        failed: false,
    }
}

/// Iterator over the records of one read buffer.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Records<'_> {
    /// Bytes consumed by the records decoded so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.offset
    }

    fn next_record(&mut self) -> Result<RawRecord, DecodeError> {
        let offset = self.offset;
        let rest = &self.buf[offset..];

        let header = rest
            .get(..HEADER_SIZE)
            .ok_or(DecodeError::TruncatedHeader {
                offset,
                remaining: rest.len(),
            })?;

        let handle = WatchHandle(i32::from_ne_bytes(word(header, WD_OFFSET)));
        let mask = EventMask::from_bits_retain(u32::from_ne_bytes(word(header, MASK_OFFSET)));
        let name_len = u32::from_ne_bytes(word(header, LEN_OFFSET)) as usize;

        let end = HEADER_SIZE.checked_add(name_len);
        let name_bytes = end
            .and_then(|end| rest.get(HEADER_SIZE..end))
            .ok_or(DecodeError::TruncatedName {
                offset,
                expected: name_len,
                remaining: rest.len() - HEADER_SIZE,
            })?;

        self.offset += HEADER_SIZE + name_bytes.len();

        Ok(RawRecord {
            handle,
            mask,
            name: decode_name(name_bytes),
        })
    }
}

impl Iterator for Records<'_> {
    type Item = Result<RawRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }

        let result = self.next_record();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Copies the 4-byte field at `offset` out of a header slice.
fn word(header: &[u8], offset: usize) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&header[offset..offset + 4]);
    bytes
}

/// Strips NUL padding; an empty result means the record has no name.
///
/// Names that are not UTF-8 are dropped rather than replaced, since a
/// rewritten name would point at a file that does not exist.
fn decode_name(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if end == 0 {
        return None;
    }

    match std::str::from_utf8(&bytes[..end]) {
        Ok(name) => Some(name.to_string()),
        Err(e) => {
            warn!(
                name = %bytes[..end].escape_ascii(),
                error = %e,
                "Skipping file with non UTF-8 name"
            );
            None
        }
    }
}

/// Builds one record the way the kernel lays it out, padding the name to a
/// multiple of four bytes. Test-only.
#[cfg(test)]
pub(crate) fn encode_record(handle: i32, mask: EventMask, name: Option<&str>) -> Vec<u8> {
    let name_len = name.map_or(0, |n| (n.len() + 1).div_ceil(4) * 4);
    let mut out = Vec::with_capacity(HEADER_SIZE + name_len);
    out.extend_from_slice(&handle.to_ne_bytes());
    out.extend_from_slice(&mask.bits().to_ne_bytes());
    out.extend_from_slice(&0u32.to_ne_bytes());
    out.extend_from_slice(&(name_len as u32).to_ne_bytes());
    if let Some(name) = name {
        out.extend_from_slice(name.as_bytes());
        out.resize(HEADER_SIZE + name_len, 0);
    }
    out
}
