//! Bounded stream copy with a reusable stack buffer.
//!
//! Entry streams are drained into memory through a fixed-size buffer so that
//! the size limit is enforced on bytes actually produced by the decompressor,
//! not on the size an archive claims.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use thiserror::Error;

/// Buffer size for copy operations (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stack-allocated buffer for copying entry streams.
///
/// # Examples
///
/// ```
/// # use std::io::Cursor;
/// # use zipload_core::copy::{CopyBuffer, copy_with_buffer};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut buffer = CopyBuffer::new();
/// let mut input = Cursor::new(vec![0xAA_u8; 10]);
/// let mut output = Vec::new();
///
/// let copied = copy_with_buffer(&mut input, &mut output, &mut buffer, 1024)?;
/// assert_eq!(copied, 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of a bounded copy.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Reading the source or writing the destination failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The source produced more than `limit` bytes.
    #[error("stream exceeded {limit} bytes (at least {copied} produced)")]
    LimitExceeded {
        /// Bytes produced when the limit was crossed.
        copied: u64,
        /// The limit that was crossed.
        limit: u64,
    },
}

/// Copies `reader` into `writer` until EOF, refusing to go past `limit` bytes.
///
/// Bytes past the limit are never written. Interrupted reads are retried.
///
/// # Errors
///
/// Returns `CopyError::Io` if reading or writing fails, and
/// `CopyError::LimitExceeded` if the source is longer than `limit`.
#[inline]
pub fn copy_with_buffer<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    limit: u64,
) -> Result<u64, CopyError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Io(e)),
        };

        let next = total.saturating_add(bytes_read as u64);
        if next > limit {
            return Err(CopyError::LimitExceeded {
                copied: next,
                limit,
            });
        }

        writer.write_all(&buffer.buf[..bytes_read])?;
        total = next;
    }

    Ok(total)
}
