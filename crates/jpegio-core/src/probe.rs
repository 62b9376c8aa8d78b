//! JPEG signature detection.
//!
//! Identifies a JPEG stream by walking its marker structure instead of
//! decoding it: each segment is skipped using its declared length, so the
//! cost is proportional to the number of markers rather than the file size.
//! The stream position is always restored before returning.

use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::marker;

/// How much of the stream the scanner has to see before it is convinced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanStrategy {
    /// Confirm at the first well-formed start-of-scan segment.
    #[default]
    Fast,
    /// Walk through the entropy-coded data and confirm only at end-of-image.
    Strict,
}

/// Check whether the stream holds a JPEG image, using [`ScanStrategy::Fast`].
///
/// The stream position observed by the caller is unchanged afterwards.
pub fn is_jpeg<S: Read + Seek>(stream: &mut S) -> bool {
    is_jpeg_with(stream, ScanStrategy::Fast)
}

/// Check whether the stream holds a JPEG image.
///
/// # Arguments
///
/// * `stream` - Seekable stream positioned at the candidate image
/// * `strategy` - When to stop scanning and confirm
///
/// # Returns
///
/// `true` if the marker structure was confirmed. Read errors, short reads and
/// segment lengths running past the end of the stream all count as `false`.
pub fn is_jpeg_with<S: Read + Seek>(stream: &mut S, strategy: ScanStrategy) -> bool {
    let start = match stream.stream_position() {
        Ok(pos) => pos,
        Err(e) => {
            log::debug!("probe: cannot determine stream position: {e}");
            return false;
        }
    };

    let confirmed = scan_markers(stream, start, strategy).unwrap_or_else(|e| {
        log::trace!("probe: stopped on I/O error: {e}");
        false
    });

    if let Err(e) = stream.seek(SeekFrom::Start(start)) {
        log::warn!("probe: failed to restore stream offset {start}: {e}");
    }
    log::trace!("probe: {strategy:?} scan from offset {start} -> {confirmed}");
    confirmed
}

fn scan_markers<S: Read + Seek>(
    stream: &mut S,
    start: u64,
    strategy: ScanStrategy,
) -> io::Result<bool> {
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;

    let mut magic = [0u8; 2];
    if !read_pair(stream, &mut magic)? || magic != marker::SOI_BYTES {
        return Ok(false);
    }

    let mut in_scan = false;
    loop {
        if !read_pair(stream, &mut magic)? {
            return Ok(false);
        }
        let [lead, kind] = magic;

        if lead != marker::PREFIX && !in_scan {
            return Ok(false);
        }
        if lead != marker::PREFIX || kind == marker::PREFIX {
            // Fill bytes, or entropy-coded data while inside a scan
            stream.seek(SeekFrom::Current(-1))?;
            continue;
        }
        if kind == marker::EOI {
            return Ok(true);
        }
        if in_scan && kind == marker::STUFFED {
            continue;
        }
        if !marker::has_length(kind) {
            continue;
        }

        let size = match stream.read_u16::<BigEndian>() {
            Ok(size) => u64::from(size),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(false),
            Err(e) => return Err(e),
        };
        if size < 2 {
            return Ok(false);
        }

        let inner_start = stream.stream_position()?;
        let expected = inner_start + size - 2;
        let reached = stream.seek(SeekFrom::Current(size as i64 - 2))?;
        if reached != expected || reached > end {
            return Ok(false);
        }

        if kind == marker::SOS {
            match strategy {
                ScanStrategy::Fast => return Ok(true),
                ScanStrategy::Strict => in_scan = true,
            }
        }
    }
}

/// Read exactly two bytes, returning `false` on a short read.
fn read_pair<S: Read>(stream: &mut S, buf: &mut [u8; 2]) -> io::Result<bool> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
