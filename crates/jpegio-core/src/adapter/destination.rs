//! Push-side adapter: drains an encoder into a stream through a fixed buffer.

use std::io::{self, Write};

/// Capacity of the encode-side output buffer.
pub const OUTPUT_BUFFER_SIZE: usize = 4096;

/// A fixed-capacity write buffer in front of a stream.
///
/// The encoder pushes bytes into the buffer. A full buffer is written to the
/// stream as a whole when more bytes arrive; when encoding finishes, [`term_destination`] writes only
/// the bytes produced since the last drain.
///
/// [`Write::flush`] does not drain the buffer: only a full buffer or
/// `term_destination` reaches the stream.
///
/// [`term_destination`]: JpegDestination::term_destination
pub struct JpegDestination<W> {
    inner: W,
    buffer: Box<[u8; OUTPUT_BUFFER_SIZE]>,
    free_in_buffer: usize,
}

impl<W: Write> JpegDestination<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Box::new([0; OUTPUT_BUFFER_SIZE]),
            free_in_buffer: OUTPUT_BUFFER_SIZE,
        }
    }

    /// Reset the write cursor to an empty buffer.
    pub fn init_destination(&mut self) {
        self.free_in_buffer = OUTPUT_BUFFER_SIZE;
    }

    /// Write the entire buffer to the stream and start over with an empty one.
    pub fn empty_output_buffer(&mut self) -> io::Result<()> {
        self.inner.write_all(&self.buffer[..])?;
        self.free_in_buffer = OUTPUT_BUFFER_SIZE;
        Ok(())
    }

    /// Write the bytes produced since the last drain, then flush the stream.
    pub fn term_destination(&mut self) -> io::Result<()> {
        let used = self.buffered();
        self.inner.write_all(&self.buffer[..used])?;
        self.free_in_buffer = OUTPUT_BUFFER_SIZE;
        self.inner.flush()
    }

    /// Bytes written into the buffer and not yet drained.
    #[inline]
    pub fn buffered(&self) -> usize {
        OUTPUT_BUFFER_SIZE - self.free_in_buffer
    }

    /// Give the stream back to the caller. Undrained bytes are discarded.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for JpegDestination<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Nothing from `buf` is taken until a full buffer has been drained
        if self.free_in_buffer == 0 {
            self.empty_output_buffer()?;
        }
        let start = self.buffered();
        let n = buf.len().min(self.free_in_buffer);
        self.buffer[start..start + n].copy_from_slice(&buf[..n]);
        self.free_in_buffer -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
