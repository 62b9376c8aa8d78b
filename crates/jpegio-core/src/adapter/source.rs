//! Pull-side adapter: feeds a decoder from a stream through a fixed buffer.

use std::io::{self, BufRead, ErrorKind, Read};

use crate::marker;

/// Capacity of the decode-side input buffer.
pub const INPUT_BUFFER_SIZE: usize = 4096;

/// A fixed-capacity read buffer in front of a stream.
///
/// The decoder pulls bytes out of the buffer; whenever it runs dry the buffer
/// is refilled with one read from the stream. When the stream is exhausted,
/// the buffer is filled with a synthesized `FF D9` (end-of-image) marker so a
/// decoder waiting for more data sees a clean end of image instead.
///
/// The source never closes the stream; it only borrows or wraps it for the
/// lifetime of one decode session.
pub struct JpegSource<R> {
    inner: R,
    buffer: Box<[u8; INPUT_BUFFER_SIZE]>,
    next_input_byte: usize,
    bytes_in_buffer: usize,
    synthesized_eoi: u64,
}

impl<R: Read> JpegSource<R> {
    /// Create a source over `inner`. The buffer starts empty, so the first
    /// pull triggers a fill.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Box::new([0; INPUT_BUFFER_SIZE]),
            next_input_byte: 0,
            bytes_in_buffer: 0,
            synthesized_eoi: 0,
        }
    }

    /// Refill the buffer from the stream.
    ///
    /// Always succeeds: an exhausted or failing stream yields a fake EOI
    /// marker instead of an error.
    pub fn fill_input_buffer(&mut self) {
        let nbytes = loop {
            match self.inner.read(&mut self.buffer[..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("source: read failed, treating as end of stream: {e}");
                    break 0;
                }
            }
        };

        if nbytes == 0 {
            if self.synthesized_eoi == 0 {
                log::debug!("source: stream exhausted, inserting EOI marker");
            }
            self.synthesized_eoi += 1;
            self.buffer[..2].copy_from_slice(&marker::EOI_BYTES);
            self.next_input_byte = 0;
            self.bytes_in_buffer = 2;
        } else {
            self.next_input_byte = 0;
            self.bytes_in_buffer = nbytes;
        }
    }

    /// Discard `num_bytes` of input without handing them to the decoder.
    ///
    /// Whole buffers are refilled and dropped rather than seeking, so this
    /// works on streams that only read forward.
    pub fn skip_input_data(&mut self, mut num_bytes: usize) {
        if num_bytes == 0 {
            return;
        }
        while num_bytes > self.bytes_in_buffer {
            num_bytes -= self.bytes_in_buffer;
            self.fill_input_buffer();
        }
        self.next_input_byte += num_bytes;
        self.bytes_in_buffer -= num_bytes;
    }

    /// Number of bytes currently buffered and not yet consumed.
    #[inline]
    pub fn bytes_in_buffer(&self) -> usize {
        self.bytes_in_buffer
    }

    /// How many times an EOI marker had to be synthesized.
    #[inline]
    pub fn synthesized_eoi_count(&self) -> u64 {
        self.synthesized_eoi
    }

    /// Give the stream back to the caller.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for JpegSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for JpegSource<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.bytes_in_buffer == 0 {
            self.fill_input_buffer();
        }
        let start = self.next_input_byte;
        Ok(&self.buffer[start..start + self.bytes_in_buffer])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.bytes_in_buffer);
        self.next_input_byte += amt;
        self.bytes_in_buffer -= amt;
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        /// Property: The source yields the stream bytes, then EOI.
        #[test]
        fn prop_stream_then_eoi(
            data in prop::collection::vec(any::<u8>(), 0..3 * INPUT_BUFFER_SIZE),
            chunk in 1usize..700,
        ) {
            let mut source = JpegSource::new(Cursor::new(data.clone()));
            let mut out = Vec::new();
            let mut buf = vec![0u8; chunk];

            while out.len() < data.len() + 2 {
                let n = source.read(&mut buf).unwrap();
                prop_assert!(n > 0);
                out.extend_from_slice(&buf[..n]);
            }

            prop_assert_eq!(&out[..data.len()], &data[..]);
            prop_assert_eq!(&out[data.len()..data.len() + 2], &[0xFF, 0xD9]);
        }
    }
}
