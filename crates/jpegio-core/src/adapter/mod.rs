//! Fixed-buffer adapters between streams and codec backends.
//!
//! - [`JpegSource`] - pull-side buffer for decoding, synthesizes EOI at end of stream
//! - [`JpegDestination`] - push-side buffer for encoding, drains when full and on finish
//!
//! Both own a 4096-byte buffer for the lifetime of one codec session and
//! reuse it for every refill or drain within that session.

mod destination;
mod source;

pub use destination::{JpegDestination, OUTPUT_BUFFER_SIZE};
pub use source::{JpegSource, INPUT_BUFFER_SIZE};
