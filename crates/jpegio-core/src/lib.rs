//! JPEG detection and streaming transcoding over seekable byte streams.
//!
//! This crate identifies JPEG data without decoding it, decodes JPEG streams
//! into pixel surfaces, and encodes surfaces back into JPEG streams. Streams
//! are anything implementing `std::io::Read`/`Write` plus `Seek`; codec work
//! is delegated to pluggable backends selected at build time.
//!
//! ```ignore
//! use std::io::Cursor;
//!
//! let mut stream = Cursor::new(bytes);
//! if jpegio_core::probe(&mut stream) {
//!     let surface = jpegio_core::decode(&mut stream)?;
//!     jpegio_core::encode_to_path(&surface, "out.jpg", 90)?;
//! }
//! ```

use std::io::{Read, Seek};

pub mod adapter;
pub mod backend;
mod decode;
mod encode;
mod error;
pub mod marker;
mod probe;
pub mod quality;
mod session;
mod surface;

#[cfg(test)]
mod test_fixtures;

pub use backend::BackendPreference;
pub use decode::{decode, decode_bytes, decode_with_options, DecodeOptions};
pub use encode::{
    encode, encode_to_path, encode_to_vec, encode_with_options, EncodeOptions,
    DEFAULT_ENCODE_QUALITY,
};
pub use error::JpegError;
pub use probe::{is_jpeg, is_jpeg_with, ScanStrategy};
pub use surface::{PixelFormat, Surface};

/// Check whether `stream` holds a JPEG image at its current position.
///
/// The stream position is the same before and after the call.
pub fn probe<S: Read + Seek>(stream: &mut S) -> bool {
    is_jpeg(stream)
}

/// Like [`probe`], with an explicit scan strategy.
pub fn probe_with<S: Read + Seek>(stream: &mut S, strategy: ScanStrategy) -> bool {
    is_jpeg_with(stream, strategy)
}
