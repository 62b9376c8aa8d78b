//! Codec backends and the process-wide backend library handle.
//!
//! The driver talks to codecs through a narrow, libjpeg-shaped session
//! interface: one session per decode or encode call, rows moved one at a
//! time from top to bottom.
//!
//! # Backends
//!
//! | Backend | Direction | Feature |
//! |---|---|---|
//! | `jpeg-decoder` | decode | `primary-decode` |
//! | `image` JPEG encoder | encode, native 1-100 quality | `primary-encode` |
//! | `jpeg-encoder` | encode, three quality tiers | `fallback-encode` |
//!
//! # Library handle
//!
//! [`init_library`] loads the backend table on first use and counts every
//! call. There is no matching teardown.

#[cfg(feature = "fallback-encode")]
mod fallback;
#[cfg(any(feature = "primary-decode", feature = "primary-encode"))]
mod primary;

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "fallback-encode")]
pub use fallback::JpegEncoderBackend;
#[cfg(feature = "primary-decode")]
pub use primary::JpegDecoderBackend;
#[cfg(feature = "primary-encode")]
pub use primary::ImageJpegBackend;

/// Quality a compress session uses until `set_quality` is called.
pub const DEFAULT_QUALITY: i32 = 75;

/// Errors reported by a codec backend.
///
/// These stay inside the crate's error boundary: the driver logs them and
/// reports its own message instead.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The decoder rejected the input.
    #[error("decoder error: {0}")]
    Decoder(String),

    /// The encoder could not produce output.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// Reading or writing the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backend panicked.
    #[error("backend panicked: {0}")]
    Panicked(String),

    /// The backend cannot do what was asked.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

/// Frame parameters read from a JPEG header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    /// Number of color components declared by the frame (1, 3 or 4).
    pub components: u8,
}

/// Layout of the rows a decompress session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputColorSpace {
    /// Three bytes per pixel, R, G, B.
    Rgb,
    /// Four bytes per pixel, raw C, M, Y, K.
    Cmyk,
}

impl OutputColorSpace {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            OutputColorSpace::Rgb => 3,
            OutputColorSpace::Cmyk => 4,
        }
    }
}

/// One decode pass over a source.
pub trait DecompressSession {
    /// Parse markers up to the frame header.
    fn read_header(&mut self) -> Result<FrameHeader, BackendError>;

    /// Select the layout of the output rows.
    fn set_out_color_space(&mut self, space: OutputColorSpace);

    /// Request approximate decoding (fast IDCT, nearest-neighbor chroma upsampling).
    fn set_fast(&mut self, fast: bool);

    /// Output dimensions for the current settings.
    fn calc_output_dimensions(&mut self) -> (u32, u32);

    /// Decode the image data.
    fn start_decompress(&mut self) -> Result<(), BackendError>;

    /// Index of the next row `read_scanline` will produce.
    fn output_scanline(&self) -> u32;

    /// Copy the next row into `row`, which holds exactly one output row.
    fn read_scanline(&mut self, row: &mut [u8]) -> Result<(), BackendError>;

    /// Verify the whole image was consumed and release decoder state.
    fn finish_decompress(&mut self) -> Result<(), BackendError>;
}

/// One encode pass into a destination. Input rows are always packed RGB.
pub trait CompressSession {
    fn set_image(&mut self, width: u32, height: u32);

    /// Reset every tunable, including quality, to the backend's defaults.
    fn set_defaults(&mut self);

    /// Apply a 0-100 quality value using the backend's own mapping.
    fn set_quality(&mut self, quality: i32);

    fn start_compress(&mut self) -> Result<(), BackendError>;

    /// Index of the next row `write_scanline` expects.
    fn next_scanline(&self) -> u32;

    fn write_scanline(&mut self, row: &[u8]) -> Result<(), BackendError>;

    /// Emit the remaining compressed data into the destination.
    fn finish_compress(&mut self) -> Result<(), BackendError>;
}

/// A decoder that can open sessions over a buffered source.
pub trait DecompressBackend: Sync {
    fn name(&self) -> &'static str;

    fn create<'a>(&self, source: &'a mut dyn BufRead) -> Box<dyn DecompressSession + 'a>;
}

/// An encoder that can open sessions over a destination.
pub trait CompressBackend: Sync {
    fn name(&self) -> &'static str;

    fn create<'a>(&self, destination: &'a mut dyn Write) -> Box<dyn CompressSession + 'a>;
}

/// Which encoders an encode call may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendPreference {
    /// Primary first, falling through to the fallback.
    #[default]
    Auto,
    /// Only the primary encoder.
    PrimaryOnly,
    /// Only the fallback encoder.
    FallbackOnly,
}

/// The set of backends compiled into this build.
pub struct BackendLibrary {
    decoder: Option<&'static dyn DecompressBackend>,
    encoder: Option<&'static dyn CompressBackend>,
    fallback_encoder: Option<&'static dyn CompressBackend>,
}

static LIBRARY: OnceLock<BackendLibrary> = OnceLock::new();
static LOAD_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Get the backend library, loading it on first use.
///
/// Safe to call from any thread, any number of times. The library is never
/// unloaded.
pub fn init_library() -> &'static BackendLibrary {
    let library = LIBRARY.get_or_init(BackendLibrary::load);
    LOAD_COUNT.fetch_add(1, Ordering::Relaxed);
    library
}

/// How many times [`init_library`] has been called in this process.
pub fn load_count() -> usize {
    LOAD_COUNT.load(Ordering::Relaxed)
}

impl BackendLibrary {
    fn load() -> Self {
        let library = Self {
            decoder: primary_decoder(),
            encoder: primary_encoder(),
            fallback_encoder: fallback_encoder(),
        };
        log::debug!(
            "backend library loaded: decoder={:?} encoder={:?} fallback={:?}",
            library.decoder.map(|b| b.name()),
            library.encoder.map(|b| b.name()),
            library.fallback_encoder.map(|b| b.name()),
        );
        library
    }

    pub fn decoder(&self) -> Option<&'static dyn DecompressBackend> {
        self.decoder
    }

    pub fn encoder(&self) -> Option<&'static dyn CompressBackend> {
        self.encoder
    }

    pub fn fallback_encoder(&self) -> Option<&'static dyn CompressBackend> {
        self.fallback_encoder
    }

    pub fn can_decode(&self) -> bool {
        self.decoder.is_some()
    }

    pub fn can_encode(&self) -> bool {
        self.encoder.is_some() || self.fallback_encoder.is_some()
    }

    pub fn has_fallback_encoder(&self) -> bool {
        self.fallback_encoder.is_some()
    }

    /// Encoders to try, in order, for the given preference.
    pub fn encoders(&self, preference: BackendPreference) -> Vec<&'static dyn CompressBackend> {
        let (primary, fallback) = match preference {
            BackendPreference::Auto => (self.encoder, self.fallback_encoder),
            BackendPreference::PrimaryOnly => (self.encoder, None),
            BackendPreference::FallbackOnly => (None, self.fallback_encoder),
        };
        primary.into_iter().chain(fallback).collect()
    }
}

fn primary_decoder() -> Option<&'static dyn DecompressBackend> {
    #[cfg(feature = "primary-decode")]
    {
        Some(&JpegDecoderBackend)
    }
    #[cfg(not(feature = "primary-decode"))]
    {
        None
    }
}

fn primary_encoder() -> Option<&'static dyn CompressBackend> {
    #[cfg(feature = "primary-encode")]
    {
        Some(&ImageJpegBackend)
    }
    #[cfg(not(feature = "primary-encode"))]
    {
        None
    }
}

fn fallback_encoder() -> Option<&'static dyn CompressBackend> {
    #[cfg(feature = "fallback-encode")]
    {
        Some(&JpegEncoderBackend)
    }
    #[cfg(not(feature = "fallback-encode"))]
    {
        None
    }
}

/// Packed rows of one image, filled or drained one scanline at a time.
pub(crate) struct ScanlineBuffer {
    data: Vec<u8>,
    row_bytes: usize,
    height: u32,
    next: u32,
}

impl ScanlineBuffer {
    /// Reserve room for `height` rows of `row_bytes` each.
    pub(crate) fn with_capacity(row_bytes: usize, height: u32) -> Result<Self, BackendError> {
        let len = row_bytes
            .checked_mul(height as usize)
            .ok_or(BackendError::Unsupported("image too large"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| BackendError::Unsupported("image too large"))?;
        Ok(Self {
            data,
            row_bytes,
            height,
            next: 0,
        })
    }

    /// Wrap rows that are already fully decoded.
    pub(crate) fn from_rows(data: Vec<u8>, row_bytes: usize, height: u32) -> Result<Self, BackendError> {
        if data.len() != row_bytes * height as usize {
            return Err(BackendError::Decoder(format!(
                "decoded {} bytes, expected {}",
                data.len(),
                row_bytes * height as usize
            )));
        }
        Ok(Self {
            data,
            row_bytes,
            height,
            next: 0,
        })
    }

    #[inline]
    pub(crate) fn next_row(&self) -> u32 {
        self.next
    }

    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.next >= self.height
    }

    pub(crate) fn push_row(&mut self, row: &[u8]) -> Result<(), BackendError> {
        if self.is_complete() {
            return Err(BackendError::Encoder("too many scanlines".to_string()));
        }
        if row.len() != self.row_bytes {
            return Err(BackendError::Encoder(format!(
                "scanline is {} bytes, expected {}",
                row.len(),
                self.row_bytes
            )));
        }
        self.data.extend_from_slice(row);
        self.next += 1;
        Ok(())
    }

    pub(crate) fn pop_row(&mut self, row: &mut [u8]) -> Result<(), BackendError> {
        if self.is_complete() {
            return Err(BackendError::Decoder("read past last scanline".to_string()));
        }
        if row.len() != self.row_bytes {
            return Err(BackendError::Decoder(format!(
                "output row is {} bytes, expected {}",
                row.len(),
                self.row_bytes
            )));
        }
        let start = self.next as usize * self.row_bytes;
        row.copy_from_slice(&self.data[start..start + self.row_bytes]);
        self.next += 1;
        Ok(())
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
