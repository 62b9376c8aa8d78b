//! Decoding a JPEG stream into a pixel surface.
//!
//! The decoder backend is fed through a [`JpegSource`], so it only ever sees a
//! buffered byte feed that ends in an end-of-image marker. Four-component
//! (CMYK) images come out as raw CMYK bytes in a `Bgra32` surface; everything
//! else comes out as `Rgb24`.
//!
//! On failure the stream is put back at the offset it had on entry and no
//! surface is returned.

use std::io::{Cursor, Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};

use crate::adapter::JpegSource;
use crate::backend::{init_library, BackendError, DecompressBackend, DecompressSession, OutputColorSpace};
use crate::session::{trap, SessionError};
use crate::{JpegError, PixelFormat, Surface};

/// Options for a decode call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Trade fidelity for speed on three-component images, if the backend
    /// supports it.
    pub fast: bool,
    /// Refuse images with more pixels than this, before allocating.
    pub max_pixels: Option<u64>,
}

impl DecodeOptions {
    /// Check output dimensions against the configured limit.
    pub fn check_limits(&self, width: u32, height: u32) -> Result<(), JpegError> {
        match self.max_pixels {
            Some(max) if u64::from(width) * u64::from(height) > max => {
                Err(JpegError::LimitExceeded { width, height })
            }
            _ => Ok(()),
        }
    }
}

/// Decode the JPEG image at the current position of `stream`.
///
/// On success the stream has advanced past the data the decoder consumed.
/// On failure it is back where it started.
pub fn decode<S: Read + Seek>(stream: &mut S) -> Result<Surface, JpegError> {
    decode_with_options(stream, &DecodeOptions::default())
}

/// Decode a complete JPEG file held in memory.
pub fn decode_bytes(bytes: &[u8]) -> Result<Surface, JpegError> {
    decode(&mut Cursor::new(bytes))
}

/// Decode the JPEG image at the current position of `stream`.
///
/// # Errors
///
/// * `JpegError::BackendUnavailable` - no decoder was compiled in
/// * `JpegError::LimitExceeded` - the image is larger than `options.max_pixels`
/// * `JpegError::OutOfMemory` - the output surface could not be allocated
/// * `JpegError::DecodeFailed` - the data is not a decodable JPEG
pub fn decode_with_options<S: Read + Seek>(
    stream: &mut S,
    options: &DecodeOptions,
) -> Result<Surface, JpegError> {
    let backend = init_library()
        .decoder()
        .ok_or(JpegError::BackendUnavailable("decode"))?;
    decode_with_backend(backend, stream, options)
}

pub(crate) fn decode_with_backend<S: Read + Seek>(
    backend: &dyn DecompressBackend,
    stream: &mut S,
    options: &DecodeOptions,
) -> Result<Surface, JpegError> {
    let start = stream.stream_position()?;

    let result = trap(|| {
        let mut source = JpegSource::new(&mut *stream);
        let mut session = backend.create(&mut source);
        let surface = run_decompress(session.as_mut(), options)?;
        Ok(surface)
    });

    result.map_err(|e| {
        if let Err(seek_err) = stream.seek(SeekFrom::Start(start)) {
            log::warn!("decode: failed to restore stream offset {start}: {seek_err}");
        }
        e.resolve(JpegError::DecodeFailed)
    })
}

fn run_decompress(
    session: &mut dyn DecompressSession,
    options: &DecodeOptions,
) -> Result<Surface, SessionError> {
    let header = session.read_header()?;
    log::trace!(
        "decode: {}x{} frame with {} components",
        header.width,
        header.height,
        header.components
    );

    let format = if header.components == 4 {
        session.set_out_color_space(OutputColorSpace::Cmyk);
        PixelFormat::Bgra32
    } else {
        session.set_out_color_space(OutputColorSpace::Rgb);
        session.set_fast(options.fast);
        PixelFormat::Rgb24
    };

    let (width, height) = session.calc_output_dimensions();
    if width == 0 || height == 0 {
        return Err(BackendError::Decoder(format!("empty output size {width}x{height}")).into());
    }
    options.check_limits(width, height)?;
    let mut surface = Surface::new(width, height, format)?;

    session.start_decompress()?;
    while session.output_scanline() < height {
        let y = session.output_scanline();
        session.read_scanline(surface.row_mut(y))?;
        if session.output_scanline() <= y {
            return Err(BackendError::Decoder(format!("scanline {y} was not consumed")).into());
        }
    }
    session.finish_decompress()?;

    Ok(surface)
}
