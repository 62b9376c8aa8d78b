//! Encoding a pixel surface into a JPEG stream.
//!
//! The surface is normalized to `Rgb24` first. Encoders are then tried in
//! preference order: if one fails, the destination is seeked back to where it
//! started and the next one runs. Bytes a failed attempt already pushed to the
//! stream cannot be taken back; callers that need all-or-nothing output should
//! encode to a temporary file and move it into place.

use std::borrow::Cow;
use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapter::JpegDestination;
use crate::backend::{init_library, BackendError, BackendPreference, CompressBackend, CompressSession};
use crate::session::{trap, SessionError};
use crate::{JpegError, PixelFormat, Surface};

/// Quality used by [`EncodeOptions::default`].
pub const DEFAULT_ENCODE_QUALITY: i32 = 90;

/// Options for an encode call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Nominal 0-100 quality. Out-of-range values are clamped by the backend.
    pub quality: i32,
    /// Which encoders may be used.
    pub backend: BackendPreference,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_ENCODE_QUALITY,
            backend: BackendPreference::Auto,
        }
    }
}

/// Encode `surface` as a JPEG at the current position of `destination`.
///
/// Pass `&mut stream` to keep the stream; pass the stream itself to have it
/// dropped (and so closed) before this returns.
pub fn encode<W: Write + Seek>(surface: &Surface, destination: W, quality: i32) -> Result<(), JpegError> {
    let options = EncodeOptions {
        quality,
        ..Default::default()
    };
    encode_with_options(surface, destination, &options)
}

/// Encode `surface` as a JPEG at the current position of `destination`.
///
/// # Errors
///
/// * `JpegError::InvalidSurface` - the surface breaks its size invariants
/// * `JpegError::BackendUnavailable` - no encoder allowed by `options` was compiled in
/// * `JpegError::EncodeFailed` - every allowed encoder failed; names the last one tried
pub fn encode_with_options<W: Write + Seek>(
    surface: &Surface,
    mut destination: W,
    options: &EncodeOptions,
) -> Result<(), JpegError> {
    surface.validate()?;
    let rgb = to_rgb24(surface)?;

    let backends = init_library().encoders(options.backend);
    if backends.is_empty() {
        return Err(JpegError::BackendUnavailable("encode"));
    }
    encode_with_backends(&backends, &rgb, &mut destination, options.quality)
}

/// Encode into a new in-memory buffer.
pub fn encode_to_vec(surface: &Surface, quality: i32) -> Result<Vec<u8>, JpegError> {
    let mut buffer = Cursor::new(Vec::new());
    encode(surface, &mut buffer, quality)?;
    Ok(buffer.into_inner())
}

/// Encode into the file at `path`, creating or truncating it.
///
/// The file is closed when this returns. A failed encode may leave a
/// partially written file behind.
pub fn encode_to_path<P: AsRef<Path>>(surface: &Surface, path: P, quality: i32) -> Result<(), JpegError> {
    surface.validate()?;
    let file = File::create(path)?;
    encode(surface, file, quality)
}

fn to_rgb24(surface: &Surface) -> Result<Cow<'_, Surface>, JpegError> {
    if surface.format == PixelFormat::Rgb24 {
        Ok(Cow::Borrowed(surface))
    } else {
        surface.convert(PixelFormat::Rgb24).map(Cow::Owned)
    }
}

pub(crate) fn encode_with_backends<W: Write + Seek>(
    backends: &[&dyn CompressBackend],
    surface: &Surface,
    destination: &mut W,
    quality: i32,
) -> Result<(), JpegError> {
    let mut last_err = JpegError::BackendUnavailable("encode");

    for (i, backend) in backends.iter().enumerate() {
        log::debug!("encode: trying {}", backend.name());
        match encode_with_backend(*backend, surface, destination, quality) {
            Ok(()) => return Ok(()),
            Err(e @ JpegError::EncodeFailed { .. }) => {
                if let Some(next) = backends.get(i + 1) {
                    log::warn!("encode: {e}, falling back to {}", next.name());
                }
                last_err = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err)
}

fn encode_with_backend<W: Write + Seek>(
    backend: &dyn CompressBackend,
    surface: &Surface,
    destination: &mut W,
    quality: i32,
) -> Result<(), JpegError> {
    let start = destination.stream_position()?;

    let result = trap(|| {
        let mut dest = JpegDestination::new(&mut *destination);
        dest.init_destination();
        {
            let mut session = backend.create(&mut dest);
            run_compress(session.as_mut(), surface, quality)?;
        }
        dest.term_destination()?;
        Ok(())
    });

    result.map_err(|e| {
        if let Err(seek_err) = destination.seek(SeekFrom::Start(start)) {
            log::warn!("encode: failed to restore stream offset {start}: {seek_err}");
        }
        e.resolve(JpegError::EncodeFailed {
            backend: backend.name(),
        })
    })
}

fn run_compress(
    session: &mut dyn CompressSession,
    surface: &Surface,
    quality: i32,
) -> Result<(), SessionError> {
    session.set_image(surface.width, surface.height);
    session.set_defaults();
    session.set_quality(quality);
    session.start_compress()?;

    while session.next_scanline() < surface.height {
        let y = session.next_scanline();
        session.write_scanline(surface.row(y))?;
        if session.next_scanline() <= y {
            return Err(BackendError::Encoder(format!("scanline {y} was not accepted")).into());
        }
    }
    session.finish_compress()?;

    Ok(())
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::decode::decode_bytes;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: Any valid surface encodes, and the result decodes to the same size.
        #[test]
        fn prop_encode_preserves_dimensions(
            width in 1u32..24,
            height in 1u32..24,
            quality in -50i32..150,
            seed in any::<u8>(),
        ) {
            let mut surface = Surface::new(width, height, PixelFormat::Rgb24).unwrap();
            for y in 0..height {
                for (i, b) in surface.row_mut(y).iter_mut().enumerate() {
                    *b = seed.wrapping_add((i as u8).wrapping_mul(7)).wrapping_add(y as u8);
                }
            }

            let bytes = encode_to_vec(&surface, quality).unwrap();
            let decoded = decode_bytes(&bytes).unwrap();
            prop_assert_eq!((decoded.width, decoded.height), (width, height));
        }
    }
}
