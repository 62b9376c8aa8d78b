//! Pixel surfaces consumed by the encoder and produced by the decoder.

use serde::{Deserialize, Serialize};

use crate::JpegError;

/// Row alignment used for surfaces allocated by this crate.
const PITCH_ALIGN: usize = 4;

/// Packed pixel layouts a surface can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 24-bit packed, bytes in R, G, B order.
    Rgb24,
    /// 32-bit packed, bytes in B, G, R, A order.
    ///
    /// Four-component (CMYK) JPEGs decode into this layout with the raw
    /// C, M, Y, K bytes in place of B, G, R, A.
    Bgra32,
}

impl PixelFormat {
    /// Number of bytes one pixel occupies.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Bgra32 => 4,
        }
    }
}

/// A row-major pixel buffer with an explicit row stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout of each row.
    pub format: PixelFormat,
    /// Distance in bytes between the starts of two consecutive rows.
    pub pitch: usize,
    /// Pixel bytes, at least `pitch * height` long.
    pub pixels: Vec<u8>,
}

impl Surface {
    /// Allocate a zeroed surface of the given size and format.
    ///
    /// Rows are padded to a 4-byte boundary. Allocation is fallible: sizes
    /// taken from an untrusted header that cannot be satisfied come back as
    /// `JpegError::OutOfMemory` instead of aborting the process.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, JpegError> {
        if width == 0 || height == 0 {
            return Err(JpegError::InvalidSurface(format!(
                "dimensions {width}x{height} must be non-zero"
            )));
        }

        let oom = || JpegError::OutOfMemory { width, height };
        let pitch = (width as usize)
            .checked_mul(format.bytes_per_pixel())
            .and_then(|row| row.checked_next_multiple_of(PITCH_ALIGN))
            .ok_or_else(oom)?;
        let len = pitch.checked_mul(height as usize).ok_or_else(oom)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| oom())?;
        pixels.resize(len, 0);

        Ok(Self {
            width,
            height,
            format,
            pitch,
            pixels,
        })
    }

    /// Wrap an existing pixel buffer, checking that it is large enough.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        pitch: usize,
        pixels: Vec<u8>,
    ) -> Result<Self, JpegError> {
        let surface = Self {
            width,
            height,
            format,
            pitch,
            pixels,
        };
        surface.validate()?;
        Ok(surface)
    }

    /// Create a tightly packed RGB24 surface from an `image::RgbImage`.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgb24,
            pitch: width as usize * 3,
            pixels: img.into_raw(),
        }
    }

    /// Copy an RGB24 surface into an `image::RgbImage`, dropping row padding.
    ///
    /// Returns `None` for any other pixel format.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.format != PixelFormat::Rgb24 {
            return None;
        }
        let mut packed = Vec::with_capacity(self.row_bytes() * self.height as usize);
        for y in 0..self.height {
            packed.extend_from_slice(self.row(y));
        }
        image::RgbImage::from_raw(self.width, self.height, packed)
    }

    /// Check the surface invariants the encoder relies on.
    pub fn validate(&self) -> Result<(), JpegError> {
        if self.width == 0 || self.height == 0 {
            return Err(JpegError::InvalidSurface(format!(
                "dimensions {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if self.pitch < self.row_bytes() {
            return Err(JpegError::InvalidSurface(format!(
                "pitch {} is shorter than a {}-byte row",
                self.pitch,
                self.row_bytes()
            )));
        }
        let required = self
            .pitch
            .checked_mul(self.height as usize - 1)
            .and_then(|n| n.checked_add(self.row_bytes()))
            .ok_or_else(|| JpegError::InvalidSurface("pitch * height overflows".to_string()))?;
        if self.pixels.len() < required {
            return Err(JpegError::InvalidSurface(format!(
                "expected at least {required} pixel bytes, got {}",
                self.pixels.len()
            )));
        }
        Ok(())
    }

    /// Number of meaningful bytes in one row (excluding padding).
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Pixel bytes of row `y`, without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.pixels[start..start + self.row_bytes()]
    }

    /// Mutable pixel bytes of row `y`, without padding.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let len = self.row_bytes();
        &mut self.pixels[start..start + len]
    }

    /// Bytes of the pixel at (`x`, `y`).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = x as usize * bpp;
        &self.row(y)[start..start + bpp]
    }

    /// Convert to another pixel format, returning a newly allocated surface.
    pub fn convert(&self, format: PixelFormat) -> Result<Surface, JpegError> {
        self.validate()?;
        let mut out = Surface::new(self.width, self.height, format)?;

        for y in 0..self.height {
            let src = self.row(y);
            let dst = out.row_mut(y);
            match (self.format, format) {
                (a, b) if a == b => dst.copy_from_slice(src),
                (PixelFormat::Bgra32, PixelFormat::Rgb24) => {
                    for (d, s) in dst.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
                        d.copy_from_slice(&[s[2], s[1], s[0]]);
                    }
                }
                (PixelFormat::Rgb24, PixelFormat::Bgra32) => {
                    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
                        d.copy_from_slice(&[s[2], s[1], s[0], 0xFF]);
                    }
                }
                _ => unreachable!("all format pairs are covered"),
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pads_rows_to_four_bytes() {
        let surface = Surface::new(5, 2, PixelFormat::Rgb24).unwrap();
        assert_eq!(surface.row_bytes(), 15);
        assert_eq!(surface.pitch, 16);
        assert_eq!(surface.pixels.len(), 32);
    }

    #[test]
    fn test_new_bgra_needs_no_padding() {
        let surface = Surface::new(3, 3, PixelFormat::Bgra32).unwrap();
        assert_eq!(surface.pitch, 12);
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        let result = Surface::new(0, 10, PixelFormat::Rgb24);
        assert!(matches!(result, Err(JpegError::InvalidSurface(_))));
    }

    #[test]
    fn test_new_huge_dimensions_is_out_of_memory() {
        let result = Surface::new(u32::MAX, u32::MAX, PixelFormat::Bgra32);
        assert!(matches!(result, Err(JpegError::OutOfMemory { .. })));
    }

    #[test]
    fn test_from_raw_validates_length() {
        let result = Surface::from_raw(4, 4, PixelFormat::Rgb24, 12, vec![0; 40]);
        assert!(matches!(result, Err(JpegError::InvalidSurface(_))));

        // Last row needs no trailing padding
        let result = Surface::from_raw(4, 4, PixelFormat::Rgb24, 16, vec![0; 16 * 3 + 12]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_from_raw_rejects_short_pitch() {
        let result = Surface::from_raw(4, 1, PixelFormat::Bgra32, 12, vec![0; 16]);
        assert!(matches!(result, Err(JpegError::InvalidSurface(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_pitch() {
        let surface = Surface {
            width: 1,
            height: 3,
            format: PixelFormat::Rgb24,
            pitch: usize::MAX / 2 + 1,
            pixels: vec![0; 16],
        };
        assert!(matches!(surface.validate(), Err(JpegError::InvalidSurface(_))));
        assert!(matches!(surface.convert(PixelFormat::Bgra32), Err(JpegError::InvalidSurface(_))));
    }

    #[test]
    fn test_rows_honor_pitch() {
        let mut surface = Surface::new(1, 2, PixelFormat::Rgb24).unwrap();
        surface.row_mut(1).copy_from_slice(&[1, 2, 3]);
        assert_eq!(&surface.pixels[4..7], &[1, 2, 3]);
        assert_eq!(surface.pixel(0, 1), &[1, 2, 3]);
        assert_eq!(surface.row(0), &[0, 0, 0]);
    }

    #[test]
    fn test_convert_bgra_to_rgb() {
        let pixels = vec![10, 20, 30, 255, 40, 50, 60, 0];
        let bgra = Surface::from_raw(2, 1, PixelFormat::Bgra32, 8, pixels).unwrap();
        let rgb = bgra.convert(PixelFormat::Rgb24).unwrap();

        assert_eq!(rgb.format, PixelFormat::Rgb24);
        assert_eq!(rgb.pixel(0, 0), &[30, 20, 10]);
        assert_eq!(rgb.pixel(1, 0), &[60, 50, 40]);
    }

    #[test]
    fn test_convert_rgb_to_bgra_is_opaque() {
        let rgb = Surface::from_raw(1, 1, PixelFormat::Rgb24, 3, vec![1, 2, 3]).unwrap();
        let bgra = rgb.convert(PixelFormat::Bgra32).unwrap();
        assert_eq!(bgra.pixel(0, 0), &[3, 2, 1, 255]);
    }

    #[test]
    fn test_rgb_image_round_trip_drops_padding() {
        let mut surface = Surface::new(3, 2, PixelFormat::Rgb24).unwrap();
        surface.row_mut(0).copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let img = surface.to_rgb_image().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0).0, [7, 8, 9]);

        let back = Surface::from_rgb_image(img);
        assert_eq!(back.pitch, 9);
        assert_eq!(back.row(0), surface.row(0));
    }

    #[test]
    fn test_to_rgb_image_rejects_bgra() {
        let surface = Surface::new(1, 1, PixelFormat::Bgra32).unwrap();
        assert!(surface.to_rgb_image().is_none());
    }
}
