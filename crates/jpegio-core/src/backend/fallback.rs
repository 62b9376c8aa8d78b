//! Fallback encoder backed by the `jpeg-encoder` crate.
//!
//! Exposes only a coarse quality knob: the public 0-100 value is quantized
//! into three tiers, each fixing the quantization tables.

use std::io::Write;

use jpeg_encoder::{ColorType, Encoder};

use crate::backend::{BackendError, CompressBackend, CompressSession, ScanlineBuffer, DEFAULT_QUALITY};
use crate::quality::QualityTier;

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoderBackend;

impl CompressBackend for JpegEncoderBackend {
    fn name(&self) -> &'static str {
        "jpeg-encoder"
    }

    fn create<'a>(&self, destination: &'a mut dyn Write) -> Box<dyn CompressSession + 'a> {
        Box::new(JpegEncoderSession {
            destination,
            width: 0,
            height: 0,
            tier: QualityTier::from_quality(DEFAULT_QUALITY),
            rows: None,
        })
    }
}

struct JpegEncoderSession<'a> {
    destination: &'a mut dyn Write,
    width: u16,
    height: u16,
    tier: QualityTier,
    rows: Option<ScanlineBuffer>,
}

impl CompressSession for JpegEncoderSession<'_> {
    fn set_image(&mut self, width: u32, height: u32) {
        // Oversized dimensions become zero and are rejected in start_compress
        self.width = u16::try_from(width).unwrap_or(0);
        self.height = u16::try_from(height).unwrap_or(0);
    }

    fn set_defaults(&mut self) {
        self.tier = QualityTier::from_quality(DEFAULT_QUALITY);
    }

    fn set_quality(&mut self, quality: i32) {
        self.tier = QualityTier::from_quality(quality);
        log::trace!("jpeg-encoder: quality {quality} -> tier {}", self.tier.level());
    }

    fn start_compress(&mut self) -> Result<(), BackendError> {
        if self.width == 0 || self.height == 0 {
            return Err(BackendError::Unsupported(
                "dimensions must be between 1 and 65535",
            ));
        }
        self.rows = Some(ScanlineBuffer::with_capacity(
            usize::from(self.width) * 3,
            u32::from(self.height),
        )?);
        Ok(())
    }

    fn next_scanline(&self) -> u32 {
        self.rows.as_ref().map_or(0, ScanlineBuffer::next_row)
    }

    fn write_scanline(&mut self, row: &[u8]) -> Result<(), BackendError> {
        self.rows
            .as_mut()
            .ok_or(BackendError::Encoder("compression not started".to_string()))?
            .push_row(row)
    }

    fn finish_compress(&mut self) -> Result<(), BackendError> {
        let rows = self
            .rows
            .take()
            .ok_or(BackendError::Encoder("compression not started".to_string()))?;
        if !rows.is_complete() {
            return Err(BackendError::Encoder("missing scanlines".to_string()));
        }

        Encoder::new(&mut *self.destination, self.tier.table_quality())
            .encode(rows.as_bytes(), self.width, self.height, ColorType::Rgb)
            .map_err(|e| BackendError::Encoder(e.to_string()))
    }
}
