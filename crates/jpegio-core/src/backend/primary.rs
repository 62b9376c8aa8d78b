//! Primary backends: `jpeg-decoder` for decoding, `image`'s JPEG encoder for encoding.

#[cfg(feature = "primary-decode")]
pub use self::decode::JpegDecoderBackend;
#[cfg(feature = "primary-encode")]
pub use self::encode::ImageJpegBackend;

#[cfg(feature = "primary-decode")]
mod decode {
    use std::io::BufRead;

    use jpeg_decoder::{Decoder, ImageInfo, PixelFormat};

    use crate::backend::{
        BackendError, DecompressBackend, DecompressSession, FrameHeader, OutputColorSpace,
        ScanlineBuffer,
    };

    /// Decoder backed by the `jpeg-decoder` crate.
    ///
    /// `jpeg-decoder` pulls bytes with `Read` and stops at the EOI marker, so
    /// it never runs past the synthesized end-of-image of a `JpegSource`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct JpegDecoderBackend;

    impl DecompressBackend for JpegDecoderBackend {
        fn name(&self) -> &'static str {
            "jpeg-decoder"
        }

        fn create<'a>(&self, source: &'a mut dyn BufRead) -> Box<dyn DecompressSession + 'a> {
            Box::new(JpegDecoderSession {
                decoder: Decoder::new(source),
                info: None,
                out_space: OutputColorSpace::Rgb,
                rows: None,
            })
        }
    }

    struct JpegDecoderSession<'a> {
        decoder: Decoder<&'a mut dyn BufRead>,
        info: Option<ImageInfo>,
        out_space: OutputColorSpace,
        rows: Option<ScanlineBuffer>,
    }

    impl JpegDecoderSession<'_> {
        fn info(&self) -> Result<ImageInfo, BackendError> {
            self.info
                .ok_or(BackendError::Decoder("header has not been read".to_string()))
        }
    }

    impl DecompressSession for JpegDecoderSession<'_> {
        fn read_header(&mut self) -> Result<FrameHeader, BackendError> {
            self.decoder
                .read_info()
                .map_err(|e| BackendError::Decoder(e.to_string()))?;
            let info = self
                .decoder
                .info()
                .ok_or(BackendError::Decoder("no frame header".to_string()))?;
            self.info = Some(info);

            let components = match info.pixel_format {
                PixelFormat::L8 | PixelFormat::L16 => 1,
                PixelFormat::RGB24 => 3,
                PixelFormat::CMYK32 => 4,
            };
            Ok(FrameHeader {
                width: u32::from(info.width),
                height: u32::from(info.height),
                components,
            })
        }

        fn set_out_color_space(&mut self, space: OutputColorSpace) {
            self.out_space = space;
        }

        fn set_fast(&mut self, fast: bool) {
            if fast {
                log::debug!("jpeg-decoder has a single IDCT and upsampling path, fast mode ignored");
            }
        }

        fn calc_output_dimensions(&mut self) -> (u32, u32) {
            self.info
                .map(|info| (u32::from(info.width), u32::from(info.height)))
                .unwrap_or((0, 0))
        }

        fn start_decompress(&mut self) -> Result<(), BackendError> {
            let info = self.info()?;
            let decoded = self
                .decoder
                .decode()
                .map_err(|e| BackendError::Decoder(e.to_string()))?;

            let data = match (self.out_space, info.pixel_format) {
                (OutputColorSpace::Rgb, PixelFormat::RGB24)
                | (OutputColorSpace::Cmyk, PixelFormat::CMYK32) => decoded,
                (OutputColorSpace::Rgb, PixelFormat::L8) => {
                    decoded.iter().flat_map(|&l| [l, l, l]).collect()
                }
                // 16-bit samples are big-endian; keep the high byte
                (OutputColorSpace::Rgb, PixelFormat::L16) => decoded
                    .chunks_exact(2)
                    .flat_map(|l| [l[0], l[0], l[0]])
                    .collect(),
                (OutputColorSpace::Rgb, PixelFormat::CMYK32) => {
                    return Err(BackendError::Unsupported("CMYK to RGB conversion"));
                }
                (OutputColorSpace::Cmyk, _) => {
                    return Err(BackendError::Unsupported("CMYK output from a non-CMYK image"));
                }
            };

            let row_bytes = usize::from(info.width) * self.out_space.bytes_per_pixel();
            self.rows = Some(ScanlineBuffer::from_rows(
                data,
                row_bytes,
                u32::from(info.height),
            )?);
            Ok(())
        }

        fn output_scanline(&self) -> u32 {
            self.rows.as_ref().map_or(0, ScanlineBuffer::next_row)
        }

        fn read_scanline(&mut self, row: &mut [u8]) -> Result<(), BackendError> {
            self.rows
                .as_mut()
                .ok_or(BackendError::Decoder("decompression not started".to_string()))?
                .pop_row(row)
        }

        fn finish_decompress(&mut self) -> Result<(), BackendError> {
            match self.rows.take() {
                Some(rows) if rows.is_complete() => Ok(()),
                Some(_) => Err(BackendError::Decoder(
                    "finished before all scanlines were read".to_string(),
                )),
                None => Err(BackendError::Decoder("decompression not started".to_string())),
            }
        }
    }
}

#[cfg(feature = "primary-encode")]
mod encode {
    use std::io::Write;

    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    use crate::backend::{BackendError, CompressBackend, CompressSession, ScanlineBuffer, DEFAULT_QUALITY};
    use crate::quality::primary_quality;

    /// Encoder backed by the `image` crate's baseline JPEG encoder.
    ///
    /// Quality uses the encoder's native 1-100 scale. The encoder only
    /// writes 8-bit quantization tables, so output is always baseline.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImageJpegBackend;

    impl CompressBackend for ImageJpegBackend {
        fn name(&self) -> &'static str {
            "image"
        }

        fn create<'a>(&self, destination: &'a mut dyn Write) -> Box<dyn CompressSession + 'a> {
            Box::new(ImageJpegSession {
                destination,
                width: 0,
                height: 0,
                quality: primary_quality(DEFAULT_QUALITY),
                rows: None,
            })
        }
    }

    struct ImageJpegSession<'a> {
        destination: &'a mut dyn Write,
        width: u32,
        height: u32,
        quality: u8,
        rows: Option<ScanlineBuffer>,
    }

    impl CompressSession for ImageJpegSession<'_> {
        fn set_image(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        fn set_defaults(&mut self) {
            self.quality = primary_quality(DEFAULT_QUALITY);
        }

        fn set_quality(&mut self, quality: i32) {
            self.quality = primary_quality(quality);
        }

        fn start_compress(&mut self) -> Result<(), BackendError> {
            if self.width == 0 || self.height == 0 {
                return Err(BackendError::Encoder(format!(
                    "invalid dimensions {}x{}",
                    self.width, self.height
                )));
            }
            self.rows = Some(ScanlineBuffer::with_capacity(
                self.width as usize * 3,
                self.height,
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

            JpegEncoder::new_with_quality(&mut *self.destination, self.quality)
                .write_image(rows.as_bytes(), self.width, self.height, ExtendedColorType::Rgb8)
                .map_err(|e| BackendError::Encoder(e.to_string()))
        }
    }
}
