use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

/// Image output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG format
    Jpeg,
    /// PNG format
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// MIME type used in data URIs.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Options for saving captured images.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Image format
    pub format: ImageFormat,
    /// JPEG quality (1-100, default 90)
    pub jpeg_quality: u8,
}

impl SaveOptions {
    /// Create default save options with JPEG format.
    pub fn new() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            jpeg_quality: 90,
        }
    }

    /// Set the output format.
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set JPEG quality (1-100).
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Save a captured image, creating parent directories as needed.
pub fn save_capture(img: &DynamicImage, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    write_encoded(img, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Encode a captured image to bytes.
pub fn encode_capture(img: &DynamicImage, options: &SaveOptions) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    write_encoded(img, &mut buffer, options)?;
    Ok(buffer.into_inner())
}

fn write_encoded<W: Write>(img: &DynamicImage, writer: W, options: &SaveOptions) -> Result<()> {
    // Screenshots have no meaningful alpha; encode as RGB8
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    match options.format {
        ImageFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(writer, options.jpeg_quality);
            encoder.encode(rgb_img.as_raw(), width, height, ExtendedColorType::Rgb8)?;
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new(writer);
            encoder.write_image(rgb_img.as_raw(), width, height, ExtendedColorType::Rgb8)?;
        }
    }

    Ok(())
}
