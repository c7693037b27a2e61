//! Image values passed between the runner, the generator and the store.

use crate::errors::InputError;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Encoding used for persisted stage artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG, written with a `.jpg` extension.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl OutputFormat {
    /// Every supported format.
    pub const ALL: [Self; 2] = [Self::Jpeg, Self::Png];

    /// Returns the file extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Returns the MIME type.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Encodes an image in this format.
    ///
    /// JPEG has no alpha channel, so images are flattened to RGB first.
    pub fn encode(self, image: &DynamicImage, jpeg_quality: u8) -> image::ImageResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        match self {
            Self::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut cursor, ImageOutputFormat::Jpeg(jpeg_quality))?,
            Self::Png => image.write_to(&mut cursor, ImageOutputFormat::Png)?,
        }
        Ok(cursor.into_inner())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(format!("unsupported output format '{other}' (expected jpeg or png)")),
        }
    }
}

/// An encoded image used as conditioning input for a generation call.
///
/// The bytes are shared, so cloning a reference image is cheap and never
/// copies pixel data.
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    bytes: Arc<[u8]>,
    mime_type: String,
    width: u32,
    height: u32,
}

impl ReferenceImage {
    /// Validates encoded bytes by decoding them once.
    pub fn from_bytes(bytes: Vec<u8>) -> image::ImageResult<Self> {
        let format = image::guess_format(&bytes)?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        Ok(Self {
            mime_type: mime_for(format).to_string(),
            width: decoded.width(),
            height: decoded.height(),
            bytes: bytes.into(),
        })
    }

    /// Encodes a decoded image in the given output format.
    pub fn encode(
        image: &DynamicImage,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> image::ImageResult<Self> {
        let bytes = format.encode(image, jpeg_quality)?;
        Ok(Self {
            bytes: bytes.into(),
            mime_type: format.mime_type().to_string(),
            width: image.width(),
            height: image.height(),
        })
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the MIME type of the encoded bytes.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the encoded size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there are no encoded bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Where the original photograph comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on disk.
    Path(PathBuf),
    /// Bytes already in memory, with a label for diagnostics.
    Bytes {
        /// Label used in error messages.
        name: String,
        /// Encoded image bytes.
        bytes: Vec<u8>,
    },
}

impl ImageSource {
    /// Creates an in-memory source.
    #[must_use]
    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes,
        }
    }

    /// Returns a description for logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    /// Reads and validates the image.
    pub fn load(&self) -> Result<ReferenceImage, InputError> {
        let bytes = match self {
            Self::Path(path) => {
                std::fs::read(path).map_err(|e| InputError::UnreadableImage {
                    source_name: self.describe(),
                    reason: e.to_string(),
                })?
            }
            Self::Bytes { bytes, .. } => bytes.clone(),
        };

        if bytes.is_empty() {
            return Err(InputError::UnreadableImage {
                source_name: self.describe(),
                reason: "no bytes".to_string(),
            });
        }

        ReferenceImage::from_bytes(bytes).map_err(|e| InputError::UndecodableImage {
            source_name: self.describe(),
            reason: e.to_string(),
        })
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for ImageSource {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Raw image payload returned by a generator.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Encoded image bytes as received.
    pub bytes: Vec<u8>,
    /// MIME type reported by the backend, if any.
    pub mime_type: Option<String>,
}

impl GeneratedImage {
    /// Creates a payload without a declared MIME type.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: None,
        }
    }

    /// Sets the declared MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Decodes the payload, sniffing the format from its contents.
    pub fn decode(&self) -> image::ImageResult<DynamicImage> {
        image::load_from_memory(&self.bytes)
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}
