use std::io::Cursor;
use std::sync::Arc;

use ecoscan_model::ImageDimensions;
use image::{ImageFormat, ImageReader};

use crate::error::{CaptureError, CaptureResult};

/// An encoded still image straight from the camera or a user-selected file.
///
/// Only the header is inspected on construction, so building one is cheap;
/// full decoding happens when a crop is committed.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    dimensions: ImageDimensions,
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl RawImage {
    /// Sniff the format and dimensions of `bytes`.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> CaptureResult<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        if bytes.is_empty() {
            return Err(CaptureError::EmptyImage);
        }

        let format =
            image::guess_format(&bytes).map_err(CaptureError::Decode)?;
        let reader = ImageReader::with_format(Cursor::new(&*bytes), format);
        let (width, height) =
            reader.into_dimensions().map_err(CaptureError::Decode)?;
        let dimensions = ImageDimensions::try_from((width, height))
            .map_err(|_| CaptureError::EmptyImage)?;

        Ok(Self {
            bytes,
            format,
            dimensions,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }
}

/// The image that gets uploaded: either the raw capture untouched or the
/// re-encoded result of a crop.
#[derive(Clone, PartialEq, Eq)]
pub struct FinalImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    dimensions: ImageDimensions,
    cropped: bool,
}

impl std::fmt::Debug for FinalImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalImage")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("dimensions", &self.dimensions)
            .field("cropped", &self.cropped)
            .finish()
    }
}

impl FinalImage {
    pub(crate) fn cropped(
        bytes: Vec<u8>,
        format: ImageFormat,
        dimensions: ImageDimensions,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            format,
            dimensions,
            cropped: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }

    pub fn is_cropped(&self) -> bool {
        self.cropped
    }

    /// Upload file name, e.g. `scan.jpg`.
    pub fn file_name(&self) -> String {
        let extension = self
            .format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin");
        format!("scan.{extension}")
    }
}

impl From<RawImage> for FinalImage {
    fn from(raw: RawImage) -> Self {
        Self {
            bytes: raw.bytes,
            format: raw.format,
            dimensions: raw.dimensions,
            cropped: false,
        }
    }
}

impl From<&RawImage> for FinalImage {
    fn from(raw: &RawImage) -> Self {
        Self::from(raw.clone())
    }
}
