//! Crop geometry and the crop-commit render step.
//!
//! Regions are kept in source-image coordinates as floating point so a crop
//! drawn on a scaled-down preview survives the round trip. Only the final
//! extraction snaps to whole pixels, and it always rounds outward so label
//! text at the edge of a selection is never clipped.

use std::io::Cursor;

use ecoscan_model::ImageDimensions;
use image::{ColorType, ImageFormat, codecs::jpeg::JpegEncoder};
use tracing::debug;

use super::image::{FinalImage, RawImage};
use crate::error::{CropError, CropResult};

pub const MIN_ZOOM: f64 = 1.0;
pub const DEFAULT_MAX_ZOOM: f64 = 3.0;

/// Distance below which a coordinate is treated as already sitting on a
/// pixel boundary, so float noise doesn't grow a crop by a whole pixel.
const SNAP_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AspectRatio {
    #[default]
    Free,
    /// Width divided by height.
    Fixed(f64),
}

/// Rectangle in source-image coordinates plus the preview zoom it was
/// drawn at.
///
/// The rectangle already accounts for zoom; it is exactly the area that gets
/// extracted. `zoom` is kept so the preview can be restored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
    pub aspect: AspectRatio,
}

/// Integer pixel rectangle inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// The whole image at zoom 1, the starting point of every crop session.
    pub fn full(dims: ImageDimensions) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: f64::from(dims.width_u32()),
            height: f64::from(dims.height_u32()),
            zoom: MIN_ZOOM,
            aspect: AspectRatio::Free,
        }
    }

    pub fn with_aspect(mut self, aspect: AspectRatio) -> Self {
        self.aspect = aspect;
        self
    }

    /// Clamp zoom into `[1, max_zoom]` and the rectangle into the image.
    ///
    /// A fixed aspect ratio is honoured by shrinking the longer side. Nothing
    /// else is validated here; a degenerate result is caught on commit.
    pub fn clamped(self, dims: ImageDimensions, max_zoom: f64) -> Self {
        let img_w = f64::from(dims.width_u32());
        let img_h = f64::from(dims.height_u32());
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };

        let zoom = clamp_zoom(self.zoom, max_zoom);

        let x = finite(self.x).clamp(0.0, img_w);
        let y = finite(self.y).clamp(0.0, img_h);
        let mut width = finite(self.width).clamp(0.0, img_w - x);
        let mut height = finite(self.height).clamp(0.0, img_h - y);

        if let AspectRatio::Fixed(ratio) = self.aspect
            && ratio.is_finite()
            && ratio > 0.0
            && height > 0.0
        {
            if width / height > ratio {
                width = height * ratio;
            } else {
                height = width / ratio;
            }
        }

        Self {
            x,
            y,
            width,
            height,
            zoom,
            aspect: self.aspect,
        }
    }

    /// Map the rectangle to whole source pixels, rounding outward.
    pub fn pixel_rect(&self, dims: ImageDimensions) -> CropResult<PixelRect> {
        let degenerate = || CropError::Degenerate {
            width: self.width,
            height: self.height,
        };
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(degenerate());
        }

        let (left, right) =
            outward_span(self.x, self.x + self.width, dims.width_u32());
        let (top, bottom) =
            outward_span(self.y, self.y + self.height, dims.height_u32());

        if right <= left || bottom <= top {
            return Err(degenerate());
        }

        Ok(PixelRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}

/// Zoom limited to `[1, max_zoom]`; non-finite input falls back to 1.
pub fn clamp_zoom(zoom: f64, max_zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, max_zoom.max(MIN_ZOOM))
    } else {
        MIN_ZOOM
    }
}

fn snap(v: f64) -> f64 {
    let rounded = v.round();
    if (v - rounded).abs() < SNAP_EPSILON {
        rounded
    } else {
        v
    }
}

/// Floor the leading edge, ceil the trailing edge, clamp both to `[0, limit]`.
fn outward_span(start: f64, end: f64, limit: u32) -> (u32, u32) {
    let limit_f = f64::from(limit);
    let lo = snap(start).floor().clamp(0.0, limit_f) as u32;
    let hi = snap(end).ceil().clamp(0.0, limit_f) as u32;
    (lo, hi)
}

/// Rectangle as drawn on the on-screen preview, in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Relates the size an image is shown at to its natural pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    natural: ImageDimensions,
    displayed_width: f64,
    displayed_height: f64,
}

impl DisplayMapping {
    pub fn new(
        natural: ImageDimensions,
        displayed_width: f64,
        displayed_height: f64,
    ) -> CropResult<Self> {
        if !(displayed_width.is_finite() && displayed_height.is_finite())
            || displayed_width <= 0.0
            || displayed_height <= 0.0
        {
            return Err(CropError::InvalidDisplay {
                width: displayed_width,
                height: displayed_height,
            });
        }
        Ok(Self {
            natural,
            displayed_width,
            displayed_height,
        })
    }

    pub fn scale_x(&self) -> f64 {
        f64::from(self.natural.width_u32()) / self.displayed_width
    }

    pub fn scale_y(&self) -> f64 {
        f64::from(self.natural.height_u32()) / self.displayed_height
    }

    /// Convert a rectangle drawn on the preview into a source-coordinate
    /// crop region.
    ///
    /// At zoom `z` the preview shows the image `z` times larger than its
    /// displayed size, so one preview unit covers `scale / z` source pixels.
    /// `rect` is measured from the zoomed image's top-left corner.
    pub fn to_source(
        &self,
        rect: DisplayRect,
        zoom: f64,
        aspect: AspectRatio,
    ) -> CropRegion {
        let zoom = clamp_zoom(zoom, f64::INFINITY);
        let (sx, sy) = (self.scale_x() / zoom, self.scale_y() / zoom);
        CropRegion {
            x: rect.x * sx,
            y: rect.y * sy,
            width: rect.width * sx,
            height: rect.height * sy,
            zoom,
            aspect,
        }
    }
}

/// Extract `region` from `raw` and re-encode it as JPEG.
pub fn render_crop(
    raw: &RawImage,
    region: &CropRegion,
    jpeg_quality: u8,
) -> CropResult<FinalImage> {
    let rect = region.pixel_rect(raw.dimensions())?;

    let source = image::load_from_memory_with_format(raw.bytes(), raw.format())
        .map_err(CropError::SourceNotLoaded)?;
    // Header and body can disagree on truncated files.
    let dims = ImageDimensions::try_from((source.width(), source.height()))
        .map_err(|_| CropError::Degenerate {
            width: f64::from(source.width()),
            height: f64::from(source.height()),
        })?;
    let rect = if dims == raw.dimensions() {
        rect
    } else {
        region.pixel_rect(dims)?
    };

    let cropped = source
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder =
            JpegEncoder::new_with_quality(&mut out, jpeg_quality.clamp(1, 100));
        encoder
            .encode(
                cropped.as_raw(),
                cropped.width(),
                cropped.height(),
                ColorType::Rgb8.into(),
            )
            .map_err(CropError::Encode)?;
    }

    debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "rendered crop"
    );

    let out_dims = ImageDimensions::try_from((cropped.width(), cropped.height()))
        .map_err(|_| CropError::Degenerate {
            width: f64::from(cropped.width()),
            height: f64::from(cropped.height()),
        })?;
    Ok(FinalImage::cropped(out.into_inner(), ImageFormat::Jpeg, out_dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::image::fixtures;

    fn dims(w: u32, h: u32) -> ImageDimensions {
        ImageDimensions::try_from((w, h)).unwrap()
    }

    fn region(x: f64, y: f64, width: f64, height: f64) -> CropRegion {
        CropRegion {
            x,
            y,
            width,
            height,
            zoom: 1.0,
            aspect: AspectRatio::Free,
        }
    }

    #[test]
    fn full_region_covers_the_image() {
        let full = CropRegion::full(dims(640, 480));
        assert_eq!(
            full.pixel_rect(dims(640, 480)).unwrap(),
            PixelRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn fractional_edges_round_outward() {
        let rect = region(10.4, 20.6, 99.2, 49.9)
            .pixel_rect(dims(640, 480))
            .unwrap();
        // 10.4..109.6 -> 10..110, 20.6..70.5 -> 20..71
        assert_eq!(
            rect,
            PixelRect {
                x: 10,
                y: 20,
                width: 100,
                height: 51
            }
        );
    }

    #[test]
    fn zoom_does_not_shrink_the_extracted_rect() {
        let mut r = region(100.0, 100.0, 200.0, 100.0);
        r.zoom = 2.0;
        let rect = r.pixel_rect(dims(640, 480)).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 100,
                y: 100,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn degenerate_regions_are_rejected() {
        for r in [
            region(0.0, 0.0, 0.0, 10.0),
            region(0.0, 0.0, 10.0, 0.0),
            region(0.0, 0.0, f64::NAN, 10.0),
            region(0.0, 0.0, -5.0, 10.0),
        ] {
            assert!(matches!(
                r.pixel_rect(dims(64, 64)),
                Err(CropError::Degenerate { .. })
            ));
        }
    }

    #[test]
    fn clamping_bounds_zoom_and_rect() {
        let mut r = region(-20.0, 30.0, 1000.0, 1000.0);
        r.zoom = 9.0;
        let clamped = r.clamped(dims(640, 480), DEFAULT_MAX_ZOOM);
        assert_eq!(clamped.x, 0.0);
        assert_eq!(clamped.width, 640.0);
        assert_eq!(clamped.height, 450.0);
        assert_eq!(clamped.zoom, 3.0);

        let mut r = region(0.0, 0.0, 10.0, 10.0);
        r.zoom = 0.2;
        assert_eq!(r.clamped(dims(64, 64), DEFAULT_MAX_ZOOM).zoom, 1.0);
    }

    #[test]
    fn fixed_aspect_shrinks_the_longer_side() {
        let r = region(0.0, 0.0, 400.0, 100.0)
            .with_aspect(AspectRatio::Fixed(1.0))
            .clamped(dims(640, 480), DEFAULT_MAX_ZOOM);
        assert_eq!((r.width, r.height), (100.0, 100.0));
    }

    #[test]
    fn display_mapping_scales_back_to_natural_pixels() {
        let mapping = DisplayMapping::new(dims(4000, 3000), 400.0, 300.0).unwrap();
        assert_eq!(mapping.scale_x(), 10.0);
        let r = mapping.to_source(
            DisplayRect {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 50.0,
            },
            1.0,
            AspectRatio::Free,
        );
        assert_eq!((r.x, r.y, r.width, r.height), (100.0, 200.0, 1000.0, 500.0));

        // Zoomed in 2x, the same preview rect covers half the source.
        let zoomed = mapping.to_source(
            DisplayRect {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 50.0,
            },
            2.0,
            AspectRatio::Free,
        );
        assert_eq!(
            (zoomed.x, zoomed.y, zoomed.width, zoomed.height, zoomed.zoom),
            (50.0, 100.0, 500.0, 250.0, 2.0)
        );

        assert!(DisplayMapping::new(dims(10, 10), 0.0, 10.0).is_err());
    }

    #[test]
    fn render_output_matches_region_pixels() {
        let raw = RawImage::from_bytes(fixtures::encoded(
            200,
            150,
            ImageFormat::Png,
        ))
        .unwrap();

        let zoomed = |mut r: CropRegion, zoom: f64| {
            r.zoom = zoom;
            r
        };

        for (r, expected) in [
            (region(0.0, 0.0, 200.0, 150.0), (200, 150)),
            (zoomed(region(0.0, 0.0, 200.0, 150.0), 2.0), (200, 150)),
            (zoomed(region(10.0, 20.0, 50.0, 40.0), 3.0), (50, 40)),
            (region(10.0, 20.0, 50.0, 40.0), (50, 40)),
            (region(33.3, 7.7, 66.6, 77.7), (67, 79)),
        ] {
            let out = render_crop(&raw, &r, 90).unwrap();
            let (w, h) = out.dimensions().as_u32_tuple();
            assert_eq!((w, h), expected);
            assert!((f64::from(w) - r.width).abs() <= 2.0);
            assert!((f64::from(h) - r.height).abs() <= 2.0);
            assert_eq!(out.format(), ImageFormat::Jpeg);
            assert!(out.is_cropped());

            let decoded = image::load_from_memory(out.bytes()).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (w, h));
        }
    }
}
