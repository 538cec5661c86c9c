//! Page geometry and overlay placement calculations
//!
//! Everything here is pure arithmetic over page boxes. Nothing touches lopdf,
//! so the positioning rules can be tested without rendering anything.

use serde::Serialize;

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Watermark font size in points
pub const WATERMARK_FONT_SIZE: f32 = 8.0;

/// Distance between the watermark and the page edges, in points
pub const WATERMARK_MARGIN: f32 = 18.0;

/// Largest title font size, in points
pub const TITLE_MAX_FONT_SIZE: f32 = 36.0;

/// Title font size as a fraction of the page width
const TITLE_FONT_SCALE: f32 = 0.05;

/// Share of the page width the title text may occupy
const TITLE_MAX_TEXT_WIDTH: f32 = 0.9;

/// Gap between the bottom of the title text and the top of the image
pub const TITLE_IMAGE_SPACING: f32 = 24.0;

/// Bounding box for the title image, as fractions of the page
const TITLE_IMAGE_MAX_WIDTH: f32 = 0.5;
const TITLE_IMAGE_MAX_HEIGHT: f32 = 0.4;

/// Vertical center of the title image, as a fraction of the page height
const TITLE_IMAGE_CENTER: f32 = 0.4;

/// Page box in PDF user space (origin bottom-left, units in points)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// Create a geometry with its origin at (0, 0)
    pub fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    /// Build a geometry from a `[llx lly urx ury]` rectangle
    ///
    /// Returns `None` for degenerate boxes.
    pub fn from_rect(rect: [f32; 4]) -> Option<Self> {
        let [x0, y0, x1, y1] = rect;
        let geometry = Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        };
        if geometry.width > 0.0 && geometry.height > 0.0 {
            Some(geometry)
        } else {
            None
        }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(8.5 * POINTS_PER_INCH, 11.0 * POINTS_PER_INCH)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    /// MediaBox array for this geometry
    pub fn to_rect(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Overlap of two boxes, `None` if they do not overlap
    pub fn intersect(&self, other: &PageGeometry) -> Option<PageGeometry> {
        let [ax0, ay0, ax1, ay1] = self.to_rect();
        let [bx0, by0, bx1, by1] = other.to_rect();
        let (x0, y0) = (ax0.max(bx0), ay0.max(by0));
        let (x1, y1) = (ax1.min(bx1), ay1.min(by1));
        if x1 > x0 && y1 > y0 {
            PageGeometry::from_rect([x0, y0, x1, y1])
        } else {
            None
        }
    }
}

impl Default for PageGeometry {
    /// Used whenever a page box cannot be resolved
    fn default() -> Self {
        Self::letter()
    }
}

/// Orientation of a page relative to its orientation at planning time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Upright,
    Flipped,
}

impl Rotation {
    /// Rotation in degrees, as added to a page's `/Rotate`
    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Upright => 0,
            Rotation::Flipped => 180,
        }
    }
}

/// Normalize a `/Rotate` value to 0, 90, 180 or 270
///
/// Values that are not a multiple of 90 are rounded down to one.
pub fn normalize_rotate(degrees: i64) -> u16 {
    (degrees.rem_euclid(360) / 90 * 90) as u16
}

/// Text origin for an overlay string
///
/// `angle` is the counterclockwise turn of the text in page space. It matches
/// the page's `/Rotate`, so the text reads normally once the viewer or
/// printer applies that rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub angle: u16,
}

/// Where to put the traceability watermark on a page
///
/// `page_rotate` is the page's final `/Rotate`. The watermark always ends up
/// in the bottom-right corner of the page as displayed and printed, so the
/// anchor moves to whichever corner of the unrotated box lands there.
///
/// | `/Rotate` | unrotated corner | text runs |
/// |---|---|---|
/// | 0 | bottom-right | rightwards |
/// | 90 | top-right | upwards |
/// | 180 | top-left | leftwards |
/// | 270 | bottom-left | downwards |
pub fn watermark_anchor(geometry: &PageGeometry, page_rotate: i64, text_width: f32) -> Anchor {
    let [x0, y0, x1, y1] = geometry.to_rect();
    let angle = normalize_rotate(page_rotate);
    let (x, y) = match angle {
        90 => (x1 - WATERMARK_MARGIN, y1 - WATERMARK_MARGIN - text_width),
        180 => (x0 + WATERMARK_MARGIN + text_width, y1 - WATERMARK_MARGIN),
        270 => (x0 + WATERMARK_MARGIN, y0 + WATERMARK_MARGIN + text_width),
        _ => (x1 - WATERMARK_MARGIN - text_width, y0 + WATERMARK_MARGIN),
    };
    Anchor { x, y, angle }
}

/// Placement of the title image in page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resolved positions for the title page overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleLayout {
    pub font_size: f32,
    pub text: Anchor,
    pub image: Option<ImagePlacement>,
}

/// Font size for the title text on a page of the given width
///
/// `em_width` is the text width at a font size of 1pt.
pub fn title_font_size(page_width: f32, em_width: f32) -> f32 {
    let size = (page_width * TITLE_FONT_SCALE).min(TITLE_MAX_FONT_SIZE);
    let available = page_width * TITLE_MAX_TEXT_WIDTH;
    if em_width > 0.0 && em_width * size > available {
        available / em_width
    } else {
        size
    }
}

/// Lay out the title page
///
/// `em_width` is the title text width at 1pt; `image_size` is the pixel size
/// of the title image, if one is available.
pub fn title_layout(
    geometry: &PageGeometry,
    em_width: f32,
    image_size: Option<(u32, u32)>,
) -> TitleLayout {
    let font_size = title_font_size(geometry.width, em_width);
    let text_width = em_width * font_size;
    let text_x = geometry.x + (geometry.width - text_width) / 2.0;

    let image = image_size
        .filter(|&(w, h)| w > 0 && h > 0)
        .map(|(w, h)| {
            let max_w = geometry.width * TITLE_IMAGE_MAX_WIDTH;
            let max_h = geometry.height * TITLE_IMAGE_MAX_HEIGHT;
            let scale = (max_w / w as f32).min(max_h / h as f32);
            let width = w as f32 * scale;
            let height = h as f32 * scale;
            ImagePlacement {
                x: geometry.x + (geometry.width - width) / 2.0,
                y: geometry.y + geometry.height * TITLE_IMAGE_CENTER - height / 2.0,
                width,
                height,
            }
        });

    let text_y = match image {
        Some(placement) => placement.y + placement.height + TITLE_IMAGE_SPACING,
        // Baseline a third of the font size below center keeps caps visually centered
        None => geometry.y + geometry.height / 2.0 - font_size / 3.0,
    };

    TitleLayout {
        font_size,
        text: Anchor { x: text_x, y: text_y, angle: 0 },
        image,
    }
}
