//! Coordinate transforms between page, display and raster space
//!
//! - page space: intrinsic PDF units at 100% zoom, top-left origin
//! - display space: page space multiplied by the zoom scale
//! - raster space: the bitmap's pixel grid, display space multiplied by the
//!   device pixel density (bitmap width / displayed width)

use crate::geometry::Rect;

/// Padding added around highlight boxes in display space. Extracted glyph
/// boxes run small and sit slightly low, so the box grows 3 left and 5 up
/// and gains 6 in width and 10 in height overall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightPadding {
    pub left: f32,
    pub top: f32,
    pub extra_width: f32,
    pub extra_height: f32,
}

pub const HIGHLIGHT_PADDING: HighlightPadding = HighlightPadding {
    left: 3.0,
    top: 5.0,
    extra_width: 6.0,
    extra_height: 10.0,
};

/// The page as currently laid out by the viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    /// Zoom factor from page space to display space
    pub scale: f32,
    /// Page width at 100% scale
    pub page_width: f32,
    /// Page height at 100% scale
    pub page_height: f32,
}

impl PageViewport {
    pub fn new(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            scale,
            page_width,
            page_height,
        }
    }

    pub fn display_width(&self) -> f32 {
        self.page_width * self.scale
    }

    pub fn display_height(&self) -> f32 {
        self.page_height * self.scale
    }

    /// Page-space box to display space
    pub fn to_display(&self, page_box: &Rect) -> Rect {
        page_box.scaled(self.scale)
    }

    /// Display-space box of a match, grown by the highlight padding
    pub fn highlight_box(&self, page_box: &Rect) -> Rect {
        pad_highlight(&self.to_display(page_box))
    }
}

/// Grow a display-space box by [`HIGHLIGHT_PADDING`]
pub fn pad_highlight(display_box: &Rect) -> Rect {
    let p = HIGHLIGHT_PADDING;
    Rect::new(
        display_box.x - p.left,
        display_box.y - p.top,
        display_box.width + p.extra_width,
        display_box.height + p.extra_height,
    )
}

/// The bitmap the current page was rendered into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterInfo {
    /// Intrinsic bitmap size in pixels
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Size at which the bitmap is displayed
    pub display_width: f32,
    pub display_height: f32,
}

impl RasterInfo {
    /// Device pixel density, `None` if the raster is not laid out
    pub fn density_ratio(&self) -> Option<f32> {
        if self.display_width > 0.0 && self.pixel_width > 0 {
            Some(self.pixel_width as f32 / self.display_width)
        } else {
            None
        }
    }

    /// Display-space box to raster pixel space
    pub fn to_raster(&self, display_box: &Rect) -> Option<Rect> {
        self.density_ratio().map(|ratio| display_box.scaled(ratio))
    }
}

/// Source square to sample for a lens of `diameter` at `magnification`,
/// centered on `raster_box`. May extend past the bitmap edges; those parts
/// render blank.
pub fn lens_source_crop(raster_box: &Rect, diameter: f32, magnification: f32) -> Rect {
    let (cx, cy) = raster_box.center();
    Rect::square_around(cx, cy, diameter / magnification)
}
