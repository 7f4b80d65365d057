//! Magnifying lens
//!
//! A circular, magnified crop of the full-resolution page raster, centered
//! on the current match and shown above the page. The crop is redrawn with
//! the match highlighted at magnified scale and framed by a ring. The lens
//! follows the match, not the pointer.

use crate::draw::{replay, DrawCommand, DrawSurface};
use crate::geometry::Rect;
use crate::matcher::MatchResult;
use crate::settings::{LensConfig, OverlayStyle};
use crate::transform::{lens_source_crop, pad_highlight, PageViewport, RasterInfo};

/// Why the lens is not shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    Disabled,
    NoMatch,
    /// No page bitmap, or it has no displayed size
    RasterUnavailable,
    /// The page's on-screen rectangle is unknown
    AnchorUnavailable,
}

/// The page's bounding rectangle in viewport coordinates
pub type PageAnchor = Rect;

/// A lens ready to be drawn
#[derive(Debug, Clone, PartialEq)]
pub struct LensView {
    /// Top-left corner of the lens in viewport coordinates
    pub left: f32,
    pub top: f32,
    pub diameter: f32,
    /// Raster pixels sampled
    pub source: Rect,
    /// Commands in lens-local coordinates (0..diameter)
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LensFrame {
    Hidden(HiddenReason),
    Visible(LensView),
}

impl LensFrame {
    pub fn is_visible(&self) -> bool {
        matches!(self, LensFrame::Visible(_))
    }
}

/// Everything the lens depends on
#[derive(Debug, Clone, PartialEq)]
pub struct LensInputs {
    pub matched: Option<MatchResult>,
    pub viewport: PageViewport,
    pub raster: Option<RasterInfo>,
    pub anchor: Option<PageAnchor>,
    pub enabled: bool,
}

/// Compute the lens for the current state
pub fn build_lens(inputs: &LensInputs, config: &LensConfig, style: &OverlayStyle) -> LensFrame {
    if !inputs.enabled {
        return LensFrame::Hidden(HiddenReason::Disabled);
    }
    let Some(matched) = inputs.matched.as_ref() else {
        return LensFrame::Hidden(HiddenReason::NoMatch);
    };
    let Some(raster) = inputs.raster else {
        return LensFrame::Hidden(HiddenReason::RasterUnavailable);
    };
    let Some(ratio) = raster.density_ratio() else {
        return LensFrame::Hidden(HiddenReason::RasterUnavailable);
    };
    let Some(anchor) = inputs.anchor else {
        return LensFrame::Hidden(HiddenReason::AnchorUnavailable);
    };

    let diameter = config.diameter;
    let radius = diameter / 2.0;
    let display_box = inputs.viewport.to_display(&matched.bbox());

    // Centered over the match, above the page, never above the viewport top
    let (match_cx, _) = display_box.center();
    let left = anchor.x + match_cx - radius;
    let top = (anchor.y - config.gap - diameter).max(0.0);

    let source = lens_source_crop(&display_box.scaled(ratio), diameter, config.magnification);
    let zoom = diameter / source.width;

    // Highlight: padded display box -> raster -> lens-local
    let highlight = pad_highlight(&display_box)
        .scaled(ratio)
        .translated(-source.x, -source.y)
        .scaled(zoom);

    let commands = vec![
        DrawCommand::Save,
        DrawCommand::ClipCircle {
            center: [radius, radius],
            radius,
        },
        DrawCommand::BlitRaster {
            src: source,
            dest: Rect::new(0.0, 0.0, diameter, diameter),
        },
        DrawCommand::FillRect {
            rect: highlight,
            color: style.fill,
        },
        DrawCommand::StrokeRect {
            rect: highlight,
            color: style.border,
            width: style.border_width,
        },
        DrawCommand::Restore,
        DrawCommand::StrokeCircle {
            center: [radius, radius],
            radius: radius - config.ring_width / 2.0,
            color: config.ring_color,
            width: config.ring_width,
        },
    ];

    LensFrame::Visible(LensView {
        left,
        top,
        diameter,
        source,
        commands,
    })
}

/// Draw a lens onto a surface. Failures are reported as diagnostic text,
/// never propagated. Saves left open by a failed draw are restored so the
/// surface's clip state is back where it started.
pub fn paint_lens(surface: &mut dyn DrawSurface, view: &LensView) -> Option<String> {
    let mut open_saves = 0usize;
    for command in &view.commands {
        if let Err(e) = replay(surface, std::slice::from_ref(command)) {
            for _ in 0..open_saves {
                if let Err(restore_err) = surface.restore() {
                    log::debug!("lens restore failed: {}", restore_err);
                    break;
                }
            }
            log::debug!("lens draw failed: {}", e);
            return Some(format!("Lens draw failed: {}", e));
        }
        match command {
            DrawCommand::Save => open_saves += 1,
            DrawCommand::Restore => open_saves = open_saves.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Lens state that recomputes only when its inputs change
#[derive(Debug)]
pub struct MagnifyingLens {
    config: LensConfig,
    style: OverlayStyle,
    inputs: Option<LensInputs>,
    frame: LensFrame,
}

impl MagnifyingLens {
    pub fn new(config: LensConfig, style: OverlayStyle) -> Self {
        Self {
            config,
            style,
            inputs: None,
            frame: LensFrame::Hidden(HiddenReason::Disabled),
        }
    }

    /// Returns `true` when the frame was recomputed
    pub fn update(&mut self, inputs: LensInputs) -> bool {
        if self.inputs.as_ref() == Some(&inputs) {
            return false;
        }
        self.frame = build_lens(&inputs, &self.config, &self.style);
        self.inputs = Some(inputs);
        true
    }

    pub fn frame(&self) -> &LensFrame {
        &self.frame
    }
}
