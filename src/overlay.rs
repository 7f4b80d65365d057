//! Highlight overlay
//!
//! A transparent layer the size of the displayed page. Every active match is
//! painted as a translucent box with a solid border. The layer is rebuilt
//! from scratch whenever its inputs change and fades between visible and
//! hidden. It never takes pointer input.

use crate::draw::DrawCommand;
use crate::geometry::Rect;
use crate::matcher::MatchResult;
use crate::settings::OverlayStyle;
use crate::transform::PageViewport;

/// Opacity animation between two levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityTransition {
    pub from: f32,
    pub to: f32,
    pub duration_ms: u32,
}

impl OpacityTransition {
    pub fn settled(opacity: f32) -> Self {
        Self {
            from: opacity,
            to: opacity,
            duration_ms: 0,
        }
    }

    /// Linear opacity `elapsed_ms` after the transition started
    pub fn value_at(&self, elapsed_ms: u32) -> f32 {
        if self.duration_ms == 0 || elapsed_ms >= self.duration_ms {
            return self.to;
        }
        let t = elapsed_ms as f32 / self.duration_ms as f32;
        self.from + (self.to - self.from) * t
    }
}

/// A fully built overlay layer
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    /// Canvas size (display space)
    pub width: f32,
    pub height: f32,
    pub opacity: OpacityTransition,
    pub commands: Vec<DrawCommand>,
}

impl OverlayFrame {
    /// The overlay lets every click through to the page below
    pub fn accepts_pointer(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OverlayInputs {
    matches: Vec<MatchResult>,
    viewport: PageViewport,
    enabled: bool,
}

/// Builds overlay frames, rebuilding only when inputs change
#[derive(Debug)]
pub struct HighlightOverlay {
    style: OverlayStyle,
    inputs: Option<OverlayInputs>,
    frame: OverlayFrame,
}

impl HighlightOverlay {
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            style,
            inputs: None,
            frame: OverlayFrame {
                width: 0.0,
                height: 0.0,
                opacity: OpacityTransition::settled(0.0),
                commands: Vec::new(),
            },
        }
    }

    /// Feed the current state. Returns `true` when the frame was rebuilt.
    pub fn update(&mut self, matches: &[MatchResult], viewport: PageViewport, enabled: bool) -> bool {
        let inputs = OverlayInputs {
            matches: matches.to_vec(),
            viewport,
            enabled,
        };
        if self.inputs.as_ref() == Some(&inputs) {
            return false;
        }

        let previous = self.frame.opacity.to;
        self.frame = build_overlay(&inputs.matches, &viewport, enabled, &self.style, previous);
        self.inputs = Some(inputs);
        true
    }

    pub fn frame(&self) -> &OverlayFrame {
        &self.frame
    }
}

/// Build an overlay frame for the given matches
pub fn build_overlay(
    matches: &[MatchResult],
    viewport: &PageViewport,
    enabled: bool,
    style: &OverlayStyle,
    previous_opacity: f32,
) -> OverlayFrame {
    let width = viewport.display_width();
    let height = viewport.display_height();
    let visible = enabled && !matches.is_empty();

    let mut commands = vec![DrawCommand::Clear {
        rect: Rect::new(0.0, 0.0, width, height),
    }];
    if visible {
        for m in matches {
            let rect = viewport.highlight_box(&m.bbox());
            commands.push(DrawCommand::FillRect {
                rect,
                color: style.fill,
            });
            commands.push(DrawCommand::StrokeRect {
                rect,
                color: style.border,
                width: style.border_width,
            });
        }
    }

    let target = if visible { 1.0 } else { 0.0 };
    let opacity = if target == previous_opacity {
        OpacityTransition::settled(target)
    } else {
        OpacityTransition {
            from: previous_opacity,
            to: target,
            duration_ms: style.transition_ms,
        }
    };

    OverlayFrame {
        width,
        height,
        opacity,
        commands,
    }
}
