//! Draw commands and the drawing-surface seam
//!
//! Renderers never touch a live canvas. They produce a list of
//! [`DrawCommand`]s from the data model, and a thin [`DrawSurface`] adapter
//! replays them onto whatever 2D surface the host uses.

use crate::geometry::Rect;

/// RGBA color value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color from RGBA values (0.0 to 1.0)
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a new opaque color from RGB values
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// One drawing operation, coordinates in the target surface's space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Erase a rectangle to transparent
    Clear { rect: Rect },
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    /// Push the clip state
    Save,
    /// Pop the clip state
    Restore,
    /// Intersect the clip with a circle
    ClipCircle { center: [f32; 2], radius: f32 },
    /// Copy `src` (raster pixels) of the page bitmap scaled into `dest`
    BlitRaster { src: Rect, dest: Rect },
    StrokeCircle {
        center: [f32; 2],
        radius: f32,
        color: Color,
        width: f32,
    },
}

/// Failure reported by a drawing surface
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("raster not readable: {0}")]
    Raster(String),
    #[error("unbalanced restore")]
    UnbalancedRestore,
}

/// A 2D drawing target
pub trait DrawSurface {
    fn clear(&mut self, rect: Rect) -> Result<(), DrawError>;
    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), DrawError>;
    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) -> Result<(), DrawError>;
    fn save(&mut self) -> Result<(), DrawError>;
    fn restore(&mut self) -> Result<(), DrawError>;
    fn clip_circle(&mut self, center: [f32; 2], radius: f32) -> Result<(), DrawError>;
    fn blit_raster(&mut self, src: Rect, dest: Rect) -> Result<(), DrawError>;
    fn stroke_circle(
        &mut self,
        center: [f32; 2],
        radius: f32,
        color: Color,
        width: f32,
    ) -> Result<(), DrawError>;
}

/// Replay commands onto a surface, stopping at the first failure
pub fn replay(surface: &mut dyn DrawSurface, commands: &[DrawCommand]) -> Result<(), DrawError> {
    for command in commands {
        match command {
            DrawCommand::Clear { rect } => surface.clear(*rect)?,
            DrawCommand::FillRect { rect, color } => surface.fill_rect(*rect, *color)?,
            DrawCommand::StrokeRect { rect, color, width } => {
                surface.stroke_rect(*rect, *color, *width)?
            }
            DrawCommand::Save => surface.save()?,
            DrawCommand::Restore => surface.restore()?,
            DrawCommand::ClipCircle { center, radius } => surface.clip_circle(*center, *radius)?,
            DrawCommand::BlitRaster { src, dest } => surface.blit_raster(*src, *dest)?,
            DrawCommand::StrokeCircle {
                center,
                radius,
                color,
                width,
            } => surface.stroke_circle(*center, *radius, *color, *width)?,
        }
    }
    Ok(())
}

/// Surface that records what was drawn; handy for debugging and tests
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
    depth: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawSurface for RecordingSurface {
    fn clear(&mut self, rect: Rect) -> Result<(), DrawError> {
        self.commands.push(DrawCommand::Clear { rect });
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), DrawError> {
        self.commands.push(DrawCommand::FillRect { rect, color });
        Ok(())
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) -> Result<(), DrawError> {
        self.commands
            .push(DrawCommand::StrokeRect { rect, color, width });
        Ok(())
    }

    fn save(&mut self) -> Result<(), DrawError> {
        self.depth += 1;
        self.commands.push(DrawCommand::Save);
        Ok(())
    }

    fn restore(&mut self) -> Result<(), DrawError> {
        if self.depth == 0 {
            return Err(DrawError::UnbalancedRestore);
        }
        self.depth -= 1;
        self.commands.push(DrawCommand::Restore);
        Ok(())
    }

    fn clip_circle(&mut self, center: [f32; 2], radius: f32) -> Result<(), DrawError> {
        self.commands
            .push(DrawCommand::ClipCircle { center, radius });
        Ok(())
    }

    fn blit_raster(&mut self, src: Rect, dest: Rect) -> Result<(), DrawError> {
        self.commands.push(DrawCommand::BlitRaster { src, dest });
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        center: [f32; 2],
        radius: f32,
        color: Color,
        width: f32,
    ) -> Result<(), DrawError> {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            color,
            width,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_records_in_order() {
        let commands = vec![
            DrawCommand::Save,
            DrawCommand::ClipCircle {
                center: [10.0, 10.0],
                radius: 5.0,
            },
            DrawCommand::Restore,
        ];
        let mut surface = RecordingSurface::new();
        replay(&mut surface, &commands).unwrap();
        assert_eq!(surface.commands, commands);
    }

    #[test]
    fn test_replay_stops_on_error() {
        let commands = vec![
            DrawCommand::Restore,
            DrawCommand::Clear {
                rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            },
        ];
        let mut surface = RecordingSurface::new();
        assert!(matches!(
            replay(&mut surface, &commands),
            Err(DrawError::UnbalancedRestore)
        ));
        assert!(surface.commands.is_empty());
    }
}
