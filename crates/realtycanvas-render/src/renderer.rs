//! The seam between the canvas and a drawing backend.

use kurbo::Point;
use peniko::Color;
use realtycanvas_core::canvas::Canvas;
use thiserror::Error;

/// Failures while drawing or encoding a frame.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

pub type RenderResult<T> = Result<T, RendererError>;

/// How the alignment grid is drawn over the layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// No grid.
    #[default]
    None,
    /// Full grid lines.
    Lines,
    /// Only intersection dots.
    Dots,
}

impl GridStyle {
    /// Style matching the persisted grid toggle.
    pub fn from_visible(visible: bool) -> Self {
        if visible { GridStyle::Lines } else { GridStyle::None }
    }

    /// Label shown in settings and logs.
    pub fn name(self) -> &'static str {
        match self {
            GridStyle::None => "None",
            GridStyle::Lines => "Lines",
            GridStyle::Dots => "Dots",
        }
    }
}

/// Everything a backend needs to draw one frame.
pub struct RenderContext<'a> {
    pub canvas: &'a Canvas,
    /// Fill behind the background layer.
    pub background_color: Color,
    /// Grid drawn over the layers.
    pub grid_style: GridStyle,
    /// Grid cell size in canvas pixels.
    pub grid_size: f64,
    /// Draw tool previews and the selection overlay.
    pub show_overlay: bool,
    /// Arrow being dragged out by the host, drawn with the short preview head.
    pub arrow_preview: Option<(Point, Point)>,
}

impl<'a> RenderContext<'a> {
    /// Editor frame: grid from the canvas settings, overlay on.
    pub fn new(canvas: &'a Canvas) -> Self {
        let settings = canvas.settings();
        Self {
            canvas,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            grid_style: GridStyle::from_visible(settings.grid_visible),
            grid_size: f64::from(settings.grid_size),
            show_overlay: true,
            arrow_preview: None,
        }
    }

    /// Context for an export frame: transparent, no grid, no overlay.
    pub fn export(canvas: &'a Canvas) -> Self {
        Self::new(canvas)
            .with_background(Color::TRANSPARENT)
            .with_grid(GridStyle::None)
            .with_overlay(false)
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    /// Toggle previews and selection handles.
    pub fn with_overlay(mut self, show: bool) -> Self {
        self.show_overlay = show;
        self
    }

    /// Set the arrow drag preview.
    pub fn with_arrow_preview(mut self, preview: Option<(Point, Point)>) -> Self {
        self.arrow_preview = preview;
        self
    }
}

/// A drawing backend.
///
/// Each call redraws the whole frame on every call; there is no
/// dirty-region tracking.
pub trait Renderer {
    /// Redraw the frame described by `ctx`.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Color the frame is cleared to.
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realtycanvas_core::Settings;

    #[test]
    fn test_context_defaults_follow_settings() {
        let settings = Settings {
            grid_visible: true,
            grid_size: 40,
            ..Default::default()
        };
        let canvas = Canvas::new(settings);
        let ctx = RenderContext::new(&canvas);
        assert_eq!(ctx.grid_style, GridStyle::Lines);
        assert_eq!(ctx.grid_size, 40.0);
        assert!(ctx.show_overlay);

        let export = RenderContext::export(&canvas);
        assert_eq!(export.grid_style, GridStyle::None);
        assert!(!export.show_overlay);
    }

    #[test]
    fn test_grid_style_names() {
        assert_eq!(GridStyle::from_visible(false), GridStyle::None);
        assert_eq!(GridStyle::Dots.name(), "Dots");
    }
}
