//! An editing session: a canvas wired to a renderer.

use ab_glyph::FontArc;
use realtycanvas_core::canvas::Canvas;
use realtycanvas_core::{ClickTracker, Command, ExportFormat, KeyEvent, PointerEvent};
use std::time::Instant;

use crate::export::{ExportedImage, export};
use crate::raster::RasterRenderer;
use crate::renderer::{RenderContext, RenderResult, Renderer};
use crate::text::TextRasterizer;

/// Owns the canvas and an injected renderer and redraws after state changes.
pub struct Session<R: Renderer> {
    canvas: Canvas,
    renderer: R,
    clicks: ClickTracker,
    frames: u64,
}

impl<R: Renderer> Session<R> {
    pub fn new(canvas: Canvas, renderer: R) -> Self {
        Self {
            canvas,
            renderer,
            clicks: ClickTracker::new(),
            frames: 0,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draw a frame now, regardless of pending changes.
    pub fn redraw(&mut self) -> RenderResult<()> {
        self.canvas.take_redraw();
        let ctx = RenderContext::new(&self.canvas);
        self.renderer.render(&ctx)?;
        self.frames += 1;
        Ok(())
    }

    /// Draw a frame if the canvas changed since the last one.
    pub fn redraw_if_needed(&mut self) -> RenderResult<bool> {
        if !self.canvas.needs_redraw() {
            return Ok(false);
        }
        self.redraw()?;
        Ok(true)
    }

    /// Feed a raw pointer event. Quick repeated presses also deliver a double click.
    pub fn pointer(&mut self, event: PointerEvent, at: Instant) {
        for event in self.clicks.process(event, at) {
            self.canvas.handle_pointer(event);
        }
    }

    /// Feed a key press. Returns the command the host must carry out, if any.
    pub fn key(&mut self, event: &KeyEvent) -> Option<Command> {
        let command = self.canvas.handle_key(event);
        if let Some(command) = command {
            log::debug!("Host command {:?}", command);
        }
        command
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }
}

impl Session<RasterRenderer> {
    /// Raster session; a font also replaces the canvas text measurer so hit
    /// boxes match the drawn glyphs.
    pub fn with_font(mut canvas: Canvas, font: Option<FontArc>) -> Self {
        let text = TextRasterizer::new(font);
        if let Some(measurer) = text.measurer() {
            canvas.set_measurer(Box::new(measurer));
        }
        Self::new(canvas, RasterRenderer::new(text))
    }

    /// Encode the current composition.
    pub fn export(&mut self, format: ExportFormat, quality: f64) -> RenderResult<ExportedImage> {
        export(&self.canvas, &mut self.renderer, format, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use realtycanvas_core::{Modifiers, RasterImage, Settings, ToolKind};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        last_grid: Option<crate::renderer::GridStyle>,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, ctx: &RenderContext) -> RenderResult<()> {
            self.frames += 1;
            self.last_grid = Some(ctx.grid_style);
            Ok(())
        }
    }

    fn session() -> Session<CountingRenderer> {
        let mut canvas = Canvas::new(Settings::default());
        canvas.set_background(RasterImage::new(100, 100, vec![0; 100 * 100 * 4]));
        Session::new(canvas, CountingRenderer::default())
    }

    #[test]
    fn test_redraw_only_when_needed() {
        let mut session = session();
        assert!(session.redraw_if_needed().unwrap());
        assert!(!session.redraw_if_needed().unwrap());
        assert_eq!(session.renderer().frames, 1);

        session.canvas_mut().add_arrow(Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        assert!(session.redraw_if_needed().unwrap());
        assert_eq!(session.frames(), 2);
    }

    #[test]
    fn test_double_click_finishes_path() {
        let mut session = session();
        session.canvas_mut().set_tool(ToolKind::Pen);
        let t0 = Instant::now();
        session.pointer(PointerEvent::down(10.0, 10.0), t0);
        session.pointer(PointerEvent::up(10.0, 10.0), t0);
        session.pointer(PointerEvent::down(60.0, 10.0), t0 + Duration::from_secs(1));
        session.pointer(PointerEvent::up(60.0, 10.0), t0 + Duration::from_secs(1));
        session.pointer(PointerEvent::down(60.0, 10.0), t0 + Duration::from_millis(1200));
        assert_eq!(session.canvas().document().paths.len(), 1);
        assert!(!session.canvas().document().paths[0].closed);
    }

    #[test]
    fn test_keys_reach_canvas() {
        let mut session = session();
        assert_eq!(session.key(&KeyEvent::plain("2")), None);
        assert_eq!(session.canvas().current_tool(), ToolKind::Square);

        assert_eq!(session.key(&KeyEvent::new("s", Modifiers::ctrl())), Some(Command::Save));

        session.redraw().unwrap();
        assert_eq!(session.key(&KeyEvent::plain("g")), None);
        session.redraw_if_needed().unwrap();
        assert_eq!(
            session.renderer().last_grid,
            Some(crate::renderer::GridStyle::None)
        );
    }

    #[test]
    fn test_raster_session_export() {
        let mut canvas = Canvas::new(Settings::default());
        canvas.set_background(RasterImage::new(4, 4, [9, 9, 9, 255].repeat(16)));
        let mut session = Session::with_font(canvas, None);
        session.redraw().unwrap();
        assert!(session.renderer().frame().is_some());

        let exported = session.export(ExportFormat::Png, 1.0).unwrap();
        assert_eq!((exported.width, exported.height), (4, 4));
    }
}
