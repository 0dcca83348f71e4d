//! Pan and zoom state of a canvas.

use trellis_core::geometry::{Bounds, Point, Size};

use crate::config::CanvasConfig;

/// Maps diagram coordinates to screen coordinates.
///
/// `screen = diagram * zoom + pan`. Zoom is always kept inside the limits the
/// viewport was created with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pan: Point,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
    screen: Size,
}

impl Viewport {
    /// Creates a viewport of `screen` size at the configured initial zoom.
    pub fn new(config: &CanvasConfig, screen: Size) -> Self {
        Self {
            pan: Point::default(),
            zoom: config.initial_zoom(),
            min_zoom: config.min_zoom(),
            max_zoom: config.max_zoom(),
            screen,
        }
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan.add_point(delta);
    }

    /// Sets the zoom factor, clamped to the configured range. Non-finite
    /// values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Multiplies the zoom by `factor` while keeping the diagram point under
    /// `screen_point` in place.
    pub fn zoom_about(&mut self, screen_point: Point, factor: f32) {
        let anchor = self.to_diagram(screen_point);
        self.set_zoom(self.zoom * factor);
        self.pan = screen_point.sub_point(anchor.scale(self.zoom));
    }

    pub fn resize(&mut self, screen: Size) {
        self.screen = screen;
    }

    pub fn to_diagram(&self, screen_point: Point) -> Point {
        screen_point.sub_point(self.pan).scale(1.0 / self.zoom)
    }

    pub fn to_screen(&self, diagram_point: Point) -> Point {
        diagram_point.scale(self.zoom).add_point(self.pan)
    }

    /// Part of the diagram currently on screen, in diagram coordinates.
    pub fn visible_region(&self) -> Bounds {
        let top_left = self.to_diagram(Point::default());
        let size = Size::new(
            self.screen.width() / self.zoom,
            self.screen.height() / self.zoom,
        );
        Bounds::new_from_top_left(top_left, size)
    }
}
