//! Interactive surface for a published diagram.
//!
//! A [`Canvas`] shows one immutable [`RoutedDiagram`] snapshot through a
//! [`Viewport`]. Drawing goes through a [`RenderBackend`], which is acquired
//! when the canvas is created and released when it is dropped.

mod viewport;

pub use viewport::Viewport;

use std::rc::Rc;

use log::{debug, trace};

use trellis_core::{
    geometry::{Point, Size},
    identifier::Id,
};

use crate::{
    config::{CanvasConfig, StyleConfig},
    error::TrellisError,
    export::{
        self,
        svg::{Svg, SvgBuilder},
    },
    routing::RoutedDiagram,
};

/// One frame handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub diagram: &'a RoutedDiagram,
    pub viewport: &'a Viewport,
}

/// A drawing target with an explicit lifetime.
pub trait RenderBackend {
    /// Prepares the backend for drawing. Called once, before any frame.
    ///
    /// # Errors
    ///
    /// Returns an [`export::Error`] if the target cannot be set up.
    fn acquire(&mut self) -> Result<(), export::Error>;

    /// Draws one frame.
    ///
    /// # Errors
    ///
    /// Returns an [`export::Error`] if drawing fails.
    fn present(&mut self, frame: Frame<'_>) -> Result<(), export::Error>;

    /// Frees whatever [`acquire`](Self::acquire) set up. Called exactly once
    /// when the canvas goes away.
    fn release(&mut self);
}

/// Draws diagrams through a [`RenderBackend`] with pan, zoom and
/// hit-testing.
#[derive(Debug)]
pub struct Canvas<B: RenderBackend> {
    backend: B,
    diagram: Rc<RoutedDiagram>,
    viewport: Viewport,
    last_drawn: Option<(Rc<RoutedDiagram>, Viewport)>,
}

impl<B: RenderBackend> Canvas<B> {
    /// Creates a canvas showing `diagram` and acquires `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Configuration`] for an invalid zoom range and
    /// [`TrellisError::Export`] if the backend cannot be acquired.
    pub fn new(
        diagram: Rc<RoutedDiagram>,
        mut backend: B,
        config: &CanvasConfig,
        screen: Size,
    ) -> Result<Self, TrellisError> {
        config.validate()?;
        backend.acquire()?;
        debug!(width = screen.width(), height = screen.height(); "Canvas backend acquired");
        Ok(Self {
            backend,
            diagram,
            viewport: Viewport::new(config, screen),
            last_drawn: None,
        })
    }

    pub fn diagram(&self) -> &Rc<RoutedDiagram> {
        &self.diagram
    }

    /// Replaces the shown snapshot. The next [`redraw`](Self::redraw) draws
    /// it unless it is the snapshot already on screen.
    pub fn set_diagram(&mut self, diagram: Rc<RoutedDiagram>) {
        self.diagram = diagram;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Id of the innermost node under `screen_point`, if any.
    pub fn hit_test(&self, screen_point: Point) -> Option<Id> {
        let point = self.viewport.to_diagram(screen_point);
        let hit = self
            .diagram
            .diagram()
            .nodes()
            .filter(|node| node.bounds().contains(point))
            .max_by_key(|node| node.depth())
            .map(|node| node.id());
        trace!(x = point.x(), y = point.y(), hit:?; "Hit test");
        hit
    }

    /// Presents a frame unless the same snapshot was already drawn with the
    /// same viewport. Returns whether a frame was presented.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Export`] if the backend fails to draw.
    pub fn redraw(&mut self) -> Result<bool, TrellisError> {
        if let Some((drawn, viewport)) = &self.last_drawn {
            if Rc::ptr_eq(drawn, &self.diagram) && *viewport == self.viewport {
                return Ok(false);
            }
        }
        self.backend.present(Frame {
            diagram: &self.diagram,
            viewport: &self.viewport,
        })?;
        self.last_drawn = Some((Rc::clone(&self.diagram), self.viewport));
        Ok(true)
    }
}

impl<B: RenderBackend> Drop for Canvas<B> {
    fn drop(&mut self) {
        self.backend.release();
        debug!("Canvas backend released");
    }
}

/// Backend that renders every frame to an SVG string kept in memory.
#[derive(Debug)]
pub struct SvgBackend {
    renderer: Svg,
    frames: Vec<String>,
    acquired: bool,
}

impl SvgBackend {
    /// # Errors
    ///
    /// Returns an [`export::Error`] if a style colour does not parse.
    pub fn new(style: &StyleConfig) -> Result<Self, export::Error> {
        Ok(Self {
            renderer: SvgBuilder::new().with_style(style).build()?,
            frames: Vec::new(),
            acquired: false,
        })
    }

    /// Frames presented so far, oldest first.
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }
}

impl RenderBackend for SvgBackend {
    fn acquire(&mut self) -> Result<(), export::Error> {
        if self.acquired {
            return Err(export::Error::Render("backend is already acquired".to_string()));
        }
        self.acquired = true;
        Ok(())
    }

    fn present(&mut self, frame: Frame<'_>) -> Result<(), export::Error> {
        if !self.acquired {
            return Err(export::Error::Render(
                "cannot present to a released backend".to_string(),
            ));
        }
        let document = self.renderer.render_region(
            frame.diagram,
            frame.viewport.visible_region(),
            frame.viewport.screen(),
        );
        self.frames.push(document.to_string());
        Ok(())
    }

    fn release(&mut self) {
        self.acquired = false;
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use trellis_core::syntax::{StatementKind, TreeBuilder};

    use super::*;
    use crate::{config::LayoutConfig, layout::Engine, routing::Router};

    /// Records lifecycle calls into a shared log.
    struct Recording {
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl RenderBackend for Recording {
        fn acquire(&mut self) -> Result<(), export::Error> {
            self.log.borrow_mut().push("acquire");
            Ok(())
        }

        fn present(&mut self, _frame: Frame<'_>) -> Result<(), export::Error> {
            self.log.borrow_mut().push("present");
            Ok(())
        }

        fn release(&mut self) {
            self.log.borrow_mut().push("release");
        }
    }

    fn diagram() -> Rc<RoutedDiagram> {
        let mut b = TreeBuilder::new();
        let s = b.statement("s", StatementKind::Expression, "work()");
        let body = b.block("body", vec![s]);
        let root = b.while_node("loop", "busy", body);
        let config = LayoutConfig::default();
        let positioned = Engine::new(config.clone())
            .unwrap()
            .layout(&b.finish(root))
            .unwrap();
        Rc::new(Router::new(&config).route(positioned).unwrap())
    }

    fn screen() -> Size {
        Size::new(400.0, 300.0)
    }

    #[test]
    fn test_backend_lifecycle() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let backend = Recording {
                log: Rc::clone(&log),
            };
            let mut canvas =
                Canvas::new(diagram(), backend, &CanvasConfig::default(), screen()).unwrap();
            assert!(canvas.redraw().unwrap());
        }
        assert_eq!(*log.borrow(), vec!["acquire", "present", "release"]);
    }

    #[test]
    fn test_redraw_is_idempotent() {
        let backend = SvgBackend::new(&StyleConfig::default()).unwrap();
        let mut canvas =
            Canvas::new(diagram(), backend, &CanvasConfig::default(), screen()).unwrap();

        assert!(canvas.redraw().unwrap());
        assert!(!canvas.redraw().unwrap());
        assert_eq!(canvas.backend().frames().len(), 1);

        canvas.viewport_mut().pan_by(Point::new(10.0, 0.0));
        assert!(canvas.redraw().unwrap());

        // an equal but separately published snapshot is a new frame
        canvas.set_diagram(Rc::new(canvas.diagram().as_ref().clone()));
        assert!(canvas.redraw().unwrap());
        assert_eq!(canvas.backend().frames().len(), 3);
    }

    #[test]
    fn test_hit_test_finds_deepest_node() {
        let backend = SvgBackend::new(&StyleConfig::default()).unwrap();
        let canvas = Canvas::new(diagram(), backend, &CanvasConfig::default(), screen()).unwrap();

        // body statement starts at (24, 68)
        assert_eq!(canvas.hit_test(Point::new(30.0, 80.0)), Some(Id::new("s")));
        assert_eq!(canvas.hit_test(Point::new(5.0, 5.0)), Some(Id::new("loop")));
        assert_eq!(canvas.hit_test(Point::new(-5.0, 5.0)), None);
    }

    #[test]
    fn test_hit_test_follows_viewport() {
        let backend = SvgBackend::new(&StyleConfig::default()).unwrap();
        let mut canvas =
            Canvas::new(diagram(), backend, &CanvasConfig::default(), screen()).unwrap();
        canvas.viewport_mut().set_zoom(2.0);
        canvas.viewport_mut().set_pan(Point::new(100.0, 0.0));

        // diagram (30, 80) is on screen at (160, 160)
        assert_eq!(canvas.hit_test(Point::new(160.0, 160.0)), Some(Id::new("s")));
        assert_eq!(canvas.hit_test(Point::new(50.0, 10.0)), None);
    }

    #[test]
    fn test_invalid_zoom_range_is_rejected() {
        let backend = SvgBackend::new(&StyleConfig::default()).unwrap();
        let config = CanvasConfig::new(2.0, 1.0, 1.5);
        assert!(matches!(
            Canvas::new(diagram(), backend, &config, screen()),
            Err(TrellisError::Configuration(_))
        ));
    }
}
