//! Geometric primitives for flowchart layout and connector routing.
//!
//! - [`Point`] - A 2D coordinate in diagram space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - An axis-aligned rectangle defined by its minimum and maximum corners
//! - [`Insets`] - Padding values for the four sides of a container
//! - [`Segment`] - A straight line between two points
//! - [`Polyline`] - An ordered chain of points used for connector paths
//!
//! # Coordinate System
//!
//! Trellis uses the SVG convention:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! Flow runs from top to bottom, so "downward" always means increasing `y`.

use serde::Deserialize;

/// Tolerance used when comparing coordinates produced by layout arithmetic.
pub const EPSILON: f32 = 1e-3;

/// A 2D point in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use trellis_core::geometry::Point;
/// let anchor = Point::new(40.0, 10.0);
/// let moved = anchor.add_point(Point::new(5.0, 5.0));
/// assert_eq!(moved.x(), 45.0);
/// assert_eq!(moved.y(), 15.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(self) -> f32 {
        self.x
    }

    pub fn y(self) -> f32 {
        self.y
    }

    pub fn add_point(self, other: Point) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub_point(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Multiplies both coordinates by `factor`.
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Returns true when both points coincide within [`EPSILON`].
    pub fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width and height of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn width(self) -> f32 {
        self.width
    }

    pub fn height(self) -> f32 {
        self.height
    }

    /// Component-wise maximum of two sizes
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// True when both dimensions are finite and not negative.
    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}

/// An axis-aligned rectangle.
///
/// Bounds are closed on every side; two rectangles that only share an edge
/// do not [overlap](Bounds::overlaps).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Creates bounds from a top-left corner and a size.
    ///
    /// ```
    /// # use trellis_core::geometry::{Bounds, Point, Size};
    /// let b = Bounds::new_from_top_left(Point::new(10.0, 20.0), Size::new(30.0, 40.0));
    /// assert_eq!(b.max_x(), 40.0);
    /// assert_eq!(b.max_y(), 60.0);
    /// ```
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    pub fn min_x(self) -> f32 {
        self.min_x
    }

    pub fn min_y(self) -> f32 {
        self.min_y
    }

    pub fn max_x(self) -> f32 {
        self.max_x
    }

    pub fn max_y(self) -> f32 {
        self.max_y
    }

    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns true if `point` lies inside or on the border of the rectangle.
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Returns true if the interiors of the two rectangles intersect.
    ///
    /// Rectangles that merely touch along an edge or a corner are not
    /// considered overlapping. Differences smaller than [`EPSILON`] are ignored.
    ///
    /// ```
    /// # use trellis_core::geometry::{Bounds, Point, Size};
    /// let a = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(10.0, 10.0));
    /// let b = Bounds::new_from_top_left(Point::new(10.0, 0.0), Size::new(10.0, 10.0));
    /// let c = Bounds::new_from_top_left(Point::new(5.0, 5.0), Size::new(10.0, 10.0));
    /// assert!(!a.overlaps(b));
    /// assert!(a.overlaps(c));
    /// ```
    pub fn overlaps(self, other: Bounds) -> bool {
        self.min_x < other.max_x - EPSILON
            && other.min_x < self.max_x - EPSILON
            && self.min_y < other.max_y - EPSILON
            && other.min_y < self.max_y - EPSILON
    }

    pub fn translate(&self, offset: Point) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }
}

/// Padding around the content of a container, one value per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Insets {
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl Insets {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same value on all four sides
    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn top(self) -> f32 {
        self.top
    }

    pub fn right(self) -> f32 {
        self.right
    }

    pub fn bottom(self) -> f32 {
        self.bottom
    }

    pub fn left(self) -> f32 {
        self.left
    }
}

/// A straight line between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    start: Point,
    end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn start(self) -> Point {
        self.start
    }

    pub fn end(self) -> Point {
        self.end
    }

    pub fn is_horizontal(self) -> bool {
        (self.start.y - self.end.y).abs() <= EPSILON
    }

    pub fn is_vertical(self) -> bool {
        (self.start.x - self.end.x).abs() <= EPSILON
    }

    /// Axis-aligned segments are the only ones a connector may contain.
    pub fn is_orthogonal(self) -> bool {
        self.is_horizontal() || self.is_vertical()
    }

    /// Returns true if an orthogonal segment passes through the open
    /// interior of `bounds`.
    ///
    /// Running along an edge of the rectangle does not count as crossing.
    /// Diagonal segments are tested against their bounding box.
    ///
    /// ```
    /// # use trellis_core::geometry::{Bounds, Point, Segment, Size};
    /// let node = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(10.0, 10.0));
    /// let through = Segment::new(Point::new(5.0, -5.0), Point::new(5.0, 15.0));
    /// let along = Segment::new(Point::new(10.0, -5.0), Point::new(10.0, 15.0));
    /// assert!(through.crosses_interior(node));
    /// assert!(!along.crosses_interior(node));
    /// ```
    pub fn crosses_interior(self, bounds: Bounds) -> bool {
        let (lo_x, hi_x) = min_max(self.start.x, self.end.x);
        let (lo_y, hi_y) = min_max(self.start.y, self.end.y);
        let inside_x = |x: f32| x > bounds.min_x + EPSILON && x < bounds.max_x - EPSILON;
        let inside_y = |y: f32| y > bounds.min_y + EPSILON && y < bounds.max_y - EPSILON;
        let spans_x = lo_x < bounds.max_x - EPSILON && hi_x > bounds.min_x + EPSILON;
        let spans_y = lo_y < bounds.max_y - EPSILON && hi_y > bounds.min_y + EPSILON;

        if self.is_horizontal() {
            inside_y(self.start.y) && spans_x
        } else if self.is_vertical() {
            inside_x(self.start.x) && spans_y
        } else {
            spans_x && spans_y
        }
    }
}

fn min_max(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// An ordered chain of points joined by straight segments.
///
/// Construction drops repeated points and merges consecutive collinear
/// segments, so the stored corners are exactly the bends of the path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    /// Builds a simplified polyline from raw waypoints.
    ///
    /// ```
    /// # use trellis_core::geometry::{Point, Polyline};
    /// let path = Polyline::new(vec![
    ///     Point::new(0.0, 0.0),
    ///     Point::new(0.0, 5.0),
    ///     Point::new(0.0, 10.0),
    ///     Point::new(0.0, 10.0),
    ///     Point::new(8.0, 10.0),
    /// ]);
    /// assert_eq!(path.points().len(), 3);
    /// ```
    pub fn new(points: Vec<Point>) -> Self {
        let mut simplified: Vec<Point> = Vec::with_capacity(points.len());
        'points: for point in points {
            loop {
                if simplified.last().is_some_and(|last| last.approx_eq(point)) {
                    continue 'points;
                }
                let n = simplified.len();
                if n < 2 {
                    break;
                }
                let (a, b) = (simplified[n - 2], simplified[n - 1]);
                let same_x = (a.x - b.x).abs() <= EPSILON && (b.x - point.x).abs() <= EPSILON;
                let same_y = (a.y - b.y).abs() <= EPSILON && (b.y - point.y).abs() <= EPSILON;
                if !(same_x || same_y) {
                    break;
                }
                simplified.pop();
            }
            simplified.push(point);
        }
        Self { points: simplified }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points.windows(2).map(|w| Segment::new(w[0], w[1]))
    }

    pub fn is_orthogonal(&self) -> bool {
        self.segments().all(Segment::is_orthogonal)
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite())
    }
}
