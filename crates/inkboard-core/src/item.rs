//! Drawn item model.

use crate::config::{CanvasConfig, clamp_width};
use crate::ids::ObjectId;
use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// The kind of shape an item draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Oval,
    /// Free-form stroke through every point.
    #[default]
    Line,
    /// Segment between the first two points.
    StraightLine,
}

impl ShapeKind {
    /// Stable numeric tag.
    pub fn tag(self) -> u32 {
        match self {
            ShapeKind::Rectangle => 0,
            ShapeKind::Oval => 1,
            ShapeKind::Line => 2,
            ShapeKind::StraightLine => 3,
        }
    }

    /// Inverse of [`tag`](Self::tag); `None` for unknown tags.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ShapeKind::Rectangle),
            1 => Some(ShapeKind::Oval),
            2 => Some(ShapeKind::Line),
            3 => Some(ShapeKind::StraightLine),
            _ => None,
        }
    }

    /// Shapes defined by two anchor points (corners or endpoints).
    pub fn is_anchored(self) -> bool {
        !matches!(self, ShapeKind::Line)
    }
}

/// One stroke or shape on the canvas.
///
/// The id is fixed at construction. Geometry and styling can change, but
/// only on a clone that then becomes the new half of a modify action; the
/// live copy inside the canvas is never mutated behind the log's back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnItem {
    /// Canvas-wide identity, never reused.
    id: ObjectId,
    /// How the points are interpreted when drawing and hit testing.
    pub shape: ShapeKind,
    pub color: SerializableColor,
    /// Always within `[0, MAX_STROKE_WIDTH]`, including when decoded.
    #[serde(deserialize_with = "deserialize_stroke_width")]
    stroke_width: f64,
    /// Stroke points, or the two anchors of a shape.
    segment_points: Vec<Point>,
}

fn deserialize_stroke_width<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let width = f64::deserialize(deserializer)?;
    Ok(clamp_width(width, CanvasConfig::MAX_STROKE_WIDTH))
}

impl Default for DrawnItem {
    fn default() -> Self {
        Self {
            id: ObjectId::default(),
            shape: ShapeKind::default(),
            color: SerializableColor::default(),
            stroke_width: CanvasConfig::DEFAULT_STROKE_WIDTH,
            segment_points: Vec::new(),
        }
    }
}

impl DrawnItem {
    /// Create an item with no points yet. The width is clamped into
    /// `[0, MAX_STROKE_WIDTH]`.
    pub fn new(id: ObjectId, shape: ShapeKind, color: SerializableColor, stroke_width: f64) -> Self {
        Self {
            id,
            shape,
            color,
            stroke_width: clamp_width(stroke_width, CanvasConfig::MAX_STROKE_WIDTH),
            segment_points: Vec::new(),
        }
    }

    /// Builder-style variant of [`set_points`](Self::set_points).
    pub fn with_points(mut self, points: impl IntoIterator<Item = Point>) -> Self {
        self.set_points(points);
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.stroke_width = clamp_width(width, CanvasConfig::MAX_STROKE_WIDTH);
    }

    /// Read-only view of the geometry.
    pub fn points(&self) -> &[Point] {
        &self.segment_points
    }

    pub fn push_point(&mut self, point: Point) {
        self.segment_points.push(point);
    }

    pub fn set_points(&mut self, points: impl IntoIterator<Item = Point>) {
        self.segment_points.clear();
        self.segment_points.extend(points);
    }

    /// Set the second anchor of a two-point shape, appending it if the item
    /// only has its origin so far. Used while dragging out a shape.
    pub fn set_end(&mut self, end: Point) {
        match self.segment_points.len() {
            0 => {}
            1 => self.segment_points.push(end),
            _ => self.segment_points[1] = end,
        }
    }

    /// The first two points, if present.
    pub fn anchors(&self) -> Option<(Point, Point)> {
        match self.segment_points.as_slice() {
            [start, end, ..] => Some((*start, *end)),
            _ => None,
        }
    }

    /// Shift every point by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.segment_points {
            *p += delta;
        }
    }

    /// Axis-aligned bounds of the geometry. Anchored shapes only count
    /// their first two points.
    pub fn bounds(&self) -> Option<Rect> {
        let points = if self.shape.is_anchored() {
            self.segment_points.get(..2)?
        } else {
            &self.segment_points[..]
        };
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)))
    }
}
