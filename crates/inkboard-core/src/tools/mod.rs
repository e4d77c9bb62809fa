//! Pen, eraser and shape settings used when starting a new stroke.

use crate::config::CanvasConfig;
use crate::ids::{IdAllocator, ObjectId};
use crate::item::{DrawnItem, SerializableColor, ShapeKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// What a pointer gesture does on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DrawMode {
    #[default]
    Pen,
    Eraser,
    Shape,
    CanvasDrag,
    Selection,
}

impl DrawMode {
    /// Modes whose gestures create new items.
    pub fn draws(self) -> bool {
        matches!(self, DrawMode::Pen | DrawMode::Shape)
    }

    /// Modes whose gestures hit-test existing items.
    pub fn picks(self) -> bool {
        matches!(self, DrawMode::Eraser | DrawMode::Selection)
    }
}

/// Current drawing configuration. Never part of the undo history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawInfo {
    pub draw_mode: DrawMode,
    /// Shape used in [`DrawMode::Shape`].
    pub shape: ShapeKind,
    pub color: SerializableColor,
    stroke_width: f64,
}

impl Default for DrawInfo {
    fn default() -> Self {
        Self {
            draw_mode: DrawMode::default(),
            shape: ShapeKind::default(),
            color: SerializableColor::black(),
            stroke_width: CanvasConfig::DEFAULT_STROKE_WIDTH,
        }
    }
}

impl DrawInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    /// Set the width, clamped to the configured maximum.
    pub fn set_stroke_width(&mut self, width: f64, config: &CanvasConfig) {
        self.stroke_width = config.clamp_stroke_width(width);
    }

    /// The shape a new stroke gets in the current mode, if the mode draws.
    pub fn stroke_shape(&self) -> Option<ShapeKind> {
        match self.draw_mode {
            DrawMode::Pen => Some(ShapeKind::Line),
            DrawMode::Shape => Some(self.shape),
            _ => None,
        }
    }

    /// Start a stroke at `origin` with an already allocated id.
    pub fn begin(&self, id: ObjectId, origin: Point) -> Option<DrawnItem> {
        let shape = self.stroke_shape()?;
        Some(DrawnItem::new(id, shape, self.color, self.stroke_width).with_points([origin]))
    }

    /// Start a stroke, allocating its id only if the mode actually draws.
    pub fn begin_with(&self, allocator: &IdAllocator, user_id: i64, origin: Point) -> Option<DrawnItem> {
        self.stroke_shape()?;
        self.begin(allocator.allocate(user_id), origin)
    }
}

/// Feed the next pointer position into a stroke in progress. Free-form
/// lines collect every point; anchored shapes move their second anchor.
pub fn extend_stroke(item: &mut DrawnItem, point: Point) {
    if item.shape.is_anchored() {
        item.set_end(point);
    } else {
        item.push_point(point);
    }
}
