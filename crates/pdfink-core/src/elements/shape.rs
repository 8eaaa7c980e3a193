//! Outline shapes: rectangle, circle, line and arrow.

use crate::style::{PaintSpec, SerializableColor};
use kurbo::{BezPath, Circle, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};

/// Which outline a shape element draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Line,
    Arrow,
}

impl ShapeKind {
    /// Shape picker slot order.
    pub fn from_slot(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(ShapeKind::Rectangle),
            1 => Some(ShapeKind::Circle),
            2 => Some(ShapeKind::Line),
            3 => Some(ShapeKind::Arrow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeElement {
    pub shape_kind: ShapeKind,
    pub paint: PaintSpec,
}

impl ShapeElement {
    pub fn new(shape_kind: ShapeKind, paint: PaintSpec) -> Self {
        Self { shape_kind, paint }
    }

    pub fn set_stroke_color(&mut self, color: SerializableColor) {
        self.paint.color = color;
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.paint.width = width;
        }
    }

    /// Outline inside `content`, before rotation.
    pub fn outline(&self, content: Rect) -> BezPath {
        match self.shape_kind {
            ShapeKind::Rectangle => content.to_path(0.1),
            ShapeKind::Circle => {
                // Anchored at the top-left so it stays in place when only one axis grows.
                let radius = content.width().min(content.height()) / 2.0;
                Circle::new(Point::new(content.x0 + radius, content.y0 + radius), radius).to_path(0.1)
            }
            ShapeKind::Line => {
                let mut path = BezPath::new();
                path.move_to(Point::new(content.x0, content.y1));
                path.line_to(Point::new(content.x1, content.y0));
                path
            }
            ShapeKind::Arrow => {
                let start = Point::new(content.x0, content.y1);
                let tip = Point::new(content.x1, content.y0);
                let mut path = BezPath::new();
                path.move_to(start);
                path.line_to(tip);

                let direction = tip - start;
                let length = direction.hypot();
                if length > f64::EPSILON {
                    let back = direction / length;
                    let head = (length * 0.2).clamp(8.0, 40.0);
                    for angle in [0.5_f64, -0.5] {
                        let (sin, cos) = angle.sin_cos();
                        let wing = Vec2::new(back.x * cos - back.y * sin, back.x * sin + back.y * cos);
                        path.move_to(tip);
                        path.line_to(tip - wing * head);
                    }
                }
                path
            }
        }
    }
}
