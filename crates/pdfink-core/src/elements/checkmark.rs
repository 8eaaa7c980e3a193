//! Checkmark tick glyph.

use crate::style::SerializableColor;
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckmarkElement {
    pub color: SerializableColor,
    /// Extra inset of the glyph inside the content area.
    pub inset: f64,
}

impl CheckmarkElement {
    pub fn new(inset: f64) -> Self {
        Self {
            color: SerializableColor::black(),
            inset,
        }
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.color = color;
    }

    /// Area the tick is fitted into.
    pub fn glyph_rect(&self, content: Rect) -> Rect {
        let inner = content.inset(-self.inset);
        if inner.width() <= 0.0 || inner.height() <= 0.0 {
            return Rect::from_center_size(content.center(), kurbo::Size::ZERO);
        }
        inner
    }

    /// Tick outline scaled into `content`.
    pub fn glyph_path(&self, content: Rect) -> BezPath {
        let rect = self.glyph_rect(content);
        let at = |fx: f64, fy: f64| Point::new(rect.x0 + rect.width() * fx, rect.y0 + rect.height() * fy);
        let mut path = BezPath::new();
        path.move_to(at(0.1, 0.55));
        path.line_to(at(0.38, 0.85));
        path.line_to(at(0.9, 0.15));
        path
    }

    /// Stroke width proportional to the glyph.
    pub fn glyph_stroke_width(&self, content: Rect) -> f64 {
        let rect = self.glyph_rect(content);
        (rect.width().min(rect.height()) * 0.12).max(1.0)
    }
}
