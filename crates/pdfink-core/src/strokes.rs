//! Freehand ink layer with undo/redo.

use crate::style::PaintSpec;
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// A freehand stroke in page-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Raw samples in capture order.
    pub points: Vec<Point>,
    pub paint: PaintSpec,
}

impl Stroke {
    pub fn new(start: Point, paint: PaintSpec) -> Self {
        Self {
            points: vec![start],
            paint,
        }
    }

    /// Smoothed outline: a quadratic segment per sample whose control point is
    /// the previous sample and whose end is the midpoint of the two.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(&first) = self.points.first() else {
            return path;
        };
        path.move_to(first);
        let mut last = first;
        for &point in &self.points[1..] {
            path.quad_to(last, last.midpoint(point));
            last = point;
        }
        if self.points.len() > 1 {
            path.line_to(last);
        }
        path
    }

    /// Bounds of the samples grown by half the stroke width.
    pub fn bounds(&self) -> Rect {
        let Some(&first) = self.points.first() else {
            return Rect::ZERO;
        };
        let rect = self
            .points
            .iter()
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p));
        rect.inflate(self.paint.width / 2.0, self.paint.width / 2.0)
    }
}

/// Per-page ink surface.
///
/// Holds committed strokes, the stroke in progress, and a redo buffer that
/// is invalidated whenever a new stroke begins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrokeLayer {
    committed: Vec<Stroke>,
    redo_stack: Vec<Stroke>,
    #[serde(skip)]
    active: Option<Stroke>,
}

impl StrokeLayer {
    /// Start a stroke at a page-local point. Clears redo history.
    pub fn begin_stroke(&mut self, point: Point, paint: PaintSpec) {
        self.redo_stack.clear();
        self.active = Some(Stroke::new(point, paint));
    }

    /// Append a sample to the stroke in progress.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        match self.active.as_mut() {
            Some(stroke) => {
                stroke.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Commit the stroke in progress. Returns `false` when nothing was drawing.
    pub fn commit_stroke(&mut self) -> bool {
        match self.active.take() {
            Some(stroke) => {
                self.committed.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Drop the stroke in progress without committing it.
    pub fn discard_stroke(&mut self) {
        self.active = None;
    }

    /// Move the last committed stroke to the redo buffer.
    pub fn undo(&mut self) -> bool {
        match self.committed.pop() {
            Some(stroke) => {
                self.redo_stack.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Restore the most recently undone stroke.
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(stroke) => {
                self.committed.push(stroke);
                true
            }
            None => false,
        }
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.committed
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    /// Committed strokes followed by the stroke in progress, in paint order.
    pub fn visible_strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.committed.iter().chain(self.active.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    fn draw(layer: &mut StrokeLayer, points: &[Point]) {
        layer.begin_stroke(points[0], PaintSpec::default());
        for p in &points[1..] {
            layer.extend_stroke(*p);
        }
        layer.commit_stroke();
    }

    #[test]
    fn test_single_stroke_undo_redo() {
        let mut layer = StrokeLayer::default();
        draw(&mut layer, &[Point::new(10.0, 10.0), Point::new(30.0, 10.0), Point::new(50.0, 10.0)]);

        assert_eq!(layer.strokes().len(), 1);
        let stroke = layer.strokes()[0].clone();
        let bounds = stroke.bounds();
        assert!((bounds.x0 - 9.5).abs() < f64::EPSILON);
        assert!((bounds.x1 - 50.5).abs() < f64::EPSILON);

        assert!(layer.undo());
        assert!(layer.strokes().is_empty());
        assert!(layer.redo());
        assert_eq!(layer.strokes(), &[stroke]);
    }

    #[test]
    fn test_new_stroke_clears_redo() {
        let mut layer = StrokeLayer::default();
        draw(&mut layer, &[Point::new(0.0, 0.0), Point::new(5.0, 5.0)]);
        layer.undo();
        assert!(layer.can_redo());

        draw(&mut layer, &[Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
        assert!(!layer.redo());
        assert_eq!(layer.strokes().len(), 1);
    }

    #[test]
    fn test_undo_redo_on_empty_are_noops() {
        let mut layer = StrokeLayer::default();
        assert!(!layer.undo());
        assert!(!layer.redo());
        assert!(!layer.commit_stroke());
        assert!(!layer.extend_stroke(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_path_uses_midpoint_quads() {
        let stroke = Stroke {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 10.0)],
            paint: PaintSpec::default(),
        };
        let elements: Vec<PathEl> = stroke.to_path().elements().to_vec();
        assert_eq!(elements[0], PathEl::MoveTo(Point::new(0.0, 0.0)));
        assert_eq!(elements[1], PathEl::QuadTo(Point::new(0.0, 0.0), Point::new(5.0, 0.0)));
        assert_eq!(elements[2], PathEl::QuadTo(Point::new(10.0, 0.0), Point::new(15.0, 5.0)));
        assert_eq!(elements[3], PathEl::LineTo(Point::new(20.0, 10.0)));
    }

    #[test]
    fn test_active_stroke_is_visible_until_committed() {
        let mut layer = StrokeLayer::default();
        layer.begin_stroke(Point::new(1.0, 1.0), PaintSpec::default());
        assert!(layer.is_drawing());
        assert_eq!(layer.visible_strokes().count(), 1);
        assert!(layer.strokes().is_empty());
        layer.discard_stroke();
        assert_eq!(layer.visible_strokes().count(), 0);
    }
}
