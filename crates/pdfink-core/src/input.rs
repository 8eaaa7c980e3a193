//! Multi-pointer touch input.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Identifier the host assigns to a touching pointer for the length of its contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerId(pub u32);

/// Pointer event in screen coordinates of the page view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { id: PointerId, position: Point },
    Move { id: PointerId, position: Point },
    Up { id: PointerId, position: Point },
    /// The host took the gesture away (scroll container intercept, window loss).
    Cancel,
}

impl PointerEvent {
    /// Pointer this event belongs to, if any.
    pub fn id(&self) -> Option<PointerId> {
        match self {
            PointerEvent::Down { id, .. } | PointerEvent::Move { id, .. } | PointerEvent::Up { id, .. } => Some(*id),
            PointerEvent::Cancel => None,
        }
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position, .. }
            | PointerEvent::Up { position, .. } => Some(*position),
            PointerEvent::Cancel => None,
        }
    }
}

/// Positions of the pointers currently touching a page, in press order.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    pointers: Vec<(PointerId, Point)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new contact. A repeated id updates the existing entry.
    pub fn press(&mut self, id: PointerId, position: Point) {
        if !self.update(id, position) {
            self.pointers.push((id, position));
        }
    }

    /// Move a known pointer. Returns `false` for unknown ids.
    pub fn update(&mut self, id: PointerId, position: Point) -> bool {
        match self.pointers.iter_mut().find(|(p, _)| *p == id) {
            Some(entry) => {
                entry.1 = position;
                true
            }
            None => false,
        }
    }

    /// Drop a contact. Returns `false` for unknown ids.
    pub fn release(&mut self, id: PointerId) -> bool {
        let before = self.pointers.len();
        self.pointers.retain(|(p, _)| *p != id);
        self.pointers.len() != before
    }

    pub fn clear(&mut self) {
        self.pointers.clear();
    }

    pub fn contains(&self, id: PointerId) -> bool {
        self.pointers.iter().any(|(p, _)| *p == id)
    }

    pub fn count(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn position(&self, id: PointerId) -> Option<Point> {
        self.pointers.iter().find(|(p, _)| *p == id).map(|(_, pos)| *pos)
    }

    /// Id of the earliest pointer still down.
    pub fn primary(&self) -> Option<PointerId> {
        self.pointers.first().map(|(id, _)| *id)
    }

    /// Midpoint of the first two pointers.
    pub fn focal_point(&self) -> Option<Point> {
        match self.pointers.as_slice() {
            [(_, a), (_, b), ..] => Some(a.midpoint(*b)),
            _ => None,
        }
    }

    /// Distance between the first two pointers.
    pub fn span(&self) -> Option<f64> {
        match self.pointers.as_slice() {
            [(_, a), (_, b), ..] => Some(a.distance(*b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut tracker = PointerTracker::new();
        tracker.press(PointerId(1), Point::new(0.0, 0.0));
        tracker.press(PointerId(2), Point::new(10.0, 0.0));
        assert_eq!(tracker.count(), 2);
        assert_eq!(tracker.primary(), Some(PointerId(1)));

        assert!(tracker.release(PointerId(1)));
        assert!(!tracker.release(PointerId(1)));
        assert_eq!(tracker.primary(), Some(PointerId(2)));
    }

    #[test]
    fn test_focal_point_and_span() {
        let mut tracker = PointerTracker::new();
        tracker.press(PointerId(7), Point::new(100.0, 150.0));
        assert!(tracker.span().is_none());
        tracker.press(PointerId(9), Point::new(200.0, 150.0));

        assert_eq!(tracker.focal_point(), Some(Point::new(150.0, 150.0)));
        assert!((tracker.span().unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_unknown_pointer() {
        let mut tracker = PointerTracker::new();
        assert!(!tracker.update(PointerId(3), Point::new(1.0, 1.0)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_repeated_press_does_not_duplicate() {
        let mut tracker = PointerTracker::new();
        tracker.press(PointerId(1), Point::new(0.0, 0.0));
        tracker.press(PointerId(1), Point::new(5.0, 5.0));
        assert_eq!(tracker.count(), 1);
        assert_eq!(tracker.position(PointerId(1)), Some(Point::new(5.0, 5.0)));
    }
}
