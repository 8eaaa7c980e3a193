//! Selection handles attached to overlay elements.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// The kind of handle - determines what manipulation it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Top-left corner: removes the element.
    Delete,
    /// Top-right corner: rotates about the element center.
    Rotate,
    /// Bottom-right corner: resizes from the top-left anchor.
    Resize,
    /// Bottom-left corner: opens the element's options.
    Menu,
}

impl HandleKind {
    /// Hit-test priority order when handle squares overlap.
    pub const ALL: [HandleKind; 4] = [HandleKind::Delete, HandleKind::Rotate, HandleKind::Resize, HandleKind::Menu];

    /// Corner of the element bounds the handle sits on.
    pub fn anchor(self, bounds: Rect) -> Point {
        match self {
            HandleKind::Delete => Point::new(bounds.x0, bounds.y0),
            HandleKind::Rotate => Point::new(bounds.x1, bounds.y0),
            HandleKind::Resize => Point::new(bounds.x1, bounds.y1),
            HandleKind::Menu => Point::new(bounds.x0, bounds.y1),
        }
    }
}

/// A handle square on a selected element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub kind: HandleKind,
    /// Hit rectangle in page-local coordinates.
    pub rect: Rect,
}

impl Handle {
    /// Build the handle square for `kind`, placed inside the corner of `bounds`.
    pub fn new(kind: HandleKind, bounds: Rect, size: f64) -> Self {
        let (x0, y0) = match kind {
            HandleKind::Delete => (bounds.x0, bounds.y0),
            HandleKind::Rotate => (bounds.x1 - size, bounds.y0),
            HandleKind::Resize => (bounds.x1 - size, bounds.y1 - size),
            HandleKind::Menu => (bounds.x0, bounds.y1 - size),
        };
        Self {
            kind,
            rect: Rect::new(x0, y0, x0 + size, y0 + size),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rect.contains(point)
    }

    /// Icon area inside the square.
    pub fn icon_rect(&self, inner_padding: f64) -> Rect {
        self.rect.inset(-inner_padding)
    }
}

/// Find the first handle containing `point`.
pub fn hit_test_handles(handles: &[Handle], point: Point) -> Option<HandleKind> {
    handles.iter().find(|h| h.contains(point)).map(|h| h.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_corners() {
        let bounds = Rect::new(100.0, 100.0, 300.0, 200.0);
        let delete = Handle::new(HandleKind::Delete, bounds, 24.0);
        let resize = Handle::new(HandleKind::Resize, bounds, 24.0);
        let rotate = Handle::new(HandleKind::Rotate, bounds, 24.0);
        let menu = Handle::new(HandleKind::Menu, bounds, 24.0);

        assert_eq!(delete.rect, Rect::new(100.0, 100.0, 124.0, 124.0));
        assert_eq!(resize.rect, Rect::new(276.0, 176.0, 300.0, 200.0));
        assert_eq!(rotate.rect, Rect::new(276.0, 100.0, 300.0, 124.0));
        assert_eq!(menu.rect, Rect::new(100.0, 176.0, 124.0, 200.0));
    }

    #[test]
    fn test_hit_test_handles() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let handles: Vec<Handle> = HandleKind::ALL.iter().map(|k| Handle::new(*k, bounds, 24.0)).collect();
        assert_eq!(hit_test_handles(&handles, Point::new(95.0, 95.0)), Some(HandleKind::Resize));
        assert_eq!(hit_test_handles(&handles, Point::new(5.0, 5.0)), Some(HandleKind::Delete));
        assert_eq!(hit_test_handles(&handles, Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn test_icon_rect_is_inset() {
        let handle = Handle::new(HandleKind::Delete, Rect::new(0.0, 0.0, 100.0, 100.0), 24.0);
        assert_eq!(handle.icon_rect(4.0), Rect::new(4.0, 4.0, 20.0, 20.0));
    }
}
