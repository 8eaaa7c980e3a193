//! Overlay elements placed on top of a page.
//!
//! Every element shares one geometry (top-left position, size, rotation and a
//! handle padding) and carries a kind-specific payload in [`ElementKind`].

mod checkmark;
mod shape;
mod text;

pub use checkmark::CheckmarkElement;
pub use shape::{ShapeElement, ShapeKind};
pub use text::TextElement;

use crate::config::EditorConfig;
use crate::handles::{Handle, HandleKind, hit_test_handles};
use crate::signatures::SignatureBitmap;
use crate::style::PaintSpec;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an overlay element.
pub type ElementId = Uuid;

/// A placed signature image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureElement {
    /// Bitmap at the resolution it was supplied. Every render scales from this.
    pub original: SignatureBitmap,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Shape(ShapeElement),
    Text(TextElement),
    Checkmark(CheckmarkElement),
    Signature(SignatureElement),
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Shape(_) => "shape",
            ElementKind::Text(_) => "text",
            ElementKind::Checkmark(_) => "checkmark",
            ElementKind::Signature(_) => "signature",
        }
    }

    /// Handles shown while selected.
    pub fn handle_kinds(&self) -> &'static [HandleKind] {
        match self {
            ElementKind::Shape(_) => &[HandleKind::Delete, HandleKind::Rotate, HandleKind::Resize, HandleKind::Menu],
            ElementKind::Text(_) => &[HandleKind::Delete, HandleKind::Resize, HandleKind::Menu],
            ElementKind::Checkmark(_) | ElementKind::Signature(_) => {
                &[HandleKind::Delete, HandleKind::Rotate, HandleKind::Resize]
            }
        }
    }

    /// Smallest content edge in dp.
    fn min_content_dp(&self, config: &EditorConfig) -> f64 {
        match self {
            ElementKind::Shape(_) => config.min_shape_dp,
            ElementKind::Text(_) => config.min_text_dp,
            ElementKind::Checkmark(_) => config.min_checkmark_dp,
            ElementKind::Signature(_) => config.min_signature_dp,
        }
    }
}

/// Manipulation in progress on a selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Moving,
    Resizing,
    Rotating,
}

/// A positioned, sized, rotatable annotation on a page.
///
/// Coordinates are page-local (the unzoomed page view). The bounds include
/// the selection padding on every side, so content is drawn inside
/// [`OverlayElement::content_rect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayElement {
    pub(crate) id: ElementId,
    /// Top-left corner of the bounds.
    pub position: Point,
    pub size: Size,
    pub rotation_degrees: f64,
    /// Padding between bounds and content.
    pub padding: f64,
    /// Resize lower bound, padding included.
    pub min_size: Size,
    /// Edge of a handle square.
    pub handle_size: f64,
    pub kind: ElementKind,
    #[serde(skip)]
    pub(crate) selected: bool,
    #[serde(skip)]
    pub(crate) interaction: InteractionState,
}

impl OverlayElement {
    /// Create an element whose content of `content_size` is centered on `center`.
    pub fn new(kind: ElementKind, center: Point, content_size: Size, config: &EditorConfig) -> Self {
        let padding = config.selection_padding();
        let min_edge = config.px(kind.min_content_dp(config)) + 2.0 * padding;
        let min_size = Size::new(min_edge, min_edge);
        let size = Size::new(
            (content_size.width + 2.0 * padding).max(min_size.width),
            (content_size.height + 2.0 * padding).max(min_size.height),
        );
        Self {
            id: Uuid::new_v4(),
            position: Point::new(center.x - size.width / 2.0, center.y - size.height / 2.0),
            size,
            rotation_degrees: 0.0,
            padding,
            min_size,
            handle_size: config.handle_size(),
            kind,
            selected: false,
            interaction: InteractionState::Idle,
        }
    }

    /// A shape of the default size.
    pub fn shape(shape_kind: ShapeKind, paint: PaintSpec, center: Point, config: &EditorConfig) -> Self {
        let edge = config.px(config.default_shape_dp);
        Self::new(
            ElementKind::Shape(ShapeElement::new(shape_kind, paint)),
            center,
            Size::new(edge, edge),
            config,
        )
    }

    /// A text label sized for one line at the default font size.
    pub fn text(text: impl Into<String>, center: Point, config: &EditorConfig) -> Self {
        let element = TextElement::new(text, config);
        let content = element.preferred_size(config.px(config.default_text_width_dp));
        Self::new(ElementKind::Text(element), center, content, config)
    }

    /// A checkmark of the default size.
    pub fn checkmark(center: Point, config: &EditorConfig) -> Self {
        let edge = config.px(config.default_checkmark_dp);
        Self::new(
            ElementKind::Checkmark(CheckmarkElement::new(config.px(config.checkmark_inset_dp))),
            center,
            Size::new(edge, edge),
            config,
        )
    }

    /// A signature displayed at the configured fraction of its bitmap size.
    pub fn signature(original: SignatureBitmap, center: Point, config: &EditorConfig) -> Self {
        let scale = config.signature_insert_scale;
        let content = Size::new(original.width as f64 * scale, original.height as f64 * scale);
        Self::new(ElementKind::Signature(SignatureElement { original }), center, content, config)
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
        if !selected {
            self.interaction = InteractionState::Idle;
        }
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    pub fn begin_interaction(&mut self, state: InteractionState) {
        self.interaction = state;
    }

    pub fn end_interaction(&mut self) {
        self.interaction = InteractionState::Idle;
    }

    /// Axis-aligned bounds including padding.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Content area in page-local coordinates.
    pub fn content_rect(&self) -> Rect {
        self.bounds().inset(-self.padding)
    }

    /// Content area relative to the element's own top-left corner.
    pub fn local_content_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.size).inset(-self.padding)
    }

    /// Maps element-local coordinates to page-local ones, rotation included.
    pub fn local_transform(&self) -> Affine {
        let half = Vec2::new(self.size.width / 2.0, self.size.height / 2.0);
        Affine::translate(self.position.to_vec2())
            * Affine::translate(half)
            * Affine::rotate(self.rotation_degrees.to_radians())
            * Affine::translate(-half)
    }

    /// Body hit-test on the unrotated bounds.
    pub fn hit_test(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    /// Handle squares, empty unless selected.
    pub fn handles(&self) -> Vec<Handle> {
        if !self.selected {
            return Vec::new();
        }
        let bounds = self.bounds();
        self.kind
            .handle_kinds()
            .iter()
            .map(|kind| Handle::new(*kind, bounds, self.handle_size))
            .collect()
    }

    /// Handle under `point`, if the element is selected.
    pub fn hit_test_handle(&self, point: Point) -> Option<HandleKind> {
        hit_test_handles(&self.handles(), point)
    }

    pub fn move_by(&mut self, delta: Vec2) {
        if delta.x.is_finite() && delta.y.is_finite() {
            self.position += delta;
        }
    }

    /// Set the size, clamped to the minimum footprint.
    pub fn resize_to(&mut self, width: f64, height: f64) {
        if !width.is_finite() || !height.is_finite() {
            return;
        }
        self.size = Size::new(width.max(self.min_size.width), height.max(self.min_size.height));
    }

    /// Resize so the bottom-right corner follows `point`.
    pub fn resize_toward(&mut self, point: Point) {
        self.resize_to(point.x - self.position.x, point.y - self.position.y);
    }

    pub fn rotate_to(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.rotation_degrees = degrees;
        }
    }

    /// Point the rotation at `point`, measured from the element center.
    pub fn rotate_toward(&mut self, point: Point) {
        let center = self.center();
        if point == center {
            return;
        }
        self.rotate_to((point.y - center.y).atan2(point.x - center.x).to_degrees());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::test_png;

    fn config() -> EditorConfig {
        EditorConfig::default()
    }

    #[test]
    fn test_new_element_is_centered() {
        let element = OverlayElement::shape(ShapeKind::Rectangle, PaintSpec::default(), Point::new(200.0, 200.0), &config());
        assert_eq!(element.size, Size::new(160.0, 160.0));
        assert_eq!(element.position, Point::new(120.0, 120.0));
        assert_eq!(element.content_rect(), Rect::new(150.0, 150.0, 250.0, 250.0));
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let mut element = OverlayElement::shape(ShapeKind::Circle, PaintSpec::default(), Point::new(0.0, 0.0), &config());
        element.resize_to(10.0, 500.0);
        assert_eq!(element.size, Size::new(110.0, 500.0));

        let mut text = OverlayElement::text("Hi", Point::new(0.0, 0.0), &config());
        text.resize_to(0.0, 0.0);
        assert_eq!(text.size, Size::new(70.0, 70.0));
    }

    #[test]
    fn test_resize_toward_pointer() {
        let mut element = OverlayElement::checkmark(Point::new(100.0, 100.0), &config());
        let origin = element.position;
        element.resize_toward(Point::new(origin.x + 150.0, origin.y + 130.0));
        assert_eq!(element.size, Size::new(150.0, 130.0));
        assert_eq!(element.position, origin);
    }

    #[test]
    fn test_rotate_from_center_angle() {
        let mut element = OverlayElement::checkmark(Point::new(100.0, 100.0), &config());
        element.rotate_toward(Point::new(100.0, 200.0));
        assert!((element.rotation_degrees - 90.0).abs() < 1e-9);
        element.rotate_toward(Point::new(0.0, 100.0));
        assert!((element.rotation_degrees - 180.0).abs() < 1e-9);
        // Pointer on the center leaves rotation alone.
        element.rotate_toward(Point::new(100.0, 100.0));
        assert!((element.rotation_degrees - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_handles_only_when_selected() {
        let mut element = OverlayElement::checkmark(Point::new(100.0, 100.0), &config());
        assert!(element.handles().is_empty());
        element.set_selected(true);
        assert_eq!(element.handles().len(), 3);
        let bounds = element.bounds();
        assert_eq!(element.hit_test_handle(Point::new(bounds.x1 - 2.0, bounds.y1 - 2.0)), Some(HandleKind::Resize));
        assert_eq!(element.hit_test_handle(Point::new(bounds.x0 + 2.0, bounds.y0 + 2.0)), Some(HandleKind::Delete));
        assert_eq!(element.hit_test_handle(element.center()), None);
    }

    #[test]
    fn test_text_has_no_rotate_handle() {
        let mut element = OverlayElement::text("label", Point::new(300.0, 300.0), &config());
        element.set_selected(true);
        let bounds = element.bounds();
        assert_eq!(element.hit_test_handle(Point::new(bounds.x1 - 2.0, bounds.y0 + 2.0)), None);
    }

    #[test]
    fn test_signature_inserted_at_half_size() {
        let bitmap = SignatureBitmap::from_png(&test_png(200, 100)).unwrap();
        let element = OverlayElement::signature(bitmap, Point::new(400.0, 300.0), &config());
        assert_eq!(element.local_content_rect().size(), Size::new(100.0, 50.0));
        assert_eq!(element.center(), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_local_transform_rotates_about_center() {
        let mut element = OverlayElement::checkmark(Point::new(100.0, 100.0), &config());
        element.rotate_to(180.0);
        let corner = element.local_transform() * Point::ZERO;
        let bounds = element.bounds();
        assert!((corner.x - bounds.x1).abs() < 1e-9);
        assert!((corner.y - bounds.y1).abs() < 1e-9);
    }

    #[test]
    fn test_move_by() {
        let mut element = OverlayElement::checkmark(Point::new(100.0, 100.0), &config());
        let before = element.position;
        element.move_by(Vec2::new(5.0, -3.0));
        assert_eq!(element.position, Point::new(before.x + 5.0, before.y - 3.0));
        element.move_by(Vec2::new(f64::NAN, 0.0));
        assert_eq!(element.position, Point::new(before.x + 5.0, before.y - 3.0));
    }
}
