//! Per-page viewport transform for pan/zoom.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Default lower zoom bound (page fills the view).
pub const MIN_SCALE: f64 = 1.0;
/// Default upper zoom bound.
pub const MAX_SCALE: f64 = 5.0;

/// A page's view transform.
///
/// The matrix maps page-local coordinates (the unzoomed page view) to screen
/// coordinates. It is only ever a uniform scale followed by a translation, and
/// the scale is kept within `[min_scale, max_scale]` so the matrix stays
/// invertible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportTransform {
    matrix: Affine,
    /// Size of the page view on screen at scale 1.
    view_size: Size,
    min_scale: f64,
    max_scale: f64,
    /// Inverse of `matrix`, recomputed on demand after every change.
    #[serde(skip)]
    inverse: Cell<Option<Affine>>,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}

impl ViewportTransform {
    /// Create an identity transform for a view of the given size.
    pub fn new(view_size: Size) -> Self {
        Self::with_bounds(view_size, MIN_SCALE, MAX_SCALE)
    }

    /// Create an identity transform with custom zoom bounds.
    pub fn with_bounds(view_size: Size, min_scale: f64, max_scale: f64) -> Self {
        let min_scale = if min_scale.is_finite() && min_scale > 0.0 { min_scale } else { MIN_SCALE };
        let max_scale = if max_scale.is_finite() && max_scale >= min_scale { max_scale } else { min_scale.max(MAX_SCALE) };
        let mut viewport = Self {
            matrix: Affine::scale(min_scale),
            view_size,
            min_scale,
            max_scale,
            inverse: Cell::new(None),
        };
        viewport.fix_translation();
        viewport
    }

    /// The page-to-screen matrix.
    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    /// The six matrix components `[sx, ky, kx, sy, tx, ty]`.
    pub fn values(&self) -> [f64; 6] {
        self.matrix.as_coeffs()
    }

    /// Current uniform scale.
    pub fn scale(&self) -> f64 {
        self.matrix.as_coeffs()[0]
    }

    /// Current translation.
    pub fn translation(&self) -> Vec2 {
        self.matrix.translation()
    }

    pub fn view_size(&self) -> Size {
        self.view_size
    }

    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    /// Whether the page is zoomed in far enough to pan.
    pub fn is_zoomed(&self) -> bool {
        self.scale() > self.min_scale + 0.01
    }

    /// Update the on-screen size of the page view.
    pub fn set_view_size(&mut self, view_size: Size) {
        self.view_size = view_size;
        self.fix_translation();
    }

    /// Pan by a screen-space delta. Translation is clamped afterwards.
    pub fn apply_pan(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            return;
        }
        self.matrix = Affine::translate(delta) * self.matrix;
        self.fix_translation();
    }

    /// Scale by `factor` anchored at a screen-space focal point.
    ///
    /// The factor is reduced so the resulting scale stays within bounds.
    /// Returns `false` and leaves the transform unchanged when the factor is
    /// not a usable number.
    pub fn apply_scale(&mut self, factor: f64, focal: Point) -> bool {
        if !factor.is_finite() || factor <= 0.0 || !focal.x.is_finite() || !focal.y.is_finite() {
            log::debug!("Rejected viewport scale factor {}", factor);
            return false;
        }

        let current = self.scale();
        let mut factor = factor;
        if current * factor > self.max_scale {
            factor = self.max_scale / current;
        } else if current * factor < self.min_scale {
            factor = self.min_scale / current;
        }

        let focal = focal.to_vec2();
        self.matrix = Affine::translate(focal) * Affine::scale(factor) * Affine::translate(-focal) * self.matrix;
        self.fix_translation();
        true
    }

    /// Set an absolute scale so the page-space `anchor` lands on the screen
    /// point `focal`.
    ///
    /// The scale is clamped to bounds and translation is fixed once, after
    /// the whole update. Returns `false` and leaves the transform unchanged on
    /// non-finite input.
    pub fn set_scale_anchored(&mut self, scale: f64, anchor: Point, focal: Point) -> bool {
        let finite = [scale, anchor.x, anchor.y, focal.x, focal.y].iter().all(|v| v.is_finite());
        if !finite || scale <= 0.0 {
            log::debug!("Rejected anchored viewport scale {}", scale);
            return false;
        }
        let scale = scale.clamp(self.min_scale, self.max_scale);
        let offset = focal.to_vec2() - anchor.to_vec2() * scale;
        self.matrix = Affine::translate(offset) * Affine::scale(scale);
        self.fix_translation();
        true
    }

    /// Reset to the unzoomed transform.
    pub fn reset(&mut self) {
        self.matrix = Affine::scale(self.min_scale);
        self.fix_translation();
    }

    /// Map a screen point into page-local space.
    pub fn to_page_space(&self, screen_point: Point) -> Point {
        self.inverse() * screen_point
    }

    /// Map a page-local point onto the screen.
    pub fn to_screen_space(&self, page_point: Point) -> Point {
        self.matrix * page_point
    }

    /// Map a screen-space length into page-local space.
    pub fn to_page_length(&self, length: f64) -> f64 {
        length / self.scale()
    }

    /// The screen-to-page matrix, computed lazily after each change.
    pub fn inverse(&self) -> Affine {
        if let Some(inverse) = self.inverse.get() {
            return inverse;
        }
        let inverse = self.matrix.inverse();
        self.inverse.set(Some(inverse));
        inverse
    }

    /// Clamp translation so content never leaves a gap at a view edge, and
    /// center content that is smaller than the view.
    fn fix_translation(&mut self) {
        let scale = self.scale();
        let offset = self.translation();
        let content = Size::new(self.view_size.width * scale, self.view_size.height * scale);
        let tx = fix_axis(offset.x, self.view_size.width, content.width);
        let ty = fix_axis(offset.y, self.view_size.height, content.height);
        self.matrix = self.matrix.with_translation(Vec2::new(tx, ty));
        self.inverse.set(None);
    }
}

fn fix_axis(offset: f64, view: f64, content: f64) -> f64 {
    if content <= view {
        (view - content) / 2.0
    } else {
        offset.clamp(view - content, 0.0)
    }
}
