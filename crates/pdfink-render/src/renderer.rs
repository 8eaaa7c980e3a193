//! CPU renderer built on tiny-skia.
//!
//! [`PageRenderer`] draws the live page view (raster, ink, elements and the
//! selected element's handles) and rasterizes single elements for export.

use crate::element_raster::draw_element;
use crate::text::{PlaceholderTextRasterizer, TextRasterizer};
use kurbo::{Affine, BezPath, PathEl, Rect, Size};
use pdfink_core::config::EditorConfig;
use pdfink_core::elements::OverlayElement;
use pdfink_core::handles::{Handle, HandleKind};
use pdfink_core::raster::PageBitmap;
use pdfink_core::scene::Page;
use pdfink_core::strokes::Stroke;
use pdfink_core::style::SerializableColor;
use thiserror::Error;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

const SELECTION_COLOR: SerializableColor = SerializableColor::new(33, 150, 243, 255);
const DELETE_COLOR: SerializableColor = SerializableColor::new(229, 57, 53, 255);

/// Allocate a transparent pixmap.
pub fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or(RenderError::Allocation { width, height })
}

/// Copy a straight-alpha bitmap into a premultiplied pixmap.
pub fn bitmap_to_pixmap(bitmap: &PageBitmap) -> RenderResult<Pixmap> {
    rgba_to_pixmap(bitmap.width, bitmap.height, &bitmap.rgba)
}

pub(crate) fn rgba_to_pixmap(width: u32, height: u32, rgba: &[u8]) -> RenderResult<Pixmap> {
    let mut pixmap = new_pixmap(width, height)?;
    if rgba.len() != pixmap.pixels().len() * 4 {
        return Err(RenderError::InvalidImage(format!(
            "{} bytes for a {}x{} image",
            rgba.len(),
            width,
            height
        )));
    }
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Ok(pixmap)
}

/// Copy a pixmap out as a straight-alpha bitmap.
pub fn pixmap_to_bitmap(pixmap: &Pixmap) -> PageBitmap {
    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    PageBitmap {
        width: pixmap.width(),
        height: pixmap.height(),
        rgba,
    }
}

pub(crate) fn skia_color(color: SerializableColor) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

pub(crate) fn solid_paint(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    paint
}

pub(crate) fn round_stroke(width: f64) -> tiny_skia::Stroke {
    tiny_skia::Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

pub(crate) fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

pub(crate) fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
}

/// Convert a kurbo path. Returns `None` for empty paths.
pub(crate) fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => builder.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

/// Draw one ink stroke. Single-sample strokes become a dot.
pub(crate) fn draw_stroke(pixmap: &mut Pixmap, stroke: &Stroke, transform: Transform) {
    let paint = solid_paint(stroke.paint.color);
    if stroke.points.len() == 1 {
        let p = stroke.points[0];
        if let Some(dot) = PathBuilder::from_circle(p.x as f32, p.y as f32, (stroke.paint.width / 2.0).max(0.5) as f32)
        {
            pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
        }
        return;
    }
    if let Some(path) = skia_path(&stroke.to_path()) {
        pixmap.stroke_path(&path, &paint, &round_stroke(stroke.paint.width), transform, None);
    }
}

/// Draws pages and elements with tiny-skia.
pub struct PageRenderer {
    text: Box<dyn TextRasterizer + Send + Sync>,
    handle_inner_padding: f64,
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl PageRenderer {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            text: Box::new(PlaceholderTextRasterizer),
            handle_inner_padding: config.px(config.handle_inner_padding_dp),
        }
    }

    /// Replace the glyph rasterizer used for text elements.
    pub fn with_text_rasterizer(mut self, text: Box<dyn TextRasterizer + Send + Sync>) -> Self {
        self.text = text;
        self
    }

    pub(crate) fn text_rasterizer(&self) -> &dyn TextRasterizer {
        self.text.as_ref()
    }

    /// Rasterize an element's unrotated bounds into a `width` x `height` bitmap.
    pub fn render_element(&self, element: &OverlayElement, width: u32, height: u32) -> RenderResult<Pixmap> {
        let mut pixmap = new_pixmap(width.max(1), height.max(1))?;
        let sx = width as f64 / element.size.width.max(f64::EPSILON);
        let sy = height as f64 / element.size.height.max(f64::EPSILON);
        draw_element(&mut pixmap, element, Affine::scale_non_uniform(sx, sy), self.text_rasterizer())?;
        Ok(pixmap)
    }

    /// Render the on-screen composite of a page into a view-sized bitmap.
    ///
    /// The raster is stretched to the view size, then everything is drawn
    /// through the page's viewport matrix. The stroke in progress is drawn
    /// over the committed ones.
    pub fn render_page_view(&self, raster: &PageBitmap, page: &Page) -> RenderResult<PageBitmap> {
        let viewport = &page.viewport;
        let view = viewport.view_size();
        let mut target = new_pixmap(view.width.round().max(1.0) as u32, view.height.round().max(1.0) as u32)?;
        target.fill(tiny_skia::Color::WHITE);

        let raster_pixmap = bitmap_to_pixmap(raster)?;
        let fit = fit_scale(raster.size(), view);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..Default::default()
        };
        target.draw_pixmap(
            0,
            0,
            raster_pixmap.as_ref(),
            &paint,
            skia_transform(viewport.matrix() * fit),
            None,
        );

        let page_transform = skia_transform(viewport.matrix());
        for stroke in page.strokes.visible_strokes() {
            draw_stroke(&mut target, stroke, page_transform);
        }

        for element in page.elements() {
            draw_element(
                &mut target,
                element,
                viewport.matrix() * element.local_transform(),
                self.text_rasterizer(),
            )?;
            if element.is_selected() {
                self.draw_selection(&mut target, element, viewport.matrix());
            }
        }

        Ok(pixmap_to_bitmap(&target))
    }

    fn draw_selection(&self, pixmap: &mut Pixmap, element: &OverlayElement, view: Affine) {
        let outline = Rect::from_origin_size(kurbo::Point::ZERO, element.size);
        if let Some(rect) = skia_rect(outline) {
            let path = PathBuilder::from_rect(rect);
            let mut stroke = round_stroke(1.5);
            stroke.dash = tiny_skia::StrokeDash::new(vec![6.0, 4.0], 0.0);
            pixmap.stroke_path(
                &path,
                &solid_paint(SELECTION_COLOR),
                &stroke,
                skia_transform(view * element.local_transform()),
                None,
            );
        }

        let transform = skia_transform(view);
        for handle in element.handles() {
            self.draw_handle(pixmap, &handle, transform);
        }
    }

    fn draw_handle(&self, pixmap: &mut Pixmap, handle: &Handle, transform: Transform) {
        let rect = handle.rect;
        let color = match handle.kind {
            HandleKind::Delete => DELETE_COLOR,
            _ => SELECTION_COLOR,
        };
        let center = rect.center();
        let radius = (rect.width().min(rect.height()) / 2.0) as f32;
        if let Some(disc) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius) {
            pixmap.fill_path(&disc, &solid_paint(color), FillRule::Winding, transform, None);
        }

        let icon = handle.icon_rect(self.handle_inner_padding);
        if icon.width() <= 0.0 || icon.height() <= 0.0 {
            return;
        }
        let mut glyph = BezPath::new();
        match handle.kind {
            HandleKind::Delete => {
                glyph.move_to((icon.x0, icon.y0));
                glyph.line_to((icon.x1, icon.y1));
                glyph.move_to((icon.x1, icon.y0));
                glyph.line_to((icon.x0, icon.y1));
            }
            HandleKind::Rotate => {
                glyph.move_to((icon.x0, icon.center().y));
                glyph.quad_to((icon.x0, icon.y0), (icon.center().x, icon.y0));
                glyph.line_to((icon.x1, icon.y0));
            }
            HandleKind::Resize => {
                glyph.move_to((icon.x0, icon.y0));
                glyph.line_to((icon.x1, icon.y1));
                glyph.line_to((icon.x1, icon.center().y));
            }
            HandleKind::Menu => {
                for y in [icon.y0, icon.center().y, icon.y1] {
                    glyph.move_to((icon.x0, y));
                    glyph.line_to((icon.x1, y));
                }
            }
        }
        if let Some(path) = skia_path(&glyph) {
            pixmap.stroke_path(
                &path,
                &solid_paint(SerializableColor::white()),
                &round_stroke(2.0),
                transform,
                None,
            );
        }
    }
}

/// Per-axis stretch from `from` to `to`.
pub(crate) fn fit_scale(from: Size, to: Size) -> Affine {
    let ratio = |to: f64, from: f64| if from > 0.0 { to / from } else { 1.0 };
    Affine::scale_non_uniform(ratio(to.width, from.width), ratio(to.height, from.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use pdfink_core::scene::SceneController;
    use pdfink_core::style::PaintSpec;

    fn pixel(bitmap: &PageBitmap, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * bitmap.width + x) * 4) as usize;
        [bitmap.rgba[i], bitmap.rgba[i + 1], bitmap.rgba[i + 2], bitmap.rgba[i + 3]]
    }

    #[test]
    fn test_pixmap_roundtrip_keeps_opaque_pixels() {
        let bitmap = PageBitmap::new(1, 2, vec![10, 20, 30, 255, 200, 100, 50, 255]).unwrap();
        let back = pixmap_to_bitmap(&bitmap_to_pixmap(&bitmap).unwrap());
        assert_eq!(back, bitmap);
    }

    #[test]
    fn test_wrong_buffer_is_invalid_image() {
        let result = rgba_to_pixmap(2, 2, &[0; 3]);
        assert!(matches!(result, Err(RenderError::InvalidImage(_))));
    }

    #[test]
    fn test_transform_matches_affine() {
        let affine = Affine::translate((10.0, 5.0)) * Affine::scale(2.0);
        let mut points = [tiny_skia::Point::from_xy(3.0, 4.0)];
        skia_transform(affine).map_points(&mut points);
        let point = points[0];
        let expected = affine * Point::new(3.0, 4.0);
        assert!((point.x as f64 - expected.x).abs() < 1e-4);
        assert!((point.y as f64 - expected.y).abs() < 1e-4);
    }

    #[test]
    fn test_page_view_is_view_sized_and_shows_ink() {
        let mut scene = SceneController::new(EditorConfig::default());
        let page = scene.add_page_with_view(Size::new(400.0, 400.0), Size::new(200.0, 200.0));
        let layer = &mut scene.page_mut(page).unwrap().strokes;
        layer.begin_stroke(Point::new(10.0, 100.0), PaintSpec::new(SerializableColor::black(), 6.0));
        layer.extend_stroke(Point::new(190.0, 100.0));
        layer.commit_stroke();

        let raster = PageBitmap::white(400, 400);
        let view = PageRenderer::default()
            .render_page_view(&raster, scene.page(page).unwrap())
            .unwrap();

        assert_eq!((view.width, view.height), (200, 200));
        assert!(pixel(&view, 100, 100)[0] < 64);
        assert_eq!(pixel(&view, 100, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn test_page_view_shows_stroke_in_progress() {
        let mut scene = SceneController::new(EditorConfig::default());
        let page = scene.add_page_with_view(Size::new(200.0, 200.0), Size::new(200.0, 200.0));
        let layer = &mut scene.page_mut(page).unwrap().strokes;
        layer.begin_stroke(Point::new(100.0, 10.0), PaintSpec::new(SerializableColor::black(), 6.0));
        layer.extend_stroke(Point::new(100.0, 190.0));

        let raster = PageBitmap::white(200, 200);
        let renderer = PageRenderer::default();
        let live = renderer.render_page_view(&raster, scene.page(page).unwrap()).unwrap();
        assert!(pixel(&live, 100, 100)[0] < 64);

        scene.page_mut(page).unwrap().strokes.discard_stroke();
        let cleared = renderer.render_page_view(&raster, scene.page(page).unwrap()).unwrap();
        assert_eq!(pixel(&cleared, 100, 100), [255, 255, 255, 255]);
    }

    #[test]
    fn test_page_view_follows_zoom() {
        let mut scene = SceneController::new(EditorConfig::default());
        let page = scene.add_page_with_view(Size::new(200.0, 200.0), Size::new(200.0, 200.0));
        let layer = &mut scene.page_mut(page).unwrap().strokes;
        layer.begin_stroke(Point::new(40.0, 10.0), PaintSpec::new(SerializableColor::black(), 4.0));
        layer.extend_stroke(Point::new(40.0, 190.0));
        layer.commit_stroke();
        scene.page_mut(page).unwrap().viewport.apply_scale(2.0, Point::ZERO);

        let raster = PageBitmap::white(200, 200);
        let view = PageRenderer::default()
            .render_page_view(&raster, scene.page(page).unwrap())
            .unwrap();
        assert!(pixel(&view, 80, 100)[0] < 64);
        assert_eq!(pixel(&view, 40, 100), [255, 255, 255, 255]);
    }
}
