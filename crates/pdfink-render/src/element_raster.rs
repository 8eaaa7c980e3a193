//! Per-kind element drawing.
//!
//! Everything is drawn in element-local coordinates (origin at the top-left of
//! the padded bounds) through a caller-supplied transform.

use crate::renderer::{
    RenderError, RenderResult, rgba_to_pixmap, round_stroke, skia_path, skia_rect, skia_transform, solid_paint,
};
use crate::text::TextRasterizer;
use kurbo::Affine;
use pdfink_core::elements::{ElementKind, OverlayElement, SignatureElement};
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint};

/// Draw `element` through `transform` (element-local to pixmap pixels).
pub(crate) fn draw_element(
    pixmap: &mut Pixmap,
    element: &OverlayElement,
    transform: Affine,
    text: &dyn TextRasterizer,
) -> RenderResult<()> {
    let content = element.local_content_rect();
    if content.width() <= 0.0 || content.height() <= 0.0 {
        return Ok(());
    }
    let ts = skia_transform(transform);

    match &element.kind {
        ElementKind::Shape(shape) => {
            if let Some(path) = skia_path(&shape.outline(content)) {
                pixmap.stroke_path(
                    &path,
                    &solid_paint(shape.paint.color),
                    &round_stroke(shape.paint.width),
                    ts,
                    None,
                );
            }
        }
        ElementKind::Text(label) => {
            if let (Some(background), Some(rect)) = (label.background, skia_rect(content)) {
                pixmap.fill_rect(rect, &solid_paint(background), ts, None);
            }
            let area = content.inset(-label.text_padding);
            if area.width() > 0.0 && area.height() > 0.0 {
                text.draw_text(pixmap, label, area, ts);
            }
        }
        ElementKind::Checkmark(check) => {
            if let Some(path) = skia_path(&check.glyph_path(content)) {
                pixmap.stroke_path(
                    &path,
                    &solid_paint(check.color),
                    &round_stroke(check.glyph_stroke_width(content)),
                    ts,
                    None,
                );
            }
        }
        ElementKind::Signature(signature) => {
            let image = decode_signature(signature)?;
            let scale = Affine::translate(content.origin().to_vec2())
                * Affine::scale_non_uniform(
                    content.width() / image.width() as f64,
                    content.height() / image.height() as f64,
                );
            let paint = PixmapPaint {
                quality: FilterQuality::Bicubic,
                ..Default::default()
            };
            pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, skia_transform(transform * scale), None);
        }
    }
    Ok(())
}

/// Decode the original signature PNG. Scaling always starts from this.
fn decode_signature(signature: &SignatureElement) -> RenderResult<Pixmap> {
    let bytes = signature
        .original
        .data()
        .ok_or_else(|| RenderError::InvalidImage("signature data is not base64".to_string()))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| RenderError::InvalidImage(e.to_string()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    rgba_to_pixmap(width, height, image.as_raw())
}
