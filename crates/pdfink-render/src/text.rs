//! Text glyph rasterization.

use crate::renderer::{skia_rect, solid_paint, skia_path};
use kurbo::{BezPath, Rect};
use pdfink_core::elements::TextElement;
use tiny_skia::{FillRule, PathBuilder, Pixmap, Transform};

/// Draws the glyphs of a text element into `area`.
///
/// `area` is in the coordinate space of `transform`. Backgrounds are filled by
/// the caller before this runs.
pub trait TextRasterizer {
    fn draw_text(&self, pixmap: &mut Pixmap, text: &TextElement, area: Rect, transform: Transform);
}

/// Block-glyph rasterizer used when no font backend is installed.
///
/// Each character becomes a box sized by its case, so layout and decorations
/// are visible without a font.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTextRasterizer;

const ADVANCE: f64 = 0.6;
const LINE_HEIGHT: f64 = 1.4;

impl TextRasterizer for PlaceholderTextRasterizer {
    fn draw_text(&self, pixmap: &mut Pixmap, text: &TextElement, area: Rect, transform: Transform) {
        let size = text.font_size;
        let advance = size * ADVANCE;
        let glyph_width = if text.bold { advance * 0.95 } else { advance * 0.8 };
        let paint = solid_paint(text.color);

        let mut glyphs = PathBuilder::new();
        let mut decorations = BezPath::new();
        let mut line_top = area.y0;

        for line in text.text.split('\n') {
            let baseline = line_top + size * 1.1;
            if baseline > area.y1 + size * 0.3 {
                break;
            }
            let mut x = area.x0;
            for ch in line.chars() {
                if x + glyph_width > area.x1 {
                    break;
                }
                if !ch.is_whitespace() {
                    let height = glyph_height(ch) * size;
                    if let Some(rect) = skia_rect(Rect::new(x, baseline - height, x + glyph_width, baseline)) {
                        glyphs.push_rect(rect);
                    }
                }
                x += advance;
            }

            let run_end = (x - (advance - glyph_width)).max(area.x0);
            if run_end > area.x0 {
                if text.underline {
                    let y = baseline + size * 0.12;
                    decorations.move_to((area.x0, y));
                    decorations.line_to((run_end, y));
                }
                if text.strike {
                    let y = baseline - size * 0.3;
                    decorations.move_to((area.x0, y));
                    decorations.line_to((run_end, y));
                }
            }
            line_top += size * LINE_HEIGHT;
        }

        if let Some(path) = glyphs.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
        if let Some(path) = skia_path(&decorations) {
            let stroke = tiny_skia::Stroke {
                width: (size * 0.07).max(1.0) as f32,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }
}

/// Box height as a fraction of the font size.
fn glyph_height(ch: char) -> f64 {
    if ch.is_uppercase() || ch.is_ascii_digit() {
        0.72
    } else if ch.is_lowercase() {
        0.5
    } else {
        0.6
    }
}
