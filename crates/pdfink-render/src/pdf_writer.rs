//! PDF output for flattened pages.

use crate::export::{ExportError, ExportResult};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, Stream, dictionary};
use pdfink_core::raster::PageBitmap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes flattened page rasters to a PDF file.
pub trait PdfWriter: Send {
    /// Write one page per bitmap to `path` and return the written path.
    fn write(&self, pages: &[PageBitmap], path: &Path) -> ExportResult<PathBuf>;
}

/// [`PdfWriter`] backed by lopdf. Each page is a single full-page image.
#[derive(Debug, Clone, Copy)]
pub struct LopdfWriter {
    /// Resolution the rasters were rendered at.
    pub render_dpi: f64,
}

impl Default for LopdfWriter {
    fn default() -> Self {
        Self { render_dpi: 72.0 }
    }
}

impl LopdfWriter {
    pub fn new(render_dpi: f64) -> Self {
        Self { render_dpi }
    }

    /// Page edge in points for a raster edge in pixels.
    fn points(&self, px: u32) -> f32 {
        let dpi = if self.render_dpi > 0.0 { self.render_dpi } else { 72.0 };
        (px as f64 * 72.0 / dpi) as f32
    }

    fn build(&self, pages: &[PageBitmap]) -> ExportResult<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

        for page in pages {
            let image_stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => page.width as i64,
                    "Height" => page.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                deflate(&rgb_on_white(page))?,
            );
            let image_id = doc.add_object(image_stream);

            let (width, height) = (self.points(page.width), self.points(page.height));
            let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", width, height);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im0" => image_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Ok(doc)
    }
}

impl PdfWriter for LopdfWriter {
    fn write(&self, pages: &[PageBitmap], path: &Path) -> ExportResult<PathBuf> {
        if pages.is_empty() {
            return Err(ExportError::Write("no pages to write".to_string()));
        }
        let mut doc = self.build(pages)?;
        doc.save(path)?;
        log::info!("Wrote {} pages to {}", pages.len(), path.display());
        Ok(path.to_path_buf())
    }
}

/// Drop alpha by compositing over white.
fn rgb_on_white(page: &PageBitmap) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(page.rgba.len() / 4 * 3);
    for px in page.rgba.chunks_exact(4) {
        let alpha = px[3] as u32;
        for &channel in &px[..3] {
            rgb.push(((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8);
        }
    }
    rgb
}

fn deflate(data: &[u8]) -> ExportResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
