//! Flattening a scene snapshot into page rasters.
//!
//! Output pages keep the pixel size of their original raster. Strokes and
//! elements were captured in view pixels, so they are scaled per axis by
//! `raster / view` before compositing.

use crate::export::{ExportError, ExportResult};
use crate::renderer::{PageRenderer, RenderResult, bitmap_to_pixmap, draw_stroke, pixmap_to_bitmap, skia_transform};
use kurbo::{Affine, Vec2};
use pdfink_core::cancel::CancelToken;
use pdfink_core::raster::PageBitmap;
use pdfink_core::scene::{PageSnapshot, SceneSnapshot};
use tiny_skia::{FilterQuality, PixmapPaint};

/// Composites annotations onto page rasters.
#[derive(Default)]
pub struct ExportFlattener {
    renderer: PageRenderer,
}

impl ExportFlattener {
    pub fn new(renderer: PageRenderer) -> Self {
        Self { renderer }
    }

    /// Flatten one page. The result has exactly the raster's dimensions.
    pub fn flatten_page(&self, raster: &PageBitmap, page: &PageSnapshot) -> RenderResult<PageBitmap> {
        let mut target = bitmap_to_pixmap(raster)?;
        let ratio = view_ratio(raster, page);
        let to_raster = Affine::scale_non_uniform(ratio.x, ratio.y);

        let stroke_transform = skia_transform(to_raster);
        for stroke in &page.strokes {
            draw_stroke(&mut target, stroke, stroke_transform);
        }

        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..Default::default()
        };
        for element in &page.elements {
            let width = (element.size.width * ratio.x).ceil().max(1.0);
            let height = (element.size.height * ratio.y).ceil().max(1.0);
            let bitmap = self.renderer.render_element(element, width as u32, height as u32)?;

            // Bitmap pixels back to element-local units, then rotate and place.
            let placement = to_raster
                * element.local_transform()
                * Affine::scale_non_uniform(element.size.width / width, element.size.height / height);
            target.draw_pixmap(0, 0, bitmap.as_ref(), &paint, skia_transform(placement), None);
        }

        Ok(pixmap_to_bitmap(&target))
    }

    /// Flatten every page of `snapshot`. `rasters[i]` is the raster of
    /// `snapshot.pages[i]`.
    ///
    /// `progress` is called with `(page, total)` after each page.
    pub fn flatten<F>(
        &self,
        snapshot: &SceneSnapshot,
        rasters: &[PageBitmap],
        cancel: &CancelToken,
        mut progress: F,
    ) -> ExportResult<Vec<PageBitmap>>
    where
        F: FnMut(usize, usize),
    {
        let total = snapshot.pages.len();
        let mut out = Vec::with_capacity(total);
        for (i, page) in snapshot.pages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            let raster = rasters.get(i).ok_or(ExportError::MissingRaster(page.index))?;
            let flat = self
                .flatten_page(raster, page)
                .map_err(|source| ExportError::Render { page: page.index, source })?;
            out.push(flat);
            progress(i + 1, total);
        }
        Ok(out)
    }
}

/// Per-axis view to raster ratio, measured against the actual raster.
fn view_ratio(raster: &PageBitmap, page: &PageSnapshot) -> Vec2 {
    if page.raster_size != raster.size() {
        log::warn!(
            "Page {} raster is {}x{}, snapshot expected {}x{}",
            page.index,
            raster.width,
            raster.height,
            page.raster_size.width,
            page.raster_size.height
        );
    }
    let ratio = |raster: f64, view: f64| if view > 0.0 { raster / view } else { 1.0 };
    Vec2::new(
        ratio(raster.width as f64, page.view_size.width),
        ratio(raster.height as f64, page.view_size.height),
    )
}
