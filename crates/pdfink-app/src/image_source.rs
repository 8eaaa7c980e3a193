//! Page rasters read from image files, one file per page.

use image::imageops::FilterType;
use kurbo::Size;
use pdfink_core::raster::{PageBitmap, PageRasterSource, RasterError, RasterResult};
use std::path::PathBuf;

/// A "document" whose pages are pre-rendered image files.
///
/// The pixel size of each file is taken to be its size at `render_dpi`, so
/// loading at the same resolution reproduces the file exactly.
pub struct ImageFileSource {
    pages: Vec<PathBuf>,
    render_dpi: f64,
}

impl ImageFileSource {
    pub fn new(pages: Vec<PathBuf>, render_dpi: f64) -> Self {
        Self { pages, render_dpi }
    }

    fn path(&self, index: usize) -> RasterResult<&PathBuf> {
        self.pages.get(index).ok_or(RasterError::MissingPage(index))
    }
}

impl PageRasterSource for ImageFileSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> RasterResult<Size> {
        let path = self.path(index)?;
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| RasterError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        let to_points = 72.0 / self.render_dpi;
        Ok(Size::new(width as f64 * to_points, height as f64 * to_points))
    }

    fn render_page(&self, index: usize, width: u32, height: u32) -> RasterResult<PageBitmap> {
        let path = self.path(index)?;
        let mut image = image::open(path)
            .map_err(|e| RasterError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        if image.width() != width || image.height() != height {
            log::debug!(
                "Resampling {} from {}x{} to {}x{}",
                path.display(),
                image.width(),
                image.height(),
                width,
                height
            );
            image = image.resize_exact(width, height, FilterType::Triangle);
        }
        PageBitmap::new(width, height, image.to_rgba8().into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfink_core::cancel::CancelToken;
    use pdfink_core::config::EditorConfig;
    use pdfink_core::raster::{PageLoad, load_pages};

    fn write_png(path: &std::path::Path, width: u32, height: u32) {
        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_page_size_in_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p1.png");
        write_png(&path, 288, 144);
        let source = ImageFileSource::new(vec![path], 144.0);
        let size = source.page_size(0).unwrap();
        assert!((size.width - 144.0).abs() < 1e-9);
        assert!((size.height - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_loads_at_native_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p1.png");
        write_png(&path, 30, 20);
        let source = ImageFileSource::new(vec![path, dir.path().join("missing.png")], 144.0);
        let config = EditorConfig {
            render_dpi: 144.0,
            ..Default::default()
        };

        let mut rendered = Vec::new();
        let mut skipped = Vec::new();
        load_pages(&source, &config, &CancelToken::new(), |page| match page {
            PageLoad::Rendered { bitmap, .. } => rendered.push(bitmap),
            PageLoad::Skipped { index, .. } => skipped.push(index),
        })
        .unwrap();

        assert_eq!(rendered.len(), 1);
        assert_eq!((rendered[0].width, rendered[0].height), (30, 20));
        assert_eq!(&rendered[0].rgba[..4], &[200, 10, 10, 255]);
        assert_eq!(skipped, vec![1]);
    }
}
