//! Page rasterization interface.
//!
//! Rendering PDF pages is delegated to a [`PageRasterSource`]. The loader
//! turns per-page failures into reports and keeps going.

use crate::cancel::CancelToken;
use crate::config::EditorConfig;
use kurbo::Size;
use thiserror::Error;

/// Rasterization errors.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Missing page: {0}")]
    MissingPage(usize),
    #[error("Page {page} needs {bytes} bytes, limit is {limit}")]
    TooLarge { page: usize, bytes: u64, limit: u64 },
    #[error("Rendering cancelled")]
    Cancelled,
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for rasterization.
pub type RasterResult<T> = Result<T, RasterError>;

/// An RGBA8 page bitmap, straight alpha, row-major without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PageBitmap {
    /// Wrap pixel data, checking the buffer length.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> RasterResult<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RasterError::Backend(format!(
                "bitmap buffer is {} bytes, expected {}",
                rgba.len(),
                expected
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// A blank white page.
    pub fn white(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![255; width as usize * height as usize * 4],
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

/// Renders the pages of an opened document.
pub trait PageRasterSource {
    fn page_count(&self) -> usize;

    /// Page size in PDF points.
    fn page_size(&self, index: usize) -> RasterResult<Size>;

    /// Render a page to exactly `width` x `height` pixels.
    fn render_page(&self, index: usize, width: u32, height: u32) -> RasterResult<PageBitmap>;
}

/// Outcome for one page during [`load_pages`].
#[derive(Debug)]
pub enum PageLoad {
    Rendered { index: usize, bitmap: PageBitmap },
    Skipped { index: usize, error: RasterError },
}

/// Pixel size a page renders at for the configured resolution.
pub fn target_size(page_size: Size, config: &EditorConfig) -> (u32, u32) {
    let scale = config.render_scale();
    let px = |points: f64| (points * scale).round().max(1.0) as u32;
    (px(page_size.width), px(page_size.height))
}

/// Render every page, reporting each result through `on_page`.
///
/// Pages that fail or exceed `max_page_bytes` are skipped. Returns the number
/// of rendered pages, or [`RasterError::Cancelled`] if `cancel` fires.
pub fn load_pages<S, F>(source: &S, config: &EditorConfig, cancel: &CancelToken, mut on_page: F) -> RasterResult<usize>
where
    S: PageRasterSource + ?Sized,
    F: FnMut(PageLoad),
{
    let count = source.page_count();
    let mut rendered = 0;

    for index in 0..count {
        if cancel.is_cancelled() {
            log::info!("Page loading cancelled after {} of {} pages", index, count);
            return Err(RasterError::Cancelled);
        }

        match render_one(source, index, config) {
            Ok(bitmap) => {
                rendered += 1;
                on_page(PageLoad::Rendered { index, bitmap });
            }
            Err(error) => {
                log::warn!("Skipping page {}: {}", index, error);
                on_page(PageLoad::Skipped { index, error });
            }
        }
    }

    Ok(rendered)
}

fn render_one<S>(source: &S, index: usize, config: &EditorConfig) -> RasterResult<PageBitmap>
where
    S: PageRasterSource + ?Sized,
{
    let (width, height) = target_size(source.page_size(index)?, config);
    let bytes = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .unwrap_or(u64::MAX);
    if bytes > config.max_page_bytes {
        return Err(RasterError::TooLarge {
            page: index,
            bytes,
            limit: config.max_page_bytes,
        });
    }
    let bitmap = source.render_page(index, width, height)?;
    if bitmap.width != width || bitmap.height != height {
        return Err(RasterError::Backend(format!(
            "page {} rendered at {}x{}, expected {}x{}",
            index, bitmap.width, bitmap.height, width, height
        )));
    }
    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        sizes: Vec<Size>,
        broken: Option<usize>,
    }

    impl PageRasterSource for FakeSource {
        fn page_count(&self) -> usize {
            self.sizes.len()
        }

        fn page_size(&self, index: usize) -> RasterResult<Size> {
            self.sizes.get(index).copied().ok_or(RasterError::MissingPage(index))
        }

        fn render_page(&self, index: usize, width: u32, height: u32) -> RasterResult<PageBitmap> {
            if self.broken == Some(index) {
                return Err(RasterError::Backend("corrupt page".to_string()));
            }
            Ok(PageBitmap::white(width, height))
        }
    }

    fn config() -> EditorConfig {
        EditorConfig {
            render_dpi: 144.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_target_size_uses_dpi() {
        assert_eq!(target_size(Size::new(612.0, 792.0), &config()), (1224, 1584));
    }

    #[test]
    fn test_failed_page_is_skipped() {
        let source = FakeSource {
            sizes: vec![Size::new(100.0, 100.0); 3],
            broken: Some(1),
        };
        let mut loaded = Vec::new();
        let rendered = load_pages(&source, &config(), &CancelToken::new(), |page| loaded.push(page)).unwrap();

        assert_eq!(rendered, 2);
        assert!(matches!(loaded[0], PageLoad::Rendered { index: 0, .. }));
        assert!(matches!(loaded[1], PageLoad::Skipped { index: 1, .. }));
        assert!(matches!(loaded[2], PageLoad::Rendered { index: 2, .. }));
    }

    #[test]
    fn test_oversize_page_is_skipped() {
        let source = FakeSource {
            sizes: vec![Size::new(100.0, 100.0), Size::new(100_000.0, 100_000.0)],
            broken: None,
        };
        let mut skipped = Vec::new();
        load_pages(&source, &config(), &CancelToken::new(), |page| {
            if let PageLoad::Skipped { error, .. } = page {
                skipped.push(error);
            }
        })
        .unwrap();

        assert_eq!(skipped.len(), 1);
        assert!(matches!(skipped[0], RasterError::TooLarge { page: 1, .. }));
    }

    #[test]
    fn test_huge_page_is_skipped() {
        let source = FakeSource {
            sizes: vec![Size::new(1e12, 1e12), Size::new(10.0, 10.0)],
            broken: None,
        };
        let mut loaded = Vec::new();
        let rendered = load_pages(&source, &config(), &CancelToken::new(), |page| loaded.push(page)).unwrap();

        assert_eq!(rendered, 1);
        assert!(matches!(
            loaded[0],
            PageLoad::Skipped { index: 0, error: RasterError::TooLarge { bytes: u64::MAX, .. } }
        ));
        assert!(matches!(loaded[1], PageLoad::Rendered { index: 1, .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let source = FakeSource {
            sizes: vec![Size::new(10.0, 10.0)],
            broken: None,
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = load_pages(&source, &config(), &cancel, |_| panic!("no page expected"));
        assert!(matches!(result, Err(RasterError::Cancelled)));
    }

    #[test]
    fn test_bitmap_length_checked() {
        assert!(PageBitmap::new(2, 2, vec![0; 16]).is_ok());
        assert!(PageBitmap::new(2, 2, vec![0; 15]).is_err());
    }
}
