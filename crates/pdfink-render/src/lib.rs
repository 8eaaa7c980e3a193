//! PdfInk Render Library
//!
//! CPU rendering for PdfInk, built on tiny-skia: the live page view, export
//! flattening, and PDF output through lopdf.

mod element_raster;
pub mod export;
pub mod flatten;
pub mod pdf_writer;
mod renderer;
pub mod text;

pub use export::{ExportError, ExportHandle, ExportOutput, ExportProgress, ExportResult, ExportTask};
pub use flatten::ExportFlattener;
pub use pdf_writer::{LopdfWriter, PdfWriter};
pub use renderer::{PageRenderer, RenderError, RenderResult, bitmap_to_pixmap, new_pixmap, pixmap_to_bitmap};
pub use text::{PlaceholderTextRasterizer, TextRasterizer};
