//! PdfInk Application
//!
//! Headless host: loads a saved annotation scene and its page images, then
//! flattens and exports them as a PDF.

pub mod cli;
pub mod image_source;

pub use cli::{AppError, AppResult, CliArgs, run};
pub use image_source::ImageFileSource;
