//! Editor configuration.
//!
//! All distances are stored in density-independent units (dp) and converted
//! to pixels with [`EditorConfig::px`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunable constants for the annotation editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Pixels per dp on the host display.
    pub density: f64,
    /// Lower bound of the page zoom.
    pub min_scale: f64,
    /// Upper bound of the page zoom.
    pub max_scale: f64,
    /// Single-pointer movement needed before a zoomed page starts panning.
    pub pan_threshold_dp: f64,
    /// Padding reserved around element content for the handles.
    pub selection_padding_dp: f64,
    /// Edge length of a handle square.
    pub handle_size_dp: f64,
    /// Inset of the handle icon inside its square.
    pub handle_inner_padding_dp: f64,
    pub min_shape_dp: f64,
    pub min_checkmark_dp: f64,
    pub min_text_dp: f64,
    pub min_signature_dp: f64,
    /// Extra inset of the tick glyph inside a checkmark.
    pub checkmark_inset_dp: f64,
    /// Padding between a text element's edge and its glyphs.
    pub text_padding_dp: f64,
    pub min_text_size: f64,
    pub max_text_size: f64,
    pub text_size_increment: f64,
    pub default_text_size: f64,
    /// Display size of a freshly inserted signature relative to its bitmap.
    pub signature_insert_scale: f64,
    /// Content size of a freshly inserted shape.
    pub default_shape_dp: f64,
    /// Content size of a freshly inserted checkmark.
    pub default_checkmark_dp: f64,
    /// Content width of a freshly inserted text element.
    pub default_text_width_dp: f64,
    /// Largest page bitmap in bytes that will be allocated.
    pub max_page_bytes: u64,
    /// Resolution pages are rasterized at (72 means one pixel per point).
    pub render_dpi: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            min_scale: 1.0,
            max_scale: 5.0,
            pan_threshold_dp: 8.0,
            selection_padding_dp: 30.0,
            handle_size_dp: 24.0,
            handle_inner_padding_dp: 4.0,
            min_shape_dp: 50.0,
            min_checkmark_dp: 20.0,
            min_text_dp: 10.0,
            min_signature_dp: 20.0,
            checkmark_inset_dp: 8.0,
            text_padding_dp: 10.0,
            min_text_size: 8.0,
            max_text_size: 72.0,
            text_size_increment: 2.0,
            default_text_size: 16.0,
            signature_insert_scale: 0.5,
            default_shape_dp: 100.0,
            default_checkmark_dp: 40.0,
            default_text_width_dp: 160.0,
            max_page_bytes: 100 * 1024 * 1024,
            render_dpi: 144.0,
        }
    }
}

impl EditorConfig {
    /// Convert density-independent units to pixels.
    pub fn px(&self, dp: f64) -> f64 {
        dp * self.density
    }

    /// Pixels per PDF point when rasterizing pages.
    pub fn render_scale(&self) -> f64 {
        self.render_dpi / 72.0
    }

    /// Selection padding in pixels.
    pub fn selection_padding(&self) -> f64 {
        self.px(self.selection_padding_dp)
    }

    /// Handle square edge in pixels.
    pub fn handle_size(&self) -> f64 {
        self.px(self.handle_size_dp)
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
