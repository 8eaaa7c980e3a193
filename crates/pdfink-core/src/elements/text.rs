//! Editable text labels.

use crate::config::EditorConfig;
use crate::style::SerializableColor;
use kurbo::Size;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub text: String,
    pub font_size: f64,
    pub bold: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: SerializableColor,
    /// Fill behind the glyphs, if any.
    pub background: Option<SerializableColor>,
    /// Inner padding between the content edge and the glyphs.
    pub text_padding: f64,
    min_font_size: f64,
    max_font_size: f64,
    font_size_step: f64,
}

impl TextElement {
    pub fn new(text: impl Into<String>, config: &EditorConfig) -> Self {
        Self {
            text: text.into(),
            font_size: config.default_text_size.clamp(config.min_text_size, config.max_text_size),
            bold: false,
            underline: false,
            strike: false,
            color: SerializableColor::black(),
            background: None,
            text_padding: config.px(config.text_padding_dp),
            min_font_size: config.min_text_size,
            max_font_size: config.max_text_size,
            font_size_step: config.text_size_increment,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.color = color;
    }

    pub fn set_background_color(&mut self, color: Option<SerializableColor>) {
        self.background = color;
    }

    /// Returns `false` once the upper bound is reached.
    pub fn increase_font_size(&mut self) -> bool {
        self.set_font_size(self.font_size + self.font_size_step)
    }

    /// Returns `false` once the lower bound is reached.
    pub fn decrease_font_size(&mut self) -> bool {
        self.set_font_size(self.font_size - self.font_size_step)
    }

    fn set_font_size(&mut self, size: f64) -> bool {
        let clamped = size.clamp(self.min_font_size, self.max_font_size);
        let changed = (clamped - self.font_size).abs() > f64::EPSILON;
        self.font_size = clamped;
        changed
    }

    pub fn toggle_bold(&mut self) {
        self.bold = !self.bold;
    }

    pub fn toggle_underline(&mut self) {
        self.underline = !self.underline;
    }

    pub fn toggle_strike(&mut self) {
        self.strike = !self.strike;
    }

    /// Content size for a single line of `width`.
    pub fn preferred_size(&self, width: f64) -> Size {
        Size::new(width, self.font_size * 1.4 + 2.0 * self.text_padding)
    }
}
