//! Toolbar tools and the session's tool state.

use crate::elements::ShapeKind;
use crate::signatures::SignatureBitmap;
use crate::style::{PaintSpec, SerializableColor};
use serde::{Deserialize, Serialize};

/// Toolbar tools, in toolbar slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    Draw,
    Undo,
    Redo,
    /// Select-only mode: taps select or deselect, nothing else.
    BlockAction,
    Shape,
    Signature,
    /// Places checkmarks.
    Comment,
    Text,
    /// Places a text label pre-filled with the date.
    Date,
}

impl ToolKind {
    pub const TOOLBAR: [ToolKind; 9] = [
        ToolKind::Draw,
        ToolKind::Undo,
        ToolKind::Redo,
        ToolKind::BlockAction,
        ToolKind::Shape,
        ToolKind::Signature,
        ToolKind::Comment,
        ToolKind::Text,
        ToolKind::Date,
    ];

    /// Tool at a toolbar slot.
    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::TOOLBAR.get(slot).copied()
    }

    /// One-shot actions that do not change the active tool.
    pub fn is_action(self) -> bool {
        matches!(self, ToolKind::Undo | ToolKind::Redo)
    }
}

/// A toolbar selection forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEvent {
    pub tool: ToolKind,
    /// Sub-selection within the tool (the shape picker slot for [`ToolKind::Shape`]).
    pub slot_index: usize,
}

impl ToolEvent {
    pub fn new(tool: ToolKind, slot_index: usize) -> Self {
        Self { tool, slot_index }
    }
}

/// What the scene should do after a tool event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    /// Tool state changed, nothing else to do.
    ModeChanged,
    Undo,
    Redo,
    /// The host should let the user pick a signature and call
    /// [`ToolState::set_pending_signature`].
    SignatureRequested,
}

/// Content a tap on empty page space will insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertionPayload {
    Shape(ShapeKind),
    Text(String),
    Checkmark,
    Signature(SignatureBitmap),
}

/// Session-scoped tool state.
#[derive(Debug, Clone)]
pub struct ToolState {
    active_tool: Option<ToolKind>,
    draw_mode: bool,
    draw_paint: PaintSpec,
    pending: Option<InsertionPayload>,
    /// Label used by the text tool.
    pub default_text: String,
    /// Label used by the date tool, supplied by the host's locale.
    pub date_label: String,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_tool: None,
            draw_mode: false,
            draw_paint: PaintSpec::default(),
            pending: None,
            default_text: "Text".to_string(),
            date_label: String::new(),
        }
    }
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tool(&self) -> Option<ToolKind> {
        self.active_tool
    }

    pub fn is_draw_mode(&self) -> bool {
        self.draw_mode
    }

    pub fn is_block_mode(&self) -> bool {
        self.active_tool == Some(ToolKind::BlockAction)
    }

    pub fn set_draw_mode(&mut self, enabled: bool) {
        self.draw_mode = enabled;
    }

    /// Paint for the next stroke.
    pub fn paint(&self) -> PaintSpec {
        self.draw_paint
    }

    pub fn set_draw_color(&mut self, color: SerializableColor) {
        self.draw_paint.color = color;
    }

    pub fn set_draw_stroke_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.draw_paint.width = width;
        }
    }

    pub fn pending(&self) -> Option<&InsertionPayload> {
        self.pending.as_ref()
    }

    /// Hand over the pending payload once an insertion completes.
    pub fn take_pending(&mut self) -> Option<InsertionPayload> {
        self.pending.take()
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Arm a signature insertion.
    pub fn set_pending_signature(&mut self, bitmap: SignatureBitmap) {
        self.draw_mode = false;
        self.pending = Some(InsertionPayload::Signature(bitmap));
    }

    /// Apply a toolbar selection.
    pub fn select(&mut self, event: ToolEvent) -> ToolAction {
        match event.tool {
            ToolKind::Undo => return ToolAction::Undo,
            ToolKind::Redo => return ToolAction::Redo,
            _ => {}
        }

        self.active_tool = Some(event.tool);
        self.pending = None;
        match event.tool {
            ToolKind::Draw => {
                self.draw_mode = true;
            }
            ToolKind::BlockAction => {
                self.draw_mode = false;
            }
            ToolKind::Shape => {
                self.draw_mode = false;
                let kind = ShapeKind::from_slot(event.slot_index).unwrap_or_default();
                self.pending = Some(InsertionPayload::Shape(kind));
            }
            ToolKind::Signature => {
                self.draw_mode = false;
                return ToolAction::SignatureRequested;
            }
            ToolKind::Comment => {
                self.draw_mode = false;
                self.pending = Some(InsertionPayload::Checkmark);
            }
            ToolKind::Text => {
                self.draw_mode = false;
                self.pending = Some(InsertionPayload::Text(self.default_text.clone()));
            }
            ToolKind::Date => {
                self.draw_mode = false;
                self.pending = Some(InsertionPayload::Text(self.date_label.clone()));
            }
            ToolKind::Undo | ToolKind::Redo => {}
        }
        ToolAction::ModeChanged
    }
}
