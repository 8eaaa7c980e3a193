//! PdfInk Core Library
//!
//! Platform-agnostic annotation model for PdfInk: per-page viewports, ink
//! strokes, overlay elements, gesture routing and the session scene.

pub mod cancel;
pub mod config;
pub mod elements;
pub mod gesture;
pub mod handles;
pub mod input;
pub mod raster;
pub mod scene;
pub mod signatures;
pub mod strokes;
pub mod style;
pub mod tools;
pub mod viewport;

pub use cancel::CancelToken;
pub use config::EditorConfig;
pub use elements::{ElementId, ElementKind, OverlayElement, ShapeKind};
pub use gesture::{GestureOutcome, GestureRouter, GestureState};
pub use handles::{Handle, HandleKind};
pub use input::{PointerEvent, PointerId};
pub use raster::{PageBitmap, PageLoad, PageRasterSource, RasterError};
pub use scene::{Page, PageSnapshot, SceneController, SceneObserver, SceneSnapshot, UndoOutcome};
pub use signatures::{FileSignatureStore, SignatureBitmap, SignatureStore};
pub use strokes::{Stroke, StrokeLayer};
pub use style::{PaintSpec, SerializableColor};
pub use tools::{ToolAction, ToolEvent, ToolKind, ToolState};
pub use viewport::ViewportTransform;
