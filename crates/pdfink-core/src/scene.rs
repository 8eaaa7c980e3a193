//! Session scene: pages, overlay elements, selection and undo.

use crate::config::EditorConfig;
use crate::elements::{ElementId, ElementKind, OverlayElement};
use crate::strokes::{Stroke, StrokeLayer};
use crate::tools::{ToolAction, ToolEvent, ToolState};
use crate::viewport::ViewportTransform;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Page out of range: {0}")]
    PageOutOfRange(usize),
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Listener for UI the scene does not own (the floating text toolbar).
pub trait SceneObserver {
    fn selection_changed(&mut self, _selected: Option<ElementId>) {}
    fn toolbar_shown(&mut self, _page: usize, _id: ElementId, _anchor: Rect) {}
    fn toolbar_hidden(&mut self, _id: ElementId) {}
    fn toolbar_moved(&mut self, _page: usize, _id: ElementId, _anchor: Rect) {}
}

fn has_toolbar(kind: &ElementKind) -> bool {
    matches!(kind, ElementKind::Text(_))
}

/// One rendered page with its interactive layers.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    /// Pixel size of the page raster.
    pub raster_size: Size,
    pub viewport: ViewportTransform,
    pub strokes: StrokeLayer,
    /// Overlay elements, back to front. Insertion order is z-order.
    elements: Vec<OverlayElement>,
}

impl Page {
    pub fn new(index: usize, raster_size: Size, view_size: Size, config: &EditorConfig) -> Self {
        Self {
            index,
            raster_size,
            viewport: ViewportTransform::with_bounds(view_size, config.min_scale, config.max_scale),
            strokes: StrokeLayer::default(),
            elements: Vec::new(),
        }
    }

    /// Size of the unzoomed page view.
    pub fn view_size(&self) -> Size {
        self.viewport.view_size()
    }

    pub fn elements(&self) -> &[OverlayElement] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> Option<&OverlayElement> {
        self.elements.iter().find(|e| e.id() == id)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut OverlayElement> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Top-most element whose bounds contain a page-local point.
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.elements.iter().rev().find(|e| e.hit_test(point)).map(|e| e.id())
    }
}

/// Result of [`SceneController::undo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The most recently added element was removed.
    ElementRemoved(ElementId),
    /// The active page's last stroke was undone.
    StrokeUndone(usize),
    Nothing,
}

/// Cross-page owner of the session's interactive state.
pub struct SceneController {
    config: EditorConfig,
    pages: Vec<Page>,
    tools: ToolState,
    selected: Option<(usize, ElementId)>,
    /// Every live element as `(page, id)`, oldest first.
    insertion_order: Vec<(usize, ElementId)>,
    active_page: usize,
    observer: Option<Box<dyn SceneObserver>>,
}

impl SceneController {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            tools: ToolState::new(),
            selected: None,
            insertion_order: Vec::new(),
            active_page: 0,
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn SceneObserver>) {
        self.observer = Some(observer);
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolState {
        &mut self.tools
    }

    /// Add a page whose view is `view_width` wide, keeping the raster aspect.
    pub fn add_page(&mut self, raster_size: Size, view_width: f64) -> usize {
        let aspect = if raster_size.width > 0.0 { raster_size.height / raster_size.width } else { 1.0 };
        let view_size = Size::new(view_width, view_width * aspect);
        self.add_page_with_view(raster_size, view_size)
    }

    pub fn add_page_with_view(&mut self, raster_size: Size, view_size: Size) -> usize {
        let index = self.pages.len();
        self.pages.push(Page::new(index, raster_size, view_size, &self.config));
        index
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn active_page(&self) -> usize {
        self.active_page
    }

    /// Page that receives stroke undo/redo.
    pub fn set_active_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.active_page = index;
        }
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.selected.map(|(_, id)| id)
    }

    /// Page holding the selected element.
    pub fn selected_page(&self) -> Option<usize> {
        self.selected.map(|(page, _)| page)
    }

    pub fn selected_element(&self) -> Option<&OverlayElement> {
        let (page, id) = self.selected?;
        self.pages.get(page)?.element(id)
    }

    /// Page that holds an element.
    pub fn page_of(&self, id: ElementId) -> Option<usize> {
        self.insertion_order.iter().find(|(_, e)| *e == id).map(|(p, _)| *p)
    }

    pub fn element(&self, id: ElementId) -> Option<&OverlayElement> {
        let page = self.page_of(id)?;
        self.pages.get(page)?.element(id)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut OverlayElement> {
        let page = self.page_of(id)?;
        self.pages.get_mut(page)?.element_mut(id)
    }

    /// Number of live overlay elements across all pages.
    pub fn element_count(&self) -> usize {
        self.insertion_order.len()
    }

    /// Place an element on a page and select it.
    pub fn insert_element(&mut self, page: usize, element: OverlayElement) -> SceneResult<ElementId> {
        let target = self.pages.get_mut(page).ok_or(SceneError::PageOutOfRange(page))?;
        let id = element.id();
        log::debug!("Inserting {} element {} on page {}", element.kind.name(), id, page);
        target.elements.push(element);
        self.insertion_order.push((page, id));
        self.select_element(id)?;
        Ok(id)
    }

    /// Select an element, deselecting the previous one first.
    pub fn select_element(&mut self, id: ElementId) -> SceneResult<()> {
        let page = self.page_of(id).ok_or(SceneError::ElementNotFound(id))?;
        if self.selected == Some((page, id)) {
            return Ok(());
        }
        self.deselect_all();

        let element = self
            .pages
            .get_mut(page)
            .and_then(|p| p.element_mut(id))
            .ok_or(SceneError::ElementNotFound(id))?;
        element.set_selected(true);
        let toolbar = has_toolbar(&element.kind).then(|| element.bounds());
        self.selected = Some((page, id));

        if let Some(observer) = self.observer.as_mut() {
            observer.selection_changed(Some(id));
            if let Some(anchor) = toolbar {
                observer.toolbar_shown(page, id, anchor);
            }
        }
        Ok(())
    }

    /// Clear the selection and hide its toolbar.
    pub fn deselect_all(&mut self) {
        let Some((page, id)) = self.selected.take() else {
            return;
        };
        let mut toolbar = false;
        if let Some(element) = self.pages.get_mut(page).and_then(|p| p.element_mut(id)) {
            element.set_selected(false);
            toolbar = has_toolbar(&element.kind);
        }
        if let Some(observer) = self.observer.as_mut() {
            if toolbar {
                observer.toolbar_hidden(id);
            }
            observer.selection_changed(None);
        }
    }

    /// Remove an element from its page and the tracking list.
    pub fn remove_element(&mut self, id: ElementId) -> Option<OverlayElement> {
        let page = self.page_of(id)?;
        if self.selected() == Some(id) {
            self.deselect_all();
        }
        self.insertion_order.retain(|(_, e)| *e != id);
        let target = self.pages.get_mut(page)?;
        let index = target.elements.iter().position(|e| e.id() == id)?;
        let element = target.elements.remove(index);
        log::debug!("Removed {} element {} from page {}", element.kind.name(), id, page);
        Some(element)
    }

    /// Apply a mutation to an element and keep its toolbar in place.
    pub fn update_element<F>(&mut self, id: ElementId, mutate: F) -> SceneResult<()>
    where
        F: FnOnce(&mut OverlayElement),
    {
        let page = self.page_of(id).ok_or(SceneError::ElementNotFound(id))?;
        let element = self.element_mut(id).ok_or(SceneError::ElementNotFound(id))?;
        mutate(element);
        let anchor = (element.is_selected() && has_toolbar(&element.kind)).then(|| element.bounds());
        if let (Some(anchor), Some(observer)) = (anchor, self.observer.as_mut()) {
            observer.toolbar_moved(page, id, anchor);
        }
        Ok(())
    }

    pub fn move_element(&mut self, id: ElementId, delta: Vec2) -> SceneResult<()> {
        self.update_element(id, |e| e.move_by(delta))
    }

    /// Remove the newest overlay element if any exist, otherwise undo a stroke
    /// on the active page.
    pub fn undo(&mut self) -> UndoOutcome {
        if let Some(&(_, id)) = self.insertion_order.last() {
            self.remove_element(id);
            return UndoOutcome::ElementRemoved(id);
        }
        let page = self.active_page;
        match self.pages.get_mut(page).map(|p| p.strokes.undo()) {
            Some(true) => UndoOutcome::StrokeUndone(page),
            _ => UndoOutcome::Nothing,
        }
    }

    /// Redo a stroke on the active page.
    pub fn redo(&mut self) -> bool {
        self.pages
            .get_mut(self.active_page)
            .is_some_and(|p| p.strokes.redo())
    }

    /// Forward a toolbar selection, running undo/redo actions directly.
    pub fn apply_tool(&mut self, event: ToolEvent) -> ToolAction {
        let action = self.tools.select(event);
        match action {
            ToolAction::Undo => {
                self.undo();
            }
            ToolAction::Redo => {
                self.redo();
            }
            ToolAction::ModeChanged | ToolAction::SignatureRequested => {}
        }
        action
    }

    /// Copy everything export needs.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            pages: self
                .pages
                .iter()
                .map(|page| PageSnapshot {
                    index: page.index,
                    raster_size: page.raster_size,
                    view_size: page.view_size(),
                    strokes: page.strokes.strokes().to_vec(),
                    elements: page.elements.clone(),
                })
                .collect(),
        }
    }
}

/// Immutable copy of one page's annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub index: usize,
    pub raster_size: Size,
    /// View size the strokes and elements were placed in.
    pub view_size: Size,
    pub strokes: Vec<Stroke>,
    /// Elements in insertion order.
    pub elements: Vec<OverlayElement>,
}

impl PageSnapshot {
    /// Per-axis ratio from view pixels to raster pixels.
    pub fn view_to_raster(&self) -> Vec2 {
        let ratio = |raster: f64, view: f64| if view > 0.0 { raster / view } else { 1.0 };
        Vec2::new(
            ratio(self.raster_size.width, self.view_size.width),
            ratio(self.raster_size.height, self.view_size.height),
        )
    }
}

/// Immutable copy of a session's annotations, taken before export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub pages: Vec<PageSnapshot>,
}

impl SceneSnapshot {
    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> SceneResult<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::Serialization(e.to_string()))
    }
}
