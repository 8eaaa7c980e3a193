//! Per-page touch dispatcher.
//!
//! On pointer-down the router decides which single handler owns the gesture
//! (viewport, an element handle, an element body, the ink layer or an
//! insertion) and routes the rest of the pointer stream to it until the
//! pointers lift. Priority on pointer-down:
//!
//! 1. select-only mode: select or deselect, nothing else
//! 2. a handle of the selected element
//! 3. the body of the top-most element under the pointer
//! 4. insertion of the pending payload at the tap point
//! 5. ink, when draw mode is on
//! 6. viewport: pinch with two pointers, pan on a zoomed page past a small
//!    threshold, otherwise release to the parent scroller
//!
//! The router never fails; malformed streams fall back to idle.

use crate::elements::{ElementId, InteractionState, OverlayElement};
use crate::handles::HandleKind;
use crate::input::{PointerEvent, PointerId, PointerTracker};
use crate::scene::SceneController;
use crate::tools::InsertionPayload;
use kurbo::{Point, Vec2};

/// The gesture currently owning the pointer stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    /// One pointer is down but has not yet claimed a gesture.
    Tracking { origin: Point },
    Panning,
    Scaling,
    Drawing,
    ElementMove(ElementId),
    ElementResize(ElementId),
    ElementRotate(ElementId),
    /// A freshly inserted element follows the pointer until it lifts.
    Inserting(ElementId),
}

/// What the host should do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// The page handled the event and keeps the stream.
    Consumed,
    /// The page does not want this gesture; let the parent scroll.
    ReleaseToParent,
    /// The event did not belong to any tracked pointer.
    Ignored,
    Inserted(ElementId),
    Deleted(ElementId),
    /// The element's menu handle was tapped.
    MenuRequested(ElementId),
}

impl GestureOutcome {
    /// Whether the parent container must not intercept the stream.
    pub fn claims_stream(self) -> bool {
        !matches!(self, GestureOutcome::ReleaseToParent | GestureOutcome::Ignored)
    }
}

/// Gesture state machine for one page.
#[derive(Debug, Clone)]
pub struct GestureRouter {
    page: usize,
    state: GestureState,
    pointers: PointerTracker,
    /// Pointer driving a single-pointer gesture.
    driver: Option<PointerId>,
    /// Last screen position of the driver (pan) or page position (elements).
    last_point: Point,
    /// Resize handle corner minus the pointer position at grab time.
    grab_offset: Vec2,
    /// Pinch start: finger span, viewport scale and the page point under the
    /// focal point.
    pinch_span: f64,
    pinch_scale: f64,
    pinch_anchor: Point,
}

impl GestureRouter {
    pub fn new(page: usize) -> Self {
        Self {
            page,
            state: GestureState::Idle,
            pointers: PointerTracker::new(),
            driver: None,
            last_point: Point::ZERO,
            grab_offset: Vec2::ZERO,
            pinch_span: 0.0,
            pinch_scale: 1.0,
            pinch_anchor: Point::ZERO,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Route one pointer event.
    pub fn handle(&mut self, scene: &mut SceneController, event: PointerEvent) -> GestureOutcome {
        if scene.page(self.page).is_none() {
            return GestureOutcome::Ignored;
        }
        match event {
            PointerEvent::Down { id, position } => {
                let first = self.pointers.is_empty() || self.state == GestureState::Idle;
                self.pointers.press(id, position);
                if first && self.pointers.count() == 1 {
                    self.pointer_down(scene, id, position)
                } else {
                    self.extra_pointer_down(scene)
                }
            }
            PointerEvent::Move { id, position } => {
                if !self.pointers.update(id, position) {
                    return GestureOutcome::Ignored;
                }
                self.pointer_move(scene, id, position)
            }
            PointerEvent::Up { id, position } => {
                if !self.pointers.contains(id) {
                    return GestureOutcome::Ignored;
                }
                self.pointers.update(id, position);
                let outcome = self.pointer_move(scene, id, position);
                self.pointers.release(id);
                self.pointer_up(scene, id, outcome)
            }
            PointerEvent::Cancel => {
                let active = self.state != GestureState::Idle;
                self.finish(scene);
                self.pointers.clear();
                if active { GestureOutcome::Consumed } else { GestureOutcome::Ignored }
            }
        }
    }

    fn pointer_down(&mut self, scene: &mut SceneController, id: PointerId, screen: Point) -> GestureOutcome {
        scene.set_active_page(self.page);
        self.driver = Some(id);
        self.state = GestureState::Idle;

        let Some(page) = scene.page(self.page) else {
            return GestureOutcome::Ignored;
        };
        let point = page.viewport.to_page_space(screen);
        let hit = page.element_at(point);
        self.last_point = point;

        if scene.tools().is_block_mode() {
            return match hit {
                Some(element) => {
                    let _ = scene.select_element(element);
                    GestureOutcome::Consumed
                }
                None => {
                    scene.deselect_all();
                    GestureOutcome::ReleaseToParent
                }
            };
        }

        // Handles take precedence over any body, overlapping ones included.
        let handle = scene
            .selected_element()
            .filter(|_| scene.selected_page() == Some(self.page))
            .and_then(|e| e.hit_test_handle(point).map(|h| (e.id(), h)));
        if let Some((element, handle)) = handle {
            return self.handle_down(scene, element, handle, point);
        }

        if let Some(element) = hit {
            let _ = scene.select_element(element);
            let _ = scene.update_element(element, |e| e.begin_interaction(InteractionState::Moving));
            self.state = GestureState::ElementMove(element);
            return GestureOutcome::Consumed;
        }

        scene.deselect_all();

        if !scene.tools().is_draw_mode() {
            if let Some(payload) = scene.tools_mut().take_pending() {
                let element = build_element(payload, point, scene);
                return match scene.insert_element(self.page, element) {
                    Ok(element) => {
                        let _ = scene.update_element(element, |e| e.begin_interaction(InteractionState::Moving));
                        self.state = GestureState::Inserting(element);
                        GestureOutcome::Inserted(element)
                    }
                    Err(e) => {
                        log::warn!("Insertion failed: {}", e);
                        GestureOutcome::Ignored
                    }
                };
            }
        }

        if scene.tools().is_draw_mode() {
            let paint = scene.tools().paint();
            if let Some(page) = scene.page_mut(self.page) {
                page.strokes.begin_stroke(point, paint);
                self.state = GestureState::Drawing;
                return GestureOutcome::Consumed;
            }
        }

        self.state = GestureState::Tracking { origin: screen };
        self.last_point = screen;
        if self.page_zoomed(scene) {
            GestureOutcome::Consumed
        } else {
            GestureOutcome::ReleaseToParent
        }
    }

    fn handle_down(
        &mut self,
        scene: &mut SceneController,
        element: ElementId,
        handle: HandleKind,
        point: Point,
    ) -> GestureOutcome {
        match handle {
            HandleKind::Delete => {
                scene.remove_element(element);
                self.state = GestureState::Idle;
                GestureOutcome::Deleted(element)
            }
            HandleKind::Menu => {
                self.state = GestureState::Idle;
                GestureOutcome::MenuRequested(element)
            }
            HandleKind::Resize => {
                self.grab_offset = scene
                    .element(element)
                    .map_or(Vec2::ZERO, |e| handle.anchor(e.bounds()) - point);
                let _ = scene.update_element(element, |e| e.begin_interaction(InteractionState::Resizing));
                self.state = GestureState::ElementResize(element);
                GestureOutcome::Consumed
            }
            HandleKind::Rotate => {
                let _ = scene.update_element(element, |e| e.begin_interaction(InteractionState::Rotating));
                self.state = GestureState::ElementRotate(element);
                GestureOutcome::Consumed
            }
        }
    }

    /// A second pointer preempts single-pointer pan and draw.
    fn extra_pointer_down(&mut self, scene: &mut SceneController) -> GestureOutcome {
        match self.state {
            GestureState::Idle | GestureState::Tracking { .. } | GestureState::Panning | GestureState::Drawing => {
                if scene.tools().is_block_mode() {
                    return GestureOutcome::ReleaseToParent;
                }
                if self.state == GestureState::Drawing {
                    if let Some(page) = scene.page_mut(self.page) {
                        page.strokes.discard_stroke();
                    }
                }
                if self.begin_pinch(scene) {
                    self.state = GestureState::Scaling;
                    GestureOutcome::Consumed
                } else {
                    GestureOutcome::Ignored
                }
            }
            GestureState::Scaling => GestureOutcome::Consumed,
            // Element manipulation stays with its driving pointer.
            GestureState::ElementMove(_)
            | GestureState::ElementResize(_)
            | GestureState::ElementRotate(_)
            | GestureState::Inserting(_) => GestureOutcome::Consumed,
        }
    }

    fn pointer_move(&mut self, scene: &mut SceneController, id: PointerId, screen: Point) -> GestureOutcome {
        if self.state == GestureState::Scaling {
            return self.scale_move(scene);
        }
        if self.driver != Some(id) {
            return match self.state {
                GestureState::Idle => GestureOutcome::Ignored,
                _ => GestureOutcome::Consumed,
            };
        }
        let threshold = scene.config().px(scene.config().pan_threshold_dp);
        let zoomed = self.page_zoomed(scene);
        let Some(page) = scene.page_mut(self.page) else {
            return GestureOutcome::Ignored;
        };
        let point = page.viewport.to_page_space(screen);

        match self.state {
            GestureState::Idle => GestureOutcome::Ignored,
            GestureState::Tracking { origin } => {
                if !zoomed {
                    return GestureOutcome::ReleaseToParent;
                }
                if screen.distance(origin) > threshold {
                    page.viewport.apply_pan(screen - origin);
                    self.last_point = screen;
                    self.state = GestureState::Panning;
                }
                GestureOutcome::Consumed
            }
            GestureState::Panning => {
                page.viewport.apply_pan(screen - self.last_point);
                self.last_point = screen;
                GestureOutcome::Consumed
            }
            GestureState::Drawing => {
                page.strokes.extend_stroke(point);
                GestureOutcome::Consumed
            }
            GestureState::ElementMove(element) | GestureState::Inserting(element) => {
                let delta: Vec2 = point - self.last_point;
                self.last_point = point;
                if scene.move_element(element, delta).is_err() {
                    self.state = GestureState::Idle;
                }
                GestureOutcome::Consumed
            }
            GestureState::ElementResize(element) => {
                let corner = point + self.grab_offset;
                if scene.update_element(element, |e| e.resize_toward(corner)).is_err() {
                    self.state = GestureState::Idle;
                }
                GestureOutcome::Consumed
            }
            GestureState::ElementRotate(element) => {
                if scene.update_element(element, |e| e.rotate_toward(point)).is_err() {
                    self.state = GestureState::Idle;
                }
                GestureOutcome::Consumed
            }
            GestureState::Scaling => GestureOutcome::Consumed,
        }
    }

    fn scale_move(&mut self, scene: &mut SceneController) -> GestureOutcome {
        let (Some(span), Some(focal)) = (self.pointers.span(), self.pointers.focal_point()) else {
            return GestureOutcome::Consumed;
        };
        let Some(page) = scene.page_mut(self.page) else {
            return GestureOutcome::Ignored;
        };
        if self.pinch_span > f64::EPSILON {
            // Degenerate scales are rejected by the viewport.
            let scale = self.pinch_scale * span / self.pinch_span;
            page.viewport.set_scale_anchored(scale, self.pinch_anchor, focal);
        }
        GestureOutcome::Consumed
    }

    /// Record the pinch baseline from the current pointers.
    fn begin_pinch(&mut self, scene: &SceneController) -> bool {
        let (Some(span), Some(focal), Some(page)) =
            (self.pointers.span(), self.pointers.focal_point(), scene.page(self.page))
        else {
            return false;
        };
        self.pinch_span = span;
        self.pinch_scale = page.viewport.scale();
        self.pinch_anchor = page.viewport.to_page_space(focal);
        true
    }

    fn pointer_up(&mut self, scene: &mut SceneController, id: PointerId, outcome: GestureOutcome) -> GestureOutcome {
        if self.state == GestureState::Scaling {
            if self.pointers.count() >= 2 {
                self.begin_pinch(scene);
                return GestureOutcome::Consumed;
            }
            // Hand the remaining pointer to a pan so the content does not jump.
            match self.pointers.primary().and_then(|p| self.pointers.position(p).map(|pos| (p, pos))) {
                Some((remaining, position)) => {
                    self.driver = Some(remaining);
                    self.last_point = position;
                    self.state = if self.page_zoomed(scene) { GestureState::Panning } else { GestureState::Idle };
                }
                None => self.reset(),
            }
            return GestureOutcome::Consumed;
        }

        if self.driver != Some(id) {
            return if self.pointers.is_empty() && self.state == GestureState::Idle {
                GestureOutcome::Ignored
            } else {
                GestureOutcome::Consumed
            };
        }

        self.finish(scene);
        match outcome {
            GestureOutcome::ReleaseToParent | GestureOutcome::Ignored => outcome,
            _ => GestureOutcome::Consumed,
        }
    }

    /// End the active gesture, committing any stroke in progress.
    fn finish(&mut self, scene: &mut SceneController) {
        match self.state {
            GestureState::Drawing => {
                if let Some(page) = scene.page_mut(self.page) {
                    page.strokes.commit_stroke();
                }
            }
            GestureState::ElementMove(element)
            | GestureState::ElementResize(element)
            | GestureState::ElementRotate(element)
            | GestureState::Inserting(element) => {
                let _ = scene.update_element(element, |e| e.end_interaction());
            }
            _ => {}
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = GestureState::Idle;
        self.driver = None;
        self.grab_offset = Vec2::ZERO;
        self.pinch_span = 0.0;
    }

    fn page_zoomed(&self, scene: &SceneController) -> bool {
        scene.page(self.page).is_some_and(|p| p.viewport.is_zoomed())
    }
}

fn build_element(payload: InsertionPayload, center: Point, scene: &SceneController) -> OverlayElement {
    let config = scene.config();
    match payload {
        InsertionPayload::Shape(kind) => {
            let paint = scene.tools().paint();
            OverlayElement::shape(kind, paint, center, config)
        }
        InsertionPayload::Text(text) => OverlayElement::text(text, center, config),
        InsertionPayload::Checkmark => OverlayElement::checkmark(center, config),
        InsertionPayload::Signature(bitmap) => OverlayElement::signature(bitmap, center, config),
    }
}
