//! Pointer forcing state and the adapter that fills it from input events.

use glam::Vec2;

use crate::Viewport;

/// Latest pointer sample, drained once per frame.
///
/// Events between two frames overwrite each other: only the most recent
/// position and displacement survive, so a frame injects at most one splat.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    position: Vec2,
    delta: Vec2,
    moved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub position: Vec2,
    pub delta: Vec2,
}

impl PointerState {
    /// Latest position always wins. A zero delta never cancels a move that
    /// is still waiting for the next frame.
    pub fn record(&mut self, position: Vec2, delta: Vec2) {
        self.position = position;
        if delta != Vec2::ZERO {
            self.delta = delta;
            self.moved = true;
        }
    }

    pub fn moved(&self) -> bool {
        self.moved
    }

    pub fn take(&mut self) -> Option<PointerSample> {
        if !std::mem::take(&mut self.moved) {
            return None;
        }
        Some(PointerSample {
            position: self.position,
            delta: std::mem::take(&mut self.delta),
        })
    }
}

/// Converts device-pixel pointer/touch events into [`PointerState`] updates.
#[derive(Clone, Debug)]
pub struct InputAdapter {
    viewport: Viewport,
    last: Option<Vec2>,
}

impl InputAdapter {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            last: None,
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.last = None;
    }

    /// Pixel coordinates (origin top-left) to uv (origin bottom-left).
    pub fn normalize(&self, x: f32, y: f32) -> Vec2 {
        let (w, h) = (self.viewport.width as f32, self.viewport.height as f32);
        Vec2::new(x / w, 1. - y / h).clamp(Vec2::ZERO, Vec2::ONE)
    }

    /// Record a pointer move at pixel `(x, y)`.
    ///
    /// The first event after entering (or after a resize) only establishes
    /// the reference position.
    pub fn pointer_move(&mut self, state: &mut PointerState, x: f32, y: f32) {
        let position = self.normalize(x, y);
        let Some(last) = self.last.replace(position) else {
            return;
        };

        let mut delta = position - last;
        let aspect = self.viewport.aspect_ratio();
        if aspect < 1. {
            delta.x *= aspect;
        } else {
            delta.y /= aspect;
        }
        state.record(position, delta);
    }

    /// Follows the first finger only
    pub fn touch_move(&mut self, state: &mut PointerState, touches: &[(f32, f32)]) {
        if let Some(&(x, y)) = touches.first() {
            self.pointer_move(state, x, y);
        }
    }

    pub fn pointer_leave(&mut self) {
        self.last = None;
    }
}
