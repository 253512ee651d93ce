//! Frame loop: ties a solver, an input adapter and a display surface together.

use glam::Vec2;
use log::{error, info, trace, warn};

use crate::ambient::AmbientSplats;
use crate::{DisplayMode, FluidError, FluidSim, Frame, InputAdapter, SimConfig, Viewport};

/// Where finished frames go.
pub trait Surface {
    fn size(&self) -> Viewport;

    /// Called after the loop has reallocated for a new size.
    fn resize(&mut self, _viewport: Viewport) -> Result<(), FluidError> {
        Ok(())
    }

    /// Display a frame. `ContextLost` (or any error) stops the loop.
    fn present(&mut self, frame: &Frame) -> Result<(), FluidError>;
}

pub struct FrameLoop<S> {
    surface: S,
    sim: FluidSim,
    input: InputAdapter,
    ambient: AmbientSplats,
    frame: Frame,
    last_tick: Option<f64>,
    running: bool,
    frames: u64,
}

impl<S: Surface> FrameLoop<S> {
    /// Acquire the surface and build the solver.
    ///
    /// If the surface cannot be acquired the failure is logged once and
    /// returned; no frame is ever scheduled.
    pub fn start(
        acquire: impl FnOnce() -> Result<S, FluidError>,
        config: SimConfig,
    ) -> Result<Self, FluidError> {
        let surface = acquire().map_err(|e| {
            error!("display surface unavailable: {e}");
            e
        })?;

        let viewport = surface.size().at_least_one();
        let ambient = AmbientSplats::new(config.ambient.clone(), config.seed.wrapping_add(1));
        let sim = FluidSim::new(viewport, config)?;

        info!(
            "frame loop started at {}x{} (sim {}x{}, dye {}x{})",
            viewport.width,
            viewport.height,
            sim.velocity().width(),
            sim.velocity().height(),
            sim.dye().width(),
            sim.dye().height(),
        );

        Ok(Self {
            surface,
            input: InputAdapter::new(viewport),
            ambient,
            frame: Frame::new(viewport),
            sim,
            last_tick: None,
            running: true,
            frames: 0,
        })
    }

    pub fn sim(&self) -> &FluidSim {
        &self.sim
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.input.pointer_move(self.sim.pointer_mut(), x, y);
    }

    pub fn touch_move(&mut self, touches: &[(f32, f32)]) {
        self.input.touch_move(self.sim.pointer_mut(), touches);
    }

    pub fn pointer_leave(&mut self) {
        self.input.pointer_leave();
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.sim.set_display_mode(mode);
    }

    pub fn toggle_display_mode(&mut self) {
        let mode = self.sim.display_mode().toggled();
        self.set_display_mode(mode);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        let viewport = viewport.at_least_one();
        if viewport == self.sim.viewport() {
            return;
        }

        let result = self
            .sim
            .resize(viewport)
            .and_then(|()| self.surface.resize(viewport));
        match result {
            Ok(()) => {
                self.input.resize(viewport);
                self.frame = Frame::new(viewport);
            }
            Err(e) => {
                warn!("resize to {}x{} failed: {e}", viewport.width, viewport.height);
                self.stop();
            }
        }
    }

    /// Run one frame at wall-clock time `now` (seconds). Returns whether the
    /// loop wants another frame.
    pub fn tick(&mut self, now: f64) -> bool {
        if !self.running {
            return false;
        }

        let dt = match self.last_tick.replace(now) {
            Some(last) => (now - last) as f32,
            None => 0.,
        };

        if self.ambient.enabled() {
            // At most max_dt of ambient time per frame, like the solver
            let ambient_dt = if dt.is_finite() {
                dt.clamp(0., self.sim.config().max_dt)
            } else {
                0.
            };
            for splat in self.ambient.poll(ambient_dt) {
                self.sim.inject(splat.point, splat.delta);
            }
        }

        self.sim.render(dt, &mut self.frame);
        trace!("frame {} dt={dt:.4}", self.frames);

        if let Err(e) = self.surface.present(&self.frame) {
            warn!("stopping frame loop: {e}");
            self.stop();
            return false;
        }
        self.frames += 1;
        true
    }

    pub fn stop(&mut self) {
        if self.running {
            info!("frame loop stopped after {} frames", self.frames);
        }
        self.running = false;
    }

    pub fn inject(&mut self, point: Vec2, delta: Vec2) {
        self.sim.inject(point, delta);
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}
