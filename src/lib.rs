//! Cursor-reactive stable-fluids background.
//!
//! [`FluidSim`] owns every field and runs the per-frame stage sequence;
//! [`FrameLoop`] drives it against a [`Surface`].

pub mod ambient;
pub mod array2d;
pub mod config;
pub mod error;
pub mod field;
pub mod kernels;
pub mod palette;
pub mod pipeline;
pub mod pointer;
pub mod present;
pub mod runner;

pub use config::{DisplayMode, SimConfig};
pub use error::FluidError;
pub use field::{DoubleBuffer, Field};
pub use pointer::{InputAdapter, PointerState};
pub use present::Frame;
pub use runner::{FrameLoop, Surface};

use glam::{Vec2, Vec3};
use log::{debug, trace, warn};

use palette::ColorGenerator;
use pipeline::{Pipeline, SplatUniforms};

/// Display surface size in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn at_least_one(self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Grid size for a field whose short side is `resolution` cells.
    pub fn grid_size(&self, resolution: u32) -> (usize, usize) {
        let mut aspect = self.aspect_ratio();
        if aspect < 1. {
            aspect = 1. / aspect;
        }
        let min = (resolution as f32).round().max(1.) as usize;
        let max = (resolution as f32 * aspect).round().max(1.) as usize;

        if self.width > self.height {
            (max, min)
        } else {
            (min, max)
        }
    }
}

/// Stages of one simulation frame, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Splatting,
    Curl,
    Vorticity,
    Divergence,
    PressureClear,
    PressureIterate,
    GradientSubtract,
    AdvectVelocity,
    AdvectDye,
    Present,
}

/// What the stepper knows when picking the next stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub splat_pending: bool,
    pub iterations_left: u32,
    pub present: bool,
}

impl Stage {
    /// Stage after `self`. A frame starts and ends at `Idle`.
    pub fn next(self, t: Transition) -> Stage {
        match self {
            Stage::Idle if t.splat_pending => Stage::Splatting,
            Stage::Idle | Stage::Splatting => Stage::Curl,
            Stage::Curl => Stage::Vorticity,
            Stage::Vorticity => Stage::Divergence,
            Stage::Divergence => Stage::PressureClear,
            Stage::PressureClear => Stage::PressureIterate,
            Stage::PressureIterate if t.iterations_left > 0 => Stage::PressureIterate,
            Stage::PressureIterate => Stage::GradientSubtract,
            Stage::GradientSubtract => Stage::AdvectVelocity,
            Stage::AdvectVelocity => Stage::AdvectDye,
            Stage::AdvectDye if t.present => Stage::Present,
            Stage::AdvectDye | Stage::Present => Stage::Idle,
        }
    }
}

/// One splat as applied to the fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splat {
    /// uv position, origin bottom-left.
    pub point: Vec2,
    /// Aspect-corrected displacement; scaled by `splat_force` into velocity.
    pub delta: Vec2,
    pub color: Vec3,
}

/// The fluid solver: fields, configuration and forcing state.
pub struct FluidSim {
    config: SimConfig,
    viewport: Viewport,
    pipeline: Pipeline,
    velocity: DoubleBuffer<Vec2>,
    dye: DoubleBuffer<Vec3>,
    pressure: DoubleBuffer<f32>,
    divergence: Field<f32>,
    curl: Field<f32>,
    pointer: PointerState,
    colors: ColorGenerator,
    display_mode: DisplayMode,
    queued: Vec<Splat>,
    applied: Vec<Splat>,
    trace: Vec<Stage>,
}

struct Grids {
    velocity: DoubleBuffer<Vec2>,
    dye: DoubleBuffer<Vec3>,
    pressure: DoubleBuffer<f32>,
    divergence: Field<f32>,
    curl: Field<f32>,
}

impl Grids {
    fn allocate(viewport: Viewport, config: &SimConfig) -> Result<Self, FluidError> {
        let (sw, sh) = viewport.grid_size(config.sim_resolution);
        let (dw, dh) = viewport.grid_size(config.dye_resolution);
        debug!(
            "allocating fields for {}x{}: sim {sw}x{sh}, dye {dw}x{dh}",
            viewport.width, viewport.height
        );

        Ok(Self {
            velocity: DoubleBuffer::allocate(sw, sh)?,
            dye: DoubleBuffer::allocate(dw, dh)?,
            pressure: DoubleBuffer::allocate(sw, sh)?,
            divergence: Field::allocate(sw, sh)?,
            curl: Field::allocate(sw, sh)?,
        })
    }
}

impl FluidSim {
    /// Validate `config` and allocate every field for `viewport`.
    pub fn new(viewport: Viewport, config: SimConfig) -> Result<Self, FluidError> {
        config.validate()?;
        for warning in config.warnings() {
            warn!("{warning}");
        }

        let viewport = viewport.at_least_one();
        let grids = Grids::allocate(viewport, &config)?;

        Ok(Self {
            colors: ColorGenerator::new(config.palette.clone(), config.seed),
            display_mode: config.display_mode,
            viewport,
            pipeline: Pipeline::default(),
            velocity: grids.velocity,
            dye: grids.dye,
            pressure: grids.pressure,
            divergence: grids.divergence,
            curl: grids.curl,
            pointer: PointerState::default(),
            queued: Vec::new(),
            applied: Vec::new(),
            trace: Vec::new(),
            config,
        })
    }

    /// Reallocate every field for a new viewport. Content is discarded and
    /// pending input dropped; the configuration is kept.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), FluidError> {
        let viewport = viewport.at_least_one();
        let grids = Grids::allocate(viewport, &self.config)?;

        self.viewport = viewport;
        self.velocity = grids.velocity;
        self.dye = grids.dye;
        self.pressure = grids.pressure;
        self.divergence = grids.divergence;
        self.curl = grids.curl;
        self.pointer = PointerState::default();
        self.queued.clear();
        self.trace.clear();
        Ok(())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if mode != self.display_mode {
            debug!("display mode {:?} -> {mode:?}", self.display_mode);
        }
        self.display_mode = mode;
    }

    pub fn pointer_mut(&mut self) -> &mut PointerState {
        &mut self.pointer
    }

    /// Queue a splat with an explicit color, applied on the next step.
    pub fn splat(&mut self, point: Vec2, delta: Vec2, color: Vec3) {
        self.queued.push(Splat { point, delta, color });
    }

    /// Queue a splat colored by the palette at the current mode's intensity.
    pub fn inject(&mut self, point: Vec2, delta: Vec2) {
        let color = self.next_color();
        self.splat(point, delta, color);
    }

    fn next_color(&mut self) -> Vec3 {
        self.colors.next_color() * self.config.tone.intensity(self.display_mode)
    }

    /// Advance the simulation by `dt` seconds (clamped to `max_dt`).
    pub fn step(&mut self, dt: f32) {
        self.run_stages(dt, None);
    }

    /// Step, then present
    pub fn render(&mut self, dt: f32, frame: &mut Frame) {
        self.run_stages(dt, Some(frame));
    }

    pub fn present(&self, frame: &mut Frame) {
        self.pipeline
            .display
            .run(&self.dye.read, &self.config.tone, self.display_mode, frame);
    }

    fn run_stages(&mut self, dt: f32, mut frame: Option<&mut Frame>) {
        let dt = if dt.is_finite() {
            dt.clamp(0., self.config.max_dt)
        } else {
            0.
        };

        if let Some(sample) = self.pointer.take() {
            let color = self.next_color();
            self.queued.push(Splat {
                point: sample.position,
                delta: sample.delta,
                color,
            });
        }

        self.trace.clear();
        self.applied.clear();

        let mut transition = Transition {
            splat_pending: !self.queued.is_empty(),
            iterations_left: self.config.pressure_iterations,
            present: frame.is_some(),
        };

        let mut stage = Stage::Idle.next(transition);
        while stage != Stage::Idle {
            self.trace.push(stage);
            match stage {
                Stage::Splatting => self.apply_splats(),
                Stage::Curl => self.pipeline.curl.run(&self.velocity.read, &mut self.curl),
                Stage::Vorticity => {
                    self.pipeline.vorticity.run(
                        &self.velocity.read,
                        &self.curl,
                        &mut self.velocity.write,
                        self.config.curl_strength,
                        dt,
                    );
                    self.velocity.swap();
                }
                Stage::Divergence => self
                    .pipeline
                    .divergence
                    .run(&self.velocity.read, &mut self.divergence),
                Stage::PressureClear => {
                    self.pipeline.clear.run(
                        &self.pressure.read,
                        &mut self.pressure.write,
                        self.config.pressure_dissipation,
                    );
                    self.pressure.swap();
                }
                Stage::PressureIterate => {
                    self.pipeline.jacobi.run(
                        &self.pressure.read,
                        &self.divergence,
                        &mut self.pressure.write,
                    );
                    self.pressure.swap();
                    transition.iterations_left = transition.iterations_left.saturating_sub(1);
                }
                Stage::GradientSubtract => {
                    self.pipeline.gradient_subtract.run(
                        &self.pressure.read,
                        &self.velocity.read,
                        &mut self.velocity.write,
                    );
                    self.velocity.swap();
                }
                Stage::AdvectVelocity => {
                    self.pipeline.advect.run(
                        &self.velocity.read,
                        &self.velocity.read,
                        &mut self.velocity.write,
                        dt,
                        self.config.velocity_dissipation,
                    );
                    self.velocity.swap();
                }
                Stage::AdvectDye => {
                    self.pipeline.advect.run(
                        &self.velocity.read,
                        &self.dye.read,
                        &mut self.dye.write,
                        dt,
                        self.config.density_dissipation,
                    );
                    kernels::limit_mass(
                        &self.dye.read,
                        &mut self.dye.write,
                        self.config.density_dissipation,
                    );
                    self.dye.swap();
                }
                Stage::Present => {
                    if let Some(frame) = frame.as_deref_mut() {
                        self.present(frame);
                    }
                }
                Stage::Idle => unreachable!(),
            }
            stage = stage.next(transition);
        }

        trace!("step dt={dt:.4} stages={}", self.trace.len());
    }

    fn apply_splats(&mut self) {
        let radius = self.config.splat_radius_uv();
        let aspect_ratio = self.viewport.aspect_ratio();

        for splat in std::mem::take(&mut self.queued) {
            let uniforms = SplatUniforms {
                point: splat.point,
                radius,
                aspect_ratio,
            };

            self.pipeline.splat.run(
                &self.velocity.read,
                &mut self.velocity.write,
                splat.delta * self.config.splat_force,
                uniforms,
            );
            self.velocity.swap();

            self.pipeline
                .splat
                .run(&self.dye.read, &mut self.dye.write, splat.color, uniforms);
            self.dye.swap();

            self.applied.push(splat);
        }
    }

    /// Stages run by the last step
    pub fn last_trace(&self) -> &[Stage] {
        &self.trace
    }

    pub fn last_splats(&self) -> &[Splat] {
        &self.applied
    }

    pub fn velocity(&self) -> &Field<Vec2> {
        &self.velocity.read
    }

    pub fn dye(&self) -> &Field<Vec3> {
        &self.dye.read
    }

    pub fn pressure(&self) -> &Field<f32> {
        &self.pressure.read
    }

    pub fn divergence(&self) -> &Field<f32> {
        &self.divergence
    }

    pub fn curl(&self) -> &Field<f32> {
        &self.curl
    }
}
