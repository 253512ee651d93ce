//! Programs: one per stage kernel, each with a fixed sampling-unit layout.
//!
//! A program binds its inputs at the units it declares, resolves samplers
//! from those same units and runs its kernel into the output field. Layouts
//! are plain constants, built once when the [`Pipeline`] is created.

use glam::{Vec2, Vec3};

use crate::config::{DisplayMode, ToneConfig};
use crate::field::{Bindings, Field, Texel, Unit};
use crate::kernels;
use crate::present::{self, Frame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplatProgram {
    pub target: Unit,
}

/// Where a splat lands and how wide it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplatUniforms {
    pub point: Vec2,
    pub radius: f32,
    pub aspect_ratio: f32,
}

impl SplatProgram {
    pub const LAYOUT: Self = Self { target: Unit(0) };

    pub fn run<T: Texel>(&self, target: &Field<T>, out: &mut Field<T>, impulse: T, u: SplatUniforms) {
        let mut bindings = Bindings::new();
        let target = bindings.attach(target, self.target);
        kernels::splat(
            bindings.sampler(target),
            out,
            u.point,
            impulse,
            u.radius,
            u.aspect_ratio,
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurlProgram {
    pub velocity: Unit,
}

impl CurlProgram {
    pub const LAYOUT: Self = Self { velocity: Unit(0) };

    pub fn run(&self, velocity: &Field<Vec2>, out: &mut Field<f32>) {
        let mut bindings = Bindings::new();
        let velocity = bindings.attach(velocity, self.velocity);
        kernels::curl(bindings.sampler(velocity), out);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VorticityProgram {
    pub velocity: Unit,
    pub curl: Unit,
}

impl VorticityProgram {
    pub const LAYOUT: Self = Self {
        velocity: Unit(0),
        curl: Unit(1),
    };

    pub fn run(
        &self,
        velocity: &Field<Vec2>,
        curl: &Field<f32>,
        out: &mut Field<Vec2>,
        strength: f32,
        dt: f32,
    ) {
        let mut bindings = Bindings::new();
        let velocity = bindings.attach(velocity, self.velocity);
        let curl = bindings.attach(curl, self.curl);
        kernels::vorticity(
            bindings.sampler(velocity),
            bindings.sampler(curl),
            out,
            strength,
            dt,
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DivergenceProgram {
    pub velocity: Unit,
}

impl DivergenceProgram {
    pub const LAYOUT: Self = Self { velocity: Unit(0) };

    pub fn run(&self, velocity: &Field<Vec2>, out: &mut Field<f32>) {
        let mut bindings = Bindings::new();
        let velocity = bindings.attach(velocity, self.velocity);
        kernels::divergence(bindings.sampler(velocity), out);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearProgram {
    pub source: Unit,
}

impl ClearProgram {
    pub const LAYOUT: Self = Self { source: Unit(0) };

    pub fn run(&self, source: &Field<f32>, out: &mut Field<f32>, factor: f32) {
        let mut bindings = Bindings::new();
        let source = bindings.attach(source, self.source);
        kernels::clear(bindings.sampler(source), out, factor);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JacobiProgram {
    pub pressure: Unit,
    pub divergence: Unit,
}

impl JacobiProgram {
    pub const LAYOUT: Self = Self {
        pressure: Unit(0),
        divergence: Unit(1),
    };

    pub fn run(&self, pressure: &Field<f32>, divergence: &Field<f32>, out: &mut Field<f32>) {
        let mut bindings = Bindings::new();
        let pressure = bindings.attach(pressure, self.pressure);
        let divergence = bindings.attach(divergence, self.divergence);
        kernels::jacobi(bindings.sampler(pressure), bindings.sampler(divergence), out);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GradientSubtractProgram {
    pub pressure: Unit,
    pub velocity: Unit,
}

impl GradientSubtractProgram {
    pub const LAYOUT: Self = Self {
        pressure: Unit(0),
        velocity: Unit(1),
    };

    pub fn run(&self, pressure: &Field<f32>, velocity: &Field<Vec2>, out: &mut Field<Vec2>) {
        let mut bindings = Bindings::new();
        let pressure = bindings.attach(pressure, self.pressure);
        let velocity = bindings.attach(velocity, self.velocity);
        kernels::gradient_subtract(bindings.sampler(pressure), bindings.sampler(velocity), out);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvectProgram {
    pub velocity: Unit,
    pub source: Unit,
}

impl AdvectProgram {
    pub const LAYOUT: Self = Self {
        velocity: Unit(0),
        source: Unit(1),
    };

    pub fn run<T: Texel>(
        &self,
        velocity: &Field<Vec2>,
        source: &Field<T>,
        out: &mut Field<T>,
        dt: f32,
        dissipation: f32,
    ) {
        let mut bindings = Bindings::new();
        let velocity = bindings.attach(velocity, self.velocity);
        let source = bindings.attach(source, self.source);
        kernels::advect(
            bindings.sampler(velocity),
            bindings.sampler(source),
            out,
            dt,
            dissipation,
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayProgram {
    pub dye: Unit,
}

impl DisplayProgram {
    pub const LAYOUT: Self = Self { dye: Unit(0) };

    pub fn run(&self, dye: &Field<Vec3>, tone: &ToneConfig, mode: DisplayMode, out: &mut Frame) {
        let mut bindings = Bindings::new();
        let dye = bindings.attach(dye, self.dye);
        present::present(bindings.sampler(dye), tone, mode, out);
    }
}

/// Every program the stepper runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pipeline {
    pub splat: SplatProgram,
    pub curl: CurlProgram,
    pub vorticity: VorticityProgram,
    pub divergence: DivergenceProgram,
    pub clear: ClearProgram,
    pub jacobi: JacobiProgram,
    pub gradient_subtract: GradientSubtractProgram,
    pub advect: AdvectProgram,
    pub display: DisplayProgram,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            splat: SplatProgram::LAYOUT,
            curl: CurlProgram::LAYOUT,
            vorticity: VorticityProgram::LAYOUT,
            divergence: DivergenceProgram::LAYOUT,
            clear: ClearProgram::LAYOUT,
            jacobi: JacobiProgram::LAYOUT,
            gradient_subtract: GradientSubtractProgram::LAYOUT,
            advect: AdvectProgram::LAYOUT,
            display: DisplayProgram::LAYOUT,
        }
    }
}
