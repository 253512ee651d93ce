//! Simulation configuration, loaded from RON.
//!
//! Every field has a default, so a config file only needs the keys it
//! overrides:
//!
//! ```ron
//! (
//!     sim_resolution: 96,
//!     display_mode: dark,
//!     palette: [Hsl(h: 210.0, s: 100.0, l: 60.0), Rgb(r: 1.0, g: 0.4, b: 0.7)],
//! )
//! ```

use std::{fs, path::Path};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::palette::{default_palette, PaletteColor};
use crate::FluidError;

/// Largest accepted `sim_resolution`/`dye_resolution`.
pub const MAX_RESOLUTION: u32 = 4096;

/// Page color scheme. Switches background, brightness gain and dye intensity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Light,
    Dark,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Light => DisplayMode::Dark,
            DisplayMode::Dark => DisplayMode::Light,
        }
    }

    /// sRGB, 0..1
    pub fn background(self) -> Vec3 {
        match self {
            // #fbfbfd
            DisplayMode::Light => Vec3::new(251., 251., 253.) / 255.,
            DisplayMode::Dark => Vec3::ZERO,
        }
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(DisplayMode::Light),
            "dark" => Ok(DisplayMode::Dark),
            other => Err(FluidError::ConfigurationInvalid(format!(
                "unknown display mode {other:?} (expected light or dark)"
            ))),
        }
    }
}

/// Tone curve applied when presenting the dye field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    /// `mix(luma, color, saturation)`; values above 1 boost saturation.
    pub saturation: f32,
    /// Exponent applied per channel; below 1 brightens midtones.
    pub gamma: f32,
    pub light_brightness: f32,
    pub dark_brightness: f32,
    /// Max-channel dye density at which the output becomes fully opaque.
    pub alpha_threshold: f32,
    pub light_intensity: f32,
    pub dark_intensity: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            saturation: 1.25,
            gamma: 0.8,
            light_brightness: 1.1,
            dark_brightness: 1.6,
            alpha_threshold: 0.3,
            light_intensity: 0.35,
            dark_intensity: 0.25,
        }
    }
}

impl ToneConfig {
    pub fn brightness(&self, mode: DisplayMode) -> f32 {
        match mode {
            DisplayMode::Light => self.light_brightness,
            DisplayMode::Dark => self.dark_brightness,
        }
    }

    pub fn intensity(&self, mode: DisplayMode) -> f32 {
        match mode {
            DisplayMode::Light => self.light_intensity,
            DisplayMode::Dark => self.dark_intensity,
        }
    }
}

/// Scheduled random splats, for when nobody is moving the pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub enabled: bool,
    pub interval: f32,
    pub initial_burst: u32,
    /// Displacement magnitude (uv units) before `splat_force` is applied.
    pub strength: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: 2.5,
            initial_burst: 3,
            strength: 0.02,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Short side of the velocity/pressure grid, in cells.
    pub sim_resolution: u32,
    pub dye_resolution: u32,
    /// Fraction of dye retained per step.
    pub density_dissipation: f32,
    pub velocity_dissipation: f32,
    /// Fraction of the previous pressure kept as the solver's starting guess.
    pub pressure_dissipation: f32,
    pub pressure_iterations: u32,
    pub curl_strength: f32,
    /// Gaussian radius, in hundredths of uv space squared.
    pub splat_radius: f32,
    pub splat_force: f32,
    pub palette: Vec<PaletteColor>,
    pub display_mode: DisplayMode,
    /// Upper bound on the per-frame time step, in seconds.
    pub max_dt: f32,
    pub seed: u64,
    pub tone: ToneConfig,
    pub ambient: AmbientConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sim_resolution: 128,
            dye_resolution: 512,
            density_dissipation: 0.985,
            velocity_dissipation: 0.98,
            pressure_dissipation: 0.8,
            pressure_iterations: 20,
            curl_strength: 30.,
            splat_radius: 0.25,
            splat_force: 6000.,
            palette: default_palette(),
            display_mode: DisplayMode::Light,
            max_dt: 1. / 60.,
            seed: 0x5eed,
            tone: ToneConfig::default(),
            ambient: AmbientConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn parse(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, FluidError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FluidError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| FluidError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, falling back to defaults. The error, if any, is returned
    /// alongside so the caller can log it.
    pub fn load_or_default(path: impl AsRef<Path>) -> (Self, Option<FluidError>) {
        match Self::load_from_file(path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    pub fn splat_radius_uv(&self) -> f32 {
        self.splat_radius / 100.
    }

    /// Hard errors: values the solver cannot run with.
    pub fn validate(&self) -> Result<(), FluidError> {
        let invalid = |msg: String| Err(FluidError::ConfigurationInvalid(msg));

        if self.sim_resolution == 0 || self.dye_resolution == 0 {
            return invalid(format!(
                "resolutions must be > 0 (sim {}, dye {})",
                self.sim_resolution, self.dye_resolution
            ));
        }
        if self.sim_resolution > MAX_RESOLUTION || self.dye_resolution > MAX_RESOLUTION {
            return invalid(format!(
                "resolutions must be <= {MAX_RESOLUTION} (sim {}, dye {})",
                self.sim_resolution, self.dye_resolution
            ));
        }
        if self.pressure_iterations == 0 {
            return invalid("pressure_iterations must be > 0".into());
        }
        for (name, value) in [
            ("density_dissipation", self.density_dissipation),
            ("velocity_dissipation", self.velocity_dissipation),
        ] {
            if !(value > 0. && value < 1.) {
                return invalid(format!("{name} {value} must be in (0, 1)"));
            }
        }
        if !(0. ..=1.).contains(&self.pressure_dissipation) {
            return invalid(format!(
                "pressure_dissipation {} must be in [0, 1]",
                self.pressure_dissipation
            ));
        }
        if !(self.curl_strength >= 0.) {
            return invalid(format!("curl_strength {} must be >= 0", self.curl_strength));
        }
        if !(self.splat_radius > 0.) {
            return invalid(format!("splat_radius {} must be > 0", self.splat_radius));
        }
        if !(self.splat_force > 0.) {
            return invalid(format!("splat_force {} must be > 0", self.splat_force));
        }
        if self.palette.is_empty() {
            return invalid("palette must contain at least one color".into());
        }
        if !(self.max_dt > 0.) {
            return invalid(format!("max_dt {} must be > 0", self.max_dt));
        }
        if !(self.tone.gamma > 0.) {
            return invalid(format!("tone.gamma {} must be > 0", self.tone.gamma));
        }
        if !(self.tone.alpha_threshold > 0.) {
            return invalid(format!(
                "tone.alpha_threshold {} must be > 0",
                self.tone.alpha_threshold
            ));
        }
        if self.ambient.enabled && !(self.ambient.interval > 0.) {
            return invalid(format!(
                "ambient.interval {} must be > 0",
                self.ambient.interval
            ));
        }
        Ok(())
    }

    /// Suspicious but runnable values. Callers log each with `warn!`.
    pub fn warnings(&self) -> Vec<String> {
        let mut w = Vec::new();
        if self.dye_resolution < self.sim_resolution {
            w.push(format!(
                "dye_resolution {} below sim_resolution {}; dye will look blocky",
                self.dye_resolution, self.sim_resolution
            ));
        }
        if self.sim_resolution > 512 {
            w.push(format!(
                "sim_resolution {} is very high for a per-frame CPU solve",
                self.sim_resolution
            ));
        }
        if self.pressure_iterations > 100 {
            w.push(format!(
                "pressure_iterations {} is high; convergence gains are marginal past ~50",
                self.pressure_iterations
            ));
        }
        if self.max_dt > 0.1 {
            w.push(format!(
                "max_dt {} allows large steps; advection may smear",
                self.max_dt
            ));
        }
        if self.tone.saturation < 1. {
            w.push(format!(
                "tone.saturation {} desaturates the palette",
                self.tone.saturation
            ));
        }
        if self.tone.gamma > 1. {
            w.push(format!("tone.gamma {} darkens midtones", self.tone.gamma));
        }
        w
    }
}
