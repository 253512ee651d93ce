use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A palette entry, either in HSL (degrees, percent, percent) or linear RGB.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PaletteColor {
    Hsl { h: f32, s: f32, l: f32 },
    Rgb { r: f32, g: f32, b: f32 },
}

impl PaletteColor {
    pub const fn hsl(h: f32, s: f32, l: f32) -> Self {
        Self::Hsl { h, s, l }
    }

    pub fn to_rgb(self) -> Vec3 {
        match self {
            PaletteColor::Hsl { h, s, l } => hsl_to_rgb(h, s / 100., l / 100.),
            PaletteColor::Rgb { r, g, b } => Vec3::new(r, g, b),
        }
    }

    fn jittered(self, rng: &mut StdRng) -> Self {
        match self {
            PaletteColor::Hsl { h, s, l } => PaletteColor::Hsl {
                h: (h + rng.gen_range(-HUE_JITTER..=HUE_JITTER)).rem_euclid(360.),
                s,
                l: (l + rng.gen_range(-LIGHTNESS_JITTER..=LIGHTNESS_JITTER)).clamp(0., 100.),
            },
            rgb => rgb,
        }
    }
}

/// Portfolio palette: Azure, Rose, Mint, Amber, Lavender.
pub fn default_palette() -> Vec<PaletteColor> {
    vec![
        PaletteColor::hsl(210., 100., 60.),
        PaletteColor::hsl(340., 82., 62.),
        PaletteColor::hsl(160., 43., 54.),
        PaletteColor::hsl(35., 92., 55.),
        PaletteColor::hsl(255., 50., 65.),
    ]
}

const HUE_JITTER: f32 = 8.;
const LIGHTNESS_JITTER: f32 = 5.;

/// Cycles through a palette on successive splats.
///
/// The cursor always advances, so two consecutive splats never share a base
/// color; HSL entries get a little hue/lightness jitter on top.
pub struct ColorGenerator {
    palette: Vec<PaletteColor>,
    cursor: usize,
    rng: StdRng,
}

impl ColorGenerator {
    pub fn new(palette: Vec<PaletteColor>, seed: u64) -> Self {
        assert!(!palette.is_empty(), "palette must not be empty");
        Self {
            palette,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn next_color(&mut self) -> Vec3 {
        let base = self.palette[self.cursor];
        self.cursor = (self.cursor + 1) % self.palette.len();
        base.jittered(&mut self.rng).to_rgb()
    }
}

/// https://en.wikipedia.org/wiki/HSL_and_HSV#HSL_to_RGB
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let c = (1. - (2. * l - 1.).abs()) * s; // Chroma
    let h_prime = (h / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());
    let m = l - c / 2.;

    let (r, g, b) = if h_prime < 1. {
        (c, x, 0.)
    } else if h_prime < 2. {
        (x, c, 0.)
    } else if h_prime < 3. {
        (0., c, x)
    } else if h_prime < 4. {
        (0., x, c)
    } else if h_prime < 5. {
        (x, 0., c)
    } else {
        (c, 0., x)
    };

    Vec3::new(r + m, g + m, b + m)
}
