use glam::{Vec3, Vec4};

use crate::config::{DisplayMode, ToneConfig};
use crate::field::Sampler;
use crate::kernels::{smoothstep, LUMA};
use crate::Viewport;

/// RGBA8 image sized to the viewport. Row 0 is the top of the screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 4]>,
}

impl Frame {
    pub fn new(viewport: Viewport) -> Self {
        let (width, height) = (viewport.width as usize, viewport.height as usize);
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.pixels[x + y * self.width]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_flattened()
    }
}

/// Tone curve for one dye texel: saturation boost, brightness gain, gamma.
/// Alpha comes from the strongest channel so empty dye is fully transparent.
pub fn tone_map(dye: Vec3, tone: &ToneConfig, mode: DisplayMode) -> Vec4 {
    let c = dye.max(Vec3::ZERO);
    let luma = c.dot(LUMA);
    let c = (Vec3::splat(luma) + (c - Vec3::splat(luma)) * tone.saturation).max(Vec3::ZERO);
    let c = c * tone.brightness(mode);
    let c = c.powf(tone.gamma).min(Vec3::ONE);

    let alpha = smoothstep(0., tone.alpha_threshold, dye.max_element());
    c.extend(alpha)
}

/// Composite the toned dye over the mode's page background.
/// Reads the dye field only; simulation state is untouched.
pub fn present(dye: Sampler<Vec3>, tone: &ToneConfig, mode: DisplayMode, out: &mut Frame) {
    let background = mode.background();
    let (w, h) = (out.width as f32, out.height as f32);
    let width = out.width;

    for (i, pixel) in out.pixels.iter_mut().enumerate() {
        let (x, y) = (i % width, i / width);
        let uv = glam::Vec2::new((x as f32 + 0.5) / w, 1. - (y as f32 + 0.5) / h);
        let toned = tone_map(dye.sample(uv), tone, mode);
        let rgb = background.lerp(toned.truncate(), toned.w);
        *pixel = to_rgba8(rgb);
    }
}

fn to_rgba8(rgb: Vec3) -> [u8; 4] {
    let c = (rgb.clamp(Vec3::ZERO, Vec3::ONE) * 255.).round();
    [c.x as u8, c.y as u8, c.z as u8, 255]
}
