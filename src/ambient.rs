use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AmbientConfig;

/// A splat request that did not come from the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientSplat {
    pub point: Vec2,
    pub delta: Vec2,
}

/// Timer-driven random splats that keep the background alive when the
/// pointer is idle. Feeds the same splat path as pointer input.
pub struct AmbientSplats {
    config: AmbientConfig,
    rng: StdRng,
    /// Seconds until the next splat.
    countdown: f32,
    burst_pending: bool,
}

impl AmbientSplats {
    pub fn new(config: AmbientConfig, seed: u64) -> Self {
        Self {
            countdown: config.interval,
            config,
            rng: StdRng::seed_from_u64(seed),
            burst_pending: true,
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Advance the timer by `dt` seconds and return the splats now due: the
    /// initial burst on the first call, then at most one per call. Missed
    /// intervals (a backgrounded tab) are dropped, not replayed.
    pub fn poll(&mut self, dt: f32) -> Vec<AmbientSplat> {
        let mut due = Vec::new();
        if !self.config.enabled {
            return due;
        }

        if std::mem::take(&mut self.burst_pending) {
            for _ in 0..self.config.initial_burst {
                due.push(self.random_splat());
            }
        }

        if dt.is_finite() {
            self.countdown -= dt.max(0.);
        }
        if self.countdown <= 0. {
            self.countdown = self.config.interval;
            due.push(self.random_splat());
        }

        due
    }

    fn random_splat(&mut self) -> AmbientSplat {
        let point = Vec2::new(self.rng.gen_range(0.1..0.9), self.rng.gen_range(0.1..0.9));
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        AmbientSplat {
            point,
            delta: Vec2::from_angle(angle) * self.config.strength,
        }
    }
}
