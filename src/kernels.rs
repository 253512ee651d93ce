//! Per-cell stage kernels.
//!
//! Each kernel is a full-grid pass: it reads only from samplers and writes
//! only into `out`, so every cell is independent of every other cell written
//! in the same pass. Grid row 0 is the bottom edge; "top" means `y + 1`.

use glam::{Vec2, Vec3};

use crate::field::{Field, Sampler, Texel};

/// Guards normalization of the vorticity gradient in flat regions.
pub const VORTICITY_EPSILON: f32 = 1e-4;

/// Luma weights used by the saturation boost.
pub const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Clamped left/right/bottom/top neighbours of a cell.
#[inline]
fn neighbours<T: Texel>(s: &Sampler<T>, x: usize, y: usize) -> (T, T, T, T) {
    let (x, y) = (x as isize, y as isize);
    (
        s.fetch(x - 1, y),
        s.fetch(x + 1, y),
        s.fetch(x, y - 1),
        s.fetch(x, y + 1),
    )
}

/// Adds `impulse * exp(-d² / radius)` to every cell, `d` measured in uv space
/// with x scaled by `aspect_ratio` so the footprint stays circular.
pub fn splat<T: Texel>(
    target: Sampler<T>,
    out: &mut Field<T>,
    point: Vec2,
    impulse: T,
    radius: f32,
    aspect_ratio: f32,
) {
    let size = target.field().size();
    debug_assert_eq!(size, out.size());
    let field = target.field();

    out.fill_with(|x, y| {
        let mut p = field.cell_uv(x, y) - point;
        p.x *= aspect_ratio;
        let falloff = (-p.length_squared() / radius).exp();
        field[(x, y)] + impulse * falloff
    });
}

/// Scalar curl of the velocity field by central differences.
pub fn curl(velocity: Sampler<Vec2>, out: &mut Field<f32>) {
    out.fill_with(|x, y| {
        let (l, r, b, t) = neighbours(&velocity, x, y);
        0.5 * ((r.y - l.y) - (t.x - b.x))
    });
}

/// Vorticity confinement: pushes velocity along the rotated, normalized
/// gradient of `|curl|`, scaled by `strength * curl`.
pub fn vorticity(
    velocity: Sampler<Vec2>,
    curl: Sampler<f32>,
    out: &mut Field<Vec2>,
    strength: f32,
    dt: f32,
) {
    out.fill_with(|x, y| {
        let (l, r, b, t) = neighbours(&curl, x, y);
        let c = curl.fetch(x as isize, y as isize);

        let mut force = 0.5 * Vec2::new(t.abs() - b.abs(), r.abs() - l.abs());
        force /= force.length() + VORTICITY_EPSILON;
        force *= strength * c;
        force.y = -force.y;

        velocity.fetch(x as isize, y as isize) + force * dt
    });
}

/// Central-difference divergence. The grid border is a solid wall: a
/// neighbour outside the grid mirrors the cell's velocity with the normal
/// component negated, so nothing flows through the edge.
pub fn divergence(velocity: Sampler<Vec2>, out: &mut Field<f32>) {
    out.fill_with(|x, y| divergence_at(&velocity, x, y));
}

fn divergence_at(velocity: &Sampler<Vec2>, x: usize, y: usize) -> f32 {
    let (w, h) = velocity.field().size();
    let c = velocity.fetch(x as isize, y as isize);
    let (l, r, b, t) = neighbours(velocity, x, y);

    let l = if x == 0 { -c.x } else { l.x };
    let r = if x + 1 == w { -c.x } else { r.x };
    let b = if y == 0 { -c.y } else { b.y };
    let t = if y + 1 == h { -c.y } else { t.y };

    0.5 * (r - l + t - b)
}

/// Scale the previous pressure, the starting guess for the next solve.
pub fn clear<T: Texel>(source: Sampler<T>, out: &mut Field<T>, factor: f32) {
    let field = source.field();
    out.fill_with(|x, y| field[(x, y)] * factor);
}

/// One Jacobi relaxation step of the pressure Poisson equation.
pub fn jacobi(pressure: Sampler<f32>, divergence: Sampler<f32>, out: &mut Field<f32>) {
    out.fill_with(|x, y| {
        let (l, r, b, t) = neighbours(&pressure, x, y);
        let div = divergence.fetch(x as isize, y as isize);
        (l + r + b + t - div) * 0.25
    });
}

/// Subtract the pressure gradient, leaving an approximately divergence-free
/// velocity.
pub fn gradient_subtract(pressure: Sampler<f32>, velocity: Sampler<Vec2>, out: &mut Field<Vec2>) {
    out.fill_with(|x, y| {
        let (l, r, b, t) = neighbours(&pressure, x, y);
        velocity.fetch(x as isize, y as isize) - 0.5 * Vec2::new(r - l, t - b)
    });
}

/// Semi-Lagrangian advection: trace each cell back along the velocity for
/// one explicit Euler step, sample the source there and apply dissipation.
///
/// `velocity` is in velocity-grid texels per second; `out` may have a
/// different resolution than `velocity` (the dye grid).
pub fn advect<T: Texel>(
    velocity: Sampler<Vec2>,
    source: Sampler<T>,
    out: &mut Field<T>,
    dt: f32,
    dissipation: f32,
) {
    let texel = velocity.texel_size();
    let (w, h) = out.size();
    out.fill_with(|x, y| {
        let uv = Vec2::new((x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32);
        let coord = uv - dt * velocity.sample(uv) * texel;
        source.sample(coord) * dissipation
    });
}

/// Rescale advected dye so the total never exceeds `dissipation` times the
/// total before the pass. Bilinear back-tracing through a partly projected
/// flow, and clamping at the walls, can otherwise create dye.
pub fn limit_mass(source: &Field<Vec3>, out: &mut Field<Vec3>, dissipation: f32) {
    let budget = dissipation * source.total().element_sum();
    let total = out.total().element_sum();
    if total <= budget || total <= 0. {
        return;
    }

    let scale = (budget / total).max(0.);
    for texel in out.texels_mut() {
        *texel *= scale;
    }
}

/// Mean absolute divergence of a velocity field, with the same wall rule as
/// [`divergence`]. Used to measure how well projection worked.
pub fn mean_abs_divergence(velocity: &Field<Vec2>) -> f32 {
    let (w, h) = velocity.size();
    let s = velocity.sampler();
    let total: f32 = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| divergence_at(&s, x, y).abs())
        .sum();
    total / (w * h) as f32
}

/// Hermite smoothstep, as in GLSL.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0., 1.);
    t * t * (3. - 2. * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn field_from<T: Texel>(w: usize, h: usize, f: impl FnMut(usize, usize) -> T) -> Field<T> {
        let mut field = Field::allocate(w, h).unwrap();
        field.fill_with(f);
        field
    }

    #[test]
    fn splat_peaks_at_point_and_adds_to_existing() {
        let base = field_from(32, 32, |_, _| 1.0f32);
        let mut out = Field::allocate(32, 32).unwrap();
        let point = base.cell_uv(16, 16);
        splat(base.sampler(), &mut out, point, 2., 0.0025, 1.);

        assert_approx_eq!(out[(16, 16)], 3., 1e-6);
        assert!(out[(17, 16)] < out[(16, 16)]);
        assert!(out[(0, 0)] >= 1.);
        assert_approx_eq!(out[(0, 0)], 1., 1e-6);
    }

    #[test]
    fn splat_is_circular_under_aspect_correction() {
        // 64x32 grid on a 2:1 viewport: cells are square on screen.
        let base = Field::<f32>::allocate(64, 32).unwrap();
        let mut out = Field::allocate(64, 32).unwrap();
        splat(base.sampler(), &mut out, Vec2::new(0.5, 0.5), 1., 0.01, 2.);

        // Four cells right of centre vs four cells above centre
        let right = out[(36, 16)];
        let up = out[(32, 20)];
        assert_approx_eq!(right, up, 1e-5);
    }

    #[test]
    fn splat_far_outside_is_negligible() {
        let base = Field::<Vec3>::allocate(16, 16).unwrap();
        let mut out = Field::allocate(16, 16).unwrap();
        splat(base.sampler(), &mut out, Vec2::new(5., -3.), Vec3::ONE, 0.0025, 1.);
        assert!(out.texels().iter().all(|t| t.max_element() < 1e-12));
    }

    #[test]
    fn curl_of_rigid_rotation_is_uniform() {
        // v = (-y, x) has curl 2 per unit; central differences over one cell
        // give exactly 2 in the interior.
        let vel = field_from(8, 8, |x, y| Vec2::new(-(y as f32), x as f32));
        let mut out = Field::allocate(8, 8).unwrap();
        curl(vel.sampler(), &mut out);
        assert_approx_eq!(out[(4, 4)], 2., 1e-6);
        assert_approx_eq!(out[(2, 5)], 2., 1e-6);
    }

    #[test]
    fn vorticity_is_inert_without_rotation() {
        let vel = field_from(8, 8, |_, _| Vec2::new(1., 0.5));
        let curl_field = Field::<f32>::allocate(8, 8).unwrap();
        let mut out = Field::allocate(8, 8).unwrap();
        vorticity(vel.sampler(), curl_field.sampler(), &mut out, 30., 1. / 60.);
        assert!(out.texels().iter().all(|&v| v == Vec2::new(1., 0.5)));
    }

    #[test]
    fn vorticity_pushes_towards_stronger_rotation() {
        // |curl| grows with x; the force is perpendicular to that gradient.
        let vel = Field::<Vec2>::allocate(8, 8).unwrap();
        let curl_field = field_from(8, 8, |x, _| x as f32);
        let mut out = Field::allocate(8, 8).unwrap();
        vorticity(vel.sampler(), curl_field.sampler(), &mut out, 1., 1.);

        let v = out[(4, 4)];
        assert_approx_eq!(v.x, 0., 1e-6);
        // gradient (0, 1) * curl 4, then y negated
        assert_approx_eq!(v.y, -4. / (1. + VORTICITY_EPSILON), 1e-4);
    }

    #[test]
    fn divergence_of_linear_source() {
        let vel = field_from(8, 8, |x, y| Vec2::new(x as f32, y as f32));
        let mut out = Field::allocate(8, 8).unwrap();
        divergence(vel.sampler(), &mut out);
        assert_approx_eq!(out[(3, 4)], 2., 1e-6);
    }

    #[test]
    fn walls_make_total_divergence_vanish() {
        let vel = field_from(10, 7, |x, y| Vec2::new((x * y) as f32 * 0.1, x as f32 - 3.));
        let mut out = Field::allocate(10, 7).unwrap();
        divergence(vel.sampler(), &mut out);
        assert_approx_eq!(out.total(), 0., 1e-4);
    }

    #[test]
    fn jacobi_fixed_point_for_zero_divergence() {
        let p = field_from(6, 6, |_, _| 3.0f32);
        let div = Field::<f32>::allocate(6, 6).unwrap();
        let mut out = Field::allocate(6, 6).unwrap();
        jacobi(p.sampler(), div.sampler(), &mut out);
        assert!(out.texels().iter().all(|&v| v == 3.));
    }

    #[test]
    fn gradient_subtract_removes_linear_pressure_gradient() {
        let p = field_from(8, 8, |x, _| 2. * x as f32);
        let vel = field_from(8, 8, |_, _| Vec2::new(2., 1.));
        let mut out = Field::allocate(8, 8).unwrap();
        gradient_subtract(p.sampler(), vel.sampler(), &mut out);
        assert_approx_eq!(out[(4, 4)].x, 0., 1e-6);
        assert_approx_eq!(out[(4, 4)].y, 1., 1e-6);
    }

    #[test]
    fn clear_scales_every_cell() {
        let p = field_from(4, 4, |x, y| (x + y) as f32);
        let mut out = Field::allocate(4, 4).unwrap();
        clear(p.sampler(), &mut out, 0.8);
        assert_approx_eq!(out[(3, 3)], 4.8, 1e-6);
    }

    #[test]
    fn advect_without_velocity_only_dissipates() {
        let vel = Field::<Vec2>::allocate(8, 8).unwrap();
        let dye = field_from(16, 16, |x, y| Vec3::new(x as f32, y as f32, 1.));
        let mut out = Field::allocate(16, 16).unwrap();
        advect(vel.sampler(), dye.sampler(), &mut out, 1. / 60., 0.5);
        for (a, b) in out.texels().iter().zip(dye.texels()) {
            assert!(a.abs_diff_eq(*b * 0.5, 1e-5));
        }
    }

    #[test]
    fn advect_moves_content_downstream() {
        // One texel per step to the right.
        let vel = field_from(16, 16, |_, _| Vec2::new(1., 0.));
        let mut src = Field::<f32>::allocate(16, 16).unwrap();
        src[(5, 8)] = 1.;
        let mut out = Field::allocate(16, 16).unwrap();
        advect(vel.sampler(), src.sampler(), &mut out, 1., 1.);
        assert_approx_eq!(out[(6, 8)], 1., 1e-5);
        assert_approx_eq!(out[(5, 8)], 0., 1e-5);
    }

    #[test]
    fn advect_clamps_at_edges() {
        // Flow to the right: the left column samples beyond the edge.
        let vel = field_from(8, 8, |_, _| Vec2::new(4., 0.));
        let src = field_from(8, 8, |x, _| if x == 0 { 2. } else { 0.0f32 });
        let mut out = Field::allocate(8, 8).unwrap();
        advect(vel.sampler(), src.sampler(), &mut out, 1., 1.);
        assert_approx_eq!(out[(0, 3)], 2., 1e-6);
    }

    #[test]
    fn limit_mass_scales_down_to_budget() {
        let source = field_from(4, 4, |_, _| Vec3::splat(1.));
        let mut out = field_from(4, 4, |x, _| Vec3::splat(if x == 0 { 3. } else { 1. }));
        limit_mass(&source, &mut out, 0.5);
        assert_approx_eq!(out.total().element_sum(), 0.5 * 48., 1e-3);
        // Shape is kept
        assert_approx_eq!(out[(0, 2)].x, 3. * out[(1, 2)].x, 1e-5);
    }

    #[test]
    fn limit_mass_leaves_decaying_dye_alone() {
        let source = field_from(4, 4, |_, _| Vec3::splat(1.));
        let mut out = field_from(4, 4, |_, _| Vec3::splat(0.25));
        let expected = out.clone();
        limit_mass(&source, &mut out, 0.5);
        assert_eq!(out, expected);
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(0., 1., -1.), 0.);
        assert_eq!(smoothstep(0., 1., 2.), 1.);
        assert_eq!(smoothstep(0., 1., 0.5), 0.5);
    }
}
