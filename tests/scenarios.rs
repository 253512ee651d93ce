use cursor_fluid::field::Field;
use cursor_fluid::kernels::mean_abs_divergence;
use cursor_fluid::pipeline::Pipeline;
use cursor_fluid::{FluidSim, InputAdapter, SimConfig, Stage, Viewport};
use glam::{Vec2, Vec3};

fn grid_config(resolution: u32) -> SimConfig {
    SimConfig {
        sim_resolution: resolution,
        dye_resolution: resolution,
        ..Default::default()
    }
}

#[test]
fn single_splat_decays_with_dissipation() {
    let config = SimConfig {
        density_dissipation: 0.98,
        ..grid_config(64)
    };
    let mut sim = FluidSim::new(Viewport::new(64, 64), config).unwrap();
    assert_eq!(sim.dye().size(), (64, 64));

    sim.splat(Vec2::splat(0.5), Vec2::ZERO, Vec3::X);
    sim.step(1. / 60.);
    let cell = (32, 32);
    let initial = sim.dye()[cell].x;
    assert!(initial > 0.9, "splat too weak: {initial}");

    for _ in 0..100 {
        sim.step(1. / 60.);
    }

    let ratio = sim.dye()[cell].x / initial;
    let expected = 0.98f32.powi(100);
    assert!(ratio < 0.133, "{ratio}");
    assert!((ratio - expected).abs() < expected * 1e-3, "{ratio} vs {expected}");

    // No velocity was ever injected
    assert!(sim.velocity().texels().iter().all(|&v| v == Vec2::ZERO));
}

#[test]
fn pointer_events_within_a_frame_coalesce() {
    let viewport = Viewport::new(100, 100);
    let mut sim = FluidSim::new(viewport, grid_config(32)).unwrap();
    let mut input = InputAdapter::new(viewport);

    input.pointer_move(sim.pointer_mut(), 50., 50.);
    sim.step(1. / 60.);
    assert!(!sim.last_trace().contains(&Stage::Splatting));

    input.pointer_move(sim.pointer_mut(), 60., 50.);
    input.pointer_move(sim.pointer_mut(), 60., 40.);
    sim.step(1. / 60.);

    let splats = sim
        .last_trace()
        .iter()
        .filter(|&&s| s == Stage::Splatting)
        .count();
    assert_eq!(splats, 1);
    assert_eq!(sim.last_splats().len(), 1);

    let splat = sim.last_splats()[0];
    assert!(splat.point.abs_diff_eq(Vec2::new(0.6, 0.6), 1e-6), "{splat:?}");
    assert!(splat.delta.abs_diff_eq(Vec2::new(0., 0.1), 1e-6), "{splat:?}");

    // Drained: the next frame has nothing to inject
    sim.step(1. / 60.);
    assert!(sim.last_splats().is_empty());
}

#[test]
fn duplicate_pointer_event_still_splats() {
    let viewport = Viewport::new(100, 100);
    let mut sim = FluidSim::new(viewport, grid_config(32)).unwrap();
    let mut input = InputAdapter::new(viewport);

    input.pointer_move(sim.pointer_mut(), 50., 50.);
    sim.step(1. / 60.);

    // Browsers repeat the last position on some events
    input.pointer_move(sim.pointer_mut(), 60., 50.);
    input.pointer_move(sim.pointer_mut(), 60., 50.);
    sim.step(1. / 60.);

    assert_eq!(sim.last_splats().len(), 1);
    let splat = sim.last_splats()[0];
    assert!(splat.point.abs_diff_eq(Vec2::new(0.6, 0.5), 1e-6), "{splat:?}");
    assert!(splat.delta.abs_diff_eq(Vec2::new(0.1, 0.), 1e-6), "{splat:?}");
    assert!(sim.velocity().peak().0 > 0.);
}

/// Outward flow from the centre, windowed so it fades before the walls.
fn radial_source(n: usize) -> Field<Vec2> {
    let mut velocity = Field::allocate(n, n).unwrap();
    let centre = Vec2::splat(0.5);
    let (w, h) = velocity.size();
    velocity.fill_with(|x, y| {
        let p = Vec2::new((x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32) - centre;
        p * (-p.length_squared() / 0.02).exp() * 100.
    });
    velocity
}

/// Divergence, `iterations` Jacobi steps from a zero guess, gradient subtract.
fn project(velocity: &Field<Vec2>, iterations: u32) -> Field<Vec2> {
    let p = Pipeline::default();
    let (w, h) = velocity.size();
    let mut divergence = Field::allocate(w, h).unwrap();
    let mut pressure = cursor_fluid::DoubleBuffer::<f32>::allocate(w, h).unwrap();
    let mut out = Field::allocate(w, h).unwrap();

    p.divergence.run(velocity, &mut divergence);
    p.clear.run(&pressure.read, &mut pressure.write, 0.8);
    pressure.swap();
    for _ in 0..iterations {
        p.jacobi.run(&pressure.read, &divergence, &mut pressure.write);
        pressure.swap();
    }
    p.gradient_subtract.run(&pressure.read, velocity, &mut out);
    out
}

#[test]
fn pressure_solve_converges_with_iterations() {
    let velocity = radial_source(32);
    let before = mean_abs_divergence(&velocity);

    let residuals: Vec<f32> = [5, 20, 50]
        .into_iter()
        .map(|n| mean_abs_divergence(&project(&velocity, n)))
        .collect();

    assert!(residuals[0] < before, "{before} -> {residuals:?}");
    assert!(
        residuals.windows(2).all(|w| w[1] <= w[0]),
        "not monotone: {residuals:?}"
    );
    // 50 iterations should remove well over half of it
    assert!(residuals[2] < before * 0.5, "{before} -> {residuals:?}");
}
