use crate::sim::{SimConfig, Simulation};

fn sim() -> Simulation {
    Simulation::new(SimConfig::default()).unwrap()
}

#[test]
fn test_progress_bonus() {
    let mut sim = sim();
    // Goal starts at (20, 480). Car at distance 90, previous tick's distance
    // 100: strictly closer, clean cell, no clamp -> progress bonus.
    sim.reset_car(110.0, 480.0, 180.0);
    sim.last_distance = 100.0;

    sim.advance_tick();
    assert!((sim.last_reward() - 0.1).abs() < 1e-6);
}

#[test]
fn test_collision_overrides_progress() {
    let mut sim = sim();
    sim.reset_car(110.0, 480.0, 180.0);
    sim.last_distance = 100.0;
    sim.paint(110, 480).unwrap();

    sim.advance_tick();
    assert!((sim.last_reward() + 1.0).abs() < 1e-6);
    assert_eq!(sim.car.speed, sim.config().sand_speed);
}

#[test]
fn test_baseline_reward_without_progress() {
    let mut sim = sim();
    // reset_car pins last_distance to the current distance, so the pre-move
    // distance is not strictly smaller and the baseline penalty applies.
    sim.reset_car(250.0, 250.0, 90.0);

    sim.advance_tick();
    assert!((sim.last_reward() + 0.2).abs() < 1e-6);
}

#[test]
fn test_boundary_clamp_forces_penalty() {
    let mut sim = sim();
    // Heading 180 from x=12: every steering choice still lands past the left
    // margin, so the pose is clamped and the reward overridden.
    sim.reset_car(12.0, 250.0, 180.0);

    sim.advance_tick();
    assert_eq!(sim.car.x, 10.0);
    assert!((sim.last_reward() + 1.0).abs() < 1e-6);
}

#[test]
fn test_goal_swaps_both_ways() {
    let mut sim = sim();
    assert_eq!(sim.goal(), (20.0, 480.0));

    sim.reset_car(30.0, 470.0, 0.0);
    sim.advance_tick();
    assert_eq!(sim.goal(), (480.0, 20.0));

    sim.reset_car(470.0, 30.0, 0.0);
    sim.advance_tick();
    assert_eq!(sim.goal(), (20.0, 480.0));
}

#[test]
fn test_probe_outside_field_reads_max_density() {
    let mut sim = sim();
    // Front probe lands 30 units behind the left margin.
    sim.reset_car(15.0, 250.0, 180.0);
    let observation = sim.observation();
    assert_eq!(observation[0], 1.0);
}

#[test]
fn test_probe_reads_painted_density() {
    let mut sim = sim();
    sim.reset_car(250.0, 250.0, 0.0);
    // Clean field: all three sensors quiet.
    let observation = sim.observation();
    assert_eq!(observation[0], 0.0);
    assert_eq!(observation[1], 0.0);
    assert_eq!(observation[2], 0.0);

    // Fully brush the front probe's window at (280, 250).
    sim.paint(280, 250).unwrap();
    let observation = sim.observation();
    assert_eq!(observation[0], 1.0);
}

#[test]
fn test_observation_orientation_pair() {
    let mut sim = sim();
    sim.reset_car(250.0, 250.0, 0.0);
    let observation = sim.observation();
    assert_eq!(observation.len(), 5);
    assert_eq!(observation[3], -observation[4]);
    assert!(observation[3] >= -1.0 && observation[3] <= 1.0);
}

#[test]
fn test_paint_rejects_out_of_grid() {
    let mut sim = sim();
    assert!(sim.paint(-5, 100).is_err());
    assert!(sim.paint(100, 700).is_err());
    assert_eq!(sim.field.cells().sum(), 0.0);
}

#[test]
fn test_paint_segment_rasterizes_line() {
    let mut sim = sim();
    sim.paint_segment(100, 100, 140, 100).unwrap();

    assert!(sim.field.is_sand(120.0, 100.0));
    // Brush radius reaches rows near the line...
    assert!(sim.field.is_sand(120.0, 95.0));
    // ...but not cells far from it.
    assert!(!sim.field.is_sand(120.0, 150.0));
    assert!(!sim.field.is_sand(300.0, 300.0));
}

#[test]
fn test_clear_resets_field() {
    let mut sim = sim();
    sim.paint(250, 250).unwrap();
    assert!(sim.field.cells().sum() > 0.0);
    sim.clear();
    assert_eq!(sim.field.cells().sum(), 0.0);
}

#[test]
fn test_snapshot_mirrors_state() {
    let mut sim = sim();
    sim.reset_car(123.0, 321.0, 45.0);
    let snapshot = sim.snapshot();

    assert_eq!(snapshot.car_x, 123.0);
    assert_eq!(snapshot.car_y, 321.0);
    assert_eq!(snapshot.car_heading, 45.0);
    assert_eq!(snapshot.goal_x, 20.0);
    assert_eq!(snapshot.goal_y, 480.0);
    assert_eq!(snapshot.score, 0.0);
    assert_eq!(snapshot.sand.dim(), (500, 500));
}

#[test]
fn test_rotation_table_sets_action_count() {
    let mut config = SimConfig::default();
    config.rotations = vec![0.0, 15.0, -15.0, 45.0, -45.0];
    let sim = Simulation::new(config).unwrap();
    assert_eq!(sim.agent.action_count(), 5);

    let mut empty = SimConfig::default();
    empty.rotations.clear();
    assert!(Simulation::new(empty).is_err());
}

#[test]
fn test_margin_must_cover_sensor_window() {
    let mut config = SimConfig::default();
    config.margin = 5.0;
    assert!(Simulation::new(config).is_err());
}

#[test]
fn test_car_stays_in_bounds_over_many_ticks() {
    let mut sim = sim();
    sim.paint_segment(50, 250, 450, 250).unwrap();
    for _ in 0..200 {
        sim.advance_tick();
        assert!(sim.car.x >= 10.0 && sim.car.x <= 490.0);
        assert!(sim.car.y >= 10.0 && sim.car.y <= 490.0);
    }
    assert!(sim.score().is_finite());
}
