use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;

use gravsim::{
    Body, BodyConfig, BodyId, BodyKind, BodyRef, Integrator, NVec2, OrbitSpec, Parameters,
    Scenario, ScenarioConfig, SimError, Simulation,
};

/// Simulation over `[0, 2)` with step 0.25: eight snapshots per run
pub fn quarter_step_sim() -> (Simulation, BodyId, BodyId) {
    let mut sim = Simulation::new(Parameters::new(0.25, 2.0)).unwrap();
    let a = sim
        .add(Body::at_rest(NVec2::new(-1.0, 0.0), 1.0).unwrap().with_label("a"))
        .unwrap();
    let b = sim
        .add(Body::new(NVec2::new(1.0, 0.0), NVec2::new(0.0, 0.5), 1.0).unwrap().with_label("b"))
        .unwrap();
    (sim, a, b)
}

/// Fresh path in the system temp directory; the file is not created
pub fn scratch_path(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("gravsim-{}-{n}-{name}", std::process::id()))
}

// ==================================================================================
// Schedule and history tests
// ==================================================================================

#[test]
fn run_records_one_snapshot_per_instant() {
    let (mut sim, _, _) = quarter_step_sim();
    sim.run().unwrap();

    let instants = sim.instants();
    assert_eq!(instants, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75]);
    assert!(instants.windows(2).all(|w| w[0] < w[1]));
    assert!(sim.was_run());
}

#[test]
fn window_length_rounds_up() {
    let mut sim = Simulation::new(Parameters::new(0.3, 1.0)).unwrap();
    sim.add(Body::at_rest(NVec2::zeros(), 1.0).unwrap()).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.history().len(), 4);
    assert!(sim.history().last_instant().unwrap() < 1.0);
}

#[test]
fn window_end_is_never_recorded() {
    // 2.1 / 0.3 rounds to just above 7
    let mut sim = Simulation::new(Parameters::new(0.3, 2.1)).unwrap();
    sim.add(Body::at_rest(NVec2::zeros(), 1.0).unwrap()).unwrap();
    sim.run().unwrap();

    assert_eq!(sim.history().len(), 7);
    assert!(sim.history().last_instant().unwrap() < 2.1);
    assert_eq!(sim.final_instant(), 2.1);

    sim.run().unwrap();
    assert_eq!(sim.history().len(), 14);
}

#[test]
fn first_snapshot_is_the_initial_state() {
    let (mut sim, _, b) = quarter_step_sim();
    let before = sim.body(b).unwrap().state();
    sim.run().unwrap();

    let first = sim.query(b, 0.0).unwrap();
    assert_eq!(first.x, before.x);
    assert_eq!(first.v, before.v);
    assert_ne!(sim.body(b).unwrap().x, before.x);
}

#[test]
fn second_run_extends_the_history() {
    let (mut sim, a, _) = quarter_step_sim();
    sim.run().unwrap();
    let first_run = sim.history().snapshots().to_vec();

    sim.run().unwrap();

    assert_eq!(sim.history().len(), 16);
    assert_eq!(&sim.history().snapshots()[..8], first_run.as_slice());
    assert_eq!(sim.history().instant(8), Some(2.0));
    assert_eq!(sim.final_instant(), 4.0);
    assert!(sim.query(a, 3.9).is_ok());
}

#[test]
fn rewind_replays_the_same_history() {
    let params = Parameters::new(0.25, 2.0).with_gravitational_constant(3.0);
    let mut sim = Simulation::new(params.clone()).unwrap();
    let a = sim.add(Body::at_rest(NVec2::new(-1.0, 0.0), 1.0).unwrap()).unwrap();
    sim.add(Body::at_rest(NVec2::new(1.0, 0.0), 2.0).unwrap()).unwrap();

    sim.run().unwrap();
    let recorded = sim.history().snapshots().to_vec();

    sim.rewind();
    assert!(!sim.was_run());
    assert_eq!(sim.len(), 2);
    assert_eq!(sim.parameters(), &params);
    assert_eq!(sim.body(a).unwrap().x, NVec2::new(-1.0, 0.0));

    sim.run().unwrap();
    assert_eq!(sim.history().snapshots(), recorded.as_slice());
}

#[test]
fn reset_restores_defaults() {
    let params = Parameters::new(0.25, 2.0).with_gravitational_constant(6.0);
    let mut sim = Simulation::new(params).unwrap();
    sim.add(Body::at_rest(NVec2::zeros(), 1.0).unwrap()).unwrap();
    sim.run().unwrap();
    let kept = sim.history().clone();

    sim.reset();

    assert!(sim.is_empty());
    assert!(!sim.was_run());
    assert_eq!(sim.parameters(), &Parameters::default());
    assert_eq!(sim.gravitational_constant(), 1.0);
    assert_eq!(kept.len(), 8);
}

#[test]
fn run_without_bodies_fails() {
    let mut sim = Simulation::default();
    assert!(matches!(sim.run(), Err(SimError::EmptySimulation)));
}

#[test]
fn invalid_parameters_are_rejected() {
    for params in [
        Parameters::new(0.0, 1.0),
        Parameters::new(-0.1, 1.0),
        Parameters::new(0.1, 0.0),
        Parameters::new(f64::NAN, 1.0),
    ] {
        let err = Simulation::new(params).err().unwrap();
        assert!(matches!(err, SimError::InvalidValue(_)));
    }
}

// ==================================================================================
// Query tests
// ==================================================================================

#[test]
fn query_before_run_fails() {
    let (sim, a, _) = quarter_step_sim();
    assert!(matches!(sim.query(a, 0.0), Err(SimError::SimulationNotRun)));
}

#[test]
fn query_picks_the_nearest_snapshot() {
    let (mut sim, _, b) = quarter_step_sim();
    sim.run().unwrap();
    let history = sim.history();

    let at = |step: usize| *history.get(step).unwrap().find(b).unwrap();
    assert_eq!(sim.query(b, 0.3).unwrap(), at(1));
    assert_eq!(sim.query(b, 0.45).unwrap(), at(2));
    // halfway between two instants goes to the earlier one
    assert_eq!(sim.query(b, 0.125).unwrap(), at(0));
    // the end of the window maps to the last snapshot
    assert_eq!(sim.query(b, 2.0).unwrap(), at(7));
}

#[test]
fn query_is_repeatable() {
    let (mut sim, a, _) = quarter_step_sim();
    sim.run().unwrap();

    let first = sim.query(a, 1.1).unwrap();
    let second = sim.query(a, 1.1).unwrap();
    assert_eq!(first, second);
}

#[test]
fn query_outside_the_window_fails() {
    let (mut sim, a, _) = quarter_step_sim();
    sim.run().unwrap();

    for t in [-0.1, 2.01, f64::NAN] {
        let err = sim.query(a, t).unwrap_err();
        assert!(matches!(err, SimError::OutOfRange { .. }), "t = {t}");
    }
}

#[test]
fn query_for_a_detached_body_fails() {
    let (mut sim, _, _) = quarter_step_sim();
    sim.run().unwrap();
    let stranger = Body::at_rest(NVec2::zeros(), 1.0).unwrap();

    let err = sim.query(stranger.id(), 1.0).unwrap_err();
    assert!(matches!(err, SimError::InvalidReference(_)));
}

#[test]
fn track_follows_a_body_through_the_history() {
    let (mut sim, _, b) = quarter_step_sim();
    sim.run().unwrap();

    let track = sim.track("b").unwrap();
    assert_eq!(track.len(), 8);
    assert_eq!(track[3].0, 0.75);
    assert!(track.iter().all(|(_, state)| state.id == b));
}

// ==================================================================================
// Body reference tests
// ==================================================================================

#[test]
fn references_agree_on_the_same_body() {
    let (mut sim, _, b) = quarter_step_sim();
    sim.add(Body::at_rest(NVec2::new(0.0, 5.0), 1.0).unwrap().with_label("b"))
        .unwrap();

    let by_handle = sim.resolve(&sim.bodies()[1]).unwrap();
    assert_eq!(sim.resolve(b).unwrap(), Some(1));
    assert_eq!(sim.resolve(1usize).unwrap(), Some(1));
    // duplicated labels resolve to the first attached body
    assert_eq!(sim.resolve("b").unwrap(), Some(1));
    assert_eq!(by_handle, Some(1));
}

#[test]
fn empty_reference_resolves_to_nothing() {
    let (sim, _, _) = quarter_step_sim();

    assert_eq!(sim.resolve(BodyRef::None).unwrap(), None);
    assert_eq!(sim.resolve(None::<&str>).unwrap(), None);
}

#[test]
fn unknown_references_fail() {
    let (sim, _, _) = quarter_step_sim();
    let stranger = Body::at_rest(NVec2::zeros(), 1.0).unwrap();

    assert!(matches!(sim.resolve("pluto"), Err(SimError::UnknownLabel(l)) if l == "pluto"));
    assert!(matches!(sim.resolve(7usize), Err(SimError::InvalidReference(_))));
    assert!(matches!(sim.resolve(&stranger), Err(SimError::InvalidReference(_))));
}

// ==================================================================================
// Add tests
// ==================================================================================

#[test]
fn batch_add_skips_invalid_items() {
    let mut sim = Simulation::default();
    let a = Body::at_rest(NVec2::new(0.0, 0.0), 1.0).unwrap();
    let b = Body::at_rest(NVec2::new(1.0, 0.0), 1.0).unwrap();
    let (ida, idb) = (a.id(), b.id());

    let report = sim.add_all(vec![Some(a), None, Some(b)]);

    assert_eq!(report.added, vec![ida, idb]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].position, 1);
    assert!(matches!(report.rejected[0].error, SimError::InvalidValue(_)));
    assert_eq!(sim.len(), 2);
}

#[test]
fn batch_add_reports_construction_errors() {
    let mut sim = Simulation::default();

    let report = sim.add_all([
        Body::at_rest(NVec2::zeros(), 1.0),
        Body::at_rest(NVec2::new(1.0, 0.0), -1.0),
    ]);

    assert!(!report.is_clean());
    assert_eq!(report.added.len(), 1);
    assert_eq!(report.rejected[0].position, 1);
}

#[test]
fn batch_add_accepts_body_configs() {
    let bodies: Vec<BodyConfig> = serde_yaml::from_str(
        r#"
- { label: sun, x: [0.0, 0.0], m: 5.0, shape: { kind: circle, radius: 0.5 } }
- { x: [1.0, 2.0], v: [0.5] }
- { label: comet, x: [3.0, 0.0], v: [0.0, -1.0], charge: 2.0 }
"#,
    )
    .unwrap();
    let mut sim = Simulation::default();

    let report = sim.add_all(bodies);

    assert_eq!(report.added.len(), 2);
    assert_eq!(report.rejected[0].position, 1);
    let sun = &sim.bodies()[0];
    assert_eq!(sun.mass(), 5.0);
    assert_eq!(sun.kind, BodyKind::Circle { radius: 0.5 });
    let comet = &sim.bodies()[1];
    assert_eq!(comet.label(), Some("comet"));
    assert_eq!(comet.charge, 2.0);
    assert_eq!(comet.mass(), 1.0);
}

#[test]
fn add_rejects_non_finite_state() {
    let mut sim = Simulation::default();

    let nan = Body::at_rest(NVec2::new(f64::NAN, 0.0), 1.0).unwrap();
    assert!(matches!(sim.add(nan), Err(SimError::InvalidValue(_))));
    let fast = Body::new(NVec2::zeros(), NVec2::new(f64::INFINITY, 0.0), 1.0).unwrap();
    assert!(matches!(sim.add(fast), Err(SimError::InvalidValue(_))));
    assert!(sim.is_empty());
}

#[test]
fn clones_are_new_bodies() {
    let mut center = Body::at_rest(NVec2::zeros(), 1.0).unwrap().with_label("sun");
    let _planet = center
        .satellite(NVec2::new(1.0, 0.0), 0.0, OrbitSpec::circular(true))
        .unwrap();

    let copy = center.clone();

    assert_ne!(copy.id(), center.id());
    assert_eq!(copy.x, center.x);
    assert_eq!(copy.label(), Some("sun"));
    assert!(copy.pending_orbits().is_empty());
    assert_eq!(center.pending_orbits().len(), 1);

    let mut sim = Simulation::default();
    let report = sim.add_all([center, copy]);
    assert!(report.is_clean());
    assert_eq!(sim.pending_orbits().len(), 1);
}

#[test]
fn failed_orbit_does_not_attach_the_satellite() {
    let mut sim = Simulation::default();
    let sat = Body::at_rest(NVec2::zeros(), 0.0).unwrap();
    let mut center = Body::at_rest(NVec2::zeros(), 1.0).unwrap();
    center
        .defer_satellite(sat.id(), OrbitSpec::circular(true))
        .unwrap();
    let sid = sat.id();
    sim.add(center).unwrap();

    let report = sim.add_all([sat]);

    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        report.rejected[0].error,
        SimError::DegenerateConfiguration(_)
    ));
    assert!(!sim.contains(sid));
    assert_eq!(sim.len(), 1);
    assert_eq!(sim.pending_orbits().len(), 1);
}

#[test]
fn failed_orbit_undoes_the_orbits_already_set() {
    let mut sim = Simulation::default();
    let good = Body::at_rest(NVec2::new(1.0, 0.0), 0.0).unwrap();
    let bad = Body::at_rest(NVec2::zeros(), 0.0).unwrap();
    let mut center = Body::at_rest(NVec2::zeros(), 1.0).unwrap();
    center
        .defer_satellite(good.id(), OrbitSpec::circular(true))
        .unwrap();
    center
        .defer_satellite(bad.id(), OrbitSpec::circular(true))
        .unwrap();
    let (gid, cid) = (good.id(), center.id());
    sim.add(good).unwrap();
    sim.add(bad).unwrap();

    let err = sim.add(center).unwrap_err();

    assert!(matches!(err, SimError::DegenerateConfiguration(_)));
    assert!(!sim.contains(cid));
    assert_eq!(sim.len(), 2);
    assert_eq!(sim.body(gid).unwrap().v, NVec2::zeros());
    assert!(sim.pending_orbits().is_empty());
}

// ==================================================================================
// Orbit resolution tests
// ==================================================================================

#[test]
fn deferred_orbit_resolves_when_both_bodies_join() {
    let mut sim = Simulation::new(Parameters::default().with_gravitational_constant(4.0)).unwrap();
    let mut center = Body::at_rest(NVec2::zeros(), 1.0).unwrap();
    let sat = center
        .satellite(NVec2::new(1.0, 0.0), 0.0, OrbitSpec::circular(true))
        .unwrap();
    let (cid, sid) = (center.id(), sat.id());

    sim.add(sat).unwrap();
    assert_eq!(sim.body(sid).unwrap().v, NVec2::zeros());

    sim.add(center).unwrap();

    assert_relative_eq!(sim.body(sid).unwrap().v, NVec2::new(0.0, -2.0), epsilon = 1e-12);
    assert!(sim.pending_orbits().is_empty());
    assert!(sim.body(cid).unwrap().pending_orbits().is_empty());
}

#[test]
fn orbit_stays_pending_without_its_satellite() {
    let mut sim = Simulation::new(Parameters::new(0.1, 1.0)).unwrap();
    let mut center = Body::at_rest(NVec2::zeros(), 1.0).unwrap();
    let _unused = center
        .satellite(NVec2::new(1.0, 0.0), 0.0, OrbitSpec::circular(true))
        .unwrap();

    sim.add(center).unwrap();

    assert_eq!(sim.pending_orbits().len(), 1);
    sim.run().unwrap();
}

/// Sun, planet and moon whose orbits are all deferred
fn nested_system() -> [Body; 3] {
    let mut sun = Body::at_rest(NVec2::zeros(), 1000.0).unwrap();
    let mut planet = sun
        .satellite(NVec2::new(10.0, 0.0), 1.0, OrbitSpec::circular(false))
        .unwrap();
    let moon = planet
        .satellite(NVec2::new(11.0, 0.0), 0.0, OrbitSpec::circular(false))
        .unwrap();
    [sun, planet, moon]
}

#[test]
fn nested_orbits_resolve_in_any_attach_order() {
    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]] {
        let system = nested_system().map(Some);
        let ids: Vec<BodyId> = system.iter().flatten().map(Body::id).collect();
        let mut system = system;
        let mut sim = Simulation::default();
        for i in order {
            let body = system[i].take().unwrap();
            sim.add(body).unwrap();
        }

        // planet: sqrt(1000 / 10), moon: sqrt(1 / 1) on top of the planet
        let planet = sim.body(ids[1]).unwrap().v;
        let moon = sim.body(ids[2]).unwrap().v;
        assert_relative_eq!(planet, NVec2::new(0.0, 10.0), epsilon = 1e-12);
        assert_relative_eq!(moon, NVec2::new(0.0, 11.0), epsilon = 1e-12);
        assert!(sim.pending_orbits().is_empty(), "order {:?}", order);
    }
}

#[test]
fn immediate_satellite_uses_the_simulation_constant() {
    let mut sim = Simulation::new(Parameters::default().with_gravitational_constant(9.0)).unwrap();
    sim.add(Body::new(NVec2::zeros(), NVec2::new(1.0, 0.0), 1.0).unwrap().with_label("star"))
        .unwrap();

    let sat = sim
        .satellite("star", NVec2::new(0.0, 1.0), 0.0, OrbitSpec::circular(false))
        .unwrap();

    assert_relative_eq!(sat.v, NVec2::new(-3.0 + 1.0, 0.0), epsilon = 1e-12);
    assert!(matches!(
        sim.satellite(BodyRef::None, NVec2::zeros(), 0.0, OrbitSpec::default()),
        Err(SimError::InvalidReference(_))
    ));
}

// ==================================================================================
// Scenario tests
// ==================================================================================

const KEPLER: &str = r#"
engine:
  integrator: "verlet"
parameters:
  t_end: 1.0
  h0: 0.01
  G: 2.0
bodies:
  - label: star
    x: [ 0.0, 0.0 ]
    v: [ 0.0, 1.0 ]
    m: 10.0
    color: "lightpink"
  - label: planet
    x: [ 0.0, 2.5 ]
    orbit:
      center: star
      e: 0.5
follow: planet
"#;

#[test]
fn scenario_builds_from_yaml() {
    let Scenario {
        simulation,
        follow,
        report,
    } = Scenario::from_yaml_str(KEPLER).unwrap();

    assert!(report.is_clean());
    assert_eq!(follow, Some(1));
    assert_eq!(simulation.len(), 2);
    assert_eq!(simulation.gravitational_constant(), 2.0);
    assert_eq!(simulation.parameters().integrator, Integrator::VelocityVerlet);
    assert_eq!(simulation.bodies()[0].color.as_deref(), Some("lightpink"));
    assert_eq!(simulation.bodies()[1].mass(), 1.0);

    // speed^2 = G M (1 - e) / r = 2 * 10 * 0.5 / 2.5, clockwise from +y
    let v = simulation.bodies()[1].v;
    assert_relative_eq!(v, NVec2::new(2.0, 1.0), epsilon = 1e-12);
}

#[test]
fn scenario_skips_bad_bodies() {
    let source = r#"
parameters:
  t_end: 1.0
  h0: 0.1
bodies:
  - label: a
    x: [ 0.0, 0.0 ]
  - label: b
    x: [ 1.0, 0.0, 0.0 ]
  - label: c
    x: [ 2.0, 0.0 ]
    orbit: { center: nowhere }
  - label: d
    x: [ 3.0, 0.0 ]
    m: -4.0
"#;
    let scenario = Scenario::from_yaml_str(source).unwrap();

    assert_eq!(scenario.simulation.len(), 1);
    let positions: Vec<usize> = scenario.report.rejected.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert!(matches!(
        &scenario.report.rejected[1].error,
        SimError::UnknownLabel(l) if l == "nowhere"
    ));
}

#[test]
fn scenario_with_unknown_follow_target_fails() {
    let source = r#"
parameters: { t_end: 1.0, h0: 0.1 }
bodies:
  - x: [ 0.0, 0.0 ]
follow: ghost
"#;
    let err = Scenario::from_yaml_str(source).err().unwrap();
    assert!(matches!(err, SimError::UnknownLabel(_)));
}

#[test]
fn malformed_yaml_is_reported() {
    let err = ScenarioConfig::from_yaml_str("parameters: [").unwrap_err();
    assert!(matches!(err, SimError::Yaml(_)));
}

#[test]
fn bundled_scenarios_load() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["kepler.yaml", "planetary.yaml", "figure_eight.yaml"] {
        let file = std::fs::File::open(dir.join(name)).unwrap();
        let config = ScenarioConfig::from_reader(file).unwrap();
        let scenario = Scenario::build_scenario(config).unwrap();
        assert!(scenario.report.is_clean(), "{name}");
        assert!(scenario.simulation.pending_orbits().is_empty(), "{name}");
    }
}

// ==================================================================================
// Export tests
// ==================================================================================

#[test]
fn json_export_contains_the_history() {
    let (mut sim, _, _) = quarter_step_sim();
    sim.run().unwrap();

    let value: serde_json::Value = serde_json::from_str(&sim.to_json().unwrap()).unwrap();

    assert_eq!(value["history"]["snapshots"].as_array().unwrap().len(), 8);
    assert_eq!(value["bodies"][1]["label"], "b");
    assert_eq!(value["parameters"]["step"], 0.25);
    assert_eq!(value["final_instant"], 2.0);
}

#[test]
fn save_refuses_to_overwrite() {
    let (mut sim, _, _) = quarter_step_sim();
    let path = scratch_path("history.json");

    assert!(matches!(sim.save_to_file(&path), Err(SimError::SimulationNotRun)));

    sim.run().unwrap();
    sim.save_to_file(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("snapshots"));

    let err = sim.save_to_file(&path).unwrap_err();
    assert!(
        matches!(&err, SimError::Io(e) if e.kind() == std::io::ErrorKind::AlreadyExists),
        "{err}"
    );
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn save_into_missing_directory_fails() {
    let (mut sim, _, _) = quarter_step_sim();
    sim.run().unwrap();
    let path = scratch_path("missing").join("history.json");

    let err = sim.save_to_file(&path).unwrap_err();
    assert!(matches!(&err, SimError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
}
