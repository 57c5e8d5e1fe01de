//! Build fully-initialized simulations from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a `Scenario`:
//! - a `Simulation` with its parameters and bodies attached,
//! - satellites declared with `orbit:` wired to their central bodies,
//! - the resolved follow target,
//! - the report of bodies that could not be added

use tracing::warn;

use crate::configuration::config::ScenarioConfig;
use crate::error::{SimError, SimResult};
use crate::simulation::engine::{AddReport, Simulation};
use crate::simulation::states::Body;

/// A simulation ready to run, as described by a scenario file
pub struct Scenario {
    pub simulation: Simulation,
    pub follow: Option<usize>, // attach index of the followed body
    pub report: AddReport,     // bodies rejected while building
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> SimResult<Self> {
        let mut simulation = Simulation::new(cfg.parameters())?;

        // Bodies: map `BodyConfig` -> runtime `Body`; malformed entries are kept
        // as errors so the batch report points at their position in the file
        let mut bodies: Vec<SimResult<Body>> = cfg.bodies.iter().map(|bc| bc.to_body()).collect();

        // Orbits: record each satellite on its central body before anything is attached
        for (i, bc) in cfg.bodies.iter().enumerate() {
            let Some(orbit) = &bc.orbit else {
                continue;
            };
            let Ok(satellite) = bodies[i].as_ref().map(Body::id) else {
                continue;
            };

            let center = bodies.iter().position(|b| {
                b.as_ref()
                    .is_ok_and(|b| b.label() == Some(orbit.center.as_str()))
            });
            let outcome = match center {
                Some(c) => match &mut bodies[c] {
                    Ok(center) => center.defer_satellite(satellite, orbit.spec()),
                    Err(_) => Err(SimError::UnknownLabel(orbit.center.clone())),
                },
                None => Err(SimError::UnknownLabel(orbit.center.clone())),
            };
            if let Err(err) = outcome {
                warn!(body = i, center = %orbit.center, "orbit could not be set up");
                bodies[i] = Err(err);
            }
        }

        let report = simulation.add_all(bodies);

        let follow = match &cfg.follow {
            Some(label) => simulation.resolve(label.as_str())?,
            None => None,
        };

        Ok(Self {
            simulation,
            follow,
            report,
        })
    }

    pub fn from_yaml_str(source: &str) -> SimResult<Self> {
        Self::build_scenario(ScenarioConfig::from_yaml_str(source)?)
    }
}
