//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – engine options (integrator)
//! - [`ParametersConfig`] – time window, step size and physical constants
//! - [`BodyConfig`]       – initial state for each body, optionally as a satellite
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! An example scenario matching these types:
//!
//! ```yaml
//! engine:
//!   integrator: "euler"     # or "verlet"
//!
//! parameters:
//!   t0: 0.0                 # first instant
//!   t_end: 20.0             # end of the window
//!   h0: 0.001               # fixed step size
//!   G: 1.0                  # gravitational constant
//!   k: 1.0                  # electrical constant, omit to disable
//!
//! bodies:
//!   - label: sun
//!     x: [ 0.0, 0.0 ]
//!     v: [ 0.0, 0.0 ]
//!     m: 10.0
//!     color: "yellow"
//!   - label: planet
//!     x: [ -1.0, 0.0 ]
//!     m: 0.0
//!     orbit:
//!       center: sun         # label of the central body
//!       e: 0.5
//!       clockwise: true
//!
//! follow: sun               # body the camera follows
//! ```
//!
//! `simulation::scenario` maps this configuration into a ready `Simulation`.

use std::io::Read;

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::simulation::engine::IntoBody;
use crate::simulation::integrator::Integrator;
use crate::simulation::orbit::OrbitSpec;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, BodyKind, NVec2};

/// Engine-level options
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub integrator: Integrator, // time integrator used for advancing the bodies
}

/// Time window and physical constants
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    #[serde(default)]
    pub t0: f64,          // first instant
    pub t_end: f64,       // end of the window
    pub h0: f64,          // time step size
    #[serde(rename = "G", default = "default_g")]
    pub g: f64,           // gravitational constant
    #[serde(default)]
    pub k: Option<f64>,   // electrical constant, None disables the Coulomb term
}

fn default_g() -> f64 {
    1.0
}

fn default_mass() -> f64 {
    1.0
}

fn default_clockwise() -> bool {
    true
}

/// Orbit a body is placed on around another body of the scenario
#[derive(Deserialize, Debug, Clone)]
pub struct OrbitConfig {
    pub center: String, // label of the central body
    #[serde(default)]
    pub e: f64,         // eccentricity
    #[serde(default = "default_clockwise")]
    pub clockwise: bool,
}

impl OrbitConfig {
    pub fn spec(&self) -> OrbitSpec {
        OrbitSpec::elliptic(self.e, self.clockwise)
    }
}

/// Configuration for a single body's initial state
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    #[serde(default)]
    pub label: Option<String>,
    pub x: Vec<f64>,                 // initial position
    #[serde(default)]
    pub v: Option<Vec<f64>>,         // initial velocity, ignored when `orbit` is set
    #[serde(default = "default_mass")]
    pub m: f64,                      // mass
    #[serde(default)]
    pub charge: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub shape: BodyKind,
    #[serde(default)]
    pub orbit: Option<OrbitConfig>,
}

fn vec2(values: &[f64], what: &str) -> SimResult<NVec2> {
    match values {
        [x, y] => Ok(NVec2::new(*x, *y)),
        _ => Err(SimError::invalid_value(format!(
            "{what} must have 2 components, got {}",
            values.len()
        ))),
    }
}

impl BodyConfig {
    /// Build the body this entry describes. The orbit, if any, is wired up by
    /// the scenario builder.
    pub fn to_body(&self) -> SimResult<Body> {
        let x = vec2(&self.x, "position")?;
        let v = match &self.v {
            Some(v) => vec2(v, "velocity")?,
            None => NVec2::zeros(),
        };

        let mut body = Body::new(x, v, self.m)?
            .with_charge(self.charge)
            .with_kind(self.shape);
        body.label = self.label.clone();
        body.color = self.color.clone();
        body.validate()?;
        Ok(body)
    }
}

/// Entries can be handed straight to `Simulation::add_all`. The `orbit` field
/// needs the other entries and is ignored here.
impl IntoBody for BodyConfig {
    fn into_body(self) -> SimResult<Body> {
        self.to_body()
    }
}

/// Top-level scenario configuration loaded from YAML
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,         // engine-level configuration
    pub parameters: ParametersConfig, // time window and constants
    pub bodies: Vec<BodyConfig>,      // bodies that define the initial state
    #[serde(default)]
    pub follow: Option<String>,       // label of the body the camera follows
}

impl ScenarioConfig {
    pub fn from_yaml_str(source: &str) -> SimResult<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> SimResult<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Runtime parameters for this scenario
    pub fn parameters(&self) -> Parameters {
        let p = &self.parameters;
        let mut parameters = Parameters::new(p.h0, p.t_end)
            .with_initial_instant(p.t0)
            .with_gravitational_constant(p.g)
            .with_integrator(self.engine.integrator);
        parameters.electrical_constant = p.k;
        parameters
    }
}
