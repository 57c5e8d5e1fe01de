pub mod error;
pub mod simulation;
pub mod configuration;
pub mod visualization;

pub use error::{SimError, SimResult};

pub use simulation::states::{Body, BodyId, BodyKind, BodyState, Kinematics, NVec2, PendingOrbit};
pub use simulation::params::Parameters;
pub use simulation::forces::{ForceContribution, ForceSet, NewtonianGravity, CoulombForce};
pub use simulation::forces::{gravitational_acceleration, electrical_acceleration};
pub use simulation::integrator::{Integrator, semi_implicit_euler, velocity_verlet};
pub use simulation::orbit::{OrbitSpec, orbit_velocity};
pub use simulation::history::{History, Snapshot};
pub use simulation::reference::BodyRef;
pub use simulation::engine::{Simulation, AddReport, Rejection, IntoBody};
pub use simulation::scenario::Scenario;

pub use configuration::config::{EngineConfig, ParametersConfig, BodyConfig, OrbitConfig, ScenarioConfig};

pub use visualization::window::{WindowSpec, TimeWindow};
pub use visualization::overlay::{Overlay, Trail, KeplerSector, Marker, Arrow, ArrowGeometry, FollowCamera};
