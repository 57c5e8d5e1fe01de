//! Orbital velocity initialization
//!
//! Places a satellite on a prescribed orbit around a central body. The speed
//! comes from the vis-viva relation with semi-major axis `a = r / (1 + e)`, the
//! direction is perpendicular to the centre→satellite vector, and the centre's
//! own velocity is added so the orbit holds in the centre's rest frame.
//!
//! Orbital speed depends on the gravitational constant, which belongs to the
//! simulation. A satellite created around a body that has not joined a
//! simulation yet is returned at rest and a [`PendingOrbit`] is recorded on the
//! centre; `Simulation::add` resolves it once both bodies are attached.

use crate::error::{SimError, SimResult};
use crate::simulation::states::{Body, BodyId, BodyKind, Kinematics, NVec2, PendingOrbit};

/// Shape of the requested orbit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSpec {
    pub eccentricity: f64, // in [0, 1)
    pub clockwise: bool,   // sense of rotation
    pub kind: BodyKind,    // kind of the satellite to create
}

impl Default for OrbitSpec {
    fn default() -> Self {
        Self {
            eccentricity: 0.0,
            clockwise: true,
            kind: BodyKind::Particle,
        }
    }
}

impl OrbitSpec {
    pub fn circular(clockwise: bool) -> Self {
        Self {
            clockwise,
            ..Self::default()
        }
    }

    pub fn elliptic(eccentricity: f64, clockwise: bool) -> Self {
        Self {
            eccentricity,
            clockwise,
            ..Self::default()
        }
    }

    fn validate(&self) -> SimResult<()> {
        validate_eccentricity(self.eccentricity)?;
        match self.kind {
            BodyKind::Particle => Ok(()),
            other => Err(SimError::UnsupportedBodyType(other.name().to_string())),
        }
    }
}

fn validate_eccentricity(e: f64) -> SimResult<()> {
    if (0.0..1.0).contains(&e) {
        Ok(())
    } else {
        Err(SimError::invalid_value(format!(
            "eccentricity must be in [0, 1), got {e}"
        )))
    }
}

/// Velocity that puts a body at `target` on an orbit around `center`
pub fn orbit_velocity<C>(
    center: &C,
    target: NVec2,
    eccentricity: f64,
    g: f64,
    clockwise: bool,
) -> SimResult<NVec2>
where
    C: Kinematics + ?Sized,
{
    validate_eccentricity(eccentricity)?;

    // d: centre -> satellite, r: its length
    let d = target - center.position();
    let r = d.norm();
    if r == 0.0 {
        return Err(SimError::degenerate(
            "a satellite cannot be placed on its central body",
        ));
    }

    // vis-viva: v^2 = G M (2/r - 1/a), a = r / (1 + e)
    let a = r / (1.0 + eccentricity);
    let speed_sq = g * center.mass() * (2.0 / r - 1.0 / a);
    if speed_sq < 0.0 {
        return Err(SimError::invalid_value(format!(
            "no bound orbit for G*M = {}",
            g * center.mass()
        )));
    }
    let speed = speed_sq.sqrt();

    // rotate d by -90 degrees for clockwise motion, +90 otherwise
    let normal = if clockwise {
        NVec2::new(d.y, -d.x)
    } else {
        NVec2::new(-d.y, d.x)
    };

    Ok(speed / r * normal + center.velocity())
}

impl Body {
    /// Create a satellite of mass `m` at `x` orbiting this body.
    ///
    /// The satellite starts at rest. Its orbital velocity is set when this body
    /// and the satellite are both added to a simulation.
    pub fn satellite(&mut self, x: NVec2, m: f64, spec: OrbitSpec) -> SimResult<Body> {
        spec.validate()?;
        if x == self.x {
            return Err(SimError::degenerate(
                "a satellite cannot be placed on its central body",
            ));
        }
        let sat = Body::at_rest(x, m)?.with_kind(spec.kind);
        self.defer_orbit(PendingOrbit {
            center: self.id(),
            satellite: sat.id(),
            clockwise: spec.clockwise,
            eccentricity: spec.eccentricity,
        });
        Ok(sat)
    }

    /// Record that the body `satellite` should orbit this body once both are attached.
    pub fn defer_satellite(&mut self, satellite: BodyId, spec: OrbitSpec) -> SimResult<()> {
        spec.validate()?;
        if satellite == self.id() {
            return Err(SimError::degenerate("a body cannot orbit itself"));
        }
        self.defer_orbit(PendingOrbit {
            center: self.id(),
            satellite,
            clockwise: spec.clockwise,
            eccentricity: spec.eccentricity,
        });
        Ok(())
    }
}

/// Satellite of mass `m` at `x` already moving with its orbital velocity
pub(crate) fn immediate_satellite(
    center: &Body,
    x: NVec2,
    m: f64,
    spec: OrbitSpec,
    g: f64,
) -> SimResult<Body> {
    spec.validate()?;
    let v = orbit_velocity(center, x, spec.eccentricity, g, spec.clockwise)?;
    Ok(Body::new(x, v, m)?.with_kind(spec.kind))
}
