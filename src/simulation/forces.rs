//! Force / acceleration contributors for the n-body engine
//!
//! Defines the pairwise [`ForceContribution`] trait, direct Newtonian gravity,
//! the Coulomb term for charged bodies, and [`ForceSet`], which sums any number
//! of contributions into one acceleration per body

use crate::error::{SimError, SimResult};
use crate::simulation::params::Parameters;
use crate::simulation::states::{Kinematics, NVec2};

/// Acceleration of `a` due to the gravity of `b`:
/// `G * m_b * (x_b - x_a) / |x_b - x_a|^3`
pub fn gravitational_acceleration<A, B>(a: &A, b: &B, g: f64) -> SimResult<NVec2>
where
    A: Kinematics + ?Sized,
    B: Kinematics + ?Sized,
{
    // r is the displacement vector from a to b, so a is pulled along +r
    let r = b.position() - a.position();
    let dist = r.norm();
    if dist == 0.0 {
        return Err(SimError::degenerate(
            "two bodies occupy the same position in a gravity computation",
        ));
    }

    // coef = G * m_b / |r|^3
    let coef = g * b.mass() / (dist * dist * dist);
    Ok(coef * r)
}

/// Coulomb acceleration of `a` due to `b`:
/// `k * q_a * q_b * (x_a - x_b) / |x_a - x_b|^3 / m_a`
///
/// Like charges repel. Zero unless both bodies are charged.
pub fn electrical_acceleration<A, B>(a: &A, b: &B, k: f64) -> SimResult<NVec2>
where
    A: Kinematics + ?Sized,
    B: Kinematics + ?Sized,
{
    let (qa, qb) = (a.charge(), b.charge());
    if qa == 0.0 || qb == 0.0 {
        return Ok(NVec2::zeros());
    }

    // r points from b to a: a positive product pushes a away from b
    let r = a.position() - b.position();
    let dist = r.norm();
    if dist == 0.0 {
        return Err(SimError::degenerate(
            "two charged bodies occupy the same position",
        ));
    }
    if a.mass() == 0.0 {
        return Err(SimError::invalid_value(
            "a charged body needs a positive mass to be accelerated",
        ));
    }

    let coef = k * qa * qb / (dist * dist * dist);
    Ok(coef * r / a.mass())
}

/// A pairwise interaction law.
/// Implementations return the acceleration `source` imparts on `target`
pub trait ForceContribution {
    fn acceleration(&self, target: &dyn Kinematics, source: &dyn Kinematics) -> SimResult<NVec2>;
}

/// Newtonian gravity, no softening
#[derive(Debug, Clone, Copy)]
pub struct NewtonianGravity {
    pub g: f64, // gravitational constant
}

impl ForceContribution for NewtonianGravity {
    fn acceleration(&self, target: &dyn Kinematics, source: &dyn Kinematics) -> SimResult<NVec2> {
        gravitational_acceleration(target, source, self.g)
    }
}

/// Coulomb's law between charged bodies
#[derive(Debug, Clone, Copy)]
pub struct CoulombForce {
    pub k: f64, // electrical constant
}

impl ForceContribution for CoulombForce {
    fn acceleration(&self, target: &dyn Kinematics, source: &dyn Kinematics) -> SimResult<NVec2> {
        electrical_acceleration(target, source, self.k)
    }
}

/// Collection of pairwise acceleration terms (gravity, Coulomb, user terms)
/// Contributions of every term are summed into a single acceleration vector per body
pub struct ForceSet {
    terms: Vec<Box<dyn ForceContribution + Send + Sync>>,
}

impl Default for ForceSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceSet {
    /// Create an empty force set
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Gravity, plus the Coulomb term when an electrical constant is configured
    pub fn standard(params: &Parameters) -> Self {
        let mut forces = Self::new().with(NewtonianGravity {
            g: params.gravitational_constant,
        });
        if let Some(k) = params.electrical_constant {
            forces = forces.with(CoulombForce { k });
        }
        forces
    }

    /// Add a term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: ForceContribution + Send + Sync + 'static,
    {
        self.push(term);
        self
    }

    pub fn push<T>(&mut self, term: T)
    where
        T: ForceContribution + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Total acceleration of `bodies[i]` from every other body, summed over all terms
    pub fn acceleration_on<K: Kinematics>(&self, i: usize, bodies: &[K]) -> SimResult<NVec2> {
        let target = &bodies[i];
        let mut total = NVec2::zeros();
        for (j, source) in bodies.iter().enumerate() {
            // bodies do not act on themselves
            if i == j {
                continue;
            }
            for term in &self.terms {
                total += term.acceleration(target, source)?;
            }
        }
        Ok(total)
    }

    /// Compute total accelerations for all `bodies`
    /// - `out[i]` is overwritten with the sum of all contributions on body i
    /// - reads only `bodies`, so every entry comes from the same positions
    pub fn accumulate_accels<K: Kinematics>(&self, bodies: &[K], out: &mut [NVec2]) -> SimResult<()> {
        debug_assert_eq!(bodies.len(), out.len());
        for (i, a) in out.iter_mut().enumerate() {
            *a = self.acceleration_on(i, bodies)?;
        }
        Ok(())
    }
}
