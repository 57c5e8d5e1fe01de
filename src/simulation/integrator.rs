//! Fixed-step time integrators for the N-body system
//!
//! Provides semi-implicit (symplectic) Euler, the default, and velocity–Verlet,
//! both driven by a `ForceSet` and a fixed step size

use serde::{Deserialize, Serialize};

use super::forces::ForceSet;
use super::states::{Body, NVec2};
use crate::error::{SimError, SimResult};

/// Which integrator advances the bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Integrator {
    #[default]
    #[serde(rename = "euler")] // v += a h, then x += v h. One force evaluation per step
    SemiImplicitEuler,

    #[serde(rename = "verlet")] // kick-drift-kick. Two force evaluations per step
    VelocityVerlet,
}

impl Integrator {
    /// Advance every body by one step of size `dt`
    pub fn step(&self, bodies: &mut [Body], forces: &ForceSet, dt: f64) -> SimResult<()> {
        match self {
            Integrator::SemiImplicitEuler => semi_implicit_euler(bodies, forces, dt),
            Integrator::VelocityVerlet => velocity_verlet(bodies, forces, dt),
        }
    }
}

/// Advance the system by one step using semi-implicit Euler
/// All accelerations come from the positions at the start of the step,
/// then each body updates v first and x with the new v
pub fn semi_implicit_euler(bodies: &mut [Body], forces: &ForceSet, dt: f64) -> SimResult<()> {
    let n = bodies.len();
    if n == 0 {
        return Err(SimError::EmptySimulation);
    }

    // a_n from x_n, computed before any body moves
    let mut acc = vec![NVec2::zeros(); n];
    forces.accumulate_accels(&*bodies, &mut acc)?;

    // v_n+1 = v_n + dt a_n
    // x_n+1 = x_n + dt v_n+1
    for (b, a) in bodies.iter_mut().zip(acc.iter()) {
        b.a = *a;
        b.v += dt * *a;
        b.x += dt * b.v;
    }
    Ok(())
}

/// Advance the system by one step using velocity–Verlet
/// Uses two force evaluations per step
pub fn velocity_verlet(bodies: &mut [Body], forces: &ForceSet, dt: f64) -> SimResult<()> {
    let n = bodies.len();
    if n == 0 {
        return Err(SimError::EmptySimulation);
    }

    let half_dt = 0.5 * dt;

    // a_n from x_n
    let mut a_old = vec![NVec2::zeros(); n];
    forces.accumulate_accels(&*bodies, &mut a_old)?;

    // Kick: v_n+1/2 = v_n + (dt/2) a_n
    for (b, a) in bodies.iter_mut().zip(a_old.iter()) {
        b.v += half_dt * *a;
    }

    // Drift: x_n+1 = x_n + dt v_n+1/2
    for b in bodies.iter_mut() {
        b.x += dt * b.v;
    }

    // a_n+1 from x_n+1
    let mut a_new = vec![NVec2::zeros(); n];
    forces.accumulate_accels(&*bodies, &mut a_new)?;

    // Second kick: v_n+1 = v_n+1/2 + (dt/2) a_n+1
    for (b, a) in bodies.iter_mut().zip(a_new.iter()) {
        b.a = *a;
        b.v += half_dt * *a;
    }
    Ok(())
}
