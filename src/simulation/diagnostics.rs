//! Conserved-quantity diagnostics.
//!
//! Work on live bodies or on recorded snapshot states.

use crate::simulation::states::{Kinematics, NVec2};

/// Total linear momentum `sum m v`.
pub fn total_momentum<K: Kinematics>(bodies: &[K]) -> NVec2 {
    bodies
        .iter()
        .fold(NVec2::zeros(), |p, b| p + b.mass() * b.velocity())
}

pub fn kinetic_energy<K: Kinematics>(bodies: &[K]) -> f64 {
    bodies
        .iter()
        .map(|b| 0.5 * b.mass() * b.velocity().norm_squared())
        .sum()
}

/// Gravitational potential energy `-sum_{i<j} G m_i m_j / r_ij`.
/// Coincident pairs are skipped.
pub fn potential_energy<K: Kinematics>(bodies: &[K], g: f64) -> f64 {
    let mut pe = 0.0;
    for (i, bi) in bodies.iter().enumerate() {
        for bj in &bodies[i + 1..] {
            let r = (bj.position() - bi.position()).norm();
            if r > 0.0 {
                pe -= g * bi.mass() * bj.mass() / r;
            }
        }
    }
    pe
}

pub fn total_energy<K: Kinematics>(bodies: &[K], g: f64) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, g)
}

/// Mass-weighted mean position. `None` when the total mass is zero.
pub fn center_of_mass<K: Kinematics>(bodies: &[K]) -> Option<NVec2> {
    let total: f64 = bodies.iter().map(Kinematics::mass).sum();
    if total == 0.0 {
        return None;
    }
    let weighted = bodies
        .iter()
        .fold(NVec2::zeros(), |acc, b| acc + b.mass() * b.position());
    Some(weighted / total)
}
