//! Core state types for the N-body simulation.
//!
//! Defines the live `Body`, its immutable per-instant copy `BodyState`, and the
//! `Kinematics` capability both of them expose to force laws and diagnostics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

pub type NVec2 = Vector2<f64>;

static NEXT_BODY_ID: AtomicU64 = AtomicU64::new(1);

/// Stable body identity, unique within the process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(u64);

impl BodyId {
    fn next() -> Self {
        Self(NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shape the body is displayed with. Physics treats every kind as a point mass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Particle,
    Circle { radius: f64 },
}

impl BodyKind {
    pub fn name(&self) -> &'static str {
        match self {
            BodyKind::Particle => "particle",
            BodyKind::Circle { .. } => "circle",
        }
    }
}

/// Read access to the quantities force laws need.
pub trait Kinematics {
    fn mass(&self) -> f64;
    fn charge(&self) -> f64;
    fn position(&self) -> NVec2;
    fn velocity(&self) -> NVec2;
}

/// Orbit deferred until the central body joins a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingOrbit {
    pub center: BodyId,
    pub satellite: BodyId,
    pub clockwise: bool,
    pub eccentricity: f64,
}

#[derive(Debug)]
pub struct Body {
    id: BodyId,
    m: f64,                     // mass, never negative
    pub x: NVec2,               // position
    pub v: NVec2,               // velocity
    pub a: NVec2,               // acceleration of the last step
    pub charge: f64,            // electric charge, 0 for neutral bodies
    pub label: Option<String>,  // human reference, matched by `BodyRef::Label`
    pub color: Option<String>,  // display metadata, ignored by the physics
    pub kind: BodyKind,
    pending: Vec<PendingOrbit>, // satellites waiting for this body's simulation
}

impl Body {
    /// Create a body at `x` moving with `v`.
    pub fn new(x: NVec2, v: NVec2, m: f64) -> SimResult<Self> {
        validate_mass(m)?;
        Ok(Self {
            id: BodyId::next(),
            m,
            x,
            v,
            a: NVec2::zeros(),
            charge: 0.0,
            label: None,
            color: None,
            kind: BodyKind::Particle,
            pending: Vec::new(),
        })
    }

    /// Create a body at rest.
    pub fn at_rest(x: NVec2, m: f64) -> SimResult<Self> {
        Self::new(x, NVec2::zeros(), m)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn mass(&self) -> f64 {
        self.m
    }

    pub fn set_mass(&mut self, m: f64) -> SimResult<()> {
        validate_mass(m)?;
        self.m = m;
        Ok(())
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Pending orbits recorded on this body as their centre.
    pub fn pending_orbits(&self) -> &[PendingOrbit] {
        &self.pending
    }

    pub(crate) fn defer_orbit(&mut self, record: PendingOrbit) {
        self.pending.push(record);
    }

    pub(crate) fn take_pending_orbits(&mut self) -> Vec<PendingOrbit> {
        std::mem::take(&mut self.pending)
    }

    /// Checks the values a simulation relies on before attaching the body.
    pub fn validate(&self) -> SimResult<()> {
        validate_mass(self.m)?;
        let finite = |v: &NVec2| v.iter().all(|c| c.is_finite());
        if !finite(&self.x) || !finite(&self.v) {
            return Err(SimError::invalid_value(format!(
                "body {} has a non-finite position or velocity",
                self.id
            )));
        }
        if !self.charge.is_finite() {
            return Err(SimError::invalid_value(format!(
                "body {} has a non-finite charge",
                self.id
            )));
        }
        Ok(())
    }

    /// Immutable copy of the kinematic state.
    pub fn state(&self) -> BodyState {
        BodyState {
            id: self.id,
            mass: self.m,
            charge: self.charge,
            x: self.x,
            v: self.v,
            a: self.a,
        }
    }

    /// Overwrite the kinematic state with a recorded one of the same body.
    pub(crate) fn restore(&mut self, state: &BodyState) {
        debug_assert_eq!(self.id, state.id);
        self.m = state.mass;
        self.charge = state.charge;
        self.x = state.x;
        self.v = state.v;
        self.a = state.a;
    }
}

/// A clone is a new body: same state and metadata, a fresh id and no pending
/// orbits, so it can join a simulation next to the original.
impl Clone for Body {
    fn clone(&self) -> Self {
        Self {
            id: BodyId::next(),
            m: self.m,
            x: self.x,
            v: self.v,
            a: self.a,
            charge: self.charge,
            label: self.label.clone(),
            color: self.color.clone(),
            kind: self.kind,
            pending: Vec::new(),
        }
    }
}

fn validate_mass(m: f64) -> SimResult<()> {
    if m.is_finite() && m >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_value(format!(
            "the mass of a body must be a finite non-negative number, got {m}"
        )))
    }
}

impl Kinematics for Body {
    fn mass(&self) -> f64 {
        self.m
    }

    fn charge(&self) -> f64 {
        self.charge
    }

    fn position(&self) -> NVec2 {
        self.x
    }

    fn velocity(&self) -> NVec2 {
        self.v
    }
}

/// Recorded state of one body at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodyState {
    pub id: BodyId,
    pub mass: f64,
    pub charge: f64,
    pub x: NVec2,
    pub v: NVec2,
    pub a: NVec2,
}

impl Kinematics for BodyState {
    fn mass(&self) -> f64 {
        self.mass
    }

    fn charge(&self) -> f64 {
        self.charge
    }

    fn position(&self) -> NVec2 {
        self.x
    }

    fn velocity(&self) -> NVec2 {
        self.v
    }
}
