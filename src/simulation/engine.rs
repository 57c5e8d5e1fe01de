//! The simulation engine
//!
//! `Simulation` owns the bodies, the physical constants, the active force
//! terms and the snapshot history. `run` records a snapshot of every body and
//! then advances all of them one integrator step, once per instant of the
//! schedule `initial_instant + k * step`.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::simulation::forces::{ForceContribution, ForceSet};
use crate::simulation::history::{History, Snapshot};
use crate::simulation::orbit::{immediate_satellite, orbit_velocity, OrbitSpec};
use crate::simulation::params::Parameters;
use crate::simulation::reference::{resolve, BodyRef};
use crate::simulation::states::{Body, BodyId, BodyKind, BodyState, NVec2, PendingOrbit};

/// Anything a batch `add_all` accepts. Items that cannot become a body are
/// rejected individually.
pub trait IntoBody {
    fn into_body(self) -> SimResult<Body>;
}

impl IntoBody for Body {
    fn into_body(self) -> SimResult<Body> {
        Ok(self)
    }
}

impl IntoBody for Option<Body> {
    fn into_body(self) -> SimResult<Body> {
        self.ok_or_else(|| SimError::invalid_value("expected a body, found nothing"))
    }
}

impl IntoBody for SimResult<Body> {
    fn into_body(self) -> SimResult<Body> {
        self
    }
}

/// A batch item that was not added.
#[derive(Debug)]
pub struct Rejection {
    pub position: usize, // index of the item in the batch
    pub error: SimError,
}

/// Outcome of `add_all`.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<BodyId>,
    pub rejected: Vec<Rejection>,
}

impl AddReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

pub struct Simulation {
    parameters: Parameters,
    final_instant: f64, // end of the recorded window, advances when a run is extended
    bodies: Vec<Body>,
    forces: ForceSet,
    pending: Vec<PendingOrbit>,
    orbit_links: Vec<(BodyId, BodyId)>, // resolved (center, satellite) pairs
    history: History,
    steps_taken: usize,
    initial_states: HashMap<BodyId, BodyState>, // pre-run state, used by `rewind`
}

impl Default for Simulation {
    fn default() -> Self {
        let parameters = Parameters::default();
        Self {
            final_instant: parameters.final_instant,
            forces: ForceSet::standard(&parameters),
            parameters,
            bodies: Vec::new(),
            pending: Vec::new(),
            orbit_links: Vec::new(),
            history: History::new(),
            steps_taken: 0,
            initial_states: HashMap::new(),
        }
    }
}

impl Simulation {
    pub fn new(parameters: Parameters) -> SimResult<Self> {
        parameters.validate()?;
        Ok(Self {
            final_instant: parameters.final_instant,
            forces: ForceSet::standard(&parameters),
            parameters,
            ..Self::default()
        })
    }

    // ===== Bodies =====

    /// Attach one body. Resolves any pending orbit that becomes resolvable.
    ///
    /// On error the simulation is left as it was: the body is not attached
    /// and no orbit record or velocity changes.
    pub fn add(&mut self, mut body: Body) -> SimResult<BodyId> {
        body.validate()?;
        if self.contains(body.id()) {
            return Err(SimError::invalid_value(format!(
                "body {} is already in the simulation",
                body.id()
            )));
        }

        let id = body.id();
        let pending = self.pending.clone();
        let links = self.orbit_links.len();
        let velocities: Vec<NVec2> = self.bodies.iter().map(|b| b.v).collect();

        self.pending.extend(body.take_pending_orbits());
        self.bodies.push(body);

        if let Err(error) = self.resolve_pending_orbits() {
            self.bodies.pop();
            self.pending = pending;
            self.orbit_links.truncate(links);
            for (b, v) in self.bodies.iter_mut().zip(velocities) {
                b.v = v;
            }
            return Err(error);
        }
        debug!(%id, index = self.bodies.len() - 1, "body attached");
        Ok(id)
    }

    /// Attach every valid item of `items`. Invalid items are logged and
    /// reported, the rest are still added.
    pub fn add_all<I>(&mut self, items: I) -> AddReport
    where
        I: IntoIterator,
        I::Item: IntoBody,
    {
        let mut report = AddReport::default();
        for (position, item) in items.into_iter().enumerate() {
            match item.into_body().and_then(|body| self.add(body)) {
                Ok(id) => report.added.push(id),
                Err(error) => {
                    warn!(position, %error, "item is not a valid body, skipped");
                    report.rejected.push(Rejection { position, error });
                }
            }
        }
        report
    }

    /// New body at `x` already on an orbit around the attached `center`.
    /// The returned body is not attached.
    pub fn satellite(
        &self,
        center: impl Into<BodyRef>,
        x: NVec2,
        m: f64,
        spec: OrbitSpec,
    ) -> SimResult<Body> {
        let index = self
            .resolve(center)?
            .ok_or_else(|| SimError::InvalidReference("an orbit needs a central body".into()))?;
        immediate_satellite(
            &self.bodies[index],
            x,
            m,
            spec,
            self.parameters.gravitational_constant,
        )
    }

    /// Resolve pending orbits whose centre and satellite are both attached.
    /// Centres still waiting for their own orbit go first when possible.
    fn resolve_pending_orbits(&mut self) -> SimResult<()> {
        let g = self.parameters.gravitational_constant;
        loop {
            let attached = |p: &PendingOrbit| {
                self.index_of(p.center).is_some() && self.index_of(p.satellite).is_some()
            };
            let ready = self
                .pending
                .iter()
                .position(|p| attached(p) && !self.pending.iter().any(|q| q.satellite == p.center))
                .or_else(|| self.pending.iter().position(|p| attached(p)));
            let Some(ready) = ready else {
                return Ok(());
            };

            let record = self.pending.remove(ready);
            let (Some(c), Some(s)) = (self.index_of(record.center), self.index_of(record.satellite))
            else {
                continue;
            };
            let v = orbit_velocity(
                &self.bodies[c],
                self.bodies[s].x,
                record.eccentricity,
                g,
                record.clockwise,
            )?;
            self.set_orbital_velocity(s, v);
            self.orbit_links.push((record.center, record.satellite));
            debug!(
                center = %record.center,
                satellite = %record.satellite,
                speed = (v - self.bodies[c].v).norm(),
                "orbital velocity resolved"
            );
        }
    }

    /// Set the velocity of body `index` and carry the satellites already placed
    /// around it (and theirs) along by the same change.
    fn set_orbital_velocity(&mut self, index: usize, v: NVec2) {
        let delta = v - self.bodies[index].v;
        self.bodies[index].v = v;

        let mut moved = HashSet::from([self.bodies[index].id()]);
        let mut stack = vec![self.bodies[index].id()];
        while let Some(center) = stack.pop() {
            for &(c, satellite) in &self.orbit_links {
                if c != center || !moved.insert(satellite) {
                    continue;
                }
                if let Some(i) = self.bodies.iter().position(|b| b.id() == satellite) {
                    self.bodies[i].v += delta;
                    stack.push(satellite);
                }
            }
        }
    }

    /// Plug in an extra pairwise force term.
    pub fn add_force<T>(&mut self, term: T)
    where
        T: ForceContribution + Send + Sync + 'static,
    {
        self.forces.push(term);
    }

    // ===== Stepping =====

    /// Record a snapshot and advance one step for each instant of the window.
    ///
    /// The first call covers `[initial_instant, final_instant)`. Later calls
    /// (without `reset` or `rewind`) append another window of the same length.
    pub fn run(&mut self) -> SimResult<()> {
        if self.bodies.is_empty() {
            return Err(SimError::EmptySimulation);
        }
        if !self.pending.is_empty() {
            warn!(
                count = self.pending.len(),
                "some orbits are still pending, their satellites keep their current velocity"
            );
        }

        for body in &self.bodies {
            self.initial_states
                .entry(body.id())
                .or_insert_with(|| body.state());
        }

        let steps = self.parameters.steps_per_run();
        let h = self.parameters.step;
        let start = self.instant_at(self.steps_taken);
        let end = if self.history.is_empty() {
            self.parameters.final_instant
        } else {
            start + self.parameters.span()
        };

        info!(
            bodies = self.bodies.len(),
            steps,
            start,
            end,
            "running simulation"
        );

        for _ in 0..steps {
            let instant = self.instant_at(self.steps_taken);
            self.history.push(Snapshot {
                instant,
                states: self.bodies.iter().map(Body::state).collect(),
            });
            self.parameters
                .integrator
                .step(&mut self.bodies, &self.forces, h)?;
            self.steps_taken += 1;
        }

        self.final_instant = end;
        info!(snapshots = self.history.len(), "simulation finished");
        Ok(())
    }

    fn instant_at(&self, step: usize) -> f64 {
        self.parameters.initial_instant + step as f64 * self.parameters.step
    }

    /// Discard the history and put every body back in its pre-run state.
    /// Bodies, constants and force terms are kept.
    pub fn rewind(&mut self) {
        for body in &mut self.bodies {
            if let Some(state) = self.initial_states.get(&body.id()) {
                body.restore(state);
            }
        }
        self.history.clear();
        self.steps_taken = 0;
        self.final_instant = self.parameters.final_instant;
        debug!("simulation rewound");
    }

    /// Clear history, bodies, pending orbits and extra force terms, and
    /// restore the default parameters.
    pub fn reset(&mut self) {
        *self = Self::default();
        debug!("simulation reset");
    }

    // ===== Queries =====

    /// State of body `id` at the snapshot nearest to `instant`.
    pub fn query(&self, id: BodyId, instant: f64) -> SimResult<BodyState> {
        if self.history.is_empty() {
            return Err(SimError::SimulationNotRun);
        }
        let (start, end) = (self.parameters.initial_instant, self.final_instant);
        if !(start..=end).contains(&instant) {
            return Err(SimError::OutOfRange {
                instant,
                start,
                end,
            });
        }
        self.history
            .nearest(instant)
            .and_then(|step| self.history.get(step))
            .and_then(|snapshot| snapshot.find(id))
            .copied()
            .ok_or_else(|| SimError::unknown_body(id))
    }

    /// Attach index of the body `reference` names.
    pub fn resolve(&self, reference: impl Into<BodyRef>) -> SimResult<Option<usize>> {
        resolve(&self.bodies, &reference.into())
    }

    /// Every recorded state of the referenced body.
    pub fn track(&self, reference: impl Into<BodyRef>) -> SimResult<Vec<(f64, BodyState)>> {
        let index = self
            .resolve(reference)?
            .ok_or_else(|| SimError::InvalidReference("a track needs a body".into()))?;
        Ok(self
            .history
            .track(index)
            .map(|(t, state)| (t, *state))
            .collect())
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.iter().position(|b| b.id() == id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    /// Mutable access for adjusting a body between runs.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.index_of(id).map(|i| &mut self.bodies[i])
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn pending_orbits(&self) -> &[PendingOrbit] {
        &self.pending
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn forces(&self) -> &ForceSet {
        &self.forces
    }

    pub fn initial_instant(&self) -> f64 {
        self.parameters.initial_instant
    }

    pub fn final_instant(&self) -> f64 {
        self.final_instant
    }

    pub fn step(&self) -> f64 {
        self.parameters.step
    }

    pub fn gravitational_constant(&self) -> f64 {
        self.parameters.gravitational_constant
    }

    pub fn electrical_constant(&self) -> Option<f64> {
        self.parameters.electrical_constant
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn instants(&self) -> Vec<f64> {
        self.history.instants().collect()
    }

    pub fn was_run(&self) -> bool {
        !self.history.is_empty()
    }

    // ===== Export =====

    pub fn to_json(&self) -> SimResult<String> {
        let export = Export {
            parameters: &self.parameters,
            final_instant: self.final_instant,
            bodies: self
                .bodies
                .iter()
                .map(|b| BodyInfo {
                    id: b.id(),
                    label: b.label(),
                    color: b.color.as_deref(),
                    kind: b.kind,
                })
                .collect(),
            history: &self.history,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Write `to_json` to a new file at `path`.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let path = path.as_ref();
        if self.history.is_empty() {
            return Err(SimError::SimulationNotRun);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(SimError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory {} does not exist", parent.display()),
                )));
            }
        }

        let json = self.to_json()?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(json.as_bytes())?;
        info!(path = %path.display(), "history written");
        Ok(())
    }
}

#[derive(Serialize)]
struct BodyInfo<'a> {
    id: BodyId,
    label: Option<&'a str>,
    color: Option<&'a str>,
    kind: BodyKind,
}

#[derive(Serialize)]
struct Export<'a> {
    parameters: &'a Parameters,
    final_instant: f64,
    bodies: Vec<BodyInfo<'a>>,
    history: &'a History,
}
