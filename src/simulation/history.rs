//! Snapshot history of a simulation run.
//!
//! Snapshots are stored in instant order, so instant lookups are binary
//! searches over a sorted vector.

use serde::Serialize;

use crate::simulation::states::{BodyId, BodyState, NVec2};

/// The state of every attached body at one instant, in attach order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub instant: f64,
    pub states: Vec<BodyState>,
}

impl Snapshot {
    /// State of the body at attach index `index`.
    pub fn state(&self, index: usize) -> Option<&BodyState> {
        self.states.get(index)
    }

    pub fn find(&self, id: BodyId) -> Option<&BodyState> {
        self.states.iter().find(|s| s.id == id)
    }

    /// Position of the body at `index`.
    pub fn position(&self, index: usize) -> Option<NVec2> {
        self.state(index).map(|s| s.x)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct History {
    snapshots: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Instants must be pushed in increasing order.
    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        debug_assert!(self
            .last_instant()
            .map_or(true, |last| snapshot.instant > last));
        self.snapshots.push(snapshot);
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn get(&self, step: usize) -> Option<&Snapshot> {
        self.snapshots.get(step)
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn last_instant(&self) -> Option<f64> {
        self.last().map(|s| s.instant)
    }

    pub fn instants(&self) -> impl Iterator<Item = f64> + '_ {
        self.snapshots.iter().map(|s| s.instant)
    }

    pub fn instant(&self, step: usize) -> Option<f64> {
        self.get(step).map(|s| s.instant)
    }

    /// Index of the first snapshot recorded at or after `t`.
    pub fn first_at_or_after(&self, t: f64) -> Option<usize> {
        let idx = self.snapshots.partition_point(|s| s.instant < t);
        (idx < self.snapshots.len()).then_some(idx)
    }

    /// Index of the snapshot closest to `t`. Ties go to the earlier snapshot.
    pub fn nearest(&self, t: f64) -> Option<usize> {
        if self.snapshots.is_empty() {
            return None;
        }
        let idx = self.snapshots.partition_point(|s| s.instant < t);
        if idx == 0 {
            return Some(0);
        }
        if idx == self.snapshots.len() {
            return Some(idx - 1);
        }
        let before = t - self.snapshots[idx - 1].instant;
        let after = self.snapshots[idx].instant - t;
        Some(if after < before { idx } else { idx - 1 })
    }

    /// Every recorded state of the body at attach index `index`.
    pub fn track(&self, index: usize) -> impl Iterator<Item = (f64, &BodyState)> + '_ {
        self.snapshots
            .iter()
            .filter_map(move |s| s.state(index).map(|state| (s.instant, state)))
    }
}
