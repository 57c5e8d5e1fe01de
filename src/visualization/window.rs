//! Time windows shared by every overlay.
//!
//! An overlay appears after `start`, grows until `pause`, stays frozen after
//! that and disappears at `stop`. The window is resolved once against the
//! recorded history.

use std::ops::Range;

use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::simulation::history::History;

/// Requested window. Unset `pause` and `stop` default to the last recorded instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowSpec {
    pub start: f64,
    pub pause: Option<f64>,
    pub stop: Option<f64>,
}

impl WindowSpec {
    pub fn starting_at(start: f64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn with_pause(mut self, pause: f64) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn with_stop(mut self, stop: f64) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn resolve(&self, history: &History) -> SimResult<TimeWindow> {
        let last = history.last_instant().ok_or(SimError::SimulationNotRun)?;

        let pause = self.pause.unwrap_or(last);
        let mut stop = self.stop.unwrap_or(last);
        if self.pause.is_some() && pause > stop {
            stop = pause;
        }

        if !(self.start.is_finite() && pause.is_finite() && stop.is_finite()) {
            return Err(SimError::InvalidTimeWindow(
                "window instants must be finite".into(),
            ));
        }
        if pause > last || stop > last {
            return Err(SimError::InvalidTimeWindow(format!(
                "pause {pause} / stop {stop} exceed the last recorded instant {last}"
            )));
        }
        if self.start == pause || self.start == stop {
            warn!(start = self.start, pause, stop, "overlay window has zero duration");
        }

        let first = history.first_at_or_after(self.start);
        // pause <= last, so some snapshot is at or after it
        let freeze = history
            .first_at_or_after(pause)
            .unwrap_or(history.len() - 1);

        Ok(TimeWindow {
            start: self.start,
            pause,
            stop,
            first,
            freeze,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    start: f64,
    pause: f64,
    stop: f64,
    first: Option<usize>, // first step at or after `start`
    freeze: usize,        // first step at or after `pause`
}

impl TimeWindow {
    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn pause(&self) -> f64 {
        self.pause
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    /// `start < t < stop`, never on the first snapshot.
    pub fn is_visible(&self, history: &History, step: usize) -> bool {
        match history.instant(step) {
            Some(t) => step > 0 && self.start < t && t < self.stop,
            None => false,
        }
    }

    pub fn is_frozen(&self, history: &History, step: usize) -> bool {
        history.instant(step).is_some_and(|t| t > self.pause)
    }

    /// Step the extent reaches when showing `step`.
    pub fn extent_end(&self, history: &History, step: usize) -> usize {
        if self.is_frozen(history, step) {
            self.freeze
        } else {
            step
        }
    }

    /// Steps drawn at `step`: from the first step at or after `start` up to,
    /// not including, the current or frozen step.
    pub fn extent(&self, history: &History, step: usize) -> Range<usize> {
        let end = self.extent_end(history, step);
        let begin = self.first.unwrap_or(end).min(end);
        begin..end
    }
}
