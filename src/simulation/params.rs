//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - time window and fixed step size,
//! - gravitational and (optional) electrical constants,
//! - the integrator used to advance the bodies

use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::simulation::integrator::Integrator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
    pub initial_instant: f64,             // first recorded instant
    pub final_instant: f64,               // end of the window (exclusive for stepping)
    pub step: f64,                        // step size h
    pub gravitational_constant: f64,      // G, 0 disables gravity
    pub electrical_constant: Option<f64>, // k, None disables the Coulomb term
    pub integrator: Integrator,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            initial_instant: 0.0,
            final_instant: 10.0,
            step: 0.01,
            gravitational_constant: 1.0,
            electrical_constant: None,
            integrator: Integrator::SemiImplicitEuler,
        }
    }
}

impl Parameters {
    /// Parameters for a window `[0, final_instant)` stepped by `step`, other values default.
    pub fn new(step: f64, final_instant: f64) -> Self {
        Self {
            step,
            final_instant,
            ..Self::default()
        }
    }

    pub fn with_initial_instant(mut self, initial_instant: f64) -> Self {
        self.initial_instant = initial_instant;
        self
    }

    pub fn with_gravitational_constant(mut self, g: f64) -> Self {
        self.gravitational_constant = g;
        self
    }

    pub fn with_electrical_constant(mut self, k: f64) -> Self {
        self.electrical_constant = Some(k);
        self
    }

    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Length of one `run` window.
    pub fn span(&self) -> f64 {
        self.final_instant - self.initial_instant
    }

    /// Number of instants in one window, `ceil(span / step)`.
    ///
    /// Counted on the instants themselves (`initial + k * step < final`) so a
    /// quotient that rounds just above an integer adds no step at `final`.
    pub fn steps_per_run(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        let instant = |k: usize| self.initial_instant + k as f64 * self.step;
        let mut steps = (self.span() / self.step).ceil() as usize;
        while steps > 0 && instant(steps - 1) >= self.final_instant {
            steps -= 1;
        }
        while instant(steps) < self.final_instant {
            steps += 1;
        }
        steps
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(SimError::invalid_value(format!(
                "step must be a positive finite number, got {}",
                self.step
            )));
        }
        if !(self.initial_instant.is_finite() && self.final_instant.is_finite()) {
            return Err(SimError::invalid_value("instants must be finite"));
        }
        if self.final_instant <= self.initial_instant {
            return Err(SimError::invalid_value(format!(
                "final instant {} must be after initial instant {}",
                self.final_instant, self.initial_instant
            )));
        }
        if !self.gravitational_constant.is_finite() {
            return Err(SimError::invalid_value("gravitational constant must be finite"));
        }
        if let Some(k) = self.electrical_constant {
            if !k.is_finite() {
                return Err(SimError::invalid_value("electrical constant must be finite"));
            }
        }
        Ok(())
    }
}
