//! Trajectory-derived overlays
//!
//! Each overlay resolves its bodies and its time window when it is built and
//! afterwards reads only the history. Outputs are plain positions; colours and
//! styles are left to the renderer.

use crate::error::{SimError, SimResult};
use crate::simulation::engine::Simulation;
use crate::simulation::history::History;
use crate::simulation::reference::BodyRef;
use crate::simulation::states::NVec2;
use crate::visualization::window::{TimeWindow, WindowSpec};

/// Geometry that is shown only inside its time window
pub trait Overlay {
    type Output;

    fn window(&self) -> &TimeWindow;

    /// Geometry at `step`, ignoring visibility
    fn geometry(&self, history: &History, step: usize) -> Option<Self::Output>;

    /// Geometry at `step` if the overlay is visible there
    fn at_step(&self, history: &History, step: usize) -> Option<Self::Output> {
        if self.window().is_visible(history, step) {
            self.geometry(history, step)
        } else {
            None
        }
    }

    /// Geometry at the snapshot nearest to `t`
    fn at_instant(&self, history: &History, t: f64) -> Option<Self::Output> {
        history.nearest(t).and_then(|step| self.at_step(history, step))
    }
}

fn required(sim: &Simulation, reference: BodyRef, role: &str) -> SimResult<usize> {
    sim.resolve(reference)?
        .ok_or_else(|| SimError::InvalidReference(format!("the {role} body is required")))
}

/// Position of the body at `index` in snapshot `step`, or the origin for no body
fn anchor(history: &History, step: usize, index: Option<usize>) -> Option<NVec2> {
    match index {
        Some(i) => history.get(step)?.position(i),
        None => Some(NVec2::zeros()),
    }
}

/// Positions of `body` over the window's extent, relative to `reference` at
/// each past step and re-anchored at the reference's position at `step`
fn relative_path(
    history: &History,
    window: &TimeWindow,
    step: usize,
    body: usize,
    reference: Option<usize>,
) -> Option<(Vec<NVec2>, NVec2)> {
    let now = anchor(history, step, reference)?;
    let path = window
        .extent(history, step)
        .filter_map(|i| {
            let pos = history.get(i)?.position(body)?;
            let origin = anchor(history, i, reference)?;
            Some(pos - origin + now)
        })
        .collect();
    Some((path, now))
}

/// The path a body leaves behind
#[derive(Debug, Clone)]
pub struct Trail {
    body: usize,
    reference: Option<usize>, // frame the trail is drawn in, None for world coordinates
    window: TimeWindow,
}

impl Trail {
    pub fn new(
        sim: &Simulation,
        body: impl Into<BodyRef>,
        reference: impl Into<BodyRef>,
        spec: WindowSpec,
    ) -> SimResult<Self> {
        Ok(Self {
            body: required(sim, body.into(), "trail")?,
            reference: sim.resolve(reference)?,
            window: spec.resolve(sim.history())?,
        })
    }

    pub fn body(&self) -> usize {
        self.body
    }

    pub fn reference(&self) -> Option<usize> {
        self.reference
    }
}

impl Overlay for Trail {
    type Output = Vec<NVec2>;

    fn window(&self) -> &TimeWindow {
        &self.window
    }

    fn geometry(&self, history: &History, step: usize) -> Option<Vec<NVec2>> {
        relative_path(history, &self.window, step, self.body, self.reference).map(|(path, _)| path)
    }
}

/// Area swept by a satellite around a focus, for checking Kepler's second law
#[derive(Debug, Clone)]
pub struct KeplerSector {
    focus: usize,
    satellite: usize,
    window: TimeWindow,
}

impl KeplerSector {
    pub fn new(
        sim: &Simulation,
        focus: impl Into<BodyRef>,
        satellite: impl Into<BodyRef>,
        spec: WindowSpec,
    ) -> SimResult<Self> {
        Ok(Self {
            focus: required(sim, focus.into(), "focus")?,
            satellite: required(sim, satellite.into(), "satellite")?,
            window: spec.resolve(sim.history())?,
        })
    }
}

impl Overlay for KeplerSector {
    /// Polygon vertices; the last one is the focus
    type Output = Vec<NVec2>;

    fn window(&self) -> &TimeWindow {
        &self.window
    }

    fn geometry(&self, history: &History, step: usize) -> Option<Vec<NVec2>> {
        let (mut polygon, focus) =
            relative_path(history, &self.window, step, self.satellite, Some(self.focus))?;
        polygon.push(focus);
        Some(polygon)
    }
}

/// A point attached to a body, e.g. where an annotation is written
#[derive(Debug, Clone)]
pub struct Marker {
    pub text: String,
    offset: NVec2,
    reference: Option<usize>,
    window: TimeWindow,
}

impl Marker {
    /// Marker at `offset` from `reference`, shown during `(start, stop)`
    pub fn new(
        sim: &Simulation,
        text: impl Into<String>,
        offset: NVec2,
        reference: impl Into<BodyRef>,
        start: f64,
        stop: Option<f64>,
    ) -> SimResult<Self> {
        let spec = WindowSpec {
            start,
            pause: None,
            stop,
        };
        Ok(Self {
            text: text.into(),
            offset,
            reference: sim.resolve(reference)?,
            window: spec.resolve(sim.history())?,
        })
    }
}

impl Overlay for Marker {
    type Output = NVec2;

    fn window(&self) -> &TimeWindow {
        &self.window
    }

    fn geometry(&self, history: &History, step: usize) -> Option<NVec2> {
        Some(self.offset + anchor(history, step, self.reference)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowGeometry {
    pub tail: NVec2,
    pub head: NVec2,
    pub delta: NVec2, // head - tail
}

/// Arrow between two points, each optionally attached to a body
#[derive(Debug, Clone)]
pub struct Arrow {
    tail: NVec2,
    head: NVec2,
    tail_ref: Option<usize>,
    head_ref: Option<usize>,
    window: TimeWindow,
}

impl Arrow {
    pub fn new(
        sim: &Simulation,
        (tail, tail_ref): (NVec2, BodyRef),
        (head, head_ref): (NVec2, BodyRef),
        start: f64,
        stop: Option<f64>,
    ) -> SimResult<Self> {
        let spec = WindowSpec {
            start,
            pause: None,
            stop,
        };
        Ok(Self {
            tail,
            head,
            tail_ref: sim.resolve(tail_ref)?,
            head_ref: sim.resolve(head_ref)?,
            window: spec.resolve(sim.history())?,
        })
    }
}

impl Overlay for Arrow {
    type Output = ArrowGeometry;

    fn window(&self) -> &TimeWindow {
        &self.window
    }

    fn geometry(&self, history: &History, step: usize) -> Option<ArrowGeometry> {
        let tail = self.tail + anchor(history, step, self.tail_ref)?;
        let head = self.head + anchor(history, step, self.head_ref)?;
        Some(ArrowGeometry {
            tail,
            head,
            delta: head - tail,
        })
    }
}

/// Frame centre for a camera following a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowCamera {
    target: Option<usize>,
}

impl FollowCamera {
    pub fn new(sim: &Simulation, target: impl Into<BodyRef>) -> SimResult<Self> {
        Ok(Self {
            target: sim.resolve(target)?,
        })
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    /// Origin when nothing is followed or the target was not yet recorded
    pub fn center(&self, history: &History, step: usize) -> NVec2 {
        anchor(history, step, self.target).unwrap_or_else(NVec2::zeros)
    }
}
