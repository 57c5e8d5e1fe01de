//! Body references.
//!
//! Overlays and the follow camera accept a body by id, by attach index, by
//! label, or no body at all. [`resolve`] turns any of them into an index.

use crate::error::{SimError, SimResult};
use crate::simulation::states::{Body, BodyId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodyRef {
    Id(BodyId),
    Index(usize),
    Label(String),
    #[default]
    None,
}

impl From<BodyId> for BodyRef {
    fn from(id: BodyId) -> Self {
        BodyRef::Id(id)
    }
}

impl From<&Body> for BodyRef {
    fn from(body: &Body) -> Self {
        BodyRef::Id(body.id())
    }
}

impl From<usize> for BodyRef {
    fn from(index: usize) -> Self {
        BodyRef::Index(index)
    }
}

impl From<&str> for BodyRef {
    fn from(label: &str) -> Self {
        BodyRef::Label(label.to_string())
    }
}

impl From<String> for BodyRef {
    fn from(label: String) -> Self {
        BodyRef::Label(label)
    }
}

impl<T: Into<BodyRef>> From<Option<T>> for BodyRef {
    fn from(value: Option<T>) -> Self {
        value.map_or(BodyRef::None, Into::into)
    }
}

/// Attach index of the body `reference` names within `bodies`.
///
/// `BodyRef::None` resolves to `None`. Labels match the first body in attach
/// order.
pub fn resolve(bodies: &[Body], reference: &BodyRef) -> SimResult<Option<usize>> {
    match reference {
        BodyRef::None => Ok(None),
        BodyRef::Index(i) if *i < bodies.len() => Ok(Some(*i)),
        BodyRef::Index(i) => Err(SimError::InvalidReference(format!(
            "index {i} is out of range for {} bodies",
            bodies.len()
        ))),
        BodyRef::Id(id) => bodies
            .iter()
            .position(|b| b.id() == *id)
            .map(Some)
            .ok_or_else(|| SimError::unknown_body(*id)),
        BodyRef::Label(label) => bodies
            .iter()
            .position(|b| b.label() == Some(label.as_str()))
            .map(Some)
            .ok_or_else(|| SimError::UnknownLabel(label.clone())),
    }
}
