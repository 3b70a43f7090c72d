//! Object handles and typed state facets

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a live object, issued by the object registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a single rigid body (link) of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// Named state facet an object may expose
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Powered on / active
    ToggledOn,
    /// Already cut into parts
    Sliced,
    /// Lid or door open
    Open,
    /// Heated past its cooking threshold
    Cooked,
    /// Holds the named fluid
    Filled(String),
    /// Any other facet, by name
    Custom(String),
}

impl StateKind {
    /// Facet for "filled with `fluid`"
    pub fn filled(fluid: impl Into<String>) -> Self {
        StateKind::Filled(fluid.into())
    }
}

/// Current value of a state facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl StateValue {
    /// Get as bool, if this is a boolean facet
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        StateValue::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        StateValue::Int(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        StateValue::Float(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        StateValue::Text(value.to_string())
    }
}

/// Sub-part an object splits into when sliced
///
/// Offsets are relative to the base link of the whole object, before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPart {
    pub category: String,
    pub model: String,
    /// Position offset in the object's frame
    pub offset: Vec3,
    /// Rotation relative to the object's orientation
    #[serde(default = "identity")]
    pub rotation: Quat,
}

fn identity() -> Quat {
    Quat::IDENTITY
}

impl ObjectPart {
    pub fn new(category: impl Into<String>, model: impl Into<String>, offset: Vec3) -> Self {
        Self {
            category: category.into(),
            model: model.into(),
            offset,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}
