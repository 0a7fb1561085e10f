//! Stored property values.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque, globally unique entity identifier.
pub type EntityId = String;

/// Property bag used for creation payloads and filter evaluation.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// One stored property value.
///
/// Array-like variants are owned, so every write replaces the whole value
/// and downstream change detection always sees a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Vec3(DVec3),
    IdList(Vec<EntityId>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the vector only when every component is finite.
    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            Self::Vec3(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub fn as_id_list(&self) -> Option<&[EntityId]> {
        match self {
            Self::IdList(ids) => Some(ids.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Builds a reference value; `None` clears the reference.
    pub fn reference(id: Option<&str>) -> Self {
        match id {
            Some(id) if !id.is_empty() => Self::Text(id.to_string()),
            _ => Self::Null,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DVec3> for PropertyValue {
    fn from(value: DVec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Vec<EntityId>> for PropertyValue {
    fn from(value: Vec<EntityId>) -> Self {
        Self::IdList(value)
    }
}

/// Declared type of a property in the store schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Bool,
    Number,
    Text,
    Vec3,
    IdList,
    /// Entity id stored as text; `null` means unassigned.
    Reference,
}

impl PropertyType {
    /// Returns whether `value` may be stored under this declared type.
    ///
    /// `null` is accepted for every type and clears the property.
    pub fn accepts(self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (_, PropertyValue::Null)
                | (Self::Bool, PropertyValue::Bool(_))
                | (Self::Number, PropertyValue::Number(_))
                | (Self::Text, PropertyValue::Text(_))
                | (Self::Reference, PropertyValue::Text(_))
                | (Self::Vec3, PropertyValue::Vec3(_))
                | (Self::IdList, PropertyValue::IdList(_))
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "text",
            Self::Vec3 => "vec3",
            Self::IdList => "id_list",
            Self::Reference => "reference",
        }
    }
}
