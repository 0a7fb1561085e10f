//! Type schema for the store: type tags, capabilities, typed properties.
//!
//! # Invariants
//! - Type tags and property names match `^[A-Za-z][A-Za-z0-9_]*$`.
//! - A type tag is declared at most once per registry.

use crate::model::movable::{props as movable_props, MovableKind};
use crate::model::space::{props as space_props, SPACE_TYPE};
use crate::model::value::PropertyType;
use crate::registry::SPACE_MANAGER_TYPE;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Capability shared by every movable kind.
pub const MOVABLE_CAPABILITY: &str = "Movable";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid identifier regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidTypeTag(String),
    InvalidPropertyName { type_tag: String, name: String },
    DuplicateType(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTypeTag(value) => write!(f, "type tag is invalid: `{value}`"),
            Self::InvalidPropertyName { type_tag, name } => {
                write!(f, "property name `{name}` is invalid for type {type_tag}")
            }
            Self::DuplicateType(value) => write!(f, "type already declared: {value}"),
        }
    }
}

impl Error for SchemaError {}

/// Declaration of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    pub type_tag: String,
    pub capabilities: BTreeSet<String>,
    pub properties: BTreeMap<String, PropertyType>,
}

impl TypeSchema {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            capabilities: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, kind: PropertyType) -> Self {
        self.properties.insert(name.into(), kind);
        self
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if !IDENTIFIER_RE.is_match(&self.type_tag) {
            return Err(SchemaError::InvalidTypeTag(self.type_tag.clone()));
        }
        if let Some(name) = self
            .properties
            .keys()
            .find(|name| !IDENTIFIER_RE.is_match(name))
        {
            return Err(SchemaError::InvalidPropertyName {
                type_tag: self.type_tag.clone(),
                name: name.clone(),
            });
        }
        Ok(())
    }
}

/// Declared entity types of one store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    types: BTreeMap<String, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with every movable kind, spaces and the space manager.
    pub fn with_defaults() -> Self {
        let types = builtin_schemas()
            .into_iter()
            .map(|schema| (schema.type_tag.clone(), schema))
            .collect();
        Self { types }
    }

    pub fn register(&mut self, schema: TypeSchema) -> Result<(), SchemaError> {
        schema.validate()?;
        if self.types.contains_key(&schema.type_tag) {
            return Err(SchemaError::DuplicateType(schema.type_tag));
        }
        self.types.insert(schema.type_tag.clone(), schema);
        Ok(())
    }

    pub fn get(&self, type_tag: &str) -> Option<&TypeSchema> {
        self.types.get(type_tag)
    }

    pub fn property_type(&self, type_tag: &str, name: &str) -> Option<PropertyType> {
        self.types
            .get(type_tag)
            .and_then(|schema| schema.properties.get(name).copied())
    }

    /// Sorted type tags declaring `capability`.
    pub fn types_implementing(&self, capability: &str) -> Vec<String> {
        self.types
            .values()
            .filter(|schema| schema.capabilities.contains(capability))
            .map(|schema| schema.type_tag.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn builtin_schemas() -> Vec<TypeSchema> {
    let mut schemas: Vec<TypeSchema> = MovableKind::ALL.into_iter().map(movable_schema).collect();
    schemas.push(
        TypeSchema::new(SPACE_TYPE)
            .property(space_props::NAME, PropertyType::Text)
            .property(space_props::MOVABLES, PropertyType::IdList)
            .property(space_props::BOUNDARY_ORIGIN, PropertyType::Vec3)
            .property(space_props::BOUNDARY_SIZE, PropertyType::Vec3)
            .property(space_props::PROJECTION, PropertyType::Text)
            .property(space_props::SHOW_BOUNDARY, PropertyType::Bool)
            .property(space_props::CLIPPING_MODE, PropertyType::Text),
    );
    schemas.push(
        TypeSchema::new(SPACE_MANAGER_TYPE)
            .property(space_props::CURRENT_SPACE, PropertyType::Reference),
    );
    schemas
}

fn movable_schema(kind: MovableKind) -> TypeSchema {
    let schema = TypeSchema::new(kind.as_str())
        .capability(MOVABLE_CAPABILITY)
        .property(movable_props::POSITION, PropertyType::Vec3)
        .property(movable_props::ROTATION, PropertyType::Vec3)
        .property(movable_props::SELECTED, PropertyType::Bool)
        .property(movable_props::HOVERED, PropertyType::Bool)
        .property(movable_props::BEING_DRAGGED, PropertyType::Bool)
        .property(movable_props::SPACE, PropertyType::Reference);
    match kind {
        MovableKind::Note => schema.property(movable_props::TEXT, PropertyType::Text),
        MovableKind::Image | MovableKind::Model => {
            schema.property(movable_props::URL, PropertyType::Text)
        }
        MovableKind::ScreenShare => schema.property(movable_props::CLIENT_ID, PropertyType::Text),
        MovableKind::Trashcan => schema,
    }
}
