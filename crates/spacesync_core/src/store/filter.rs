//! Declarative property filters evaluated inside the store.

use crate::model::value::{PropertyMap, PropertyValue};

/// Equality/boolean predicate over one entity's properties.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyFilter {
    /// Property equals the value; a missing property equals `Null`.
    Eq(String, PropertyValue),
    /// Property is `Bool(true)`.
    IsTrue(String),
    And(Vec<PropertyFilter>),
    Or(Vec<PropertyFilter>),
    Not(Box<PropertyFilter>),
}

impl PropertyFilter {
    pub fn eq(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::Eq(name.into(), value.into())
    }

    pub fn is_true(name: impl Into<String>) -> Self {
        Self::IsTrue(name.into())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Property names this filter reads.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn matches(&self, properties: &PropertyMap) -> bool {
        match self {
            Self::Eq(name, expected) => match properties.get(name) {
                Some(value) => value == expected,
                None => expected.is_null(),
            },
            Self::IsTrue(name) => properties
                .get(name)
                .and_then(PropertyValue::as_bool)
                .unwrap_or(false),
            Self::And(filters) => filters.iter().all(|filter| filter.matches(properties)),
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(properties)),
            Self::Not(filter) => !filter.matches(properties),
        }
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Eq(name, _) | Self::IsTrue(name) => names.push(name.as_str()),
            Self::And(filters) | Self::Or(filters) => {
                for filter in filters {
                    filter.collect_names(names);
                }
            }
            Self::Not(filter) => filter.collect_names(names),
        }
    }
}
