//! Field selectors shared by projections and keyword search.

use crate::types::{Record, Schema};

/// Which fields an operation reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Fields {
    /// Every schema field (`"*"`).
    #[default]
    All,
    /// An explicit, ordered list of names.
    Only(Vec<String>),
}

impl Fields {
    /// Parse exactly `"*"` or a comma-separated list such as `"name, email"`.
    pub fn parse(spec: &str) -> Self {
        if spec == "*" {
            return Fields::All;
        }
        Fields::only(spec.split(','))
    }

    /// Explicit list; names are trimmed and empty names dropped.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Fields::Only(
            names
                .into_iter()
                .map(|name| name.as_ref().trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }

    /// Expand against a schema.
    pub fn resolve(&self, schema: &Schema) -> Vec<String> {
        match self {
            Fields::All => schema.names().map(str::to_string).collect(),
            Fields::Only(names) => names.clone(),
        }
    }
}

impl From<&str> for Fields {
    fn from(spec: &str) -> Self {
        Fields::parse(spec)
    }
}

impl From<String> for Fields {
    fn from(spec: String) -> Self {
        Fields::parse(&spec)
    }
}

impl From<Vec<String>> for Fields {
    fn from(names: Vec<String>) -> Self {
        Fields::only(names)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(names: Vec<&str>) -> Self {
        Fields::only(names)
    }
}

impl From<&[&str]> for Fields {
    fn from(names: &[&str]) -> Self {
        Fields::only(names)
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(names: [&str; N]) -> Self {
        Fields::only(names)
    }
}

/// Copy the listed fields off a record. Fields the record lacks are left out.
pub fn project(record: &Record, fields: &[String]) -> Record {
    fields
        .iter()
        .filter_map(|name| record.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}
