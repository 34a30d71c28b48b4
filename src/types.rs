//! Core types for the record store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Field holding the store-assigned identifier.
pub const ID_FIELD: &str = "id";

/// Field stamped once at insert.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Field stamped on every update.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Fields owned by the store. Caller input never sets these.
pub const SYSTEM_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// A record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Unique identifier for a record.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Read the identifier stored on a record, if any.
    pub fn of(record: &Record) -> Option<Self> {
        record.get(ID_FIELD).and_then(Value::as_u64).map(RecordId)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-clock instant in UTC, rendered as RFC 3339 with millisecond precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }

    /// JSON value as stored on records.
    pub fn to_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Declared logical type of a schema field.
///
/// Advisory only: values are never checked against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Date,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Date => "Date",
            FieldType::Other(name) => name,
        }
    }
}

/// Only the exact canonical spellings map to a named variant. Any other
/// spelling is kept verbatim in `Other` so stored schemas round-trip unchanged.
impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        match name {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            "Date" => FieldType::Date,
            _ => FieldType::Other(name.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        FieldType::from(name.as_str())
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping from field name to declared type.
///
/// Serialized as a JSON object whose key order is the declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
}

impl Schema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields every collection carries.
    pub fn base() -> Self {
        Schema::new()
            .with(ID_FIELD, FieldType::Number)
            .with(CREATED_AT_FIELD, FieldType::Date)
            .with(UPDATED_AT_FIELD, FieldType::Date)
    }

    /// Builder form of [`Schema::insert`].
    pub fn with(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.insert(name, ty);
        self
    }

    /// Declare a field. Redeclaring keeps the original position and replaces the type.
    pub fn insert(&mut self, name: impl Into<String>, ty: impl Into<FieldType>) {
        let name = name.into();
        let ty = ty.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = ty,
            None => self.fields.push((name, ty)),
        }
    }

    /// Base schema overlaid with `other`.
    pub fn merged_with_base(other: &Schema) -> Self {
        let mut merged = Schema::base();
        for (name, ty) in &other.fields {
            merged.insert(name.clone(), ty.clone());
        }
        merged
    }

    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, ty)| ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Declared fields that callers may write (everything but system fields).
    pub fn writable_fields(&self) -> Vec<String> {
        self.names()
            .filter(|name| !SYSTEM_FIELDS.contains(name))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, ty) in &self.fields {
            map.serialize_entry(name, ty.as_str())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Schema;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field names to type names")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut schema = Schema::new();
                while let Some((name, ty)) = map.next_entry::<String, String>()? {
                    schema.insert(name, ty);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// Collection metadata persisted next to the records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Last identifier handed out. Never decremented.
    pub current_id: u64,

    /// Cached record count, recomputed after inserts and deletes.
    pub total_row: u64,

    /// Base schema merged with the caller's schema at creation.
    pub schema: Schema,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            current_id: 0,
            total_row: 0,
            schema: Schema::base(),
        }
    }
}

/// Everything a store owns: the records keyed by id, and their metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub data: BTreeMap<u64, Record>,
    pub info: Metadata,
}

impl Collection {
    /// Empty collection with the given merged schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            data: BTreeMap::new(),
            info: Metadata {
                schema,
                ..Default::default()
            },
        }
    }

    pub fn refresh_total_row(&mut self) {
        self.info.total_row = self.data.len() as u64;
    }

    /// Hand out the next identifier.
    pub fn next_id(&mut self) -> RecordId {
        self.info.current_id += 1;
        RecordId(self.info.current_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_base_first_and_overrides_in_place() {
        let caller = Schema::new()
            .with("name", "string")
            .with("id", "string")
            .with("tags", "array");

        let merged = Schema::merged_with_base(&caller);
        let names: Vec<&str> = merged.names().collect();
        assert_eq!(names, vec!["id", "createdAt", "updatedAt", "name", "tags"]);
        assert_eq!(merged.get("id"), Some(&FieldType::String));
        assert_eq!(merged.writable_fields(), vec!["name", "tags"]);
    }

    #[test]
    fn test_schema_serializes_in_declaration_order() {
        let schema = Schema::base().with("zeta", "string").with("alpha", "number");
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"{"id":"number","createdAt":"Date","updatedAt":"Date","zeta":"string","alpha":"number"}"#
        );

        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::from("Date"), FieldType::Date);
        assert_eq!(FieldType::from("string"), FieldType::String);
        assert_eq!(
            FieldType::from("uuid"),
            FieldType::Other("uuid".to_string())
        );
        assert_eq!(String::from(FieldType::Other("uuid".into())), "uuid");
    }

    #[test]
    fn test_field_type_keeps_caller_spelling() {
        for name in ["String", "Array", "date", "NUMBER"] {
            let ty = FieldType::from(name);
            assert_eq!(ty, FieldType::Other(name.to_string()));
            assert_eq!(ty.as_str(), name);
        }

        let schema = Schema::new().with("name", "String").with("born", "date");
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"name":"String","born":"date"}"#);
        assert_eq!(serde_json::from_str::<Schema>(&json).unwrap(), schema);
    }

    #[test]
    fn test_metadata_uses_camel_case() {
        let info = Metadata::default();
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["currentId"], 0);
        assert_eq!(value["totalRow"], 0);
        assert_eq!(value["schema"]["createdAt"], "Date");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Timestamp::now();
        let rendered = ts.to_string();
        assert!(rendered.ends_with('Z'));
        // 2020-01-01T00:00:00.000Z
        assert_eq!(rendered.len(), 24);
        assert!(DateTime::parse_from_rfc3339(&rendered).is_ok());
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let mut collection = Collection::default();
        assert_eq!(collection.next_id(), RecordId(1));
        assert_eq!(collection.next_id(), RecordId(2));
        assert_eq!(collection.info.current_id, 2);
    }
}
