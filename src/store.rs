//! The record store: one named collection backed by one file.

use crate::error::{Result, StoreError};
use crate::models::Model;
use crate::persist::{codec, PersistWriter};
use crate::query::{contains_keyword, project, Fields, Find, Select};
use crate::types::{
    Collection, Metadata, Record, RecordId, Schema, Timestamp, CREATED_AT_FIELD, ID_FIELD,
    UPDATED_AT_FIELD,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// When a mutation's snapshot reaches disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Durability {
    /// Queued to a writer thread; failures are logged, not returned.
    #[default]
    Background,
    /// Written before the operation returns; failures are returned.
    Immediate,
}

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding `<name>.db` backing files.
    pub base_dir: PathBuf,

    /// Persistence mode for mutations.
    pub durability: Durability,

    /// Whether to create the collection if its file doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./db"),
            durability: Durability::Background,
            create_if_missing: true,
        }
    }
}

/// A schema-typed collection of records persisted to a single file.
///
/// Every operation runs against the in-memory collection under one lock, so
/// callers see a linear history. Mutations then persist the whole collection;
/// with [`Durability::Background`] that write may lag behind the return.
pub struct RecordStore {
    name: String,
    path: PathBuf,
    state: RwLock<Collection>,
    writer: Option<PersistWriter>,
}

impl RecordStore {
    /// Open a collection, creating it with `schema` if its file is missing.
    ///
    /// On reopen the schema stored on disk wins and `schema` is ignored.
    pub fn open_or_create(name: &str, schema: &Schema, config: StoreConfig) -> Result<Self> {
        let path = Self::backing_path(name, &config)?;
        if path.exists() {
            Self::load(name, path, config)
        } else if config.create_if_missing {
            Self::initialize(name, path, schema, config)
        } else {
            Err(StoreError::CollectionNotFound(name.to_string()))
        }
    }

    /// Create a new collection. Fails if its file already exists.
    pub fn create(name: &str, schema: &Schema, config: StoreConfig) -> Result<Self> {
        let path = Self::backing_path(name, &config)?;
        if path.exists() {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        Self::initialize(name, path, schema, config)
    }

    /// Open an existing collection.
    pub fn open(name: &str, config: StoreConfig) -> Result<Self> {
        let path = Self::backing_path(name, &config)?;
        if !path.exists() {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }
        Self::load(name, path, config)
    }

    /// Open or create the collection described by a [`Model`].
    pub fn open_model<M: Model>(config: StoreConfig) -> Result<Self> {
        Self::open_or_create(M::NAME, &M::schema(), config)
    }

    fn backing_path(name: &str, config: &StoreConfig) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(StoreError::InvalidCollectionName(name.to_string()));
        }
        Ok(config.base_dir.join(format!("{}.db", name)))
    }

    /// Write an empty collection with the merged schema, then load it back.
    fn initialize(name: &str, path: PathBuf, schema: &Schema, config: StoreConfig) -> Result<Self> {
        let collection = Collection::with_schema(Schema::merged_with_base(schema));
        codec::write_file(&path, &codec::encode(&collection)?)?;

        info!(collection = name, path = ?path, fields = collection.info.schema.len(), "Collection created");

        Self::load(name, path, config)
    }

    fn load(name: &str, path: PathBuf, config: StoreConfig) -> Result<Self> {
        let collection = codec::read_file(&path).map_err(|e| {
            error!(collection = name, path = ?path, error = %e, "Backing file could not be loaded");
            e
        })?;

        let writer = match config.durability {
            Durability::Background => Some(PersistWriter::spawn(name, path.clone())?),
            Durability::Immediate => None,
        };

        info!(
            collection = name,
            records = collection.info.total_row,
            current_id = collection.info.current_id,
            "Collection opened"
        );

        Ok(Self {
            name: name.to_string(),
            path,
            state: RwLock::new(collection),
            writer,
        })
    }

    // --- Record Operations ---

    /// Insert one record. Returns it with its system fields populated.
    pub fn insert(&self, input: Record) -> Result<Record> {
        self.insert_many(vec![input])?
            .pop()
            .ok_or_else(|| StoreError::InvalidRecord("insert produced no record".into()))
    }

    /// Insert records in order, assigning consecutive identifiers.
    ///
    /// Only writable schema fields are copied; missing ones become `null`.
    pub fn insert_many(&self, inputs: Vec<Record>) -> Result<Vec<Record>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.write();
        let writable = state.info.schema.writable_fields();
        let created_at = Timestamp::now().to_value();

        let mut created = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let id = state.next_id();

            let mut record = build_record(&writable, input);
            record.insert(ID_FIELD.to_string(), Value::from(id.0));
            record.insert(CREATED_AT_FIELD.to_string(), created_at.clone());
            record.insert(UPDATED_AT_FIELD.to_string(), Value::Null);

            state.data.insert(id.0, record.clone());
            created.push(record);
        }
        state.refresh_total_row();

        debug!(
            collection = %self.name,
            count = created.len(),
            current_id = state.info.current_id,
            "Records inserted"
        );

        self.persist(&state)?;
        Ok(created)
    }

    /// Insert from loose JSON: an object yields one record, an array of
    /// objects yields the created records (a single one unwrapped).
    ///
    /// Every element is checked before anything is inserted.
    pub fn insert_json(&self, input: Value) -> Result<Value> {
        match input {
            Value::Object(record) => Ok(Value::Object(self.insert(record)?)),
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(record) => Ok(record),
                        other => Err(StoreError::InvalidRecord(format!(
                            "element {} is {}, expected an object",
                            i,
                            json_kind(&other)
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut created = self.insert_many(records)?;
                if created.len() == 1 {
                    if let Some(record) = created.pop() {
                        return Ok(Value::Object(record));
                    }
                }
                Ok(Value::Array(created.into_iter().map(Value::Object).collect()))
            }
            other => Err(StoreError::InvalidRecord(format!(
                "expected an object or an array of objects, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Project one record by id.
    pub fn select_by_id(&self, id: RecordId, fields: impl Into<Fields>) -> Result<Record> {
        let state = self.state.read();
        let record = state.data.get(&id.0).ok_or(StoreError::RecordNotFound(id))?;

        let fields = fields.into().resolve(&state.info.schema);
        Ok(project(record, &fields))
    }

    /// Merge the writable schema fields of `partial` over a record and stamp
    /// `updatedAt`. Returns the full updated record.
    pub fn update_by_id(&self, id: RecordId, partial: Record) -> Result<Record> {
        let mut state = self.state.write();
        let writable = state.info.schema.writable_fields();

        let record = state
            .data
            .get_mut(&id.0)
            .ok_or(StoreError::RecordNotFound(id))?;

        for (field, value) in partial {
            if writable.contains(&field) {
                record.insert(field, value);
            }
        }
        record.insert(UPDATED_AT_FIELD.to_string(), Timestamp::now().to_value());
        let updated = record.clone();

        debug!(collection = %self.name, id = id.0, "Record updated");

        self.persist(&state)?;
        Ok(updated)
    }

    /// Remove a record. Its identifier is never handed out again.
    pub fn delete_by_id(&self, id: RecordId) -> Result<bool> {
        let mut state = self.state.write();

        if state.data.remove(&id.0).is_none() {
            return Err(StoreError::RecordNotFound(id));
        }
        state.refresh_total_row();

        debug!(collection = %self.name, id = id.0, remaining = state.info.total_row, "Record deleted");

        self.persist(&state)?;
        Ok(true)
    }

    // --- Queries ---

    /// Case-insensitive keyword search over string fields.
    pub fn find(&self, query: &Find) -> Vec<Record> {
        let state = self.state.read();
        let schema = &state.info.schema;
        let search_fields = query.search_fields.resolve(schema);
        let fields = query.fields.resolve(schema);
        let needle = query.keyword.to_lowercase();

        let matched: Vec<&Record> = state
            .data
            .values()
            .filter(|record| contains_keyword(record, &search_fields, &needle))
            .collect();

        query
            .page
            .apply(matched)
            .into_iter()
            .map(|record| project(record, &fields))
            .collect()
    }

    /// Filtered, projected and paged selection.
    pub fn select(&self, query: &Select) -> Vec<Record> {
        let state = self.state.read();
        let fields = query.fields.resolve(&state.info.schema);
        let predicate = query.predicate();

        let matched: Vec<&Record> = state
            .data
            .values()
            .filter(|record| predicate.matches(record))
            .collect();

        query
            .page
            .apply(matched)
            .into_iter()
            .map(|record| project(record, &fields))
            .collect()
    }

    // --- Inspection ---

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The merged schema fixed at creation.
    pub fn schema(&self) -> Schema {
        self.state.read().info.schema.clone()
    }

    pub fn metadata(&self) -> Metadata {
        self.state.read().info.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().data.is_empty()
    }

    // --- Persistence ---

    /// Wait until every mutation so far has been written (or failed).
    pub fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush();
        }
    }

    /// Background writes that failed since the store was opened.
    pub fn persist_failures(&self) -> u64 {
        self.writer.as_ref().map_or(0, PersistWriter::failures)
    }

    /// Persist the collection. Called with the state lock held so snapshots
    /// are queued in mutation order.
    fn persist(&self, collection: &Collection) -> Result<()> {
        match &self.writer {
            Some(writer) => {
                match codec::encode(collection) {
                    Ok(bytes) => writer.submit(bytes),
                    Err(e) => {
                        error!(collection = %self.name, error = %e, "Failed to encode snapshot")
                    }
                }
                Ok(())
            }
            None => {
                let result = codec::encode(collection)
                    .and_then(|bytes| codec::write_file(&self.path, &bytes));
                if let Err(e) = &result {
                    error!(collection = %self.name, error = %e, "Failed to persist snapshot");
                }
                result
            }
        }
    }
}

/// Build a record holding exactly `fields`, taken from `input` or `null`.
fn build_record(fields: &[String], input: &Record) -> Record {
    fields
        .iter()
        .map(|field| (field.clone(), input.get(field).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
