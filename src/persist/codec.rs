//! Backing file envelope: base64 text wrapping a JSON `{data, info}` document.

use crate::error::{Result, StoreError};
use crate::types::{Collection, RecordId};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Encode a collection into backing file contents.
pub fn encode(collection: &Collection) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(collection)?;
    Ok(STANDARD.encode(json).into_bytes())
}

/// Decode backing file contents.
///
/// Surrounding whitespace is ignored. The cached row count is recomputed;
/// an identifier above `currentId` or a record whose `id` disagrees with its
/// key is treated as corruption.
pub fn decode(raw: &[u8]) -> Result<Collection> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| StoreError::InvalidFormat(format!("Backing file is not text: {}", e)))?;
    let json = STANDARD.decode(text.trim())?;

    let mut collection: Collection = serde_json::from_slice(&json)
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;

    for (key, record) in &collection.data {
        if *key > collection.info.current_id {
            return Err(StoreError::Corruption(format!(
                "Record id {} exceeds currentId {}",
                key, collection.info.current_id
            )));
        }
        if RecordId::of(record) != Some(RecordId(*key)) {
            return Err(StoreError::Corruption(format!(
                "Record stored under key {} carries a different id",
                key
            )));
        }
    }

    collection.refresh_total_row();
    Ok(collection)
}

/// Read and decode a backing file.
pub fn read_file(path: &Path) -> Result<Collection> {
    let raw = fs::read(path)?;
    decode(&raw)
}

/// Replace a backing file with `bytes`, creating its directory if needed.
///
/// Writes a temporary sibling first and renames it over the target.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let tmp_path = path.with_extension("db.tmp");
    let mut file = File::create(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Schema, Timestamp};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn sample() -> Collection {
        let mut collection =
            Collection::with_schema(Schema::merged_with_base(&Schema::new().with("name", "string")));
        let id = collection.next_id();
        let record = json!({
            "name": "Ada",
            "id": id.0,
            "createdAt": Timestamp::now().to_string(),
            "updatedAt": null,
        });
        collection
            .data
            .insert(id.0, record.as_object().unwrap().clone());
        collection.refresh_total_row();
        collection
    }

    #[test]
    fn test_envelope_is_base64_json() {
        let bytes = encode(&sample()).unwrap();
        let json = STANDARD.decode(&bytes).unwrap();
        let doc: Value = serde_json::from_slice(&json).unwrap();

        assert_eq!(doc["data"]["1"]["name"], "Ada");
        assert_eq!(doc["info"]["currentId"], 1);
        assert_eq!(doc["info"]["totalRow"], 1);
        assert_eq!(doc["info"]["schema"]["name"], "string");
    }

    #[test]
    fn test_decode_recomputes_total_row() {
        let mut collection = sample();
        collection.info.total_row = 42;

        let decoded = decode(&encode(&collection).unwrap()).unwrap();
        assert_eq!(decoded.info.total_row, 1);
        assert_eq!(decoded.data, collection.data);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"not base64 at all!"),
            Err(StoreError::InvalidFormat(_))
        ));

        let not_json = STANDARD.encode(b"{\"data\": ");
        assert!(matches!(
            decode(not_json.as_bytes()),
            Err(StoreError::Deserialization(_))
        ));
    }

    #[test]
    fn test_decode_rejects_id_beyond_counter() {
        let mut collection = sample();
        collection.info.current_id = 0;

        assert!(matches!(
            decode(&encode(&collection).unwrap()),
            Err(StoreError::Corruption(_))
        ));
    }

    #[test]
    fn test_decode_rejects_id_mismatching_key() {
        let mut collection = sample();
        collection.info.current_id = 2;
        let record = collection.data.get_mut(&1).unwrap();
        record.insert("id".to_string(), json!(2));

        let result = decode(&encode(&collection).unwrap());
        assert!(matches!(result, Err(StoreError::Corruption(_))));
    }

    #[test]
    fn test_write_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("people.db");

        write_file(&path, &encode(&sample()).unwrap()).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("db.tmp").exists());
        assert_eq!(read_file(&path).unwrap().info.current_id, 1);
    }
}
