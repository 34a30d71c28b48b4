//! # Collection Store
//!
//! A minimal record store for small CRUD services. Each named collection
//! lives in memory and is persisted to a single `<name>.db` file.
//!
//! ## Core Concepts
//!
//! - **Records**: JSON objects shaped by the collection schema, plus the
//!   store-owned `id`, `createdAt` and `updatedAt` fields
//! - **Schema**: advisory field types; decides which input fields are kept
//! - **Queries**: keyword search and AND/OR selection with projection and paging
//! - **Persistence**: full-collection snapshots, written in the background
//!
//! ## Example
//!
//! ```ignore
//! use collection_store::{Find, RecordStore, Schema, StoreConfig};
//!
//! let schema = Schema::new().with("name", "string").with("email", "string");
//! let store = RecordStore::open_or_create("contacts", &schema, StoreConfig::default())?;
//!
//! let ada = store.insert_json(json!({"name": "Ada Lovelace"}))?;
//! let hits = store.find(&Find::new("name", "lovelace"));
//! ```

pub mod error;
pub mod models;
pub mod persist;
pub mod query;
pub mod store;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use models::{Faq, FaqAnswer, FaqComment, Model, PhoneBook};
pub use query::{Criteria, Fields, Find, Page, Predicate, Select};
pub use store::{Durability, RecordStore, StoreConfig};
pub use types::*;
