//! Named collections with fixed schemas.
//!
//! A [`Model`] pairs a collection name with the schema it is created with;
//! open one with [`RecordStore::open_model`](crate::RecordStore::open_model).

use crate::types::{FieldType, Schema};

/// A collection known by name and schema.
pub trait Model {
    /// Collection name, and backing file stem.
    const NAME: &'static str;

    /// Caller schema, merged with the base schema on creation.
    fn schema() -> Schema;
}

/// Contacts: name, number, email, address.
pub struct PhoneBook;

impl Model for PhoneBook {
    const NAME: &'static str = "PhoneBook";

    fn schema() -> Schema {
        Schema::new()
            .with("name", FieldType::String)
            .with("number", FieldType::String)
            .with("email", FieldType::String)
            .with("address", FieldType::String)
    }
}

/// FAQ questions. Answers, categories and ratings are embedded arrays.
pub struct Faq;

impl Model for Faq {
    const NAME: &'static str = "FAQModel";

    fn schema() -> Schema {
        Schema::new()
            .with("id", FieldType::String)
            .with("question_id", FieldType::String)
            .with("question", FieldType::String)
            .with("answers", FieldType::Array)
            .with("categories", FieldType::Array)
            .with("ratings", FieldType::Array)
    }
}

pub struct FaqAnswer;

impl Model for FaqAnswer {
    const NAME: &'static str = "AnswerModel";

    fn schema() -> Schema {
        Schema::new()
            .with("id", FieldType::String)
            .with("answer_id", FieldType::String)
            .with("answer", FieldType::String)
            .with("ratings", FieldType::Array)
            .with("comments", FieldType::Array)
    }
}

/// Comments on answers, and on other comments via `parent_id`.
pub struct FaqComment;

impl Model for FaqComment {
    const NAME: &'static str = "CommentsModel";

    fn schema() -> Schema {
        Schema::new()
            .with("id", FieldType::String)
            .with("comment", FieldType::String)
            .with("ratings", FieldType::Array)
            .with("parent_id", FieldType::String)
            .with("comment_id", FieldType::String)
            .with("comments", FieldType::Array)
    }
}
