//! Backing file persistence.
//!
//! Each collection lives in one `<name>.db` file. The [`codec`] turns a
//! [`Collection`](crate::types::Collection) into that file's contents; the
//! writer thread owned by each store writes them off the caller's thread.

pub mod codec;
mod writer;

pub(crate) use writer::PersistWriter;
