// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Document Sources
//!
//! The read side of a sync pass. A [`DocumentSource`] authenticates once
//! per pass and then fetches an entire collection in one synchronous
//! request; documents are owned by the current pass and discarded after
//! mapping.

pub mod firestore;

pub use firestore::FirestoreSource;

use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::core::error::FireSyncResult;

/// One source document: an opaque identifier plus its wire-tagged field
/// tree. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A collection-scoped document reader.
pub trait DocumentSource: Debug {
    /// Acquire whatever credentials the source needs for the coming pass.
    /// Called at the start of every collection sync; failures are fatal
    /// for that collection.
    fn authenticate(&mut self) -> FireSyncResult<()>;

    /// Fetch every document in `collection` in one request. No
    /// pagination: large collections arrive in a single response. A
    /// non-success response is fatal for the collection.
    fn fetch(&self, collection: &str) -> FireSyncResult<Vec<Document>>;
}
