// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sync Driver
//!
//! Orchestrates one full collection pass:
//!
//! ```text
//! Init → Authenticating → Fetching → (per document:
//!     Mapping → Transforming → Defaulting → Upserting) → Done
//! ```
//!
//! Configuration, credential, token and fetch failures are fatal for the
//! collection and surface as `Err`. Everything that goes wrong while
//! processing a single document is absorbed into that document's
//! [`DocumentOutcome`]; the pass always continues with the next document.
//! `sync_all` runs each configured collection independently — one
//! collection's fatal error never aborts the others.

use log::{debug, error, info, warn};
use serde_json::{Map, Value};

use crate::core::config::{CollectionConfig, SyncConfig};
use crate::core::error::FireSyncResult;
use crate::core::mapper::{map_document, Record};
use crate::core::source::{Document, DocumentSource};
use crate::core::table::{Table, TableProvider};
use crate::core::transform::TransformRegistry;

/// Merge static defaults under a transformed record: every defaults key
/// not already present is inserted; keys the record already has are never
/// overwritten, so any source document can override any default.
pub fn merge_defaults(record: &mut Record, defaults: &Map<String, Value>) {
    for (key, value) in defaults {
        if !record.contains_key(key) {
            record.insert(key.clone(), value.clone());
        }
    }
}

/// Run the mapping → transformation → defaulting pipeline for one
/// document. Pure given (document, configuration, registry); the output
/// is byte-identical across runs.
pub fn build_record(
    config: &CollectionConfig,
    registry: &TransformRegistry,
    document: &Document,
) -> FireSyncResult<Record> {
    let mut record = map_document(&document.fields, &config.mapping);
    registry.apply_all(&mut record, &config.transforms)?;
    merge_defaults(&mut record, &config.defaults);
    Ok(record)
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Upserted; `updated` is `true` when an existing row matched.
    Synced { updated: bool },
    /// Not written, not an error (e.g. no resolvable unique key).
    Skipped { reason: String },
    /// Mapping, transformation or upsert failed; the pass continued.
    Failed { message: String },
}

/// Per-collection tallies reported when a pass completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub collection: String,
    pub total: usize,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CollectionSummary {
    fn record(&mut self, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Synced { .. } => self.synced += 1,
            DocumentOutcome::Skipped { .. } => self.skipped += 1,
            DocumentOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl std::fmt::Display for CollectionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "collection '{}': {} documents, {} synced, {} skipped, {} failed",
            self.collection, self.total, self.synced, self.skipped, self.failed
        )
    }
}

/// Drives sync passes over an injected configuration, source and table
/// provider. Single-threaded and strictly sequential: one fetch per
/// collection, then one document at a time.
#[derive(Debug)]
pub struct SyncRunner {
    config: SyncConfig,
    registry: TransformRegistry,
    source: Box<dyn DocumentSource>,
    tables: Box<dyn TableProvider>,
}

impl SyncRunner {
    pub fn new(
        config: SyncConfig,
        registry: TransformRegistry,
        source: Box<dyn DocumentSource>,
        tables: Box<dyn TableProvider>,
    ) -> Self {
        Self {
            config,
            registry,
            source,
            tables,
        }
    }

    /// Run one full pass over the named collection.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions: unknown collection
    /// name, credential or token failure, or a failed fetch.
    pub fn sync_collection(&mut self, name: &str) -> FireSyncResult<CollectionSummary> {
        // Init
        let config = self.config.collection(name)?.clone();

        // Authenticating: token is reused for the rest of this pass only
        self.source.authenticate()?;

        // Fetching: the whole collection in one response
        let documents = self.source.fetch(name)?;
        info!("collection '{name}': fetched {} documents", documents.len());

        let table = self.tables.table(&config)?;

        let mut summary = CollectionSummary {
            collection: name.to_string(),
            total: documents.len(),
            ..CollectionSummary::default()
        };
        for document in &documents {
            let outcome = sync_document(&config, &self.registry, table.as_ref(), document);
            summary.record(&outcome);
        }

        info!("{summary}");
        Ok(summary)
    }

    /// Run every configured collection, each inside its own fatal-error
    /// boundary. Returns one result per collection, in iteration order.
    pub fn sync_all(&mut self) -> Vec<(String, FireSyncResult<CollectionSummary>)> {
        let mut results = Vec::new();
        for name in self.config.collection_names() {
            let result = self.sync_collection(&name);
            if let Err(e) = &result {
                error!("collection '{name}' failed: {e}");
            }
            results.push((name, result));
        }
        results
    }
}

/// Process one document: map, transform, default, upsert. Never
/// propagates an error; everything is absorbed into the outcome.
fn sync_document(
    config: &CollectionConfig,
    registry: &TransformRegistry,
    table: &dyn Table,
    document: &Document,
) -> DocumentOutcome {
    let mut record = map_document(&document.fields, &config.mapping);

    if let Err(e) = registry.apply_all(&mut record, &config.transforms) {
        let snapshot = Value::Object(record).to_string();
        error!(
            "document '{}': {e} (partial record: {snapshot})",
            document.id
        );
        return DocumentOutcome::Failed {
            message: e.to_string(),
        };
    }

    merge_defaults(&mut record, &config.defaults);

    let key = match record.get(&config.unique_key) {
        Some(k) if !k.is_null() => k.clone(),
        _ => {
            warn!(
                "document '{}': no value for unique key '{}', skipping",
                document.id, config.unique_key
            );
            return DocumentOutcome::Skipped {
                reason: format!("no value for unique key '{}'", config.unique_key),
            };
        }
    };

    match table.upsert(&config.unique_key, &key, &record) {
        Ok(updated) => {
            debug!(
                "document '{}': {} row for key {key}",
                document.id,
                if updated { "updated" } else { "created" }
            );
            DocumentOutcome::Synced { updated }
        }
        Err(e) => {
            let snapshot = Value::Object(record).to_string();
            error!("document '{}': {e} (record: {snapshot})", document.id);
            DocumentOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_merge_defaults_fills_missing_only() {
        let mut record = json!({"role": "admin"}).as_object().unwrap().clone();
        merge_defaults(
            &mut record,
            &defaults(json!({"role": "member", "active": true})),
        );
        // Present key wins over the default
        assert_eq!(record.get("role"), Some(&json!("admin")));
        assert_eq!(record.get("active"), Some(&json!(true)));
    }

    #[test]
    fn test_merge_defaults_into_empty_record() {
        let mut record = Record::new();
        merge_defaults(&mut record, &defaults(json!({"role": "member"})));
        assert_eq!(record.get("role"), Some(&json!("member")));
    }

    #[test]
    fn test_build_record_is_deterministic() {
        let config = CollectionConfig {
            table: "panel_users".to_string(),
            unique_key: "email".to_string(),
            mapping: vec![
                crate::core::config::FieldMapping {
                    source: "name".to_string(),
                    dest: "name".to_string(),
                },
                crate::core::config::FieldMapping {
                    source: "email".to_string(),
                    dest: "email".to_string(),
                },
            ],
            transforms: vec![crate::core::config::TransformRule {
                field: "name".to_string(),
                transform: "title_case".to_string(),
            }],
            defaults: defaults(json!({"role": "member"})),
        };
        let registry = TransformRegistry::with_builtins();
        let document = Document::new(
            "d1",
            json!({
                "name": {"stringValue": "john doe"},
                "email": {"stringValue": "j@x.com"}
            })
            .as_object()
            .unwrap()
            .clone(),
        );

        let first = build_record(&config, &registry, &document).unwrap();
        let second = build_record(&config, &registry, &document).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.get("name"), Some(&json!("John Doe")));
        assert_eq!(first.get("role"), Some(&json!("member")));
    }

    #[test]
    fn test_summary_display() {
        let summary = CollectionSummary {
            collection: "users".to_string(),
            total: 10,
            synced: 9,
            skipped: 0,
            failed: 1,
        };
        assert_eq!(
            summary.to_string(),
            "collection 'users': 10 documents, 9 synced, 0 skipped, 1 failed"
        );
    }
}
