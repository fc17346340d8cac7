// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync passes against the SQLite destination backend: schema creation,
//! typed storage, and upsert idempotence across separate runner
//! instances over the same database file.

use std::path::Path;

use serde_json::json;

use firesync_rust::core::config::SyncConfig;
use firesync_rust::core::error::FireSyncResult;
use firesync_rust::core::source::{Document, DocumentSource};
use firesync_rust::core::sync::SyncRunner;
use firesync_rust::core::table::{SqliteBackend, TableProvider};
use firesync_rust::core::transform::TransformRegistry;

#[derive(Debug)]
struct StaticSource {
    documents: Vec<Document>,
}

impl DocumentSource for StaticSource {
    fn authenticate(&mut self) -> FireSyncResult<()> {
        Ok(())
    }

    fn fetch(&self, _collection: &str) -> FireSyncResult<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

const CONFIG: &str = r#"
[collections.users]
table = "panel_users"
unique_key = "email"
mapping = [
    { source = "name", dest = "name" },
    { source = "email", dest = "email" },
    { source = "age", dest = "age" },
    { source = "tags", dest = "tags" },
]
transforms = [
    { field = "name", transform = "title_case" },
    { field = "email", transform = "lowercase" },
    { field = "age", transform = "to_int" },
    { field = "tags", transform = "serialize" },
]
[collections.users.defaults]
role = "member"
"#;

fn documents() -> Vec<Document> {
    vec![
        Document::new(
            "doc-1",
            json!({
                "name": {"stringValue": "john doe"},
                "email": {"stringValue": "JOHN@X.COM"},
                "age": {"integerValue": "29"},
                "tags": {"arrayValue": {"values": [
                    {"stringValue": "a"},
                    {"stringValue": "b"}
                ]}}
            })
            .as_object()
            .unwrap()
            .clone(),
        ),
        Document::new(
            "doc-2",
            json!({
                "name": {"stringValue": "jane roe"},
                "email": {"stringValue": "jane@x.com"}
            })
            .as_object()
            .unwrap()
            .clone(),
        ),
    ]
}

fn run_pass(database: &Path) -> firesync_rust::core::sync::CollectionSummary {
    let config = SyncConfig::from_toml_str(CONFIG).unwrap();
    let mut runner = SyncRunner::new(
        config,
        TransformRegistry::with_builtins(),
        Box::new(StaticSource {
            documents: documents(),
        }),
        Box::new(SqliteBackend::open(database).unwrap()),
    );
    runner.sync_collection("users").unwrap()
}

fn table_rows(database: &Path) -> Vec<firesync_rust::core::mapper::Record> {
    let config = SyncConfig::from_toml_str(CONFIG).unwrap();
    let backend = SqliteBackend::open(database).unwrap();
    let table = backend.table(config.collection("users").unwrap()).unwrap();
    table.all_rows().unwrap()
}

#[test]
fn pass_writes_typed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("sync.db");

    let summary = run_pass(&database);
    assert_eq!(summary.synced, 2);

    let rows = table_rows(&database);
    assert_eq!(rows.len(), 2);

    let john = rows
        .iter()
        .find(|r| r.get("email") == Some(&json!("john@x.com")))
        .unwrap();
    assert_eq!(john.get("name"), Some(&json!("John Doe")));
    assert_eq!(john.get("age"), Some(&json!(29)));
    assert!(john.get("age").unwrap().is_i64());
    // serialize turned the array into a JSON string
    assert_eq!(john.get("tags"), Some(&json!("[\"a\",\"b\"]")));
    assert_eq!(john.get("role"), Some(&json!("member")));

    let jane = rows
        .iter()
        .find(|r| r.get("email") == Some(&json!("jane@x.com")))
        .unwrap();
    // No age in the source document: column stays unset
    assert!(!jane.contains_key("age"));
    assert_eq!(jane.get("role"), Some(&json!("member")));
}

#[test]
fn rerun_does_not_increase_row_count() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("sync.db");

    run_pass(&database);
    let first = table_rows(&database);

    // A fresh runner over the same file: unchanged source data must not
    // create duplicates or change any attribute value
    run_pass(&database);
    let second = table_rows(&database);

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn source_value_overrides_default_on_update() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("sync.db");
    run_pass(&database);

    // Second pass where the document carries an explicit role
    let config = SyncConfig::from_toml_str(
        &CONFIG.replace(
            "{ source = \"tags\", dest = \"tags\" },",
            "{ source = \"tags\", dest = \"tags\" },\n    { source = \"role\", dest = \"role\" },",
        ),
    )
    .unwrap();
    let mut docs = documents();
    docs[0]
        .fields
        .insert("role".to_string(), json!({"stringValue": "admin"}));
    let mut runner = SyncRunner::new(
        config,
        TransformRegistry::with_builtins(),
        Box::new(StaticSource { documents: docs }),
        Box::new(SqliteBackend::open(&database).unwrap()),
    );
    runner.sync_collection("users").unwrap();

    let rows = table_rows(&database);
    let john = rows
        .iter()
        .find(|r| r.get("email") == Some(&json!("john@x.com")))
        .unwrap();
    assert_eq!(john.get("role"), Some(&json!("admin")));
    assert_eq!(rows.len(), 2);
}

#[test]
fn empty_collection_completes_with_zero_tallies() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("sync.db");

    let config = SyncConfig::from_toml_str(CONFIG).unwrap();
    let mut runner = SyncRunner::new(
        config,
        TransformRegistry::with_builtins(),
        Box::new(StaticSource {
            documents: Vec::new(),
        }),
        Box::new(SqliteBackend::open(&database).unwrap()),
    );
    let summary = runner.sync_collection("users").unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.synced, 0);
    assert!(table_rows(&database).is_empty());
}
