// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sync Configuration Module
//!
//! Static, injected configuration for sync passes: a table of named
//! collection descriptors plus global settings. Loaded once from a TOML
//! file (or built programmatically) and never mutated; the driver takes
//! it by reference, there is no ambient global state.
//!
//! ## Example
//!
//! ```toml
//! [global]
//! credentials_path = "service-account.json"
//! database_path = "firesync.db"
//!
//! [collections.users]
//! table = "panel_users"
//! unique_key = "email"
//! mapping = [
//!     { source = "name", dest = "name" },
//!     { source = "email", dest = "email" },
//!     { source = "profile.address.city", dest = "city" },
//! ]
//! transforms = [
//!     { field = "name", transform = "title_case" },
//!     { field = "email", transform = "lowercase" },
//! ]
//! [collections.users.defaults]
//! role = "member"
//! ```
//!
//! `mapping` and `transforms` are ordered tables; mapping order and
//! transformation order drive the pipeline, so output for a fixed
//! document and configuration is deterministic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::error::{FireSyncError, FireSyncResult};

/// One source-path → destination-field mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldMapping {
    /// Dotted path into the document's field tree (e.g. `profile.address.city`).
    pub source: String,
    /// Destination field name in the flat record.
    pub dest: String,
}

/// One destination-field → transformation-name entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransformRule {
    pub field: String,
    pub transform: String,
}

/// Descriptor for one synced collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Destination table name.
    pub table: String,
    /// Destination field used for upsert matching. Documents whose record
    /// lacks this field are skipped.
    pub unique_key: String,
    /// Ordered source-path → destination-field mapping table.
    #[serde(default)]
    pub mapping: Vec<FieldMapping>,
    /// Ordered destination-field → transformation-name table.
    #[serde(default)]
    pub transforms: Vec<TransformRule>,
    /// Static defaults merged under the transformed record; never
    /// overwrite a key the record already has.
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

impl CollectionConfig {
    /// All destination column names this configuration can produce, in
    /// declaration order: the unique key, mapping destinations, then
    /// default keys, deduplicated.
    pub fn destination_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        let mut push = |name: &str, fields: &mut Vec<String>| {
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        };
        push(&self.unique_key, &mut fields);
        for entry in &self.mapping {
            push(&entry.dest, &mut fields);
        }
        for key in self.defaults.keys() {
            push(key, &mut fields);
        }
        fields
    }
}

/// Global settings shared by every collection pass.
///
/// `batch_size`, `timeout_secs` and `retry_attempts` are declared by the
/// configuration surface but not consulted by the driver; the pass is one
/// unpaginated fetch followed by sequential per-document processing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Path to the service-account credentials JSON file.
    pub credentials_path: PathBuf,
    /// Path to the destination SQLite database.
    pub database_path: PathBuf,
    /// Declared but not enforced.
    pub batch_size: u32,
    /// Declared but not enforced.
    pub timeout_secs: u32,
    /// Declared but not enforced.
    pub retry_attempts: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("service-account.json"),
            database_path: PathBuf::from("firesync.db"),
            batch_size: 100,
            timeout_secs: 30,
            retry_attempts: 3,
        }
    }
}

/// Top-level sync configuration: globals plus named collection descriptors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub collections: HashMap<String, CollectionConfig>,
}

impl SyncConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(input: &str) -> FireSyncResult<Self> {
        let config: SyncConfig = toml::from_str(input)
            .map_err(|e| FireSyncError::configuration(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> FireSyncResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FireSyncError::configuration(format!(
                "cannot read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Look up a named collection configuration; a missing name is fatal.
    pub fn collection(&self, name: &str) -> FireSyncResult<&CollectionConfig> {
        self.collections.get(name).ok_or_else(|| {
            FireSyncError::configuration_with_key(
                format!("no sync configuration for collection '{name}'"),
                format!("collections.{name}"),
            )
        })
    }

    /// All configured collection names, sorted for deterministic
    /// `sync_all` iteration.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    fn validate(&self) -> FireSyncResult<()> {
        for (name, cfg) in &self.collections {
            if cfg.table.trim().is_empty() {
                return Err(FireSyncError::configuration_with_key(
                    format!("collection '{name}' has an empty destination table"),
                    format!("collections.{name}.table"),
                ));
            }
            if cfg.unique_key.trim().is_empty() {
                return Err(FireSyncError::configuration_with_key(
                    format!("collection '{name}' has an empty unique_key"),
                    format!("collections.{name}.unique_key"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[global]
credentials_path = "creds.json"
database_path = "out.db"
batch_size = 50
timeout_secs = 10
retry_attempts = 2

[collections.users]
table = "panel_users"
unique_key = "email"
mapping = [
    { source = "name", dest = "name" },
    { source = "email", dest = "email" },
    { source = "profile.address.city", dest = "city" },
]
transforms = [
    { field = "name", transform = "title_case" },
    { field = "email", transform = "lowercase" },
]
[collections.users.defaults]
role = "member"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = SyncConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.global.credentials_path, PathBuf::from("creds.json"));
        let users = config.collection("users").unwrap();
        assert_eq!(users.table, "panel_users");
        assert_eq!(users.unique_key, "email");
        assert_eq!(users.mapping.len(), 3);
        assert_eq!(users.mapping[2].source, "profile.address.city");
        assert_eq!(users.transforms[0].transform, "title_case");
        assert_eq!(users.defaults.get("role"), Some(&serde_json::json!("member")));
    }

    #[test]
    fn test_global_values_are_parsed_but_vestigial() {
        // batch_size/timeout/retry are configuration surface only; the
        // driver does not consult them
        let config = SyncConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.global.batch_size, 50);
        assert_eq!(config.global.timeout_secs, 10);
        assert_eq!(config.global.retry_attempts, 2);
    }

    #[test]
    fn test_missing_collection_is_configuration_error() {
        let config = SyncConfig::from_toml_str(SAMPLE).unwrap();
        let err = config.collection("orders").unwrap_err();
        match err {
            FireSyncError::Configuration { config_key, .. } => {
                assert_eq!(config_key.as_deref(), Some("collections.orders"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_defaults_when_global_section_absent() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config.global.batch_size, 100);
        assert!(config.collections.is_empty());
    }

    #[test]
    fn test_empty_unique_key_is_rejected() {
        let bad = r#"
[collections.users]
table = "t"
unique_key = ""
"#;
        assert!(SyncConfig::from_toml_str(bad).is_err());
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = SyncConfig::from_toml_str("not [valid").unwrap_err();
        assert!(matches!(err, FireSyncError::Configuration { .. }));
    }

    #[test]
    fn test_destination_fields_order_and_dedup() {
        let config = SyncConfig::from_toml_str(SAMPLE).unwrap();
        let users = config.collection("users").unwrap();
        // unique key first, then mapping destinations, then defaults;
        // "email" appears once even though it is both key and destination
        assert_eq!(
            users.destination_fields(),
            vec!["email", "name", "city", "role"]
        );
    }

    #[test]
    fn test_collection_names_sorted() {
        let toml = r#"
[collections.zebra]
table = "z"
unique_key = "id"
[collections.alpha]
table = "a"
unique_key = "id"
"#;
        let config = SyncConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.collection_names(), vec!["alpha", "zebra"]);
    }
}
