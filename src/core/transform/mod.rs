// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Transformation Pipeline
//!
//! Applies named, field-local transformations to a flat record in
//! configuration table order. Transformations are registered by name in a
//! [`TransformRegistry`] populated with the builtins at startup; custom
//! one-argument functions can be registered on top.
//!
//! | Name | Effect |
//! |------|--------|
//! | `title_case` | capitalize the first letter of each whitespace-separated word |
//! | `lowercase` | lowercase the string |
//! | `to_int` | parse/truncate to a signed integer |
//! | `to_float` | parse to a floating-point number |
//! | `serialize` | composite → canonical JSON string, scalar → unchanged |
//!
//! Unknown transformation names are silent no-ops; fields absent from the
//! record are skipped. Both lenient behaviors are preserved from the
//! source system. Coercion failures (`to_int` on "abc") are per-document
//! errors caught by the driver loop.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::core::config::TransformRule;
use crate::core::error::{FireSyncError, FireSyncResult};
use crate::core::mapper::Record;

/// A registered one-argument transformation.
pub type TransformFn = Arc<dyn Fn(Value) -> FireSyncResult<Value> + Send + Sync>;

/// Registry mapping transformation names to pure single-argument functions.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    /// Create an empty registry (unit tests only; production code uses
    /// [`TransformRegistry::with_builtins`]).
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Create a registry populated with the builtin transformations.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("title_case", |v| Ok(title_case(v)));
        registry.register("lowercase", |v| Ok(lowercase(v)));
        registry.register("to_int", to_int);
        registry.register("to_float", to_float);
        registry.register("serialize", serialize);
        registry
    }

    /// Register a transformation under `name`, replacing any existing one.
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(Value) -> FireSyncResult<Value> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    /// Look up a transformation by name.
    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    /// Apply the ordered transformation rules to `record` in place.
    ///
    /// Each rule runs once against the field's current value; rules never
    /// observe another field's post-transform value. Fields absent from
    /// the record and unregistered names are skipped silently.
    pub fn apply_all(&self, record: &mut Record, rules: &[TransformRule]) -> FireSyncResult<()> {
        for rule in rules {
            let transform = match self.get(&rule.transform) {
                Some(t) => t,
                // Unknown name: deliberate no-op, not an error
                None => continue,
            };
            let current = match record.get(&rule.field) {
                Some(v) => v.clone(),
                None => continue,
            };
            let transformed = transform(current).map_err(|e| match e {
                FireSyncError::Transform { name, message, .. } => {
                    FireSyncError::transform(name, rule.field.clone(), message)
                }
                other => other,
            })?;
            record.insert(rule.field.clone(), transformed);
        }
        Ok(())
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

/// Capitalize the first letter of each whitespace-separated word and
/// lowercase the remainder, preserving the original whitespace.
/// Non-string values pass through unchanged.
fn title_case(value: Value) -> Value {
    let s = match value.as_str() {
        Some(s) => s,
        None => return value,
    };
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    Value::String(out)
}

/// Lowercase strings; non-string values pass through unchanged.
fn lowercase(value: Value) -> Value {
    match value.as_str() {
        Some(s) => Value::String(s.to_lowercase()),
        None => value,
    }
}

/// Parse or truncate to a signed integer. Unparsable input is an error
/// (the document fails, the pass continues).
fn to_int(value: Value) -> FireSyncResult<Value> {
    match &value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            if let Some(f) = n.as_f64() {
                return Ok(Value::from(f as i64));
            }
        }
        Value::String(s) => {
            if let Ok(i) = s.trim().parse::<i64>() {
                return Ok(Value::from(i));
            }
            if let Ok(f) = s.trim().parse::<f64>() {
                return Ok(Value::from(f as i64));
            }
        }
        Value::Bool(b) => return Ok(Value::from(*b as i64)),
        _ => {}
    }
    Err(FireSyncError::transform(
        "to_int",
        "",
        format!("cannot coerce {value} to an integer"),
    ))
}

/// Parse to a floating-point number. Unparsable input is an error.
fn to_float(value: Value) -> FireSyncResult<Value> {
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.and_then(serde_json::Number::from_f64) {
        Some(n) => Ok(Value::Number(n)),
        None => Err(FireSyncError::transform(
            "to_float",
            "",
            format!("cannot coerce {value} to a float"),
        )),
    }
}

/// Serialize composite values (arrays and maps) to a canonical JSON
/// string; already-scalar values are left unchanged.
fn serialize(value: Value) -> FireSyncResult<Value> {
    match &value {
        Value::Array(_) | Value::Object(_) => {
            let json = serde_json::to_string(&value).map_err(|e| {
                FireSyncError::transform("serialize", "", e.to_string())
            })?;
            Ok(Value::String(json))
        }
        _ => Ok(value),
    }
}
