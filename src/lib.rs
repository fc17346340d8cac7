// SPDX-License-Identifier: MIT OR Apache-2.0

//! # FireSync
//!
//! One-directional, configuration-driven sync from a Firestore collection
//! to relational rows. A pass fetches every document of a collection over
//! the REST API, flattens and transforms fields according to a static
//! mapping table, and upserts the results keyed by a configured unique
//! field.
//!
//! ```text
//! wire documents → decoded field trees → flat records
//!                → transformed/defaulted records → upserted rows
//! ```
//!
//! Data flows strictly one way; nothing reads back from the destination
//! during a run. The whole pass is synchronous and single-threaded.

pub mod core;

pub use crate::core::error::{FireSyncError, FireSyncResult};
