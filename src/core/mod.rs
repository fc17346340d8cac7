// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod auth;
pub mod config;
pub mod error;
pub mod mapper;
pub mod source;
pub mod sync;
pub mod table;
pub mod transform;
pub mod value;

pub use error::{FireSyncError, FireSyncResult};
