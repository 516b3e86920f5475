//! gcsql - inspect, create, and delete Cloud SQL instances
//!
//! Listing follows `nextPageToken` until the server runs out of pages
//! ([`sql::InstancePager`]); mutations wait for their long-running operation
//! to reach `DONE` ([`sql::OperationWaiter`]) before reporting success.

pub mod commands;
pub mod config;
pub mod error;
pub mod gcp;
pub mod output;
pub mod sql;

pub use error::{Result, SqlError};
