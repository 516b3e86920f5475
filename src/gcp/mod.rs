//! GCP API interaction module
//!
//! This module provides the plumbing shared by every Cloud SQL call:
//! authentication, the HTTP client, and URL construction.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication and default project resolution
//! - [`client`] - Main GCP client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gcsql::gcp::{auth::GcpCredentials, client::GcpClient};
//!
//! async fn example() -> gcsql::Result<()> {
//!     let credentials = GcpCredentials::new().await?;
//!     let client = GcpClient::new(credentials, gcsql::gcp::client::DEFAULT_SQLADMIN_ENDPOINT)?;
//!     let instance = client.get(&client.instance_url("my-project", "db-1")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
