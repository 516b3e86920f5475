//! Cloud SQL instance resources
//!
//! # Architecture
//!
//! - [`client`] - The [`SqlAdminApi`] seam and its REST implementation
//! - [`model`] - Instance and operation resources
//! - [`pager`] - Follows `nextPageToken` across `instances.list` pages
//! - [`operation`] - Polls long-running operations to completion
//!
//! # Example
//!
//! ```ignore
//! use gcsql::sql::{InstanceListRequest, InstancePager};
//!
//! async fn list_all(client: &gcsql::gcp::client::GcpClient) -> gcsql::Result<()> {
//!     let mut pager = InstancePager::new(client, InstanceListRequest::new("my-project"));
//!     while let Some(instance) = pager.next().await? {
//!         println!("{:?}", instance.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod model;
pub mod operation;
pub mod pager;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{InstanceListRequest, SqlAdminApi};
pub use model::{DatabaseInstance, InstanceConfig, InstanceRef, Operation, OperationStatus};
pub use operation::{Backoff, OperationWaiter, PollPolicy};
pub use pager::InstancePager;
