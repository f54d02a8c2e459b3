//! # kvlink
//!
//! Async client for a clustered key-value document store.
//!
//! The client multiplexes key-value operations over a small set of
//! long-lived TCP connections per data node. Pool size adapts between
//! `num_kv_connections` (default 2) and `max_kv_connections` (default 5)
//! based on observed demand; setting both to the same value fixes the size.
//! Request and response frames are built in pooled, reusable byte buffers
//! whose retained memory is bounded by configuration.
//!
//! ## Usage
//!
//! ```no_run
//! use kvlink::Cluster;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = kvlink::config::load_config("kvlink.toml")?;
//! let cluster = Cluster::connect(config).await?;
//!
//! let bucket = cluster.bucket("app").await?;
//! let collection = bucket.default_collection();
//!
//! collection.upsert("user::1", br#"{"name":"ada"}"#).await?;
//! let doc = collection.get("user::1").await?;
//! println!("{}", String::from_utf8_lossy(doc.value()));
//! # Ok(())
//! # }
//! ```
//!
//! Create the `Cluster` once per process and clone the cheap handles
//! everywhere; connection establishment is expensive and pool churn degrades
//! latency. All operations are async; never block a runtime thread waiting
//! on one.

pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pool;
pub mod protocol;
pub mod types;

pub use cluster::{Bucket, Cluster, Collection, GetResult, MutationResult, QueryResult, Scope};
pub use config::{Config, load_config};
pub use error::KvError;
pub use pool::{OperationBuilder, OperationBuilderPool};
