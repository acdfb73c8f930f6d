//! Data-plane layer.
//!
//! Owns the outbound side of a publication: the decorator chain run before queueing,
//! the bounded delivery queue with its worker threads, and the connection strategies
//! that hand files to senders.
//!
//! ```
//! use async_trait::async_trait;
//! use radar_exchange::data_plane::connection::{Connection, FileSender};
//! use radar_exchange::{ExchangeError, Metadata, Result};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct Unreachable;
//!
//! #[async_trait]
//! impl FileSender for Unreachable {
//!     fn id(&self) -> &str {
//!         "unreachable"
//!     }
//!
//!     async fn send(&self, _path: &Path, _metadata: &Metadata) -> Result<()> {
//!         Err(ExchangeError::delivery("unreachable", "host down"))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let senders: Vec<Arc<dyn FileSender>> = vec![Arc::new(Unreachable), Arc::new(Unreachable)];
//!
//! // Backup fan-out never reports failure, failover aggregates it.
//! let backup = Connection::Backup(senders.clone());
//! assert!(backup.publish(Path::new("volume.h5"), &Metadata::new()).await.is_ok());
//!
//! let failover = Connection::Failover(senders);
//! assert!(failover.publish(Path::new("volume.h5"), &Metadata::new()).await.is_err());
//! # });
//! ```

pub mod connection;
pub mod decorator;
pub(crate) mod delivery_pool;
pub(crate) mod delivery_worker;
