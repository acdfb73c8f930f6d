/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


//! # radar-exchange
//!
//! `radar-exchange` is the routing and delivery core of a radar-data exchange node. Peers
//! post ODIM files to the node; for each file it decides which storages persist it, which
//! publications re-transmit it and which processors react to it.
//!
//! The API centers on [`ExchangeNode`]: subscriptions decide what comes in, publications
//! decide what goes out, and delivery happens on per-publication worker threads so the
//! inbound path never waits on a remote peer.
//!
//! ## Quick start
//!
//! ```
//! use async_trait::async_trait;
//! use radar_exchange::control_plane::config::{ConfigDocument, NodeConfig};
//! use radar_exchange::control_plane::plugin_registry::PluginRegistry;
//! use radar_exchange::storage::Storage;
//! use radar_exchange::{ExchangeError, ExchangeNode, Metadata, MetadataProvider, Result};
//! use std::io::Write;
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct VolumeProvider;
//!
//! impl MetadataProvider for VolumeProvider {
//!     fn metadata_from_file(&self, path: &Path) -> Result<Metadata> {
//!         let fingerprint = std::fs::read_to_string(path)?;
//!         Ok(Metadata::new()
//!             .with_attribute("/what/object", "PVOL")
//!             .with_source_name("sehem")
//!             .with_fingerprint(fingerprint))
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Archive(AtomicUsize);
//!
//! #[async_trait]
//! impl Storage for Archive {
//!     fn name(&self) -> &str {
//!         "archive"
//!     }
//!
//!     async fn store(&self, _path: &Path, _metadata: &Metadata) -> Result<()> {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let node = ExchangeNode::new(
//!     NodeConfig::new("doc-node"),
//!     Arc::new(VolumeProvider),
//!     PluginRegistry::with_defaults(),
//! )
//! .unwrap();
//! let archive = Arc::new(Archive::default());
//! node.storages().register(archive.clone());
//!
//! let subscription = ConfigDocument::from_json5(
//!     r#"{subscription: {id: "volumes", storage: "archive", filter: {
//!         filter_type: "attribute_filter", name: "/what/object",
//!         operation: "=", value_type: "string", value: "PVOL"}}}"#,
//! )
//! .unwrap();
//! node.apply_config(&subscription).await.unwrap();
//!
//! let mut file = tempfile::NamedTempFile::new().unwrap();
//! file.write_all(b"fingerprint-1").unwrap();
//!
//! node.store_file(file.path(), "peer-a").await.unwrap();
//! assert!(matches!(
//!     node.store_file(file.path(), "peer-a").await,
//!     Err(ExchangeError::Duplicate { .. })
//! ));
//! assert_eq!(archive.0.load(Ordering::SeqCst), 1);
//! node.shutdown().await;
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`ExchangeNode`] inbound dispatch and hot reload
//! - Matching: filter model, compiled expressions and the evaluator
//! - Routing: duplicate detection and the subscription directory
//! - Control plane: configuration model, plugin registry and publication registry
//! - Data plane: decorator chain, delivery queues, workers and connection strategies
//! - Runtime: dedicated delivery threads and their Tokio runtimes
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Event names live in
//! `observability::events`; every delivery log carries a `file_id` built from source,
//! object type, nominal time and fingerprint. Library code does not initialize a global
//! subscriber. Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

pub mod control_plane;
pub mod data_plane;
mod error;
pub use error::{ExchangeError, Result};

mod exchange;
pub use exchange::{ExchangeNode, NodeStatistics};

pub mod matching;
mod metadata;
pub use metadata::{Metadata, MetadataNode, MetadataProvider, Source};

#[doc(hidden)]
pub mod observability;
pub mod processor;
mod publication;
pub use data_plane::delivery_pool::EnqueueOutcome;
pub use publication::{Publication, PublicationBuilder};

pub mod routing;
mod runtime;
pub mod statistics;
pub mod storage;
