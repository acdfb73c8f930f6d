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


//! Sender contract and the strategies composing senders into one delivery.

use crate::error::{ExchangeError, Result};
use crate::metadata::Metadata;
use crate::observability::{events, fields};
use crate::storage::StorageRegistry;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "connection";

/// Transmits one file to one destination.
#[async_trait]
pub trait FileSender: Send + Sync {
    fn id(&self) -> &str;

    async fn send(&self, path: &Path, metadata: &Metadata) -> Result<()>;
}

/// How a publication's senders are combined for one delivery.
#[derive(Clone)]
pub enum Connection {
    /// Forwards to one sender and returns its result as is.
    Simple(Arc<dyn FileSender>),
    /// Tries senders in order and stops at the first success.
    Failover(Vec<Arc<dyn FileSender>>),
    /// Invokes every sender. Individual failures are logged, never reported.
    Backup(Vec<Arc<dyn FileSender>>),
    /// Same delivery semantics as [`Connection::Backup`].
    Distributed(Vec<Arc<dyn FileSender>>),
    /// Publishes through every nested connection. Failures are logged, never reported.
    Combined(Vec<Connection>),
}

impl Connection {
    pub fn kind(&self) -> &'static str {
        match self {
            Connection::Simple(_) => "simple",
            Connection::Failover(_) => "failover",
            Connection::Backup(_) => "backup",
            Connection::Distributed(_) => "distributed",
            Connection::Combined(_) => "combined",
        }
    }

    /// Ids of every sender reachable from this connection, in invocation order.
    pub fn sender_ids(&self) -> Vec<String> {
        match self {
            Connection::Simple(sender) => vec![sender.id().to_string()],
            Connection::Failover(senders)
            | Connection::Backup(senders)
            | Connection::Distributed(senders) => {
                senders.iter().map(|sender| sender.id().to_string()).collect()
            }
            Connection::Combined(connections) => connections
                .iter()
                .flat_map(Connection::sender_ids)
                .collect(),
        }
    }

    /// Delivers one file according to the strategy.
    pub fn publish<'a>(
        &'a self,
        path: &'a Path,
        metadata: &'a Metadata,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            match self {
                Connection::Simple(sender) => sender.send(path, metadata).await,
                Connection::Failover(senders) => failover(senders, path, metadata).await,
                Connection::Backup(senders) | Connection::Distributed(senders) => {
                    fan_out(senders, path, metadata).await;
                    Ok(())
                }
                Connection::Combined(connections) => {
                    for connection in connections {
                        if let Err(err) = connection.publish(path, metadata).await {
                            warn!(
                                event = events::DELIVERY_FAILED,
                                component = COMPONENT,
                                connection = connection.kind(),
                                file_id = fields::format_file_id(metadata).as_str(),
                                err = %err,
                                "nested connection failed; continuing with the next"
                            );
                        }
                    }
                    Ok(())
                }
            }
        }
        .boxed()
    }
}

async fn failover(senders: &[Arc<dyn FileSender>], path: &Path, metadata: &Metadata) -> Result<()> {
    let mut failures = Vec::with_capacity(senders.len());

    for sender in senders {
        match sender.send(path, metadata).await {
            Ok(()) => {
                info!(
                    event = events::DELIVERY_OK,
                    component = COMPONENT,
                    sender = sender.id(),
                    file_id = fields::format_file_id(metadata).as_str(),
                    "failover: sent file"
                );
                return Ok(());
            }
            Err(err) => {
                warn!(
                    event = events::SENDER_FAILED,
                    component = COMPONENT,
                    sender = sender.id(),
                    file_id = fields::format_file_id(metadata).as_str(),
                    err = %err,
                    "failover: sender failed; trying next in list"
                );
                failures.push(err);
            }
        }
    }

    Err(ExchangeError::FailoverExhausted { failures })
}

async fn fan_out(senders: &[Arc<dyn FileSender>], path: &Path, metadata: &Metadata) {
    for sender in senders {
        match sender.send(path, metadata).await {
            Ok(()) => info!(
                event = events::DELIVERY_OK,
                component = COMPONENT,
                sender = sender.id(),
                file_id = fields::format_file_id(metadata).as_str(),
                "sent file"
            ),
            Err(err) => warn!(
                event = events::SENDER_FAILED,
                component = COMPONENT,
                sender = sender.id(),
                file_id = fields::format_file_id(metadata).as_str(),
                err = %err,
                "sender failed"
            ),
        }
    }
}

/// Delivers by storing into named storages of the node (a local copy destination).
///
/// Storages that are not registered are skipped.
pub struct StorageSender {
    id: String,
    storages: Vec<String>,
    registry: StorageRegistry,
}

impl StorageSender {
    pub fn new(id: impl Into<String>, storages: Vec<String>, registry: StorageRegistry) -> Self {
        Self {
            id: id.into(),
            storages,
            registry,
        }
    }
}

#[async_trait]
impl FileSender for StorageSender {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, path: &Path, metadata: &Metadata) -> Result<()> {
        for name in &self.storages {
            match self.registry.get(name) {
                Some(storage) => storage
                    .store(path, metadata)
                    .await
                    .map_err(|err| ExchangeError::delivery(&self.id, err.to_string()))?,
                None => warn!(
                    event = events::STORAGE_MISSING,
                    component = COMPONENT,
                    sender = self.id.as_str(),
                    storage = name.as_str(),
                    "storage sender skipped unknown storage"
                ),
            }
        }
        Ok(())
    }
}
