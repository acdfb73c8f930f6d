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


//! Node facade: inbound dispatch, publication fan-out and hot reload.

use crate::control_plane::config::{ConfigDocument, NodeConfig, StatisticsConfig};
use crate::control_plane::plugin_registry::PluginRegistry;
use crate::control_plane::publication_registry::{stop_publication, PublicationRegistry};
use crate::data_plane::delivery_pool::EnqueueOutcome;
use crate::error::{ExchangeError, Result};
use crate::metadata::{Metadata, MetadataProvider};
use crate::observability::{events, fields};
use crate::processor::ProcessorRegistry;
use crate::publication::Publication;
use crate::routing::dedup_cache::DedupCache;
use crate::routing::subscription::{Subscription, SubscriptionDirectory};
use crate::statistics::{increment_all, StatisticsHook};
use crate::storage::StorageRegistry;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "exchange_node";
const TEMP_FILE_PREFIX: &str = "exchange-";
const TEMP_FILE_SUFFIX: &str = ".h5";

/// Node-level statistics hooks.
#[derive(Clone, Default)]
pub struct NodeStatistics {
    /// Every accepted file.
    pub incoming: Vec<Arc<dyn StatisticsHook>>,
    /// Every file recognised as recently handled.
    pub duplicates: Vec<Arc<dyn StatisticsHook>>,
    /// Every completed dispatch.
    pub file_handling: Vec<Arc<dyn StatisticsHook>>,
}

impl NodeStatistics {
    fn from_config(config: &NodeConfig, plugins: &PluginRegistry) -> Result<Self> {
        let build = |entry: Option<&StatisticsConfig>| -> Result<Vec<Arc<dyn StatisticsHook>>> {
            entry
                .map(|entry| plugins.build_statistics(entry))
                .into_iter()
                .collect()
        };

        Ok(Self {
            incoming: build(config.statistics.incoming.as_ref())?,
            duplicates: build(config.statistics.duplicates.as_ref())?,
            file_handling: build(config.statistics.file_handling.as_ref())?,
        })
    }
}

/// One exchange node: the routing state plus the collaborators it dispatches to.
pub struct ExchangeNode {
    config: NodeConfig,
    provider: Arc<dyn MetadataProvider>,
    plugins: PluginRegistry,
    dedup: DedupCache,
    subscriptions: SubscriptionDirectory,
    publications: PublicationRegistry,
    storages: StorageRegistry,
    processors: ProcessorRegistry,
    statistics: NodeStatistics,
}

impl ExchangeNode {
    /// Creates a node without subscriptions or publications.
    pub fn new(
        config: NodeConfig,
        provider: Arc<dyn MetadataProvider>,
        plugins: PluginRegistry,
    ) -> Result<Self> {
        let statistics = NodeStatistics::from_config(&config, &plugins)?;
        info!(
            event = events::NODE_CREATED,
            component = COMPONENT,
            node = config.node_name.as_str(),
            handled_files_limit = config.handled_files_limit,
            "exchange node created"
        );

        Ok(Self {
            dedup: DedupCache::new(config.handled_files_limit),
            config,
            provider,
            plugins,
            subscriptions: SubscriptionDirectory::empty(),
            publications: PublicationRegistry::new(),
            storages: StorageRegistry::new(),
            processors: ProcessorRegistry::new(),
            statistics,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    pub fn subscriptions(&self) -> &SubscriptionDirectory {
        &self.subscriptions
    }

    pub fn publications(&self) -> &PublicationRegistry {
        &self.publications
    }

    pub fn storages(&self) -> &StorageRegistry {
        &self.storages
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.processors
    }

    /// Routes one incoming file posted by `origin`.
    ///
    /// Fails with [`ExchangeError::Lookup`] when metadata cannot be read and with
    /// [`ExchangeError::Duplicate`] when the file was recently handled and no subscription
    /// accepts duplicates. Storage, statistics, processor and delivery failures are logged
    /// and never returned.
    pub async fn store_file(&self, path: &Path, origin: &str) -> Result<Metadata> {
        let metadata = self.provider.metadata_from_file(path).map_err(|err| {
            warn!(
                event = events::FILE_REJECTED,
                component = COMPONENT,
                origin = fields::format_origin(Some(origin)),
                path = %path.display(),
                err = %err,
                "file rejected"
            );
            err
        })?;

        if let Some(max_content_length) = self.config.max_content_length {
            let size = metadata.file_size();
            if size > max_content_length {
                info!(
                    event = events::FILE_SKIPPED_OVERSIZED,
                    component = COMPONENT,
                    origin = fields::format_origin(Some(origin)),
                    file_id = fields::format_file_id(&metadata).as_str(),
                    size,
                    max_content_length,
                    "file larger than allowed; not routed"
                );
                return Ok(metadata);
            }
        }

        let file_id = fields::format_file_id(&metadata);
        info!(
            event = events::FILE_RECEIVED,
            component = COMPONENT,
            origin = fields::format_origin(Some(origin)),
            file_id = file_id.as_str(),
            "file received"
        );
        increment_all(&self.statistics.incoming, origin, &metadata, COMPONENT);

        let subscriptions = self.subscriptions.snapshot();
        let duplicate = !self.dedup.add(metadata.fingerprint()).await;
        if duplicate {
            increment_all(&self.statistics.duplicates, origin, &metadata, COMPONENT);
            info!(
                event = events::FILE_DUPLICATE,
                component = COMPONENT,
                origin = fields::format_origin(Some(origin)),
                file_id = file_id.as_str(),
                "file recently handled"
            );
            if !subscriptions.any_allows_duplicates() {
                return Err(ExchangeError::Duplicate { file_id });
            }
        }

        for subscription in subscriptions.iter() {
            if let Some(reason) = skip_reason(subscription, duplicate, origin, &metadata) {
                debug!(
                    event = events::SUBSCRIPTION_SKIPPED,
                    component = COMPONENT,
                    subscription = subscription.id().unwrap_or(fields::NONE),
                    file_id = file_id.as_str(),
                    reason,
                    "subscription skipped"
                );
                continue;
            }

            debug!(
                event = events::SUBSCRIPTION_MATCHED,
                component = COMPONENT,
                subscription = subscription.id().unwrap_or(fields::NONE),
                file_id = file_id.as_str(),
                "subscription matched"
            );
            self.dispatch(subscription, path, origin, &metadata).await;
        }

        increment_all(&self.statistics.file_handling, origin, &metadata, COMPONENT);
        Ok(metadata)
    }

    async fn dispatch(
        &self,
        subscription: &Subscription,
        path: &Path,
        origin: &str,
        metadata: &Metadata,
    ) {
        for storage in subscription.storages() {
            match self.storages.store(storage, path, metadata).await {
                Ok(()) => debug!(
                    event = events::STORAGE_STORE_OK,
                    component = COMPONENT,
                    subscription = subscription.id().unwrap_or(fields::NONE),
                    storage = storage.as_str(),
                    "file stored"
                ),
                Err(err) => warn!(
                    event = events::STORAGE_STORE_FAILED,
                    component = COMPONENT,
                    subscription = subscription.id().unwrap_or(fields::NONE),
                    storage = storage.as_str(),
                    file_id = fields::format_file_id(metadata).as_str(),
                    err = %err,
                    "storage failed"
                ),
            }
        }

        increment_all(subscription.statistics(), origin, metadata, COMPONENT);
        self.publish(subscription.id(), path, metadata).await;
        self.processors.process(path, metadata).await;
    }

    /// Hands a copy of the file to every eligible publication.
    ///
    /// Returns how many publications queued it.
    pub async fn publish(&self, origin: Option<&str>, path: &Path, metadata: &Metadata) -> usize {
        let publications = self.publications.snapshot();
        let mut queued = 0;

        for publication in publications.iter() {
            if !publication.eligible(origin, metadata) {
                continue;
            }

            let file = match self.copy_to_temp(path) {
                Ok(file) => file,
                Err(err) => {
                    warn!(
                        event = events::PUBLICATION_COPY_FAILED,
                        component = COMPONENT,
                        publication = publication.name(),
                        file_id = fields::format_file_id(metadata).as_str(),
                        err = %err,
                        "could not copy file for publication"
                    );
                    continue;
                }
            };

            let outcome = publication
                .enqueue(file, metadata.clone(), self.provider.as_ref())
                .await;
            if outcome == EnqueueOutcome::Queued {
                queued += 1;
            }
        }

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::FILE_PUBLISHED,
                component = COMPONENT,
                subscription = fields::format_origin(origin),
                file_id = fields::format_file_id(metadata).as_str(),
                queued,
                "publish finished"
            );
        }
        queued
    }

    fn copy_to_temp(&self, path: &Path) -> io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(TEMP_FILE_SUFFIX);
        let mut file = match &self.config.tmp_folder {
            Some(folder) => builder.tempfile_in(folder)?,
            None => builder.tempfile()?,
        };

        let mut source = File::open(path)?;
        io::copy(&mut source, file.as_file_mut())?;
        file.as_file_mut().flush()?;
        Ok(file)
    }

    /// Adds a subscription, replacing the one with the same id in place.
    pub fn add_subscription(&self, subscription: Subscription) -> bool {
        self.subscriptions.add(subscription)
    }

    pub fn remove_subscription(&self, id: &str) -> bool {
        self.subscriptions.remove(id)
    }

    /// Registers a running publication. One with the same name is swapped out and stopped.
    pub async fn add_publication(&self, publication: Publication) -> bool {
        match self.publications.insert(Arc::new(publication)) {
            Some(replaced) => {
                stop_publication(replaced).await;
                true
            }
            None => false,
        }
    }

    /// Removes and stops a publication.
    pub async fn remove_publication(&self, name: &str) -> bool {
        match self.publications.remove(name) {
            Some(removed) => {
                stop_publication(removed).await;
                true
            }
            None => false,
        }
    }

    /// Applies one configuration document.
    pub async fn apply_config(&self, document: &ConfigDocument) -> Result<()> {
        match document {
            ConfigDocument::Subscription(config) => {
                self.add_subscription(self.plugins.build_subscription(config)?);
            }
            ConfigDocument::Publication(config) => {
                let publication = self.plugins.build_publication(config, &self.storages)?;
                self.add_publication(publication).await;
            }
        }
        Ok(())
    }

    pub async fn load_config_file(&self, path: &Path) -> Result<()> {
        self.apply_config(&ConfigDocument::read(path)?).await
    }

    /// Stops every publication and processor.
    pub async fn shutdown(&self) {
        info!(
            event = events::NODE_SHUTDOWN,
            component = COMPONENT,
            node = self.config.node_name.as_str(),
            publications = self.publications.len(),
            "shutting down exchange node"
        );
        for publication in self.publications.drain() {
            stop_publication(publication).await;
        }
        self.processors.stop_all();
    }
}

fn skip_reason(
    subscription: &Subscription,
    duplicate: bool,
    origin: &str,
    metadata: &Metadata,
) -> Option<&'static str> {
    if !subscription.is_active() {
        Some(fields::REASON_INACTIVE)
    } else if duplicate && !subscription.allows_duplicates() {
        Some(fields::REASON_DUPLICATE)
    } else if !subscription.permits_origin(origin) {
        Some(fields::REASON_ORIGIN_NOT_ALLOWED)
    } else if !subscription.matches(metadata) {
        Some(fields::REASON_FILTER_MISMATCH)
    } else {
        None
    }
}
