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


//! Outbound routing rule owning its delivery pipeline.

use crate::control_plane::config::{
    DEFAULT_PUBLICATION_NAME, DEFAULT_PUBLISHER_QUEUE_SIZE, DEFAULT_PUBLISHER_THREADS,
};
use crate::data_plane::connection::Connection;
use crate::data_plane::decorator::{self, DecoratorStage};
use crate::data_plane::delivery_pool::{DeliveryItem, DeliveryPool, DeliveryTarget, EnqueueOutcome};
use crate::error::{ExchangeError, Result};
use crate::matching::{matches, Expression, Filter};
use crate::metadata::{Metadata, MetadataProvider};
use crate::observability::{events, fields};
use crate::statistics::{increment_all, StatisticsHook};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const COMPONENT: &str = "publication";
const STATISTICS_ORIGIN: &str = "";

/// Builder collecting a publication's rule and delivery settings.
pub struct PublicationBuilder {
    name: String,
    active: bool,
    origins: Vec<String>,
    filter: Filter,
    decorators: Vec<DecoratorStage>,
    connection: Connection,
    threads: usize,
    queue_size: usize,
    statistics_ok: Vec<Arc<dyn StatisticsHook>>,
    statistics_error: Vec<Arc<dyn StatisticsHook>>,
}

impl PublicationBuilder {
    pub fn new(name: impl Into<String>, connection: Connection) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() {
                DEFAULT_PUBLICATION_NAME.to_string()
            } else {
                name
            },
            active: true,
            origins: Vec::new(),
            filter: Filter::Always,
            decorators: Vec::new(),
            connection,
            threads: DEFAULT_PUBLISHER_THREADS,
            queue_size: DEFAULT_PUBLISHER_QUEUE_SIZE,
            statistics_ok: Vec::new(),
            statistics_error: Vec::new(),
        }
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Subscription ids this publication is restricted to. Empty accepts every origin.
    pub fn origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn decorator(mut self, stage: DecoratorStage) -> Self {
        self.decorators.push(stage);
        self
    }

    pub fn decorators(mut self, stages: Vec<DecoratorStage>) -> Self {
        self.decorators = stages;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    pub fn statistics_ok(mut self, hooks: Vec<Arc<dyn StatisticsHook>>) -> Self {
        self.statistics_ok = hooks;
        self
    }

    pub fn statistics_error(mut self, hooks: Vec<Arc<dyn StatisticsHook>>) -> Self {
        self.statistics_error = hooks;
        self
    }

    /// Starts the worker threads and returns the running publication.
    pub fn start(self) -> Result<Publication> {
        let expression = self.filter.compile();
        let connection_kind = self.connection.kind();
        let pool = DeliveryPool::start(
            DeliveryTarget {
                publication: self.name.clone(),
                connection: self.connection,
                statistics_ok: self.statistics_ok,
                statistics_error: self.statistics_error.clone(),
            },
            self.threads,
            self.queue_size,
        )?;

        Ok(Publication {
            name: self.name,
            active: self.active,
            origins: self.origins,
            filter: self.filter,
            expression,
            decorators: self.decorators,
            connection_kind,
            statistics_error: self.statistics_error,
            pool,
        })
    }
}

/// Outbound routing rule: which matched files get delivered, after which decorators,
/// through which connection.
pub struct Publication {
    name: String,
    active: bool,
    origins: Vec<String>,
    filter: Filter,
    expression: Expression,
    decorators: Vec<DecoratorStage>,
    connection_kind: &'static str,
    statistics_error: Vec<Arc<dyn StatisticsHook>>,
    pool: DeliveryPool,
}

impl Publication {
    pub fn builder(name: impl Into<String>, connection: Connection) -> PublicationBuilder {
        PublicationBuilder::new(name, connection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn connection_kind(&self) -> &'static str {
        self.connection_kind
    }

    pub fn queue_capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    pub fn is_stopped(&self) -> bool {
        self.pool.is_stopped()
    }

    /// Whether a file dispatched under `origin` should be handed to this publication.
    pub fn eligible(&self, origin: Option<&str>, metadata: &Metadata) -> bool {
        if !self.active {
            return false;
        }
        let origin_permitted = self.origins.is_empty()
            || origin.is_some_and(|origin| self.origins.iter().any(|allowed| allowed == origin));

        origin_permitted && matches(metadata, &self.expression)
    }

    /// Decorates `file` on the caller and queues the result without blocking.
    ///
    /// The file is owned from here on and released on every path that does not queue it.
    pub async fn enqueue(
        &self,
        file: NamedTempFile,
        metadata: Metadata,
        provider: &dyn MetadataProvider,
    ) -> EnqueueOutcome {
        if self.pool.is_stopped() {
            self.log_stopped(&metadata);
            return EnqueueOutcome::Stopped;
        }

        let decorated =
            decorator::run_chain(&self.name, &self.decorators, file, metadata.clone(), provider)
                .await;
        let (file, metadata) = match decorated {
            Ok(Some(decorated)) => decorated,
            Ok(None) => return EnqueueOutcome::Discarded,
            Err(err) => {
                warn!(
                    event = events::DECORATOR_FAILED,
                    component = COMPONENT,
                    publication = self.name.as_str(),
                    file_id = fields::format_file_id(&metadata).as_str(),
                    err = %err,
                    "decorator failed; delivery abandoned"
                );
                increment_all(&self.statistics_error, STATISTICS_ORIGIN, &metadata, COMPONENT);
                return EnqueueOutcome::DecorationFailed;
            }
        };

        let file_id = fields::format_file_id(&metadata);
        let outcome = self.pool.try_enqueue(DeliveryItem {
            file,
            metadata: metadata.clone(),
        });
        match outcome {
            EnqueueOutcome::Queued => debug!(
                event = events::PUBLICATION_ENQUEUE_OK,
                component = COMPONENT,
                publication = self.name.as_str(),
                file_id = file_id.as_str(),
                "file queued for delivery"
            ),
            EnqueueOutcome::QueueFull => {
                let err = ExchangeError::QueueFull {
                    publication: self.name.clone(),
                };
                warn!(
                    event = events::PUBLICATION_QUEUE_FULL,
                    component = COMPONENT,
                    publication = self.name.as_str(),
                    file_id = file_id.as_str(),
                    capacity = self.pool.capacity(),
                    err = %err,
                    "delivery queue full; file dropped"
                );
                increment_all(&self.statistics_error, STATISTICS_ORIGIN, &metadata, COMPONENT);
            }
            EnqueueOutcome::Stopped => self.log_stopped(&metadata),
            EnqueueOutcome::Discarded | EnqueueOutcome::DecorationFailed => {}
        }
        outcome
    }

    fn log_stopped(&self, metadata: &Metadata) {
        info!(
            event = events::PUBLICATION_ENQUEUE_STOPPED,
            component = COMPONENT,
            publication = self.name.as_str(),
            file_id = fields::format_file_id(metadata).as_str(),
            reason = fields::REASON_SHUTDOWN,
            "publication stopped; file dropped"
        );
    }

    /// Stops the delivery workers, waiting for in-flight deliveries. Blocking.
    pub fn stop(&self) {
        info!(
            event = events::PUBLICATION_STOP,
            component = COMPONENT,
            publication = self.name.as_str(),
            queued = self.pool.queued(),
            "stopping publication"
        );
        self.pool.stop(&self.name);
    }
}

impl Debug for Publication {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publication")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("origins", &self.origins)
            .field("filter", &self.expression.to_string())
            .field("decorators", &self.decorators.len())
            .field("connection", &self.connection_kind)
            .field("queue_capacity", &self.pool.capacity())
            .finish()
    }
}
