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


//! Registration-time factories turning configuration into senders, decorators,
//! statistics hooks, connections, subscriptions and publications.

use crate::control_plane::config::{
    decode_arguments, short_class_name, CombinedArguments, ConnectionConfig, DecoratorConfig,
    MultiSenderArguments, PublicationConfig, SenderConfig, SingleSenderArguments,
    StatisticsConfig, SubscriptionConfig,
};
use crate::data_plane::connection::{Connection, FileSender, StorageSender};
use crate::data_plane::decorator::{
    Decorator, DecoratorStage, StaleFileBlocker, StaleFileBlockerArguments,
};
use crate::error::{ExchangeError, Result};
use crate::observability::events;
use crate::publication::Publication;
use crate::routing::subscription::Subscription;
use crate::statistics::{CountingStatistics, StatisticsHook};
use crate::storage::StorageRegistry;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const COMPONENT: &str = "plugin_registry";
const CONNECTION_SUFFIX: &str = "_connection";

/// What a sender factory receives besides its typed arguments.
#[derive(Clone, Copy)]
pub struct SenderContext<'a> {
    pub id: &'a str,
    pub storages: &'a StorageRegistry,
}

type SenderFactory =
    Arc<dyn Fn(SenderContext<'_>, &serde_json::Value) -> Result<Arc<dyn FileSender>> + Send + Sync>;
type DecoratorFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Decorator>> + Send + Sync>;
type StatisticsFactory =
    Arc<dyn Fn(&StatisticsConfig) -> Result<Arc<dyn StatisticsHook>> + Send + Sync>;

/// `arguments` of the built-in `storage` sender.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct StorageSenderArguments {
    pub file_storage: Vec<String>,
}

/// Factories keyed by plugin name.
///
/// Lookups try the configured class as given, then its last dotted segment.
#[derive(Clone)]
pub struct PluginRegistry {
    senders: HashMap<String, SenderFactory>,
    decorators: HashMap<String, DecoratorFactory>,
    statistics: StatisticsFactory,
}

impl PluginRegistry {
    /// Registry without senders or decorators; statistics are counted in memory.
    pub fn new() -> Self {
        Self {
            senders: HashMap::new(),
            decorators: HashMap::new(),
            statistics: Arc::new(|config: &StatisticsConfig| {
                Ok(Arc::new(CountingStatistics::new(&config.id, config.mode))
                    as Arc<dyn StatisticsHook>)
            }),
        }
    }

    /// Registry with the built-in `storage` sender and `stale_file_blocker` decorator.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_sender(
            "storage",
            |context: SenderContext<'_>, arguments: StorageSenderArguments| {
                Ok(Arc::new(StorageSender::new(
                    context.id,
                    arguments.file_storage,
                    context.storages.clone(),
                )) as Arc<dyn FileSender>)
            },
        );
        registry.register_decorator(
            StaleFileBlocker::NAME,
            |arguments: StaleFileBlockerArguments| {
                Ok(Arc::new(StaleFileBlocker::new(arguments)?) as Arc<dyn Decorator>)
            },
        );
        registry
    }

    /// Registers a sender constructor. Returns `true` if it replaced one.
    pub fn register_sender<A, F>(&mut self, key: &str, factory: F) -> bool
    where
        A: DeserializeOwned,
        F: Fn(SenderContext<'_>, A) -> Result<Arc<dyn FileSender>> + Send + Sync + 'static,
    {
        let owner = key.to_string();
        let factory: SenderFactory =
            Arc::new(move |context: SenderContext<'_>, arguments: &serde_json::Value| {
                factory(context, decode_arguments(&owner, arguments)?)
            });
        log_register("sender", key);
        self.senders.insert(key.to_string(), factory).is_some()
    }

    /// Registers a decorator constructor. Returns `true` if it replaced one.
    pub fn register_decorator<A, F>(&mut self, key: &str, factory: F) -> bool
    where
        A: DeserializeOwned,
        F: Fn(A) -> Result<Arc<dyn Decorator>> + Send + Sync + 'static,
    {
        let owner = key.to_string();
        let factory: DecoratorFactory = Arc::new(move |arguments: &serde_json::Value| {
            factory(decode_arguments(&owner, arguments)?)
        });
        log_register("decorator", key);
        self.decorators.insert(key.to_string(), factory).is_some()
    }

    /// Replaces the statistics backend.
    pub fn set_statistics_factory<F>(&mut self, factory: F)
    where
        F: Fn(&StatisticsConfig) -> Result<Arc<dyn StatisticsHook>> + Send + Sync + 'static,
    {
        log_register("statistics", "statistics");
        self.statistics = Arc::new(factory);
    }

    pub fn sender_keys(&self) -> Vec<String> {
        sorted_keys(&self.senders)
    }

    pub fn decorator_keys(&self) -> Vec<String> {
        sorted_keys(&self.decorators)
    }

    /// Builds one sender. Its id defaults to `<class>-<uuid>`.
    pub fn build_sender(
        &self,
        config: &SenderConfig,
        storages: &StorageRegistry,
    ) -> Result<Arc<dyn FileSender>> {
        let factory = lookup(&self.senders, &config.class, "sender")?;
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", config.class, Uuid::new_v4()));

        factory(
            SenderContext {
                id: &id,
                storages,
            },
            &config.arguments,
        )
    }

    /// Builds a connection, recursing into nested connections of `combined`.
    pub fn build_connection(
        &self,
        config: &ConnectionConfig,
        storages: &StorageRegistry,
    ) -> Result<Connection> {
        let short = short_class_name(&config.class);
        let kind = short.strip_suffix(CONNECTION_SUFFIX).unwrap_or(short);

        match kind {
            "simple" => {
                let arguments: SingleSenderArguments =
                    decode_arguments(&config.class, &config.arguments)?;
                Ok(Connection::Simple(self.build_sender(&arguments.sender, storages)?))
            }
            "failover" => Ok(Connection::Failover(self.build_senders(config, storages)?)),
            "backup" => Ok(Connection::Backup(self.build_senders(config, storages)?)),
            "distributed" => Ok(Connection::Distributed(self.build_senders(config, storages)?)),
            "combined" => {
                let arguments: CombinedArguments =
                    decode_arguments(&config.class, &config.arguments)?;
                arguments
                    .connections
                    .iter()
                    .map(|nested| self.build_connection(nested, storages))
                    .collect::<Result<Vec<_>>>()
                    .map(Connection::Combined)
            }
            _ => Err(ExchangeError::config(format!(
                "unknown connection class '{}'",
                config.class
            ))),
        }
    }

    fn build_senders(
        &self,
        config: &ConnectionConfig,
        storages: &StorageRegistry,
    ) -> Result<Vec<Arc<dyn FileSender>>> {
        let arguments: MultiSenderArguments = decode_arguments(&config.class, &config.arguments)?;
        arguments
            .senders
            .iter()
            .map(|sender| self.build_sender(sender, storages))
            .collect()
    }

    pub fn build_decorators(&self, configs: &[DecoratorConfig]) -> Result<Vec<DecoratorStage>> {
        configs
            .iter()
            .map(|config| {
                let factory = lookup(&self.decorators, &config.decorator, "decorator")?;
                Ok(DecoratorStage::new(
                    factory(&config.arguments)?,
                    config.allow_discard,
                ))
            })
            .collect()
    }

    pub fn build_statistics(&self, config: &StatisticsConfig) -> Result<Arc<dyn StatisticsHook>> {
        (self.statistics)(config)
    }

    fn build_optional_statistics(
        &self,
        config: Option<&StatisticsConfig>,
    ) -> Result<Vec<Arc<dyn StatisticsHook>>> {
        config
            .map(|config| self.build_statistics(config))
            .into_iter()
            .collect()
    }

    pub fn build_subscription(&self, config: &SubscriptionConfig) -> Result<Subscription> {
        let statistics = config
            .statdef
            .iter()
            .map(|statdef| self.build_statistics(statdef))
            .collect::<Result<Vec<_>>>()?;

        Ok(Subscription::new(config.id.clone())
            .with_active(config.active)
            .with_storages(config.storage.iter().cloned())
            .with_filter(config.filter.clone().unwrap_or_default())
            .with_allow_duplicates(config.allow_duplicates)
            .with_allowed_origins(config.allowed_ids.iter().cloned())
            .with_statistics(statistics))
    }

    /// Builds and starts a publication.
    pub fn build_publication(
        &self,
        config: &PublicationConfig,
        storages: &StorageRegistry,
    ) -> Result<Publication> {
        config.validate_class()?;
        let arguments = &config.extra_arguments;

        Publication::builder(
            config.name.clone(),
            self.build_connection(&config.connection, storages)?,
        )
        .active(config.active)
        .origins(config.subscription_origin.iter().cloned())
        .filter(config.filter.clone().unwrap_or_default())
        .decorators(self.build_decorators(&config.decorators)?)
        .threads(arguments.threads)
        .queue_size(arguments.queue_size)
        .statistics_ok(self.build_optional_statistics(arguments.statistics_ok.as_ref())?)
        .statistics_error(self.build_optional_statistics(arguments.statistics_error.as_ref())?)
        .start()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn lookup<'a, T>(factories: &'a HashMap<String, T>, class: &str, kind: &str) -> Result<&'a T> {
    factories
        .get(class)
        .or_else(|| factories.get(short_class_name(class)))
        .ok_or_else(|| ExchangeError::config(format!("no {kind} registered for '{class}'")))
}

fn sorted_keys<T>(factories: &HashMap<String, T>) -> Vec<String> {
    let mut keys: Vec<String> = factories.keys().cloned().collect();
    keys.sort();
    keys
}

fn log_register(kind: &str, key: &str) {
    debug!(
        event = events::PLUGIN_REGISTER,
        component = COMPONENT,
        kind,
        key,
        "plugin registered"
    );
}

#[cfg(test)]
mod tests {
    use super::{PluginRegistry, SenderContext};
    use crate::control_plane::config::{ConfigDocument, ConnectionConfig, SenderConfig};
    use crate::data_plane::connection::FileSender;
    use crate::error::{ExchangeError, Result};
    use crate::metadata::Metadata;
    use crate::storage::StorageRegistry;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct NullArguments {
        #[serde(default)]
        label: String,
    }

    struct NullSender {
        id: String,
    }

    #[async_trait]
    impl FileSender for NullSender {
        fn id(&self) -> &str {
            &self.id
        }

        async fn send(&self, _path: &Path, _metadata: &Metadata) -> Result<()> {
            Ok(())
        }
    }

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::with_defaults();
        registry.register_sender(
            "null",
            |context: SenderContext<'_>, arguments: NullArguments| {
                Ok(Arc::new(NullSender {
                    id: format!("{}{}", context.id, arguments.label),
                }) as Arc<dyn FileSender>)
            },
        );
        registry
    }

    fn connection(value: serde_json::Value) -> ConnectionConfig {
        serde_json::from_value(value).expect("connection config should parse")
    }

    #[test]
    fn builds_each_connection_kind() {
        let registry = registry();
        let storages = StorageRegistry::new();
        let sender = json!({"class": "null", "id": "n"});

        let cases = [
            (json!({"class": "simple", "arguments": {"sender": sender}}), "simple"),
            (
                json!({"class": "baltrad.exchange.net.connections.failover_connection",
                       "arguments": {"senders": [sender, sender]}}),
                "failover",
            ),
            (json!({"class": "backup", "arguments": {"senders": [sender]}}), "backup"),
            (json!({"class": "distributed", "arguments": {"senders": []}}), "distributed"),
            (
                json!({"class": "combined", "arguments": {"connections": [
                    {"class": "simple", "arguments": {"sender": sender}}
                ]}}),
                "combined",
            ),
        ];

        for (config, kind) in cases {
            let built = registry
                .build_connection(&connection(config), &storages)
                .expect("connection should build");
            assert_eq!(built.kind(), kind);
        }
    }

    #[test]
    fn sender_id_defaults_to_class_and_uuid() {
        let registry = registry();
        let config: SenderConfig =
            serde_json::from_value(json!({"class": "null"})).expect("sender config");

        let sender = registry
            .build_sender(&config, &StorageRegistry::new())
            .expect("sender should build");

        assert!(sender.id().starts_with("null-"));
        assert_eq!(sender.id().len(), "null-".len() + 36);
    }

    #[test]
    fn unknown_plugins_and_bad_arguments_are_config_errors() {
        let registry = registry();
        let storages = StorageRegistry::new();

        let unknown_connection = connection(json!({"class": "teleport", "arguments": {}}));
        let unknown_sender = connection(
            json!({"class": "simple", "arguments": {"sender": {"class": "carrier_pigeon"}}}),
        );
        let bad_arguments = connection(json!({"class": "simple", "arguments": {
            "sender": {"class": "null", "arguments": {"colour": "blue"}}
        }}));

        for config in [unknown_connection, unknown_sender, bad_arguments] {
            assert!(matches!(
                registry.build_connection(&config, &storages),
                Err(ExchangeError::Config { .. })
            ));
        }
    }

    #[test]
    fn builds_publication_from_document() {
        let registry = registry();
        let document = ConfigDocument::from_json5(
            r#"{
                publication: {
                    name: "to-peers",
                    active: true,
                    subscription_origin: "sub-A",
                    decorators: [{
                        decorator: "stale_file_blocker",
                        allow_discard: true,
                        arguments: {max_age_minutes: 60},
                    }],
                    connection: {class: "backup", arguments: {senders: [{class: "null"}]}},
                    extra_arguments: {threads: 2, queue_size: 5},
                },
            }"#,
        )
        .expect("document should parse");
        let ConfigDocument::Publication(config) = document else {
            panic!("expected a publication document");
        };

        let publication = registry
            .build_publication(&config, &StorageRegistry::new())
            .expect("publication should build");

        assert_eq!(publication.name(), "to-peers");
        assert_eq!(publication.origins(), ["sub-A"]);
        assert_eq!(publication.queue_capacity(), 5);
        assert_eq!(publication.connection_kind(), "backup");
        publication.stop();
    }

    #[test]
    fn builds_subscription_with_defaults() {
        let registry = registry();
        let document = ConfigDocument::from_json5(
            r#"{subscription: {id: "sub-A", storage: "default_storage",
                statdef: {id: "received", type: "both"}}}"#,
        )
        .expect("document should parse");
        let ConfigDocument::Subscription(config) = document else {
            panic!("expected a subscription document");
        };

        let subscription = registry
            .build_subscription(&config)
            .expect("subscription should build");

        assert!(subscription.is_active());
        assert_eq!(subscription.storages(), ["default_storage"]);
        assert_eq!(subscription.statistics().len(), 1);
        assert!(subscription.matches(&Metadata::new()));
    }
}
