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


//! Serde model of node, subscription and publication configuration.
//!
//! Configuration files hold one document each, keyed by what they configure:
//!
//! ```json5
//! {
//!   subscription: {
//!     id: "sehem-in",
//!     storage: "default",
//!     filter: {filter_type: "always_filter"},
//!     allowed_ids: ["sehem.baltrad.eu"],
//!   },
//! }
//! ```

use crate::error::{ExchangeError, Result};
use crate::matching::Filter;
use crate::routing::dedup_cache::DEFAULT_HANDLED_FILES_LIMIT;
use crate::statistics::StatisticsMode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PUBLISHER_THREADS: usize = 1;
pub const DEFAULT_PUBLISHER_QUEUE_SIZE: usize = 100;
pub const DEFAULT_PUBLICATION_NAME: &str = "unknown";

/// Parses a JSON5 (or plain JSON) configuration text.
///
/// Syntax and shape errors, including those of nested filters, are reported as
/// [`ExchangeError::Config`].
pub fn parse_config<T: DeserializeOwned>(text: &str) -> Result<T> {
    json5::from_str(text).map_err(|err| ExchangeError::config(err.to_string()))
}

/// Reads and parses a JSON5 configuration file.
pub fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub node_name: String,
    /// Files larger than this are accepted but not routed.
    #[serde(default)]
    pub max_content_length: Option<u64>,
    #[serde(default = "default_handled_files_limit")]
    pub handled_files_limit: usize,
    /// Directory for per-publication file copies. System temp dir when unset.
    #[serde(default)]
    pub tmp_folder: Option<PathBuf>,
    #[serde(default)]
    pub statistics: NodeStatisticsConfig,
}

impl NodeConfig {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            max_content_length: None,
            handled_files_limit: DEFAULT_HANDLED_FILES_LIMIT,
            tmp_folder: None,
            statistics: NodeStatisticsConfig::default(),
        }
    }
}

/// Node-level statistics, each optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct NodeStatisticsConfig {
    /// Every accepted file.
    #[serde(default)]
    pub incoming: Option<StatisticsConfig>,
    /// Every file recognised as recently handled.
    #[serde(default)]
    pub duplicates: Option<StatisticsConfig>,
    /// Every completed dispatch.
    #[serde(default)]
    pub file_handling: Option<StatisticsConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatisticsConfig {
    pub id: String,
    #[serde(rename = "type", default)]
    pub mode: StatisticsMode,
}

/// A configuration file: exactly one subscription or one publication.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ConfigDocument {
    Subscription(SubscriptionConfig),
    Publication(PublicationConfig),
}

impl ConfigDocument {
    pub fn from_json5(text: &str) -> Result<Self> {
        parse_config(text)
    }

    pub fn read(path: &Path) -> Result<Self> {
        read_config(path)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Storage names; a single string is accepted too.
    #[serde(default, deserialize_with = "one_or_many")]
    pub storage: Vec<String>,
    /// Defaults to matching every file.
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub allow_duplicates: bool,
    /// Origins allowed to feed this subscription. Empty admits everyone.
    #[serde(default)]
    pub allowed_ids: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub statdef: Vec<StatisticsConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PublicationConfig {
    #[serde(default = "default_publication_name")]
    pub name: String,
    /// Publisher implementation. Only the standard queued publisher exists.
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub active: bool,
    /// Subscription ids whose files this publication accepts. Empty accepts all.
    #[serde(default, deserialize_with = "one_or_many")]
    pub subscription_origin: Vec<String>,
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub decorators: Vec<DecoratorConfig>,
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub extra_arguments: PublisherArguments,
}

impl PublicationConfig {
    /// Rejects publisher classes other than the standard one.
    pub fn validate_class(&self) -> Result<()> {
        match self.class.as_deref() {
            None => Ok(()),
            Some(class) if short_class_name(class) == "standard_publisher" => Ok(()),
            Some(class) => Err(ExchangeError::config(format!(
                "publication '{}' uses unsupported publisher class '{class}'",
                self.name
            ))),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PublisherArguments {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default)]
    pub statistics_ok: Option<StatisticsConfig>,
    #[serde(default)]
    pub statistics_error: Option<StatisticsConfig>,
}

impl Default for PublisherArguments {
    fn default() -> Self {
        Self {
            threads: DEFAULT_PUBLISHER_THREADS,
            queue_size: DEFAULT_PUBLISHER_QUEUE_SIZE,
            statistics_ok: None,
            statistics_error: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DecoratorConfig {
    pub decorator: String,
    #[serde(default)]
    pub allow_discard: bool,
    /// Decoded by the decorator's factory into its own argument type.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub class: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SenderConfig {
    pub class: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// `arguments` of a `simple` connection.
#[derive(Deserialize, Debug, Clone)]
pub struct SingleSenderArguments {
    pub sender: SenderConfig,
}

/// `arguments` of `failover`, `backup` and `distributed` connections.
#[derive(Deserialize, Debug, Clone)]
pub struct MultiSenderArguments {
    pub senders: Vec<SenderConfig>,
}

/// `arguments` of a `combined` connection.
#[derive(Deserialize, Debug, Clone)]
pub struct CombinedArguments {
    pub connections: Vec<ConnectionConfig>,
}

/// Decodes a plugin's `arguments` value into its typed argument struct.
///
/// A missing (`null`) value decodes as an empty object so all-default structs work.
pub fn decode_arguments<T: DeserializeOwned>(
    owner: &str,
    arguments: &serde_json::Value,
) -> Result<T> {
    let arguments = if arguments.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        arguments.clone()
    };
    serde_json::from_value(arguments)
        .map_err(|err| ExchangeError::config(format!("invalid arguments for '{owner}': {err}")))
}

/// Last segment of a dotted class path, e.g. `pkg.net.connections.failover_connection`.
pub fn short_class_name(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

fn default_true() -> bool {
    true
}

fn default_handled_files_limit() -> usize {
    DEFAULT_HANDLED_FILES_LIMIT
}

fn default_publication_name() -> String {
    DEFAULT_PUBLICATION_NAME.to_string()
}

fn default_threads() -> usize {
    DEFAULT_PUBLISHER_THREADS
}

fn default_queue_size() -> usize {
    DEFAULT_PUBLISHER_QUEUE_SIZE
}
