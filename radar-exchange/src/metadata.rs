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

//! Read-only metadata view of one ODIM file and the provider contract that builds it.

use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const WHAT_SOURCE: &str = "/what/source";
pub const WHAT_OBJECT: &str = "/what/object";
pub const WHAT_DATE: &str = "/what/date";
pub const WHAT_TIME: &str = "/what/time";

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_FORMAT: &str = "%H%M%S";

/// One attribute of the metadata tree, addressed by its full path.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataNode {
    pub path: String,
    pub value: String,
}

/// Attribute tree of a file together with the fields the node resolves up front.
///
/// Values are kept in their string rendering; typing happens when a filter asks for it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    #[serde(default)]
    nodes: Vec<MetadataNode>,
    /// Canonical short name of the radar, as resolved from the source database.
    #[serde(default)]
    source_name: String,
    /// Canonical source identifier string (`NOD:...,RAD:...,WMO:...`).
    #[serde(default)]
    resolved_source: String,
    #[serde(default)]
    fingerprint: String,
    #[serde(default)]
    file_size: u64,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute. Repeated paths are kept in insertion order.
    pub fn with_attribute(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.nodes.push(MetadataNode {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn with_resolved_source(mut self, resolved_source: impl Into<String>) -> Self {
        self.resolved_source = resolved_source.into();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    /// Exact-path lookup of the first attribute with that path.
    pub fn find(&self, path: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| node.path == path)
            .map(|node| node.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataNode> {
        self.nodes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn resolved_source(&self) -> Source {
        Source::parse(&self.resolved_source)
    }

    /// Source identifier as written in the file itself.
    pub fn what_source(&self) -> Source {
        Source::parse(self.find(WHAT_SOURCE).unwrap_or_default())
    }

    pub fn object_type(&self) -> Option<&str> {
        self.find(WHAT_OBJECT)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.find(WHAT_DATE)
            .and_then(|date| NaiveDate::parse_from_str(date, DATE_FORMAT).ok())
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.find(WHAT_TIME)
            .and_then(|time| NaiveTime::parse_from_str(time, TIME_FORMAT).ok())
    }

    /// Nominal date and time of the product.
    pub fn nominal_datetime(&self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(self.date()?, self.time()?))
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

/// Parsed source identifier, e.g. `NOD:sella,RAD:SE41,PLC:Hemse`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Source {
    entries: Vec<(String, String)>,
}

impl Source {
    /// Parses comma separated `KEY:value` pairs. Malformed pairs are ignored.
    pub fn parse(source: &str) -> Self {
        let entries = source
            .split(',')
            .filter_map(|pair| pair.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds metadata (including the fingerprint and file size) from a file on disk.
///
/// Implementations are expected to fail with
/// [`ExchangeError::Lookup`](crate::ExchangeError::Lookup) when the file carries no usable source.
pub trait MetadataProvider: Send + Sync {
    fn metadata_from_file(&self, path: &Path) -> Result<Metadata>;
}
