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

//! Statistics hook contract and the in-memory counter used when no backend is plugged in.

use crate::error::Result;
use crate::metadata::Metadata;
use crate::observability::{events, fields};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Fire-and-forget event counter keyed by a statistics id.
///
/// Callers never propagate a failed increment; they log it and move on.
pub trait StatisticsHook: Send + Sync {
    fn id(&self) -> &str;

    fn increment(&self, origin: &str, metadata: &Metadata) -> Result<()>;
}

/// What a hook records per event.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsMode {
    /// Only bump the counter.
    #[default]
    Count,
    /// Only keep an entry per event.
    Add,
    Both,
}

impl StatisticsMode {
    pub fn increments_counter(&self) -> bool {
        matches!(self, StatisticsMode::Count | StatisticsMode::Both)
    }

    pub fn saves_entry(&self) -> bool {
        matches!(self, StatisticsMode::Add | StatisticsMode::Both)
    }
}

/// In-memory hook counting events per origin.
pub struct CountingStatistics {
    id: String,
    mode: StatisticsMode,
    counters: Mutex<HashMap<String, u64>>,
    entries: Mutex<Vec<String>>,
}

impl CountingStatistics {
    pub fn new(id: impl Into<String>, mode: StatisticsMode) -> Self {
        Self {
            id: id.into(),
            mode,
            counters: Mutex::new(HashMap::new()),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, origin: &str) -> u64 {
        self.counters
            .lock()
            .map(|counters| counters.get(origin).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counters
            .lock()
            .map(|counters| counters.values().sum())
            .unwrap_or(0)
    }

    /// File ids of the saved entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl StatisticsHook for CountingStatistics {
    fn id(&self) -> &str {
        &self.id
    }

    fn increment(&self, origin: &str, metadata: &Metadata) -> Result<()> {
        if self.mode.increments_counter() {
            let mut counters = self.counters.lock().map_err(|_| poisoned(&self.id))?;
            *counters.entry(origin.to_string()).or_insert(0) += 1;
        }
        if self.mode.saves_entry() {
            let mut entries = self.entries.lock().map_err(|_| poisoned(&self.id))?;
            entries.push(fields::format_file_id(metadata));
        }
        Ok(())
    }
}

fn poisoned(id: &str) -> crate::ExchangeError {
    crate::ExchangeError::Statistics {
        hook: id.to_string(),
        reason: "counter lock poisoned".to_string(),
    }
}

/// Increments every hook, logging failures instead of returning them.
pub(crate) fn increment_all(
    hooks: &[Arc<dyn StatisticsHook>],
    origin: &str,
    metadata: &Metadata,
    component: &'static str,
) {
    for hook in hooks {
        if let Err(err) = hook.increment(origin, metadata) {
            warn!(
                event = events::STATISTICS_INCREMENT_FAILED,
                component,
                statistics = hook.id(),
                origin = fields::format_origin(Some(origin)),
                file_id = fields::format_file_id(metadata).as_str(),
                err = %err,
                "statistics increment failed"
            );
        }
    }
}
