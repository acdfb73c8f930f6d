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


//! Storage contract and the name-keyed registry subscriptions resolve their storages through.

use crate::error::{ExchangeError, Result};
use crate::metadata::Metadata;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Persists an incoming file somewhere local to the node.
#[async_trait]
pub trait Storage: Send + Sync {
    fn name(&self) -> &str;

    async fn store(&self, path: &Path, metadata: &Metadata) -> Result<()>;
}

/// Storages addressed by name. Lookups read a snapshot and never block registration.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    storages: Arc<ArcSwap<HashMap<String, Arc<dyn Storage>>>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a storage under its own name, returning the one it replaced.
    pub fn register(&self, storage: Arc<dyn Storage>) -> Option<Arc<dyn Storage>> {
        let name = storage.name().to_string();
        let previous = self.storages.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.clone(), storage.clone());
            next
        });
        previous.get(&name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn Storage>> {
        let previous = self.storages.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(name);
            next
        });
        previous.get(name).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Storage>> {
        self.storages.load().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.storages.load().contains_key(name)
    }

    /// Stores the file in the named storage.
    pub async fn store(&self, name: &str, path: &Path, metadata: &Metadata) -> Result<()> {
        let storage = self.get(name).ok_or_else(|| ExchangeError::Storage {
            storage: name.to_string(),
            reason: "no storage registered under that name".to_string(),
        })?;
        storage.store(path, metadata).await
    }
}
