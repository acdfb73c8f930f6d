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

use async_trait::async_trait;
use radar_exchange::control_plane::config::StatisticsConfig;
use radar_exchange::control_plane::plugin_registry::{PluginRegistry, SenderContext};
use radar_exchange::data_plane::connection::FileSender;
use radar_exchange::observability::fields;
use radar_exchange::processor::Processor;
use radar_exchange::statistics::{CountingStatistics, StatisticsHook};
use radar_exchange::storage::Storage;
use radar_exchange::{ExchangeError, Metadata, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SenderBehaviour {
    #[default]
    Succeed,
    Fail,
    Panic,
}

/// Sender recording the file id and contents of every call.
pub struct RecordingSender {
    id: String,
    behaviour: SenderBehaviour,
    calls: AtomicUsize,
    sent: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingSender {
    pub fn new(id: &str, behaviour: SenderBehaviour) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behaviour,
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(id: &str) -> Arc<Self> {
        Self::new(id, SenderBehaviour::Succeed)
    }

    pub fn failing(id: &str) -> Arc<Self> {
        Self::new(id, SenderBehaviour::Fail)
    }

    /// Every invocation, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// File ids of successful sends, in order.
    pub fn sent_file_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("recording lock")
            .iter()
            .map(|(file_id, _)| file_id.clone())
            .collect()
    }

    pub fn sent_contents(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .expect("recording lock")
            .iter()
            .map(|(_, contents)| contents.clone())
            .collect()
    }
}

#[async_trait]
impl FileSender for RecordingSender {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, path: &Path, metadata: &Metadata) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(sender = self.id.as_str(), path = %path.display(), "recording send");
        match self.behaviour {
            SenderBehaviour::Succeed => {
                let contents = std::fs::read(path)?;
                self.sent
                    .lock()
                    .expect("recording lock")
                    .push((fields::format_file_id(metadata), contents));
                Ok(())
            }
            SenderBehaviour::Fail => Err(ExchangeError::delivery(&self.id, "scripted failure")),
            SenderBehaviour::Panic => panic!("scripted panic in sender {}", self.id),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RecordingSenderArguments {
    #[serde(default)]
    behaviour: SenderBehaviour,
}

/// Recording senders created through configuration, retrievable by sender id.
#[derive(Clone, Default)]
pub struct SenderBank {
    senders: Arc<Mutex<HashMap<String, Arc<RecordingSender>>>>,
}

impl SenderBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `recording` sender class. Senders sharing an id share their records.
    pub fn install(&self, registry: &mut PluginRegistry) {
        let senders = self.senders.clone();
        registry.register_sender(
            "recording",
            move |context: SenderContext<'_>, arguments: RecordingSenderArguments| {
                let sender = senders
                    .lock()
                    .expect("sender bank lock")
                    .entry(context.id.to_string())
                    .or_insert_with(|| RecordingSender::new(context.id, arguments.behaviour))
                    .clone();
                Ok(sender as Arc<dyn FileSender>)
            },
        );
    }

    pub fn get(&self, id: &str) -> Option<Arc<RecordingSender>> {
        self.senders.lock().expect("sender bank lock").get(id).cloned()
    }
}

/// Statistics hooks created through configuration, shared per statistics id.
#[derive(Clone, Default)]
pub struct StatisticsBank {
    hooks: Arc<Mutex<HashMap<String, Arc<CountingStatistics>>>>,
}

impl StatisticsBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, registry: &mut PluginRegistry) {
        let hooks = self.hooks.clone();
        registry.set_statistics_factory(move |config: &StatisticsConfig| {
            let hook = hooks
                .lock()
                .expect("statistics bank lock")
                .entry(config.id.clone())
                .or_insert_with(|| Arc::new(CountingStatistics::new(&config.id, config.mode)))
                .clone();
            Ok(hook as Arc<dyn StatisticsHook>)
        });
    }

    pub fn get(&self, id: &str) -> Option<Arc<CountingStatistics>> {
        self.hooks.lock().expect("statistics bank lock").get(id).cloned()
    }

    /// Total count for `id`, zero when the hook was never built.
    pub fn total(&self, id: &str) -> u64 {
        self.get(id).map(|hook| hook.total()).unwrap_or(0)
    }
}

/// Storage recording file ids, optionally failing every call.
pub struct RecordingStorage {
    name: String,
    fail: bool,
    stored: Mutex<Vec<String>>,
}

impl RecordingStorage {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            stored: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            stored: Mutex::new(Vec::new()),
        })
    }

    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().expect("storage lock").clone()
    }

    pub fn count(&self) -> usize {
        self.stored.lock().expect("storage lock").len()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn store(&self, _path: &Path, metadata: &Metadata) -> Result<()> {
        if self.fail {
            return Err(ExchangeError::Storage {
                storage: self.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.stored
            .lock()
            .expect("storage lock")
            .push(fields::format_file_id(metadata));
        Ok(())
    }
}

/// Processor counting invocations and stops.
#[derive(Default)]
pub struct RecordingProcessor {
    name: String,
    processed: AtomicUsize,
    stopped: AtomicUsize,
}

impl RecordingProcessor {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Processor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, _path: &Path, _metadata: &Metadata) -> Result<()> {
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}
