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


//! Processors react to files accepted by a subscription (e.g. feed a product generator).

use crate::error::Result;
use crate::metadata::Metadata;
use crate::observability::{events, fields};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "processor_registry";

/// A named consumer of accepted files.
///
/// `process` runs on the dispatch path and must hand heavy work off instead of doing it inline.
#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    fn is_active(&self) -> bool {
        true
    }

    async fn process(&self, path: &Path, metadata: &Metadata) -> Result<()>;

    /// Releases whatever the processor started. Called when it is removed or replaced.
    fn stop(&self) {}
}

/// Processors keyed by name, invoked in name order.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: Arc<ArcSwap<BTreeMap<String, Arc<dyn Processor>>>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a processor. A processor already registered under the same name is stopped.
    pub fn add(&self, processor: Arc<dyn Processor>) {
        let name = processor.name().to_string();
        let previous = self.processors.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.insert(name.clone(), processor.clone());
            next
        });
        if let Some(replaced) = previous.get(&name) {
            replaced.stop();
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let previous = self.processors.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.remove(name);
            next
        });
        match previous.get(name) {
            Some(removed) => {
                removed.stop();
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.processors.load().keys().cloned().collect()
    }

    /// Runs every active processor. A failing processor does not stop the others.
    pub async fn process(&self, path: &Path, metadata: &Metadata) {
        let processors = self.processors.load_full();
        for processor in processors.values().filter(|processor| processor.is_active()) {
            if let Err(err) = processor.process(path, metadata).await {
                warn!(
                    event = events::PROCESSOR_FAILED,
                    component = COMPONENT,
                    processor = processor.name(),
                    file_id = fields::format_file_id(metadata).as_str(),
                    err = %err,
                    "processor failed"
                );
            }
        }
    }

    /// Stops every processor and empties the registry.
    pub fn stop_all(&self) {
        let previous = self.processors.swap(Arc::new(BTreeMap::new()));
        for processor in previous.values() {
            info!(
                event = events::PROCESSOR_STOP,
                component = COMPONENT,
                processor = processor.name(),
                "stopping processor"
            );
            processor.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Processor, ProcessorRegistry};
    use crate::error::{ExchangeError, Result};
    use crate::metadata::Metadata;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TestProcessor {
        name: &'static str,
        active: bool,
        fail: bool,
        calls: AtomicUsize,
        stopped: AtomicBool,
    }

    impl TestProcessor {
        fn new(name: &'static str, active: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                active,
                fail,
                calls: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Processor for TestProcessor {
        fn name(&self) -> &str {
            self.name
        }

        fn is_active(&self) -> bool {
            self.active
        }

        async fn process(&self, _path: &Path, _metadata: &Metadata) -> Result<()> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(ExchangeError::Processing {
                    processor: self.name.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::Relaxed);
        }
    }

    #[tokio::test]
    async fn failing_processor_does_not_stop_the_rest() {
        let registry = ProcessorRegistry::new();
        let failing = TestProcessor::new("a-failing", true, true);
        let healthy = TestProcessor::new("b-healthy", true, false);
        let inactive = TestProcessor::new("c-inactive", false, false);
        registry.add(failing.clone());
        registry.add(healthy.clone());
        registry.add(inactive.clone());

        registry.process(Path::new("/tmp/x.h5"), &Metadata::new()).await;

        assert_eq!(failing.calls.load(Ordering::Relaxed), 1);
        assert_eq!(healthy.calls.load(Ordering::Relaxed), 1);
        assert_eq!(inactive.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn replacing_or_removing_stops_the_old_processor() {
        let registry = ProcessorRegistry::new();
        let first = TestProcessor::new("p", true, false);
        let second = TestProcessor::new("p", true, false);

        registry.add(first.clone());
        registry.add(second.clone());
        assert!(first.stopped.load(Ordering::Relaxed));
        assert!(!second.stopped.load(Ordering::Relaxed));

        assert!(registry.remove("p"));
        assert!(second.stopped.load(Ordering::Relaxed));
        assert!(!registry.remove("p"));
        assert!(registry.names().is_empty());
    }
}
