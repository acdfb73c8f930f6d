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


//! Delivery worker that drains a publication queue on its own runtime thread.

use crate::data_plane::delivery_pool::{DeliveryItem, DeliveryTarget, SharedReceiver};
use crate::observability::events;
use crate::observability::fields::{self, WorkerContext};
use crate::runtime::worker_runtime::{spawn_delivery_loop, DEFAULT_DELIVERY_RUNTIME_THREAD_NAME};
use crate::statistics::increment_all;
use futures::FutureExt;
use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Level};
use uuid::Uuid;

const DELIVERY_RUNTIME_THREAD_NAME_PREFIX: &str = "exch-dlv-";
const DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "delivery_worker";
const STATISTICS_ORIGIN: &str = "";

enum Next {
    Item(Option<DeliveryItem>),
    Signal { open: bool },
}

/// Worker state owning the spawned delivery thread.
pub(crate) struct DeliveryWorker {
    worker_id: String,
    runtime_thread: String,
    handle: JoinHandle<()>,
}

impl DeliveryWorker {
    /// Spawns a dedicated runtime thread running one delivery loop.
    pub(crate) fn spawn(
        target: Arc<DeliveryTarget>,
        receiver: SharedReceiver,
        shutdown: watch::Receiver<bool>,
    ) -> io::Result<Self> {
        let worker_id = Uuid::new_v4().hyphenated().to_string();
        let runtime_thread = Self::build_runtime_thread_name(&worker_id);
        let worker_id_for_loop = worker_id.clone();

        let handle = spawn_delivery_loop(runtime_thread.clone(), move || async move {
            Self::delivery_loop(worker_id_for_loop, target, receiver, shutdown).await;
        })?;

        Ok(Self {
            worker_id,
            runtime_thread,
            handle,
        })
    }

    pub(crate) fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub(crate) fn runtime_thread(&self) -> &str {
        &self.runtime_thread
    }

    pub(crate) fn join(self) -> thread::Result<()> {
        self.handle.join()
    }

    fn build_runtime_thread_name(worker_id: &str) -> String {
        let suffix_len =
            DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN - DELIVERY_RUNTIME_THREAD_NAME_PREFIX.len();
        let suffix: String = worker_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{DELIVERY_RUNTIME_THREAD_NAME_PREFIX}{suffix}")
        } else {
            debug!(
                event = events::RUNTIME_THREAD_NAME_FALLBACK,
                component = COMPONENT,
                worker_id,
                reason = fields::REASON_INVALID_THREAD_NAME,
                "using default delivery thread name"
            );
            DEFAULT_DELIVERY_RUNTIME_THREAD_NAME.to_string()
        }
    }

    /// Dequeues items until shutdown is signalled or the queue closes.
    ///
    /// Items still queued when shutdown is observed are abandoned; an in-flight delivery
    /// always completes first.
    pub(crate) async fn delivery_loop(
        worker_id: String,
        target: Arc<DeliveryTarget>,
        receiver: SharedReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let worker_context = WorkerContext::with_current_thread(worker_id);

        info!(
            event = events::DELIVERY_WORKER_START,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            publication = target.publication.as_str(),
            "delivery worker started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => Next::Signal { open: changed.is_ok() },
                item = async { receiver.lock().await.recv().await } => Next::Item(item),
            };

            match next {
                Next::Item(Some(item)) => Self::deliver(&worker_context, &target, item).await,
                Next::Item(None) | Next::Signal { open: false } => break,
                Next::Signal { open: true } => {}
            }
        }

        info!(
            event = events::DELIVERY_WORKER_STOP,
            component = COMPONENT,
            worker_id = worker_context.worker_id.as_str(),
            worker_thread = worker_context.worker_thread.as_str(),
            publication = target.publication.as_str(),
            reason = fields::REASON_SHUTDOWN,
            "delivery worker stopped"
        );
    }

    /// Publishes one item and releases its temp file on every path.
    async fn deliver(worker_context: &WorkerContext, target: &DeliveryTarget, item: DeliveryItem) {
        let DeliveryItem { file, metadata } = item;
        let mut file_id =
            tracing::enabled!(Level::DEBUG).then(|| fields::format_file_id(&metadata));

        if let Some(file_id) = file_id.as_deref() {
            debug!(
                event = events::DELIVERY_ATTEMPT,
                component = COMPONENT,
                worker_id = worker_context.worker_id.as_str(),
                worker_thread = worker_context.worker_thread.as_str(),
                publication = target.publication.as_str(),
                connection = target.connection.kind(),
                file_id,
                "attempting delivery"
            );
        }

        let outcome = AssertUnwindSafe(target.connection.publish(file.path(), &metadata))
            .catch_unwind()
            .await;
        drop(file);

        match outcome {
            Ok(Ok(())) => {
                if let Some(file_id) = file_id.as_deref() {
                    debug!(
                        event = events::DELIVERY_OK,
                        component = COMPONENT,
                        worker_id = worker_context.worker_id.as_str(),
                        worker_thread = worker_context.worker_thread.as_str(),
                        publication = target.publication.as_str(),
                        file_id,
                        "delivery succeeded"
                    );
                }
                increment_all(&target.statistics_ok, STATISTICS_ORIGIN, &metadata, COMPONENT);
            }
            Ok(Err(err)) => {
                let file_id = file_id.get_or_insert_with(|| fields::format_file_id(&metadata));
                warn!(
                    event = events::DELIVERY_FAILED,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    worker_thread = worker_context.worker_thread.as_str(),
                    publication = target.publication.as_str(),
                    file_id = file_id.as_str(),
                    err = %err,
                    "delivery failed"
                );
                increment_all(&target.statistics_error, STATISTICS_ORIGIN, &metadata, COMPONENT);
            }
            Err(panic) => {
                let file_id = file_id.get_or_insert_with(|| fields::format_file_id(&metadata));
                error!(
                    event = events::DELIVERY_PANICKED,
                    component = COMPONENT,
                    worker_id = worker_context.worker_id.as_str(),
                    worker_thread = worker_context.worker_thread.as_str(),
                    publication = target.publication.as_str(),
                    file_id = file_id.as_str(),
                    reason = panic_message(panic.as_ref()),
                    "delivery panicked; worker continues"
                );
                increment_all(&target.statistics_error, STATISTICS_ORIGIN, &metadata, COMPONENT);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::{
        DeliveryWorker, DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN, DELIVERY_RUNTIME_THREAD_NAME_PREFIX,
    };
    use crate::data_plane::connection::{Connection, FileSender};
    use crate::data_plane::delivery_pool::{DeliveryItem, DeliveryTarget};
    use crate::error::{ExchangeError, Result};
    use crate::metadata::Metadata;
    use crate::statistics::{CountingStatistics, StatisticsHook, StatisticsMode};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tokio::sync::{mpsc, watch, Mutex};

    #[derive(Default)]
    struct ScriptedSender {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FileSender for ScriptedSender {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn send(&self, path: &Path, _metadata: &Metadata) -> Result<()> {
            assert!(path.exists(), "temp file must live until the send returns");
            match self.calls.fetch_add(1, Ordering::Relaxed) {
                0 => Ok(()),
                1 => Err(ExchangeError::delivery("scripted", "refused")),
                _ => panic!("sender exploded"),
            }
        }
    }

    struct Harness {
        sender: Arc<ScriptedSender>,
        ok: Arc<CountingStatistics>,
        failed: Arc<CountingStatistics>,
        target: Arc<DeliveryTarget>,
    }

    fn harness() -> Harness {
        let sender = Arc::new(ScriptedSender::default());
        let ok = Arc::new(CountingStatistics::new("ok", StatisticsMode::Count));
        let failed = Arc::new(CountingStatistics::new("failed", StatisticsMode::Count));
        let target = Arc::new(DeliveryTarget {
            publication: "pub".to_string(),
            connection: Connection::Simple(sender.clone()),
            statistics_ok: vec![ok.clone() as Arc<dyn StatisticsHook>],
            statistics_error: vec![failed.clone() as Arc<dyn StatisticsHook>],
        });

        Harness {
            sender,
            ok,
            failed,
            target,
        }
    }

    #[tokio::test]
    async fn delivery_loop_survives_errors_and_panics_and_releases_files() {
        let harness = harness();
        let (queue, receiver) = mpsc::channel(8);
        let (_shutdown_tx, shutdown) = watch::channel(false);
        let mut paths = Vec::new();

        for _ in 0..3 {
            let file = NamedTempFile::new().expect("temp file");
            paths.push(file.path().to_path_buf());
            queue
                .try_send(DeliveryItem {
                    file,
                    metadata: Metadata::new(),
                })
                .expect("queue has room");
        }
        drop(queue);

        DeliveryWorker::delivery_loop(
            "loop".to_string(),
            harness.target.clone(),
            Arc::new(Mutex::new(receiver)),
            shutdown,
        )
        .await;

        assert_eq!(harness.sender.calls.load(Ordering::Relaxed), 3);
        assert_eq!(harness.ok.total(), 1);
        assert_eq!(harness.failed.total(), 2);
        assert_eq!(harness.ok.count(""), 1);
        assert!(paths.iter().all(|path| !path.exists()));
    }

    #[tokio::test]
    async fn delivery_loop_exits_on_shutdown_signal() {
        let harness = harness();
        let (_queue, receiver) = mpsc::channel::<DeliveryItem>(1);
        let (shutdown_tx, shutdown) = watch::channel(false);
        shutdown_tx.send_replace(true);

        DeliveryWorker::delivery_loop(
            "stopped".to_string(),
            harness.target,
            Arc::new(Mutex::new(receiver)),
            shutdown,
        )
        .await;

        assert_eq!(harness.sender.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn build_runtime_thread_name_keeps_prefix_and_linux_safe_length() {
        let thread_name = DeliveryWorker::build_runtime_thread_name("abcdef0123456789");

        assert!(thread_name.starts_with(DELIVERY_RUNTIME_THREAD_NAME_PREFIX));
        assert_eq!(thread_name.len(), DELIVERY_RUNTIME_THREAD_NAME_MAX_LEN);
    }

    #[test]
    fn build_runtime_thread_name_uses_fallback_for_short_non_hex_ids() {
        assert_eq!(
            DeliveryWorker::build_runtime_thread_name("zzz"),
            crate::runtime::worker_runtime::DEFAULT_DELIVERY_RUNTIME_THREAD_NAME
        );
    }
}
