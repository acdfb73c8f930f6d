//! Canonical structured event names used across `radar-exchange`.

// Node lifecycle events.
pub const NODE_CREATED: &str = "node_created";
pub const NODE_SHUTDOWN: &str = "node_shutdown";

// Inbound dispatch events.
pub const FILE_RECEIVED: &str = "file_received";
pub const FILE_SKIPPED_OVERSIZED: &str = "file_skipped_oversized";
pub const FILE_DUPLICATE: &str = "file_duplicate";
pub const FILE_REJECTED: &str = "file_rejected";
pub const SUBSCRIPTION_SKIPPED: &str = "subscription_skipped";
pub const SUBSCRIPTION_MATCHED: &str = "subscription_matched";
pub const STORAGE_STORE_OK: &str = "storage_store_ok";
pub const STORAGE_STORE_FAILED: &str = "storage_store_failed";
pub const STORAGE_MISSING: &str = "storage_missing";
pub const STATISTICS_INCREMENT_FAILED: &str = "statistics_increment_failed";
pub const PROCESSOR_FAILED: &str = "processor_failed";
pub const PROCESSOR_STOP: &str = "processor_stop";
pub const FILTER_EVALUATION_FAILED: &str = "filter_evaluation_failed";

// Publication and delivery events.
pub const FILE_PUBLISHED: &str = "file_published";
pub const PUBLICATION_COPY_FAILED: &str = "publication_copy_failed";
pub const PUBLICATION_ENQUEUE_OK: &str = "publication_enqueue_ok";
pub const PUBLICATION_QUEUE_FULL: &str = "publication_queue_full";
pub const PUBLICATION_ENQUEUE_STOPPED: &str = "publication_enqueue_stopped";
pub const DECORATOR_DISCARD: &str = "decorator_discard";
pub const DECORATOR_REPLACED: &str = "decorator_replaced";
pub const DECORATOR_EMPTY_KEPT: &str = "decorator_empty_kept";
pub const DECORATOR_FAILED: &str = "decorator_failed";
pub const DELIVERY_ATTEMPT: &str = "delivery_attempt";
pub const DELIVERY_OK: &str = "delivery_ok";
pub const DELIVERY_FAILED: &str = "delivery_failed";
pub const DELIVERY_PANICKED: &str = "delivery_panicked";
pub const SENDER_FAILED: &str = "sender_failed";
pub const DELIVERY_WORKER_START: &str = "delivery_worker_start";
pub const DELIVERY_WORKER_STOP: &str = "delivery_worker_stop";
pub const DELIVERY_WORKER_JOIN_FAILED: &str = "delivery_worker_join_failed";

// Control-plane lifecycle events.
pub const SUBSCRIPTION_ADD: &str = "subscription_add";
pub const SUBSCRIPTION_REMOVE: &str = "subscription_remove";
pub const PUBLICATION_ADD: &str = "publication_add";
pub const PUBLICATION_REPLACE: &str = "publication_replace";
pub const PUBLICATION_REMOVE: &str = "publication_remove";
pub const PUBLICATION_STOP: &str = "publication_stop";
pub const PLUGIN_REGISTER: &str = "plugin_register";

// Runtime events.
pub const RUNTIME_THREAD_NAME_FALLBACK: &str = "runtime_thread_name_fallback";
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
