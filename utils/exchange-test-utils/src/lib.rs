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

mod fixtures;
pub use fixtures::{file_id_of, scan, volume, wait_until, write_fixture};

mod json_metadata_provider;
pub use json_metadata_provider::JsonMetadataProvider;

mod recording_doubles;
pub use recording_doubles::{
    RecordingProcessor, RecordingSender, RecordingStorage, SenderBank, SenderBehaviour,
    StatisticsBank,
};

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer `tracing` subscriber once per process. Honors `RUST_LOG`.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
