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

use radar_exchange::observability::fields;
use radar_exchange::Metadata;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const WAIT_STEP: Duration = Duration::from_millis(10);

/// Polar volume from `source` taken at 2024-01-02 12:15 with the given fingerprint.
pub fn volume(source: &str, fingerprint: &str) -> Metadata {
    Metadata::new()
        .with_attribute("/what/object", "PVOL")
        .with_attribute("/what/date", "20240102")
        .with_attribute("/what/time", "121500")
        .with_attribute("/what/source", format!("NOD:{source},RAD:SE41"))
        .with_attribute("/dataset1/data1/what/quantity", "DBZH")
        .with_attribute("/dataset1/data2/what/quantity", "TH")
        .with_source_name(source)
        .with_resolved_source(format!("NOD:{source},RAD:SE41,PLC:Test"))
        .with_fingerprint(fingerprint)
}

/// Single elevation scan from `source`.
pub fn scan(source: &str, fingerprint: &str, elangle: f64) -> Metadata {
    Metadata::new()
        .with_attribute("/what/object", "SCAN")
        .with_attribute("/what/date", "20240102")
        .with_attribute("/what/time", "121500")
        .with_attribute("/dataset1/where/elangle", elangle.to_string())
        .with_source_name(source)
        .with_fingerprint(fingerprint)
}

/// Writes metadata as a file readable by [`JsonMetadataProvider`](crate::JsonMetadataProvider).
pub fn write_fixture(metadata: &Metadata) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("fixture temp file should be created");
    serde_json::to_writer(&mut file, metadata).expect("fixture metadata should serialize");
    file.flush().expect("fixture should flush");
    file
}

pub fn file_id_of(metadata: &Metadata) -> String {
    fields::format_file_id(metadata)
}

/// Polls `condition` until it holds or `timeout` elapses. Returns the final result.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
}
