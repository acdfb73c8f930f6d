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

//! Reason codes and value-format helpers for structured log fields.

use crate::metadata::Metadata;

pub const NONE: &str = "none";
pub const REASON_ORIGIN_NOT_ALLOWED: &str = "origin_not_allowed";
pub const REASON_FILTER_MISMATCH: &str = "filter_mismatch";
pub const REASON_DUPLICATE: &str = "duplicate";
pub const REASON_INACTIVE: &str = "inactive";
pub const REASON_SHUTDOWN: &str = "shutdown";
pub const REASON_INVALID_THREAD_NAME: &str = "invalid_thread_name";
pub const DEFAULT_WORKER_THREAD: &str = "unknown-thread";

const SCAN_OBJECT: &str = "SCAN";
const ELANGLE_PATHS: [&str; 2] = ["/dataset1/where/elangle", "/where/elangle"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub worker_id: String,
    pub worker_thread: String,
}

impl WorkerContext {
    pub fn new(worker_id: impl Into<String>, worker_thread: Option<&str>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: thread_name_or_default(worker_thread),
        }
    }

    pub fn with_current_thread(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            worker_thread: current_thread_name_or_default(),
        }
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_WORKER_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

/// Correlation id of a file: `nod:<name>, object:<type>, time:<ts>[, elangle:<a>], hash:<fp>`.
///
/// The elevation angle is only included for `SCAN` objects.
pub fn format_file_id(metadata: &Metadata) -> String {
    let source = or_none(metadata.source_name());
    let object = metadata.object_type().unwrap_or(NONE);
    let time = metadata
        .nominal_datetime()
        .map(|datetime| datetime.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| NONE.to_string());
    let hash = or_none(metadata.fingerprint());

    if object == SCAN_OBJECT {
        let elangle = ELANGLE_PATHS
            .iter()
            .find_map(|path| metadata.find(path))
            .unwrap_or(NONE);
        format!("nod:{source}, object:{object}, time:{time}, elangle:{elangle}, hash:{hash}")
    } else {
        format!("nod:{source}, object:{object}, time:{time}, hash:{hash}")
    }
}

pub fn format_origin(origin: Option<&str>) -> &str {
    origin.filter(|origin| !origin.is_empty()).unwrap_or(NONE)
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        NONE
    } else {
        value
    }
}
