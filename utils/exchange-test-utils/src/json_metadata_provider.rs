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

use radar_exchange::{ExchangeError, Metadata, MetadataProvider, Result};
use std::path::Path;
use tracing::debug;

/// Reads metadata serialized as JSON from the file itself, standing in for an ODIM reader.
///
/// Files without a source name are rejected the way a real reader rejects files whose
/// source cannot be resolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonMetadataProvider;

impl MetadataProvider for JsonMetadataProvider {
    fn metadata_from_file(&self, path: &Path) -> Result<Metadata> {
        let contents = std::fs::read(path)?;
        let metadata: Metadata = serde_json::from_slice(&contents)?;
        if metadata.source_name().is_empty() {
            return Err(ExchangeError::Lookup {
                msg: "no source in metadata".to_string(),
            });
        }

        let size = u64::try_from(contents.len()).unwrap_or(u64::MAX);
        debug!(path = %path.display(), size, "read fixture metadata");
        Ok(metadata.with_file_size(size))
    }
}
