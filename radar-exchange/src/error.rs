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

//! Error taxonomy shared by the routing and delivery layers.

use thiserror::Error;

/// Errors raised by the exchange core.
///
/// Only [`ExchangeError::Config`], [`ExchangeError::Duplicate`] and
/// [`ExchangeError::Lookup`] are surfaced to the caller of
/// [`ExchangeNode::store_file`](crate::ExchangeNode::store_file). Everything raised
/// inside the delivery pipeline is logged and recovered locally.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Malformed filter, subscription, publication or plugin configuration.
    #[error("invalid configuration: {msg}")]
    Config {
        /// Description of the structural problem.
        msg: String,
    },

    /// The file was recently handled and no subscription accepts duplicates.
    #[error("received duplicate ID:'{file_id}'")]
    Duplicate {
        /// Correlation id of the duplicate file.
        file_id: String,
    },

    /// Metadata is missing a field the node cannot do without.
    #[error("lookup failed: {msg}")]
    Lookup {
        /// What could not be resolved.
        msg: String,
    },

    /// One sender failed to deliver a file.
    #[error("delivery via '{target}' failed: {reason}")]
    Delivery {
        /// Sender id.
        target: String,
        /// Failure reason reported by the sender.
        reason: String,
    },

    /// Every sender of a failover connection failed.
    #[error("failed to publish using the failover connection ({} senders failed)", failures.len())]
    FailoverExhausted {
        /// The individual sender failures, in the order they were tried.
        failures: Vec<ExchangeError>,
    },

    /// The bounded delivery queue of a publication is full.
    #[error("queue for publication '{publication}' is full")]
    QueueFull {
        /// Publication name.
        publication: String,
    },

    /// A decorator failed while transforming a file.
    #[error("decorator '{decorator}' failed: {reason}")]
    Decoration {
        /// Decorator key.
        decorator: String,
        /// Failure reason.
        reason: String,
    },

    /// A storage failed to persist a file.
    #[error("storage '{storage}' failed: {reason}")]
    Storage {
        /// Storage name.
        storage: String,
        /// Failure reason.
        reason: String,
    },

    /// A processor failed to handle a file.
    #[error("processor '{processor}' failed: {reason}")]
    Processing {
        /// Processor name.
        processor: String,
        /// Failure reason.
        reason: String,
    },

    /// A statistics hook failed to record an event.
    #[error("statistics hook '{hook}' failed: {reason}")]
    Statistics {
        /// Statistics id.
        hook: String,
        /// Failure reason.
        reason: String,
    },

    /// A compiled expression could not be evaluated.
    #[error("evaluation error: {msg}")]
    Evaluation {
        /// What went wrong.
        msg: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExchangeError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ExchangeError::Config { msg: msg.into() }
    }

    pub(crate) fn evaluation(msg: impl Into<String>) -> Self {
        ExchangeError::Evaluation { msg: msg.into() }
    }

    /// Builds a [`ExchangeError::Delivery`] for the given sender id.
    pub fn delivery(target: impl Into<String>, reason: impl Into<String>) -> Self {
        ExchangeError::Delivery {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExchangeError>;
