/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

//! Error taxonomy shared by the correlation engine, the plugin framework and the RPC protocol.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`VehicleRecordStore`](crate::VehicleRecordStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or timed out; the same call may succeed later.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the operation; retrying will not help.
    #[error("record store rejected operation: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum TwinError {
    /// A required configuration key is missing or has the wrong shape.
    #[error("configuration error for `{plugin}`: {reason}")]
    Configuration { plugin: String, reason: String },

    /// No constructor is registered under the descriptor's reference.
    #[error("no plugin implementation registered for `{reference}`")]
    UnknownPlugin { reference: String },

    /// Connect, subscribe or publish failed at the transport boundary.
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload could not be parsed into the shape its channel expects.
    #[error("malformed message on `{channel}`: {reason}")]
    MalformedMessage { channel: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The message violates the request/response protocol (e.g. no correlation id).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An optional collaborator is not wired into this process.
    #[error("{0} not available")]
    CapabilityUnavailable(&'static str),

    #[error("no response for correlation id `{correlation_id}` within {timeout:?}")]
    Timeout {
        correlation_id: String,
        timeout: Duration,
    },
}

impl TwinError {
    pub(crate) fn configuration(plugin: &str, reason: impl Into<String>) -> Self {
        TwinError::Configuration {
            plugin: plugin.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(channel: &str, reason: impl ToString) -> Self {
        TwinError::MalformedMessage {
            channel: channel.to_string(),
            reason: reason.to_string(),
        }
    }
}
