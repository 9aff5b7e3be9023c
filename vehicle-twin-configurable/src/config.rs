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

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use vehicle_twin::correlation::{
    CorrelationSettings, ExpiryReference, FragmentChannels, DEFAULT_MAX_WRITE_ATTEMPTS,
};
use vehicle_twin::rpc::{DEFAULT_REQUEST_TOPIC, DEFAULT_RESPONSE_TOPIC_PREFIX};
use vehicle_twin::{PluginDescriptor, TwinError};

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) transport: TransportConfig,
    #[serde(default)]
    pub(crate) channels: FragmentChannels,
    #[serde(default)]
    pub(crate) correlation: CorrelationConfig,
    #[serde(default)]
    pub(crate) plugins: PluginsConfig,
    #[serde(default)]
    pub(crate) rpc_probe: Option<RpcProbeConfig>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Prefix of every client name this process connects with.
    pub(crate) client_name_prefix: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CorrelationConfig {
    #[serde(default = "default_expiration_secs")]
    pub(crate) expiration_secs: u64,
    /// Defaults to the expiration.
    #[serde(default)]
    pub(crate) sweep_interval_secs: Option<u64>,
    #[serde(default = "default_max_write_attempts")]
    pub(crate) max_write_attempts: u32,
    #[serde(default)]
    pub(crate) expiry_reference: ExpiryReference,
}

fn default_expiration_secs() -> u64 {
    30
}

fn default_max_write_attempts() -> u32 {
    DEFAULT_MAX_WRITE_ATTEMPTS
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            expiration_secs: default_expiration_secs(),
            sweep_interval_secs: None,
            max_write_attempts: default_max_write_attempts(),
            expiry_reference: ExpiryReference::default(),
        }
    }
}

impl CorrelationConfig {
    pub(crate) fn settings(&self) -> CorrelationSettings {
        CorrelationSettings {
            expiration: Duration::from_secs(self.expiration_secs),
            max_write_attempts: self.max_write_attempts,
            expiry_reference: self.expiry_reference,
        }
    }

    pub(crate) fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.unwrap_or(self.expiration_secs))
    }
}

/// Either an inline descriptor list or the path of a `{ "plugins": [...] }` document.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum PluginsConfig {
    File { plugins_file: String },
    Inline(Vec<PluginDescriptor>),
}

impl Default for PluginsConfig {
    fn default() -> Self {
        PluginsConfig::Inline(Vec::new())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RpcProbeConfig {
    #[serde(default = "default_request_topic")]
    pub(crate) request_topic: String,
    #[serde(default = "default_response_topic_prefix")]
    pub(crate) response_topic_prefix: String,
    pub(crate) interval_secs: u64,
    pub(crate) timeout_ms: u64,
}

fn default_request_topic() -> String {
    DEFAULT_REQUEST_TOPIC.to_string()
}

fn default_response_topic_prefix() -> String {
    DEFAULT_RESPONSE_TOPIC_PREFIX.to_string()
}

impl Config {
    pub(crate) fn from_file(path: impl AsRef<Path>) -> Result<Self, TwinError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| TwinError::Configuration {
            plugin: "vehicle-twin-configurable".to_string(),
            reason: format!("unable to read config file {}: {e}", path.display()),
        })?;
        Self::from_json5_str(&contents)
    }

    pub(crate) fn from_json5_str(contents: &str) -> Result<Self, TwinError> {
        json5::from_str(contents).map_err(|e| TwinError::Configuration {
            plugin: "vehicle-twin-configurable".to_string(),
            reason: format!("unable to parse config file: {e}"),
        })
    }
}
