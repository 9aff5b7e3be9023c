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

//! Declarative plugin list, as read from configuration.

use crate::error::TwinError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One entry of the plugin list.
///
/// Unknown keys are ignored. A missing `enabled` means the plugin is not started. Missing
/// references do not fail the whole list; they surface later as a resolution failure for this
/// entry alone.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PluginDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "moduleReference")]
    pub module: String,
    #[serde(default, alias = "implementationReference", alias = "class")]
    pub implementation: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl PluginDescriptor {
    /// The configured name, or the implementation reference when none is given.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.implementation)
    }

    pub fn reference(&self) -> String {
        format!("{}::{}", self.module, self.implementation)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PluginDescriptorList {
    #[serde(default)]
    pub plugins: Vec<PluginDescriptor>,
}

impl PluginDescriptorList {
    /// Parses a `{ "plugins": [...] }` document. Plain JSON is accepted as a json5 subset.
    pub fn from_json5_str(contents: &str) -> Result<Self, TwinError> {
        json5::from_str(contents).map_err(|e| {
            TwinError::configuration("plugins", format!("unable to parse plugin list: {e}"))
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TwinError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TwinError::configuration(
                "plugins",
                format!("unable to read plugin list {}: {e}", path.display()),
            )
        })?;
        Self::from_json5_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::{PluginDescriptor, PluginDescriptorList};
    use serde_json::json;

    #[test]
    fn missing_enabled_defaults_to_not_started() {
        let list = PluginDescriptorList::from_json5_str(
            r#"{ plugins: [ { name: "rpc", module: "rpc_responder", implementation: "RpcResponder" } ] }"#,
        )
        .unwrap();

        assert_eq!(list.plugins.len(), 1);
        assert!(!list.plugins[0].enabled);
        assert!(list.plugins[0].config.is_empty());
    }

    #[test]
    fn reference_aliases_and_unknown_keys_are_accepted() {
        let list = PluginDescriptorList::from_json5_str(
            r#"{
                "plugins": [{
                    "name": "trigger",
                    "moduleReference": "trigger_republisher",
                    "implementationReference": "TriggerRepublisher",
                    "enabled": true,
                    "owner": "fleet-team",
                    "config": {"triggerTopic": "vehicles/request", "dataTopic": "vehicles/data"}
                }]
            }"#,
        )
        .unwrap();

        let descriptor = &list.plugins[0];
        assert_eq!(descriptor.reference(), "trigger_republisher::TriggerRepublisher");
        assert!(descriptor.enabled);
        assert_eq!(descriptor.config.get("dataTopic"), Some(&json!("vehicles/data")));
    }

    #[test]
    fn class_is_accepted_for_implementation() {
        let list = PluginDescriptorList::from_json5_str(
            r#"{"plugins": [{"module": "record_sink", "class": "RecordSink", "enabled": true}]}"#,
        )
        .unwrap();

        assert_eq!(list.plugins[0].reference(), "record_sink::RecordSink");
        assert_eq!(list.plugins[0].display_name(), "RecordSink");
    }

    #[test]
    fn display_name_falls_back_to_implementation() {
        let descriptor = PluginDescriptor {
            module: "record_sink".to_string(),
            implementation: "RecordSink".to_string(),
            ..Default::default()
        };

        assert_eq!(descriptor.display_name(), "RecordSink");
    }

    #[test]
    fn unparseable_list_is_a_configuration_error() {
        let err = PluginDescriptorList::from_json5_str("{ plugins: [ ").unwrap_err();

        assert!(err.to_string().starts_with("configuration error for `plugins`"));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        assert!(PluginDescriptorList::from_file("/nonexistent/listeners.json5").is_err());
    }
}
