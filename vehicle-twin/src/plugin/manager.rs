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

//! Turns a descriptor list into running plugin instances.

use crate::error::TwinError;
use crate::observability::events;
use crate::plugin::descriptor::{PluginDescriptor, PluginDescriptorList};
use crate::plugin::listener_plugin::{ListenerPlugin, PluginContext, PluginSpec};
use crate::plugin::registry::PluginRegistry;
use std::path::Path;
use tracing::{debug, error, info};

const COMPONENT: &str = "plugin_manager";

/// A plugin that passed validation and started.
pub struct PluginInstance {
    pub name: String,
    pub reference: String,
    pub plugin: Box<dyn ListenerPlugin>,
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.name)
            .field("reference", &self.reference)
            .finish()
    }
}

pub struct PluginManager {
    registry: PluginRegistry,
    instances: Vec<PluginInstance>,
}

impl PluginManager {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            instances: Vec::new(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Starts every enabled descriptor, returning the instances started by this call.
    ///
    /// A failure to resolve, construct, validate or start one plugin is logged and skips that
    /// plugin only.
    pub async fn load(
        &mut self,
        descriptors: &[PluginDescriptor],
        context: &PluginContext,
    ) -> &[PluginInstance] {
        let first_new = self.instances.len();
        let mut skipped_disabled = 0usize;
        let mut failed = 0usize;

        for descriptor in descriptors {
            if !descriptor.enabled {
                skipped_disabled += 1;
                debug!(
                    event = events::PLUGIN_SKIP_DISABLED,
                    component = COMPONENT,
                    plugin = descriptor.display_name(),
                    reference = descriptor.reference().as_str(),
                    "plugin disabled, skipping"
                );
                continue;
            }

            match self.start_one(descriptor, context).await {
                Ok(instance) => {
                    info!(
                        event = events::PLUGIN_START_OK,
                        component = COMPONENT,
                        plugin = instance.name.as_str(),
                        reference = instance.reference.as_str(),
                        "plugin started"
                    );
                    self.instances.push(instance);
                }
                Err(err) => {
                    failed += 1;
                    error!(
                        event = events::PLUGIN_START_FAILED,
                        component = COMPONENT,
                        plugin = descriptor.display_name(),
                        reference = descriptor.reference().as_str(),
                        err = %err,
                        "plugin skipped"
                    );
                }
            }
        }

        let started = &self.instances[first_new..];
        info!(
            event = events::PLUGIN_LOAD_SUMMARY,
            component = COMPONENT,
            started = started.len(),
            failed,
            skipped_disabled,
            "plugin load finished"
        );
        started
    }

    /// Reads a `{ "plugins": [...] }` document and loads it. Only an unreadable or unparseable
    /// document is an error.
    pub async fn load_from_file(
        &mut self,
        path: impl AsRef<Path>,
        context: &PluginContext,
    ) -> Result<&[PluginInstance], TwinError> {
        let list = PluginDescriptorList::from_file(path)?;
        Ok(self.load(&list.plugins, context).await)
    }

    pub fn instances(&self) -> &[PluginInstance] {
        &self.instances
    }

    /// Stops every running instance, most recently started first.
    pub async fn stop_all(&mut self) {
        while let Some(mut instance) = self.instances.pop() {
            instance.plugin.stop().await;
            info!(
                event = events::PLUGIN_STOP,
                component = COMPONENT,
                plugin = instance.name.as_str(),
                reference = instance.reference.as_str(),
                "plugin stopped"
            );
        }
    }

    async fn start_one(
        &self,
        descriptor: &PluginDescriptor,
        context: &PluginContext,
    ) -> Result<PluginInstance, TwinError> {
        let constructor = self
            .registry
            .resolve(&descriptor.module, &descriptor.implementation)?;
        let name = descriptor.display_name().to_string();
        let mut plugin = constructor(PluginSpec {
            name: name.clone(),
            config: descriptor.config.clone(),
            context: context.clone(),
        })?;
        plugin.validate()?;
        plugin.start().await?;

        Ok(PluginInstance {
            name,
            reference: descriptor.reference(),
            plugin,
        })
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(PluginRegistry::with_builtin_plugins())
    }
}

#[cfg(test)]
mod tests {
    use super::PluginManager;
    use crate::error::TwinError;
    use crate::plugin::descriptor::PluginDescriptor;
    use crate::plugin::listener_plugin::{ListenerPlugin, PluginContext, PluginSpec};
    use crate::plugin::registry::PluginRegistry;
    use crate::transport::{PubSubTransport, TransportConnector};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    static STARTS: AtomicUsize = AtomicUsize::new(0);
    static STOPS: AtomicUsize = AtomicUsize::new(0);

    struct NoopConnector;

    #[async_trait]
    impl TransportConnector for NoopConnector {
        async fn connect(&self, _client_name: &str) -> Result<Arc<dyn PubSubTransport>, TwinError> {
            Err(TwinError::Transport("not used".to_string()))
        }
    }

    /// Requires a `topic` key and counts lifecycle calls.
    struct CountingPlugin {
        name: String,
        config: Map<String, Value>,
    }

    #[async_trait]
    impl ListenerPlugin for CountingPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn validate(&self) -> Result<(), TwinError> {
            if self.config.contains_key("topic") {
                Ok(())
            } else {
                Err(TwinError::configuration(&self.name, "missing field `topic`"))
            }
        }

        async fn start(&mut self) -> Result<(), TwinError> {
            STARTS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&mut self) {
            STOPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(spec: PluginSpec) -> Result<Box<dyn ListenerPlugin>, TwinError> {
        Ok(Box::new(CountingPlugin {
            name: spec.name,
            config: spec.config,
        }))
    }

    fn descriptor(
        name: &str,
        implementation: &str,
        enabled: bool,
        config: Value,
    ) -> PluginDescriptor {
        PluginDescriptor {
            name: Some(name.to_string()),
            module: "counting".to_string(),
            implementation: implementation.to_string(),
            enabled,
            config: match config {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    fn manager() -> PluginManager {
        let mut registry = PluginRegistry::empty();
        registry.register("counting", "CountingPlugin", counting);
        PluginManager::new(registry)
    }

    fn context() -> PluginContext {
        PluginContext::new(Arc::new(NoopConnector), None)
    }

    #[tokio::test]
    async fn one_misconfigured_plugin_does_not_stop_the_others() {
        let mut manager = manager();
        let descriptors = vec![
            descriptor("a", "CountingPlugin", true, json!({"topic": "a"})),
            descriptor("b", "CountingPlugin", true, json!({})),
            descriptor("c", "CountingPlugin", true, json!({"topic": "c"})),
            descriptor("d", "Missing", true, json!({"topic": "d"})),
            descriptor("e", "CountingPlugin", false, json!({"topic": "e"})),
        ];

        let started: Vec<String> = manager
            .load(&descriptors, &context())
            .await
            .iter()
            .map(|instance| instance.name.clone())
            .collect();

        assert_eq!(started, vec!["a".to_string(), "c".to_string()]);
        assert!(STARTS.load(Ordering::SeqCst) >= 2);
        assert_eq!(manager.instances()[1].reference, "counting::CountingPlugin");

        let stops_before = STOPS.load(Ordering::SeqCst);
        manager.stop_all().await;
        assert!(manager.instances().is_empty());
        assert!(STOPS.load(Ordering::SeqCst) >= stops_before + 2);
    }

    #[tokio::test]
    async fn second_load_returns_only_new_instances() {
        let mut manager = manager();
        manager
            .load(
                &[descriptor("first", "CountingPlugin", true, json!({"topic": "x"}))],
                &context(),
            )
            .await;

        let second = manager
            .load(
                &[descriptor("second", "CountingPlugin", true, json!({"topic": "y"}))],
                &context(),
            )
            .await;

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "second");
        assert_eq!(manager.instances().len(), 2);
    }

    #[tokio::test]
    async fn unreadable_plugin_file_is_an_error() {
        let mut manager = manager();

        let result = manager
            .load_from_file("/nonexistent/plugins.json5", &context())
            .await;

        assert!(matches!(result, Err(TwinError::Configuration { .. })));
    }
}
