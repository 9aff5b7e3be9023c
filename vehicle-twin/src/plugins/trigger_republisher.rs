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

//! Republishes stored records in bulk whenever a trigger message arrives.

use crate::error::TwinError;
use crate::observability::events;
use crate::plugin::listener_plugin::{
    parse_plugin_config, InboundHandler, ListenerPlugin, PluginContext, PluginSpec,
    RunningListener,
};
use crate::record_store::VehicleRecordStore;
use crate::transport::{Message, PubSubTransport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "trigger_republisher";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRepublisherConfig {
    #[serde(alias = "trigger_topic")]
    trigger_topic: String,
    #[serde(alias = "data_topic")]
    data_topic: String,
}

/// Optional vehicle filter carried by a trigger.
#[derive(Debug, Default, Deserialize)]
struct TriggerFilter {
    #[serde(default, alias = "vehicleId", alias = "vin")]
    identifier: Option<String>,
}

impl TriggerFilter {
    /// An empty or unparseable trigger means no filter.
    fn from_payload(payload: &[u8]) -> Option<String> {
        serde_json::from_slice::<TriggerFilter>(payload)
            .ok()
            .and_then(|filter| filter.identifier)
            .filter(|identifier| !identifier.trim().is_empty())
    }
}

pub struct TriggerRepublisher {
    name: String,
    config: Map<String, Value>,
    context: PluginContext,
    running: Option<RunningListener>,
}

impl TriggerRepublisher {
    pub const MODULE: &'static str = "trigger_republisher";
    pub const IMPLEMENTATION: &'static str = "TriggerRepublisher";

    pub fn new(spec: PluginSpec) -> Self {
        Self {
            name: spec.name,
            config: spec.config,
            context: spec.context,
            running: None,
        }
    }

    fn settings(&self) -> Result<TriggerRepublisherConfig, TwinError> {
        parse_plugin_config(&self.name, &self.config)
    }
}

#[async_trait]
impl ListenerPlugin for TriggerRepublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), TwinError> {
        self.settings()?;
        if self.context.record_store().is_none() {
            warn!(
                event = events::PLUGIN_CAPABILITY_MISSING,
                component = COMPONENT,
                plugin = self.name.as_str(),
                "record store not available; triggers will publish nothing"
            );
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), TwinError> {
        let settings = self.settings()?;
        let handler = Arc::new(TriggerHandler {
            plugin_name: self.name.clone(),
            data_topic: settings.data_topic,
            store: self.context.record_store(),
        });
        let running = RunningListener::start(
            &self.name,
            "trigger",
            self.context.connector().as_ref(),
            &settings.trigger_topic,
            handler,
        )
        .await?;
        info!(
            component = COMPONENT,
            plugin = self.name.as_str(),
            trigger_topic = settings.trigger_topic.as_str(),
            "trigger listener started"
        );
        self.running = Some(running);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown().await;
        }
    }
}

struct TriggerHandler {
    plugin_name: String,
    data_topic: String,
    store: Option<Arc<dyn VehicleRecordStore>>,
}

#[async_trait]
impl InboundHandler for TriggerHandler {
    async fn handle(&self, transport: &dyn PubSubTransport, message: Message) {
        let filter = TriggerFilter::from_payload(&message.payload);

        let Some(store) = &self.store else {
            error!(
                event = events::TRIGGER_READ_FAILED,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                err = %TwinError::CapabilityUnavailable("record store"),
                "trigger ignored"
            );
            return;
        };

        let records = match store.read_all(filter.as_deref()).await {
            Ok(records) => records,
            Err(err) => {
                error!(
                    event = events::TRIGGER_READ_FAILED,
                    component = COMPONENT,
                    plugin = self.plugin_name.as_str(),
                    filter = filter.as_deref(),
                    err = %err,
                    "record read failed"
                );
                return;
            }
        };

        let mut published = 0usize;
        for record in &records {
            let result = match serde_json::to_vec(record) {
                Ok(payload) => transport.publish(&self.data_topic, payload).await,
                Err(err) => Err(TwinError::Protocol(format!("unable to encode record: {err}"))),
            };
            match result {
                Ok(()) => published += 1,
                Err(err) => warn!(
                    event = events::TRIGGER_PUBLISH_FAILED,
                    component = COMPONENT,
                    plugin = self.plugin_name.as_str(),
                    vehicle_id = record.identifier.as_str(),
                    err = %err,
                    "unable to republish record"
                ),
            }
        }

        info!(
            event = events::TRIGGER_REPUBLISHED,
            component = COMPONENT,
            plugin = self.plugin_name.as_str(),
            data_topic = self.data_topic.as_str(),
            filter = filter.as_deref(),
            published,
            read = records.len(),
            "published records"
        );
        debug!(
            component = COMPONENT,
            plugin = self.plugin_name.as_str(),
            trigger_channel = message.channel.as_str(),
            "trigger handled"
        );
    }
}
