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

//! Persists merged records received on a data channel.
//!
//! Pairs with a trigger republisher on another instance: what one side republishes, this side
//! writes into its own store.

use crate::error::TwinError;
use crate::observability::events;
use crate::plugin::listener_plugin::{
    parse_plugin_config, InboundHandler, ListenerPlugin, PluginContext, PluginSpec,
    RunningListener,
};
use crate::record_store::{MergedRecord, VehicleRecordStore};
use crate::transport::{Message, PubSubTransport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "record_sink";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordSinkConfig {
    #[serde(alias = "data_topic")]
    data_topic: String,
}

pub struct RecordSink {
    name: String,
    config: Map<String, Value>,
    context: PluginContext,
    running: Option<RunningListener>,
}

impl RecordSink {
    pub const MODULE: &'static str = "record_sink";
    pub const IMPLEMENTATION: &'static str = "RecordSink";

    pub fn new(spec: PluginSpec) -> Self {
        Self {
            name: spec.name,
            config: spec.config,
            context: spec.context,
            running: None,
        }
    }

    fn settings(&self) -> Result<RecordSinkConfig, TwinError> {
        parse_plugin_config(&self.name, &self.config)
    }
}

#[async_trait]
impl ListenerPlugin for RecordSink {
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
                "record store not available; received records will be dropped"
            );
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), TwinError> {
        let settings = self.settings()?;
        let handler = Arc::new(SinkHandler {
            plugin_name: self.name.clone(),
            store: self.context.record_store(),
        });
        let running = RunningListener::start(
            &self.name,
            "sink",
            self.context.connector().as_ref(),
            &settings.data_topic,
            handler,
        )
        .await?;
        info!(
            component = COMPONENT,
            plugin = self.name.as_str(),
            data_topic = settings.data_topic.as_str(),
            "record sink listening"
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

struct SinkHandler {
    plugin_name: String,
    store: Option<Arc<dyn VehicleRecordStore>>,
}

#[async_trait]
impl InboundHandler for SinkHandler {
    async fn handle(&self, _transport: &dyn PubSubTransport, message: Message) {
        let record: MergedRecord = match serde_json::from_slice(&message.payload) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    event = events::FRAGMENT_DROP_MALFORMED,
                    component = COMPONENT,
                    plugin = self.plugin_name.as_str(),
                    err = %TwinError::malformed(&message.channel, err),
                    "dropping malformed record"
                );
                return;
            }
        };

        let Some(store) = &self.store else {
            error!(
                event = events::SINK_WRITE_FAILED,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                vehicle_id = record.identifier.as_str(),
                err = %TwinError::CapabilityUnavailable("record store"),
                "record dropped"
            );
            return;
        };

        match store.write(&record).await {
            Ok(()) => debug!(
                event = events::SINK_WRITE_OK,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                vehicle_id = record.identifier.as_str(),
                "record written"
            ),
            Err(err) => error!(
                event = events::SINK_WRITE_FAILED,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                vehicle_id = record.identifier.as_str(),
                retryable = err.is_retryable(),
                err = %err,
                "record write failed"
            ),
        }
    }
}
