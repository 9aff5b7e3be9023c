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

//! The listener-plugin capability and the plumbing every concrete plugin shares.

use crate::error::TwinError;
use crate::record_store::VehicleRecordStore;
use crate::runtime::listener_queue::QueueListener;
use crate::runtime::task_supervisor::{spawn_supervised, SupervisedTask};
use crate::transport::{Message, MessageListener, PubSubTransport, TransportConnector};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "listener_plugin";

/// Collaborators handed to every plugin.
#[derive(Clone)]
pub struct PluginContext {
    connector: Arc<dyn TransportConnector>,
    record_store: Option<Arc<dyn VehicleRecordStore>>,
}

impl PluginContext {
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        record_store: Option<Arc<dyn VehicleRecordStore>>,
    ) -> Self {
        Self {
            connector,
            record_store,
        }
    }

    pub fn connector(&self) -> Arc<dyn TransportConnector> {
        self.connector.clone()
    }

    pub fn record_store(&self) -> Option<Arc<dyn VehicleRecordStore>> {
        self.record_store.clone()
    }
}

/// Everything a plugin constructor receives.
#[derive(Clone)]
pub struct PluginSpec {
    pub name: String,
    pub config: Map<String, Value>,
    pub context: PluginContext,
}

/// A pluggable background component owning its own transport subscription.
#[async_trait]
pub trait ListenerPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Fails with [`TwinError::Configuration`] when a required key is missing. A missing
    /// optional collaborator is only logged.
    fn validate(&self) -> Result<(), TwinError>;

    /// Connects, subscribes and hands the receive loop to its own task. Returns without
    /// waiting on inbound traffic.
    async fn start(&mut self) -> Result<(), TwinError>;

    /// Best-effort shutdown.
    async fn stop(&mut self) {}
}

/// Deserializes a plugin's `config` map into its typed settings.
pub(crate) fn parse_plugin_config<T: DeserializeOwned>(
    plugin_name: &str,
    config: &Map<String, Value>,
) -> Result<T, TwinError> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| TwinError::configuration(plugin_name, e.to_string()))
}

/// Message handling half of a plugin, driven by the plugin's receive loop.
#[async_trait]
pub(crate) trait InboundHandler: Send + Sync + 'static {
    async fn handle(&self, transport: &dyn PubSubTransport, message: Message);
}

/// A live subscription plus the supervised loop draining it.
pub(crate) struct RunningListener {
    transport: Arc<dyn PubSubTransport>,
    channel: String,
    listener: Arc<dyn MessageListener>,
    task: SupervisedTask,
}

impl RunningListener {
    /// Opens a dedicated connection named after the plugin, subscribes `channel` and spawns the
    /// loop that feeds every message to `handler` in delivery order.
    pub(crate) async fn start(
        plugin_name: &str,
        loop_label: &str,
        connector: &dyn TransportConnector,
        channel: &str,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<Self, TwinError> {
        let transport = connector.connect(plugin_name).await?;
        let (queue_listener, mut receiver) = QueueListener::new(plugin_name);
        let listener: Arc<dyn MessageListener> = Arc::new(queue_listener);
        transport.subscribe(channel, listener.clone()).await?;

        let loop_transport = transport.clone();
        let task = spawn_supervised(format!("{plugin_name}-{loop_label}"), async move {
            while let Some(message) = receiver.recv().await {
                handler.handle(loop_transport.as_ref(), message).await;
            }
        });

        Ok(Self {
            transport,
            channel: channel.to_string(),
            listener,
            task,
        })
    }

    pub(crate) async fn shutdown(self) {
        if let Err(err) = self
            .transport
            .unsubscribe(&self.channel, self.listener.clone())
            .await
        {
            warn!(
                component = COMPONENT,
                task_name = self.task.task_name(),
                channel = self.channel.as_str(),
                err = %err,
                "unsubscribe during stop failed"
            );
        }
        self.task.abort();
    }
}
