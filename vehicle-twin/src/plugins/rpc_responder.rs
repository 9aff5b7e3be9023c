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

//! Answers read requests from the record store over the correlation-id protocol.

use crate::error::TwinError;
use crate::observability::events;
use crate::plugin::listener_plugin::{
    parse_plugin_config, InboundHandler, ListenerPlugin, PluginContext, PluginSpec,
    RunningListener,
};
use crate::record_store::VehicleRecordStore;
use crate::rpc::{response_channel, RecordQuery, RpcRequest, RpcResponse, MALFORMED_PARAMS};
use crate::transport::{Message, PubSubTransport};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "rpc_responder";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcResponderConfig {
    #[serde(alias = "request_topic")]
    request_topic: String,
    #[serde(alias = "response_topic_prefix")]
    response_topic_prefix: String,
}

pub struct RpcResponder {
    name: String,
    config: Map<String, Value>,
    context: PluginContext,
    running: Option<RunningListener>,
}

impl RpcResponder {
    pub const MODULE: &'static str = "rpc_responder";
    pub const IMPLEMENTATION: &'static str = "RpcResponder";

    pub fn new(spec: PluginSpec) -> Self {
        Self {
            name: spec.name,
            config: spec.config,
            context: spec.context,
            running: None,
        }
    }

    fn settings(&self) -> Result<RpcResponderConfig, TwinError> {
        parse_plugin_config(&self.name, &self.config)
    }
}

#[async_trait]
impl ListenerPlugin for RpcResponder {
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
                "record store not available; requests will be answered with an error"
            );
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), TwinError> {
        let settings = self.settings()?;
        let handler = Arc::new(RequestHandler {
            plugin_name: self.name.clone(),
            response_topic_prefix: settings.response_topic_prefix,
            store: self.context.record_store(),
        });
        let running = RunningListener::start(
            &self.name,
            "rpc",
            self.context.connector().as_ref(),
            &settings.request_topic,
            handler,
        )
        .await?;
        info!(
            component = COMPONENT,
            plugin = self.name.as_str(),
            request_topic = settings.request_topic.as_str(),
            "RPC responder listening"
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

struct RequestHandler {
    plugin_name: String,
    response_topic_prefix: String,
    store: Option<Arc<dyn VehicleRecordStore>>,
}

impl RequestHandler {
    /// Builds the response for one request payload, or `None` when no response can be
    /// addressed.
    async fn respond_to(&self, message: &Message) -> Option<RpcResponse> {
        let request = match RpcRequest::from_slice(&message.payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    event = events::RPC_REQUEST_REJECTED,
                    component = COMPONENT,
                    plugin = self.plugin_name.as_str(),
                    err = %TwinError::malformed(&message.channel, err),
                    "bad RPC payload"
                );
                return None;
            }
        };
        let Some(correlation_id) = request.correlation_id() else {
            warn!(
                event = events::RPC_REQUEST_REJECTED,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                err = %TwinError::Protocol("missing correlation id".to_string()),
                "request cannot be answered"
            );
            return None;
        };

        let Some(store) = &self.store else {
            return Some(RpcResponse::failure(
                correlation_id,
                TwinError::CapabilityUnavailable("record store").to_string(),
            ));
        };
        let Some(query) = RecordQuery::from_params(request.params.as_ref()) else {
            return Some(RpcResponse::failure(correlation_id, MALFORMED_PARAMS));
        };

        debug!(
            component = COMPONENT,
            plugin = self.plugin_name.as_str(),
            correlation_id,
            filter = query.identifier(),
            "executing read"
        );
        Some(match store.read_all(query.identifier()).await {
            Ok(records) => RpcResponse::success(correlation_id, records),
            Err(err) => RpcResponse::failure(correlation_id, err.to_string()),
        })
    }
}

#[async_trait]
impl InboundHandler for RequestHandler {
    async fn handle(&self, transport: &dyn PubSubTransport, message: Message) {
        let Some(response) = self.respond_to(&message).await else {
            return;
        };
        let channel = response_channel(&self.response_topic_prefix, &response.correlation_id);

        let published = match response.to_vec() {
            Ok(payload) => transport.publish(&channel, payload).await,
            Err(err) => Err(TwinError::Protocol(format!("unable to encode response: {err}"))),
        };
        match published {
            Ok(()) => debug!(
                event = events::RPC_RESPONSE_SENT,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                channel = channel.as_str(),
                failed = response.error.is_some(),
                "response published"
            ),
            Err(err) => error!(
                event = events::RPC_RESPONSE_SEND_FAILED,
                component = COMPONENT,
                plugin = self.plugin_name.as_str(),
                channel = channel.as_str(),
                err = %err,
                "unable to publish response"
            ),
        }
    }
}
