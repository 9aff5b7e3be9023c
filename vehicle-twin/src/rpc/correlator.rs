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

//! Caller side of the request/response protocol.

use crate::error::TwinError;
use crate::observability::events;
use crate::rpc::protocol::{response_channel, RpcReply, RpcRequest, RpcResponse};
use crate::runtime::listener_queue::QueueListener;
use crate::transport::{Message, MessageListener, PubSubTransport};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "rpc_correlator";

/// Issues one request at a time per call and waits, bounded, for the response addressed to it.
pub struct RpcCorrelator {
    transport: Arc<dyn PubSubTransport>,
    request_topic: String,
    response_topic_prefix: String,
}

impl RpcCorrelator {
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        request_topic: impl Into<String>,
        response_topic_prefix: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            request_topic: request_topic.into(),
            response_topic_prefix: response_topic_prefix.into(),
        }
    }

    /// Sends a request under a fresh UUID v4 correlation id.
    pub async fn call(
        &self,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<RpcReply, TwinError> {
        let correlation_id = Uuid::new_v4().to_string();
        self.call_with_id(&correlation_id, params, timeout).await
    }

    /// Subscribes to the response address before publishing, waits at most `timeout` and
    /// releases the subscription whatever the outcome.
    pub async fn call_with_id(
        &self,
        correlation_id: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<RpcReply, TwinError> {
        let channel = response_channel(&self.response_topic_prefix, correlation_id);
        let (queue_listener, receiver) = QueueListener::new(COMPONENT);
        let listener: Arc<dyn MessageListener> = Arc::new(queue_listener);
        self.transport.subscribe(&channel, listener.clone()).await?;

        debug!(
            event = events::RPC_CALL_START,
            component = COMPONENT,
            correlation_id,
            request_topic = self.request_topic.as_str(),
            response_channel = channel.as_str(),
            "sending request"
        );
        let result = self
            .exchange(correlation_id, params, timeout, receiver)
            .await;

        if let Err(err) = self.transport.unsubscribe(&channel, listener).await {
            warn!(
                event = events::RPC_UNSUBSCRIBE_FAILED,
                component = COMPONENT,
                correlation_id,
                response_channel = channel.as_str(),
                err = %err,
                "unable to release response subscription"
            );
        }

        result
    }

    async fn exchange(
        &self,
        correlation_id: &str,
        params: Option<Value>,
        timeout: Duration,
        mut receiver: UnboundedReceiver<Message>,
    ) -> Result<RpcReply, TwinError> {
        let request = RpcRequest::new(correlation_id, params);
        let payload = serde_json::to_vec(&request)
            .map_err(|e| TwinError::Protocol(format!("unable to encode request: {e}")))?;
        self.transport.publish(&self.request_topic, payload).await?;

        let wait = async {
            while let Some(message) = receiver.recv().await {
                match RpcResponse::from_slice(&message.payload) {
                    Ok(response) if response.correlation_id == correlation_id => {
                        return response.into_reply();
                    }
                    Ok(response) => debug!(
                        component = COMPONENT,
                        correlation_id,
                        received = response.correlation_id.as_str(),
                        "ignoring response for another correlation id"
                    ),
                    Err(err) => warn!(
                        component = COMPONENT,
                        correlation_id,
                        err = %TwinError::malformed(&message.channel, err),
                        "ignoring unparseable response"
                    ),
                }
            }
            Err(TwinError::Transport(
                "response subscription closed before a reply arrived".to_string(),
            ))
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(reply)) => {
                info!(
                    event = events::RPC_CALL_OK,
                    component = COMPONENT,
                    correlation_id,
                    "response received"
                );
                Ok(reply)
            }
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => {
                warn!(
                    event = events::RPC_CALL_TIMEOUT,
                    component = COMPONENT,
                    correlation_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "no response before timeout"
                );
                Err(TwinError::Timeout {
                    correlation_id: correlation_id.to_string(),
                    timeout,
                })
            }
        }
    }
}
