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

//! In-process publish/subscribe broker.
//!
//! Channels match exactly; there are no wildcards. Every subscription gets its own queue and
//! delivery task, so one slow listener never delays another and each listener sees the
//! messages of its channel in publish order.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use vehicle_twin::{
    ListenerIdentityKey, Message, MessageListener, PubSubTransport, TransportConnector, TwinError,
};

const COMPONENT: &str = "in_memory_broker";

type SubscriptionMap = HashMap<String, HashMap<ListenerIdentityKey, UnboundedSender<Message>>>;

#[derive(Clone, Default)]
pub struct InMemoryBroker {
    subscriptions: Arc<Mutex<SubscriptionMap>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a named client connection.
    pub fn client(&self, client_name: &str) -> BrokerClient {
        BrokerClient {
            client_name: client_name.to_string(),
            subscriptions: self.subscriptions.clone(),
        }
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.subscriptions
            .lock()
            .await
            .get(channel)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl TransportConnector for InMemoryBroker {
    async fn connect(&self, client_name: &str) -> Result<Arc<dyn PubSubTransport>, TwinError> {
        debug!(component = COMPONENT, client_name, "client connected");
        Ok(Arc::new(self.client(client_name)))
    }
}

/// One connection to an [`InMemoryBroker`].
#[derive(Clone)]
pub struct BrokerClient {
    client_name: String,
    subscriptions: Arc<Mutex<SubscriptionMap>>,
}

impl BrokerClient {
    pub fn client_name(&self) -> &str {
        &self.client_name
    }
}

#[async_trait]
impl PubSubTransport for BrokerClient {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), TwinError> {
        let subscriptions = self.subscriptions.lock().await;
        let Some(listeners) = subscriptions.get(channel) else {
            trace!(
                component = COMPONENT,
                client_name = self.client_name.as_str(),
                channel,
                "no subscribers"
            );
            return Ok(());
        };
        for sender in listeners.values() {
            // A closed queue belongs to a subscription that is being torn down.
            let _ = sender.send(Message::new(channel, payload.clone()));
        }
        trace!(
            component = COMPONENT,
            client_name = self.client_name.as_str(),
            channel,
            subscribers = listeners.len(),
            "published"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TwinError> {
        let key = ListenerIdentityKey::new(listener.clone());
        let mut subscriptions = self.subscriptions.lock().await;
        let channel_subscriptions = subscriptions.entry(channel.to_string()).or_default();
        if channel_subscriptions.contains_key(&key) {
            return Err(TwinError::Transport(format!(
                "listener already subscribed to {channel}"
            )));
        }

        let (sender, mut receiver) = unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                listener.on_receive(message).await;
            }
        });
        channel_subscriptions.insert(key, sender);
        debug!(
            component = COMPONENT,
            client_name = self.client_name.as_str(),
            channel,
            "subscribed"
        );
        Ok(())
    }

    async fn unsubscribe(
        &self,
        channel: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TwinError> {
        let key = ListenerIdentityKey::new(listener);
        let mut subscriptions = self.subscriptions.lock().await;
        let removed = subscriptions
            .get_mut(channel)
            .and_then(|channel_subscriptions| channel_subscriptions.remove(&key));
        if subscriptions.get(channel).is_some_and(HashMap::is_empty) {
            subscriptions.remove(channel);
        }

        match removed {
            Some(_) => {
                debug!(
                    component = COMPONENT,
                    client_name = self.client_name.as_str(),
                    channel,
                    "unsubscribed"
                );
                Ok(())
            }
            None => Err(TwinError::Transport(format!(
                "no subscription on {channel} for this listener"
            ))),
        }
    }
}
