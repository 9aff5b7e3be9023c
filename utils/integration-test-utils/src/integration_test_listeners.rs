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

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use vehicle_twin::{Message, MessageListener};

/// Keeps every message it receives, in arrival order.
#[derive(Clone, Default)]
pub struct RecordingListener {
    message_store: Arc<Mutex<Vec<Message>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.message_store.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.message_store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.message_store.lock().await.is_empty()
    }
}

#[async_trait]
impl MessageListener for RecordingListener {
    async fn on_receive(&self, message: Message) {
        debug!(
            channel = message.channel.as_str(),
            payload = message.payload_text().as_str(),
            "within recording_listener"
        );
        self.message_store.lock().await.push(message);
    }
}
