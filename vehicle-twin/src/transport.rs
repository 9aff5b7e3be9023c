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

//! Publish/subscribe collaborator boundary.
//!
//! The broker itself lives outside this crate. Everything here talks to it only through
//! [`PubSubTransport`] and receives traffic through [`MessageListener`] callbacks.

use crate::error::TwinError;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One inbound message together with the channel it was delivered on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(channel: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8 text, lossy, for log lines.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_receive(&self, message: Message);
}

/// A single connection to the broker.
///
/// Implementations must deliver messages of one subscription in publish order.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), TwinError>;

    async fn subscribe(
        &self,
        channel: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TwinError>;

    /// Removes the subscription registered with this exact listener instance.
    async fn unsubscribe(
        &self,
        channel: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TwinError>;
}

/// Opens independent broker connections, one per long-running task.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, client_name: &str) -> Result<Arc<dyn PubSubTransport>, TwinError>;
}

/// Pointer identity of a registered listener, used to match `unsubscribe` calls.
#[derive(Clone)]
pub struct ListenerIdentityKey {
    listener: Arc<dyn MessageListener>,
}

impl ListenerIdentityKey {
    pub fn new(listener: Arc<dyn MessageListener>) -> Self {
        Self { listener }
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.listener) as *const ()
    }
}

impl Hash for ListenerIdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl PartialEq for ListenerIdentityKey {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for ListenerIdentityKey {}

impl Debug for ListenerIdentityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerIdentityKey")
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ListenerIdentityKey, Message, MessageListener};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopListener;

    #[async_trait]
    impl MessageListener for NoopListener {
        async fn on_receive(&self, _message: Message) {}
    }

    #[test]
    fn identity_key_matches_clones_of_the_same_listener() {
        let listener: Arc<dyn MessageListener> = Arc::new(NoopListener);
        let a = ListenerIdentityKey::new(listener.clone());
        let b = ListenerIdentityKey::new(listener);

        assert_eq!(a, b);
    }

    #[test]
    fn identity_key_distinguishes_separate_instances() {
        let a = ListenerIdentityKey::new(Arc::new(NoopListener));
        let b = ListenerIdentityKey::new(Arc::new(NoopListener));

        assert_ne!(a, b);
    }
}
