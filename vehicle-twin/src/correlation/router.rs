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

//! Ingress listener that turns fragment messages into correlation-buffer updates.

use crate::correlation::buffer::{CorrelationBuffer, MergeOutcome};
use crate::correlation::fragment::{Fragment, FragmentKind};
use crate::error::TwinError;
use crate::observability::events;
use crate::transport::{Message, MessageListener};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, trace, warn, Level};

const COMPONENT: &str = "fragment_router";

pub const DEFAULT_IDENTITY_CHANNEL: &str = "vehicles/vin";
pub const DEFAULT_LOCATION_CHANNEL: &str = "vehicles/location";
pub const DEFAULT_HEADING_CHANNEL: &str = "vehicles/giro";

/// The three inbound channel names, one per fragment kind.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FragmentChannels {
    pub identity: String,
    pub location: String,
    pub heading: String,
}

impl Default for FragmentChannels {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY_CHANNEL.to_string(),
            location: DEFAULT_LOCATION_CHANNEL.to_string(),
            heading: DEFAULT_HEADING_CHANNEL.to_string(),
        }
    }
}

impl FragmentChannels {
    pub fn kind_for(&self, channel: &str) -> Option<FragmentKind> {
        if channel == self.identity {
            Some(FragmentKind::Identity)
        } else if channel == self.location {
            Some(FragmentKind::Location)
        } else if channel == self.heading {
            Some(FragmentKind::Heading)
        } else {
            None
        }
    }

    pub fn channel_for(&self, kind: FragmentKind) -> &str {
        match kind {
            FragmentKind::Identity => &self.identity,
            FragmentKind::Location => &self.location,
            FragmentKind::Heading => &self.heading,
        }
    }
}

/// How the router disposed of one message.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    IgnoredChannel,
    DroppedMalformed,
    Buffered(MergeOutcome),
    /// The merged record was dropped after its write failed for good.
    PersistFailed,
}

pub struct FragmentRouter {
    channels: FragmentChannels,
    buffer: Arc<CorrelationBuffer>,
}

impl FragmentRouter {
    pub fn new(channels: FragmentChannels, buffer: Arc<CorrelationBuffer>) -> Self {
        Self { channels, buffer }
    }

    pub fn channels(&self) -> &FragmentChannels {
        &self.channels
    }

    pub async fn route(&self, message: Message) -> RouteOutcome {
        let Some(kind) = self.channels.kind_for(&message.channel) else {
            trace!(
                event = events::FRAGMENT_IGNORED_CHANNEL,
                component = COMPONENT,
                channel = message.channel.as_str(),
                "ignoring message on unrecognized channel"
            );
            return RouteOutcome::IgnoredChannel;
        };

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::FRAGMENT_RECEIVE,
                component = COMPONENT,
                channel = message.channel.as_str(),
                slot = kind.as_str(),
                payload = message.payload_text().as_str(),
                "received fragment"
            );
        }

        let fragment = match Fragment::parse(kind, &message.payload) {
            Ok(fragment) => fragment,
            Err(err) => {
                warn!(
                    event = events::FRAGMENT_DROP_MALFORMED,
                    component = COMPONENT,
                    channel = message.channel.as_str(),
                    slot = kind.as_str(),
                    err = %TwinError::malformed(&message.channel, &err),
                    "dropping malformed fragment"
                );
                return RouteOutcome::DroppedMalformed;
            }
        };

        let vehicle_id = fragment.vehicle_id().to_string();
        match self.buffer.on_fragment(fragment).await {
            Ok(outcome) => RouteOutcome::Buffered(outcome),
            Err(err) => {
                error!(
                    component = COMPONENT,
                    vehicle_id = vehicle_id.as_str(),
                    err = %err,
                    "merged record could not be persisted"
                );
                RouteOutcome::PersistFailed
            }
        }
    }
}

#[async_trait]
impl MessageListener for FragmentRouter {
    async fn on_receive(&self, message: Message) {
        self.route(message).await;
    }
}
