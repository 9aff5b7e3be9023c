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
use tracing::debug;
use vehicle_twin::{PubSubTransport, TransportConnector, TwinError};

/// A connector whose every connection attempt fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingConnector;

#[async_trait]
impl TransportConnector for FailingConnector {
    async fn connect(&self, client_name: &str) -> Result<Arc<dyn PubSubTransport>, TwinError> {
        debug!(client_name, "refusing connection");
        Err(TwinError::Transport(format!(
            "connection refused for {client_name}"
        )))
    }
}
