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

//! Persistence collaborator boundary and the merged record it stores.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The union of identity, location and heading for one vehicle.
///
/// This is also the wire shape used by the RPC response list, the trigger republish and
/// the record sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    #[serde(alias = "vin")]
    pub identifier: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(alias = "giro")]
    pub heading: f64,
}

impl MergedRecord {
    pub fn new(identifier: impl Into<String>, latitude: f64, longitude: f64, heading: f64) -> Self {
        Self {
            identifier: identifier.into(),
            latitude,
            longitude,
            heading,
        }
    }
}

/// Data-access capability. Shared by the router and every plugin without extra locking, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait VehicleRecordStore: Send + Sync {
    async fn write(&self, record: &MergedRecord) -> Result<(), StoreError>;

    /// Reads every stored record, or only those for `identifier` when a filter is given.
    async fn read_all(&self, identifier: Option<&str>) -> Result<Vec<MergedRecord>, StoreError>;
}
