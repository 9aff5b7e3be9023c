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

//! Process-local [`VehicleRecordStore`].
//!
//! Every write appends a row, like an insert into a history table, and reads return rows in
//! write order.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use vehicle_twin::{MergedRecord, StoreError, VehicleRecordStore};

const COMPONENT: &str = "in_memory_record_store";

#[derive(Default)]
pub struct InMemoryRecordStore {
    rows: RwLock<Vec<MergedRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<MergedRecord>) -> Self {
        Self {
            rows: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn records(&self) -> Vec<MergedRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl VehicleRecordStore for InMemoryRecordStore {
    async fn write(&self, record: &MergedRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.push(record.clone());
        debug!(
            component = COMPONENT,
            vehicle_id = record.identifier.as_str(),
            rows = rows.len(),
            "record written"
        );
        Ok(())
    }

    async fn read_all(&self, identifier: Option<&str>) -> Result<Vec<MergedRecord>, StoreError> {
        let rows = self.rows.read().await;
        Ok(match identifier {
            Some(identifier) => rows
                .iter()
                .filter(|record| record.identifier == identifier)
                .cloned()
                .collect(),
            None => rows.clone(),
        })
    }
}
