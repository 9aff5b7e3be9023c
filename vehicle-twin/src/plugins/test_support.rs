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

//! Stub collaborators shared by the plugin unit tests.

use crate::error::{StoreError, TwinError};
use crate::record_store::{MergedRecord, VehicleRecordStore};
use crate::transport::{Message, MessageListener, PubSubTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub(crate) struct RecordingTransport {
    published: Mutex<Vec<Message>>,
    fail_publish: bool,
}

impl RecordingTransport {
    pub(crate) fn failing() -> Self {
        Self {
            fail_publish: true,
            ..Default::default()
        }
    }

    pub(crate) fn published_json(&self) -> Vec<(String, Value)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|message| {
                (
                    message.channel.clone(),
                    serde_json::from_slice(&message.payload).unwrap(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl PubSubTransport for RecordingTransport {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), TwinError> {
        if self.fail_publish {
            return Err(TwinError::Transport("broker went away".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push(Message::new(channel, payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        _channel: &str,
        _listener: Arc<dyn MessageListener>,
    ) -> Result<(), TwinError> {
        Ok(())
    }

    async fn unsubscribe(
        &self,
        _channel: &str,
        _listener: Arc<dyn MessageListener>,
    ) -> Result<(), TwinError> {
        Ok(())
    }
}

/// Serves a fixed record set and collects writes.
#[derive(Default)]
pub(crate) struct FixedStore {
    records: Vec<MergedRecord>,
    failure: Option<StoreError>,
    pub(crate) writes: Mutex<Vec<MergedRecord>>,
}

impl FixedStore {
    pub(crate) fn with_records(records: Vec<MergedRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub(crate) fn failing(failure: StoreError) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VehicleRecordStore for FixedStore {
    async fn write(&self, record: &MergedRecord) -> Result<(), StoreError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.writes.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn read_all(&self, identifier: Option<&str>) -> Result<Vec<MergedRecord>, StoreError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(self
            .records
            .iter()
            .filter(|record| identifier.map_or(true, |id| record.identifier == id))
            .cloned()
            .collect())
    }
}

pub(crate) fn sample_records() -> Vec<MergedRecord> {
    vec![
        MergedRecord::new("V1", 45.07, 7.68, 90.0),
        MergedRecord::new("V2", 41.9, 12.49, 180.0),
    ]
}
