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
use in_memory_record_store::InMemoryRecordStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use vehicle_twin::{MergedRecord, StoreError, VehicleRecordStore};

/// Fails the first `failures` writes with a retryable error, then behaves like an
/// [`InMemoryRecordStore`].
pub struct FlakyRecordStore {
    remaining_failures: AtomicUsize,
    write_attempts: AtomicUsize,
    inner: InMemoryRecordStore,
}

impl FlakyRecordStore {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            write_attempts: AtomicUsize::new(0),
            inner: InMemoryRecordStore::new(),
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub async fn records(&self) -> Vec<MergedRecord> {
        self.inner.records().await
    }
}

#[async_trait]
impl VehicleRecordStore for FlakyRecordStore {
    async fn write(&self, record: &MergedRecord) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            debug!(vehicle_id = record.identifier.as_str(), "failing write on purpose");
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.write(record).await
    }

    async fn read_all(&self, identifier: Option<&str>) -> Result<Vec<MergedRecord>, StoreError> {
        self.inner.read_all(identifier).await
    }
}
