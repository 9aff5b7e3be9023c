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

//! Per-vehicle fragment accumulation, merge policy and eviction.

use crate::correlation::fragment::{
    Fragment, FragmentKind, HeadingFragment, IdentityFragment, LocationFragment,
};
use crate::error::TwinError;
use crate::observability::events;
use crate::record_store::{MergedRecord, VehicleRecordStore};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "correlation_buffer";

pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// Which timestamp the expiry age is measured from.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReference {
    /// Age counts from the first fragment ever seen for the vehicle.
    #[default]
    FirstSeen,
    /// Age counts from the most recent fragment, so a vehicle that keeps reporting stays buffered.
    LastFragment,
}

#[derive(Clone, Debug)]
pub struct CorrelationSettings {
    pub expiration: Duration,
    /// Total persistence attempts per merged record, including the first one.
    pub max_write_attempts: u32,
    pub expiry_reference: ExpiryReference,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            expiration: DEFAULT_EXPIRATION,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            expiry_reference: ExpiryReference::default(),
        }
    }
}

/// The incomplete state of one vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRecord {
    pub identity: Option<IdentityFragment>,
    pub location: Option<LocationFragment>,
    pub heading: Option<HeadingFragment>,
    pub first_seen: Instant,
    pub last_seen: Instant,
    pub failed_writes: u32,
}

impl PendingRecord {
    fn new(now: Instant) -> Self {
        Self {
            identity: None,
            location: None,
            heading: None,
            first_seen: now,
            last_seen: now,
            failed_writes: 0,
        }
    }

    fn apply(&mut self, fragment: Fragment, now: Instant) {
        match fragment {
            Fragment::Identity(f) => self.identity = Some(f),
            Fragment::Location(f) => self.location = Some(f),
            Fragment::Heading(f) => self.heading = Some(f),
        }
        self.last_seen = now;
    }

    /// Folds a record created while this one was being written back into it. Slots filled by
    /// the newer record win.
    fn absorb_newer(&mut self, newer: PendingRecord) {
        if newer.identity.is_some() {
            self.identity = newer.identity;
        }
        if newer.location.is_some() {
            self.location = newer.location;
        }
        if newer.heading.is_some() {
            self.heading = newer.heading;
        }
        self.last_seen = self.last_seen.max(newer.last_seen);
    }

    pub fn is_complete(&self) -> bool {
        self.identity.is_some() && self.location.is_some() && self.heading.is_some()
    }

    pub fn missing(&self) -> Vec<FragmentKind> {
        let mut missing = Vec::new();
        if self.identity.is_none() {
            missing.push(FragmentKind::Identity);
        }
        if self.location.is_none() {
            missing.push(FragmentKind::Location);
        }
        if self.heading.is_none() {
            missing.push(FragmentKind::Heading);
        }
        missing
    }

    pub fn to_merged(&self) -> Option<MergedRecord> {
        let identity = self.identity.as_ref()?;
        let location = self.location.as_ref()?;
        let heading = self.heading.as_ref()?;
        Some(MergedRecord::new(
            identity.identifier.clone(),
            location.latitude,
            location.longitude,
            heading.heading,
        ))
    }

    pub fn age(&self, now: Instant, reference: ExpiryReference) -> Duration {
        let since = match reference {
            ExpiryReference::FirstSeen => self.first_seen,
            ExpiryReference::LastFragment => self.last_seen,
        };
        now.saturating_duration_since(since)
    }
}

/// Result of one merge check.
#[derive(Clone, Debug, PartialEq)]
pub enum MergeOutcome {
    /// No pending entry exists for the vehicle.
    Absent,
    /// The entry is still waiting for at least one fragment.
    Incomplete,
    /// An earlier record for the vehicle is being written; the entry waits for that write to
    /// resolve and is merged by the writer afterwards.
    WriteInFlight,
    /// The merged record was written and the entry evicted.
    Persisted(MergedRecord),
    /// The write failed transiently; the entry stays buffered for another attempt.
    WriteRetained { failed_writes: u32 },
}

#[derive(Default)]
struct BufferState {
    pending: HashMap<String, PendingRecord>,
    /// Vehicles with a write outstanding. At most one write per vehicle runs at a time.
    in_flight: HashSet<String>,
}

/// Owned, lock-guarded map of incomplete vehicle records.
///
/// A complete entry is taken out of the map under the lock before it is written, so a
/// concurrent sweep or a second merge check can never act on the same entry. The write itself
/// runs with the lock released. While it runs, a newer record for the same vehicle is held back
/// and merged only once the outstanding write has resolved, so writes for one vehicle reach the
/// store in fragment order.
pub struct CorrelationBuffer {
    state: Mutex<BufferState>,
    store: Arc<dyn VehicleRecordStore>,
    settings: CorrelationSettings,
}

impl CorrelationBuffer {
    pub fn new(store: Arc<dyn VehicleRecordStore>, mut settings: CorrelationSettings) -> Self {
        settings.max_write_attempts = settings.max_write_attempts.max(1);
        Self {
            state: Mutex::new(BufferState::default()),
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &CorrelationSettings {
        &self.settings
    }

    pub async fn on_fragment(&self, fragment: Fragment) -> Result<MergeOutcome, TwinError> {
        self.on_fragment_at(fragment, Instant::now()).await
    }

    /// Stores `fragment` in its vehicle's slot, creating the entry if needed, then runs the
    /// merge check for that vehicle.
    pub async fn on_fragment_at(
        &self,
        fragment: Fragment,
        now: Instant,
    ) -> Result<MergeOutcome, TwinError> {
        let vehicle_id = fragment.vehicle_id().to_string();
        let kind = fragment.kind();
        {
            let mut state = self.state.lock().await;
            let entry = state.pending.entry(vehicle_id.clone()).or_insert_with(|| {
                debug!(
                    event = events::PENDING_CREATE,
                    component = COMPONENT,
                    vehicle_id = vehicle_id.as_str(),
                    "creating pending record"
                );
                PendingRecord::new(now)
            });
            entry.apply(fragment, now);
            debug!(
                component = COMPONENT,
                vehicle_id = vehicle_id.as_str(),
                slot = kind.as_str(),
                "fragment buffered"
            );
        }

        self.merge_check(&vehicle_id).await
    }

    /// Persists and evicts the vehicle's entry if all three fragments are present.
    ///
    /// A non-retryable store error, or a transient one on the last allowed attempt, drops the
    /// entry and is returned to the caller. Entries that completed while the write was in flight
    /// are merged before this returns, unless the write was retained for retry.
    pub async fn merge_check(&self, vehicle_id: &str) -> Result<MergeOutcome, TwinError> {
        let outcome = self.write_if_complete(vehicle_id).await;
        if matches!(outcome, Ok(MergeOutcome::Persisted(_)) | Err(_)) {
            self.drain_deferred(vehicle_id).await;
        }
        outcome
    }

    async fn drain_deferred(&self, vehicle_id: &str) {
        loop {
            match self.write_if_complete(vehicle_id).await {
                Ok(MergeOutcome::Persisted(_)) => {}
                Ok(_) => break,
                Err(err) => debug!(
                    component = COMPONENT,
                    vehicle_id,
                    err = %err,
                    "deferred merge abandoned"
                ),
            }
        }
    }

    async fn write_if_complete(&self, vehicle_id: &str) -> Result<MergeOutcome, TwinError> {
        let (record, merged) = {
            let mut state = self.state.lock().await;
            let Some(merged) = state.pending.get(vehicle_id).and_then(PendingRecord::to_merged)
            else {
                return Ok(if state.pending.contains_key(vehicle_id) {
                    MergeOutcome::Incomplete
                } else {
                    MergeOutcome::Absent
                });
            };
            if state.in_flight.contains(vehicle_id) {
                debug!(
                    component = COMPONENT,
                    vehicle_id,
                    "write already in flight; deferring merge"
                );
                return Ok(MergeOutcome::WriteInFlight);
            }
            match state.pending.remove(vehicle_id) {
                Some(record) => {
                    state.in_flight.insert(vehicle_id.to_string());
                    (record, merged)
                }
                None => return Ok(MergeOutcome::Absent),
            }
        };

        debug!(
            event = events::MERGE_START,
            component = COMPONENT,
            vehicle_id,
            attempt = record.failed_writes + 1,
            "writing merged record"
        );

        match self.store.write(&merged).await {
            Ok(()) => {
                self.state.lock().await.in_flight.remove(vehicle_id);
                info!(
                    event = events::MERGE_OK,
                    component = COMPONENT,
                    vehicle_id,
                    latitude = merged.latitude,
                    longitude = merged.longitude,
                    heading = merged.heading,
                    "merged record persisted"
                );
                Ok(MergeOutcome::Persisted(merged))
            }
            Err(err) => {
                let failed_writes = record.failed_writes + 1;
                let retryable = err.is_retryable();
                if retryable && failed_writes < self.settings.max_write_attempts {
                    self.restore(vehicle_id, record, failed_writes).await;
                    warn!(
                        event = events::MERGE_WRITE_RETAINED,
                        component = COMPONENT,
                        vehicle_id,
                        failed_writes,
                        max_write_attempts = self.settings.max_write_attempts,
                        err = %err,
                        "write failed; keeping pending record for retry"
                    );
                    Ok(MergeOutcome::WriteRetained { failed_writes })
                } else {
                    self.state.lock().await.in_flight.remove(vehicle_id);
                    error!(
                        event = events::MERGE_WRITE_ABANDONED,
                        component = COMPONENT,
                        vehicle_id,
                        failed_writes,
                        retryable,
                        err = %err,
                        "write failed; dropping merged record"
                    );
                    Err(TwinError::Store(err))
                }
            }
        }
    }

    /// Puts a record whose write failed back into the map, folding in any newer entry that was
    /// held back meanwhile, and releases the vehicle's in-flight mark.
    async fn restore(&self, vehicle_id: &str, mut record: PendingRecord, failed_writes: u32) {
        record.failed_writes = failed_writes;
        let mut state = self.state.lock().await;
        if let Some(newer) = state.pending.remove(vehicle_id) {
            record.absorb_newer(newer);
        }
        state.pending.insert(vehicle_id.to_string(), record);
        state.in_flight.remove(vehicle_id);
    }

    /// Removes every entry older than the expiration threshold, complete or not.
    /// Returns the evicted vehicle ids.
    pub async fn sweep_expired(&self, now: Instant) -> Vec<String> {
        let mut state = self.state.lock().await;
        let expiration = self.settings.expiration;
        let reference = self.settings.expiry_reference;

        let expired: Vec<String> = state
            .pending
            .iter()
            .filter(|(_, record)| record.age(now, reference) > expiration)
            .map(|(vehicle_id, _)| vehicle_id.clone())
            .collect();

        for vehicle_id in &expired {
            if let Some(record) = state.pending.remove(vehicle_id) {
                let missing: Vec<&str> =
                    record.missing().iter().map(FragmentKind::as_str).collect();
                info!(
                    event = events::PENDING_EXPIRED,
                    component = COMPONENT,
                    vehicle_id = vehicle_id.as_str(),
                    age_ms = record.age(now, reference).as_millis() as u64,
                    failed_writes = record.failed_writes,
                    missing = ?missing,
                    "evicting expired pending record"
                );
            }
        }

        expired
    }

    /// Re-runs the merge check for complete entries left behind by a transient write failure.
    /// Returns how many of them were persisted.
    pub async fn retry_stalled_merges(&self) -> usize {
        let stalled: Vec<String> = {
            let state = self.state.lock().await;
            state
                .pending
                .iter()
                .filter(|(_, record)| record.is_complete())
                .map(|(vehicle_id, _)| vehicle_id.clone())
                .collect()
        };

        let mut persisted = 0;
        for vehicle_id in stalled {
            match self.merge_check(&vehicle_id).await {
                Ok(MergeOutcome::Persisted(_)) => persisted += 1,
                Ok(_) => {}
                Err(err) => debug!(
                    component = COMPONENT,
                    vehicle_id = vehicle_id.as_str(),
                    err = %err,
                    "stalled merge abandoned"
                ),
            }
        }
        persisted
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.pending.is_empty()
    }

    pub async fn contains(&self, vehicle_id: &str) -> bool {
        self.state.lock().await.pending.contains_key(vehicle_id)
    }

    pub async fn snapshot(&self, vehicle_id: &str) -> Option<PendingRecord> {
        self.state.lock().await.pending.get(vehicle_id).cloned()
    }
}
