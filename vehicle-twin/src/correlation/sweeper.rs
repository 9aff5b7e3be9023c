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

//! Periodic expiry pass over the correlation buffer.

use crate::correlation::buffer::CorrelationBuffer;
use crate::observability::events;
use crate::runtime::task_supervisor::{spawn_supervised, SupervisedTask};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::debug;

const COMPONENT: &str = "expiry_sweeper";
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// What one sweeper pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: Vec<String>,
    pub retried_persisted: usize,
}

pub struct ExpirySweeper;

impl ExpirySweeper {
    /// Re-drives merges stalled by a transient write failure, then evicts expired entries.
    ///
    /// Retrying first gives a retained record one more write attempt before its age can
    /// evict it.
    pub async fn run_once(buffer: &CorrelationBuffer, now: Instant) -> SweepReport {
        let retried_persisted = buffer.retry_stalled_merges().await;
        let expired = buffer.sweep_expired(now).await;
        let remaining = buffer.len().await;

        debug!(
            event = events::SWEEP_SUMMARY,
            component = COMPONENT,
            expired = expired.len(),
            retried_persisted,
            remaining,
            "sweep pass complete"
        );

        SweepReport {
            expired,
            retried_persisted,
        }
    }

    pub(crate) fn spawn(
        task_name: &str,
        buffer: Arc<CorrelationBuffer>,
        interval: Duration,
    ) -> SupervisedTask {
        spawn_supervised(task_name, async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_SWEEP_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the first pass runs one
            // interval after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                ExpirySweeper::run_once(&buffer, Instant::now()).await;
            }
        })
    }
}
