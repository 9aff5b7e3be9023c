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

//! # vehicle-twin
//!
//! `vehicle-twin` correlates vehicle telemetry fragments published independently on separate
//! pub/sub channels (identity, location, heading) into one merged record per vehicle and
//! persists it. Two pluggable services ride on the same transport: a correlation-id RPC
//! responder answering read requests and a trigger-driven bulk republisher.
//!
//! ```
//! use std::sync::Arc;
//! use vehicle_twin::correlation::{CorrelationSettings, FragmentChannels, RouteOutcome};
//! use vehicle_twin::correlation::{FragmentRouter, MergeOutcome};
//! use vehicle_twin::correlation::CorrelationBuffer;
//! use vehicle_twin::{Message, MergedRecord, StoreError, VehicleRecordStore};
//!
//! # struct NullStore;
//! #
//! # #[async_trait::async_trait]
//! # impl VehicleRecordStore for NullStore {
//! #     async fn write(&self, _record: &MergedRecord) -> Result<(), StoreError> {
//! #         Ok(())
//! #     }
//! #
//! #     async fn read_all(&self, _id: Option<&str>) -> Result<Vec<MergedRecord>, StoreError> {
//! #         Ok(Vec::new())
//! #     }
//! # }
//! #
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let buffer = Arc::new(CorrelationBuffer::new(
//!     Arc::new(NullStore),
//!     CorrelationSettings::default(),
//! ));
//! let router = FragmentRouter::new(FragmentChannels::default(), buffer);
//!
//! router
//!     .route(Message::new("vehicles/vin", br#"{"identifier": "V1"}"#.to_vec()))
//!     .await;
//! router
//!     .route(Message::new(
//!         "vehicles/location",
//!         br#"{"identifier": "V1", "latitude": 45.0, "longitude": 7.6}"#.to_vec(),
//!     ))
//!     .await;
//! let outcome = router
//!     .route(Message::new(
//!         "vehicles/giro",
//!         br#"{"identifier": "V1", "heading": 90.0}"#.to_vec(),
//!     ))
//!     .await;
//!
//! assert_eq!(
//!     outcome,
//!     RouteOutcome::Buffered(MergeOutcome::Persisted(MergedRecord::new("V1", 45.0, 7.6, 90.0)))
//! );
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Collaborator boundaries: `PubSubTransport`, `TransportConnector`, `VehicleRecordStore`
//! - Correlation: fragment parsing, per-vehicle buffer, channel router, expiry sweeper
//! - Plugin framework: descriptors, compile-time registry, manager, listener capability
//! - Built-in plugins: RPC responder, trigger republisher, record sink
//! - RPC: wire protocol and the caller-side correlator
//! - Runtime: supervised task spawning and listener-to-loop queues
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber. Binaries and tests
//! are responsible for one-time `tracing_subscriber` initialization at process boundaries.

pub mod correlation;
mod error;
pub use error::{StoreError, TwinError};

#[doc(hidden)]
pub mod observability;
pub mod plugin;
pub mod plugins;

mod record_store;
pub use record_store::{MergedRecord, VehicleRecordStore};

pub mod rpc;
mod runtime;

mod transport;
pub use transport::{
    ListenerIdentityKey, Message, MessageListener, PubSubTransport, TransportConnector,
};

mod vehicle_twin;
pub use vehicle_twin::VehicleTwin;

pub use plugin::{PluginDescriptor, PluginDescriptorList, PluginManager, PluginRegistry};
