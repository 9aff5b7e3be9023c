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

//! Correlation layer.
//!
//! Owns fragment parsing, the per-vehicle buffer with its merge policy, the channel router that
//! feeds it and the periodic expiry sweeper. The buffer is the only state in the crate mutated
//! from more than one task.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use vehicle_twin::correlation::{
//!     CorrelationBuffer, CorrelationSettings, Fragment, FragmentKind, MergeOutcome,
//! };
//! use vehicle_twin::{MergedRecord, StoreError, VehicleRecordStore};
//!
//! # struct NullStore;
//! #
//! # #[async_trait]
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
//! let buffer = CorrelationBuffer::new(Arc::new(NullStore), CorrelationSettings::default());
//!
//! let identity = Fragment::parse(FragmentKind::Identity, br#"{"identifier": "V1"}"#).unwrap();
//! let location = Fragment::parse(
//!     FragmentKind::Location,
//!     br#"{"identifier": "V1", "latitude": 1.0, "longitude": 2.0}"#,
//! )
//! .unwrap();
//! let heading =
//!     Fragment::parse(FragmentKind::Heading, br#"{"identifier": "V1", "heading": 3.0}"#).unwrap();
//!
//! assert_eq!(buffer.on_fragment(identity).await.unwrap(), MergeOutcome::Incomplete);
//! assert_eq!(buffer.on_fragment(location).await.unwrap(), MergeOutcome::Incomplete);
//! assert_eq!(
//!     buffer.on_fragment(heading).await.unwrap(),
//!     MergeOutcome::Persisted(MergedRecord::new("V1", 1.0, 2.0, 3.0))
//! );
//! assert!(buffer.is_empty().await);
//! # });
//! ```

mod buffer;
mod fragment;
mod router;
mod sweeper;

pub use buffer::{
    CorrelationBuffer, CorrelationSettings, ExpiryReference, MergeOutcome, PendingRecord,
    DEFAULT_EXPIRATION, DEFAULT_MAX_WRITE_ATTEMPTS,
};
pub use fragment::{
    Fragment, FragmentKind, FragmentParseError, HeadingFragment, IdentityFragment,
    LocationFragment,
};
pub use router::{
    FragmentChannels, FragmentRouter, RouteOutcome, DEFAULT_HEADING_CHANNEL,
    DEFAULT_IDENTITY_CHANNEL, DEFAULT_LOCATION_CHANNEL,
};
pub use sweeper::{ExpirySweeper, SweepReport};
