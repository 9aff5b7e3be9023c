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

mod support;

use in_memory_broker::InMemoryBroker;
use in_memory_record_store::InMemoryRecordStore;
use integration_test_utils::{eventually, FailingConnector, FlakyRecordStore};
use std::sync::Arc;
use std::time::Duration;
use vehicle_twin::correlation::{CorrelationSettings, FragmentChannels};
use vehicle_twin::{MergedRecord, TwinError, VehicleTwin};

const IDENTITY: &[u8] = br#"{"identifier": "WVW000001"}"#;
const LOCATION: &[u8] = br#"{"identifier": "WVW000001", "latitude": 45.0703, "longitude": 7.6869}"#;
const HEADING: &[u8] = br#"{"identifier": "WVW000001", "heading": 90.0}"#;

#[tokio::test]
async fn fragments_on_three_channels_become_one_record() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new();
    let store = Arc::new(InMemoryRecordStore::new());
    let twin = support::started_twin(&broker, store.clone(), CorrelationSettings::default()).await;
    let producer = support::client(&broker, "producer").await;

    producer.publish("vehicles/giro", HEADING.to_vec()).await.unwrap();
    producer.publish("vehicles/vin", IDENTITY.to_vec()).await.unwrap();
    producer
        .publish("vehicles/location", LOCATION.to_vec())
        .await
        .unwrap();

    assert!(eventually(support::SETTLE_TIMEOUT, || async { store.len().await == 1 }).await);
    assert_eq!(
        store.records().await,
        vec![MergedRecord::new("WVW000001", 45.0703, 7.6869, 90.0)]
    );
    assert!(twin.buffer().is_empty().await);
}

#[tokio::test]
async fn malformed_and_partial_traffic_writes_nothing() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new();
    let store = Arc::new(InMemoryRecordStore::new());
    let twin = support::started_twin(&broker, store.clone(), CorrelationSettings::default()).await;
    let producer = support::client(&broker, "producer").await;

    producer.publish("vehicles/vin", IDENTITY.to_vec()).await.unwrap();
    producer
        .publish("vehicles/location", b"{\"latitude\": 1.0".to_vec())
        .await
        .unwrap();
    producer
        .publish("vehicles/giro", br#"{"heading": 12.0}"#.to_vec())
        .await
        .unwrap();

    let buffer = twin.buffer();
    assert!(
        eventually(support::SETTLE_TIMEOUT, || async { buffer.contains("WVW000001").await }).await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.is_empty().await);
    assert_eq!(buffer.len().await, 1);
}

#[tokio::test]
async fn transient_write_failure_is_retried_by_the_sweeper() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new();
    let store = Arc::new(FlakyRecordStore::failing_first(1));
    let mut twin =
        support::started_twin(&broker, store.clone(), CorrelationSettings::default()).await;
    let producer = support::client(&broker, "producer").await;

    producer.publish("vehicles/vin", IDENTITY.to_vec()).await.unwrap();
    producer
        .publish("vehicles/location", LOCATION.to_vec())
        .await
        .unwrap();
    producer.publish("vehicles/giro", HEADING.to_vec()).await.unwrap();

    let buffer = twin.buffer();
    assert!(
        eventually(support::SETTLE_TIMEOUT, || async {
            store.write_attempts() == 1 && buffer.contains("WVW000001").await
        })
        .await
    );
    assert!(store.records().await.is_empty());

    twin.spawn_expiry_sweeper(Duration::from_millis(20));

    assert!(
        eventually(support::SETTLE_TIMEOUT, || async { store.records().await.len() == 1 }).await
    );
    assert_eq!(store.write_attempts(), 2);
    assert!(buffer.is_empty().await);
    twin.stop().await;
}

#[tokio::test]
async fn sweeper_expires_incomplete_vehicles() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new();
    let store = Arc::new(InMemoryRecordStore::new());
    let settings = CorrelationSettings {
        expiration: Duration::from_millis(50),
        ..Default::default()
    };
    let mut twin = support::started_twin(&broker, store.clone(), settings).await;
    let producer = support::client(&broker, "producer").await;
    twin.spawn_expiry_sweeper(Duration::from_millis(20));

    producer.publish("vehicles/vin", IDENTITY.to_vec()).await.unwrap();

    let buffer = twin.buffer();
    assert!(
        eventually(support::SETTLE_TIMEOUT, || async { buffer.contains("WVW000001").await }).await
    );
    assert!(eventually(support::SETTLE_TIMEOUT, || async { buffer.is_empty().await }).await);
    assert!(store.is_empty().await);
    twin.stop().await;
}

#[tokio::test]
async fn stopped_twin_ignores_new_fragments() {
    integration_test_utils::init_logging();

    let broker = InMemoryBroker::new();
    let store = Arc::new(InMemoryRecordStore::new());
    let mut twin =
        support::started_twin(&broker, store.clone(), CorrelationSettings::default()).await;
    twin.stop().await;

    assert_eq!(broker.subscriber_count("vehicles/vin").await, 0);
    let producer = support::client(&broker, "producer").await;
    producer.publish("vehicles/vin", IDENTITY.to_vec()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(twin.buffer().is_empty().await);
}

#[tokio::test]
async fn connect_failure_is_returned_from_start() {
    integration_test_utils::init_logging();

    let mut twin = VehicleTwin::new(
        "vehicle",
        FragmentChannels::default(),
        CorrelationSettings::default(),
        Arc::new(InMemoryRecordStore::new()),
    );

    let err = twin.start(&FailingConnector).await.unwrap_err();

    assert!(matches!(err, TwinError::Transport(_)));
    assert!(!twin.is_started());
}
