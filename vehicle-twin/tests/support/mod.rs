use in_memory_broker::InMemoryBroker;
use std::sync::Arc;
use std::time::Duration;
use vehicle_twin::correlation::{CorrelationSettings, FragmentChannels};
use vehicle_twin::{
    MergedRecord, PluginDescriptor, PubSubTransport, TransportConnector, VehicleRecordStore,
    VehicleTwin,
};

#[allow(dead_code)]
pub(crate) const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[allow(dead_code)]
pub(crate) async fn started_twin(
    broker: &InMemoryBroker,
    store: Arc<dyn VehicleRecordStore>,
    settings: CorrelationSettings,
) -> VehicleTwin {
    let mut twin = VehicleTwin::new("vehicle", FragmentChannels::default(), settings, store);
    twin.start(broker)
        .await
        .expect("twin should start against the in-memory broker");
    twin
}

pub(crate) async fn client(broker: &InMemoryBroker, name: &str) -> Arc<dyn PubSubTransport> {
    broker
        .connect(name)
        .await
        .expect("in-memory broker accepts every client")
}

#[allow(dead_code)]
pub(crate) fn descriptor(
    name: &str,
    module: &str,
    implementation: &str,
    config: serde_json::Value,
) -> PluginDescriptor {
    PluginDescriptor {
        name: Some(name.to_string()),
        module: module.to_string(),
        implementation: implementation.to_string(),
        enabled: true,
        config: config.as_object().cloned().unwrap_or_default(),
    }
}

#[allow(dead_code)]
pub(crate) fn fleet() -> Vec<MergedRecord> {
    vec![
        MergedRecord::new("WVW000001", 45.0703, 7.6869, 90.0),
        MergedRecord::new("WVW000002", 41.9028, 12.4964, 180.0),
        MergedRecord::new("WVW000003", 40.8518, 14.2681, 270.0),
    ]
}
