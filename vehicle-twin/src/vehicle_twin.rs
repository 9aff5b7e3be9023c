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

use crate::correlation::{
    CorrelationBuffer, CorrelationSettings, ExpirySweeper, FragmentChannels, FragmentKind,
    FragmentRouter,
};
use crate::error::TwinError;
use crate::record_store::VehicleRecordStore;
use crate::runtime::task_supervisor::SupervisedTask;
use crate::transport::{MessageListener, PubSubTransport, TransportConnector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const COMPONENT: &str = "vehicle_twin";

struct RouterSubscription {
    transport: Arc<dyn PubSubTransport>,
    channels: Vec<String>,
}

/// Vehicle-level twin: correlates the three fragment channels into merged records.
///
/// Owns the correlation buffer, attaches the fragment router to its own transport connection
/// and runs the expiry sweeper. Plugins are managed separately by a
/// [`PluginManager`](crate::PluginManager).
pub struct VehicleTwin {
    name: String,
    buffer: Arc<CorrelationBuffer>,
    router: Arc<FragmentRouter>,
    subscription: Option<RouterSubscription>,
    sweeper: Option<SupervisedTask>,
}

impl VehicleTwin {
    pub fn new(
        name: &str,
        channels: FragmentChannels,
        settings: CorrelationSettings,
        store: Arc<dyn VehicleRecordStore>,
    ) -> Self {
        let buffer = Arc::new(CorrelationBuffer::new(store, settings));
        let router = Arc::new(FragmentRouter::new(channels, buffer.clone()));
        Self {
            name: name.to_string(),
            buffer,
            router,
            subscription: None,
            sweeper: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> Arc<CorrelationBuffer> {
        self.buffer.clone()
    }

    pub fn channels(&self) -> &FragmentChannels {
        self.router.channels()
    }

    /// Connects as `<name>-router` and subscribes the router to all three fragment channels.
    ///
    /// A partial subscription is rolled back before the error is returned.
    pub async fn start(&mut self, connector: &dyn TransportConnector) -> Result<(), TwinError> {
        if self.subscription.is_some() {
            warn!(
                component = COMPONENT,
                twin = self.name.as_str(),
                "twin already started"
            );
            return Ok(());
        }

        let transport = connector.connect(&format!("{}-router", self.name)).await?;
        let listener: Arc<dyn MessageListener> = self.router.clone();
        let mut subscribed = Vec::with_capacity(FragmentKind::ALL.len());

        for kind in FragmentKind::ALL {
            let channel = self.channels().channel_for(kind).to_string();
            if let Err(err) = transport.subscribe(&channel, listener.clone()).await {
                Self::release(&self.name, transport.as_ref(), &listener, &subscribed).await;
                return Err(err);
            }
            subscribed.push(channel);
        }

        info!(
            component = COMPONENT,
            twin = self.name.as_str(),
            identity = self.channels().identity.as_str(),
            location = self.channels().location.as_str(),
            heading = self.channels().heading.as_str(),
            "vehicle twin listening"
        );
        self.subscription = Some(RouterSubscription {
            transport,
            channels: subscribed,
        });
        Ok(())
    }

    /// Starts the periodic expiry pass, replacing any sweeper already running.
    pub fn spawn_expiry_sweeper(&mut self, interval: Duration) {
        if let Some(previous) = self.sweeper.take() {
            previous.abort();
        }
        self.sweeper = Some(ExpirySweeper::spawn(
            &format!("{}-expiry-sweeper", self.name),
            self.buffer.clone(),
            interval,
        ));
    }

    pub fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    /// Detaches the router and stops the sweeper. Pending entries stay in the buffer.
    pub async fn stop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            let listener: Arc<dyn MessageListener> = self.router.clone();
            Self::release(
                &self.name,
                subscription.transport.as_ref(),
                &listener,
                &subscription.channels,
            )
            .await;
            info!(component = COMPONENT, twin = self.name.as_str(), "vehicle twin stopped");
        }
    }

    async fn release(
        name: &str,
        transport: &dyn PubSubTransport,
        listener: &Arc<dyn MessageListener>,
        channels: &[String],
    ) {
        for channel in channels {
            if let Err(err) = transport.unsubscribe(channel, listener.clone()).await {
                warn!(
                    component = COMPONENT,
                    twin = name,
                    channel = channel.as_str(),
                    err = %err,
                    "unable to unsubscribe router"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VehicleTwin;
    use crate::correlation::{CorrelationSettings, FragmentChannels};
    use crate::error::{StoreError, TwinError};
    use crate::record_store::{MergedRecord, VehicleRecordStore};
    use crate::transport::{MessageListener, PubSubTransport, TransportConnector};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct NullStore;

    #[async_trait]
    impl VehicleRecordStore for NullStore {
        async fn write(&self, _record: &MergedRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn read_all(
            &self,
            _identifier: Option<&str>,
        ) -> Result<Vec<MergedRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    /// Rejects subscriptions to one channel and records the rest.
    struct PickyTransport {
        refuse: String,
        live: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PubSubTransport for PickyTransport {
        async fn publish(&self, _channel: &str, _payload: Vec<u8>) -> Result<(), TwinError> {
            Ok(())
        }

        async fn subscribe(
            &self,
            channel: &str,
            _listener: Arc<dyn MessageListener>,
        ) -> Result<(), TwinError> {
            if channel == self.refuse {
                return Err(TwinError::Transport(format!("{channel} refused")));
            }
            self.live.lock().unwrap().push(channel.to_string());
            Ok(())
        }

        async fn unsubscribe(
            &self,
            channel: &str,
            _listener: Arc<dyn MessageListener>,
        ) -> Result<(), TwinError> {
            self.live.lock().unwrap().retain(|live| live != channel);
            Ok(())
        }
    }

    struct PickyConnector {
        transport: Arc<PickyTransport>,
        client_names: Mutex<Vec<String>>,
    }

    impl PickyConnector {
        fn refusing(channel: &str) -> Self {
            Self {
                transport: Arc::new(PickyTransport {
                    refuse: channel.to_string(),
                    live: Mutex::new(Vec::new()),
                }),
                client_names: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TransportConnector for PickyConnector {
        async fn connect(&self, client_name: &str) -> Result<Arc<dyn PubSubTransport>, TwinError> {
            self.client_names.lock().unwrap().push(client_name.to_string());
            Ok(self.transport.clone())
        }
    }

    fn twin() -> VehicleTwin {
        VehicleTwin::new(
            "vehicle",
            FragmentChannels::default(),
            CorrelationSettings::default(),
            Arc::new(NullStore),
        )
    }

    #[tokio::test]
    async fn start_subscribes_all_three_channels_and_stop_releases_them() {
        let connector = PickyConnector::refusing("none");
        let mut twin = twin();

        twin.start(&connector).await.unwrap();

        assert!(twin.is_started());
        assert_eq!(
            *connector.client_names.lock().unwrap(),
            vec!["vehicle-router".to_string()]
        );
        assert_eq!(
            *connector.transport.live.lock().unwrap(),
            vec![
                "vehicles/vin".to_string(),
                "vehicles/location".to_string(),
                "vehicles/giro".to_string()
            ]
        );

        twin.stop().await;
        assert!(!twin.is_started());
        assert!(connector.transport.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_subscription_rolls_back_and_reports() {
        let connector = PickyConnector::refusing("vehicles/giro");
        let mut twin = twin();

        let err = twin.start(&connector).await.unwrap_err();

        assert!(matches!(err, TwinError::Transport(_)));
        assert!(!twin.is_started());
        assert!(connector.transport.live.lock().unwrap().is_empty());
    }
}
