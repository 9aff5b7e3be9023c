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

mod config;

use crate::config::{Config, PluginsConfig, RpcProbeConfig};
use clap::Parser;
use in_memory_broker::InMemoryBroker;
use in_memory_record_store::InMemoryRecordStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vehicle_twin::plugin::PluginContext;
use vehicle_twin::rpc::{RpcCorrelator, RpcOutcome};
use vehicle_twin::{PluginManager, TransportConnector, TwinError, VehicleRecordStore, VehicleTwin};

#[derive(Parser)]
#[command()]
struct TwinArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), TwinError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    info!("Started vehicle-twin-configurable");

    let args = TwinArgs::parse();
    let config = Config::from_file(&args.config)?;
    let prefix = config.transport.client_name_prefix.clone();

    let broker = InMemoryBroker::new();
    let store: Arc<dyn VehicleRecordStore> = Arc::new(InMemoryRecordStore::new());

    let mut twin = VehicleTwin::new(
        &prefix,
        config.channels.clone(),
        config.correlation.settings(),
        store.clone(),
    );
    if let Err(err) = twin.start(&broker).await {
        error!(err = %err, "vehicle twin could not attach to the broker");
        return Err(err);
    }
    twin.spawn_expiry_sweeper(config.correlation.sweep_interval());

    let context = PluginContext::new(Arc::new(broker.clone()), Some(store));
    let mut plugins = PluginManager::default();
    let started = match &config.plugins {
        PluginsConfig::Inline(descriptors) => plugins.load(descriptors, &context).await.len(),
        PluginsConfig::File { plugins_file } => {
            plugins.load_from_file(plugins_file, &context).await?.len()
        }
    };
    info!(started, "plugins loaded");

    let probe = match config.rpc_probe {
        Some(probe_config) => Some(spawn_rpc_probe(&broker, &prefix, probe_config).await?),
        None => None,
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(err = %err, "unable to listen for shutdown signal; shutting down");
    }

    info!("shutting down");
    if let Some(probe) = probe {
        probe.abort();
    }
    plugins.stop_all().await;
    twin.stop().await;

    Ok(())
}

/// Periodically queries the RPC responder and logs what came back.
async fn spawn_rpc_probe(
    connector: &dyn TransportConnector,
    prefix: &str,
    probe_config: RpcProbeConfig,
) -> Result<tokio::task::JoinHandle<()>, TwinError> {
    let transport = connector.connect(&format!("{prefix}-rpc-probe")).await?;
    let correlator = RpcCorrelator::new(
        transport,
        probe_config.request_topic,
        probe_config.response_topic_prefix,
    );
    let interval = Duration::from_secs(probe_config.interval_secs.max(1));
    let timeout = Duration::from_millis(probe_config.timeout_ms);

    Ok(tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match correlator.call(None, timeout).await {
                Ok(reply) => match reply.outcome {
                    RpcOutcome::Records(records) => info!(
                        correlation_id = reply.correlation_id.as_str(),
                        records = records.len(),
                        "rpc probe answered"
                    ),
                    RpcOutcome::Failed(reason) => warn!(
                        correlation_id = reply.correlation_id.as_str(),
                        reason = reason.as_str(),
                        "rpc probe answered with an error"
                    ),
                },
                Err(err) => warn!(err = %err, "rpc probe failed"),
            }
        }
    }))
}
