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

//! Built-in listener plugins.

mod record_sink;
mod rpc_responder;
#[cfg(test)]
mod test_support;
mod trigger_republisher;

pub use record_sink::RecordSink;
pub use rpc_responder::RpcResponder;
pub use trigger_republisher::TriggerRepublisher;

pub const DEFAULT_DATA_TOPIC: &str = "vehicles/data";
pub const DEFAULT_TRIGGER_TOPIC: &str = "vehicles/request";
