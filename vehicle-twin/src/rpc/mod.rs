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

//! Correlation-id request/response protocol shared by the RPC responder plugin and its callers.

mod correlator;
mod protocol;

pub use correlator::RpcCorrelator;
pub use protocol::{
    response_channel, RecordQuery, RpcOutcome, RpcReply, RpcRequest, RpcResponse,
    DEFAULT_REQUEST_TOPIC, DEFAULT_RESPONSE_TOPIC_PREFIX, MALFORMED_PARAMS,
};
