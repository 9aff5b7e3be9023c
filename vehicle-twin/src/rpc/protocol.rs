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

//! Wire shapes of the correlation-id request/response protocol.
//!
//! Requests travel on one shared request channel. Each response is published on
//! `response prefix + correlation id`, so a caller only has to listen on its own address.

use crate::error::TwinError;
use crate::record_store::MergedRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_REQUEST_TOPIC: &str = "rpc/request/read_all_vehicle_data";
pub const DEFAULT_RESPONSE_TOPIC_PREFIX: &str = "rpc/response/";

/// Error text sent back when `params` is neither empty nor a single vehicle filter.
pub const MALFORMED_PARAMS: &str = "malformed params";

pub fn response_channel(response_topic_prefix: &str, correlation_id: &str) -> String {
    format!("{response_topic_prefix}{correlation_id}")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    #[serde(default, alias = "correlation_id")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(correlation_id: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            params,
        }
    }

    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// The correlation id, unless it is missing or blank.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id
            .as_deref()
            .filter(|correlation_id| !correlation_id.trim().is_empty())
    }
}

/// What a read request asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordQuery {
    All,
    Vehicle(String),
}

impl RecordQuery {
    /// Interprets request `params`. Absent, `null` and `{}` read everything; an object holding
    /// only a non-blank `identifier` (or `vehicleId`, `vin`) reads one vehicle. Anything else
    /// is malformed and yields `None`.
    pub fn from_params(params: Option<&Value>) -> Option<Self> {
        let object = match params {
            None | Some(Value::Null) => return Some(RecordQuery::All),
            Some(Value::Object(object)) => object,
            Some(_) => return None,
        };

        let mut entries = object.iter();
        match (entries.next(), entries.next()) {
            (None, _) => Some(RecordQuery::All),
            (Some((key, Value::String(identifier))), None)
                if matches!(key.as_str(), "identifier" | "vehicleId" | "vin")
                    && !identifier.trim().is_empty() =>
            {
                Some(RecordQuery::Vehicle(identifier.clone()))
            }
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            RecordQuery::All => None,
            RecordQuery::Vehicle(identifier) => Some(identifier),
        }
    }
}

/// Exactly one of `result` and `error` is set by a conforming responder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    #[serde(alias = "correlation_id")]
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<MergedRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn success(correlation_id: impl Into<String>, records: Vec<MergedRecord>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            result: Some(records),
            error: None,
        }
    }

    pub fn failure(correlation_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn into_reply(self) -> Result<RpcReply, TwinError> {
        let outcome = match (self.error, self.result) {
            (Some(error), _) => RpcOutcome::Failed(error),
            (None, Some(records)) => RpcOutcome::Records(records),
            (None, None) => {
                return Err(TwinError::Protocol(format!(
                    "response `{}` carries neither result nor error",
                    self.correlation_id
                )))
            }
        };
        Ok(RpcReply {
            correlation_id: self.correlation_id,
            outcome,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RpcOutcome {
    Records(Vec<MergedRecord>),
    /// The responder answered with an error message.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RpcReply {
    pub correlation_id: String,
    pub outcome: RpcOutcome,
}

#[cfg(test)]
mod tests {
    use super::{response_channel, RecordQuery, RpcOutcome, RpcRequest, RpcResponse};
    use crate::record_store::MergedRecord;
    use serde_json::{json, Value};

    #[test]
    fn request_accepts_both_correlation_id_spellings() {
        let camel = RpcRequest::from_slice(br#"{"correlationId": "abc", "params": {}}"#).unwrap();
        let snake = RpcRequest::from_slice(br#"{"correlation_id": "abc"}"#).unwrap();

        assert_eq!(camel.correlation_id(), Some("abc"));
        assert_eq!(snake.correlation_id(), Some("abc"));
        assert_eq!(snake.params, None);
    }

    #[test]
    fn blank_correlation_id_counts_as_missing() {
        let blank = RpcRequest::from_slice(br#"{"correlationId": "  "}"#).unwrap();
        let missing = RpcRequest::from_slice(br#"{"params": {}}"#).unwrap();

        assert_eq!(blank.correlation_id(), None);
        assert_eq!(missing.correlation_id(), None);
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = RpcRequest::new("abc", Some(json!({"identifier": "V1"})));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"correlationId": "abc", "params": {"identifier": "V1"}})
        );
    }

    #[test]
    fn empty_params_read_everything() {
        assert_eq!(RecordQuery::from_params(None), Some(RecordQuery::All));
        assert_eq!(RecordQuery::from_params(Some(&Value::Null)), Some(RecordQuery::All));
        assert_eq!(RecordQuery::from_params(Some(&json!({}))), Some(RecordQuery::All));
    }

    #[test]
    fn single_identifier_filters_under_any_alias() {
        for key in ["identifier", "vehicleId", "vin"] {
            let params = json!({ key: "V7" });
            assert_eq!(
                RecordQuery::from_params(Some(&params)),
                Some(RecordQuery::Vehicle("V7".to_string()))
            );
        }
    }

    #[test]
    fn other_params_are_malformed() {
        for params in [
            json!([1, 2]),
            json!("V1"),
            json!({"identifier": 7}),
            json!({"identifier": ""}),
            json!({"limit": 10}),
            json!({"identifier": "V1", "limit": 10}),
        ] {
            assert_eq!(RecordQuery::from_params(Some(&params)), None, "{params}");
        }
    }

    #[test]
    fn success_response_has_exact_shape() {
        let response = RpcResponse::success("abc", vec![MergedRecord::new("V1", 1.0, 2.0, 3.0)]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "correlationId": "abc",
                "result": [{"identifier": "V1", "latitude": 1.0, "longitude": 2.0, "heading": 3.0}]
            })
        );
    }

    #[test]
    fn failure_response_becomes_failed_outcome() {
        let reply = RpcResponse::from_slice(br#"{"correlation_id": "abc", "error": "boom"}"#)
            .unwrap()
            .into_reply()
            .unwrap();

        assert_eq!(reply.correlation_id, "abc");
        assert_eq!(reply.outcome, RpcOutcome::Failed("boom".to_string()));
    }

    #[test]
    fn response_without_result_or_error_is_a_protocol_error() {
        let response = RpcResponse::from_slice(br#"{"correlationId": "abc"}"#).unwrap();

        assert!(response.into_reply().is_err());
    }

    #[test]
    fn response_channel_appends_the_id() {
        assert_eq!(response_channel("rpc/response/", "abc"), "rpc/response/abc");
    }
}
