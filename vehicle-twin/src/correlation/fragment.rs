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

//! Fragment payload shapes, one per inbound channel.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FragmentKind {
    Identity,
    Location,
    Heading,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 3] = [
        FragmentKind::Identity,
        FragmentKind::Location,
        FragmentKind::Heading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentKind::Identity => "identity",
            FragmentKind::Location => "location",
            FragmentKind::Heading => "heading",
        }
    }
}

impl Display for FragmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityFragment {
    #[serde(alias = "vin")]
    pub identifier: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFragment {
    #[serde(alias = "vin")]
    pub identifier: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadingFragment {
    #[serde(alias = "vin")]
    pub identifier: String,
    #[serde(alias = "giro")]
    pub heading: f64,
}

/// A parsed fragment. Every variant carries the vehicle identifier explicitly; fragments
/// are never attributed to a vehicle by arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    Identity(IdentityFragment),
    Location(LocationFragment),
    Heading(HeadingFragment),
}

/// Why a payload could not become a [`Fragment`].
#[derive(Debug, Error)]
pub enum FragmentParseError {
    #[error("payload does not match fragment shape: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fragment has an empty identifier")]
    MissingIdentifier,
}

impl Fragment {
    pub fn parse(kind: FragmentKind, payload: &[u8]) -> Result<Self, FragmentParseError> {
        let fragment = match kind {
            FragmentKind::Identity => Fragment::Identity(serde_json::from_slice(payload)?),
            FragmentKind::Location => Fragment::Location(serde_json::from_slice(payload)?),
            FragmentKind::Heading => Fragment::Heading(serde_json::from_slice(payload)?),
        };

        if fragment.vehicle_id().trim().is_empty() {
            return Err(FragmentParseError::MissingIdentifier);
        }
        Ok(fragment)
    }

    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Identity(_) => FragmentKind::Identity,
            Fragment::Location(_) => FragmentKind::Location,
            Fragment::Heading(_) => FragmentKind::Heading,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        match self {
            Fragment::Identity(f) => &f.identifier,
            Fragment::Location(f) => &f.identifier,
            Fragment::Heading(f) => &f.identifier,
        }
    }
}
