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

//! Plugin framework.
//!
//! A plugin list is read from configuration as [`PluginDescriptor`]s. The [`PluginManager`]
//! resolves each enabled descriptor through the [`PluginRegistry`], builds it with its own name,
//! config map and the shared [`PluginContext`], validates it and starts it. Each started plugin
//! owns its own transport connection and a supervised receive loop.

mod descriptor;
pub(crate) mod listener_plugin;
mod manager;
mod registry;

pub use descriptor::{PluginDescriptor, PluginDescriptorList};
pub use listener_plugin::{ListenerPlugin, PluginContext, PluginSpec};
pub use manager::{PluginInstance, PluginManager};
pub use registry::{PluginConstructor, PluginRegistry};
