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

mod integration_test_logging;
pub use integration_test_logging::init_logging;

mod integration_test_listeners;
pub use integration_test_listeners::RecordingListener;

mod flaky_record_store;
pub use flaky_record_store::FlakyRecordStore;

mod failing_connector;
pub use failing_connector::FailingConnector;

mod wait;
pub use wait::eventually;
