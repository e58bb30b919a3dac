/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod sink;
pub use sink::MetricsTransport;
use sink::StatsdMetricsSink;

mod client;
use client::StatsdClient;

mod config;
pub use config::{StatsdClientBuildError, StatsdClientConfig};

mod store;
use store::{StatsdRecord, StatsdStore};

mod sender;
pub use sender::{StatsdRecorder, StatsdSender};
