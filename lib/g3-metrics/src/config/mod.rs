/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::time::Duration;

use crate::names::{DEFAULT_PREFIX, DEFAULT_ROUTE_NAMES};

mod yaml;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrometheusConfig {
    pub subsystem: String,
    /// Empty means the prometheus default buckets.
    pub buckets: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricsConfig {
    /// Comma separated list of backends: flat, label, statsd, prometheus.
    pub target: String,
    /// Prefix template, `default` is an alias of the default template.
    pub prefix: String,
    /// Route name template.
    pub names: String,
    pub statsd_addr: String,
    /// Local IP the statsd socket binds to.
    pub statsd_bind: Option<IpAddr>,
    pub interval: Duration,
    pub prometheus: PrometheusConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            target: String::new(),
            prefix: DEFAULT_PREFIX.to_string(),
            names: DEFAULT_ROUTE_NAMES.to_string(),
            statsd_addr: String::new(),
            statsd_bind: None,
            interval: DEFAULT_INTERVAL,
            prometheus: PrometheusConfig::default(),
        }
    }
}

impl MetricsConfig {
    /// The trimmed non-empty backend names, in config order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.target.split(',').map(str::trim).filter(|s| !s.is_empty())
    }
}
