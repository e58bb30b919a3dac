/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use log::{info, warn};
use prometheus::Registry;

use g3_statsd_client::StatsdClientConfig;

pub mod names;
use names::RouteNameTemplate;

mod atomic;
pub use atomic::AtomicF64;

mod handle;
pub use handle::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram};

mod provider;
pub use provider::{ArcProvider, DiscardProvider, MultiProvider, Provider};

pub mod backend;
use backend::{
    ArcTextSink, FlatProvider, LabelProvider, PrometheusProvider, StatsdProvider, StdoutTextSink,
};

mod config;
pub use config::{MetricsConfig, PrometheusConfig};

mod error;
pub use error::MetricsError;

/// Build the providers listed in the config.
///
/// Text backends write to stdout, the prometheus backend registers to the
/// default prometheus registry.
pub fn initialize(config: &MetricsConfig) -> Result<ArcProvider, MetricsError> {
    initialize_with(
        config,
        Arc::new(StdoutTextSink),
        prometheus::default_registry().clone(),
    )
}

/// Build the providers listed in the config, with custom outputs.
///
/// Templates are checked before any backend is started. Unknown backend names
/// are skipped. If no backend is left, a [`DiscardProvider`] is returned.
pub fn initialize_with(
    config: &MetricsConfig,
    text_sink: ArcTextSink,
    registry: Registry,
) -> Result<ArcProvider, MetricsError> {
    let prefix = names::parse_prefix(&config.prefix).map_err(MetricsError::InvalidPrefix)?;
    let route_names =
        RouteNameTemplate::compile(&config.names).map_err(MetricsError::InvalidNames)?;
    let route_names = Arc::new(route_names);

    let mut providers: Vec<ArcProvider> = Vec::new();
    for target in config.targets() {
        let provider: ArcProvider = match target {
            "flat" => Arc::new(FlatProvider::new(&prefix, Arc::clone(&text_sink))),
            "label" => Arc::new(LabelProvider::new(&prefix, Arc::clone(&text_sink))),
            "statsd" => {
                let mut statsd = StatsdClientConfig::with_prefix(prefix.clone());
                statsd.set_target(config.statsd_addr.as_str());
                if let Some(ip) = config.statsd_bind {
                    statsd.set_bind_ip(ip);
                }
                statsd.emit_interval = config.interval;
                Arc::new(StatsdProvider::spawn(&statsd, Arc::clone(&route_names))?)
            }
            "prometheus" => Arc::new(PrometheusProvider::new(
                registry.clone(),
                &prefix,
                &config.prometheus.subsystem,
                &config.prometheus.buckets,
            )),
            _ => {
                warn!("skipping unknown metrics provider {target:?}");
                continue;
            }
        };
        info!("registering metrics provider {target:?}");
        providers.push(provider);
    }

    if providers.is_empty() {
        info!("metrics disabled");
        return Ok(Arc::new(DiscardProvider));
    }
    Ok(Arc::new(MultiProvider::new(providers)))
}
