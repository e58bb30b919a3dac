/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use ahash::AHashMap;
use log::{debug, warn};
use prometheus::core::Collector;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use crate::provider::{discard_counter, discard_gauge, discard_histogram};
use crate::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram, Provider};

fn sanitize(s: &str, allow_colon: bool) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':') {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

fn metric_name(s: &str) -> String {
    sanitize(s, true)
}

fn label_name(s: &str) -> String {
    sanitize(s, false)
}

#[derive(Clone)]
enum RegisteredVec {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

struct Registered {
    vec: RegisteredVec,
    keys: Vec<String>,
}

/// A label vector of the prometheus client.
trait LabelVec: Collector + Clone + 'static {
    type Metric: Clone + Send + Sync + 'static;

    fn series(&self, values: &[&str]) -> prometheus::Result<Self::Metric>;
    fn into_registered(self) -> RegisteredVec;
    fn from_registered(r: &RegisteredVec) -> Option<&Self>;
}

impl LabelVec for CounterVec {
    type Metric = prometheus::Counter;

    fn series(&self, values: &[&str]) -> prometheus::Result<Self::Metric> {
        self.get_metric_with_label_values(values)
    }

    fn into_registered(self) -> RegisteredVec {
        RegisteredVec::Counter(self)
    }

    fn from_registered(r: &RegisteredVec) -> Option<&Self> {
        match r {
            RegisteredVec::Counter(v) => Some(v),
            _ => None,
        }
    }
}

impl LabelVec for GaugeVec {
    type Metric = prometheus::Gauge;

    fn series(&self, values: &[&str]) -> prometheus::Result<Self::Metric> {
        self.get_metric_with_label_values(values)
    }

    fn into_registered(self) -> RegisteredVec {
        RegisteredVec::Gauge(self)
    }

    fn from_registered(r: &RegisteredVec) -> Option<&Self> {
        match r {
            RegisteredVec::Gauge(v) => Some(v),
            _ => None,
        }
    }
}

impl LabelVec for HistogramVec {
    type Metric = prometheus::Histogram;

    fn series(&self, values: &[&str]) -> prometheus::Result<Self::Metric> {
        self.get_metric_with_label_values(values)
    }

    fn into_registered(self) -> RegisteredVec {
        RegisteredVec::Histogram(self)
    }

    fn from_registered(r: &RegisteredVec) -> Option<&Self> {
        match r {
            RegisteredVec::Histogram(v) => Some(v),
            _ => None,
        }
    }
}

/// The prometheus backend.
///
/// One label vector is registered per metric name, with the prefix as
/// namespace. Binding values selects a series of that vector. The registry can
/// be scraped through [`PrometheusProvider::gather_text`] or directly.
pub struct PrometheusProvider {
    namespace: String,
    subsystem: String,
    buckets: Vec<f64>,
    registry: Registry,
    vecs: Mutex<AHashMap<String, Registered>>,
}

impl PrometheusProvider {
    /// Empty `buckets` means the prometheus default buckets.
    pub fn new(registry: Registry, namespace: &str, subsystem: &str, buckets: &[f64]) -> Self {
        let buckets = if buckets.is_empty() {
            prometheus::DEFAULT_BUCKETS.to_vec()
        } else {
            buckets.to_vec()
        };
        PrometheusProvider {
            namespace: metric_name(namespace),
            subsystem: metric_name(subsystem),
            buckets,
            registry,
            vecs: Mutex::new(AHashMap::default()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all registered metrics in the text exposition format.
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        match encoder.encode_to_string(&self.registry.gather()) {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to encode prometheus metrics: {e}");
                String::new()
            }
        }
    }

    fn opts(&self, name: &str) -> Opts {
        Opts::new(name, name)
            .namespace(self.namespace.clone())
            .subsystem(self.subsystem.clone())
    }

    fn lock_vecs(&self) -> MutexGuard<'_, AHashMap<String, Registered>> {
        match self.vecs.lock() {
            Ok(guard) => guard,
            Err(e) => e.into_inner(),
        }
    }

    /// Get the vector registered for `name`, or build and register a new one.
    fn label_vec<V, F>(&self, name: &str, label_keys: &[&str], build: F) -> Option<V>
    where
        V: LabelVec,
        F: FnOnce(&str, &[&str]) -> prometheus::Result<V>,
    {
        let name = metric_name(name);
        let keys: Vec<String> = label_keys.iter().map(|k| label_name(k)).collect();

        let mut vecs = self.lock_vecs();
        if let Some(r) = vecs.get(&name) {
            return match V::from_registered(&r.vec) {
                Some(v) if r.keys == keys => Some(v.clone()),
                _ => {
                    warn!("prometheus metric {name} already registered with other type or labels");
                    None
                }
            };
        }

        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let vec = match build(&name, &key_refs) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to create prometheus metric {name}: {e}");
                return None;
            }
        };
        if let Err(e) = self.registry.register(Box::new(vec.clone())) {
            warn!("failed to register prometheus metric {name}: {e}");
            return None;
        }
        vecs.insert(
            name,
            Registered {
                vec: vec.clone().into_registered(),
                keys,
            },
        );
        Some(vec)
    }
}

impl Provider for PrometheusProvider {
    fn new_counter(&self, name: &str, label_keys: &[&str]) -> ArcCounter {
        let vec = self.label_vec(name, label_keys, |name, keys| {
            CounterVec::new(self.opts(name), keys)
        });
        match vec {
            Some(vec) => Arc::new(PromCounter(Series::new(vec, label_keys.len()))),
            None => discard_counter(),
        }
    }

    fn new_gauge(&self, name: &str, label_keys: &[&str]) -> ArcGauge {
        let vec = self.label_vec(name, label_keys, |name, keys| {
            GaugeVec::new(self.opts(name), keys)
        });
        match vec {
            Some(vec) => Arc::new(PromGauge(Series::new(vec, label_keys.len()))),
            None => discard_gauge(),
        }
    }

    fn new_histogram(&self, name: &str, label_keys: &[&str]) -> ArcHistogram {
        let vec = self.label_vec(name, label_keys, |name, keys| {
            let opts = HistogramOpts::from(self.opts(name)).buckets(self.buckets.clone());
            HistogramVec::new(opts, keys)
        });
        match vec {
            Some(vec) => Arc::new(PromHistogram(Series::new(vec, label_keys.len()))),
            None => discard_histogram(),
        }
    }

    /// The registry lives as long as the provider, there is nothing to release.
    fn unregister(&self) {}
}

/// One series of a label vector.
///
/// The series is looked up on first use, unbound handles use empty values.
struct Series<V: LabelVec> {
    vec: V,
    values: Vec<String>,
    metric: OnceLock<Option<V::Metric>>,
}

impl<V: LabelVec> Series<V> {
    fn new(vec: V, keys: usize) -> Self {
        Series {
            vec,
            values: vec![String::new(); keys],
            metric: OnceLock::new(),
        }
    }

    fn bind(&self, values: &[&str]) -> Self {
        let keys = self.values.len();
        let mut v: Vec<String> = values.iter().take(keys).map(|s| s.to_string()).collect();
        v.resize(keys, String::new());
        Series {
            vec: self.vec.clone(),
            values: v,
            metric: OnceLock::new(),
        }
    }

    fn metric(&self) -> Option<&V::Metric> {
        self.metric
            .get_or_init(|| {
                let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
                match self.vec.series(&values) {
                    Ok(m) => Some(m),
                    Err(e) => {
                        warn!("failed to get prometheus series: {e}");
                        None
                    }
                }
            })
            .as_ref()
    }
}

struct PromCounter(Series<CounterVec>);

impl Counter for PromCounter {
    fn add(&self, delta: f64) {
        if delta.is_nan() || delta < 0.0 {
            debug!("invalid delta {delta} ignored for prometheus counter");
            return;
        }
        if let Some(c) = self.0.metric() {
            c.inc_by(delta);
        }
    }

    fn with(&self, values: &[&str]) -> ArcCounter {
        Arc::new(PromCounter(self.0.bind(values)))
    }
}

struct PromGauge(Series<GaugeVec>);

impl Gauge for PromGauge {
    fn set(&self, value: f64) {
        if let Some(g) = self.0.metric() {
            g.set(value);
        }
    }

    fn add(&self, delta: f64) {
        if let Some(g) = self.0.metric() {
            g.add(delta);
        }
    }

    fn with(&self, values: &[&str]) -> ArcGauge {
        Arc::new(PromGauge(self.0.bind(values)))
    }
}

struct PromHistogram(Series<HistogramVec>);

impl Histogram for PromHistogram {
    fn observe(&self, value: f64) {
        if let Some(h) = self.0.metric() {
            h.observe(value);
        }
    }

    fn with(&self, values: &[&str]) -> ArcHistogram {
        Arc::new(PromHistogram(self.0.bind(values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_sanitize() {
        assert_eq!(metric_name("host_a.g3proxy"), "host_a_g3proxy");
        assert_eq!(metric_name("route.rx"), "route_rx");
        assert_eq!(metric_name("a:b-c"), "a:b_c");
        assert_eq!(metric_name("1st"), "_1st");
        assert_eq!(label_name("a:b"), "a_b");
    }

    #[test]
    fn counter_series() {
        let p = PrometheusProvider::new(Registry::new(), "pre.fix", "", &[]);
        let c = p.new_counter("route.rx", &["service", "host"]);
        c.with(&["svc", "h"]).add(3.0);
        c.with(&["svc", "h"]).add(2.0);
        c.with(&["other"]).add(1.0);
        c.with(&["svc", "h"]).add(-1.0);
        c.with(&["svc", "h"]).add(f64::NAN);

        let text = p.gather_text();
        assert!(text.contains("# TYPE pre_fix_route_rx counter"));
        assert!(text.contains(r#"pre_fix_route_rx{host="h",service="svc"} 5"#));
        assert!(text.contains(r#"pre_fix_route_rx{host="",service="other"} 1"#));
    }

    #[test]
    fn unbound_series() {
        let p = PrometheusProvider::new(Registry::new(), "", "proxy", &[]);
        let c = p.new_counter("connections", &[]);
        c.add(2.0);
        let c = p.new_counter("no-route", &["listener"]);
        c.add(1.0);

        let text = p.gather_text();
        assert!(text.contains("proxy_connections 2"));
        assert!(text.contains(r#"proxy_no_route{listener=""} 1"#));
    }

    #[test]
    fn reuse_registered() {
        let p = PrometheusProvider::new(Registry::new(), "", "", &[]);
        p.new_counter("conn", &[]).add(1.0);
        p.new_counter("conn", &[]).add(1.0);
        assert!(p.gather_text().contains("conn 2"));

        // another type under the same name is not registered
        let g = p.new_gauge("conn", &[]);
        g.set(10.0);
        assert!(p.gather_text().contains("conn 2"));
    }

    #[test]
    fn gauge_and_histogram() {
        let p = PrometheusProvider::new(Registry::new(), "", "", &[0.1, 1.0]);
        let g = p.new_gauge("active", &["pool"]).with(&["a"]);
        g.set(3.0);
        g.add(-1.0);
        let h = p.new_histogram("latency", &[]);
        h.observe(0.05);
        h.observe(0.5);

        let text = p.gather_text();
        assert!(text.contains(r#"active{pool="a"} 2"#));
        assert!(text.contains(r#"latency_bucket{le="0.1"} 1"#));
        assert!(text.contains(r#"latency_bucket{le="1"} 2"#));
        assert!(text.contains("latency_count 2"));
        assert_eq!(p.registry().gather().len(), 2);
    }
}
