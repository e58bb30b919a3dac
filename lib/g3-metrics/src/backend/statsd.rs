/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};

use log::info;

use g3_statsd_client::{StatsdClientBuildError, StatsdClientConfig, StatsdRecorder, StatsdSender};

use crate::names::{DOT_SEPARATOR, RouteNameTemplate, flatten, is_route_metric};
use crate::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram, Provider};

/// Histograms are observed in seconds and sent as milliseconds.
const TIMING_SCALE: f64 = 1000.0;

/// The statsd backend.
///
/// Values are queued to a background sender which aggregates and flushes them
/// on every emit interval. Label values are folded into the metric name when
/// bound, route metrics get their name from the route name template.
pub struct StatsdProvider {
    recorder: StatsdRecorder,
    sender: Mutex<Option<StatsdSender>>,
    route_names: Arc<RouteNameTemplate>,
}

impl StatsdProvider {
    /// Resolve the statsd address and start the sender.
    pub fn spawn(
        config: &StatsdClientConfig,
        route_names: Arc<RouteNameTemplate>,
    ) -> Result<Self, StatsdClientBuildError> {
        let (sender, recorder) = StatsdSender::spawn(config)?;
        info!("statsd sender started for {}", config.target());
        Ok(StatsdProvider::with_sender(sender, recorder, route_names))
    }

    pub fn with_sender(
        sender: StatsdSender,
        recorder: StatsdRecorder,
        route_names: Arc<RouteNameTemplate>,
    ) -> Self {
        StatsdProvider {
            recorder,
            sender: Mutex::new(Some(sender)),
            route_names,
        }
    }

    fn metric(&self, name: &str, label_keys: &[&str]) -> StatsdMetric {
        let base: Arc<str> = Arc::from(name);
        StatsdMetric {
            name: Arc::clone(&base),
            base,
            keys: label_keys.iter().map(|k| k.to_string()).collect(),
            route: is_route_metric(name),
            recorder: self.recorder.clone(),
            route_names: Arc::clone(&self.route_names),
        }
    }
}

impl Provider for StatsdProvider {
    fn new_counter(&self, name: &str, label_keys: &[&str]) -> ArcCounter {
        Arc::new(StatsdCounter(self.metric(name, label_keys)))
    }

    fn new_gauge(&self, name: &str, label_keys: &[&str]) -> ArcGauge {
        Arc::new(StatsdGauge(self.metric(name, label_keys)))
    }

    fn new_histogram(&self, name: &str, label_keys: &[&str]) -> ArcHistogram {
        Arc::new(StatsdHistogram(self.metric(name, label_keys)))
    }

    /// Stop the sender and wait for it to exit.
    ///
    /// Values not yet flushed are lost.
    fn unregister(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(e) => e.into_inner().take(),
        };
        if let Some(mut sender) = sender {
            sender.shutdown();
            info!("statsd sender stopped");
        }
    }
}

struct StatsdMetric {
    base: Arc<str>,
    name: Arc<str>,
    keys: Arc<[String]>,
    route: bool,
    recorder: StatsdRecorder,
    route_names: Arc<RouteNameTemplate>,
}

impl StatsdMetric {
    /// # Panics
    ///
    /// Panics if the route name template fails to render with the given
    /// values. The template has been checked at startup, so this indicates
    /// a bug in the label wiring of the caller.
    fn bind(&self, values: &[&str]) -> StatsdMetric {
        let name = if self.keys.is_empty() {
            Arc::clone(&self.name)
        } else if self.route {
            match self
                .route_names
                .route_name_with(&self.base, &self.keys[..], values)
            {
                Ok(name) => Arc::from(name),
                Err(e) => panic!("failed to render route metric name for {}: {e}", self.base),
            }
        } else {
            Arc::from(flatten(&self.base, values, DOT_SEPARATOR))
        };
        StatsdMetric {
            base: Arc::clone(&self.base),
            name,
            keys: Arc::clone(&self.keys),
            route: self.route,
            recorder: self.recorder.clone(),
            route_names: Arc::clone(&self.route_names),
        }
    }
}

struct StatsdCounter(StatsdMetric);

impl Counter for StatsdCounter {
    fn add(&self, delta: f64) {
        self.0.recorder.count(&self.0.name, delta as i64);
    }

    fn with(&self, values: &[&str]) -> ArcCounter {
        Arc::new(StatsdCounter(self.0.bind(values)))
    }
}

struct StatsdGauge(StatsdMetric);

impl Gauge for StatsdGauge {
    fn set(&self, value: f64) {
        self.0.recorder.gauge_set(&self.0.name, value);
    }

    fn add(&self, delta: f64) {
        self.0.recorder.gauge_add(&self.0.name, delta);
    }

    fn with(&self, values: &[&str]) -> ArcGauge {
        Arc::new(StatsdGauge(self.0.bind(values)))
    }
}

struct StatsdHistogram(StatsdMetric);

impl Histogram for StatsdHistogram {
    fn observe(&self, value: f64) {
        self.0.recorder.timing(&self.0.name, value * TIMING_SCALE);
    }

    fn with(&self, values: &[&str]) -> ArcHistogram {
        Arc::new(StatsdHistogram(self.0.bind(values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    use g3_statsd_client::MetricsTransport;

    use crate::names::DEFAULT_ROUTE_NAMES;

    struct SharedTransport(Arc<Mutex<Vec<String>>>);

    impl MetricsTransport for SharedTransport {
        fn send_msg(&mut self, msg: &[u8]) -> io::Result<usize> {
            let mut lines = self.0.lock().unwrap();
            for line in String::from_utf8_lossy(msg).lines() {
                lines.push(line.to_string());
            }
            Ok(msg.len())
        }
    }

    fn provider(prefix: &str) -> (StatsdProvider, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut config = StatsdClientConfig::with_prefix(prefix.to_string());
        config.emit_interval = Duration::from_millis(20);
        let (sender, recorder) =
            StatsdSender::spawn_with_transport(&config, Box::new(SharedTransport(lines.clone())))
                .unwrap();
        let route_names = Arc::new(RouteNameTemplate::compile(DEFAULT_ROUTE_NAMES).unwrap());
        (
            StatsdProvider::with_sender(sender, recorder, route_names),
            lines,
        )
    }

    fn flush_and_stop(p: &StatsdProvider, lines: &Mutex<Vec<String>>) -> Vec<String> {
        std::thread::sleep(Duration::from_millis(200));
        p.unregister();
        lines.lock().unwrap().clone()
    }

    fn sum_counter(lines: &[String], name: &str) -> i64 {
        lines
            .iter()
            .filter_map(|l| {
                l.strip_prefix(name)
                    .and_then(|s| s.strip_prefix(':'))
                    .and_then(|s| s.strip_suffix("|c"))
            })
            .map(|v| v.parse::<i64>().unwrap())
            .sum()
    }

    #[test]
    fn plain_counter() {
        let (p, lines) = provider("p");
        let c = p.new_counter("connections", &[]);
        c.add(2.0);
        c.with(&["ignored"]).add(3.7);
        let lines = flush_and_stop(&p, &lines);
        assert_eq!(sum_counter(&lines, "p.connections"), 5);
    }

    #[test]
    fn flatten_labels() {
        let (p, lines) = provider("");
        let c = p.new_counter("listener", &["addr", "proto"]);
        c.with(&["l1", "tcp"]).add(1.0);
        let lines = flush_and_stop(&p, &lines);
        assert_eq!(sum_counter(&lines, "listener.l1.tcp"), 1);
    }

    #[test]
    fn route_counter() {
        let (p, lines) = provider("p");
        let c = p.new_counter("route.rx", &["service", "host", "path", "target"]);
        c.with(&["svc", "h.example.com", "/p", "http://10.0.0.1:8080/"])
            .add(100.0);
        let lines = flush_and_stop(&p, &lines);
        assert_eq!(
            sum_counter(&lines, "p.svc.h_example_com./p.10_0_0_1_8080.rx"),
            100
        );
    }

    #[test]
    fn router_is_not_route() {
        let (p, lines) = provider("");
        let c = p.new_counter("router.rx", &["service"]);
        c.with(&["svc"]).add(1.0);
        let lines = flush_and_stop(&p, &lines);
        assert_eq!(sum_counter(&lines, "router.rx.svc"), 1);
    }

    #[test]
    fn gauge_and_timing() {
        let (p, lines) = provider("");
        let g = p.new_gauge("pool", &[]);
        g.set(4.0);
        let h = p.new_histogram("latency", &[]);
        h.observe(0.25);
        let lines = flush_and_stop(&p, &lines);
        assert!(lines.iter().any(|l| l == "pool:4|g"));
        assert!(lines.iter().any(|l| l == "latency:250|ms"));
    }

    #[test]
    fn unregister_twice() {
        let (p, lines) = provider("");
        p.unregister();
        p.unregister();
        p.new_counter("conn", &[]).add(1.0);
        std::thread::sleep(Duration::from_millis(60));
        assert!(lines.lock().unwrap().is_empty());
    }
}
