/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use super::ArcTextSink;
use crate::atomic::AtomicF64;
use crate::names::{serialize_labels, with_prefix};
use crate::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram, Provider};

const TAG_PREFIX: &str = "|#";
const TAG_FIELD_SEP: &str = ":";
const TAG_RECORD_SEP: &str = ",";

/// Text lines with a dogstatsd style tag suffix: `name:1|c|#k1:v1,k2:v2`.
pub struct LabelProvider {
    prefix: String,
    sink: ArcTextSink,
}

impl LabelProvider {
    pub fn new(prefix: &str, sink: ArcTextSink) -> Self {
        LabelProvider {
            prefix: prefix.to_string(),
            sink,
        }
    }

    fn labeled(&self, name: &str, label_keys: &[&str]) -> Labeled {
        Labeled {
            name: Arc::from(with_prefix(&self.prefix, name)),
            keys: label_keys.iter().map(|k| k.to_string()).collect(),
            values: Vec::new(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl Provider for LabelProvider {
    fn new_counter(&self, name: &str, label_keys: &[&str]) -> ArcCounter {
        Arc::new(LabelCounter {
            labeled: self.labeled(name, label_keys),
            value: AtomicI64::new(0),
        })
    }

    fn new_gauge(&self, name: &str, label_keys: &[&str]) -> ArcGauge {
        Arc::new(LabelGauge {
            labeled: self.labeled(name, label_keys),
            value: AtomicF64::default(),
        })
    }

    fn new_histogram(&self, name: &str, label_keys: &[&str]) -> ArcHistogram {
        Arc::new(LabelHistogram {
            labeled: self.labeled(name, label_keys),
        })
    }

    fn unregister(&self) {}
}

/// Name and label set shared by all label handles.
struct Labeled {
    name: Arc<str>,
    keys: Arc<[String]>,
    values: Vec<String>,
    sink: ArcTextSink,
}

impl Labeled {
    fn bind(&self, values: &[&str]) -> Labeled {
        Labeled {
            name: Arc::clone(&self.name),
            keys: Arc::clone(&self.keys),
            values: values.iter().map(|v| v.to_string()).collect(),
            sink: Arc::clone(&self.sink),
        }
    }

    fn emit(&self, value: i64, kind: &str) {
        let tags = serialize_labels(
            &self.keys[..],
            &self.values[..],
            TAG_PREFIX,
            TAG_FIELD_SEP,
            TAG_RECORD_SEP,
        );
        self.sink
            .write_line(&format!("{}:{value}|{kind}{tags}", self.name));
    }
}

struct LabelCounter {
    labeled: Labeled,
    value: AtomicI64,
}

impl Counter for LabelCounter {
    fn add(&self, delta: f64) {
        let delta = delta as i64;
        let v = self
            .value
            .fetch_add(delta, Ordering::Relaxed)
            .wrapping_add(delta);
        self.labeled.emit(v, "c");
    }

    /// The new handle starts from the current value of this one.
    fn with(&self, values: &[&str]) -> ArcCounter {
        Arc::new(LabelCounter {
            labeled: self.labeled.bind(values),
            value: AtomicI64::new(self.value.load(Ordering::Relaxed)),
        })
    }
}

struct LabelGauge {
    labeled: Labeled,
    value: AtomicF64,
}

impl Gauge for LabelGauge {
    fn set(&self, value: f64) {
        self.value.store(value);
        self.labeled.emit(value as i64, "g");
    }

    /// The line carries the delta, not the accumulated value.
    fn add(&self, delta: f64) {
        self.value.add(delta);
        self.labeled.emit(delta as i64, "g");
    }

    fn with(&self, values: &[&str]) -> ArcGauge {
        Arc::new(LabelGauge {
            labeled: self.labeled.bind(values),
            value: AtomicF64::default(),
        })
    }
}

struct LabelHistogram {
    labeled: Labeled,
}

impl Histogram for LabelHistogram {
    fn observe(&self, value: f64) {
        self.labeled.emit((value * 100.0).round() as i64, "ms");
    }

    fn with(&self, values: &[&str]) -> ArcHistogram {
        Arc::new(LabelHistogram {
            labeled: self.labeled.bind(values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::text::test::BufTextSink;

    fn provider(prefix: &str) -> (LabelProvider, Arc<BufTextSink>) {
        let sink = Arc::new(BufTextSink::default());
        (LabelProvider::new(prefix, sink.clone()), sink)
    }

    #[test]
    fn counter_unbound() {
        let (p, sink) = provider("");
        let c = p.new_counter("conn", &[]);
        c.add(2.0);
        c.add(1.5);
        assert_eq!(sink.take(), vec!["conn:2|c", "conn:3|c"]);

        let c = p.new_counter("route", &["service", "host"]);
        c.add(1.0);
        assert_eq!(sink.take(), vec!["route:1|c|#service:,host:"]);
    }

    #[test]
    fn counter_with() {
        let (p, sink) = provider("pre");
        let c = p.new_counter("route.rx", &["service", "host"]);
        c.add(4.0);
        let c1 = c.with(&["svc", "h"]);
        let c2 = c.with(&["other"]);
        c1.add(1.0);
        c2.add(2.0);
        c.add(1.0);
        assert_eq!(
            sink.take(),
            vec![
                "pre.route.rx:4|c|#service:,host:",
                "pre.route.rx:5|c|#service:svc,host:h",
                "pre.route.rx:6|c|#service:other,host:",
                "pre.route.rx:5|c|#service:,host:",
            ]
        );
    }

    #[test]
    fn gauge_lines() {
        let (p, sink) = provider("");
        let g = p.new_gauge("load", &["pool"]).with(&["a"]);
        g.set(7.9);
        g.add(2.0);
        g.add(-3.0);
        assert_eq!(
            sink.take(),
            vec!["load:7|g|#pool:a", "load:2|g|#pool:a", "load:-3|g|#pool:a"]
        );
    }

    #[test]
    fn histogram_hundredths() {
        let (p, sink) = provider("");
        let h = p.new_histogram("latency", &["route"]);
        h.with(&["r1"]).observe(0.01234);
        h.observe(1.5);
        assert_eq!(
            sink.take(),
            vec!["latency:1|ms|#route:r1", "latency:150|ms|#route:"]
        );
    }
}
