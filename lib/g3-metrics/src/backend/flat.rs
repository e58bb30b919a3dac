/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::ArcTextSink;
use crate::atomic::AtomicF64;
use crate::names::{DOT_SEPARATOR, flatten, with_prefix};
use crate::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram, Provider};

/// Text lines with the label keys folded into the name at creation.
///
/// Label values are ignored, `with` returns a handle sharing the same state.
pub struct FlatProvider {
    prefix: String,
    sink: ArcTextSink,
}

impl FlatProvider {
    pub fn new(prefix: &str, sink: ArcTextSink) -> Self {
        FlatProvider {
            prefix: prefix.to_string(),
            sink,
        }
    }

    fn metric_name(&self, name: &str, label_keys: &[&str]) -> String {
        with_prefix(&self.prefix, &flatten(name, label_keys, DOT_SEPARATOR))
    }
}

impl Provider for FlatProvider {
    fn new_counter(&self, name: &str, label_keys: &[&str]) -> ArcCounter {
        Arc::new(FlatCounter {
            name: Arc::from(self.metric_name(name, label_keys)),
            value: Arc::new(AtomicU64::new(0)),
            sink: Arc::clone(&self.sink),
        })
    }

    fn new_gauge(&self, name: &str, label_keys: &[&str]) -> ArcGauge {
        Arc::new(FlatGauge {
            name: Arc::from(self.metric_name(name, label_keys)),
            value: Arc::new(AtomicF64::default()),
            sink: Arc::clone(&self.sink),
        })
    }

    fn new_histogram(&self, name: &str, label_keys: &[&str]) -> ArcHistogram {
        Arc::new(FlatHistogram {
            name: Arc::from(self.metric_name(name, label_keys)),
            sink: Arc::clone(&self.sink),
        })
    }

    fn unregister(&self) {}
}

#[derive(Clone)]
struct FlatCounter {
    name: Arc<str>,
    value: Arc<AtomicU64>,
    sink: ArcTextSink,
}

impl Counter for FlatCounter {
    fn add(&self, delta: f64) {
        let delta = delta as u64;
        let v = self
            .value
            .fetch_add(delta, Ordering::Relaxed)
            .wrapping_add(delta);
        self.sink.write_line(&format!("{}:{v}|c", self.name));
    }

    fn with(&self, _values: &[&str]) -> ArcCounter {
        Arc::new(self.clone())
    }
}

#[derive(Clone)]
struct FlatGauge {
    name: Arc<str>,
    value: Arc<AtomicF64>,
    sink: ArcTextSink,
}

impl Gauge for FlatGauge {
    fn set(&self, value: f64) {
        self.value.store(value);
        self.sink
            .write_line(&format!("{}:{}|g", self.name, value as i64));
    }

    fn add(&self, delta: f64) {
        let v = self.value.add(delta);
        self.sink.write_line(&format!("{}:{}|g", self.name, v as i64));
    }

    fn with(&self, _values: &[&str]) -> ArcGauge {
        Arc::new(self.clone())
    }
}

#[derive(Clone)]
struct FlatHistogram {
    name: Arc<str>,
    sink: ArcTextSink,
}

impl Histogram for FlatHistogram {
    fn observe(&self, value: f64) {
        self.sink
            .write_line(&format!(":{}:{}|ms", self.name, value.round() as i64));
    }

    fn with(&self, _values: &[&str]) -> ArcHistogram {
        Arc::new(self.clone())
    }
}
