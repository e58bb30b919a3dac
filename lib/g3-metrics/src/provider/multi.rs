/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use super::{ArcProvider, Provider};
use crate::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram};

/// Fan out every call to all wrapped providers, in order.
///
/// There is no isolation between the backends, a panic in one of them
/// propagates to the caller and the remaining ones are skipped.
pub struct MultiProvider {
    providers: Vec<ArcProvider>,
}

impl MultiProvider {
    pub fn new(providers: Vec<ArcProvider>) -> Self {
        MultiProvider { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Provider for MultiProvider {
    fn new_counter(&self, name: &str, label_keys: &[&str]) -> ArcCounter {
        let inner = self
            .providers
            .iter()
            .map(|p| p.new_counter(name, label_keys))
            .collect();
        Arc::new(MultiCounter { inner })
    }

    fn new_gauge(&self, name: &str, label_keys: &[&str]) -> ArcGauge {
        let inner = self
            .providers
            .iter()
            .map(|p| p.new_gauge(name, label_keys))
            .collect();
        Arc::new(MultiGauge { inner })
    }

    fn new_histogram(&self, name: &str, label_keys: &[&str]) -> ArcHistogram {
        let inner = self
            .providers
            .iter()
            .map(|p| p.new_histogram(name, label_keys))
            .collect();
        Arc::new(MultiHistogram { inner })
    }

    fn unregister(&self) {
        for p in &self.providers {
            p.unregister();
        }
    }
}

struct MultiCounter {
    inner: Vec<ArcCounter>,
}

impl Counter for MultiCounter {
    fn add(&self, delta: f64) {
        for c in &self.inner {
            c.add(delta);
        }
    }

    fn with(&self, values: &[&str]) -> ArcCounter {
        let inner = self.inner.iter().map(|c| c.with(values)).collect();
        Arc::new(MultiCounter { inner })
    }
}

struct MultiGauge {
    inner: Vec<ArcGauge>,
}

impl Gauge for MultiGauge {
    fn set(&self, value: f64) {
        for g in &self.inner {
            g.set(value);
        }
    }

    fn add(&self, delta: f64) {
        for g in &self.inner {
            g.add(delta);
        }
    }

    fn with(&self, values: &[&str]) -> ArcGauge {
        let inner = self.inner.iter().map(|g| g.with(values)).collect();
        Arc::new(MultiGauge { inner })
    }
}

struct MultiHistogram {
    inner: Vec<ArcHistogram>,
}

impl Histogram for MultiHistogram {
    fn observe(&self, value: f64) {
        for h in &self.inner {
            h.observe(value);
        }
    }

    fn with(&self, values: &[&str]) -> ArcHistogram {
        let inner = self.inner.iter().map(|h| h.with(values)).collect();
        Arc::new(MultiHistogram { inner })
    }
}
