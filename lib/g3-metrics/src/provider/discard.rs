/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, LazyLock};

use super::Provider;
use crate::{ArcCounter, ArcGauge, ArcHistogram, Counter, Gauge, Histogram};

static DISCARD_COUNTER: LazyLock<ArcCounter> = LazyLock::new(|| Arc::new(DiscardMetric));
static DISCARD_GAUGE: LazyLock<ArcGauge> = LazyLock::new(|| Arc::new(DiscardMetric));
static DISCARD_HISTOGRAM: LazyLock<ArcHistogram> = LazyLock::new(|| Arc::new(DiscardMetric));

/// The provider used when no backend is enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardProvider;

impl Provider for DiscardProvider {
    fn new_counter(&self, _name: &str, _label_keys: &[&str]) -> ArcCounter {
        discard_counter()
    }

    fn new_gauge(&self, _name: &str, _label_keys: &[&str]) -> ArcGauge {
        discard_gauge()
    }

    fn new_histogram(&self, _name: &str, _label_keys: &[&str]) -> ArcHistogram {
        discard_histogram()
    }

    fn unregister(&self) {}
}

pub(crate) fn discard_counter() -> ArcCounter {
    Arc::clone(&DISCARD_COUNTER)
}

pub(crate) fn discard_gauge() -> ArcGauge {
    Arc::clone(&DISCARD_GAUGE)
}

pub(crate) fn discard_histogram() -> ArcHistogram {
    Arc::clone(&DISCARD_HISTOGRAM)
}

struct DiscardMetric;

impl Counter for DiscardMetric {
    fn add(&self, _delta: f64) {}

    fn with(&self, _values: &[&str]) -> ArcCounter {
        discard_counter()
    }
}

impl Gauge for DiscardMetric {
    fn set(&self, _value: f64) {}

    fn add(&self, _delta: f64) {}

    fn with(&self, _values: &[&str]) -> ArcGauge {
        discard_gauge()
    }
}

impl Histogram for DiscardMetric {
    fn observe(&self, _value: f64) {}

    fn with(&self, _values: &[&str]) -> ArcHistogram {
        discard_histogram()
    }
}
