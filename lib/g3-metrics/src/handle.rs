/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

/// A monotonic counter.
///
/// `with` binds label values in the order of the label keys given at
/// creation, and returns a new handle. The receiver is left untouched.
pub trait Counter: Send + Sync {
    fn add(&self, delta: f64);
    fn with(&self, values: &[&str]) -> ArcCounter;
}

pub trait Gauge: Send + Sync {
    fn set(&self, value: f64);
    fn add(&self, delta: f64);
    fn with(&self, values: &[&str]) -> ArcGauge;
}

/// Observations are in seconds, backends scale them as their wire format needs.
pub trait Histogram: Send + Sync {
    fn observe(&self, value: f64);
    fn with(&self, values: &[&str]) -> ArcHistogram;
}

pub type ArcCounter = Arc<dyn Counter>;
pub type ArcGauge = Arc<dyn Gauge>;
pub type ArcHistogram = Arc<dyn Histogram>;
