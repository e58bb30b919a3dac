/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::{ArcCounter, ArcGauge, ArcHistogram};

mod multi;
pub use multi::MultiProvider;

mod discard;
pub use discard::DiscardProvider;
pub(crate) use discard::{discard_counter, discard_gauge, discard_histogram};

/// A metrics backend.
///
/// Handles are created on demand and are not cached, creating the same name
/// twice gives two handles writing to the same backend sink.
pub trait Provider: Send + Sync {
    fn new_counter(&self, name: &str, label_keys: &[&str]) -> ArcCounter;
    fn new_gauge(&self, name: &str, label_keys: &[&str]) -> ArcGauge;
    fn new_histogram(&self, name: &str, label_keys: &[&str]) -> ArcHistogram;

    /// Release the resources held by this backend.
    ///
    /// This is called once at shutdown. It blocks until background tasks
    /// have stopped.
    fn unregister(&self);
}

pub type ArcProvider = Arc<dyn Provider>;
