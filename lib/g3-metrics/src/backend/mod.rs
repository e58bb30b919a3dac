/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod text;
pub use text::{ArcTextSink, StdoutTextSink, TextSink};

mod flat;
pub use flat::FlatProvider;

mod label;
pub use label::LabelProvider;

mod statsd;
pub use statsd::StatsdProvider;

mod prom;
pub use prom::PrometheusProvider;
