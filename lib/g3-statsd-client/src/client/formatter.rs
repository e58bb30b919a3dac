/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use itoa::Integer;
use smallvec::SmallVec;

use super::StatsdClient;

// integral floats below this are written without a fraction part
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

enum MetricType {
    Count,
    Gauge,
    Timing,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Count => "c",
            MetricType::Gauge => "g",
            MetricType::Timing => "ms",
        }
    }
}

pub struct MetricFormatter<'a> {
    client: &'a mut StatsdClient,
    metric_type: MetricType,
    name: &'a str,
    value: SmallVec<[u8; 24]>,
}

fn float_value(v: f64) -> SmallVec<[u8; 24]> {
    if v.fract() == 0.0 && v.abs() < MAX_SAFE_INTEGER {
        let mut buffer = itoa::Buffer::new();
        SmallVec::from_slice(buffer.format(v as i64).as_bytes())
    } else {
        let mut buffer = ryu::Buffer::new();
        SmallVec::from_slice(buffer.format(v).as_bytes())
    }
}

impl StatsdClient {
    pub fn count<'a, T: Integer>(&'a mut self, name: &'a str, value: T) -> MetricFormatter<'a> {
        let mut buffer = itoa::Buffer::new();
        let value = buffer.format(value);
        self.metric_with_type(
            MetricType::Count,
            name,
            SmallVec::from_slice(value.as_bytes()),
        )
    }

    pub fn gauge<'a, T: Integer>(&'a mut self, name: &'a str, value: T) -> MetricFormatter<'a> {
        let mut buffer = itoa::Buffer::new();
        let value = buffer.format(value);
        self.metric_with_type(
            MetricType::Gauge,
            name,
            SmallVec::from_slice(value.as_bytes()),
        )
    }

    pub fn gauge_float<'a>(&'a mut self, name: &'a str, value: f64) -> MetricFormatter<'a> {
        self.metric_with_type(MetricType::Gauge, name, float_value(value))
    }

    /// A relative gauge update, the sign is always written.
    pub fn gauge_delta<'a>(&'a mut self, name: &'a str, delta: f64) -> MetricFormatter<'a> {
        let mut value = SmallVec::new();
        if delta.is_sign_positive() {
            value.push(b'+');
        }
        value.extend_from_slice(&float_value(delta));
        self.metric_with_type(MetricType::Gauge, name, value)
    }

    pub fn timing<'a>(&'a mut self, name: &'a str, value: f64) -> MetricFormatter<'a> {
        self.metric_with_type(MetricType::Timing, name, float_value(value))
    }

    fn metric_with_type<'a>(
        &'a mut self,
        metric_type: MetricType,
        name: &'a str,
        value: SmallVec<[u8; 24]>,
    ) -> MetricFormatter<'a> {
        MetricFormatter {
            client: self,
            metric_type,
            name,
            value,
        }
    }
}

impl MetricFormatter<'_> {
    pub fn send(self) {
        let prefix = self.client.prefix.as_bytes();
        let mut line: SmallVec<[u8; 128]> = SmallVec::new();
        if !prefix.is_empty() {
            line.extend_from_slice(prefix);
            line.push(b'.');
        }
        line.extend_from_slice(self.name.as_bytes());
        line.push(b':');
        line.extend_from_slice(self.value.as_slice());
        line.push(b'|');
        line.extend_from_slice(self.metric_type.as_str().as_bytes());

        if let Err(e) = self.client.sink.emit(&line) {
            self.client.handle_emit_error(e);
        }
    }
}
