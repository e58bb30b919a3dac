/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use indexmap::IndexMap;

use crate::StatsdClient;

// timing observations kept per interval, the rest are dropped
const MAX_TIMING_RECORDS: usize = 65536;

pub(crate) enum StatsdRecord {
    Count(Arc<str>, i64),
    GaugeSet(Arc<str>, f64),
    GaugeAdd(Arc<str>, f64),
    Timing(Arc<str>, f64),
}

enum GaugeValue {
    Absolute(f64),
    Relative(f64),
}

/// Values collected between two emit ticks.
#[derive(Default)]
pub(crate) struct StatsdStore {
    counter: IndexMap<Arc<str>, i64>,
    gauge: IndexMap<Arc<str>, GaugeValue>,
    timing: Vec<(Arc<str>, f64)>,
}

impl StatsdStore {
    pub(crate) fn add_record(&mut self, record: StatsdRecord) {
        match record {
            StatsdRecord::Count(name, v) => {
                let sum = self.counter.entry(name).or_insert(0);
                *sum = sum.saturating_add(v);
            }
            StatsdRecord::GaugeSet(name, v) => {
                self.gauge.insert(name, GaugeValue::Absolute(v));
            }
            StatsdRecord::GaugeAdd(name, delta) => {
                self.gauge
                    .entry(name)
                    .and_modify(|g| match g {
                        GaugeValue::Absolute(v) => *v += delta,
                        GaugeValue::Relative(v) => *v += delta,
                    })
                    .or_insert(GaugeValue::Relative(delta));
            }
            StatsdRecord::Timing(name, v) => {
                if self.timing.len() < MAX_TIMING_RECORDS {
                    self.timing.push((name, v));
                }
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.counter.is_empty() && self.gauge.is_empty() && self.timing.is_empty()
    }

    pub(crate) fn emit(&mut self, client: &mut StatsdClient) {
        for (name, v) in self.counter.drain(..) {
            client.count(&name, v).send();
        }
        for (name, v) in self.gauge.drain(..) {
            match v {
                GaugeValue::Absolute(v) => {
                    if v < 0.0 {
                        // a leading sign means a relative update on the wire
                        client.gauge(&name, 0).send();
                    }
                    client.gauge_float(&name, v).send();
                }
                GaugeValue::Relative(v) => {
                    if v != 0.0 {
                        client.gauge_delta(&name, v).send();
                    }
                }
            }
        }
        for (name, v) in self.timing.drain(..) {
            client.timing(&name, v).send();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::StatsdMetricsSink;
    use crate::sink::BufMetricsSink;

    fn emit_lines(store: &mut StatsdStore) -> String {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = StatsdMetricsSink::with_capacity(
            Box::new(BufMetricsSink::new(buf.clone())),
            4096,
        );
        let mut client = StatsdClient::new(String::new(), sink);
        store.emit(&mut client);
        client.flush_sink();

        let packets = buf.lock().unwrap();
        packets
            .iter()
            .map(|p| String::from_utf8_lossy(p).to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn sum_counters() {
        let mut store = StatsdStore::default();
        let name: Arc<str> = Arc::from("conn");
        store.add_record(StatsdRecord::Count(name.clone(), 1));
        store.add_record(StatsdRecord::Count(name.clone(), 2));
        store.add_record(StatsdRecord::Count(Arc::from("other"), 5));
        assert_eq!(emit_lines(&mut store), "conn:3|c\nother:5|c");
        assert!(store.is_empty());
    }

    #[test]
    fn gauge_set_then_add() {
        let mut store = StatsdStore::default();
        let name: Arc<str> = Arc::from("g");
        store.add_record(StatsdRecord::GaugeSet(name.clone(), 10.0));
        store.add_record(StatsdRecord::GaugeAdd(name.clone(), 2.5));
        assert_eq!(emit_lines(&mut store), "g:12.5|g");
    }

    #[test]
    fn gauge_relative() {
        let mut store = StatsdStore::default();
        let name: Arc<str> = Arc::from("g");
        store.add_record(StatsdRecord::GaugeAdd(name.clone(), 2.0));
        store.add_record(StatsdRecord::GaugeAdd(name.clone(), -5.0));
        assert_eq!(emit_lines(&mut store), "g:-3|g");

        store.add_record(StatsdRecord::GaugeAdd(name.clone(), 1.0));
        store.add_record(StatsdRecord::GaugeAdd(name.clone(), -1.0));
        assert_eq!(emit_lines(&mut store), "");
    }

    #[test]
    fn gauge_negative_absolute() {
        let mut store = StatsdStore::default();
        store.add_record(StatsdRecord::GaugeSet(Arc::from("g"), -4.0));
        assert_eq!(emit_lines(&mut store), "g:0|g\ng:-4|g");
    }

    #[test]
    fn keep_each_timing() {
        let mut store = StatsdStore::default();
        let name: Arc<str> = Arc::from("t");
        store.add_record(StatsdRecord::Timing(name.clone(), 12.0));
        store.add_record(StatsdRecord::Timing(name.clone(), 0.5));
        assert_eq!(emit_lines(&mut store), "t:12|ms\nt:0.5|ms");
    }
}
