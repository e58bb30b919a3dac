/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::time::Instant;

use log::warn;

use crate::StatsdMetricsSink;

mod formatter;

/// Line encoder in front of a batching sink.
///
/// Owned by the sender task, never shared.
pub struct StatsdClient {
    prefix: String,
    sink: StatsdMetricsSink,

    create_instant: Instant,
    last_error_report: u64,
}

impl StatsdClient {
    pub(crate) fn new(prefix: String, sink: StatsdMetricsSink) -> Self {
        StatsdClient {
            prefix,
            sink,
            create_instant: Instant::now(),
            last_error_report: 0,
        }
    }

    pub fn flush_sink(&mut self) {
        if let Err(e) = self.sink.flush() {
            self.handle_emit_error(e);
        }
    }

    fn handle_emit_error(&mut self, e: io::Error) {
        let time_slice = self.create_instant.elapsed().as_secs().rotate_right(6); // every 64s
        if self.last_error_report != time_slice {
            warn!("sending metrics error: {e:?}");
            self.last_error_report = time_slice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::sink::BufMetricsSink;

    fn test_client(prefix: &str, cache_size: usize) -> (StatsdClient, Arc<Mutex<Vec<Vec<u8>>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = StatsdMetricsSink::with_capacity(
            Box::new(BufMetricsSink::new(buf.clone())),
            cache_size,
        );
        (StatsdClient::new(prefix.to_string(), sink), buf)
    }

    #[test]
    fn count_simple() {
        let (mut client, buf) = test_client("test", 32);
        client.count("count", 20).send();
        client.flush_sink();

        let buf = buf.lock().unwrap();
        assert_eq!(buf[0].as_slice(), b"test.count:20|c");
    }

    #[test]
    fn count_no_prefix() {
        let (mut client, buf) = test_client("", 32);
        client.count("count", 20).send();
        client.flush_sink();

        let buf = buf.lock().unwrap();
        assert_eq!(buf[0].as_slice(), b"count:20|c");
    }

    #[test]
    fn gauge_simple() {
        let (mut client, buf) = test_client("test", 32);
        client.gauge_float("gauge", 20.0).send();
        client.gauge_float("gauge", 0.25).send();
        client.flush_sink();

        let buf = buf.lock().unwrap();
        assert_eq!(buf[0].as_slice(), b"test.gauge:20|g\ntest.gauge:0.25|g");
    }

    #[test]
    fn gauge_delta() {
        let (mut client, buf) = test_client("", 64);
        client.gauge_delta("up", 3.0).send();
        client.gauge_delta("down", -2.5).send();
        client.flush_sink();

        let buf = buf.lock().unwrap();
        assert_eq!(buf[0].as_slice(), b"up:+3|g\ndown:-2.5|g");
    }

    #[test]
    fn timing_simple() {
        let (mut client, buf) = test_client("p", 32);
        client.timing("latency", 1500.0).send();
        client.flush_sink();

        let buf = buf.lock().unwrap();
        assert_eq!(buf[0].as_slice(), b"p.latency:1500|ms");
    }

    #[test]
    fn count_multiple_overflow() {
        let (mut client, buf) = test_client("test", 20);
        client.count("count", 20).send();
        client.count("count", 30).send();
        client.flush_sink();

        let buf = buf.lock().unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf[0].as_slice(), b"test.count:20|c");
        assert_eq!(buf[1].as_slice(), b"test.count:30|c");
    }
}
