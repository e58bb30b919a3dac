/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::{Arc, Mutex};

use super::MetricsTransport;

pub(crate) struct BufMetricsSink {
    packets: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufMetricsSink {
    pub(crate) fn new(packets: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        BufMetricsSink { packets }
    }
}

impl MetricsTransport for BufMetricsSink {
    fn send_msg(&mut self, msg: &[u8]) -> io::Result<usize> {
        let mut packets = self.packets.lock().unwrap();
        packets.push(msg.to_vec());
        Ok(msg.len())
    }
}
