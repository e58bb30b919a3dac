/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{SocketAddr, UdpSocket};

use super::MetricsTransport;

pub(crate) struct UdpMetricsSink {
    addr: SocketAddr,
    socket: UdpSocket,
}

impl UdpMetricsSink {
    pub(crate) fn new(addr: SocketAddr, socket: UdpSocket) -> Self {
        UdpMetricsSink { addr, socket }
    }
}

impl MetricsTransport for UdpMetricsSink {
    fn send_msg(&mut self, msg: &[u8]) -> io::Result<usize> {
        self.socket.send_to(msg, self.addr)
    }
}
