/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

#[cfg(test)]
mod buf;
#[cfg(test)]
pub(crate) use buf::BufMetricsSink;

mod udp;
pub(crate) use udp::UdpMetricsSink;

/// The datagram level io used by the statsd sink.
///
/// Each call sends one datagram, which may carry several `\n` separated lines.
pub trait MetricsTransport: Send {
    fn send_msg(&mut self, msg: &[u8]) -> io::Result<usize>;
}

pub(crate) struct StatsdMetricsSink {
    cache_size: usize,
    buf: Vec<u8>,
    io: Box<dyn MetricsTransport>,
}

impl StatsdMetricsSink {
    pub(crate) fn with_capacity(io: Box<dyn MetricsTransport>, cache_size: usize) -> Self {
        StatsdMetricsSink {
            cache_size,
            buf: Vec::with_capacity(cache_size),
            io,
        }
    }

    pub(crate) fn emit(&mut self, msg: &[u8]) -> io::Result<()> {
        if self.buf.is_empty() {
            self.buf.extend_from_slice(msg);
        } else if self.buf.len() + 1 + msg.len() > self.cache_size {
            let r = self.flush_buf();
            self.buf.extend_from_slice(msg);
            r?;
        } else {
            self.buf.push(b'\n');
            self.buf.extend_from_slice(msg);
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.flush_buf()
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        // the buffer is dropped even if the send failed, there is no retry
        let r = self.io.send_msg(&self.buf);
        self.buf.clear();
        r.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct FailingTransport;

    impl MetricsTransport for FailingTransport {
        fn send_msg(&mut self, _msg: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("unreachable"))
        }
    }

    #[test]
    fn batch_lines() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let mut sink = StatsdMetricsSink::with_capacity(
            Box::new(BufMetricsSink::new(buf.clone())),
            32,
        );
        sink.emit(b"a:1|c").unwrap();
        sink.emit(b"b:2|c").unwrap();
        sink.flush().unwrap();

        let packets = buf.lock().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].as_slice(), b"a:1|c\nb:2|c");
    }

    #[test]
    fn split_on_overflow() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let mut sink = StatsdMetricsSink::with_capacity(
            Box::new(BufMetricsSink::new(buf.clone())),
            12,
        );
        sink.emit(b"aaaa:1|c").unwrap();
        sink.emit(b"bbbb:2|c").unwrap();
        sink.flush().unwrap();

        let packets = buf.lock().unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].as_slice(), b"aaaa:1|c");
        assert_eq!(packets[1].as_slice(), b"bbbb:2|c");
    }

    #[test]
    fn flush_empty() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let mut sink = StatsdMetricsSink::with_capacity(
            Box::new(BufMetricsSink::new(buf.clone())),
            32,
        );
        sink.flush().unwrap();
        assert!(buf.lock().unwrap().is_empty());
    }

    #[test]
    fn drop_on_error() {
        let mut sink = StatsdMetricsSink::with_capacity(Box::new(FailingTransport), 32);
        sink.emit(b"a:1|c").unwrap();
        assert!(sink.flush().is_err());
        // nothing left to resend
        assert!(sink.flush().is_ok());
    }
}
