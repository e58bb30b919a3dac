/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use thiserror::Error;

use crate::StatsdMetricsSink;
use crate::sink::UdpMetricsSink;

const DEFAULT_CACHE_SIZE: usize = 1024;
const DEFAULT_QUEUE_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum StatsdClientBuildError {
    #[error("error resolving statsd address {0}: {1}")]
    AddrResolveFailed(String, io::Error),
    #[error("no address found for statsd target {0}")]
    NoAddressFound(String),
    #[error("socket error: {0}")]
    SocketError(io::Error),
    #[error("failed to build runtime: {0}")]
    RuntimeError(io::Error),
    #[error("failed to spawn thread: {0}")]
    SpawnError(io::Error),
}

#[derive(Debug, Clone)]
pub struct StatsdClientConfig {
    target: String,
    bind: Option<IpAddr>,
    prefix: String,
    pub cache_size: usize,
    pub queue_size: usize,
    pub emit_interval: Duration,
}

impl Default for StatsdClientConfig {
    fn default() -> Self {
        StatsdClientConfig::with_prefix(String::new())
    }
}

impl StatsdClientConfig {
    pub fn with_prefix(prefix: String) -> Self {
        StatsdClientConfig {
            target: String::new(),
            bind: None,
            prefix,
            cache_size: DEFAULT_CACHE_SIZE,
            queue_size: DEFAULT_QUEUE_SIZE,
            emit_interval: Duration::from_millis(200),
        }
    }

    pub fn set_target<T: Into<String>>(&mut self, target: T) {
        self.target = target.into();
    }

    pub fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind = Some(ip);
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolve the target address, the first one returned is used.
    pub fn resolve(&self) -> Result<SocketAddr, StatsdClientBuildError> {
        let mut addrs = self
            .target
            .to_socket_addrs()
            .map_err(|e| StatsdClientBuildError::AddrResolveFailed(self.target.clone(), e))?;
        addrs
            .next()
            .ok_or_else(|| StatsdClientBuildError::NoAddressFound(self.target.clone()))
    }

    pub(crate) fn build_udp_sink(&self) -> Result<StatsdMetricsSink, StatsdClientBuildError> {
        let addr = self.resolve()?;
        let bind_ip = self.bind.unwrap_or(match addr {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        });
        let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0))
            .map_err(StatsdClientBuildError::SocketError)?;
        socket
            .set_nonblocking(true)
            .map_err(StatsdClientBuildError::SocketError)?;
        let io = UdpMetricsSink::new(addr, socket);
        Ok(StatsdMetricsSink::with_capacity(
            Box::new(io),
            self.cache_size,
        ))
    }
}
