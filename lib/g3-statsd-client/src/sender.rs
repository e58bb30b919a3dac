/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    MetricsTransport, StatsdClient, StatsdClientBuildError, StatsdClientConfig,
    StatsdMetricsSink, StatsdRecord, StatsdStore,
};

const DROP_REPORT_INTERVAL: Duration = Duration::from_secs(64);

/// The hot path side of the statsd sender.
///
/// All methods are non-blocking. Records are dropped if the queue is full,
/// or if the sender has been stopped.
#[derive(Clone)]
pub struct StatsdRecorder {
    sender: mpsc::Sender<StatsdRecord>,
    dropped: Arc<AtomicU64>,
}

impl StatsdRecorder {
    pub fn count(&self, name: &Arc<str>, value: i64) {
        self.record(StatsdRecord::Count(Arc::clone(name), value));
    }

    pub fn gauge_set(&self, name: &Arc<str>, value: f64) {
        if value.is_finite() {
            self.record(StatsdRecord::GaugeSet(Arc::clone(name), value));
        }
    }

    pub fn gauge_add(&self, name: &Arc<str>, delta: f64) {
        if delta.is_finite() {
            self.record(StatsdRecord::GaugeAdd(Arc::clone(name), delta));
        }
    }

    pub fn timing(&self, name: &Arc<str>, value: f64) {
        if value.is_finite() {
            self.record(StatsdRecord::Timing(Arc::clone(name), value));
        }
    }

    /// Records dropped because the queue was full, since the last report.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record(&self, record: StatsdRecord) {
        match self.sender.try_send(record) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Owner of the background send loop.
///
/// The loop runs on its own thread, it collects records from all
/// [`StatsdRecorder`]s and writes them out on every emit tick.
pub struct StatsdSender {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl StatsdSender {
    /// Resolve the target address and start the send loop.
    pub fn spawn(
        config: &StatsdClientConfig,
    ) -> Result<(StatsdSender, StatsdRecorder), StatsdClientBuildError> {
        let sink = config.build_udp_sink()?;
        StatsdSender::spawn_with_sink(config, sink)
    }

    /// Start the send loop on a custom transport. The target address is not used.
    pub fn spawn_with_transport(
        config: &StatsdClientConfig,
        transport: Box<dyn MetricsTransport>,
    ) -> Result<(StatsdSender, StatsdRecorder), StatsdClientBuildError> {
        let sink = StatsdMetricsSink::with_capacity(transport, config.cache_size);
        StatsdSender::spawn_with_sink(config, sink)
    }

    fn spawn_with_sink(
        config: &StatsdClientConfig,
        sink: StatsdMetricsSink,
    ) -> Result<(StatsdSender, StatsdRecorder), StatsdClientBuildError> {
        let client = StatsdClient::new(config.prefix().to_string(), sink);
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(StatsdClientBuildError::RuntimeError)?;

        let send_loop = SendLoop {
            client,
            receiver,
            dropped: Arc::clone(&dropped),
            // zero is not a valid interval period
            emit_interval: config.emit_interval.max(Duration::from_millis(1)),
            cancel: cancel.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("stat-statsd".to_string())
            .spawn(move || runtime.block_on(send_loop.into_running()))
            .map_err(StatsdClientBuildError::SpawnError)?;

        Ok((
            StatsdSender {
                cancel,
                handle: Some(handle),
            },
            StatsdRecorder { sender, dropped },
        ))
    }

    /// Stop the send loop and wait for it to exit.
    ///
    /// Nothing will be written to the transport after this returns.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("statsd sender thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for StatsdSender {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct SendLoop {
    client: StatsdClient,
    receiver: mpsc::Receiver<StatsdRecord>,
    dropped: Arc<AtomicU64>,
    emit_interval: Duration,
    cancel: CancellationToken,
}

impl SendLoop {
    async fn into_running(self) {
        const BATCH_SIZE: usize = 128;

        let SendLoop {
            mut client,
            mut receiver,
            dropped,
            emit_interval,
            cancel,
        } = self;

        let mut store = StatsdStore::default();
        let mut buf = Vec::with_capacity(BATCH_SIZE);
        let mut drop_report = DropReport::default();

        let mut emit_interval = tokio::time::interval(emit_interval);
        emit_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = emit_interval.tick() => {
                    drop_report.check(&dropped);
                    if !store.is_empty() {
                        store.emit(&mut client);
                        client.flush_sink();
                    }
                }
                n = receiver.recv_many(&mut buf, BATCH_SIZE) => {
                    if n == 0 {
                        store.emit(&mut client);
                        client.flush_sink();
                        break;
                    }
                    for record in buf.drain(..) {
                        store.add_record(record);
                    }
                }
            }
        }
    }
}

#[derive(Default)]
struct DropReport {
    total: u64,
    last_report: Option<Instant>,
}

impl DropReport {
    fn check(&mut self, dropped: &AtomicU64) {
        self.total += dropped.swap(0, Ordering::Relaxed);
        if self.total == 0 {
            return;
        }
        if self
            .last_report
            .is_some_and(|i| i.elapsed() < DROP_REPORT_INTERVAL)
        {
            return;
        }
        warn!("statsd queue is full, {} records dropped", self.total);
        self.total = 0;
        self.last_report = Some(Instant::now());
    }
}
