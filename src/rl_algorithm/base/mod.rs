use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::info;
use tensorboard_rs::summary_writer::SummaryWriter;

pub mod checkpoint;
pub mod config;
pub mod memory;
pub mod model;
pub mod on_policy_runner;
pub mod rl_utils;

/// Where per-iteration diagnostics go.
pub trait MetricsSink {
    fn add_scalar(&mut self, tag: &str, value: f32);

    /// Emits everything buffered since the last flush under `step`.
    fn flush(&mut self, step: usize);
}

/// Buffers scalars for one iteration, then writes them to TensorBoard and the log.
pub struct EpochLogger {
    log_info: BTreeMap<String, f32>,
    writer: Option<SummaryWriter>,
}

impl EpochLogger {
    pub fn new(logdir: &str) -> Self {
        Self {
            log_info: BTreeMap::new(),
            writer: Some(SummaryWriter::new(logdir)),
        }
    }

    /// Log-only logger, nothing is written to disk.
    pub fn without_writer() -> Self {
        Self {
            log_info: BTreeMap::new(),
            writer: None,
        }
    }

    pub fn pending(&self) -> &BTreeMap<String, f32> {
        &self.log_info
    }
}

impl MetricsSink for EpochLogger {
    fn add_scalar(&mut self, tag: &str, value: f32) {
        self.log_info.insert(tag.to_string(), value);
    }

    fn flush(&mut self, step: usize) {
        info!("************iter={}************", step);
        let log_info = std::mem::take(&mut self.log_info);
        for (tag, scalar) in log_info {
            if let Some(writer) = self.writer.as_mut() {
                writer.add_scalar(&tag, scalar, step);
            }
            info!("{}={}", tag, scalar);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }
}

/// Counters that live as long as one training run.
#[derive(Debug, Clone)]
pub struct TrainingContext {
    pub iteration: usize,
    pub success_count: usize,
    start: Instant,
    start_iteration: usize,
}

impl TrainingContext {
    pub fn new(start_iteration: usize) -> Self {
        Self {
            iteration: start_iteration,
            success_count: 0,
            start: Instant::now(),
            start_iteration,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Iterations completed in this process per wall-clock second.
    pub fn episodes_per_second(&self) -> f32 {
        let secs = self.elapsed().as_secs_f32();
        if secs <= 0.0 {
            return 0.0;
        }
        (self.iteration - self.start_iteration) as f32 / secs
    }
}
