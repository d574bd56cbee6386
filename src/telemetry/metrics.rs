//! Metrics collection for evaluation statistics.
//!
//! Thread-safe counters tracking per-process evaluator outcomes. Evaluators
//! themselves stay metrics-free; the driving loop records outcomes here.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Evaluation outcome statistics.
#[derive(Debug, Default)]
pub struct EvalStats {
    /// Packets that completed evaluation.
    pub packets: Counter,
    /// Packets that left with an output port.
    pub outputs: Counter,
    /// Packets that completed with no output port.
    pub drops: Counter,
    /// Evaluations aborted by a program or classification error.
    pub aborts: Counter,
    /// Total actions executed across all evaluations.
    pub steps: Counter,
}

impl EvalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed evaluation.
    pub fn record_completed(&self, output_port: Option<u16>, steps: u64) {
        self.packets.inc();
        self.steps.add(steps);
        match output_port {
            Some(_) => self.outputs.inc(),
            None => self.drops.inc(),
        }
    }

    /// Records an aborted evaluation.
    pub fn record_abort(&self) {
        self.aborts.inc();
    }
}
