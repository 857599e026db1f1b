//! Recent round results
//!
//! In-memory only, newest first, capped at a configured length.

use serde::{Deserialize, Serialize};

use super::round::RoundId;

/// One finished round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: RoundId,
    pub crash_point: f64,
    /// Simulation ticks the round ran for
    pub ticks: u64,
}

/// Bounded list of finished rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundHistory {
    capacity: usize,
    /// Newest first
    entries: Vec<RoundRecord>,
}

impl RoundHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Record a finished round, dropping the oldest past capacity
    pub fn push(&mut self, record: RoundRecord) {
        self.entries.insert(0, record);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[RoundRecord] {
        &self.entries
    }

    pub fn last(&self) -> Option<&RoundRecord> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean crash point of the recorded rounds
    pub fn average(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: f64 = self.entries.iter().map(|r| r.crash_point).sum();
        Some(sum / self.entries.len() as f64)
    }

    /// Share of recorded rounds that crashed below `multiplier`
    pub fn fraction_below(&self, multiplier: f64) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let below = self
            .entries
            .iter()
            .filter(|r| r.crash_point < multiplier)
            .count();
        Some(below as f64 / self.entries.len() as f64)
    }
}
