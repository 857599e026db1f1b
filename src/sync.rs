//! Round snapshots for the betting collaborator
//!
//! Published once per simulation tick and once on crash. On crash the
//! multiplier is always the crash point itself, never the overshoot.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// State shared with the betting side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub is_round_active: bool,
    pub current_multiplier: f64,
    pub crash_point: f64,
}

impl RoundSnapshot {
    pub fn to_json(&self) -> String {
        // Three plain fields; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receiver of published snapshots
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &RoundSnapshot);
}

impl<F: FnMut(&RoundSnapshot)> SnapshotSink for F {
    fn publish(&mut self, snapshot: &RoundSnapshot) {
        self(snapshot)
    }
}

/// Logs every snapshot at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SnapshotSink for LogSink {
    fn publish(&mut self, snapshot: &RoundSnapshot) {
        log::debug!("snapshot {}", snapshot.to_json());
    }
}

/// Shared in-memory record of published snapshots
///
/// Clone it before handing it to the engine and read through the clone.
#[derive(Debug, Default, Clone)]
pub struct SnapshotLog {
    entries: Rc<RefCell<Vec<RoundSnapshot>>>,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn last(&self) -> Option<RoundSnapshot> {
        self.entries.borrow().last().copied()
    }

    pub fn all(&self) -> Vec<RoundSnapshot> {
        self.entries.borrow().clone()
    }
}

impl SnapshotSink for SnapshotLog {
    fn publish(&mut self, snapshot: &RoundSnapshot) {
        self.entries.borrow_mut().push(*snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let snap = RoundSnapshot {
            is_round_active: false,
            current_multiplier: 2.0,
            crash_point: 2.0,
        };
        let value: serde_json::Value = serde_json::from_str(&snap.to_json()).unwrap();
        assert_eq!(value["isRoundActive"], false);
        assert_eq!(value["currentMultiplier"], 2.0);
        assert_eq!(value["crashPoint"], 2.0);
    }

    #[test]
    fn test_log_is_shared() {
        let log = SnapshotLog::new();
        let mut sink = log.clone();
        sink.publish(&RoundSnapshot {
            is_round_active: true,
            current_multiplier: 1.1,
            crash_point: 3.0,
        });
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().current_multiplier, 1.1);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = 0;
        {
            let mut sink = |_: &RoundSnapshot| seen += 1;
            let snap = RoundSnapshot {
                is_round_active: true,
                current_multiplier: 1.0,
                crash_point: 1.5,
            };
            sink.publish(&snap);
            sink.publish(&snap);
        }
        assert_eq!(seen, 2);
    }
}
