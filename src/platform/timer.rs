//! Virtual clock with owned timer handles
//!
//! Time only moves when the host advances it, so every schedule is
//! reproducible. Each timer is tagged with the round that armed it; firing
//! order is by due time, then by creation order.

use std::fmt;

use crate::sim::RoundId;

/// What a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-second waiting countdown
    Countdown,
    /// Simulation tick
    SimTick,
    /// Hold after a crash before the next round
    CrashDisplay,
    /// Display interpolation frame
    Render,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Countdown => "countdown",
            TimerKind::SimTick => "sim-tick",
            TimerKind::CrashDisplay => "crash-display",
            TimerKind::Render => "render",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque timer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Owned handle to a scheduled timer
///
/// Not `Clone`: whoever holds the handle owns the timer.
#[derive(Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
    kind: TimerKind,
    round: RoundId,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn round(&self) -> RoundId {
        self.round
    }
}

/// A timer that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub kind: TimerKind,
    pub round: RoundId,
    /// Clock time the timer was due (ms)
    pub at_ms: u64,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    round: RoundId,
    due_ms: u64,
    /// `Some` for repeating timers
    period_ms: Option<u64>,
}

/// Monotonic clock plus the set of live timers
#[derive(Debug, Default)]
pub struct TimerQueue {
    now_ms: u64,
    timers: Vec<Timer>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock time (ms)
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of live timers
    pub fn live_count(&self) -> usize {
        self.timers.len()
    }

    /// Live timers of `kind`, across all rounds
    pub fn live_of_kind(&self, kind: TimerKind) -> usize {
        self.timers.iter().filter(|t| t.kind == kind).count()
    }

    /// Live timers armed by `round`
    pub fn live_for_round(&self, round: RoundId) -> usize {
        self.timers.iter().filter(|t| t.round == round).count()
    }

    pub fn is_live(&self, handle: &TimerHandle) -> bool {
        self.timers.iter().any(|t| t.id == handle.id)
    }

    fn insert(
        &mut self,
        kind: TimerKind,
        round: RoundId,
        delay_ms: u64,
        period_ms: Option<u64>,
    ) -> TimerHandle {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            kind,
            round,
            due_ms: self.now_ms + delay_ms,
            period_ms,
        });
        TimerHandle { id, kind, round }
    }

    /// Fire every `period_ms`, first after one period
    pub fn schedule_repeating(
        &mut self,
        kind: TimerKind,
        round: RoundId,
        period_ms: u64,
    ) -> TimerHandle {
        let period_ms = period_ms.max(1);
        self.insert(kind, round, period_ms, Some(period_ms))
    }

    /// Fire once after `delay_ms`
    pub fn schedule_once(&mut self, kind: TimerKind, round: RoundId, delay_ms: u64) -> TimerHandle {
        self.insert(kind, round, delay_ms, None)
    }

    /// Cancel a timer; returns true if it was still live
    ///
    /// Safe to call any number of times.
    pub fn cancel(&mut self, handle: &TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != handle.id);
        before != self.timers.len()
    }

    /// Pop the earliest timer due at or before `until_ms`
    ///
    /// Moves the clock to the timer's due time. Repeating timers are
    /// rescheduled one period later; one-shot timers are removed.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Fired> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        let fired = Fired {
            id: timer.id,
            kind: timer.kind,
            round: timer.round,
            at_ms: timer.due_ms,
        };
        match timer.period_ms {
            Some(period) => timer.due_ms += period,
            None => {
                self.timers.remove(idx);
            }
        }
        self.now_ms = self.now_ms.max(fired.at_ms);
        Some(fired)
    }

    /// Move the clock forward without firing anything
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}
