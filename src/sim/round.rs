//! Round state and events
//!
//! A `Round` is the single live unit of play: it carries its phase, its
//! crash point once drawn, and the timer handles it owns. Rounds are
//! replaced wholesale, never recycled.

use serde::{Deserialize, Serialize};

use crate::consts::START_MULTIPLIER;
use crate::platform::TimerHandle;

/// Monotonic round identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Counting down to launch
    Waiting,
    /// Multiplier is moving
    Running,
    /// Crash point reached; showing the collapse
    Crashed,
}

impl RoundPhase {
    /// Only legal successor of this phase
    pub fn next(self) -> Self {
        match self {
            RoundPhase::Waiting => RoundPhase::Running,
            RoundPhase::Running => RoundPhase::Crashed,
            RoundPhase::Crashed => RoundPhase::Waiting,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Waiting => "waiting",
            RoundPhase::Running => "running",
            RoundPhase::Crashed => "crashed",
        }
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One simulation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub multiplier: f64,
    pub sequence: u64,
}

/// Crash condition for a freshly stepped multiplier
///
/// Sub-1x crash points trigger on the way down, all others on the way up.
pub fn is_crash(crash_point: f64, multiplier: f64) -> bool {
    if crash_point < 1.0 {
        multiplier <= crash_point
    } else {
        multiplier >= crash_point
    }
}

/// Timers owned by one round, at most one per kind
#[derive(Debug, Default)]
pub struct RoundTimers {
    pub countdown: Option<TimerHandle>,
    pub sim_tick: Option<TimerHandle>,
    pub crash_display: Option<TimerHandle>,
    pub render: Option<TimerHandle>,
}

impl RoundTimers {
    /// Take every handle, leaving the set empty
    pub fn drain(&mut self) -> Vec<TimerHandle> {
        [
            self.countdown.take(),
            self.sim_tick.take(),
            self.crash_display.take(),
            self.render.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// The live round
#[derive(Debug)]
pub struct Round {
    pub id: RoundId,
    pub phase: RoundPhase,
    /// Drawn when the round starts running
    pub crash_point: Option<f64>,
    pub current_multiplier: f64,
    pub tick_number: u64,
    /// Seconds left before launch
    pub countdown: u32,
    /// Set once the round has crashed; never cleared
    pub crashed_once: bool,
    pub timers: RoundTimers,
}

impl Round {
    pub fn new(id: RoundId, countdown: u32) -> Self {
        Self {
            id,
            phase: RoundPhase::Waiting,
            crash_point: None,
            current_multiplier: START_MULTIPLIER,
            tick_number: 0,
            countdown,
            crashed_once: false,
            timers: RoundTimers::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == RoundPhase::Running
    }

    /// Move to the next phase; panics in debug builds on an illegal edge
    pub fn advance_phase(&mut self, to: RoundPhase) {
        debug_assert_eq!(self.phase.next(), to, "illegal phase edge");
        log::debug!("Round {} {} -> {}", self.id, self.phase, to);
        self.phase = to;
    }
}

/// Notable engine events, drained by the host
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    PhaseChanged {
        round: RoundId,
        from: Option<RoundPhase>,
        to: RoundPhase,
    },
    CountdownTick {
        round: RoundId,
        remaining: u32,
    },
    CandleClosed {
        round: RoundId,
        close: f64,
    },
    Compacted {
        round: RoundId,
        buffer_len: usize,
    },
    Crashed {
        round: RoundId,
        crash_point: f64,
        ticks: u64,
    },
}
