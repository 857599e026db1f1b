//! Crash Chart - round simulation engine for a crash multiplier game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (crash points, price steps, candles, round state machine)
//! - `platform`: Virtual clock and timer ownership
//! - `render`: Display-rate interpolation of the live multiplier
//! - `sync`: Round snapshots published to the betting collaborator
//! - `settings`: Engine configuration

pub mod error;
pub mod platform;
pub mod render;
pub mod settings;
pub mod sim;
pub mod sync;

pub use error::{ConfigError, EngineError, SimError};
pub use settings::EngineConfig;
pub use sim::{CrashEngine, RoundPhase};
pub use sync::{RoundSnapshot, SnapshotSink};

/// Engine constants
pub mod consts {
    /// Lowest multiplier any generator or stepper may produce
    pub const MIN_MULTIPLIER: f64 = 0.01;
    /// Highest crash point the base distribution can draw
    pub const MAX_CRASH_POINT: f64 = 25.0;
    /// Multiplier every running round opens at
    pub const START_MULTIPLIER: f64 = 1.0;

    /// Default price volatility
    pub const DEFAULT_VOLATILITY: f64 = 0.08;

    /// Residual below which the displayed value snaps to its target
    pub const SNAP_EPSILON: f64 = 1e-4;
    /// Largest frame delta the interpolator accepts (ms)
    pub const MAX_FRAME_DELTA_MS: f64 = 100.0;

    /// Countdown step (ms)
    pub const COUNTDOWN_STEP_MS: u64 = 1000;
}
