//! Error types
//!
//! Random-source failures are fatal; everything else is local to the
//! command that produced it.

use thiserror::Error;

/// Failures inside the pure simulation functions
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SimError {
    /// The random source produced NaN or an infinity
    #[error("random source produced a non-finite value: {0}")]
    NonFiniteRandom(f64),
    /// The random source produced a value outside [0, 1)
    #[error("random source produced {0}, expected a value in [0, 1)")]
    RandomOutOfRange(f64),
    /// A multiplier fed into the simulation is not finite
    #[error("non-finite multiplier: {0}")]
    NonFiniteValue(f64),
}

/// Configuration validation and parse failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),
    #[error("compaction batch size must be at least 2, got {0}")]
    BatchTooSmall(usize),
    #[error("compaction threshold {threshold} must exceed batch size {batch}")]
    ThresholdTooSmall { threshold: usize, batch: usize },
    #[error("ticks per candle must be at least 1")]
    NoTicksPerCandle,
    #[error("interpolation factor must be in (0, 1], got {0}")]
    InterpolationFactor(f64),
    #[error("volatility must be finite and non-negative, got {0}")]
    Volatility(f64),
    #[error("history length must be at least 1")]
    NoHistory,
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Command-level engine failures
#[derive(Error, Debug)]
pub enum EngineError {
    /// `start()` called while a round is live
    #[error("engine already started (round {0})")]
    AlreadyStarted(u64),
    /// A second timer of the same kind was armed for one round
    #[error("{kind} timer already armed for round {round}")]
    TimerAlreadyArmed { kind: &'static str, round: u64 },
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
