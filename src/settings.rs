//! Engine configuration
//!
//! Loaded from JSON (camelCase keys); every field has a default so partial
//! documents are accepted.

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_VOLATILITY;
use crate::error::ConfigError;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    // === Simulation clock ===
    /// Simulation tick period (ms)
    pub tick_period_ms: u64,
    /// Overrides `tick_period_ms` for accelerated testing
    pub test_mode_tick_period_ms: Option<u64>,

    // === Candles ===
    /// Ticks folded into each candle before it closes
    pub ticks_per_candle: u32,
    /// Buffer length that triggers compaction
    pub compaction_threshold: usize,
    /// Oldest candles merged per compaction
    pub compaction_batch_size: usize,

    // === Round cycle ===
    /// Waiting countdown (seconds)
    pub countdown_seconds: u32,
    /// Time the crashed round stays on screen (ms)
    pub crash_display_ms: u64,

    // === Price motion ===
    pub volatility: f64,

    // === Display ===
    /// Fraction of remaining distance closed per render frame
    pub interpolation_factor: f64,
    /// Render clock period (ms)
    pub render_period_ms: u64,

    // === Misc ===
    /// Finished rounds kept in history
    pub history_len: usize,
    /// RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 250,
            test_mode_tick_period_ms: None,

            ticks_per_candle: 5,
            compaction_threshold: 30,
            compaction_batch_size: 3,

            countdown_seconds: 5,
            crash_display_ms: 2000,

            volatility: DEFAULT_VOLATILITY,

            interpolation_factor: 0.15,
            render_period_ms: 16,

            history_len: 20,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Accelerated config for tests and demos
    pub fn test_mode(tick_period_ms: u64) -> Self {
        Self {
            test_mode_tick_period_ms: Some(tick_period_ms),
            ..Self::default()
        }
    }

    /// Tick period actually used by the simulation clock
    pub fn effective_tick_period_ms(&self) -> u64 {
        self.test_mode_tick_period_ms.unwrap_or(self.tick_period_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.effective_tick_period_ms() == 0 {
            return Err(ConfigError::ZeroPeriod("tick period"));
        }
        if self.render_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("render period"));
        }
        if self.ticks_per_candle == 0 {
            return Err(ConfigError::NoTicksPerCandle);
        }
        if self.compaction_batch_size < 2 {
            return Err(ConfigError::BatchTooSmall(self.compaction_batch_size));
        }
        if self.compaction_threshold <= self.compaction_batch_size {
            return Err(ConfigError::ThresholdTooSmall {
                threshold: self.compaction_threshold,
                batch: self.compaction_batch_size,
            });
        }
        let k = self.interpolation_factor;
        if !(k > 0.0 && k <= 1.0) {
            return Err(ConfigError::InterpolationFactor(k));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(ConfigError::Volatility(self.volatility));
        }
        if self.history_len == 0 {
            return Err(ConfigError::NoHistory);
        }
        Ok(())
    }
}
