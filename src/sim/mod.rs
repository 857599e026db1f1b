//! Deterministic simulation module
//!
//! All round logic lives here. Everything is driven by the virtual clock and
//! injectable random sources:
//! - Seeded RNG only (or scripted units in tests)
//! - No wall-clock reads
//! - No rendering dependencies

pub mod candles;
pub mod crash_point;
pub mod engine;
pub mod history;
pub mod random;
pub mod round;
pub mod stepper;

pub use candles::{Candle, CandleAggregator, max_wick_extension, merge_bounded};
pub use crash_point::{
    CrashPointGenerator, CrashPointSource, EdgeTier, HouseEdgeAdjusted, generate,
};
pub use engine::CrashEngine;
pub use history::{RoundHistory, RoundRecord};
pub use random::{ScriptedUnits, UnitSource, seeded_rng};
pub use round::{Round, RoundEvent, RoundId, RoundPhase, Tick, is_crash};
pub use stepper::{PriceModel, PriceStepper};
