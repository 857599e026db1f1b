//! Stochastic price stepping
//!
//! Each step combines a broad trend term, occasional spikes and fine noise.
//! The result is floored at `MIN_MULTIPLIER`; zero is reserved for the
//! collapse candle drawn after a crash.

use super::random::{UnitSource, draw};
use crate::consts::{DEFAULT_VOLATILITY, MIN_MULTIPLIER};
use crate::error::SimError;

/// Chance per step of a spike
pub const SPIKE_PROBABILITY: f64 = 0.15;
/// Full width of a spike
pub const SPIKE_SCALE: f64 = 0.2;
/// Full width of the trend draw
pub const TREND_SCALE: f64 = 3.0;
/// Trend weight relative to volatility
pub const TREND_WEIGHT: f64 = 0.8;
/// Noise width relative to volatility
pub const NOISE_SCALE: f64 = 1.5;

/// Produces the next multiplier from the previous one
pub trait PriceModel {
    fn step(&mut self, previous: f64) -> Result<f64, SimError>;
}

impl<P: PriceModel + ?Sized> PriceModel for Box<P> {
    fn step(&mut self, previous: f64) -> Result<f64, SimError> {
        (**self).step(previous)
    }
}

/// One price step with an explicit volatility
pub fn step<S: UnitSource + ?Sized>(
    source: &mut S,
    previous: f64,
    volatility: f64,
) -> Result<f64, SimError> {
    if !previous.is_finite() {
        return Err(SimError::NonFiniteValue(previous));
    }

    let trend = (draw(source)? - 0.5) * TREND_SCALE;
    let spike = if draw(source)? < SPIKE_PROBABILITY {
        (draw(source)? - 0.5) * SPIKE_SCALE
    } else {
        0.0
    };
    let noise = (draw(source)? - 0.5) * volatility * NOISE_SCALE;

    let momentum = trend * volatility * TREND_WEIGHT + noise + spike;
    let next = (previous + momentum).max(MIN_MULTIPLIER);
    if !next.is_finite() {
        return Err(SimError::NonFiniteValue(next));
    }
    Ok(next)
}

/// Random-walk stepper owning its random source
#[derive(Debug, Clone)]
pub struct PriceStepper<S> {
    source: S,
    volatility: f64,
}

impl<S: UnitSource> PriceStepper<S> {
    pub fn new(source: S) -> Self {
        Self::with_volatility(source, DEFAULT_VOLATILITY)
    }

    pub fn with_volatility(source: S, volatility: f64) -> Self {
        Self { source, volatility }
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }
}

impl<S: UnitSource> PriceModel for PriceStepper<S> {
    fn step(&mut self, previous: f64) -> Result<f64, SimError> {
        step(&mut self.source, previous, self.volatility)
    }
}
