//! Crash point distribution
//!
//! A two-level bucket table: 30% of rounds crash below 1x, the rest above.
//! The fixed bucket weights are the house edge. Variable edge is layered on
//! top by wrapping a source, never by editing the table.

use super::random::{UnitSource, draw, draw_between};
use crate::consts::{MAX_CRASH_POINT, MIN_MULTIPLIER};
use crate::error::SimError;

/// Probability that a round crashes below 1x
pub const SUB_ONE_PROBABILITY: f64 = 0.30;

/// A bucket: cumulative upper bound of its selector draw, and its value range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub cumulative: f64,
    pub lo: f64,
    pub hi: f64,
}

const fn bucket(cumulative: f64, lo: f64, hi: f64) -> Bucket {
    Bucket { cumulative, lo, hi }
}

/// Sub-1x buckets (weights 10/20/70)
pub const SUB_ONE_BUCKETS: [Bucket; 3] = [
    bucket(0.10, 0.01, 0.20),
    bucket(0.30, 0.20, 0.50),
    bucket(1.00, 0.50, 0.99),
];

/// Above-1x buckets (weights 40/30/20/10)
pub const ABOVE_ONE_BUCKETS: [Bucket; 4] = [
    bucket(0.40, 1.01, 2.00),
    bucket(0.70, 2.00, 5.00),
    bucket(0.90, 5.00, 10.00),
    bucket(1.00, 10.00, MAX_CRASH_POINT),
];

/// Anything that yields one crash point per round
pub trait CrashPointSource {
    fn next_crash_point(&mut self) -> Result<f64, SimError>;
}

impl<C: CrashPointSource + ?Sized> CrashPointSource for Box<C> {
    fn next_crash_point(&mut self) -> Result<f64, SimError> {
        (**self).next_crash_point()
    }
}

/// Draw one crash point from the base distribution
///
/// The range draw is kept at full precision so it stays uniform within its
/// bucket; round for display only. Output always lies in `[0.01, 25.0]`.
/// Sub-1x outcomes stay below 0.99 and above-1x outcomes start at 1.01.
pub fn generate<S: UnitSource + ?Sized>(source: &mut S) -> Result<f64, SimError> {
    let u = draw(source)?;
    let table: &[Bucket] = if u < SUB_ONE_PROBABILITY {
        &SUB_ONE_BUCKETS
    } else {
        &ABOVE_ONE_BUCKETS
    };

    let selector = draw(source)?;
    let chosen = table
        .iter()
        .find(|b| selector < b.cumulative)
        .unwrap_or(&table[table.len() - 1]);

    let raw = draw_between(source, chosen.lo, chosen.hi)?;
    Ok(raw.clamp(MIN_MULTIPLIER, MAX_CRASH_POINT))
}

/// Base generator owning its random source
#[derive(Debug, Clone)]
pub struct CrashPointGenerator<S> {
    source: S,
}

impl<S: UnitSource> CrashPointGenerator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn generate(&mut self) -> Result<f64, SimError> {
        generate(&mut self.source)
    }
}

impl<S: UnitSource> CrashPointSource for CrashPointGenerator<S> {
    fn next_crash_point(&mut self) -> Result<f64, SimError> {
        self.generate()
    }
}

/// Edge tier: applies `edge` once total bet volume reaches `min_volume`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTier {
    pub min_volume: f64,
    pub edge: f64,
}

/// Scales a source's crash points down by a bet-volume-dependent edge
///
/// A point never crosses 1x: an above-1x base stays at or above 1.01 so the
/// crash still triggers on the way up.
#[derive(Debug, Clone)]
pub struct HouseEdgeAdjusted<C> {
    inner: C,
    /// Sorted ascending by `min_volume`
    tiers: Vec<EdgeTier>,
    bet_volume: f64,
}

impl<C: CrashPointSource> HouseEdgeAdjusted<C> {
    pub fn new(inner: C, mut tiers: Vec<EdgeTier>) -> Self {
        tiers.sort_by(|a, b| a.min_volume.total_cmp(&b.min_volume));
        Self {
            inner,
            tiers,
            bet_volume: 0.0,
        }
    }

    /// Record the bet volume of the round about to start
    pub fn set_bet_volume(&mut self, volume: f64) {
        self.bet_volume = if volume.is_finite() {
            volume.max(0.0)
        } else {
            0.0
        };
    }

    /// Edge for the current bet volume, in [0, 1)
    pub fn current_edge(&self) -> f64 {
        self.tiers
            .iter()
            .rev()
            .find(|t| self.bet_volume >= t.min_volume)
            .map(|t| t.edge.clamp(0.0, 0.99))
            .unwrap_or(0.0)
    }
}

impl<C: CrashPointSource> CrashPointSource for HouseEdgeAdjusted<C> {
    fn next_crash_point(&mut self) -> Result<f64, SimError> {
        let base = self.inner.next_crash_point()?;
        let mut scaled = base * (1.0 - self.current_edge());
        if base >= 1.0 {
            scaled = scaled.max(ABOVE_ONE_BUCKETS[0].lo);
        }
        Ok(scaled.clamp(MIN_MULTIPLIER, MAX_CRASH_POINT))
    }
}
