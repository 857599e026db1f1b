//! Injectable uniform random source
//!
//! Every stochastic draw in the simulation goes through `UnitSource` so that
//! tests can script exact sequences. Draws are validated before use: a broken
//! source is a fatal error, never silently coerced.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::error::SimError;

/// Source of uniform values in [0, 1)
pub trait UnitSource {
    fn next_unit(&mut self) -> f64;
}

impl UnitSource for Pcg32 {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl<S: UnitSource + ?Sized> UnitSource for &mut S {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<S: UnitSource + ?Sized> UnitSource for Box<S> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Seeded RNG, or OS-seeded when no seed is given
pub fn seeded_rng(seed: Option<u64>) -> Pcg32 {
    match seed {
        Some(seed) => Pcg32::seed_from_u64(seed),
        None => Pcg32::from_os_rng(),
    }
}

/// Draw one validated unit value
pub fn draw<S: UnitSource + ?Sized>(source: &mut S) -> Result<f64, SimError> {
    let u = source.next_unit();
    if !u.is_finite() {
        return Err(SimError::NonFiniteRandom(u));
    }
    if !(0.0..1.0).contains(&u) {
        return Err(SimError::RandomOutOfRange(u));
    }
    Ok(u)
}

/// Uniform draw in [lo, hi]
pub fn draw_between<S: UnitSource + ?Sized>(
    source: &mut S,
    lo: f64,
    hi: f64,
) -> Result<f64, SimError> {
    Ok(lo + (hi - lo) * draw(source)?)
}

/// Replays a fixed list of unit values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedUnits {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedUnits {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl UnitSource for ScriptedUnits {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let u = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        u
    }
}
