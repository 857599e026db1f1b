//! OHLC candle aggregation
//!
//! Ticks fold into one open candle; on a tick-count boundary it is frozen
//! into the buffer and a new candle opens at its close. The buffer is kept
//! bounded by merging its oldest candles, with wicks of the merged candle
//! clamped relative to its body.

use serde::{Deserialize, Serialize};

/// One OHLC candle
///
/// Invariant: `low <= min(open, close)` and `high >= max(open, close)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Clock time the candle opened (ms)
    pub start_ms: u64,
    pub tick_count: u32,
}

impl Candle {
    /// Flat candle with every price at `value`
    pub fn flat(value: f64, start_ms: u64) -> Self {
        Self {
            open: value,
            high: value,
            low: value,
            close: value,
            start_ms,
            tick_count: 0,
        }
    }

    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    /// True when the OHLC invariant holds
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.body_low() && self.high >= self.body_high()
    }

    fn fold(&mut self, value: f64) {
        self.high = self.high.max(value);
        self.low = self.low.min(value);
        self.close = value;
        self.tick_count += 1;
    }
}

/// Maximum wick extension allowed beyond a merged body
pub fn max_wick_extension(open: f64, close: f64) -> f64 {
    let body_range = (open - close).abs();
    let price_level = (open + close) / 2.0;
    if body_range > 0.0 {
        (body_range * 0.20).min(price_level * 0.005)
    } else {
        price_level * 0.001
    }
}

/// Merge chronologically ordered candles into one with bounded wicks
///
/// Returns `None` for an empty slice.
pub fn merge_bounded(candles: &[Candle]) -> Option<Candle> {
    let first = candles.first()?;
    let last = candles.last()?;

    let open = first.open;
    let close = last.close;
    let body_high = open.max(close);
    let body_low = open.min(close);
    let max_ext = max_wick_extension(open, close);

    let raw_high = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let raw_low = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    // The raw extremes always contain the body, so these stay well formed
    let high = raw_high.min(body_high + max_ext).max(body_high);
    let low = raw_low.max(body_low - max_ext).min(body_low);

    Some(Candle {
        open,
        high,
        low,
        close,
        start_ms: first.start_ms,
        tick_count: candles.iter().map(|c| c.tick_count).sum(),
    })
}

/// Folds ticks into candles and keeps the buffer bounded
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    ticks_per_candle: u32,
    compaction_threshold: usize,
    batch_size: usize,
    /// Closed candles, oldest first
    buffer: Vec<Candle>,
    current: Option<Candle>,
}

impl CandleAggregator {
    pub fn new(ticks_per_candle: u32, compaction_threshold: usize, batch_size: usize) -> Self {
        Self {
            ticks_per_candle: ticks_per_candle.max(1),
            compaction_threshold,
            batch_size: batch_size.max(2),
            buffer: Vec::with_capacity(compaction_threshold),
            current: None,
        }
    }

    /// Start a new open candle at `start_value`
    ///
    /// Any previous open candle is discarded without being buffered.
    pub fn open_candle(&mut self, start_value: f64, time_ms: u64) {
        self.current = Some(Candle::flat(start_value, time_ms));
    }

    /// Clear the buffer and open a fresh candle (round start)
    pub fn reset(&mut self, start_value: f64, time_ms: u64) {
        self.buffer.clear();
        self.open_candle(start_value, time_ms);
    }

    /// Fold a tick into the open candle; returns true once the candle is full
    ///
    /// Opens a candle at `value` first if none is open.
    pub fn fold(&mut self, value: f64, time_ms: u64) -> bool {
        debug_assert!(value.is_finite());
        let ticks_per_candle = self.ticks_per_candle;
        let candle = self
            .current
            .get_or_insert_with(|| Candle::flat(value, time_ms));
        candle.fold(value);
        candle.tick_count >= ticks_per_candle
    }

    /// Freeze the open candle into the buffer and open the next one at its close
    pub fn finalize(&mut self, time_ms: u64) -> Option<Candle> {
        let frozen = self.current.take()?;
        self.buffer.push(frozen);
        self.current = Some(Candle::flat(frozen.close, time_ms));
        Some(frozen)
    }

    /// Freeze the open candle without opening another
    pub fn close_out(&mut self) -> Option<Candle> {
        let frozen = self.current.take()?;
        self.buffer.push(frozen);
        Some(frozen)
    }

    /// Append the crash candle: opens at the last close and falls to zero
    pub fn push_collapse(&mut self, time_ms: u64) -> Candle {
        let open = self
            .current
            .map(|c| c.close)
            .or_else(|| self.buffer.last().map(|c| c.close))
            .unwrap_or(0.0);
        self.current = None;
        let collapse = Candle {
            open,
            high: open,
            low: 0.0,
            close: 0.0,
            start_ms: time_ms,
            tick_count: 0,
        };
        self.buffer.push(collapse);
        collapse
    }

    /// Merge the oldest batch once if the buffer reached the threshold
    ///
    /// Returns true when a merge happened.
    pub fn maybe_compact(&mut self) -> bool {
        if self.buffer.len() < self.compaction_threshold.max(self.batch_size) {
            return false;
        }
        let Some(merged) = merge_bounded(&self.buffer[..self.batch_size]) else {
            return false;
        };
        self.buffer.splice(..self.batch_size, [merged]);
        log::debug!(
            "Compacted {} candles, buffer now {}",
            self.batch_size,
            self.buffer.len()
        );
        true
    }

    /// Closed candles, oldest first
    pub fn candles(&self) -> &[Candle] {
        &self.buffer
    }

    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Buffered candles plus the open one, oldest first
    pub fn snapshot(&self) -> Vec<Candle> {
        let mut all = self.buffer.clone();
        all.extend(self.current);
        all
    }

    /// Lowest low and highest high across every candle, for axis scaling
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.buffer.iter().chain(self.current.iter());
        let first = iter.next()?;
        Some(iter.fold((first.low, first.high), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        }))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
