//! Round state machine
//!
//! Drives `waiting -> running -> crashed -> waiting` off the virtual clock.
//! The live `Round` owns its timer handles; they are cancelled before any
//! successor round exists, and any delivery tagged with another round (or a
//! handle the round no longer holds) is dropped.

use super::candles::CandleAggregator;
use super::crash_point::{CrashPointGenerator, CrashPointSource};
use super::history::{RoundHistory, RoundRecord};
use super::random::seeded_rng;
use super::round::{Round, RoundEvent, RoundId, RoundPhase, Tick, is_crash};
use super::stepper::{PriceModel, PriceStepper};
use crate::consts::{COUNTDOWN_STEP_MS, START_MULTIPLIER};
use crate::error::{ConfigError, EngineError};
use crate::platform::{Fired, TimerHandle, TimerKind, TimerQueue};
use crate::render::{DisplayState, RenderInterpolator};
use crate::settings::EngineConfig;
use crate::sync::{LogSink, RoundSnapshot, SnapshotSink};

/// Arm a timer into `slot`, refusing if the slot already holds a live one
fn arm(
    clock: &mut TimerQueue,
    slot: &mut Option<TimerHandle>,
    kind: TimerKind,
    round: RoundId,
    period_ms: u64,
    repeating: bool,
) -> Result<(), EngineError> {
    if let Some(existing) = slot.as_ref() {
        if clock.is_live(existing) {
            log::error!("Refusing to arm second {} timer for round {}", kind, round);
            return Err(EngineError::TimerAlreadyArmed {
                kind: kind.as_str(),
                round: round.0,
            });
        }
    }
    let handle = if repeating {
        clock.schedule_repeating(kind, round, period_ms)
    } else {
        clock.schedule_once(kind, round, period_ms)
    };
    *slot = Some(handle);
    Ok(())
}

/// Cancel and forget the timer in `slot`
fn disarm(clock: &mut TimerQueue, slot: &mut Option<TimerHandle>) {
    if let Some(handle) = slot.take() {
        clock.cancel(&handle);
    }
}

/// Crash game round engine
pub struct CrashEngine {
    config: EngineConfig,
    clock: TimerQueue,
    crash_points: Box<dyn CrashPointSource>,
    prices: Box<dyn PriceModel>,
    candles: CandleAggregator,
    interp: RenderInterpolator,
    sink: Box<dyn SnapshotSink>,
    history: RoundHistory,
    round: Option<Round>,
    next_round_id: u64,
    last_tick: Option<Tick>,
    events: Vec<RoundEvent>,
}

impl CrashEngine {
    /// Engine with seeded (or OS-seeded) random sources
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let crash_rng = seeded_rng(config.seed);
        let price_rng = seeded_rng(config.seed.map(|s| s.wrapping_add(1)));
        let volatility = config.volatility;
        Self::with_sources(
            config,
            CrashPointGenerator::new(crash_rng),
            PriceStepper::with_volatility(price_rng, volatility),
        )
    }

    /// Engine with caller-supplied crash point and price sources
    pub fn with_sources(
        config: EngineConfig,
        crash_points: impl CrashPointSource + 'static,
        prices: impl PriceModel + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            candles: CandleAggregator::new(
                config.ticks_per_candle,
                config.compaction_threshold,
                config.compaction_batch_size,
            ),
            interp: RenderInterpolator::new(
                config.interpolation_factor,
                config.render_period_ms as f64,
            ),
            history: RoundHistory::new(config.history_len),
            clock: TimerQueue::new(),
            crash_points: Box::new(crash_points),
            prices: Box::new(prices),
            sink: Box::new(LogSink),
            round: None,
            next_round_id: 1,
            last_tick: None,
            events: Vec::new(),
            config,
        })
    }

    /// Replace the snapshot receiver
    pub fn with_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    // === Commands ===

    /// Begin the round cycle with a fresh countdown
    pub fn start(&mut self) -> Result<RoundId, EngineError> {
        if let Some(round) = &self.round {
            log::warn!("start() while round {} is live", round.id);
            return Err(EngineError::AlreadyStarted(round.id.0));
        }
        self.interp.start();
        match self.begin_waiting(None) {
            Ok(id) => {
                log::info!("Engine started, round {}", id);
                Ok(id)
            }
            Err(e) => {
                log::error!("Fatal engine error on start, stopping: {}", e);
                self.stop();
                Err(e)
            }
        }
    }

    /// Cancel every timer and discard the live round
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(id) = self.teardown() {
            log::info!("Engine stopped, round {} discarded", id);
        }
        self.interp.stop();
    }

    /// Stop, then clear candles, history, and the display
    pub fn reset(&mut self) {
        self.stop();
        self.candles.reset(START_MULTIPLIER, self.clock.now_ms());
        self.history = RoundHistory::new(self.config.history_len);
        self.interp.reset(START_MULTIPLIER);
        self.last_tick = None;
        self.events.clear();
    }

    /// Advance the clock by `elapsed_ms`, firing every timer that comes due
    ///
    /// A broken random source stops the engine and is returned.
    pub fn advance(&mut self, elapsed_ms: u64) -> Result<(), EngineError> {
        let until = self.clock.now_ms() + elapsed_ms;
        while let Some(fired) = self.clock.pop_due(until) {
            if let Err(e) = self.handle_timer(fired) {
                log::error!("Fatal engine error, stopping: {}", e);
                self.stop();
                return Err(e);
            }
        }
        self.clock.settle(until);
        Ok(())
    }

    /// Deliver one fired timer
    ///
    /// Deliveries for a round other than the live one, or for a handle the
    /// live round no longer owns, are discarded.
    pub fn handle_timer(&mut self, fired: Fired) -> Result<(), EngineError> {
        let Some(round) = self.round.as_ref() else {
            log::debug!("Dropped {} timer with no live round", fired.kind);
            return Ok(());
        };
        if round.id != fired.round {
            log::debug!(
                "Dropped stale {} timer from round {} (live {})",
                fired.kind,
                fired.round,
                round.id
            );
            return Ok(());
        }
        let slot = match fired.kind {
            TimerKind::Countdown => &round.timers.countdown,
            TimerKind::SimTick => &round.timers.sim_tick,
            TimerKind::CrashDisplay => &round.timers.crash_display,
            TimerKind::Render => &round.timers.render,
        };
        if slot.as_ref().map(|h| h.id()) != Some(fired.id) {
            log::debug!("Dropped unowned {} timer for round {}", fired.kind, round.id);
            return Ok(());
        }

        match fired.kind {
            TimerKind::Countdown => self.on_countdown(fired.at_ms),
            TimerKind::SimTick => self.on_sim_tick(fired.at_ms),
            TimerKind::CrashDisplay => self.on_crash_display(),
            TimerKind::Render => {
                self.on_render();
                Ok(())
            }
        }
    }

    // === Phase handlers ===

    /// Cancel the live round's timers and drop it
    fn teardown(&mut self) -> Option<RoundId> {
        let mut round = self.round.take()?;
        for handle in round.timers.drain() {
            self.clock.cancel(&handle);
        }
        debug_assert_eq!(self.clock.live_for_round(round.id), 0);
        Some(round.id)
    }

    /// Replace the live round with a fresh one in `waiting`
    fn begin_waiting(&mut self, from: Option<RoundPhase>) -> Result<RoundId, EngineError> {
        self.teardown();

        let id = RoundId(self.next_round_id);
        self.next_round_id += 1;
        let mut round = Round::new(id, self.config.countdown_seconds);

        arm(
            &mut self.clock,
            &mut round.timers.render,
            TimerKind::Render,
            id,
            self.config.render_period_ms,
            true,
        )?;
        self.interp.set_target(round.current_multiplier);

        self.events.push(RoundEvent::PhaseChanged {
            round: id,
            from,
            to: RoundPhase::Waiting,
        });
        log::info!(
            "Round {} waiting ({}s countdown)",
            id,
            self.config.countdown_seconds
        );

        if round.countdown == 0 {
            self.round = Some(round);
            self.begin_running(self.clock.now_ms())?;
        } else {
            arm(
                &mut self.clock,
                &mut round.timers.countdown,
                TimerKind::Countdown,
                id,
                COUNTDOWN_STEP_MS,
                true,
            )?;
            self.round = Some(round);
        }
        Ok(id)
    }

    fn on_countdown(&mut self, now_ms: u64) -> Result<(), EngineError> {
        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        if round.phase != RoundPhase::Waiting {
            return Ok(());
        }
        round.countdown = round.countdown.saturating_sub(1);
        self.events.push(RoundEvent::CountdownTick {
            round: round.id,
            remaining: round.countdown,
        });
        log::debug!("Round {} countdown {}", round.id, round.countdown);

        if round.countdown == 0 {
            disarm(&mut self.clock, &mut round.timers.countdown);
            self.begin_running(now_ms)?;
        }
        Ok(())
    }

    /// Draw the crash point and start the tick clock
    fn begin_running(&mut self, now_ms: u64) -> Result<(), EngineError> {
        let crash_point = self.crash_points.next_crash_point()?;
        let tick_period = self.config.effective_tick_period_ms();

        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        round.advance_phase(RoundPhase::Running);
        round.crash_point = Some(crash_point);
        round.current_multiplier = START_MULTIPLIER;
        round.tick_number = 0;

        self.candles.reset(START_MULTIPLIER, now_ms);
        self.interp.reset(START_MULTIPLIER);
        self.last_tick = None;

        arm(
            &mut self.clock,
            &mut round.timers.sim_tick,
            TimerKind::SimTick,
            round.id,
            tick_period,
            true,
        )?;

        self.events.push(RoundEvent::PhaseChanged {
            round: round.id,
            from: Some(RoundPhase::Waiting),
            to: RoundPhase::Running,
        });
        log::info!(
            "Round {} running, tick {}ms, crash point {:.2}x",
            round.id,
            tick_period,
            crash_point
        );
        Ok(())
    }

    /// One simulation step
    fn on_sim_tick(&mut self, now_ms: u64) -> Result<(), EngineError> {
        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        let (RoundPhase::Running, Some(crash_point)) = (round.phase, round.crash_point) else {
            log::debug!("Sim tick outside running phase for round {}", round.id);
            return Ok(());
        };

        round.tick_number += 1;
        let next = self.prices.step(round.current_multiplier)?;
        let full = self.candles.fold(next, now_ms);
        round.current_multiplier = next;
        let tick = Tick {
            multiplier: next,
            sequence: round.tick_number,
        };
        self.last_tick = Some(tick);
        log::trace!("Round {} tick {} -> {:.4}", round.id, tick.sequence, next);

        if is_crash(crash_point, next) {
            return self.enter_crashed(now_ms);
        }

        if full {
            if let Some(closed) = self.candles.finalize(now_ms) {
                self.events.push(RoundEvent::CandleClosed {
                    round: round.id,
                    close: closed.close,
                });
            }
            if self.candles.maybe_compact() {
                self.events.push(RoundEvent::Compacted {
                    round: round.id,
                    buffer_len: self.candles.len(),
                });
            }
        }

        self.interp.set_target(next);
        self.sink.publish(&RoundSnapshot {
            is_round_active: true,
            current_multiplier: next,
            crash_point,
        });
        Ok(())
    }

    /// Freeze at the crash point, append the collapse candle, hold the display
    fn enter_crashed(&mut self, now_ms: u64) -> Result<(), EngineError> {
        let Some(round) = self.round.as_mut() else {
            return Ok(());
        };
        let Some(crash_point) = round.crash_point else {
            return Ok(());
        };
        debug_assert!(!round.crashed_once, "round crashed twice");
        if round.crashed_once {
            return Ok(());
        }

        disarm(&mut self.clock, &mut round.timers.sim_tick);
        round.advance_phase(RoundPhase::Crashed);
        round.crashed_once = true;
        round.current_multiplier = crash_point;

        if let Some(closed) = self.candles.close_out() {
            self.events.push(RoundEvent::CandleClosed {
                round: round.id,
                close: closed.close,
            });
        }
        self.candles.maybe_compact();
        self.candles.push_collapse(now_ms);
        self.candles.maybe_compact();

        self.interp.set_target(crash_point);
        self.sink.publish(&RoundSnapshot {
            is_round_active: false,
            current_multiplier: crash_point,
            crash_point,
        });
        self.history.push(RoundRecord {
            round: round.id,
            crash_point,
            ticks: round.tick_number,
        });

        self.events.push(RoundEvent::PhaseChanged {
            round: round.id,
            from: Some(RoundPhase::Running),
            to: RoundPhase::Crashed,
        });
        self.events.push(RoundEvent::Crashed {
            round: round.id,
            crash_point,
            ticks: round.tick_number,
        });
        log::info!(
            "Round {} crashed at {:.2}x after {} ticks",
            round.id,
            crash_point,
            round.tick_number
        );

        arm(
            &mut self.clock,
            &mut round.timers.crash_display,
            TimerKind::CrashDisplay,
            round.id,
            self.config.crash_display_ms,
            false,
        )
    }

    fn on_crash_display(&mut self) -> Result<(), EngineError> {
        let phase = self.round.as_ref().map(|r| r.phase);
        if phase != Some(RoundPhase::Crashed) {
            return Ok(());
        }
        self.begin_waiting(Some(RoundPhase::Crashed)).map(|_| ())
    }

    fn on_render(&mut self) {
        if let Some(round) = &self.round {
            self.interp.set_target(round.current_multiplier);
        }
        self.interp.tick(self.config.render_period_ms as f64);
    }

    // === Read access ===

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Timer queue, for inspecting live timers
    pub fn clock(&self) -> &TimerQueue {
        &self.clock
    }

    pub fn round_id(&self) -> Option<RoundId> {
        self.round.as_ref().map(|r| r.id)
    }

    pub fn phase(&self) -> Option<RoundPhase> {
        self.round.as_ref().map(|r| r.phase)
    }

    /// True between `start()` and `stop()`
    pub fn is_started(&self) -> bool {
        self.round.is_some()
    }

    /// Live multiplier; frozen at the crash point once crashed
    pub fn current_multiplier(&self) -> f64 {
        self.round
            .as_ref()
            .map(|r| r.current_multiplier)
            .unwrap_or(START_MULTIPLIER)
    }

    pub fn crash_point(&self) -> Option<f64> {
        self.round.as_ref().and_then(|r| r.crash_point)
    }

    pub fn tick_number(&self) -> u64 {
        self.round.as_ref().map(|r| r.tick_number).unwrap_or(0)
    }

    pub fn countdown(&self) -> Option<u32> {
        self.round
            .as_ref()
            .filter(|r| r.phase == RoundPhase::Waiting)
            .map(|r| r.countdown)
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick
    }

    /// Current state in published form
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            is_round_active: self.round.as_ref().is_some_and(|r| r.is_active()),
            current_multiplier: self.current_multiplier(),
            crash_point: self.crash_point().unwrap_or(0.0),
        }
    }

    pub fn candles(&self) -> &CandleAggregator {
        &self.candles
    }

    pub fn display(&self) -> DisplayState {
        self.interp.state()
    }

    pub fn interpolator(&self) -> &RenderInterpolator {
        &self.interp
    }

    pub fn history(&self) -> &RoundHistory {
        &self.history
    }

    /// Take every queued event
    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::sim::random::ScriptedUnits;
    use crate::sync::SnapshotLog;

    /// Replays fixed multipliers, then holds the last one
    struct ScriptedPrices {
        values: Vec<f64>,
        cursor: usize,
    }

    impl ScriptedPrices {
        fn new(values: &[f64]) -> Self {
            Self {
                values: values.to_vec(),
                cursor: 0,
            }
        }
    }

    impl PriceModel for ScriptedPrices {
        fn step(&mut self, previous: f64) -> Result<f64, SimError> {
            let v = self.values.get(self.cursor).copied().unwrap_or(previous);
            self.cursor += 1;
            Ok(v)
        }
    }

    struct Ramp(f64);

    impl PriceModel for Ramp {
        fn step(&mut self, previous: f64) -> Result<f64, SimError> {
            Ok(previous + self.0)
        }
    }

    struct FixedCrash(f64);

    impl CrashPointSource for FixedCrash {
        fn next_crash_point(&mut self) -> Result<f64, SimError> {
            Ok(self.0)
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            tick_period_ms: 100,
            countdown_seconds: 2,
            crash_display_ms: 500,
            seed: Some(1),
            ..EngineConfig::default()
        }
    }

    fn scripted(crash_point: f64, prices: &[f64]) -> (CrashEngine, SnapshotLog) {
        let log = SnapshotLog::new();
        let engine = CrashEngine::with_sources(
            config(),
            FixedCrash(crash_point),
            ScriptedPrices::new(prices),
        )
        .unwrap()
        .with_sink(log.clone());
        (engine, log)
    }

    #[test]
    fn test_countdown_then_running() {
        let (mut engine, _) = scripted(2.0, &[1.1]);
        let id = engine.start().unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Waiting));
        assert_eq!(engine.countdown(), Some(2));

        engine.advance(1000).unwrap();
        assert_eq!(engine.countdown(), Some(1));

        engine.advance(1000).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Running));
        assert_eq!(engine.round_id(), Some(id));
        assert_eq!(engine.crash_point(), Some(2.0));
        assert_eq!(engine.current_multiplier(), 1.0);
        assert_eq!(engine.clock().live_of_kind(TimerKind::Countdown), 0);
        assert_eq!(engine.clock().live_of_kind(TimerKind::SimTick), 1);
    }

    #[test]
    fn test_sub_one_crash_publishes_crash_point() {
        let (mut engine, log) = scripted(0.75, &[0.9, 0.8, 0.7, 0.6]);
        engine.start().unwrap();
        engine.advance(2000).unwrap();

        engine.advance(200).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Running));
        assert_eq!(engine.current_multiplier(), 0.8);

        engine.advance(100).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Crashed));
        assert_eq!(engine.tick_number(), 3);
        assert_eq!(engine.last_tick().unwrap().multiplier, 0.7);
        assert_eq!(engine.current_multiplier(), 0.75);

        let snaps = log.all();
        assert_eq!(snaps.len(), 3);
        assert!(snaps[..2].iter().all(|s| s.is_round_active));
        let last = snaps[2];
        assert!(!last.is_round_active);
        assert_eq!(last.current_multiplier, 0.75);
        assert_eq!(last.crash_point, 0.75);
        assert_eq!(engine.clock().live_of_kind(TimerKind::SimTick), 0);
    }

    #[test]
    fn test_above_one_crash() {
        let (mut engine, log) = scripted(2.0, &[1.5, 1.9, 2.1]);
        engine.start().unwrap();
        engine.advance(2300).unwrap();

        assert_eq!(engine.phase(), Some(RoundPhase::Crashed));
        assert_eq!(engine.tick_number(), 3);
        assert_eq!(log.last().unwrap().current_multiplier, 2.0);
        assert_eq!(engine.snapshot().current_multiplier, 2.0);
        assert_eq!(engine.history().last().unwrap().crash_point, 2.0);

        // No further ticks while crashed
        engine.advance(400).unwrap();
        assert_eq!(engine.tick_number(), 3);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_collapse_candle_after_crash() {
        let (mut engine, _) = scripted(2.0, &[1.5, 1.9, 2.1]);
        engine.start().unwrap();
        engine.advance(2300).unwrap();

        let candles = engine.candles().candles();
        let collapse = candles.last().unwrap();
        assert_eq!(collapse.close, 0.0);
        assert_eq!(collapse.low, 0.0);
        assert_eq!(collapse.open, 2.1);
        assert!(engine.candles().current().is_none());
        assert!(candles.iter().all(|c| c.is_well_formed()));
    }

    #[test]
    fn test_crash_display_starts_new_round() {
        let (mut engine, _) = scripted(2.0, &[2.5]);
        let first = engine.start().unwrap();
        engine.advance(2100).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Crashed));

        engine.advance(499).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Crashed));

        engine.advance(1).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Waiting));
        assert_ne!(engine.round_id(), Some(first));
        assert_eq!(engine.countdown(), Some(2));
        assert_eq!(engine.clock().live_for_round(first), 0);
        // Countdown + render for the new round, nothing else
        assert_eq!(engine.clock().live_count(), 2);
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let (mut engine, log) = scripted(25.0, &[1.1, 1.2, 1.3]);
        let first = engine.start().unwrap();
        engine.advance(2100).unwrap();
        assert_eq!(engine.tick_number(), 1);

        // Pull a sim tick for the first round straight off the queue
        let stale = loop {
            let fired = engine.clock.pop_due(u64::MAX).unwrap();
            if fired.kind == TimerKind::SimTick {
                break fired;
            }
        };
        assert_eq!(stale.round, first);

        engine.stop();
        let second = engine.start().unwrap();
        assert_ne!(first, second);
        let published = log.len();

        engine.handle_timer(stale).unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Waiting));
        assert_eq!(engine.tick_number(), 0);
        assert_eq!(log.len(), published);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let (mut engine, _) = scripted(2.0, &[]);
        let id = engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyStarted(n)) if n == id.0));
        assert_eq!(engine.clock().live_of_kind(TimerKind::Countdown), 1);
        assert_eq!(engine.clock().live_of_kind(TimerKind::Render), 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_halts_clocks() {
        let (mut engine, log) = scripted(25.0, &[1.1, 1.2, 1.3, 1.4]);
        engine.start().unwrap();
        engine.advance(2200).unwrap();
        assert!(engine.interpolator().is_running());

        engine.stop();
        engine.stop();
        assert!(!engine.is_started());
        assert_eq!(engine.clock().live_count(), 0);
        assert!(!engine.interpolator().is_running());

        let display = engine.display();
        let published = log.len();
        engine.advance(5000).unwrap();
        assert_eq!(engine.display(), display);
        assert_eq!(log.len(), published);
    }

    #[test]
    fn test_arm_refuses_duplicate() {
        let mut clock = TimerQueue::new();
        let mut slot = None;
        let round = RoundId(9);
        arm(&mut clock, &mut slot, TimerKind::SimTick, round, 100, true).unwrap();
        let err = arm(&mut clock, &mut slot, TimerKind::SimTick, round, 100, true);
        assert!(matches!(err, Err(EngineError::TimerAlreadyArmed { .. })));
        assert_eq!(clock.live_count(), 1);

        disarm(&mut clock, &mut slot);
        disarm(&mut clock, &mut slot);
        assert_eq!(clock.live_count(), 0);
        arm(&mut clock, &mut slot, TimerKind::SimTick, round, 100, true).unwrap();
    }

    #[test]
    fn test_candles_close_on_boundary() {
        let log = SnapshotLog::new();
        let mut engine = CrashEngine::with_sources(config(), FixedCrash(25.0), Ramp(0.01))
            .unwrap()
            .with_sink(log);
        engine.start().unwrap();
        engine.advance(2000 + 12 * 100).unwrap();

        assert_eq!(engine.tick_number(), 12);
        assert_eq!(engine.candles().len(), 2);
        assert_eq!(engine.candles().current().unwrap().tick_count, 2);
        let closes: Vec<f64> = engine
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                RoundEvent::CandleClosed { close, .. } => Some(close),
                _ => None,
            })
            .collect();
        assert_eq!(closes.len(), 2);
        assert!((closes[0] - 1.05).abs() < 1e-9);
        assert!((closes[1] - 1.10).abs() < 1e-9);
    }

    #[test]
    fn test_compaction_bounds_buffer() {
        let config = EngineConfig {
            ticks_per_candle: 1,
            ..config()
        };
        let mut engine = CrashEngine::with_sources(config, FixedCrash(25.0), Ramp(0.001)).unwrap();
        engine.start().unwrap();
        engine.advance(2000 + 100 * 100).unwrap();

        assert_eq!(engine.tick_number(), 100);
        assert!(engine.candles().len() < 30);
        assert!(engine.candles().len() >= 28);
        assert!(
            engine
                .drain_events()
                .iter()
                .any(|e| matches!(e, RoundEvent::Compacted { .. }))
        );
    }

    #[test]
    fn test_broken_random_source_is_fatal() {
        let mut engine = CrashEngine::with_sources(
            config(),
            FixedCrash(2.0),
            PriceStepper::new(ScriptedUnits::new([f64::NAN])),
        )
        .unwrap();
        engine.start().unwrap();
        let err = engine.advance(3000).unwrap_err();
        assert!(matches!(err, EngineError::Sim(SimError::NonFiniteRandom(_))));
        assert!(!engine.is_started());
        assert_eq!(engine.clock().live_count(), 0);
    }

    #[test]
    fn test_broken_crash_source_on_start_stops_engine() {
        let config = EngineConfig {
            countdown_seconds: 0,
            ..config()
        };
        let mut engine = CrashEngine::with_sources(
            config,
            CrashPointGenerator::new(ScriptedUnits::new([f64::NAN])),
            ScriptedPrices::new(&[1.2]),
        )
        .unwrap();

        let err = engine.start().unwrap_err();
        assert!(matches!(err, EngineError::Sim(SimError::NonFiniteRandom(_))));
        assert!(!engine.is_started());
        assert_eq!(engine.phase(), None);
        assert_eq!(engine.clock().live_count(), 0);
        assert!(!engine.interpolator().is_running());

        // Nothing left behind to fire, and start() is not locked out
        engine.advance(60_000).unwrap();
        assert_eq!(engine.tick_number(), 0);
        assert!(matches!(engine.start(), Err(EngineError::Sim(_))));
        assert!(!engine.is_started());
    }

    #[test]
    fn test_display_follows_multiplier() {
        let (mut engine, _) = scripted(25.0, &[2.0]);
        engine.start().unwrap();
        engine.advance(2100).unwrap();
        assert_eq!(engine.current_multiplier(), 2.0);

        let before = engine.display().displayed_multiplier;
        engine.advance(16).unwrap();
        let after = engine.display().displayed_multiplier;
        assert!(after > before && after < 2.0);

        engine.advance(5000).unwrap();
        assert_eq!(engine.display().displayed_multiplier, 2.0);
    }

    #[test]
    fn test_zero_countdown_runs_immediately() {
        let config = EngineConfig {
            countdown_seconds: 0,
            ..config()
        };
        let mut engine =
            CrashEngine::with_sources(config, FixedCrash(2.0), ScriptedPrices::new(&[1.2]))
                .unwrap();
        engine.start().unwrap();
        assert_eq!(engine.phase(), Some(RoundPhase::Running));
        assert_eq!(engine.clock().live_of_kind(TimerKind::Countdown), 0);
    }
}
