//! Crash Chart headless runner
//!
//! Plays a few rounds on the virtual clock at display frame pace and logs
//! what happens. Usage: `crash-chart [seed] [config.json]`.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use crash_chart::sim::RoundEvent;
    use crash_chart::{CrashEngine, EngineConfig};

    /// Frame length the host loop steps by (ms)
    const FRAME_MS: u64 = 16;
    /// Rounds to play before exiting
    const ROUNDS: usize = 5;
    /// Give up after this much virtual time (ms)
    const MAX_VIRTUAL_MS: u64 = 30 * 60 * 1000;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().map(|s| s.parse::<u64>()).transpose()?;
    let mut config = match args.next() {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::test_mode(20),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    log::info!("Crash Chart starting (seed: {:?})", config.seed);

    let mut engine = CrashEngine::new(config)?;
    engine.start()?;

    let mut crashed = 0;
    while crashed < ROUNDS && engine.now_ms() < MAX_VIRTUAL_MS {
        engine.advance(FRAME_MS)?;
        for event in engine.drain_events() {
            if let RoundEvent::Crashed {
                round,
                crash_point,
                ticks,
            } = event
            {
                crashed += 1;
                log::info!(
                    "Round {} busted at {:.2}x after {} ticks, {} candles on chart",
                    round,
                    crash_point,
                    ticks,
                    engine.candles().len()
                );
            }
        }
    }
    engine.stop();

    let history = engine.history();
    if let (Some(avg), Some(below)) = (history.average(), history.fraction_below(1.0)) {
        log::info!(
            "{} rounds, average crash {:.2}x, {:.0}% below 1x",
            history.len(),
            avg,
            below * 100.0
        );
    }
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on wasm; the host page drives the engine
}
