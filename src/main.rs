use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use beatdrop::config::GameConfig;
use beatdrop::game::{GameSession, SessionPhase};
use beatdrop::traits::{MockTimeProvider, TimeProvider};
use beatdrop::util::init_logging;

/// Headless session simulator: drives a full game session with a synthetic
/// player, the way the presentation layer would drive the library.
#[derive(Parser, Debug)]
#[command(name = "beatdrop", version, about)]
struct Args {
    /// Path to a GameConfig JSON file (defaults when absent).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured BPM.
    #[arg(long)]
    bpm: Option<f64>,

    /// Override the configured beat count.
    #[arg(long)]
    beats: Option<usize>,

    /// RNG seed for the synthetic player.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Maximum press offset from the beat, in ms.
    #[arg(long, default_value_t = 120.0)]
    jitter_ms: f64,

    /// Probability the player skips a beat entirely.
    #[arg(long, default_value_t = 0.05)]
    skip_rate: f64,

    /// Clock drift injected mid-session via resynchronization, in ms.
    #[arg(long, default_value_t = 0.0)]
    drift_ms: f64,

    /// Also write logs to this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.log_dir.as_deref())?;

    let mut config = match &args.config {
        Some(path) => GameConfig::load_from(path)?,
        None => GameConfig::load()?,
    };
    if let Some(bpm) = args.bpm {
        config.bpm = bpm;
    }
    if let Some(beats) = args.beats {
        config.beat_count = beats;
    }

    let mut session = GameSession::new(&config)?;
    let clock = MockTimeProvider::new();
    let mut player = SyntheticPlayer::new(&args);

    session.begin(clock.now_ms());
    player.plan(&session);
    info!(bpm = config.bpm, beats = config.beat_count, seed = args.seed, "simulating session");

    // Fixed 16ms frames, accelerated through the mock clock.
    let mut drift_applied = args.drift_ms == 0.0;
    loop {
        clock.advance(16.0);
        let now = clock.now_ms();

        if session.update(now) == SessionPhase::GameOver {
            break;
        }
        if let Some(n) = session.countdown_number(now) {
            debug!(n, "countdown");
        }
        for index in session.beat_ticks(now) {
            debug!(index, "beat marker due");
        }

        if !drift_applied && player.halfway(now) {
            let anchor = player.first_beat_ms + args.drift_ms;
            session.synchronize(anchor, session.engine().beat_interval_ms())?;
            player.shift_pending(args.drift_ms);
            info!(drift_ms = args.drift_ms, "resynchronized to drifted audio clock");
            drift_applied = true;
        }

        while let Some(press_ms) = player.next_press_before(now) {
            let outcome = session.tap(press_ms);
            info!(
                press_ms,
                hit = outcome.result.hit,
                quality = ?outcome.result.quality,
                points = outcome.points,
                combo = session.summary().combo,
                "tap"
            );
            if let Some(count) = outcome.milestone {
                info!(count, "perfect milestone!");
            }
        }
    }

    let summary = session.summary();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Plays each scheduled beat with seeded jitter, skipping some.
struct SyntheticPlayer {
    rng: StdRng,
    jitter_ms: f64,
    skip_rate: f64,
    first_beat_ms: f64,
    last_beat_ms: f64,
    presses: Vec<f64>,
    next: usize,
}

impl SyntheticPlayer {
    fn new(args: &Args) -> Self {
        Self {
            rng: StdRng::seed_from_u64(args.seed),
            jitter_ms: args.jitter_ms.max(0.0),
            skip_rate: args.skip_rate.clamp(0.0, 1.0),
            first_beat_ms: 0.0,
            last_beat_ms: 0.0,
            presses: Vec::new(),
            next: 0,
        }
    }

    /// Rolls one press per scheduled beat. Must run after `begin`.
    fn plan(&mut self, session: &GameSession) {
        let beats = session.engine().schedule().beats();
        self.first_beat_ms = beats.first().map_or(0.0, |b| b.time_ms);
        self.last_beat_ms = beats.last().map_or(0.0, |b| b.time_ms);
        let mut presses = Vec::with_capacity(beats.len());
        for beat in beats {
            if self.rng.gen_bool(self.skip_rate) {
                continue;
            }
            let jitter = if self.jitter_ms > 0.0 {
                self.rng.gen_range(-self.jitter_ms..=self.jitter_ms)
            } else {
                0.0
            };
            presses.push(beat.time_ms + jitter);
        }
        self.presses = presses;
        self.next = 0;
    }

    fn halfway(&self, now_ms: f64) -> bool {
        now_ms >= (self.first_beat_ms + self.last_beat_ms) / 2.0
    }

    /// Shifts presses not yet delivered, mirroring a schedule rebase.
    fn shift_pending(&mut self, delta_ms: f64) {
        for press in &mut self.presses[self.next..] {
            *press += delta_ms;
        }
    }

    fn next_press_before(&mut self, now_ms: f64) -> Option<f64> {
        let press = *self.presses.get(self.next)?;
        if press <= now_ms {
            self.next += 1;
            Some(press)
        } else {
            None
        }
    }
}
