// Rhythm core: beat scheduling, hit matching, scoring, and tick generation.

pub mod judge;
pub mod schedule;
pub mod score;
pub mod ticker;

pub use judge::{JudgeWindows, MatchResult};
pub use schedule::{Beat, BeatQuality, BeatSchedule, Timing};
pub use score::{HitPoints, ScoreBoard, ScoreSnapshot};
pub use ticker::BeatTicker;

use tracing::info;

use crate::config::{ConfigError, GameConfig};

/// The orchestrating core: owns the beat schedule and the matcher, driven by
/// timestamps the caller reads from its clock. Scoring policy stays outside
/// (see `game::GameSession`); the engine only produces verdicts.
pub struct RhythmEngine {
    interval_ms: f64,
    beat_count: usize,
    lead_in_ms: f64,
    visibility_ms: f64,
    windows: JudgeWindows,
    schedule: BeatSchedule,
    ticker: BeatTicker,
}

impl RhythmEngine {
    /// Builds an engine from a validated configuration. The only fatal
    /// error the core can produce surfaces here.
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            interval_ms: config.beat_interval_ms(),
            beat_count: config.beat_count,
            lead_in_ms: config.lead_in_ms,
            visibility_ms: config.visibility_ms,
            windows: config.windows,
            schedule: BeatSchedule::empty(),
            ticker: BeatTicker::new(),
        })
    }

    pub fn beat_interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn bpm(&self) -> f64 {
        60_000.0 / self.interval_ms
    }

    pub fn windows(&self) -> &JudgeWindows {
        &self.windows
    }

    pub fn schedule(&self) -> &BeatSchedule {
        &self.schedule
    }

    /// First beat lands at `start_ms + lead_in`, giving the player the
    /// countdown window. Calling again replaces the schedule wholesale.
    pub fn start(&mut self, start_ms: f64) {
        let first_beat_ms = start_ms + self.lead_in_ms;
        self.schedule = BeatSchedule::generate(first_beat_ms, self.interval_ms, self.beat_count)
            .expect("interval and count are validated at construction");
        self.ticker.anchor(first_beat_ms, self.interval_ms, self.beat_count);
        info!(
            first_beat_ms,
            interval_ms = self.interval_ms,
            beats = self.beat_count,
            "schedule started"
        );
    }

    /// Re-anchors to an authoritative audio clock mid-session: unconsumed
    /// beats move onto the new grid (no lead-in), consumed beats keep their
    /// verdicts. Starts a fresh schedule if none is live.
    pub fn synchronize(&mut self, audio_start_ms: f64, interval_ms: f64) -> Result<(), ConfigError> {
        if self.schedule.is_empty() {
            self.schedule = BeatSchedule::generate(audio_start_ms, interval_ms, self.beat_count)?;
            self.ticker.anchor(audio_start_ms, interval_ms, self.beat_count);
        } else {
            self.schedule.rebase(audio_start_ms, interval_ms)?;
            self.ticker.re_anchor(audio_start_ms, interval_ms);
        }
        self.interval_ms = interval_ms;
        info!(audio_start_ms, interval_ms, "schedule resynchronized");
        Ok(())
    }

    /// Drops the schedule; all queries fail safe until `start` is called.
    pub fn reset(&mut self) {
        self.schedule = BeatSchedule::empty();
        self.ticker.clear();
    }

    /// Matches a press against the live schedule. An engine that has not
    /// started (or a clock still at zero) yields a plain no-match.
    pub fn check_player_input(&mut self, now_ms: f64) -> MatchResult {
        self.windows.judge(&mut self.schedule, now_ms)
    }

    /// Beats the render layer should draw right now, with the configured
    /// look-ahead window.
    pub fn visible_beats(&self, now_ms: f64) -> Vec<Beat> {
        self.schedule.visible(now_ms, self.visibility_ms)
    }

    /// Same, with an explicit look-ahead window in ms.
    pub fn visible_beats_within(&self, now_ms: f64, window_ms: f64) -> Vec<Beat> {
        self.schedule.visible(now_ms, window_ms)
    }

    /// Beat indices whose time arrived since the last poll, for spawning
    /// visual markers in sync with the track.
    pub fn beat_ticks(&mut self, now_ms: f64) -> Vec<usize> {
        self.ticker.poll(now_ms)
    }

    /// True once every beat is either consumed or past the acceptance
    /// window, so no press can score again.
    pub fn exhausted(&self, now_ms: f64) -> bool {
        match self.schedule.last_time_ms() {
            Some(last) => now_ms - last >= self.windows.accept_ms,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_130bpm() -> RhythmEngine {
        RhythmEngine::new(&GameConfig::default()).unwrap()
    }

    #[test]
    fn new_rejects_invalid_bpm() {
        let config = GameConfig {
            bpm: 0.0,
            ..Default::default()
        };
        assert!(matches!(RhythmEngine::new(&config), Err(ConfigError::InvalidBpm(_))));
    }

    #[test]
    fn end_to_end_first_perfect_hit() {
        // BPM 130 -> ~461.54ms interval; start(0) with 3000ms lead-in puts
        // beat 0 at t=3000.
        let mut engine = engine_130bpm();
        engine.start(0.0);
        assert_eq!(engine.schedule().beat(0).unwrap().time_ms, 3000.0);

        let result = engine.check_player_input(3000.0);
        assert!(result.hit);
        assert_eq!(result.quality, BeatQuality::Perfect);
        assert_eq!(result.beat_index, Some(0));

        // Same press again: beat 0 is consumed and beat 1 (~461.5ms away)
        // is inside the acceptance window but far outside the ok tier.
        let again = engine.check_player_input(3000.0);
        assert!(!again.hit);
        assert_eq!(again.quality, BeatQuality::Miss);
    }

    #[test]
    fn input_before_start_is_a_safe_miss() {
        let mut engine = engine_130bpm();
        assert_eq!(engine.check_player_input(0.0), MatchResult::no_match());
        assert!(engine.visible_beats(0.0).is_empty());
    }

    #[test]
    fn restart_replaces_the_schedule() {
        let mut engine = engine_130bpm();
        engine.start(0.0);
        engine.check_player_input(3000.0);
        assert!(engine.schedule().beat(0).unwrap().consumed);

        engine.start(10_000.0);
        assert_eq!(engine.schedule().beat(0).unwrap().time_ms, 13_000.0);
        assert!(!engine.schedule().beat(0).unwrap().consumed);
    }

    #[test]
    fn reset_empties_schedule_until_next_start() {
        let mut engine = engine_130bpm();
        engine.start(0.0);
        engine.reset();
        assert!(engine.schedule().is_empty());
        assert_eq!(engine.check_player_input(3000.0), MatchResult::no_match());
        assert!(engine.beat_ticks(100_000.0).is_empty());
    }

    #[test]
    fn synchronize_rebases_unconsumed_only() {
        let mut engine = engine_130bpm();
        engine.start(0.0);
        engine.check_player_input(3000.0); // consume beat 0

        engine.synchronize(3010.0, 500.0).unwrap();
        assert_eq!(engine.beat_interval_ms(), 500.0);
        // Consumed beat untouched, future beats on the new grid.
        assert_eq!(engine.schedule().beat(0).unwrap().time_ms, 3000.0);
        assert_eq!(engine.schedule().beat(1).unwrap().time_ms, 3510.0);
        assert_eq!(engine.schedule().beat(2).unwrap().time_ms, 4010.0);
    }

    #[test]
    fn synchronize_rejects_bad_interval() {
        let mut engine = engine_130bpm();
        engine.start(0.0);
        assert!(engine.synchronize(0.0, -1.0).is_err());
        // Failed sync leaves the engine's interval alone.
        assert!((engine.beat_interval_ms() - 60_000.0 / 130.0).abs() < 1e-9);
    }

    #[test]
    fn synchronize_without_start_generates_without_lead_in() {
        let mut engine = engine_130bpm();
        engine.synchronize(500.0, 400.0).unwrap();
        assert_eq!(engine.schedule().beat(0).unwrap().time_ms, 500.0);
    }

    #[test]
    fn visible_beats_use_configured_window() {
        let mut engine = engine_130bpm();
        engine.start(0.0);
        // At t=3000 the default 2000ms window shows beats within
        // (2000, 5000) exclusive: 3000, 3461.5..., 3923.0..., 4384.6..., 4846.1...
        assert_eq!(engine.visible_beats(3000.0).len(), 5);
        assert_eq!(engine.visible_beats_within(3000.0, 400.0).len(), 1);
    }

    #[test]
    fn beat_ticks_follow_the_schedule() {
        let mut engine = engine_130bpm();
        engine.start(0.0);
        assert!(engine.beat_ticks(2999.0).is_empty());
        assert_eq!(engine.beat_ticks(3000.0), vec![0]);
        assert_eq!(engine.beat_ticks(3470.0), vec![1]);
    }

    #[test]
    fn exhausted_after_last_beat_plus_window() {
        let mut engine = engine_130bpm();
        assert!(!engine.exhausted(1e9));

        engine.start(0.0);
        let last = engine.schedule().last_time_ms().unwrap();
        assert!(!engine.exhausted(last));
        assert!(!engine.exhausted(last + 499.0));
        assert!(engine.exhausted(last + 500.0));
    }
}
