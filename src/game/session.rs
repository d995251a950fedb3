use serde::Serialize;
use tracing::info;

use crate::config::{ConfigError, GameConfig};
use crate::engine::{Beat, MatchResult, RhythmEngine, ScoreBoard, ScoreSnapshot, Timing};

/// Lifecycle of one play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Start,
    Countdown,
    Playing,
    GameOver,
}

/// Everything the feedback layers need from one press: the raw verdict plus
/// the scoring it produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapOutcome {
    pub result: MatchResult,
    /// Points awarded for this press (0 on a miss).
    pub points: u64,
    /// Perfect-streak milestone completed by this press, if any.
    pub milestone: Option<u32>,
    /// True when this press broke a non-zero combo.
    pub combo_broken: bool,
}

/// One game session: engine and score board owned together, constructed
/// explicitly and handed to the presentation layer. The caller reads its
/// clock and passes timestamps in; the session never looks time up itself.
///
/// Phase flow: Start -> Countdown -> Playing -> GameOver, with `begin`
/// restartable from GameOver. The engine's lead-in doubles as the countdown
/// window, so the first scorable beat lands exactly when play begins.
pub struct GameSession {
    engine: RhythmEngine,
    board: ScoreBoard,
    lead_in_ms: f64,
    phase: SessionPhase,
    started_at_ms: f64,
}

impl GameSession {
    pub fn new(config: &GameConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: RhythmEngine::new(config)?,
            board: ScoreBoard::new(),
            lead_in_ms: config.lead_in_ms,
            phase: SessionPhase::Start,
            started_at_ms: 0.0,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn engine(&self) -> &RhythmEngine {
        &self.engine
    }

    /// Starts (or restarts) the session: fresh score, fresh schedule, and
    /// the countdown running.
    pub fn begin(&mut self, now_ms: f64) {
        self.board.reset();
        self.engine.start(now_ms);
        self.started_at_ms = now_ms;
        self.phase = SessionPhase::Countdown;
        info!(now_ms, "session started");
    }

    /// Advances the phase machine; call once per frame. Countdown ends when
    /// the lead-in elapses, play ends when no beat can score anymore.
    pub fn update(&mut self, now_ms: f64) -> SessionPhase {
        match self.phase {
            SessionPhase::Countdown if now_ms - self.started_at_ms >= self.lead_in_ms => {
                self.phase = SessionPhase::Playing;
                info!(now_ms, "countdown finished, playing");
            }
            SessionPhase::Playing if self.engine.exhausted(now_ms) => {
                self.phase = SessionPhase::GameOver;
                let summary = self.board.snapshot();
                info!(
                    score = summary.score,
                    max_combo = summary.max_combo,
                    perfect_count = summary.perfect_count,
                    "session over"
                );
            }
            _ => {}
        }
        self.phase
    }

    /// 3-2-1 overlay number while counting down, None otherwise.
    pub fn countdown_number(&self, now_ms: f64) -> Option<u32> {
        if self.phase != SessionPhase::Countdown {
            return None;
        }
        let remaining = self.lead_in_ms - (now_ms - self.started_at_ms);
        if remaining <= 0.0 {
            return None;
        }
        Some((remaining / 1000.0).ceil().max(1.0) as u32)
    }

    /// The player pressed now. The one place verdicts are folded into the
    /// score; phases without a live schedule fail safe as misses.
    pub fn tap(&mut self, now_ms: f64) -> TapOutcome {
        if !matches!(self.phase, SessionPhase::Countdown | SessionPhase::Playing) {
            return TapOutcome {
                result: MatchResult::no_match(),
                points: 0,
                milestone: None,
                combo_broken: false,
            };
        }

        let combo_before = self.board.snapshot().combo;
        let result = self.engine.check_player_input(now_ms);
        if let (true, Some(timing)) = (result.hit, result.timing) {
            let hit = self.board.record_hit(result.quality, timing);
            TapOutcome {
                result,
                points: hit.points,
                milestone: hit.milestone,
                combo_broken: false,
            }
        } else {
            self.board.record_miss();
            TapOutcome {
                result,
                points: 0,
                milestone: None,
                combo_broken: combo_before > 0,
            }
        }
    }

    /// Last hit's EARLY/LATE direction, cleared on read.
    pub fn take_timing_feedback(&mut self) -> Option<Timing> {
        self.board.take_timing_feedback()
    }

    /// Re-anchors the schedule to the authoritative audio clock.
    pub fn synchronize(&mut self, audio_start_ms: f64, interval_ms: f64) -> Result<(), ConfigError> {
        self.engine.synchronize(audio_start_ms, interval_ms)
    }

    pub fn visible_beats(&self, now_ms: f64) -> Vec<Beat> {
        self.engine.visible_beats(now_ms)
    }

    pub fn beat_ticks(&mut self, now_ms: f64) -> Vec<usize> {
        self.engine.beat_ticks(now_ms)
    }

    /// Current scoring state; the game-over screen reads this once.
    pub fn summary(&self) -> ScoreSnapshot {
        self.board.snapshot()
    }

    /// Tears the session down to the start screen.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.board.reset();
        self.phase = SessionPhase::Start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BeatQuality;

    fn session() -> GameSession {
        GameSession::new(&GameConfig::default()).unwrap()
    }

    fn short_session() -> GameSession {
        // 4 beats at 120 BPM: 3000, 3500, 4000, 4500.
        let config = GameConfig {
            bpm: 120.0,
            beat_count: 4,
            ..Default::default()
        };
        GameSession::new(&config).unwrap()
    }

    #[test]
    fn phase_flow_start_to_game_over() {
        let mut s = short_session();
        assert_eq!(s.phase(), SessionPhase::Start);

        s.begin(0.0);
        assert_eq!(s.phase(), SessionPhase::Countdown);
        assert_eq!(s.update(1500.0), SessionPhase::Countdown);
        assert_eq!(s.update(3000.0), SessionPhase::Playing);

        // Last beat at 4500 + 500ms acceptance window.
        assert_eq!(s.update(4999.0), SessionPhase::Playing);
        assert_eq!(s.update(5000.0), SessionPhase::GameOver);
    }

    #[test]
    fn countdown_numbers_run_three_two_one() {
        let mut s = session();
        s.begin(0.0);
        assert_eq!(s.countdown_number(0.0), Some(3));
        assert_eq!(s.countdown_number(999.0), Some(3));
        assert_eq!(s.countdown_number(1000.0), Some(2));
        assert_eq!(s.countdown_number(2500.0), Some(1));
        assert_eq!(s.countdown_number(3000.0), None);

        s.update(3000.0);
        assert_eq!(s.countdown_number(3500.0), None);
    }

    #[test]
    fn tap_scores_and_feeds_back() {
        let mut s = session();
        s.begin(0.0);
        s.update(3000.0);

        let outcome = s.tap(3000.0);
        assert!(outcome.result.hit);
        assert_eq!(outcome.result.quality, BeatQuality::Perfect);
        assert_eq!(outcome.points, 100);
        assert_eq!(s.summary().combo, 1);
        assert_eq!(s.take_timing_feedback(), Some(Timing::Perfect));
        assert_eq!(s.take_timing_feedback(), None);
    }

    #[test]
    fn missed_tap_breaks_combo() {
        let mut s = session();
        s.begin(0.0);
        s.update(3000.0);
        s.tap(3000.0);
        assert_eq!(s.summary().combo, 1);

        // Beat 0 is consumed and beat 1 is ~456ms away: too far to score.
        let outcome = s.tap(3005.0);
        assert!(!outcome.result.hit);
        assert!(outcome.combo_broken);
        assert_eq!(s.summary().combo, 0);
        assert_eq!(s.summary().max_combo, 1);
    }

    #[test]
    fn tap_outside_session_changes_nothing() {
        let mut s = session();
        let outcome = s.tap(3000.0);
        assert_eq!(outcome.result, MatchResult::no_match());
        assert!(!outcome.combo_broken);
        assert_eq!(s.summary().score, 0);
    }

    #[test]
    fn milestone_reaches_the_caller() {
        let mut s = session();
        s.begin(0.0);
        s.update(3000.0);

        let interval = s.engine().beat_interval_ms();
        let mut milestones = Vec::new();
        for i in 0..10 {
            let outcome = s.tap(3000.0 + i as f64 * interval);
            assert_eq!(outcome.result.quality, BeatQuality::Perfect);
            if let Some(count) = outcome.milestone {
                milestones.push(count);
            }
        }
        assert_eq!(milestones, vec![10]);
    }

    #[test]
    fn restart_from_game_over_resets_the_score() {
        let mut s = short_session();
        s.begin(0.0);
        s.update(3000.0);
        s.tap(3000.0);
        s.update(10_000.0);
        assert_eq!(s.phase(), SessionPhase::GameOver);
        assert_eq!(s.summary().score, 100);

        s.begin(20_000.0);
        assert_eq!(s.phase(), SessionPhase::Countdown);
        assert_eq!(s.summary().score, 0);
        assert_eq!(s.engine().schedule().beat(0).unwrap().time_ms, 23_000.0);
    }

    #[test]
    fn reset_returns_to_start_screen() {
        let mut s = session();
        s.begin(0.0);
        s.reset();
        assert_eq!(s.phase(), SessionPhase::Start);
        assert!(s.engine().schedule().is_empty());
    }
}
