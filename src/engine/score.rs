use serde::Serialize;
use tracing::info;

use crate::engine::schedule::{BeatQuality, Timing};

/// Every this many perfects, a flat bonus lands on top of the hit points.
pub const PERFECT_MILESTONE_INTERVAL: u32 = 10;
pub const PERFECT_MILESTONE_BONUS: u64 = 500;

/// Each combo step adds 10% to the base points, capped at 4x total.
const COMBO_STEP: f64 = 0.1;
const COMBO_BONUS_CAP: f64 = 3.0;

/// Points awarded for one scored hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitPoints {
    /// Base points with the combo multiplier applied.
    pub points: u64,
    /// Set when this hit completed a perfect-streak milestone; carries the
    /// perfect count reached. The +500 bonus is already in the score.
    pub milestone: Option<u32>,
}

/// UI-facing scoring state, polled by overlays and read once at game over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSnapshot {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_count: u32,
}

/// Score / combo / milestone state machine.
///
/// Invariants: score never decreases, `max_combo >= combo` always, and the
/// combo resets to zero exactly when a press fails to hit.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    score: u64,
    combo: u32,
    max_combo: u32,
    perfect_count: u32,
    timing_feedback: Option<Timing>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a successful match into the score. The combo multiplier uses
    /// the combo as it stood *before* this hit.
    pub fn record_hit(&mut self, quality: BeatQuality, timing: Timing) -> HitPoints {
        let base: u64 = match quality {
            BeatQuality::Perfect => 100,
            BeatQuality::Good => 50,
            BeatQuality::Ok => 10,
            BeatQuality::Miss => 0,
        };

        let multiplier = 1.0 + (self.combo as f64 * COMBO_STEP).min(COMBO_BONUS_CAP);
        let points = (base as f64 * multiplier).floor() as u64;

        let mut milestone = None;
        if quality == BeatQuality::Perfect {
            self.perfect_count += 1;
            if self.perfect_count % PERFECT_MILESTONE_INTERVAL == 0 {
                self.score += PERFECT_MILESTONE_BONUS;
                milestone = Some(self.perfect_count);
                info!(perfect_count = self.perfect_count, "perfect streak milestone");
            }
        }

        self.score += points;
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.timing_feedback = Some(timing);

        HitPoints { points, milestone }
    }

    /// A press that hit nothing: the combo breaks, the score stands.
    pub fn record_miss(&mut self) {
        self.combo = 0;
        self.timing_feedback = None;
    }

    /// Last hit's timing direction, cleared on read. The display layer
    /// consumes this once per hit for EARLY/LATE feedback.
    pub fn take_timing_feedback(&mut self) -> Option<Timing> {
        self.timing_feedback.take()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            score: self.score,
            combo: self.combo,
            max_combo: self.max_combo,
            perfect_count: self.perfect_count,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
