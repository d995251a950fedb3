use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::engine::schedule::{BeatQuality, BeatSchedule, Timing};

/// Timing windows for classifying a press against its nearest beat, in ms.
/// Applied to the absolute press offset; `accept_ms` bounds which beats are
/// candidates at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeWindows {
    pub perfect_ms: f64,
    pub good_ms: f64,
    pub ok_ms: f64,
    pub accept_ms: f64,
}

impl Default for JudgeWindows {
    fn default() -> Self {
        Self {
            perfect_ms: 50.0,
            good_ms: 150.0,
            ok_ms: 300.0,
            accept_ms: 500.0,
        }
    }
}

/// Verdict for a single press. `hit` is false both when nothing was in the
/// acceptance window (`beat_index` is None) and when the nearest candidate
/// was too far off to consume (`beat_index` names it, for display feedback).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub hit: bool,
    pub quality: BeatQuality,
    pub beat_index: Option<usize>,
    pub timing: Option<Timing>,
}

impl MatchResult {
    /// No beat within the acceptance window. A normal outcome, never an error.
    pub fn no_match() -> Self {
        Self {
            hit: false,
            quality: BeatQuality::Miss,
            beat_index: None,
            timing: None,
        }
    }
}

impl JudgeWindows {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.perfect_ms, self.good_ms, self.ok_ms, self.accept_ms];
        if all.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ConfigError::InvalidWindows(
                "windows must be positive finite ms",
            ));
        }
        if !(self.perfect_ms < self.good_ms && self.good_ms < self.ok_ms && self.ok_ms < self.accept_ms)
        {
            return Err(ConfigError::InvalidWindows(
                "windows must be strictly ascending: perfect < good < ok < accept",
            ));
        }
        Ok(())
    }

    /// Matches a press at `press_ms` against the schedule.
    ///
    /// Scans unconsumed beats, keeps candidates within `accept_ms`, and
    /// selects the one nearest in time. A Perfect/Good/Ok verdict consumes
    /// the selected beat before returning; a miss consumes nothing.
    pub fn judge(&self, schedule: &mut BeatSchedule, press_ms: f64) -> MatchResult {
        // Linear scan; schedules are O(100) beats.
        let mut nearest: Option<(usize, f64)> = None;
        for (index, beat) in schedule.unconsumed() {
            let diff = press_ms - beat.time_ms;
            if diff.abs() >= self.accept_ms {
                continue;
            }
            match nearest {
                Some((_, best)) if diff.abs() >= best.abs() => {}
                _ => nearest = Some((index, diff)),
            }
        }

        let Some((index, diff)) = nearest else {
            return MatchResult::no_match();
        };

        let abs = diff.abs();
        let (quality, timing) = if abs < self.perfect_ms {
            (BeatQuality::Perfect, Timing::Perfect)
        } else if abs < self.good_ms {
            (BeatQuality::Good, direction_of(diff))
        } else if abs < self.ok_ms {
            (BeatQuality::Ok, direction_of(diff))
        } else {
            // In the acceptance window but too far off: report the target,
            // consume nothing.
            debug!(beat_index = index, offset_ms = diff, "press missed nearest beat");
            return MatchResult {
                hit: false,
                quality: BeatQuality::Miss,
                beat_index: Some(index),
                timing: None,
            };
        };

        schedule.consume(index, quality, timing);
        debug!(beat_index = index, offset_ms = diff, ?quality, "beat consumed");
        MatchResult {
            hit: true,
            quality,
            beat_index: Some(index),
            timing: Some(timing),
        }
    }
}

fn direction_of(diff: f64) -> Timing {
    if diff < 0.0 { Timing::Early } else { Timing::Late }
}
