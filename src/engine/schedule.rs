use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// How long a beat stays visible after its due time, for fade-out animation.
pub const FADE_OUT_MS: f64 = 1000.0;

/// Quality tiers, in decreasing order of timing precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeatQuality {
    Perfect,
    Good,
    Ok,
    Miss,
}

impl BeatQuality {
    /// Whether this quality counts as a scorable hit.
    pub fn is_hit(self) -> bool {
        !matches!(self, Self::Miss)
    }
}

/// Direction of the press offset relative to the matched beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    Early,
    Perfect,
    Late,
}

/// A scheduled rhythmic event. Consumed at most once, by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Beat {
    /// Absolute due time on the shared clock, in ms.
    pub time_ms: f64,
    pub consumed: bool,
    pub quality: Option<BeatQuality>,
    pub timing: Option<Timing>,
}

impl Beat {
    fn at(time_ms: f64) -> Self {
        Self {
            time_ms,
            consumed: false,
            quality: None,
            timing: None,
        }
    }
}

/// Ordered sequence of beats on a fixed interval grid, strictly increasing
/// in time. The sole source of truth for what counts as a beat.
#[derive(Debug, Clone, Default)]
pub struct BeatSchedule {
    beats: Vec<Beat>,
}

impl BeatSchedule {
    /// Generates `count` beats at `start_ms + i * interval_ms`.
    ///
    /// Pure in its inputs: identical arguments yield an identical schedule.
    /// Regeneration discards all prior consumption state.
    pub fn generate(start_ms: f64, interval_ms: f64, count: usize) -> Result<Self, ConfigError> {
        if !interval_ms.is_finite() || interval_ms <= 0.0 {
            return Err(ConfigError::InvalidInterval(interval_ms));
        }
        if count == 0 {
            return Err(ConfigError::ZeroBeatCount);
        }
        let beats = (0..count)
            .map(|i| Beat::at(start_ms + i as f64 * interval_ms))
            .collect();
        Ok(Self { beats })
    }

    /// A schedule with no beats: every query fails safe as a miss.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn beat(&self, index: usize) -> Option<&Beat> {
        self.beats.get(index)
    }

    /// Due time of the final beat, if any.
    pub fn last_time_ms(&self) -> Option<f64> {
        self.beats.last().map(|b| b.time_ms)
    }

    /// Re-anchors every **unconsumed** beat onto the grid
    /// `start_ms + i * interval_ms`. Consumed beats keep their recorded
    /// time and verdict, so resynchronization never un-judges a hit.
    pub fn rebase(&mut self, start_ms: f64, interval_ms: f64) -> Result<(), ConfigError> {
        if !interval_ms.is_finite() || interval_ms <= 0.0 {
            return Err(ConfigError::InvalidInterval(interval_ms));
        }
        for (i, beat) in self.beats.iter_mut().enumerate() {
            if !beat.consumed {
                beat.time_ms = start_ms + i as f64 * interval_ms;
            }
        }
        Ok(())
    }

    /// Marks a beat consumed with its verdict. Returns false if the beat was
    /// already consumed (at-most-once) or the index is out of range.
    pub(crate) fn consume(&mut self, index: usize, quality: BeatQuality, timing: Timing) -> bool {
        match self.beats.get_mut(index) {
            Some(beat) if !beat.consumed => {
                beat.consumed = true;
                beat.quality = Some(quality);
                beat.timing = Some(timing);
                true
            }
            _ => false,
        }
    }

    /// Unconsumed beats with their schedule indices, for the matcher.
    pub(crate) fn unconsumed(&self) -> impl Iterator<Item = (usize, &Beat)> {
        self.beats.iter().enumerate().filter(|(_, b)| !b.consumed)
    }

    /// Copies of the beats with `time_ms - now_ms` in
    /// `(-FADE_OUT_MS, window_ms)`. Read-only; safe to call every frame.
    pub fn visible(&self, now_ms: f64, window_ms: f64) -> Vec<Beat> {
        self.beats
            .iter()
            .filter(|b| {
                let dt = b.time_ms - now_ms;
                dt > -FADE_OUT_MS && dt < window_ms
            })
            .copied()
            .collect()
    }
}
