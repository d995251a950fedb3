/// Poll-based beat tick source for the visual layer.
///
/// Instead of a callback per beat interval, the render loop calls `poll`
/// once per frame and spawns one marker per returned beat index. The cursor
/// only moves forward, so a tick fires exactly once per beat.
#[derive(Debug, Clone, Default)]
pub struct BeatTicker {
    anchor_ms: f64,
    interval_ms: f64,
    count: usize,
    next_index: usize,
    armed: bool,
}

impl BeatTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the ticker on a fresh beat grid, rewinding the cursor.
    pub fn anchor(&mut self, start_ms: f64, interval_ms: f64, count: usize) {
        self.anchor_ms = start_ms;
        self.interval_ms = interval_ms;
        self.count = count;
        self.next_index = 0;
        self.armed = true;
    }

    /// Moves to a new grid without rewinding: ticks already delivered are
    /// never re-fired, matching mid-session resynchronization.
    pub fn re_anchor(&mut self, start_ms: f64, interval_ms: f64) {
        self.anchor_ms = start_ms;
        self.interval_ms = interval_ms;
    }

    /// Disarms the ticker; `poll` yields nothing until re-anchored.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Indices of beats whose time has arrived since the previous poll.
    pub fn poll(&mut self, now_ms: f64) -> Vec<usize> {
        let mut due = Vec::new();
        if !self.armed || self.interval_ms <= 0.0 {
            return due;
        }
        while self.next_index < self.count {
            let tick_ms = self.anchor_ms + self.next_index as f64 * self.interval_ms;
            if tick_ms > now_ms {
                break;
            }
            due.push(self.next_index);
            self.next_index += 1;
        }
        due
    }
}
