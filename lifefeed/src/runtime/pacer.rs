use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_INTERVALS: usize = 90;

/// Holds the consumer to one render per period.
///
/// After each render the next anchor is the *ideal* wake time
/// (`anchor + period`), not the actual one, so oversleeping on one frame is
/// absorbed by a shorter sleep on the next. When a render lands a full period
/// or more after the anchor the pacer gives up on that debt and re-anchors to
/// "now" instead of rendering faster to catch up.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    anchor: Instant,
    frame_intervals: VecDeque<Duration>,
    last_render_at: Option<Instant>,
}

impl Pacer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            anchor: now,
            frame_intervals: VecDeque::new(),
            last_render_at: None,
        }
    }

    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    /// Called after waiting on an empty queue; nothing was shown so there is
    /// no debt to carry.
    pub fn reanchor(&mut self, now: Instant) {
        self.anchor = now;
    }

    /// Records a render at `now` and returns how long to sleep before the
    /// next one. `Duration::ZERO` means the consumer is behind and should
    /// only yield.
    pub fn after_render(&mut self, now: Instant) -> Duration {
        self.record_render(now);

        let elapsed = now.saturating_duration_since(self.anchor);

        if elapsed < self.period {
            self.anchor += self.period;
            self.period - elapsed
        } else {
            self.anchor = now;
            Duration::ZERO
        }
    }

    pub fn average_interval(&self) -> Option<Duration> {
        if self.frame_intervals.is_empty() {
            return None;
        }

        let sum: Duration = self.frame_intervals.iter().copied().sum();
        Some(sum / self.frame_intervals.len() as u32)
    }

    fn record_render(&mut self, now: Instant) {
        let Some(last_render_at) = self.last_render_at else {
            self.last_render_at = Some(now);
            return;
        };

        let interval = now.saturating_duration_since(last_render_at);
        self.last_render_at = Some(now);
        self.frame_intervals.push_back(interval);
        if self.frame_intervals.len() > MAX_INTERVALS {
            self.frame_intervals.pop_front();
        }
    }
}
