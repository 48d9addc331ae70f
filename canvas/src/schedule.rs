//! Redraw coalescing.
//!
//! Callers request a redraw as often as they like. At most one paint happens
//! per frame interval; requests inside the window arm a single trailing timer
//! and are folded into it. Time is passed in explicitly (milliseconds from
//! any monotonic origin) so the throttle has no clock of its own.

#[cfg(test)]
#[path = "schedule_test.rs"]
mod schedule_test;

use crate::consts::FRAME_INTERVAL_MS;

/// What the caller should do after [`RedrawThrottle::request`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedrawDecision {
    /// Paint immediately.
    PaintNow,
    /// Arm a timer and call [`RedrawThrottle::on_timer`] after `delay_ms`.
    Scheduled { delay_ms: f64 },
    /// A trailing paint is already scheduled; nothing to do.
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct RedrawThrottle {
    interval_ms: f64,
    last_paint: Option<f64>,
    timer_armed: bool,
}

impl Default for RedrawThrottle {
    fn default() -> Self {
        Self::with_interval(FRAME_INTERVAL_MS)
    }
}

impl RedrawThrottle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_interval(interval_ms: f64) -> Self {
        Self { interval_ms: interval_ms.max(0.0), last_paint: None, timer_armed: false }
    }

    #[must_use]
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Whether a trailing paint is waiting on its timer.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.timer_armed
    }

    pub fn request(&mut self, now: f64) -> RedrawDecision {
        if self.timer_armed {
            return RedrawDecision::Coalesced;
        }
        match self.last_paint {
            Some(last) if now - last < self.interval_ms => {
                self.timer_armed = true;
                RedrawDecision::Scheduled { delay_ms: self.interval_ms - (now - last) }
            }
            _ => {
                self.last_paint = Some(now);
                RedrawDecision::PaintNow
            }
        }
    }

    /// The trailing timer fired. Returns whether to paint now.
    pub fn on_timer(&mut self, now: f64) -> bool {
        if !self.timer_armed {
            return false;
        }
        self.timer_armed = false;
        self.last_paint = Some(now);
        true
    }
}
