//! Smooths the visible goal when it jumps to a new position.

use crate::interpolate::interpolate;

/// Animates the displayed goal towards its target over a fixed duration.
///
/// Every tick interpolates from the value reached on the previous tick, not
/// from where the tween started. The resulting curve is what trial data has
/// always been recorded against, so it is kept as is.
#[derive(Debug, Clone, PartialEq)]
pub struct TweenAnimator {
    current: f64,
    target: f64,
    start_millis: u64,
    active: bool,
    duration_ms: u64,
    exponent: f64,
}

impl TweenAnimator {
    /// Instantiates an idle animator resting at `0.0`.
    pub fn new(duration_ms: u64, exponent: f64) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            start_millis: 0,
            active: false,
            duration_ms,
            exponent,
        }
    }

    /// Starts moving towards `target`. The displayed value does not change
    /// until the next [`TweenAnimator::tick`].
    pub fn begin_tween(&mut self, target: f64, now_millis: u64) {
        self.target = target;
        self.start_millis = now_millis;
        self.active = true;
    }

    /// Jumps straight to `value` with no animation.
    pub fn set_immediate(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.active = false;
    }

    /// Advances the animation and returns the value to display.
    pub fn tick(&mut self, now_millis: u64) -> f64 {
        if !self.active {
            return self.current;
        }

        let elapsed = now_millis.saturating_sub(self.start_millis);
        if elapsed > self.duration_ms || self.duration_ms == 0 {
            self.current = self.target;
            self.active = false;
        } else {
            let t = elapsed as f64 / self.duration_ms as f64;
            self.current = interpolate(self.current, self.target, t, self.exponent);
        }

        self.current
    }

    /// The value currently displayed.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// The value being animated towards.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whether an animation is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }
}
