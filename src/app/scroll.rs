//! Keyboard scrolling with hold-to-repeat and smoothing.

use crate::layout::Vector2;

use super::input::{KeyboardState, ScrollKey};

/// Delay between the first nudge and the start of repeating.
pub const REPEAT_START_DELAY: f32 = 0.28;
/// Interval between repeats once repeating.
pub const REPEAT_INTERVAL: f32 = 0.10;
/// Higher values converge on the target faster.
pub const SMOOTHING: f32 = 15.0;
/// Smoothed deltas at or below this are dropped.
pub const EMIT_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, Default)]
struct KeyTimer {
    elapsed: f32,
    repeating: bool,
}

/// Turns held scroll keys into a smoothed per-frame scroll delta.
#[derive(Debug, Clone, Default)]
pub struct KeyScroller {
    timers: [KeyTimer; 6],
    smoothed: Vector2,
}

impl KeyScroller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds and return the delta to apply, if any.
    pub fn update(&mut self, keys: &KeyboardState, viewport_rows: f32, dt: f32) -> Option<Vector2> {
        let mut target = Vector2::ZERO;
        for (timer, key) in self.timers.iter_mut().zip(ScrollKey::ALL) {
            let fire = if keys.was_pressed(key) {
                *timer = KeyTimer::default();
                true
            } else if keys.is_held(key) {
                timer.elapsed += dt;
                if !timer.repeating && timer.elapsed >= REPEAT_START_DELAY {
                    timer.repeating = true;
                    timer.elapsed = 0.0;
                }
                if timer.repeating && timer.elapsed >= REPEAT_INTERVAL {
                    timer.elapsed = 0.0;
                    true
                } else {
                    false
                }
            } else {
                *timer = KeyTimer::default();
                false
            };
            if fire {
                let distance = viewport_rows * key.screen_portion();
                let direction = key.direction();
                target.x += direction.x * distance;
                target.y += direction.y * distance;
            }
        }

        let k = (SMOOTHING * dt).min(1.0);
        self.smoothed.x += (target.x - self.smoothed.x) * k;
        self.smoothed.y += (target.y - self.smoothed.y) * k;

        self.is_moving().then_some(self.smoothed)
    }

    /// Whether the smoothed delta is still above the emit threshold.
    pub fn is_moving(&self) -> bool {
        self.smoothed.x.abs() > EMIT_THRESHOLD || self.smoothed.y.abs() > EMIT_THRESHOLD
    }

    /// Drop any residual motion.
    pub fn stop(&mut self) {
        self.smoothed = Vector2::ZERO;
        self.timers = [KeyTimer::default(); 6];
    }
}
