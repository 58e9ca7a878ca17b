//! Lightweight timing scopes.
//!
//! Scopes are free when perf logging is off. When on, each scope reports its
//! elapsed time through `tracing` under the `mdvis::perf` target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Logs the time between its creation and drop.
#[derive(Debug)]
#[must_use = "a scope measures until it is dropped"]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Scope {
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        tracing::info!(scope = self.name, elapsed_ms = self.elapsed_ms(), "timing");
    }
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}
