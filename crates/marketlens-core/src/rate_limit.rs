//! Fixed-window rate limiter guarding outbound provider calls.
//!
//! Three independent windows (one second, one minute, one hour) each count attempts since
//! their last reset. A call is admitted only when every window has budget left, and an
//! admitted call consumes budget in all three.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_PER_SECOND: u32 = 5;
pub const DEFAULT_PER_MINUTE: u32 = 100;
pub const DEFAULT_PER_HOUR: u32 = 2_000;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3_600);

/// Per-window maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimits {
    pub per_second: u32,
    pub per_minute: u32,
    pub per_hour: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_second: DEFAULT_PER_SECOND,
            per_minute: DEFAULT_PER_MINUTE,
            per_hour: DEFAULT_PER_HOUR,
        }
    }
}

/// The window that rejected a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Second,
    Minute,
    Hour,
}

impl RateWindow {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }
}

/// Counter values at one instant, reported through service stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    pub second: u32,
    pub minute: u32,
    pub hour: u32,
    pub limits: RateLimits,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    last_reset: Instant,
    period: Duration,
    max: u32,
}

impl Window {
    fn new(period: Duration, max: u32, now: Instant) -> Self {
        Self {
            count: 0,
            last_reset: now,
            period,
            max,
        }
    }

    fn roll_over(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_reset) >= self.period {
            self.count = 0;
            self.last_reset = now;
        }
    }

    fn exhausted(&self) -> bool {
        self.count >= self.max
    }
}

#[derive(Debug)]
struct RateWindows {
    second: Window,
    minute: Window,
    hour: Window,
}

impl RateWindows {
    fn new(limits: RateLimits, now: Instant) -> Self {
        Self {
            second: Window::new(SECOND, limits.per_second, now),
            minute: Window::new(MINUTE, limits.per_minute, now),
            hour: Window::new(HOUR, limits.per_hour, now),
        }
    }
}

/// Three-window limiter. The check-then-increment happens under one mutex, so concurrent
/// callers never overshoot a window.
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    windows: Mutex<RateWindows>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            windows: Mutex::new(RateWindows::new(limits, Instant::now())),
        }
    }

    pub const fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Admit one call now.
    pub fn check(&self) -> Result<(), RateWindow> {
        self.check_at(Instant::now())
    }

    /// Admit one call at `now`. A rejected call leaves every counter untouched.
    pub fn check_at(&self, now: Instant) -> Result<(), RateWindow> {
        let mut windows = self.lock();
        windows.second.roll_over(now);
        windows.minute.roll_over(now);
        windows.hour.roll_over(now);

        let rejected_by = if windows.second.exhausted() {
            Some(RateWindow::Second)
        } else if windows.minute.exhausted() {
            Some(RateWindow::Minute)
        } else if windows.hour.exhausted() {
            Some(RateWindow::Hour)
        } else {
            None
        };
        if let Some(window) = rejected_by {
            warn!(window = window.as_str(), "provider rate limit reached");
            return Err(window);
        }

        windows.second.count += 1;
        windows.minute.count += 1;
        windows.hour.count += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        let windows = self.lock();
        RateLimitSnapshot {
            second: windows.second.count,
            minute: windows.minute.count,
            hour: windows.hour.count,
            limits: self.limits,
        }
    }

    /// Zero every counter and restart all windows.
    pub fn reset(&self) {
        *self.lock() = RateWindows::new(self.limits, Instant::now());
    }

    fn lock(&self) -> MutexGuard<'_, RateWindows> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}
