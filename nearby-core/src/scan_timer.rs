use std::time::Duration;

#[cfg(test)]
use mock_instant::Instant;

#[cfg(not(test))]
use std::time::Instant;

/// Encapsulating the periodic scan cadence
///
/// Discovery works by re-scanning interfaces and re-submitting all
/// queries at a fixed interval. The timer only tracks when the next
/// scan is due; the owner sleeps for [`ScanTimer::next_due`] and
/// then calls its resolver's scan, marking the tick with
/// [`ScanTimer::update`].
pub struct ScanTimer {
    next_scan: Instant,
    interval: Duration,
}

impl ScanTimer {
    /// Create a timer; the first scan is due immediately
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            next_scan: Instant::now(),
            interval,
        }
    }

    /// The configured scan interval
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the scan interval
    ///
    /// Takes effect from the next tick.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Obtain the desired delay before the next scan is needed
    #[must_use]
    pub fn next_due(&self) -> Duration {
        self.next_scan.saturating_duration_since(Instant::now())
    }

    /// Mark a tick as taken
    ///
    /// Does nothing if called early; otherwise schedules the next
    /// tick one interval later.
    pub fn update(&mut self) {
        if !self.next_due().is_zero() {
            return;
        }
        self.next_scan += self.interval;
    }
}
