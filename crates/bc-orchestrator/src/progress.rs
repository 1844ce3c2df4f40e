// SPDX-License-Identifier: MIT

//! Progress aggregation rules from `spec.md` §4.6: percent clamping and
//! monotonicity, a 250ms per-job emit throttle, binary-unit speed
//! formatting, and the `current_file` fallback.

use std::time::Duration;

use bc_core::Clock;

/// Minimum interval between `backup:progress` emissions for a single job.
pub const PROGRESS_THROTTLE: Duration = Duration::from_millis(250);

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a throughput in bytes/sec as a binary-unit string, e.g.
/// `"4.19 MB/s"`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec <= 0.0 || !bytes_per_sec.is_finite() {
        return "0.00 B/s".to_string();
    }

    let mut value = bytes_per_sec;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}/s", value, UNITS[unit_index])
}

/// Clamp a raw percent into `[0, 100]` and never let it fall below
/// `previous` (`spec.md` §4.6: "percent is monotonically non-decreasing").
pub fn clamp_monotonic_percent(previous: u8, raw_percent: f64) -> u8 {
    let clamped = raw_percent.clamp(0.0, 100.0).round() as u8;
    clamped.max(previous)
}

/// `current_file` falls back to `"Processing..."` when the agent hasn't
/// reported one yet.
pub fn current_file_or_placeholder(current_file: Option<&str>) -> String {
    match current_file {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "Processing...".to_string(),
    }
}

/// Tracks the last emitted-at instant and percent for a single job, so the
/// caller can decide whether a fresh progress event should be throttled.
pub struct ProgressThrottle<C: Clock> {
    clock: C,
    last_emitted_at_ms: Option<u64>,
    last_percent: u8,
}

impl<C: Clock> ProgressThrottle<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, last_emitted_at_ms: None, last_percent: 0 }
    }

    /// Returns the percent to emit if this update should go out now, or
    /// `None` if it should be dropped to respect the throttle. A 100%
    /// completion update is never throttled.
    pub fn admit(&mut self, raw_percent: f64) -> Option<u8> {
        let percent = clamp_monotonic_percent(self.last_percent, raw_percent);
        let now_ms = self.clock.epoch_ms();

        let should_emit = percent == 100
            || match self.last_emitted_at_ms {
                None => true,
                Some(last) => now_ms.saturating_sub(last) >= PROGRESS_THROTTLE.as_millis() as u64,
            };

        if should_emit {
            self.last_emitted_at_ms = Some(now_ms);
            self.last_percent = percent;
            Some(percent)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_core::clock::FakeClock;

    #[test]
    fn formats_speed_in_binary_units() {
        assert_eq!(format_speed(0.0), "0.00 B/s");
        assert_eq!(format_speed(512.0), "512.00 B/s");
        assert_eq!(format_speed(1024.0), "1.00 KB/s");
        assert_eq!(format_speed(1024.0 * 1024.0 * 4.0), "4.00 MB/s");
        assert_eq!(format_speed(1024.0_f64.powi(4) * 2.5), "2.50 TB/s");
    }

    #[test]
    fn percent_is_clamped_and_never_decreases() {
        assert_eq!(clamp_monotonic_percent(0, -5.0), 0);
        assert_eq!(clamp_monotonic_percent(0, 150.0), 100);
        assert_eq!(clamp_monotonic_percent(40, 10.0), 40);
        assert_eq!(clamp_monotonic_percent(40, 60.0), 60);
    }

    #[test]
    fn current_file_falls_back_to_placeholder() {
        assert_eq!(current_file_or_placeholder(None), "Processing...");
        assert_eq!(current_file_or_placeholder(Some("")), "Processing...");
        assert_eq!(current_file_or_placeholder(Some("a.txt")), "a.txt");
    }

    #[test]
    fn throttle_admits_first_update_then_drops_until_interval_elapses() {
        let clock = FakeClock::new();
        let mut throttle = ProgressThrottle::new(clock.clone());

        assert_eq!(throttle.admit(10.0), Some(10));
        assert_eq!(throttle.admit(20.0), None);

        clock.advance(Duration::from_millis(250));
        assert_eq!(throttle.admit(20.0), Some(20));
    }

    #[test]
    fn throttle_never_drops_a_completion_update() {
        let clock = FakeClock::new();
        let mut throttle = ProgressThrottle::new(clock);

        assert_eq!(throttle.admit(10.0), Some(10));
        assert_eq!(throttle.admit(100.0), Some(100));
    }
}
