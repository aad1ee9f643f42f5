/// Completion report of a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u32,
}

/// Turns the engine's output into percentages.
///
/// The input duration comes from the stderr banner, the position from the
/// `-progress` key/value stream. Reports only move forward.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    duration_us: Option<u64>,
    last: Option<u32>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration_us(&self) -> Option<u64> {
        self.duration_us
    }

    pub fn on_stderr_line(&mut self, line: &str) {
        if self.duration_us.is_some() {
            return;
        }
        if let Some(rest) = line.trim_start().strip_prefix("Duration:") {
            let ts = rest.trim_start().split(',').next().unwrap_or_default();
            self.duration_us = parse_timestamp_us(ts).filter(|d| *d > 0);
        }
    }

    pub fn on_progress_line(&mut self, line: &str) -> Option<Progress> {
        let (key, value) = line.trim().split_once('=')?;
        let percent = match key {
            // out_time_ms is in microseconds too
            "out_time_us" | "out_time_ms" => {
                let pos: u64 = value.trim().parse().ok()?;
                let total = self.duration_us?;
                ((pos as f64 / total as f64) * 100.0).round().min(100.0) as u32
            }
            "progress" if value.trim() == "end" => 100,
            _ => return None,
        };
        self.advance(percent)
    }

    fn advance(&mut self, percent: u32) -> Option<Progress> {
        if self.last.is_some_and(|l| percent <= l) {
            return None;
        }
        self.last = Some(percent);
        Some(Progress { percent })
    }
}

/// `HH:MM:SS[.frac]` to microseconds.
fn parse_timestamp_us(ts: &str) -> Option<u64> {
    let mut parts = ts.trim().splitn(3, ':');
    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    if !s.is_finite() || s < 0.0 {
        return None;
    }
    Some((h * 3600 + m * 60) * 1_000_000 + (s * 1_000_000.0).round() as u64)
}
