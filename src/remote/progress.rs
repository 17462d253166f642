// src/remote/progress.rs
//! Transfer progress hook.

use crate::stage_log;
use log::Level;

/// Observer notified with `(bytes_so_far, total_bytes)` while a file copies.
pub trait TransferObserver {
    fn update(&mut self, transferred: u64, total: u64);

    /// Called once when the copy completed.
    fn finish(&mut self, _transferred: u64) {}
}

/// Discards every notification.
pub struct NoProgress;

impl TransferObserver for NoProgress {
    fn update(&mut self, _transferred: u64, _total: u64) {}
}

/// Logs progress each time another `step` percent has been transferred.
pub struct LogProgress {
    label: String,
    step: u64,
    next_pct: u64,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_step(label, 10)
    }

    pub fn with_step(label: impl Into<String>, step: u64) -> Self {
        Self { label: label.into(), step: step.clamp(1, 100), next_pct: 0 }
    }

    /// Step boundary crossed by `transferred`, if a new one was reached.
    fn crossed(&mut self, transferred: u64, total: u64) -> Option<u64> {
        let pct = if total == 0 { 100 } else { transferred.saturating_mul(100) / total };
        if pct < self.next_pct {
            return None;
        }
        let hit = pct - pct % self.step;
        self.next_pct = hit + self.step;
        Some(hit)
    }
}

impl TransferObserver for LogProgress {
    fn update(&mut self, transferred: u64, total: u64) {
        if let Some(pct) = self.crossed(transferred, total) {
            stage_log!(
                Level::Info,
                "fetch",
                "{:<16} {:>3}% {} / {}",
                self.label,
                pct,
                format_bytes(transferred),
                format_bytes(total)
            );
        }
    }

    fn finish(&mut self, transferred: u64) {
        stage_log!(Level::Debug, "fetch", "{} complete ({})", self.label, format_bytes(transferred));
    }
}

/// Render a byte count with binary units, e.g. `1.5 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
