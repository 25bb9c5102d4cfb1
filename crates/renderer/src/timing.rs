use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

/// Running GPU time statistics for one pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct PassTiming {
    window_ms: f64,
    window_samples: u32,
    last_average_ms: Option<f64>,
    total_ms: f64,
    total_samples: u64,
}

impl PassTiming {
    /// Folds in one elapsed-time sample. Returns the window average once
    /// `window` samples have accumulated, resetting the window.
    pub(crate) fn record(&mut self, elapsed_ns: u64, window: u32) -> Option<f64> {
        let ms = elapsed_ns as f64 / 1_000_000.0;
        self.window_ms += ms;
        self.window_samples += 1;
        self.total_ms += ms;
        self.total_samples += 1;

        if self.window_samples < window.max(1) {
            return None;
        }
        let average = self.window_ms / f64::from(self.window_samples);
        self.last_average_ms = Some(average);
        self.window_ms = 0.0;
        self.window_samples = 0;
        Some(average)
    }

    /// Average of the open window, falling back to the last closed one.
    pub(crate) fn average_ms(&self) -> Option<f64> {
        if self.window_samples > 0 {
            Some(self.window_ms / f64::from(self.window_samples))
        } else {
            self.last_average_ms
        }
    }

    pub(crate) fn window_samples(&self) -> u32 {
        self.window_samples
    }

    pub(crate) fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub(crate) fn lifetime_average_ms(&self) -> Option<f64> {
        (self.total_samples > 0).then(|| self.total_ms / self.total_samples as f64)
    }
}

/// Snapshot of per-pass GPU timings, serialised as the timing report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingReport {
    pub profiling: bool,
    pub passes: Vec<PassTimingReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassTimingReport {
    pub index: usize,
    pub shader: PathBuf,
    pub average_ms: Option<f64>,
    pub lifetime_average_ms: Option<f64>,
    pub samples: u32,
    pub total_samples: u64,
}

impl TimingReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to encode timing report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write timing report {}", path.display()))?;
        tracing::info!(path = %path.display(), "GPU timing report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn window_closes_after_configured_samples() {
        let mut timing = PassTiming::default();
        assert_eq!(timing.record(1_000_000, 3), None);
        assert_eq!(timing.record(2_000_000, 3), None);
        assert_eq!(timing.record(3_000_000, 3), Some(2.0));
        assert_eq!(timing.window_samples(), 0);
        assert_eq!(timing.average_ms(), Some(2.0));

        timing.record(5_000_000, 3);
        assert_eq!(timing.average_ms(), Some(5.0));
        assert_eq!(timing.total_samples(), 4);
        assert_eq!(timing.lifetime_average_ms(), Some(2.75));
    }

    #[test]
    fn zero_window_reports_every_sample() {
        let mut timing = PassTiming::default();
        assert_eq!(timing.record(500_000, 0), Some(0.5));
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/timing.json");
        let report = TimingReport {
            profiling: true,
            passes: vec![PassTimingReport {
                index: 0,
                shader: PathBuf::from("blur.slang"),
                average_ms: Some(1.5),
                lifetime_average_ms: Some(1.25),
                samples: 4,
                total_samples: 64,
            }],
        };
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["profiling"], true);
        assert_eq!(value["passes"][0]["shader"], "blur.slang");
        assert_eq!(value["passes"][0]["average_ms"], 1.5);
        assert_eq!(value["passes"][0]["total_samples"], 64);
    }
}
