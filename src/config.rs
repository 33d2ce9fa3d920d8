//! Tunable configuration for the orchestration core.
//!
//! Plain structs with documented defaults; callers construct one and hand it
//! to the components they build. There is no process-wide config state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default liveness loop interval (seconds).
const DEFAULT_MONITORING_INTERVAL_SECS: u64 = 30;
/// Default deep-scan loop interval (seconds).
const DEFAULT_PROGRESS_CHECK_INTERVAL_SECS: u64 = 300;
/// Default stall window before a technical blocker is raised (seconds).
const DEFAULT_SLOW_PROGRESS_THRESHOLD_SECS: u64 = 2 * 3600;

/// Configuration for the whole orchestration core.
///
/// Split into monitor and planner halves so each component only carries the
/// knobs it reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverseerConfig {
    pub monitor: MonitorConfig,
    pub planner: PlannerConfig,
}

/// Knobs read by the progress monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Liveness loop interval. Default 30s.
    pub monitoring_interval: Duration,
    /// Deep-scan (blocker detection) loop interval. Default 300s.
    pub progress_check_interval: Duration,
    /// Relative velocity drop treated as significant. Default 0.10.
    pub blocker_detection_threshold: f64,
    /// Zero-velocity window before a technical stall blocker. Default 2h.
    pub slow_progress_threshold: Duration,
    /// Multiplier over `estimated_effort` for the implicit deadline.
    /// Default 1.5.
    pub deadline_buffer: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitoring_interval: Duration::from_secs(DEFAULT_MONITORING_INTERVAL_SECS),
            progress_check_interval: Duration::from_secs(DEFAULT_PROGRESS_CHECK_INTERVAL_SECS),
            blocker_detection_threshold: 0.10,
            slow_progress_threshold: Duration::from_secs(DEFAULT_SLOW_PROGRESS_THRESHOLD_SECS),
            deadline_buffer: 1.5,
        }
    }
}

/// Knobs read by the sprint planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Sprint length in days. Default 14.
    pub default_sprint_days: u32,
    /// Productive hours per agent per day. Default 6.
    pub productive_hours_per_day: f64,
    /// Fraction of raw capacity held back for the unplanned. Default 0.20.
    pub capacity_buffer: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_sprint_days: 14,
            productive_hours_per_day: 6.0,
            capacity_buffer: 0.20,
        }
    }
}

impl PlannerConfig {
    /// Buffered sprint hours available to one fully free agent.
    pub fn sprint_hours(&self) -> f64 {
        f64::from(self.default_sprint_days) * self.productive_hours_per_day
            * (1.0 - self.capacity_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = OverseerConfig::default();
        assert_eq!(config.monitor.monitoring_interval, Duration::from_secs(30));
        assert_eq!(
            config.monitor.progress_check_interval,
            Duration::from_secs(300)
        );
        assert_eq!(
            config.monitor.slow_progress_threshold,
            Duration::from_secs(7200)
        );
        assert_eq!(config.planner.default_sprint_days, 14);
    }

    #[test]
    fn sprint_hours_applies_buffer() {
        let planner = PlannerConfig::default();
        // 14 days * 6h * 0.8 buffer
        assert!((planner.sprint_hours() - 67.2).abs() < 1e-9);
    }
}
