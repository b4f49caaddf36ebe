//! Core types: sensor readings, health labels, system status, gateway records
//!
//! Everything here is serde-serializable — these structs cross the HTTP
//! boundary and (for [`reading::SensorReport`]) arrive from external
//! collectors.

pub mod gateway;
pub mod reading;

pub use gateway::{ApiCallStats, GatewayStats, HealthCheckResult};
pub use reading::{NpkReading, SensorReading, SensorReport, SensorValue};

use serde::{Deserialize, Serialize};

// ============================================================================
// Crop Health Labels
// ============================================================================

/// Discrete crop-health classification produced by the threshold classifier.
///
/// Exactly one label is produced per reading snapshot. `Unknown` is the
/// catch-all for inputs the classifier cannot interpret; it never comes out
/// of the rule table itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthLabel {
    Healthy,
    NeedsWater,
    TooMuchWater,
    NeedsNutrients,
    PhIssue,
    Unknown,
}

impl std::fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthLabel::Healthy => "healthy",
            HealthLabel::NeedsWater => "needs_water",
            HealthLabel::TooMuchWater => "too_much_water",
            HealthLabel::NeedsNutrients => "needs_nutrients",
            HealthLabel::PhIssue => "ph_issue",
            HealthLabel::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// System Status
// ============================================================================

/// Coarse orchestrator status, exposed for external observability only.
///
/// Transitions happen at pipeline stage boundaries and on caught errors.
/// This state has no effect on classifier or synthesizer correctness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    Initialized,
    Training,
    Ready,
    Running,
    TrainingFailed,
    Error,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SystemStatus::Initialized => "initialized",
            SystemStatus::Training => "training",
            SystemStatus::Ready => "ready",
            SystemStatus::Running => "running",
            SystemStatus::TrainingFailed => "training_failed",
            SystemStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}
