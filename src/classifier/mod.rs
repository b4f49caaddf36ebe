//! Threshold classifier ("Model A")
//!
//! Maps a sensor reading snapshot to exactly one [`HealthLabel`] using a
//! fixed threshold table. `classify` is a pure, total function: no I/O, no
//! hidden state, identical label for identical input.
//!
//! Rule order is a design choice and determines tie-breaking: moisture
//! violations outrank nutrient violations, which outrank pH violations,
//! even when several thresholds are crossed at once.
//!
//! An untrained classifier falls back to a degraded moisture-only rule set.
//! That is the designated fallback, not an error path — training merely
//! installs the full threshold table (there is no statistical fit).

use crate::types::{HealthLabel, SensorReading};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current snapshot schema version. Bump when `ClassifierThresholds` gains
/// or loses fields.
pub const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Neutral defaults for absent metrics
// ============================================================================

const DEFAULT_MOISTURE: f64 = 50.0;
const DEFAULT_NITROGEN: f64 = 50.0;
const DEFAULT_PHOSPHORUS: f64 = 40.0;
const DEFAULT_POTASSIUM: f64 = 45.0;
const DEFAULT_PH: f64 = 6.5;

// ============================================================================
// Threshold Table
// ============================================================================

/// The full decision-rule thresholds installed by training.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClassifierThresholds {
    pub moisture_low: f64,
    pub moisture_high: f64,
    pub nitrogen_min: f64,
    pub phosphorus_min: f64,
    pub potassium_min: f64,
    pub ph_low: f64,
    pub ph_high: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            moisture_low: 25.0,
            moisture_high: 60.0,
            nitrogen_min: 35.0,
            phosphorus_min: 30.0,
            potassium_min: 35.0,
            ph_low: 5.5,
            ph_high: 7.0,
        }
    }
}

/// Versioned, explicitly-named snapshot of the installed model state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub version: u32,
    pub thresholds: ClassifierThresholds,
    /// Unix timestamp when the thresholds were installed.
    pub trained_at: u64,
}

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

// ============================================================================
// Classifier
// ============================================================================

/// Rule-based crop health classifier.
#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier {
    thresholds: Option<ClassifierThresholds>,
}

impl ThresholdClassifier {
    /// An untrained classifier: `classify` uses the degraded moisture-only
    /// rules until `train` installs the full table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the fixed threshold table. This is the whole "training" step.
    pub fn train(&mut self) {
        self.thresholds = Some(ClassifierThresholds::default());
        tracing::info!("Classifier thresholds installed (7 decision rules)");
    }

    pub fn is_trained(&self) -> bool {
        self.thresholds.is_some()
    }

    pub fn thresholds(&self) -> Option<&ClassifierThresholds> {
        self.thresholds.as_ref()
    }

    /// Classify one reading snapshot. Total and deterministic; absent
    /// metrics default to fixed neutral values.
    pub fn classify(&self, reading: &SensorReading) -> HealthLabel {
        match &self.thresholds {
            Some(t) => Self::classify_with_rules(reading, t),
            None => {
                tracing::warn!("Classifier untrained, using degraded moisture-only rules");
                Self::classify_degraded(reading)
            }
        }
    }

    fn classify_with_rules(reading: &SensorReading, t: &ClassifierThresholds) -> HealthLabel {
        let flat = reading.flatten();
        let moisture = flat.get("soil_moisture").copied().unwrap_or(DEFAULT_MOISTURE);
        let nitrogen = flat.get("npk_nitrogen").copied().unwrap_or(DEFAULT_NITROGEN);
        let phosphorus = flat.get("npk_phosphorus").copied().unwrap_or(DEFAULT_PHOSPHORUS);
        let potassium = flat.get("npk_potassium").copied().unwrap_or(DEFAULT_POTASSIUM);
        let ph = flat.get("soil_ph").copied().unwrap_or(DEFAULT_PH);

        if moisture < t.moisture_low {
            HealthLabel::NeedsWater
        } else if moisture > t.moisture_high {
            HealthLabel::TooMuchWater
        } else if nitrogen < t.nitrogen_min
            || phosphorus < t.phosphorus_min
            || potassium < t.potassium_min
        {
            HealthLabel::NeedsNutrients
        } else if ph < t.ph_low || ph > t.ph_high {
            HealthLabel::PhIssue
        } else {
            HealthLabel::Healthy
        }
    }

    /// Degraded two-threshold variant: moisture only.
    pub fn classify_degraded(reading: &SensorReading) -> HealthLabel {
        let moisture = reading
            .scalar("soil_moisture")
            .unwrap_or(DEFAULT_MOISTURE);
        if moisture < 30.0 {
            HealthLabel::NeedsWater
        } else if moisture > 60.0 {
            HealthLabel::TooMuchWater
        } else {
            HealthLabel::Healthy
        }
    }

    // ------------------------------------------------------------------------
    // Snapshot persistence
    // ------------------------------------------------------------------------

    /// Serialize the installed thresholds to a versioned JSON snapshot.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), SnapshotError> {
        let Some(thresholds) = self.thresholds else {
            tracing::warn!("No thresholds installed, skipping snapshot save");
            return Ok(());
        };
        let snapshot = ModelSnapshot {
            version: SNAPSHOT_VERSION,
            thresholds,
            trained_at: chrono::Utc::now().timestamp().max(0) as u64,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Saved classifier snapshot");
        Ok(())
    }

    /// Load thresholds from a snapshot file, rejecting foreign versions.
    pub fn load_snapshot(&mut self, path: &Path) -> Result<(), SnapshotError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: ModelSnapshot = serde_json::from_str(&raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        self.thresholds = Some(snapshot.thresholds);
        tracing::info!(
            path = %path.display(),
            trained_at = snapshot.trained_at,
            "Loaded classifier snapshot"
        );
        Ok(())
    }
}
