//! Sensor reading types: per-metric values, composite NPK readings, and the
//! ingest report envelope external collectors POST to us.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Composite NPK (nitrogen/phosphorus/potassium) probe reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NpkReading {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// A single sensor value: either a scalar metric or a composite NPK reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SensorValue {
    Scalar(f64),
    Npk(NpkReading),
}

/// One snapshot of readings across the sensor fleet, keyed by metric name
/// (`soil_moisture`, `temperature`, `humidity`, `soil_ph`, `npk`).
///
/// Immutable once collected: the classifier and synthesizer only ever read
/// it. `BTreeMap` keeps iteration order deterministic for prompts and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    #[serde(flatten)]
    pub values: BTreeMap<String, SensorValue>,
}

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scalar metric.
    pub fn set_scalar(&mut self, metric: &str, value: f64) {
        self.values
            .insert(metric.to_string(), SensorValue::Scalar(value));
    }

    /// Insert a composite NPK reading under the `npk` key.
    pub fn set_npk(&mut self, npk: NpkReading) {
        self.values.insert("npk".to_string(), SensorValue::Npk(npk));
    }

    /// Look up a scalar metric by name.
    pub fn scalar(&self, metric: &str) -> Option<f64> {
        match self.values.get(metric) {
            Some(SensorValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flatten composite readings into scalar metrics: the `npk` composite
    /// becomes `npk_nitrogen`, `npk_phosphorus`, `npk_potassium`. Scalars
    /// pass through unchanged. This is the view the classifier consumes.
    pub fn flatten(&self) -> BTreeMap<String, f64> {
        let mut flat = BTreeMap::new();
        for (metric, value) in &self.values {
            match value {
                SensorValue::Scalar(v) => {
                    flat.insert(metric.clone(), *v);
                }
                SensorValue::Npk(npk) => {
                    flat.insert(format!("{metric}_nitrogen"), npk.nitrogen);
                    flat.insert(format!("{metric}_phosphorus"), npk.phosphorus);
                    flat.insert(format!("{metric}_potassium"), npk.potassium);
                }
            }
        }
        flat
    }
}

/// Ingest envelope POSTed by external collectors.
///
/// Retained in memory as the latest report; not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReport {
    pub sensor_id: String,
    #[serde(default)]
    pub location: Option<String>,
    pub timestamp: String,
    pub readings: SensorReading,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
