//! Sensor fleet simulator
//!
//! Produces synthetic readings per configured sensor kind. No real I/O —
//! this stands in for the field hardware so the pipeline can run end to end
//! without a deployment.

use crate::types::{NpkReading, SensorReading, SensorValue};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinds of sensors the simulator knows how to synthesize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    SoilMoisture,
    Temperature,
    Humidity,
    Ph,
    Npk,
    /// Unrecognized hardware: synthesized as a 0-100 scalar.
    Other,
}

impl SensorKind {
    /// Canonical metric name this sensor reports under.
    pub fn metric(&self) -> &'static str {
        match self {
            SensorKind::SoilMoisture => "soil_moisture",
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Ph => "soil_ph",
            SensorKind::Npk => "npk",
            SensorKind::Other => "aux",
        }
    }
}

/// One configured sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSpec {
    pub kind: SensorKind,
    pub id: String,
}

/// Synthesizes one [`SensorReading`] per collection round from the
/// configured fleet.
#[derive(Debug, Clone)]
pub struct SensorSimulator {
    sensors: Vec<SensorSpec>,
}

impl SensorSimulator {
    pub fn new(sensors: Vec<SensorSpec>) -> Self {
        Self { sensors }
    }

    /// The default five-sensor field deployment.
    pub fn default_fleet() -> Self {
        let sensors = vec![
            SensorSpec { kind: SensorKind::SoilMoisture, id: "moisture_001".to_string() },
            SensorSpec { kind: SensorKind::Temperature, id: "temp_001".to_string() },
            SensorSpec { kind: SensorKind::Humidity, id: "humidity_001".to_string() },
            SensorSpec { kind: SensorKind::Ph, id: "ph_001".to_string() },
            SensorSpec { kind: SensorKind::Npk, id: "npk_001".to_string() },
        ];
        Self::new(sensors)
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Collect one synthetic reading from every configured sensor.
    pub fn collect(&self) -> SensorReading {
        let mut rng = rand::thread_rng();
        let mut reading = SensorReading::new();

        for sensor in &self.sensors {
            match sensor.kind {
                SensorKind::SoilMoisture => {
                    reading.set_scalar(sensor.kind.metric(), round1(rng.gen_range(20.0..60.0)));
                }
                SensorKind::Temperature => {
                    reading.set_scalar(sensor.kind.metric(), round1(rng.gen_range(15.0..35.0)));
                }
                SensorKind::Humidity => {
                    reading.set_scalar(sensor.kind.metric(), round1(rng.gen_range(40.0..90.0)));
                }
                SensorKind::Ph => {
                    reading.set_scalar(sensor.kind.metric(), round1(rng.gen_range(5.0..7.5)));
                }
                SensorKind::Npk => {
                    reading.set_npk(NpkReading {
                        nitrogen: f64::from(rng.gen_range(30..=70)),
                        phosphorus: f64::from(rng.gen_range(20..=60)),
                        potassium: f64::from(rng.gen_range(25..=65)),
                    });
                }
                SensorKind::Other => {
                    reading.set_scalar(sensor.kind.metric(), rng.gen_range(0.0..100.0));
                }
            }
        }

        tracing::debug!(sensors = self.sensors.len(), "Collected simulated sensor readings");
        reading
    }

    /// Collect and preprocess in one step — the view the pipeline consumes.
    pub fn collect_preprocessed(&self) -> SensorReading {
        preprocess(self.collect())
    }
}

/// Validate a raw reading: scalar metrics outside 0..=100 are dropped with a
/// warning, composite readings pass through untouched.
pub fn preprocess(raw: SensorReading) -> SensorReading {
    let mut processed = SensorReading::new();
    for (metric, value) in raw.values {
        match value {
            SensorValue::Scalar(v) => {
                if (0.0..=100.0).contains(&v) {
                    processed.values.insert(metric, value);
                } else {
                    tracing::warn!(metric = %metric, value = v, "Dropping out-of-range sensor value");
                }
            }
            SensorValue::Npk(_) => {
                processed.values.insert(metric, value);
            }
        }
    }
    processed
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fleet_collects_all_metrics() {
        let sim = SensorSimulator::default_fleet();
        assert_eq!(sim.sensor_count(), 5);

        let reading = sim.collect();
        assert!(reading.scalar("soil_moisture").is_some());
        assert!(reading.scalar("temperature").is_some());
        assert!(reading.scalar("humidity").is_some());
        assert!(reading.scalar("soil_ph").is_some());
        assert!(matches!(
            reading.values.get("npk"),
            Some(SensorValue::Npk(_))
        ));
    }

    #[test]
    fn test_collected_values_stay_in_range() {
        let sim = SensorSimulator::default_fleet();
        for _ in 0..50 {
            let reading = sim.collect();
            let moisture = reading.scalar("soil_moisture").unwrap();
            assert!((20.0..=60.0).contains(&moisture), "moisture {moisture}");

            let ph = reading.scalar("soil_ph").unwrap();
            assert!((5.0..=7.5).contains(&ph), "ph {ph}");

            if let Some(SensorValue::Npk(npk)) = reading.values.get("npk") {
                assert!((30.0..=70.0).contains(&npk.nitrogen));
                assert!((20.0..=60.0).contains(&npk.phosphorus));
                assert!((25.0..=65.0).contains(&npk.potassium));
            }
        }
    }

    #[test]
    fn test_preprocess_drops_out_of_range_scalars() {
        let mut raw = SensorReading::new();
        raw.set_scalar("soil_moisture", 45.0);
        raw.set_scalar("temperature", 250.0);
        raw.set_scalar("humidity", -3.0);
        raw.set_npk(NpkReading { nitrogen: 50.0, phosphorus: 40.0, potassium: 45.0 });

        let processed = preprocess(raw);
        assert_eq!(processed.scalar("soil_moisture"), Some(45.0));
        assert!(processed.scalar("temperature").is_none());
        assert!(processed.scalar("humidity").is_none());
        assert!(processed.values.contains_key("npk"));
    }
}
