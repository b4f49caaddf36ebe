//! Pipeline orchestrator
//!
//! Wires the simulator, the threshold classifier and the advice synthesizer
//! into the two end-to-end flows: sensor-driven inference and chat. Owns the
//! coarse [`SystemStatus`] lifecycle and the last-prediction record.
//!
//! ## Failure policy
//!
//! Training failure is not fatal: the orchestrator keeps serving with the
//! classifier's degraded rules. Unexpected inference errors are caught at
//! this boundary and converted to a generic apology — callers always get
//! text back.

use crate::advisor::AdviceSynthesizer;
use crate::classifier::ThresholdClassifier;
use crate::simulator::SensorSimulator;
use crate::types::{HealthLabel, SensorReading, SystemStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

// ============================================================================
// Model lifecycle seam
// ============================================================================

/// Shared lifecycle for the pipeline's models. "Training" for both current
/// models is threshold/template installation, but the seam keeps the
/// orchestrator indifferent to that.
pub trait TrainableModel {
    fn model_name(&self) -> &'static str;
    fn fit(&mut self) -> anyhow::Result<()>;
    fn is_fitted(&self) -> bool;
}

impl TrainableModel for ThresholdClassifier {
    fn model_name(&self) -> &'static str {
        "threshold_classifier"
    }

    fn fit(&mut self) -> anyhow::Result<()> {
        self.train();
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.is_trained()
    }
}

impl TrainableModel for AdviceSynthesizer {
    fn model_name(&self) -> &'static str {
        "advice_synthesizer"
    }

    fn fit(&mut self) -> anyhow::Result<()> {
        self.train();
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.is_trained()
    }
}

// ============================================================================
// Records
// ============================================================================

/// The most recent completed inference, kept for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub label: HealthLabel,
    pub advice: String,
}

/// Point-in-time orchestrator snapshot for external observability.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: SystemStatus,
    pub classifier_trained: bool,
    pub synthesizer_trained: bool,
    pub sensor_count: usize,
    pub last_prediction: Option<PredictionRecord>,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns the full simulate → classify → explain pipeline.
pub struct Orchestrator {
    simulator: SensorSimulator,
    classifier: RwLock<ThresholdClassifier>,
    synthesizer: RwLock<AdviceSynthesizer>,
    status: Mutex<SystemStatus>,
    last_prediction: Mutex<Option<PredictionRecord>>,
}

impl Orchestrator {
    pub fn new(
        simulator: SensorSimulator,
        classifier: ThresholdClassifier,
        synthesizer: AdviceSynthesizer,
    ) -> Self {
        Self {
            simulator,
            classifier: RwLock::new(classifier),
            synthesizer: RwLock::new(synthesizer),
            status: Mutex::new(SystemStatus::Initialized),
            last_prediction: Mutex::new(None),
        }
    }

    /// Train both models at startup. A failure leaves the system in
    /// `TrainingFailed` but still serving — the classifier degrades to its
    /// moisture-only rules rather than going dark.
    pub async fn auto_train(&self) -> bool {
        let mut classifier = self.classifier.write().await;
        let mut synthesizer = self.synthesizer.write().await;
        let mut models: [&mut dyn TrainableModel; 2] =
            [&mut *classifier, &mut *synthesizer];
        self.train_models(&mut models).await
    }

    /// Train `models` in order, driving the status lifecycle. Stops at the
    /// first failure; the status then records `TrainingFailed` while the
    /// pipeline keeps answering through its degraded paths.
    pub async fn train_models(&self, models: &mut [&mut dyn TrainableModel]) -> bool {
        self.set_status(SystemStatus::Training).await;
        tracing::info!("Starting model training");

        let result = models
            .iter_mut()
            .try_for_each(|model| train_model(&mut **model));

        match result {
            Ok(()) => {
                self.set_status(SystemStatus::Ready).await;
                tracing::info!("All models trained, system ready");
                true
            }
            Err(e) => {
                self.set_status(SystemStatus::TrainingFailed).await;
                tracing::error!(error = %e, "Model training failed, serving in degraded mode");
                false
            }
        }
    }

    /// One sensor-driven inference round. `reading` overrides the simulated
    /// fleet when an external report supplies real values.
    pub async fn run_inference(&self, reading: Option<SensorReading>) -> String {
        self.run_inference_record(reading).await.advice
    }

    /// Inference round returning the full prediction record. Label and
    /// advice come from the same round, so concurrent callers never see a
    /// neighbor's label.
    pub async fn run_inference_record(
        &self,
        reading: Option<SensorReading>,
    ) -> PredictionRecord {
        match self.infer(reading, None).await {
            Ok(record) => {
                tracing::info!(label = %record.label, "Inference round complete");
                record
            }
            Err(e) => PredictionRecord {
                timestamp: Utc::now(),
                label: HealthLabel::Unknown,
                advice: self.caught(e).await,
            },
        }
    }

    /// Chat flow: same pipeline with the farmer's question driving the
    /// synthesizer's knowledge-base and gateway path.
    pub async fn run_chat(&self, question: &str, reading: Option<SensorReading>) -> String {
        match self.infer(reading, Some(question)).await {
            Ok(record) => {
                tracing::info!(label = %record.label, "Chat round complete");
                record.advice
            }
            Err(e) => self.caught(e).await,
        }
    }

    async fn infer(
        &self,
        reading: Option<SensorReading>,
        question: Option<&str>,
    ) -> anyhow::Result<PredictionRecord> {
        let reading = match reading {
            Some(r) => crate::simulator::preprocess(r),
            None => self.simulator.collect_preprocessed(),
        };

        let label = self.classifier.read().await.classify(&reading);
        let advice = self
            .synthesizer
            .read()
            .await
            .explain(label, &reading, question)
            .await;

        let record = PredictionRecord {
            timestamp: Utc::now(),
            label,
            advice,
        };
        *self.last_prediction.lock().await = Some(record.clone());
        self.set_status(SystemStatus::Running).await;

        Ok(record)
    }

    /// Convert a caught pipeline error into the generic apology.
    async fn caught(&self, e: anyhow::Error) -> String {
        tracing::error!(error = %e, "Pipeline error caught at orchestrator boundary");
        self.set_status(SystemStatus::Error).await;
        "Sorry, something went wrong while processing your request. \
         Please try again in a moment."
            .to_string()
    }

    /// One fresh preprocessed reading from the simulated fleet, for the
    /// sensor-data surface.
    pub fn sample_reading(&self) -> SensorReading {
        self.simulator.collect_preprocessed()
    }

    pub async fn status_report(&self) -> StatusReport {
        StatusReport {
            status: *self.status.lock().await,
            classifier_trained: self.classifier.read().await.is_fitted(),
            synthesizer_trained: self.synthesizer.read().await.is_fitted(),
            sensor_count: self.simulator.sensor_count(),
            last_prediction: self.last_prediction.lock().await.clone(),
        }
    }

    pub async fn status(&self) -> SystemStatus {
        *self.status.lock().await
    }

    async fn set_status(&self, status: SystemStatus) {
        *self.status.lock().await = status;
    }
}

fn train_model(model: &mut dyn TrainableModel) -> anyhow::Result<()> {
    if model.is_fitted() {
        // Restored from a snapshot; do not clobber the installed state.
        tracing::info!(model = model.model_name(), "Model already fitted, skipping");
        return Ok(());
    }
    model.fit()?;
    tracing::info!(model = model.model_name(), "Model trained");
    Ok(())
}
