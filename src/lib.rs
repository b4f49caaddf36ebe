//! CropSense — agricultural operational intelligence service
//!
//! Turns (simulated or ingested) field sensor readings into crop-health
//! labels and natural-language advisory text, behind a small HTTP API.
//!
//! ## Architecture
//!
//! ```text
//!   SensorSimulator ──► preprocess ──► ThresholdClassifier ──► HealthLabel
//!        │                                                        │
//!        ▼                                                        ▼
//!   SensorReport ingest                                  AdviceSynthesizer
//!                                                        │  ├─ knowledge base
//!                                                        │  ├─ LLM gateway
//!                                                        │  └─ canned templates
//!                                                        ▼
//!                                                    advisory text
//! ```
//!
//! The [`pipeline::Orchestrator`] wires the stages and owns the system
//! lifecycle; [`api`] exposes it over HTTP. Every layer is total: failures
//! degrade to designated fallback behavior instead of propagating upward.

pub mod advisor;
pub mod api;
pub mod classifier;
pub mod config;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod simulator;
pub mod types;

pub use config::AppConfig;
pub use pipeline::Orchestrator;
pub use types::{HealthLabel, SensorReading, SystemStatus};
