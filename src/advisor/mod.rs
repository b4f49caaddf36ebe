//! Advice synthesizer ("Model B")
//!
//! Turns a health label, the raw readings and an optional free-text
//! question into a human-readable recommendation. Never raises to its
//! caller and never returns an empty string: every internal failure is
//! converted to designated fallback text.
//!
//! ## Generation ladder
//!
//! 1. knowledge-base keyword search (question path only)
//! 2. LLM gateway call with a structured prompt
//! 3. keyword-matched canned responses
//! 4. generic templated response
//!
//! Without a question, the label maps directly through a fixed template
//! table — the gateway is not involved at all.

pub mod templates;

use crate::knowledge::{KnowledgeBase, KnowledgeEntry};
use crate::llm::ChatBackend;
use crate::types::{HealthLabel, SensorReading};
use std::sync::Arc;

/// How many matched knowledge entries the prompt embeds.
const MAX_PROMPT_KNOWLEDGE: usize = 2;

/// Natural-language advisory generator.
pub struct AdviceSynthesizer {
    backend: Arc<dyn ChatBackend>,
    knowledge: Arc<KnowledgeBase>,
    trained: bool,
}

impl AdviceSynthesizer {
    pub fn new(backend: Arc<dyn ChatBackend>, knowledge: Arc<KnowledgeBase>) -> Self {
        Self {
            backend,
            knowledge,
            trained: false,
        }
    }

    /// "Training" is a no-op for the language side — generation is either
    /// remote or template-driven. Kept for the shared model lifecycle.
    pub fn train(&mut self) {
        self.trained = true;
        tracing::info!(backend = self.backend.backend_name(), "Advice synthesizer ready");
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Generate advice. Total: always returns non-empty text.
    pub async fn explain(
        &self,
        label: HealthLabel,
        reading: &SensorReading,
        question: Option<&str>,
    ) -> String {
        let Some(question) = question else {
            return templates::label_advice(label);
        };

        let matches = self.knowledge.search(question);
        if !matches.is_empty() {
            tracing::debug!(matches = matches.len(), "Knowledge base matched question");
        }

        let prompt = build_prompt(label, reading, &matches, question);
        let answer = match self.backend.generate(&prompt).await {
            Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
            Ok(_) => templates::canned_or_generic(question),
            Err(e) => {
                tracing::debug!(error = %e, "Gateway unavailable, using template ladder");
                templates::fallback_for(&e, question)
            }
        };

        if answer.is_empty() {
            // Last-resort guard; the ladder above should never get here.
            return templates::label_advice(HealthLabel::Unknown);
        }
        answer
    }
}

// ============================================================================
// Prompt construction
// ============================================================================

/// Build the structured generation prompt: annotated sensor status, up to
/// two knowledge entries, then the farmer's question.
pub fn build_prompt(
    label: HealthLabel,
    reading: &SensorReading,
    knowledge: &[&KnowledgeEntry],
    question: &str,
) -> String {
    let mut prompt = String::new();
    prompt.push_str("# Current farm readings:\n");
    prompt.push_str(&format_sensor_status(reading));
    prompt.push_str(&format!("\nClassifier assessment: {label}\n"));

    if !knowledge.is_empty() {
        prompt.push_str("\n# Reference knowledge:\n");
        for (i, entry) in knowledge.iter().take(MAX_PROMPT_KNOWLEDGE).enumerate() {
            prompt.push_str(&format!("{}. **{}**: {}\n", i + 1, entry.title, entry.content));
        }
    }

    prompt.push_str(&format!("\n{} {question}\n", templates::QUESTION_MARKER));
    prompt.push_str(
        "\n# Answer requirements:\n\
         1. Start from what the sensor data shows\n\
         2. Give specific, actionable steps\n\
         3. Explain the agronomic reasoning\n\
         4. Note any precautions\n\
         5. If a reading is abnormal, call it out explicitly\n\n\
         Give practical advice directly:",
    );
    prompt
}

/// Format each known metric with a severity tag from fixed bands.
fn format_sensor_status(reading: &SensorReading) -> String {
    if reading.is_empty() {
        return "No sensor data available.\n".to_string();
    }

    let mut lines = Vec::new();

    if let Some(v) = reading.scalar("soil_moisture") {
        lines.push(format!("- Soil moisture: {v}% ({})", moisture_band(v)));
    }
    if let Some(v) = reading.scalar("temperature") {
        lines.push(format!("- Temperature: {v}°C ({})", temperature_band(v)));
    }
    if let Some(v) = reading.scalar("humidity") {
        lines.push(format!("- Air humidity: {v}%"));
    }
    if let Some(v) = reading.scalar("soil_ph") {
        lines.push(format!("- Soil pH: {v} ({})", ph_band(v)));
    }

    let flat = reading.flatten();
    let mut npk_parts = Vec::new();
    for (key, name) in [
        ("npk_nitrogen", "N"),
        ("npk_phosphorus", "P"),
        ("npk_potassium", "K"),
    ] {
        if let Some(v) = flat.get(key) {
            npk_parts.push(format!("{name}:{v}% ({})", nutrient_band(*v)));
        }
    }
    if !npk_parts.is_empty() {
        lines.push(format!("- Nutrients: {}", npk_parts.join(", ")));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn moisture_band(v: f64) -> &'static str {
    if v < 25.0 {
        "critical-low"
    } else if v < 35.0 {
        "low"
    } else if v > 65.0 {
        "high"
    } else {
        "normal"
    }
}

fn temperature_band(v: f64) -> &'static str {
    if v < 10.0 {
        "critical-low"
    } else if v < 15.0 {
        "low"
    } else if v > 35.0 {
        "high"
    } else {
        "normal"
    }
}

fn ph_band(v: f64) -> &'static str {
    if v < 5.5 {
        "acidic"
    } else if v > 7.5 {
        "alkaline"
    } else {
        "normal"
    }
}

fn nutrient_band(v: f64) -> &'static str {
    if v < 30.0 {
        "deficient"
    } else if v < 40.0 {
        "low"
    } else {
        "sufficient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GatewayError;
    use crate::types::NpkReading;
    use async_trait::async_trait;

    /// Scripted backend for exercising the fallback ladder.
    struct StubBackend {
        reply: Result<String, GatewayError>,
    }

    #[async_trait]
    impl ChatBackend for StubBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, GatewayError> {
            self.reply.clone()
        }

        fn is_configured(&self) -> bool {
            self.reply.is_ok()
        }

        fn backend_name(&self) -> &'static str {
            "stub"
        }
    }

    fn synthesizer(reply: Result<String, GatewayError>) -> AdviceSynthesizer {
        let mut s = AdviceSynthesizer::new(
            Arc::new(StubBackend { reply }),
            Arc::new(KnowledgeBase::builtin()),
        );
        s.train();
        s
    }

    fn sample_reading() -> SensorReading {
        let mut r = SensorReading::new();
        r.set_scalar("soil_moisture", 22.0);
        r.set_scalar("temperature", 37.5);
        r.set_scalar("soil_ph", 5.2);
        r.set_npk(NpkReading { nitrogen: 28.0, phosphorus: 35.0, potassium: 50.0 });
        r
    }

    #[tokio::test]
    async fn test_question_less_path_uses_label_table() {
        let s = synthesizer(Ok("unused".to_string()));
        let advice = s
            .explain(HealthLabel::NeedsWater, &sample_reading(), None)
            .await;
        assert_eq!(advice, templates::label_advice(HealthLabel::NeedsWater));
    }

    #[tokio::test]
    async fn test_successful_gateway_answer_passes_through() {
        let s = synthesizer(Ok("Water the orchard at dusk.".to_string()));
        let advice = s
            .explain(
                HealthLabel::NeedsWater,
                &sample_reading(),
                Some("when should I water?"),
            )
            .await;
        assert_eq!(advice, "Water the orchard at dusk.");
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_to_canned_response() {
        let s = synthesizer(Err(GatewayError::NetworkUnavailable("down".to_string())));
        let advice = s
            .explain(
                HealthLabel::Healthy,
                &sample_reading(),
                Some("how to handle spider mites?"),
            )
            .await;
        assert!(advice.contains("spider mite"));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_gets_distinguished_text() {
        let s = synthesizer(Err(GatewayError::QuotaExhausted));
        let advice = s
            .explain(
                HealthLabel::Healthy,
                &sample_reading(),
                Some("how to handle spider mites?"),
            )
            .await;
        assert!(advice.contains("balance insufficient"));
    }

    #[tokio::test]
    async fn test_explain_never_empty_for_any_error_kind() {
        let errors = vec![
            GatewayError::ConfigurationMissing,
            GatewayError::NetworkUnavailable("x".to_string()),
            GatewayError::AuthenticationRejected,
            GatewayError::QuotaExhausted,
            GatewayError::RateLimited,
            GatewayError::MalformedResponse("x".to_string()),
            GatewayError::UnknownProviderError { status: 503, body: String::new() },
        ];
        for err in errors {
            let s = synthesizer(Err(err.clone()));
            let advice = s
                .explain(HealthLabel::Unknown, &SensorReading::new(), Some("anything odd"))
                .await;
            assert!(!advice.is_empty(), "empty advice for {err:?}");
        }
    }

    #[test]
    fn test_prompt_embeds_at_most_two_knowledge_entries() {
        let kb = KnowledgeBase::builtin();
        let matches = kb.search("water");
        assert!(matches.len() > 2, "test needs >2 matches to be meaningful");

        let prompt = build_prompt(
            HealthLabel::Healthy,
            &sample_reading(),
            &matches,
            "how much water?",
        );
        assert!(prompt.contains("1. **"));
        assert!(prompt.contains("2. **"));
        assert!(!prompt.contains("3. **"));
    }

    #[test]
    fn test_prompt_annotates_severity_bands() {
        let prompt = build_prompt(
            HealthLabel::NeedsWater,
            &sample_reading(),
            &[],
            "why is my crop wilting?",
        );
        assert!(prompt.contains("Soil moisture: 22% (critical-low)"));
        assert!(prompt.contains("Temperature: 37.5°C (high)"));
        assert!(prompt.contains("Soil pH: 5.2 (acidic)"));
        assert!(prompt.contains("N:28% (deficient)"));
        assert!(prompt.contains("K:50% (sufficient)"));
        assert!(prompt.contains("Classifier assessment: needs_water"));
        assert!(prompt.contains(templates::QUESTION_MARKER));
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(moisture_band(24.9), "critical-low");
        assert_eq!(moisture_band(25.0), "low");
        assert_eq!(moisture_band(35.0), "normal");
        assert_eq!(moisture_band(65.1), "high");
        assert_eq!(temperature_band(9.9), "critical-low");
        assert_eq!(ph_band(7.6), "alkaline");
        assert_eq!(nutrient_band(39.9), "low");
        assert_eq!(nutrient_band(40.0), "sufficient");
    }
}
