//! Canned advisory templates
//!
//! Deterministic text served when the LLM gateway is unavailable, plus the
//! fixed label→advice table used on the question-less inference path.
//! Keyword matching runs in a fixed priority order; the first topic that
//! matches wins.

use crate::llm::GatewayError;
use crate::types::HealthLabel;

/// Marker line prefix the prompt builder uses for the farmer's question.
/// The generic fallback extracts the question back out of a full prompt
/// through this marker.
pub const QUESTION_MARKER: &str = "# Farmer's question:";

// ============================================================================
// Fallback routing
// ============================================================================

/// Map a gateway failure to user-facing fallback text.
///
/// Quota exhaustion gets its own distinguished message; every other failure
/// kind routes to the keyword-matched canned responses. `text` is whatever
/// carries the user's topic — the raw question or the full prompt.
pub fn fallback_for(error: &GatewayError, text: &str) -> String {
    match error {
        GatewayError::QuotaExhausted => balance_exhausted(),
        _ => canned_or_generic(text),
    }
}

/// Keyword-matched canned response, or the generic template when no topic
/// keyword is present.
pub fn canned_or_generic(text: &str) -> String {
    let lower = text.to_lowercase();

    if contains_any(&lower, &["yellowing", "yellow leaves", "yellow leaf", "chlorosis"]) {
        yellowing_leaves()
    } else if contains_any(&lower, &["spider mite", "mite", "red spider"]) {
        spider_mites()
    } else if contains_any(&lower, &["npk", "fertilizer", "fertiliser", "nutrient ratio"]) {
        fertilizer_ratio()
    } else if contains_any(&lower, &["heat", "temperature", "hot weather"]) {
        heat_stress()
    } else if contains_any(&lower, &["irrigation", "watering", "water", "moisture"]) {
        irrigation()
    } else {
        generic(&extract_question(text))
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Pull the question line back out of a full prompt. Plain questions pass
/// through unchanged.
pub fn extract_question(text: &str) -> String {
    for line in text.lines() {
        if let Some(q) = line.strip_prefix(QUESTION_MARKER) {
            let q = q.trim();
            if !q.is_empty() {
                return q.to_string();
            }
        }
    }
    if text.contains(QUESTION_MARKER) {
        // A prompt whose question line is empty or missing.
        return "your farming question".to_string();
    }
    text.trim().to_string()
}

// ============================================================================
// Label → advice table (question-less path)
// ============================================================================

/// Fixed advice sentence per health label.
pub fn label_advice(label: HealthLabel) -> String {
    match label {
        HealthLabel::Healthy => {
            "Crop condition looks good. Keep the current irrigation and \
             fertilization schedule and re-check readings tomorrow."
        }
        HealthLabel::NeedsWater => {
            "Soil moisture is low. Irrigate in the early morning or evening \
             and re-measure after the water has soaked in."
        }
        HealthLabel::TooMuchWater => {
            "Soil moisture is high. Hold off irrigation, check drainage \
             channels, and watch for root-rot symptoms."
        }
        HealthLabel::NeedsNutrients => {
            "Nutrient deficit detected. Apply a balanced NPK fertilizer and \
             water it in; re-test soil nutrients in a week."
        }
        HealthLabel::PhIssue => {
            "Soil pH is outside the healthy range. Apply lime for acidic \
             soil or sulfur for alkaline soil, in split doses."
        }
        HealthLabel::Unknown => {
            "Readings could not be interpreted. Please consult a local \
             agricultural technician for an on-site assessment."
        }
    }
    .to_string()
}

// ============================================================================
// Canned topic responses
// ============================================================================

/// Distinguished response for provider quota exhaustion (HTTP 402).
pub fn balance_exhausted() -> String {
    "** Provider balance insufficient **\n\n\
     The AI provider account has run out of credit, so live AI answers are \
     temporarily unavailable.\n\n\
     The assistant has switched to its built-in advisory mode: you still get \
     keyword-matched agronomy guidance from the local knowledge base.\n\n\
     To restore AI answers, top up the provider account; the system switches \
     back automatically on the next request.\n\n\
     Now, tell me about your crop issue and I will do my best to help."
        .to_string()
}

fn yellowing_leaves() -> String {
    "** Yellowing leaves — likely causes **\n\n\
     Nutrient deficiency:\n\
     - Uniform yellowing: nitrogen shortfall, apply nitrogen fertilizer\n\
     - New leaves yellow with green veins: iron deficiency, apply iron sulfate\n\
     - Old leaves yellowing first: magnesium deficiency, apply magnesium sulfate\n\n\
     Water problems:\n\
     - Waterlogged roots rot and yellow the canopy: improve drainage\n\
     - Drought wilts then yellows: irrigate promptly\n\n\
     Pests:\n\
     - Check for spider mites and aphids; treat with biological agents early\n\n\
     Next steps: match the symptom pattern above, correct the single most \
     likely cause first, and re-inspect in three to five days."
        .to_string()
}

fn spider_mites() -> String {
    "** Citrus spider mite management **\n\n\
     Identification:\n\
     - Pale stippling on the upper leaf surface\n\
     - Moving red dots on the underside\n\
     - Severe cases: leaves bronze, dry out and drop\n\n\
     Chemical control:\n\
     - Rotate miticides between sprays to prevent resistance\n\
     - Spray the leaf underside thoroughly\n\n\
     Biological control:\n\
     - Release predatory mites; protect ladybirds and lacewings\n\n\
     Cultural control:\n\
     - Keep the orchard ventilated, avoid excess nitrogen\n\
     - Clean up fallen leaves in winter to cut the overwintering source\n\n\
     Scout more often during hot, dry spells — populations explode fast."
        .to_string()
}

fn fertilizer_ratio() -> String {
    "** NPK ratio guide by growth stage **\n\n\
     - Young trees (years 1-2): N-P-K 2-1-1\n\
     - Flowering: N-P-K 1-2-2\n\
     - Fruit expansion: N-P-K 1-1-2\n\
     - Post-harvest recovery: N-P-K 2-1-1\n\n\
     Application:\n\
     - Base dressing: organic matter plus compound fertilizer in a ring \
     trench at the canopy drip line\n\
     - Top dressing: before flowering, during fruit set, after harvest\n\
     - Foliar feed: boron, zinc and magnesium as needed\n\n\
     Always water in after application and avoid single-nutrient overdosing; \
     a soil test beats guesswork."
        .to_string()
}

fn heat_stress() -> String {
    "** Heat stress on citrus **\n\n\
     Symptoms:\n\
     - Scorched, curling leaves\n\
     - Sunburn on sun-facing fruit\n\
     - Increased flower and fruit drop\n\n\
     Protection:\n\
     - Irrigate early morning or evening, never at midday\n\
     - Bag or shade exposed fruit during heat waves\n\
     - Maintain ground cover to cool the root zone\n\n\
     Reference ranges: growth 15-30°C, flowering 17-20°C, fruit \
     development 20-30°C. Above 35°C, treat every day as a mitigation day."
        .to_string()
}

fn irrigation() -> String {
    "** Citrus irrigation guide **\n\n\
     Stage targets:\n\
     - Bud break: keep soil evenly moist\n\
     - Flowering: 30-40% soil moisture\n\
     - Fruit expansion: 40-50% soil moisture\n\
     - Ripening: ease off to concentrate sugars\n\n\
     Methods: drip irrigation is the most uniform and water-efficient; \
     furrow irrigation needs careful drainage.\n\n\
     Field check: soil that forms a ball and crumbles when dropped is \
     right; soil that will not ball needs water; sticky soil is too wet.\n\n\
     Avoid midday irrigation in summer and mind drainage in the rainy season."
        .to_string()
}

/// Generic response when no topic keyword matches: echo the question and
/// offer the assistant's capability categories.
fn generic(question: &str) -> String {
    format!(
        "** Smart farming assistant **\n\n\
         On \"{question}\", here is how I can help:\n\n\
         What I can analyze:\n\
         - Soil nutrient status\n\
         - Water management\n\
         - Pest and disease control\n\
         - Growing-environment adjustments\n\n\
         To give a targeted answer, please add:\n\
         - The specific symptoms you see\n\
         - When they started and how widespread they are\n\
         - What you have already tried\n\n\
         For complex problems, a local agricultural technician can confirm \
         the diagnosis on site."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_priority_order() {
        // Yellowing outranks mites even when both keywords appear.
        let text = "yellowing leaves, maybe spider mite damage?";
        assert!(canned_or_generic(text).contains("Yellowing leaves"));

        // Mites outrank fertilizer.
        let text = "spider mite after fertilizer";
        assert!(canned_or_generic(text).contains("spider mite"));
    }

    #[test]
    fn test_all_topics_reachable() {
        assert!(canned_or_generic("leaves turning yellow? yellowing").contains("Yellowing"));
        assert!(canned_or_generic("red spider everywhere").contains("mite"));
        assert!(canned_or_generic("what npk ratio").contains("NPK ratio"));
        assert!(canned_or_generic("heat wave coming").contains("Heat stress"));
        assert!(canned_or_generic("how much watering").contains("irrigation"));
    }

    #[test]
    fn test_generic_echoes_question() {
        let response = canned_or_generic("when should I prune");
        assert!(response.contains("when should I prune"));
    }

    #[test]
    fn test_extract_question_from_prompt() {
        let prompt = format!(
            "preamble\nsensor lines\n{QUESTION_MARKER} how do I prune?\nmore"
        );
        assert_eq!(extract_question(&prompt), "how do I prune?");
    }

    #[test]
    fn test_extract_question_passthrough() {
        assert_eq!(extract_question("plain question"), "plain question");
    }

    #[test]
    fn test_extract_question_multiline_passthrough() {
        // A long plain question is echoed verbatim, not replaced.
        let q = "my trees look sick\nthe canopy is thinning\nfruit keeps dropping\nwhat should I do?";
        assert_eq!(extract_question(q), q);

        let response = canned_or_generic(q);
        assert!(response.contains("what should I do?"));
    }

    #[test]
    fn test_fallback_routes_quota_to_balance_text() {
        let text = fallback_for(&GatewayError::QuotaExhausted, "anything");
        assert!(text.contains("balance insufficient"));

        let text = fallback_for(&GatewayError::RateLimited, "watering advice");
        assert!(text.contains("irrigation guide"));
    }

    #[test]
    fn test_label_advice_never_empty() {
        for label in [
            HealthLabel::Healthy,
            HealthLabel::NeedsWater,
            HealthLabel::TooMuchWater,
            HealthLabel::NeedsNutrients,
            HealthLabel::PhIssue,
            HealthLabel::Unknown,
        ] {
            assert!(!label_advice(label).is_empty());
        }
    }
}
