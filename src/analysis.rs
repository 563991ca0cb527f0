//! Sanitizing and validating the model's JSON output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::prompt::SchemaVariant;

const FENCE: &str = "```";

#[derive(Debug, Deserialize)]
pub struct Suggestion {
    pub section: String,
    pub suggestion: String,
}

#[derive(Debug, Deserialize)]
pub struct MinimalAnalysis {
    pub code: String,
    pub suggestions: Vec<Suggestion>,
}

/// A number or a free-form string such as `"2.5%"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct IndustryMetrics {
    pub benchmark_conversion_rate: Metric,
    pub key_metrics_to_track: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NicheOptimization {
    pub title: String,
    pub impact: String,
    pub description: String,
    pub expected_improvement: Metric,
    pub implementation_priority: Metric,
}

#[derive(Debug, Deserialize)]
pub struct ExtendedAnalysis {
    pub code: String,
    pub performance_score: BTreeMap<String, f64>,
    pub industry_specific_metrics: IndustryMetrics,
    pub conversion_elements: BTreeMap<String, Vec<String>>,
    pub niche_optimizations: Vec<NicheOptimization>,
}

/// Body returned by `/analyze` on success.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Minimal { cro_analysis: String },
    Extended(Value),
}

/// Removes a leading fence (with optional language tag) and a trailing fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Parses a raw completion and checks it against `variant`'s schema.
pub fn parse_completion(variant: SchemaVariant, raw: &str) -> Result<AnalysisResponse> {
    let cleaned = strip_code_fences(raw);
    let invalid = |message: String| AppError::InvalidModelOutput {
        message,
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(cleaned).map_err(|e| invalid(e.to_string()))?;

    match variant {
        SchemaVariant::Minimal => {
            MinimalAnalysis::deserialize(&value).map_err(|e| invalid(e.to_string()))?;
            Ok(AnalysisResponse::Minimal {
                cro_analysis: cleaned.to_string(),
            })
        }
        SchemaVariant::Extended => {
            ExtendedAnalysis::deserialize(&value).map_err(|e| invalid(e.to_string()))?;
            Ok(AnalysisResponse::Extended(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extended_sample() -> Value {
        json!({
            "code": "<section class=\"hero\"><h1>Ship faster</h1></section>",
            "performance_score": { "overall": 62, "call_to_action": 40 },
            "industry_specific_metrics": {
                "benchmark_conversion_rate": "3.1%",
                "key_metrics_to_track": ["Trial sign-ups", "Bounce rate"]
            },
            "conversion_elements": {
                "present": ["Headline"],
                "missing": ["Social proof"]
            },
            "niche_optimizations": [{
                "title": "Primary CTA contrast",
                "impact": "high",
                "description": "Use a contrasting color for the sign-up button.",
                "expected_improvement": "8-12%",
                "implementation_priority": 1
            }],
            "extra_notes": "kept verbatim"
        })
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(strip_code_fences("  ```\n[1, 2]\n```  \n"), "[1, 2]");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences(" {\"a\": \"```\"} "), "{\"a\": \"```\"}");
    }

    #[test]
    fn fenced_and_plain_completions_parse_equal() {
        let body = extended_sample().to_string();
        let fenced = format!("```json\n{}\n```", body);

        let plain = parse_completion(SchemaVariant::Extended, &body).unwrap();
        let from_fenced = parse_completion(SchemaVariant::Extended, &fenced).unwrap();
        assert_eq!(plain, from_fenced);
        assert_eq!(plain, AnalysisResponse::Extended(extended_sample()));
    }

    #[test]
    fn invalid_json_keeps_raw_text() {
        let raw = "```json\n{\"code\": \n```";
        match parse_completion(SchemaVariant::Extended, raw) {
            Err(AppError::InvalidModelOutput { message, raw: kept }) => {
                assert!(message.contains("EOF"), "{message}");
                assert_eq!(kept, raw);
            }
            other => panic!("expected InvalidModelOutput, got {:?}", other),
        }
    }

    #[test]
    fn extended_rejects_missing_section() {
        let mut value = extended_sample();
        value.as_object_mut().unwrap().remove("niche_optimizations");
        let err = parse_completion(SchemaVariant::Extended, &value.to_string()).unwrap_err();
        match err {
            AppError::InvalidModelOutput { message, .. } => {
                assert!(message.contains("niche_optimizations"), "{message}");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn minimal_wraps_cleaned_text() {
        let raw = "```json\n{\"code\": \"<h1>Hi</h1>\", \"suggestions\": [{\"section\": \"Hero Section\", \"suggestion\": \"Bigger CTA\"}]}\n```";
        let result = parse_completion(SchemaVariant::Minimal, raw).unwrap();
        let AnalysisResponse::Minimal { cro_analysis } = result else {
            panic!("expected minimal response");
        };
        let parsed: Value = serde_json::from_str(&cro_analysis).unwrap();
        assert_eq!(parsed["suggestions"][0]["suggestion"], "Bigger CTA");
    }

    #[test]
    fn minimal_rejects_wrong_shape() {
        let raw = r#"{"code": "<h1>Hi</h1>", "suggestions": "none"}"#;
        assert!(matches!(
            parse_completion(SchemaVariant::Minimal, raw),
            Err(AppError::InvalidModelOutput { .. })
        ));
    }
}
