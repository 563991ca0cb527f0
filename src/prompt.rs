//! Prompt templates for the CRO analysis.
//!
//! The template variant decides the JSON shape the model is asked for, and
//! therefore which schema `analysis::parse_completion` validates against.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// System message sent alongside every analysis prompt.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that returns only valid JSON, no markdown, no extra text.";

const MINIMAL_TEMPLATE: &str = r#"You are an expert in website design and conversion rate optimization (CRO). Analyze the following HTML code of the hero section of a landing page and provide actionable, diverse suggestions to improve its design, usability, and conversion potential. Your response should strictly follow this JSON format:

{
    "code": "Modified HTML and CSS code for the hero section",
    "suggestions": [
        {
            "section": "Hero Section",
            "suggestion": "Your first specific actionable suggestion for improving the hero section."
        },
        {
            "section": "Hero Section",
            "suggestion": "Your second specific actionable suggestion for improving the hero section."
        },
        {
            "section": "Hero Section",
            "suggestion": "Your third specific actionable suggestion for improving the hero section."
        }
    ]
}

Replace 'Modified HTML and CSS code for the hero section' with the updated hero section code based on CRO principles. Provide multiple specific suggestions, each addressing a unique aspect such as layout, typography, call-to-action, visuals, responsiveness, or accessibility."#;

const EXTENDED_TEMPLATE: &str = r#"You are an expert in website design and conversion rate optimization (CRO). Analyze the following HTML code from the header, navigation and hero section of a landing page. Infer the industry or niche of the site and evaluate it against that niche's conversion benchmarks. Your response must be a single JSON object that strictly follows this format:

{
    "code": "Modified HTML and CSS code for the hero section",
    "performance_score": {
        "overall": 0,
        "visual_hierarchy": 0,
        "call_to_action": 0,
        "trust_signals": 0,
        "mobile_readiness": 0
    },
    "industry_specific_metrics": {
        "benchmark_conversion_rate": "Typical conversion rate for this niche, e.g. 2.5%",
        "key_metrics_to_track": ["Metric name", "Metric name"]
    },
    "conversion_elements": {
        "present": ["Conversion element found on the page"],
        "missing": ["Conversion element the page should add"],
        "needs_improvement": ["Existing element that underperforms"]
    },
    "niche_optimizations": [
        {
            "title": "Short name of the optimization",
            "impact": "high | medium | low",
            "description": "Specific, actionable change to make",
            "expected_improvement": "Estimated uplift, e.g. 10-15% more sign-ups",
            "implementation_priority": 1
        }
    ]
}

Every performance_score value is an integer from 0 to 100. Provide at least three niche_optimizations, each addressing a different aspect such as layout, typography, call-to-action, visuals, responsiveness, or accessibility. Replace 'Modified HTML and CSS code for the hero section' with the updated hero section code based on CRO principles."#;

/// Output schema requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    /// `code` plus three hero-section suggestions, relayed as `{cro_analysis}`.
    Minimal,
    /// Scores, niche metrics, conversion elements and optimizations.
    Extended,
}

impl SchemaVariant {
    pub fn template(self) -> &'static str {
        match self {
            SchemaVariant::Minimal => MINIMAL_TEMPLATE,
            SchemaVariant::Extended => EXTENDED_TEMPLATE,
        }
    }
}

impl FromStr for SchemaVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(SchemaVariant::Minimal),
            "extended" => Ok(SchemaVariant::Extended),
            other => Err(AppError::Config(format!(
                "Unknown analysis schema '{}', expected 'minimal' or 'extended'",
                other
            ))),
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::Minimal => f.write_str("minimal"),
            SchemaVariant::Extended => f.write_str("extended"),
        }
    }
}

pub fn build_prompt(variant: SchemaVariant, excerpt: &str) -> String {
    let template = variant.template();
    let mut result = String::with_capacity(template.len() + excerpt.len() + 2);
    result.push_str(template);
    result.push_str("\n\n");
    result.push_str(excerpt);
    result
}
