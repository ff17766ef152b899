//! Response interpretation.
//!
//! Turns the model's reply into analysis fields. Locating the JSON object is
//! an ordered chain of pure strategies (first success wins); once an object
//! is found, every field is coerced on its own so that one malformed value
//! never costs the whole record.

use crate::paper::NOT_SPECIFIED;
use crate::taxonomy::{Taxonomy, UNCLASSIFIED};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Parsed JSON object of a model reply
pub type Document = Map<String, Value>;

/// A strategy for locating the JSON object inside a reply
pub type Strategy = fn(&str) -> Option<Document>;

/// Fallback chain, tried in order.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("whole_document", whole_document),
    ("fenced_block", fenced_block),
    ("brace_span", brace_span),
];

/// Neutral novelty score used when the model gives none
pub const DEFAULT_NOVELTY_SCORE: u8 = 3;

/// Characters of raw reply shown in warnings
const PREVIEW_CHARS: usize = 200;

/// Interpreted fields of one model reply
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFields {
    pub task_category: String,
    pub methods: String,
    pub contributions: String,
    pub training_dataset: String,
    pub testing_dataset: String,
    pub evaluation_metrics: String,
    pub confidence: f64,
    pub research_field: Option<String>,
    pub novelty_score: Option<u8>,
}

impl AnalysisFields {
    /// Coerce a parsed document, defaulting each field independently.
    ///
    /// `research_field` and `novelty_score` are only filled when `extended`.
    pub fn from_document(doc: &Document, taxonomy: &Taxonomy, extended: bool) -> Self {
        Self {
            task_category: category_field(doc, taxonomy),
            methods: text_field(doc, "methods"),
            contributions: text_field(doc, "contributions"),
            training_dataset: text_field(doc, "training_dataset"),
            testing_dataset: text_field(doc, "testing_dataset"),
            evaluation_metrics: text_field(doc, "evaluation_metrics"),
            confidence: confidence_field(doc),
            research_field: extended.then(|| text_field(doc, "research_field")),
            novelty_score: extended.then(|| novelty_field(doc)),
        }
    }
}

/// Locate the JSON object in `raw` using the fallback chain.
///
/// Returns `None`, after logging a preview of the reply, when no strategy
/// finds an object.
pub fn parse_response(raw: &str) -> Option<Document> {
    for (name, strategy) in STRATEGIES {
        if let Some(doc) = strategy(raw) {
            debug!(strategy = *name, keys = doc.len(), "Located JSON in model reply");
            return Some(doc);
        }
    }
    warn!(content_preview = %preview(raw), "Could not extract JSON from model reply");
    None
}

/// Parse a reply and coerce its fields.
pub fn interpret(raw: &str, taxonomy: &Taxonomy, extended: bool) -> Option<AnalysisFields> {
    parse_response(raw).map(|doc| AnalysisFields::from_document(&doc, taxonomy, extended))
}

/// First `PREVIEW_CHARS` characters of a reply.
pub fn preview(raw: &str) -> String {
    let mut preview: String = raw.chars().take(PREVIEW_CHARS).collect();
    if raw.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}

/// Strategy 1: the whole reply is a JSON object.
pub fn whole_document(raw: &str) -> Option<Document> {
    as_object(raw.trim())
}

/// Strategy 2: the first ```json fenced block.
pub fn fenced_block(raw: &str) -> Option<Document> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?i:json)[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()?;

    fence
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .find_map(|m| as_object(m.as_str().trim()))
}

/// Strategy 3: the first top-level `{...}` span that parses as an object.
///
/// Braces inside JSON string literals do not count towards nesting.
pub fn brace_span(raw: &str) -> Option<Document> {
    top_level_spans(raw).into_iter().find_map(as_object)
}

fn as_object(text: &str) -> Option<Document> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn top_level_spans(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw.char_indices() {
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&raw[start..=idx]);
                }
            }
            _ => {}
        }
    }
    spans
}

fn category_field(doc: &Document, taxonomy: &Taxonomy) -> String {
    let Some(answer) = doc.get("task_category").and_then(Value::as_str) else {
        return UNCLASSIFIED.to_string();
    };
    match taxonomy.resolve(answer) {
        Some(name) => name.to_string(),
        None => {
            if !answer.trim().eq_ignore_ascii_case(UNCLASSIFIED) {
                debug!(answer = %answer, "Model named a category outside the taxonomy");
            }
            UNCLASSIFIED.to_string()
        }
    }
}

fn text_field(doc: &Document, key: &str) -> String {
    let text = match doc.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => {
            let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            parts.map(|p| {
                p.into_iter()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        }
        _ => None,
    };
    match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => NOT_SPECIFIED.to_string(),
    }
}

fn confidence_field(doc: &Document) -> f64 {
    let value = match doc.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if (0.0..=1.0).contains(&v) => v,
        Some(v) => {
            debug!(confidence = v, "Confidence outside [0, 1], using 0.0");
            0.0
        }
        None => 0.0,
    }
}

fn novelty_field(doc: &Document) -> u8 {
    let value = match doc.get("novelty_score") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if (1..=5).contains(&v) => v as u8,
        _ => DEFAULT_NOVELTY_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPLY: &str = r#"{
        "task_category": "Navigation",
        "methods": "Waypoint prediction with a vision-language model",
        "contributions": "A zero-shot navigation agent",
        "training_dataset": "R2R",
        "testing_dataset": "R2R, RxR",
        "evaluation_metrics": "SR, SPL",
        "confidence": 0.87
    }"#;

    fn taxonomy() -> Taxonomy {
        Taxonomy::builtin()
    }

    #[test]
    fn test_round_trip_documented_keys() {
        let fields = interpret(FULL_REPLY, &taxonomy(), false).expect("parses");
        assert_eq!(
            fields,
            AnalysisFields {
                task_category: "Navigation".into(),
                methods: "Waypoint prediction with a vision-language model".into(),
                contributions: "A zero-shot navigation agent".into(),
                training_dataset: "R2R".into(),
                testing_dataset: "R2R, RxR".into(),
                evaluation_metrics: "SR, SPL".into(),
                confidence: 0.87,
                research_field: None,
                novelty_score: None,
            }
        );
    }

    #[test]
    fn test_extended_round_trip() {
        let reply = r#"{"task_category": "Reinforcement Learning", "methods": "PPO",
            "contributions": "c", "training_dataset": "D4RL", "testing_dataset": "D4RL",
            "evaluation_metrics": "normalized score", "confidence": 1,
            "research_field": "machine learning", "novelty_score": 4}"#;
        let fields = interpret(reply, &taxonomy(), true).expect("parses");
        assert_eq!(fields.confidence, 1.0);
        assert_eq!(fields.research_field.as_deref(), Some("machine learning"));
        assert_eq!(fields.novelty_score, Some(4));
    }

    #[test]
    fn test_fenced_equals_unwrapped() {
        let fenced = format!("Here is my analysis:\n```json\n{}\n```\nHope this helps!", FULL_REPLY);
        let unwrapped = interpret(FULL_REPLY, &taxonomy(), false);
        assert_eq!(interpret(&fenced, &taxonomy(), false), unwrapped);

        let upper = format!("```JSON\n{}\n```", FULL_REPLY);
        assert_eq!(interpret(&upper, &taxonomy(), false), unwrapped);
    }

    #[test]
    fn test_strategy_order() {
        assert!(whole_document(FULL_REPLY).is_some());
        assert!(whole_document("prefix {\"a\": 1}").is_none());
        assert!(fenced_block("```json\n{\"a\": 1}\n```").is_some());
        assert!(fenced_block("```\n{\"a\": 1}\n```").is_none());
        assert!(brace_span("prefix {\"a\": 1} suffix").is_some());
    }

    #[test]
    fn test_prose_wrapped_object() {
        let reply = format!("Sure! The result is {} Let me know.", FULL_REPLY);
        let fields = interpret(&reply, &taxonomy(), false).expect("brace span");
        assert_eq!(fields.task_category, "Navigation");
    }

    #[test]
    fn test_brace_span_skips_non_json_braces() {
        let reply = r#"Using {placeholders} here. {"task_category": "Navigation", "note": "a } inside"}"#;
        let doc = brace_span(reply).expect("second span parses");
        assert_eq!(doc.get("note").and_then(Value::as_str), Some("a } inside"));
    }

    #[test]
    fn test_missing_confidence_defaults_to_zero() {
        let reply = r#"{"task_category": "Navigation", "methods": "m"}"#;
        let fields = interpret(reply, &taxonomy(), false).expect("parses");
        assert_eq!(fields.confidence, 0.0);
        assert_eq!(fields.contributions, NOT_SPECIFIED);
        assert_eq!(fields.evaluation_metrics, NOT_SPECIFIED);
    }

    #[test]
    fn test_confidence_coercion() {
        let conf = |v: &str| {
            let reply = format!(r#"{{"confidence": {}}}"#, v);
            interpret(&reply, &taxonomy(), false).expect("parses").confidence
        };
        assert_eq!(conf("0.5"), 0.5);
        assert_eq!(conf("\"0.75\""), 0.75);
        assert_eq!(conf("\"high\""), 0.0);
        assert_eq!(conf("1.7"), 0.0);
        assert_eq!(conf("-0.2"), 0.0);
        assert_eq!(conf("null"), 0.0);
    }

    #[test]
    fn test_novelty_coercion() {
        let novelty = |v: &str| {
            let reply = format!(r#"{{"novelty_score": {}}}"#, v);
            interpret(&reply, &taxonomy(), true).expect("parses").novelty_score
        };
        assert_eq!(novelty("5"), Some(5));
        assert_eq!(novelty("2.0"), Some(2));
        assert_eq!(novelty("\"4\""), Some(4));
        assert_eq!(novelty("\"very novel\""), Some(DEFAULT_NOVELTY_SCORE));
        assert_eq!(novelty("3.5"), Some(DEFAULT_NOVELTY_SCORE));
        assert_eq!(novelty("9"), Some(DEFAULT_NOVELTY_SCORE));
        assert_eq!(novelty("null"), Some(DEFAULT_NOVELTY_SCORE));
    }

    #[test]
    fn test_category_outside_taxonomy() {
        let reply = r#"{"task_category": "Quantum Knitting"}"#;
        let fields = interpret(reply, &taxonomy(), false).expect("parses");
        assert_eq!(fields.task_category, UNCLASSIFIED);

        let reply = r#"{"task_category": "navigation"}"#;
        let fields = interpret(reply, &taxonomy(), false).expect("parses");
        assert_eq!(fields.task_category, "Navigation");

        let fields = interpret("{}", &taxonomy(), false).expect("parses");
        assert_eq!(fields.task_category, UNCLASSIFIED);
    }

    #[test]
    fn test_text_field_shapes() {
        let reply = r#"{"training_dataset": ["COCO", "LVIS"], "testing_dataset": "",
            "methods": 42, "contributions": {"a": 1}, "evaluation_metrics": [1, 2]}"#;
        let fields = interpret(reply, &taxonomy(), false).expect("parses");
        assert_eq!(fields.training_dataset, "COCO, LVIS");
        assert_eq!(fields.testing_dataset, NOT_SPECIFIED);
        assert_eq!(fields.methods, NOT_SPECIFIED);
        assert_eq!(fields.contributions, NOT_SPECIFIED);
        assert_eq!(fields.evaluation_metrics, NOT_SPECIFIED);
    }

    #[test]
    fn test_unparseable_reply() {
        assert!(parse_response("I cannot analyze this paper.").is_none());
        assert!(parse_response("{ broken json").is_none());
        assert!(parse_response("[1, 2, 3]").is_none());
        assert!(parse_response("").is_none());
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.len(), PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}
