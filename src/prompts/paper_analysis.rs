//! Paper analysis prompts.
//!
//! Contains the system prompt and the user prompt templates for extracting a
//! structured analysis of one paper. The template wording shapes the model's
//! output distribution, so any edit must bump [`PROMPT_VERSION`].

use crate::paper::{PaperInput, NOT_SPECIFIED};

/// Version tag of the templates below.
pub const PROMPT_VERSION: &str = "paper-analysis/v2";

/// Keys every analysis response must carry.
pub const OUTPUT_KEYS: &[&str] = &[
    "task_category",
    "methods",
    "contributions",
    "training_dataset",
    "testing_dataset",
    "evaluation_metrics",
    "confidence",
];

/// Additional keys requested in extended mode.
pub const EXTENDED_OUTPUT_KEYS: &[&str] = &["research_field", "novelty_score"];

/// System prompt template
/// Placeholders: {language}
pub const SYSTEM_PROMPT_TEMPLATE: &str = "You are a professional academic paper analyst. Analyze the paper carefully, extract the requested information accurately, and answer strictly with a JSON object. Write all free-text values in {language}.";

/// User prompt template for the standard analysis
/// Placeholders: {title}, {abstract}, {taxonomy}, {language}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an expert in academic paper analysis. Carefully analyze the following paper and extract structured information.

Paper title: {title}
Paper abstract: {abstract}

Task category table:
{taxonomy}
Requirements:
1. If the paper covers several task categories, choose the most prominent one.
2. If a dataset or metric cannot be determined, write "not specified".
3. Base the confidence on how well the paper matches the category table.
4. Write every value in {language}, except task_category, which must be copied verbatim from the table.

Output a single valid JSON object with exactly these keys:
{
  "task_category": "the best matching category name from the table, or \"unclassified\" if none matches",
  "methods": "main methods and techniques used (concise, at most 200 words)",
  "contributions": "main contributions and novelties (concise, at most 200 words)",
  "training_dataset": "datasets used for training (comma-separated if several)",
  "testing_dataset": "datasets used for testing or evaluation (comma-separated if several)",
  "evaluation_metrics": "evaluation metrics used (comma-separated if several)",
  "confidence": a number between 0 and 1 expressing certainty of the task classification
}"#;

/// User prompt template for the extended analysis
/// Placeholders: {title}, {abstract}, {authors}, {taxonomy}, {language}
pub const EXTENDED_ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are an expert in academic paper analysis. Carefully analyze the following paper and extract structured information.

Paper title: {title}
Paper abstract: {abstract}
Paper authors: {authors}

Task category table:
{taxonomy}
Requirements:
1. If the paper covers several task categories, choose the most prominent one.
2. If a dataset or metric cannot be determined, write "not specified".
3. Base the confidence on how well the paper matches the category table.
4. Base the novelty score on the originality of the method, the importance of the problem and the effectiveness of the solution.
5. Write every value in {language}, except task_category, which must be copied verbatim from the table.

Output a single valid JSON object with exactly these keys:
{
  "task_category": "the best matching category name from the table, or \"unclassified\" if none matches",
  "methods": "main methods and techniques used (concise, at most 200 words)",
  "contributions": "main contributions and novelties (concise, at most 200 words)",
  "training_dataset": "datasets used for training (comma-separated if several)",
  "testing_dataset": "datasets used for testing or evaluation (comma-separated if several)",
  "evaluation_metrics": "evaluation metrics used (comma-separated if several)",
  "confidence": a number between 0 and 1 expressing certainty of the task classification,
  "research_field": "research field (e.g. machine learning, computer vision, natural language processing)",
  "novelty_score": an integer from 1 to 5, where 5 means highly novel
}"#;

/// Options that select the template and output language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    pub language: String,
    /// Ask for research field and novelty score, and include authors
    pub extended: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            extended: false,
        }
    }
}

/// Build the system instruction for the given output language.
pub fn build_system_prompt(language: &str) -> String {
    fill_template(SYSTEM_PROMPT_TEMPLATE, &[("language", language)])
}

/// Build the user prompt for one paper.
pub fn build_user_prompt(paper: &PaperInput, taxonomy_text: &str, options: &PromptOptions) -> String {
    let abstract_text = if paper.abstract_text.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        paper.abstract_text.as_str()
    };

    if options.extended {
        let authors = paper.authors_with_affiliations();
        fill_template(
            EXTENDED_ANALYSIS_PROMPT_TEMPLATE,
            &[
                ("title", paper.title.as_str()),
                ("abstract", abstract_text),
                ("authors", authors.as_str()),
                ("taxonomy", taxonomy_text),
                ("language", options.language.as_str()),
            ],
        )
    } else {
        fill_template(
            ANALYSIS_PROMPT_TEMPLATE,
            &[
                ("title", paper.title.as_str()),
                ("abstract", abstract_text),
                ("taxonomy", taxonomy_text),
                ("language", options.language.as_str()),
            ],
        )
    }
}

/// Substitute `{key}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so a paper abstract containing
/// `{taxonomy}` stays literal.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let replacement = values.iter().find_map(|(key, value)| {
            tail.strip_prefix(*key)
                .filter(|after| after.starts_with('}'))
                .map(|_| (key.len(), *value))
        });
        match replacement {
            Some((key_len, value)) => {
                out.push_str(value);
                rest = &tail[key_len + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
