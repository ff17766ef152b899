//! Paper input and analysis record types.

use serde::{Deserialize, Serialize};

/// Sentinel for any textual field with no usable value.
pub const NOT_SPECIFIED: &str = "not specified";

/// Paper author, optionally with an institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        affiliation: Option<String>,
    },
}

impl Author {
    pub fn name(&self) -> &str {
        match self {
            Author::Name(name) | Author::Detailed { name, .. } => name,
        }
    }

    pub fn affiliation(&self) -> Option<&str> {
        match self {
            Author::Name(_) => None,
            Author::Detailed { affiliation, .. } => affiliation
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty()),
        }
    }
}

/// Paper metadata handed to the pipeline by a paper source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "abstract", alias = "summary", alias = "abstract_text", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Publication date, ideally `YYYY-MM-DD`
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default, alias = "url")]
    pub source_url: Option<String>,
}

impl PaperInput {
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            ..Default::default()
        }
    }

    /// Author names joined with `"; "`, or the sentinel when there are none.
    pub fn authors_line(&self) -> String {
        if self.authors.is_empty() {
            return NOT_SPECIFIED.to_string();
        }
        self.authors
            .iter()
            .map(Author::name)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Authors with their institution in parentheses where known.
    pub fn authors_with_affiliations(&self) -> String {
        if self.authors.is_empty() {
            return NOT_SPECIFIED.to_string();
        }
        self.authors
            .iter()
            .map(|a| match a.affiliation() {
                Some(aff) => format!("{} ({})", a.name(), aff),
                None => a.name().to_string(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Distinct institutions, sorted, joined with `"; "`.
    pub fn primary_affiliations(&self) -> String {
        let mut affiliations: Vec<&str> = self.authors.iter().filter_map(Author::affiliation).collect();
        affiliations.sort_unstable();
        affiliations.dedup();
        if affiliations.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            affiliations.join("; ")
        }
    }

    /// Publication date truncated to `YYYY-MM-DD`.
    pub fn publication_date(&self) -> String {
        match self.published.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => date.chars().take(10).collect(),
            _ => NOT_SPECIFIED.to_string(),
        }
    }

    pub fn source_url(&self) -> String {
        non_empty_or_sentinel(self.source_url.as_deref())
    }

    /// Forget every author's institution.
    pub fn drop_affiliations(&mut self) {
        for author in &mut self.authors {
            if let Author::Detailed { affiliation, .. } = author {
                *affiliation = None;
            }
        }
    }

    pub fn categories_line(&self) -> String {
        if self.categories.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            self.categories.join("; ")
        }
    }
}

fn non_empty_or_sentinel(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_SPECIFIED.to_string(),
    }
}

/// Structured analysis of one paper.
///
/// Column names follow the exported CSV header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Authors")]
    pub authors: String,
    #[serde(rename = "Authors_with_Affiliations")]
    pub authors_with_affiliations: String,
    #[serde(rename = "Primary_Affiliations")]
    pub primary_affiliations: String,
    #[serde(rename = "Task_Category")]
    pub task_category: String,
    #[serde(rename = "Research_Field")]
    pub research_field: Option<String>,
    #[serde(rename = "Methods")]
    pub methods: String,
    #[serde(rename = "Contributions")]
    pub contributions: String,
    #[serde(rename = "Training_Dataset")]
    pub training_dataset: String,
    #[serde(rename = "Testing_Dataset")]
    pub testing_dataset: String,
    #[serde(rename = "Evaluation_Metrics")]
    pub evaluation_metrics: String,
    #[serde(rename = "Publication_Date")]
    pub publication_date: String,
    #[serde(rename = "Source_URL")]
    pub source_url: String,
    #[serde(rename = "Source_Categories")]
    pub source_categories: String,
    #[serde(rename = "Classification_Confidence")]
    pub confidence: f64,
    #[serde(rename = "Novelty_Score")]
    pub novelty_score: Option<u8>,
}
