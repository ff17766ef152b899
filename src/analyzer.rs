//! Paper analysis orchestration.
//!
//! Drives the per-paper pipeline (prompt, model call, interpretation, record
//! assembly) over a batch, strictly one paper at a time. A failing paper is
//! logged and skipped; only fatal errors stop the batch.

use crate::error::{PaperTaskError, Result};
use crate::gateway::{ChatBackend, ModelGateway, OpenAiCompatibleBackend};
use crate::interpreter::{interpret, preview, AnalysisFields};
use crate::paper::{AnalysisRecord, PaperInput};
use crate::prompts::{build_system_prompt, build_user_prompt, PromptOptions};
use crate::taxonomy::Taxonomy;
use std::fmt;
use tracing::{error, info, warn};

/// Receives each record as soon as it is produced.
pub trait RecordSink {
    fn accept(&mut self, record: &AnalysisRecord) -> Result<()>;
}

impl RecordSink for Vec<AnalysisRecord> {
    fn accept(&mut self, record: &AnalysisRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Why a paper produced no record
#[derive(Debug)]
pub enum SkipReason {
    /// The paper cannot be analyzed as given
    InvalidInput(String),
    /// The model call failed after all retries
    Gateway(PaperTaskError),
    /// The model replied, but no JSON object could be found
    Unparseable { preview: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            SkipReason::Gateway(e) => write!(f, "model call failed: {}", e),
            SkipReason::Unparseable { preview } => write!(f, "unparseable reply: {}", preview),
        }
    }
}

/// Result of analyzing one paper
#[derive(Debug)]
pub enum PaperOutcome {
    Analyzed(AnalysisRecord),
    Skipped(SkipReason),
}

/// A paper that produced no record
#[derive(Debug, Clone)]
pub struct SkippedPaper {
    pub title: String,
    pub reason: String,
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<AnalysisRecord>,
    pub attempted: usize,
    pub skipped: Vec<SkippedPaper>,
}

impl BatchReport {
    pub fn analyzed(&self) -> usize {
        self.records.len()
    }

    pub fn summary_line(&self) -> String {
        format!("analyzed {} / attempted {}", self.analyzed(), self.attempted)
    }
}

/// Runs the classification pipeline against one taxonomy snapshot.
pub struct PaperAnalyzer<B = OpenAiCompatibleBackend> {
    gateway: ModelGateway<B>,
    taxonomy: Taxonomy,
    taxonomy_text: String,
    system_prompt: String,
    options: PromptOptions,
}

impl<B: ChatBackend> PaperAnalyzer<B> {
    /// `extended` adds research field and novelty score to every record.
    pub fn new(gateway: ModelGateway<B>, taxonomy: Taxonomy, extended: bool) -> Self {
        let language = gateway.config().language.clone();
        Self {
            taxonomy_text: taxonomy.format(),
            system_prompt: build_system_prompt(&language),
            options: PromptOptions { language, extended },
            gateway,
            taxonomy,
        }
    }

    pub fn gateway(&self) -> &ModelGateway<B> {
        &self.gateway
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Analyze a single paper.
    pub async fn analyze_paper(&self, paper: &PaperInput) -> PaperOutcome {
        if paper.title.trim().is_empty() {
            return PaperOutcome::Skipped(SkipReason::InvalidInput("paper has no title".to_string()));
        }

        let prompt = build_user_prompt(paper, &self.taxonomy_text, &self.options);
        let reply = match self.gateway.complete(&self.system_prompt, &prompt).await {
            Ok(reply) => reply,
            Err(e) => return PaperOutcome::Skipped(SkipReason::Gateway(e)),
        };

        match interpret(&reply, &self.taxonomy, self.options.extended) {
            Some(fields) => PaperOutcome::Analyzed(assemble_record(paper, fields)),
            None => PaperOutcome::Skipped(SkipReason::Unparseable {
                preview: preview(&reply),
            }),
        }
    }

    /// Analyze a batch, collecting records in memory.
    pub async fn run(&self, papers: &[PaperInput]) -> Result<BatchReport> {
        let mut sink = Vec::new();
        self.run_with_sink(papers, &mut sink).await
    }

    /// Analyze a batch, handing every record to `sink` as soon as it exists.
    ///
    /// Returns early only on a fatal gateway error or a sink failure; records
    /// already accepted by the sink stay there.
    pub async fn run_with_sink(
        &self,
        papers: &[PaperInput],
        sink: &mut dyn RecordSink,
    ) -> Result<BatchReport> {
        let total = papers.len();
        let mut report = BatchReport::default();

        info!(count = total, model = %self.gateway.config().model, "Starting paper analysis");

        for (idx, paper) in papers.iter().enumerate() {
            report.attempted += 1;
            info!(
                idx = idx + 1,
                total = total,
                title = %short_title(&paper.title),
                "Analyzing paper"
            );

            match self.analyze_paper(paper).await {
                PaperOutcome::Analyzed(record) => {
                    sink.accept(&record)?;
                    info!(category = %record.task_category, confidence = record.confidence, "Paper classified");
                    report.records.push(record);
                }
                PaperOutcome::Skipped(SkipReason::Gateway(e)) if e.is_fatal() => {
                    error!(title = %paper.title, error = %e, "Fatal error, aborting batch");
                    return Err(e);
                }
                PaperOutcome::Skipped(reason) => {
                    warn!(title = %paper.title, reason = %reason, "Paper skipped");
                    report.skipped.push(SkippedPaper {
                        title: paper.title.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        let usage = self.gateway.token_usage();
        info!(
            analyzed = report.analyzed(),
            attempted = report.attempted,
            total_tokens = usage.total_tokens,
            "Batch analysis complete: {}",
            report.summary_line()
        );
        Ok(report)
    }
}

/// Build the record, taking paper metadata from the input rather than the model.
fn assemble_record(paper: &PaperInput, fields: AnalysisFields) -> AnalysisRecord {
    AnalysisRecord {
        title: paper.title.clone(),
        authors: paper.authors_line(),
        authors_with_affiliations: paper.authors_with_affiliations(),
        primary_affiliations: paper.primary_affiliations(),
        task_category: fields.task_category,
        research_field: fields.research_field,
        methods: fields.methods,
        contributions: fields.contributions,
        training_dataset: fields.training_dataset,
        testing_dataset: fields.testing_dataset,
        evaluation_metrics: fields.evaluation_metrics,
        publication_date: paper.publication_date(),
        source_url: paper.source_url(),
        source_categories: paper.categories_line(),
        confidence: fields.confidence,
        novelty_score: fields.novelty_score,
    }
}

fn short_title(title: &str) -> String {
    title.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{test_config, ScriptedBackend};
    use crate::paper::NOT_SPECIFIED;
    use crate::taxonomy::UNCLASSIFIED;

    fn paper(title: &str) -> PaperInput {
        let mut paper = PaperInput::new(title, format!("Abstract of {}", title));
        paper.published = Some("2024-05-01".to_string());
        paper.source_url = Some(format!("https://example.org/{}", title.replace(' ', "-")));
        paper
    }

    fn reply(category: &str) -> String {
        format!(
            r#"{{"task_category": "{}", "methods": "m", "contributions": "c",
                "training_dataset": "t", "testing_dataset": "e",
                "evaluation_metrics": "SR", "confidence": 0.9,
                "research_field": "robotics", "novelty_score": 4}}"#,
            category
        )
    }

    fn analyzer(backend: ScriptedBackend, extended: bool) -> PaperAnalyzer<ScriptedBackend> {
        let gateway = ModelGateway::with_backend(test_config(), backend).expect("gateway");
        PaperAnalyzer::new(gateway, Taxonomy::builtin(), extended)
    }

    fn unavailable() -> PaperTaskError {
        PaperTaskError::Api {
            code: 503,
            message: "unavailable".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_inside_batch_yields_no_duplicates() {
        let backend = ScriptedBackend::new()
            .reply(&reply("Navigation"))
            .fail(unavailable())
            .fail(unavailable())
            .reply(&reply("Reinforcement Learning"))
            .reply(&reply("Action Recognition"));
        let analyzer = analyzer(backend, false);
        let papers = vec![paper("one"), paper("two"), paper("three")];

        let report = analyzer.run(&papers).await.expect("batch");

        assert_eq!(report.attempted, 3);
        assert_eq!(report.analyzed(), 3);
        let titles: Vec<&str> = report.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
        assert_eq!(report.records[1].task_category, "Reinforcement Learning");
        assert_eq!(analyzer.gateway().request_count(), 5);
        assert_eq!(report.summary_line(), "analyzed 3 / attempted 3");
    }

    #[tokio::test]
    async fn test_unparseable_reply_skips_only_that_paper() {
        let backend = ScriptedBackend::new()
            .reply(&reply("Navigation"))
            .reply("Sorry, I cannot help with that.")
            .reply(&reply("Navigation"));
        let analyzer = analyzer(backend, false);
        let papers = vec![paper("one"), paper("two"), paper("three")];

        let mut sink: Vec<AnalysisRecord> = Vec::new();
        let report = analyzer.run_with_sink(&papers, &mut sink).await.expect("batch");

        assert_eq!(report.analyzed(), 2);
        assert_eq!(sink.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].title, "two");
        assert!(report.skipped[0].reason.contains("unparseable"));
        assert_eq!(report.summary_line(), "analyzed 2 / attempted 3");
        // an unusable reply is not retried
        assert_eq!(analyzer.gateway().request_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_skip_paper() {
        let backend = ScriptedBackend::new()
            .fail(unavailable())
            .fail(unavailable())
            .fail(unavailable())
            .reply(&reply("Navigation"));
        let analyzer = analyzer(backend, false);

        let report = analyzer
            .run(&[paper("doomed"), paper("fine")])
            .await
            .expect("batch continues");

        assert_eq!(report.analyzed(), 1);
        assert_eq!(report.records[0].title, "fine");
        assert!(report.skipped[0].reason.contains("model call failed"));
    }

    #[tokio::test]
    async fn test_forbidden_reply_does_not_end_batch() {
        let forbidden = || PaperTaskError::Api {
            code: 403,
            message: "blocked by content policy".to_string(),
        };
        let backend = ScriptedBackend::new()
            .fail(forbidden())
            .reply(&reply("Navigation"))
            .reply(&reply("Navigation"))
            .fail(forbidden())
            .fail(forbidden())
            .fail(forbidden())
            .reply(&reply("Navigation"));
        let analyzer = analyzer(backend, false);
        let papers = vec![paper("one"), paper("two"), paper("three"), paper("four")];

        let mut sink: Vec<AnalysisRecord> = Vec::new();
        let report = analyzer.run_with_sink(&papers, &mut sink).await.expect("batch continues");

        let titles: Vec<&str> = sink.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "four"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].title, "three");
        assert_eq!(analyzer.gateway().request_count(), 7);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_but_keeps_streamed_records() {
        let backend = ScriptedBackend::new()
            .reply(&reply("Navigation"))
            .fail(PaperTaskError::Config("API key missing".into()))
            .reply(&reply("Navigation"));
        let analyzer = analyzer(backend, false);

        let mut sink: Vec<AnalysisRecord> = Vec::new();
        let result = analyzer
            .run_with_sink(&[paper("one"), paper("two"), paper("three")], &mut sink)
            .await;

        assert!(matches!(result, Err(PaperTaskError::Config(_))));
        assert_eq!(sink.len(), 1);
        assert_eq!(analyzer.gateway().request_count(), 2);
    }

    #[tokio::test]
    async fn test_paper_fields_come_from_input() {
        let backend = ScriptedBackend::new().reply(
            r#"{"title": "Hallucinated Title", "task_category": "Knitting",
                "publication_date": "1999-01-01", "confidence": "0.4"}"#,
        );
        let analyzer = analyzer(backend, true);

        let outcome = analyzer.analyze_paper(&paper("real title")).await;
        let record = match outcome {
            PaperOutcome::Analyzed(record) => record,
            other => panic!("expected a record, got {:?}", other),
        };
        assert_eq!(record.title, "real title");
        assert_eq!(record.publication_date, "2024-05-01");
        assert_eq!(record.source_url, "https://example.org/real-title");
        assert_eq!(record.task_category, UNCLASSIFIED);
        assert_eq!(record.confidence, 0.4);
        assert_eq!(record.methods, NOT_SPECIFIED);
        assert_eq!(record.research_field.as_deref(), Some(NOT_SPECIFIED));
        assert_eq!(record.novelty_score, Some(3));
    }

    #[tokio::test]
    async fn test_prompt_sent_for_each_paper() {
        let backend = ScriptedBackend::new().reply(&reply("Navigation"));
        let analyzer = analyzer(backend, true);

        analyzer.analyze_paper(&paper("grasping robots")).await;

        let requests = analyzer.gateway().backend().requests();
        assert_eq!(requests.len(), 1);
        let user = &requests[0].messages[1].content;
        assert!(user.contains("Paper title: grasping robots"));
        assert!(user.contains("- Navigation: "));
        assert!(user.contains("\"novelty_score\""));
        assert!(requests[0].messages[0].content.ends_with("in English."));
    }

    #[tokio::test]
    async fn test_untitled_paper_is_skipped_without_model_call() {
        let analyzer = analyzer(ScriptedBackend::new(), false);
        let outcome = analyzer.analyze_paper(&PaperInput::new("  ", "abstract")).await;
        assert!(matches!(outcome, PaperOutcome::Skipped(SkipReason::InvalidInput(_))));
        assert_eq!(analyzer.gateway().request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let analyzer = analyzer(ScriptedBackend::new(), false);
        let report = analyzer.run(&[]).await.expect("empty batch");
        assert_eq!(report.summary_line(), "analyzed 0 / attempted 0");
    }
}
