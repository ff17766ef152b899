//! Markdown and JSON run reports.
//!
//! A report restates the run settings next to the batch statistics and the
//! most novel papers, for publishing alongside the CSV exports.

use crate::config::UserConfig;
use crate::error::Result;
use crate::export::{self, MIN_INSTITUTION_PAPERS};
use crate::paper::{AnalysisRecord, NOT_SPECIFIED};
use crate::stats::{Share, Summary};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows shown per list section.
const TOP_N: usize = 10;

/// Settings a run was made with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInfo {
    pub start_date: String,
    pub end_date: String,
    pub search_keywords: Vec<String>,
    pub research_categories: Vec<String>,
    pub max_papers: usize,
    pub preset: Option<String>,
    pub model: String,
    pub extended: bool,
}

impl RunInfo {
    pub fn new(config: &UserConfig, model: impl Into<String>, extended: bool) -> Self {
        Self {
            start_date: config.start_date.clone(),
            end_date: config.end_date.clone(),
            search_keywords: config.search_keywords.clone(),
            research_categories: config.research_categories.clone(),
            max_papers: config.max_papers,
            preset: None,
            model: model.into(),
            extended,
        }
    }

    pub fn with_preset(mut self, preset: Option<String>) -> Self {
        self.preset = preset;
        self
    }
}

/// Everything a report is rendered from.
pub struct RunReport<'a> {
    pub run: &'a RunInfo,
    pub summary: &'a Summary,
    pub records: &'a [AnalysisRecord],
    /// Papers handed to the analyzer, skipped ones included
    pub attempted: usize,
    pub min_novelty: u8,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: &'a str,
    run: &'a RunInfo,
    attempted: usize,
    summary: &'a Summary,
    high_novelty: Vec<NovelPaper<'a>>,
}

#[derive(Serialize)]
struct NovelPaper<'a> {
    title: &'a str,
    novelty_score: u8,
    task_category: &'a str,
    source_url: &'a str,
}

impl<'a> RunReport<'a> {
    fn novel_papers(&self) -> Vec<&'a AnalysisRecord> {
        let mut novel: Vec<&AnalysisRecord> = self
            .records
            .iter()
            .filter(|r| r.novelty_score.is_some_and(|s| s >= self.min_novelty))
            .collect();
        novel.sort_by(|a, b| b.novelty_score.cmp(&a.novelty_score));
        novel.truncate(TOP_N);
        novel
    }

    pub fn to_markdown(&self, generated_at: &str) -> String {
        let run = self.run;
        let summary = self.summary;
        let mut lines = vec![
            "# Paper Analysis Report".to_string(),
            String::new(),
            format!("**Generated**: {}", generated_at),
            format!("**Date range**: {} to {}", run.start_date, run.end_date),
            format!("**Keywords**: {}", run.search_keywords.join(", ")),
        ];
        if !run.research_categories.is_empty() {
            lines.push(format!(
                "**Research categories**: {}",
                run.research_categories.join(", ")
            ));
        }
        lines.push(format!("**Max papers**: {}", run.max_papers));
        if let Some(preset) = &run.preset {
            lines.push(format!("**Preset**: {}", preset));
        }
        lines.push(format!("**Model**: {}", run.model));
        lines.push(String::new());

        lines.push("## Overview".to_string());
        lines.push(String::new());
        lines.push(format!(
            "- **Papers analyzed**: {} of {} attempted",
            summary.total, self.attempted
        ));
        if summary.total > 0 {
            lines.push(format!("- **Mean confidence**: {:.2}", summary.mean_confidence));
        }
        if let Some(novelty) = &summary.novelty {
            lines.push(format!("- **Mean novelty score**: {:.2}", novelty.mean));
            lines.push(format!(
                "- **High novelty papers** (score >= {}): {}",
                self.min_novelty,
                self.records
                    .iter()
                    .filter(|r| r.novelty_score.is_some_and(|s| s >= self.min_novelty))
                    .count()
            ));
        }
        lines.push(String::new());

        share_table(&mut lines, "Task categories", "Task category", &summary.categories);
        share_table(&mut lines, "Research fields", "Research field", &summary.research_fields);

        let institutions: Vec<&(String, usize)> = summary
            .frequent_institutions(MIN_INSTITUTION_PAPERS)
            .take(TOP_N)
            .collect();
        if !institutions.is_empty() {
            lines.push("## Institutions".to_string());
            lines.push(String::new());
            lines.push("| Institution | Papers |".to_string());
            lines.push("|---|---|".to_string());
            for (name, count) in institutions {
                lines.push(format!("| {} | {} |", table_cell(name), count));
            }
            lines.push(String::new());
        }

        let novel = self.novel_papers();
        if !novel.is_empty() {
            lines.push(format!("## High novelty papers (score >= {})", self.min_novelty));
            lines.push(String::new());
            for (i, record) in novel.iter().enumerate() {
                lines.push(format!("### {}. {}", i + 1, record.title));
                if let Some(score) = record.novelty_score {
                    lines.push(format!("- **Novelty score**: {}", score));
                }
                lines.push(format!("- **Task category**: {}", record.task_category));
                if record.source_url != NOT_SPECIFIED {
                    lines.push(format!("- **Link**: [{0}]({0})", record.source_url));
                }
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }

    pub fn to_json(&self, generated_at: &str) -> Result<String> {
        let high_novelty = self
            .novel_papers()
            .into_iter()
            .filter_map(|r| {
                Some(NovelPaper {
                    title: &r.title,
                    novelty_score: r.novelty_score?,
                    task_category: &r.task_category,
                    source_url: &r.source_url,
                })
            })
            .collect();
        let report = JsonReport {
            generated_at,
            run: self.run,
            attempted: self.attempted,
            summary: self.summary,
            high_novelty,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

fn share_table(lines: &mut Vec<String>, heading: &str, column: &str, shares: &[Share]) {
    if shares.is_empty() {
        return;
    }
    lines.push(format!("## {}", heading));
    lines.push(String::new());
    lines.push(format!("| {} | Papers | Share |", column));
    lines.push("|---|---|---|".to_string());
    for share in shares {
        lines.push(format!(
            "| {} | {} | {:.1}% |",
            table_cell(&share.label),
            share.count,
            share.percent
        ));
    }
    lines.push(String::new());
}

fn table_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Write `<stem>_<timestamp>.md` and `.json` into `dir`; returns both paths.
pub fn export_report(dir: &Path, report: &RunReport<'_>) -> Result<(PathBuf, PathBuf)> {
    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let markdown_path = export::timestamped_file(dir, "analysis_report", "md")?;
    let json_path = markdown_path.with_extension("json");

    std::fs::write(&markdown_path, report.to_markdown(&generated_at))?;
    std::fs::write(&json_path, report.to_json(&generated_at)?)?;
    info!(
        markdown = %markdown_path.display(),
        json = %json_path.display(),
        "Saved run report"
    );
    Ok((markdown_path, json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(title: &str, category: &str, novelty: Option<u8>, affiliation: &str) -> AnalysisRecord {
        AnalysisRecord {
            title: title.into(),
            authors: "A. Person".into(),
            authors_with_affiliations: NOT_SPECIFIED.into(),
            primary_affiliations: affiliation.into(),
            task_category: category.into(),
            research_field: novelty.map(|_| "robotics".to_string()),
            methods: NOT_SPECIFIED.into(),
            contributions: NOT_SPECIFIED.into(),
            training_dataset: NOT_SPECIFIED.into(),
            testing_dataset: NOT_SPECIFIED.into(),
            evaluation_metrics: NOT_SPECIFIED.into(),
            publication_date: "2024-05-01".into(),
            source_url: format!("https://example.org/{}", title),
            source_categories: NOT_SPECIFIED.into(),
            confidence: 0.8,
            novelty_score: novelty,
        }
    }

    fn run_info() -> RunInfo {
        let mut config = UserConfig::default();
        config.start_date = "2024-01-01".into();
        config.end_date = "2024-12-31".into();
        config.search_keywords = vec!["embodied".into(), "robotics".into()];
        RunInfo::new(&config, "test-model", true).with_preset(Some("embodied_ai".into()))
    }

    #[test]
    fn test_markdown_sections() {
        let records = vec![
            record("grasp", "Navigation", Some(5), "MIT"),
            record("walk", "Navigation", Some(2), "MIT"),
            record("look", "Navigation | Vision", Some(4), "ETH"),
        ];
        let summary = Summary::from_records(&records);
        let info = run_info();
        let report = RunReport {
            run: &info,
            summary: &summary,
            records: &records,
            attempted: 4,
            min_novelty: 4,
        };

        let text = report.to_markdown("2024-06-01 12:00:00");
        assert!(text.starts_with("# Paper Analysis Report\n"));
        assert!(text.contains("**Date range**: 2024-01-01 to 2024-12-31"));
        assert!(text.contains("**Research categories**: cs.AI, cs.CV, cs.RO, cs.LG"));
        assert!(text.contains("**Preset**: embodied_ai"));
        assert!(text.contains("- **Papers analyzed**: 3 of 4 attempted"));
        assert!(text.contains("- **High novelty papers** (score >= 4): 2"));
        assert!(text.contains("| Navigation | 2 | 66.7% |"));
        assert!(text.contains("| Navigation \\| Vision | 1 | 33.3% |"));
        assert!(text.contains("| robotics | 3 | 100.0% |"));
        assert!(text.contains("| MIT | 2 |"));
        assert!(!text.contains("| ETH |"));

        let first = text.find("### 1. grasp").expect("top paper");
        let second = text.find("### 2. look").expect("second paper");
        assert!(first < second);
        assert!(!text.contains("### 3."));
        assert!(text.contains("- **Link**: [https://example.org/grasp](https://example.org/grasp)"));
    }

    #[test]
    fn test_standard_mode_omits_novelty() {
        let records = vec![record("plain", "Navigation", None, NOT_SPECIFIED)];
        let summary = Summary::from_records(&records);
        let info = RunInfo::new(&UserConfig::default(), "m", false);
        let report = RunReport {
            run: &info,
            summary: &summary,
            records: &records,
            attempted: 1,
            min_novelty: 4,
        };

        let text = report.to_markdown("now");
        assert!(!text.contains("novelty"));
        assert!(!text.contains("## Research fields"));
        assert!(!text.contains("## Institutions"));
        assert!(!text.contains("**Preset**"));
    }

    #[test]
    fn test_export_report_writes_markdown_and_json() {
        let records = vec![
            record("grasp", "Navigation", Some(5), "MIT"),
            record("walk", "Episodic Memory", Some(3), "MIT"),
        ];
        let summary = Summary::from_records(&records);
        let info = run_info();
        let report = RunReport {
            run: &info,
            summary: &summary,
            records: &records,
            attempted: 2,
            min_novelty: 4,
        };

        let dir = tempdir().expect("tempdir");
        let (markdown, json) = export_report(dir.path(), &report).expect("export");
        assert_eq!(markdown.extension().and_then(|e| e.to_str()), Some("md"));
        assert_eq!(json.extension().and_then(|e| e.to_str()), Some("json"));
        assert!(std::fs::read_to_string(&markdown).expect("read").contains("### 1. grasp"));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).expect("read")).expect("json");
        assert_eq!(value["attempted"], 2);
        assert_eq!(value["run"]["model"], "test-model");
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["categories"][0]["label"], "Episodic Memory");
        assert_eq!(value["summary"]["novelty"]["high_count"], 1);
        assert_eq!(value["high_novelty"][0]["title"], "grasp");
        assert_eq!(value["high_novelty"].as_array().map(Vec::len), Some(1));
    }
}
