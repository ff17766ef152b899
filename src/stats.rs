//! Batch statistics over analysis records.

use crate::paper::{AnalysisRecord, NOT_SPECIFIED};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Score at or above which a paper counts as highly novel.
pub const HIGH_NOVELTY_THRESHOLD: u8 = 4;

/// Count of papers sharing one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub count: usize,
    /// Percentage of all records
    pub percent: f64,
}

/// Aggregate of the novelty scores present in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoveltyStats {
    pub mean: f64,
    pub max: u8,
    pub min: u8,
    pub high_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub mean_confidence: f64,
    pub categories: Vec<Share>,
    pub research_fields: Vec<Share>,
    pub novelty: Option<NoveltyStats>,
    /// Institutions and the number of papers listing them
    pub institutions: Vec<(String, usize)>,
}

impl Summary {
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let total = records.len();
        if total == 0 {
            return Self::default();
        }

        let mean_confidence = records.iter().map(|r| r.confidence).sum::<f64>() / total as f64;
        let categories = shares(records.iter().map(|r| r.task_category.as_str()), total);
        let research_fields = shares(
            records.iter().filter_map(|r| r.research_field.as_deref()),
            total,
        );

        let scores: Vec<u8> = records.iter().filter_map(|r| r.novelty_score).collect();
        let novelty = match (scores.iter().max(), scores.iter().min()) {
            (Some(&max), Some(&min)) => Some(NoveltyStats {
                mean: scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64,
                max,
                min,
                high_count: scores.iter().filter(|&&s| s >= HIGH_NOVELTY_THRESHOLD).count(),
            }),
            _ => None,
        };

        let mut institution_counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            for institution in record.primary_affiliations.split("; ") {
                let institution = institution.trim();
                if !institution.is_empty() && institution != NOT_SPECIFIED {
                    *institution_counts.entry(institution).or_default() += 1;
                }
            }
        }
        let institutions = sorted_counts(institution_counts)
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();

        Self {
            total,
            mean_confidence,
            categories,
            research_fields,
            novelty,
            institutions,
        }
    }

    /// Institutions appearing on at least `min_papers` papers.
    pub fn frequent_institutions(&self, min_papers: usize) -> impl Iterator<Item = &(String, usize)> {
        self.institutions.iter().filter(move |(_, count)| *count >= min_papers)
    }
}

/// Count desc, then label asc.
fn sorted_counts(counts: HashMap<&str, usize>) -> Vec<(&str, usize)> {
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

fn shares<'a>(labels: impl Iterator<Item = &'a str>, total: usize) -> Vec<Share> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    sorted_counts(counts)
        .into_iter()
        .map(|(label, count)| Share {
            label: label.to_string(),
            count,
            percent: count as f64 * 100.0 / total as f64,
        })
        .collect()
}

/// Log a human-readable summary of the batch.
pub fn log_summary(summary: &Summary) {
    if summary.total == 0 {
        info!("No papers analyzed");
        return;
    }

    info!(
        total = summary.total,
        mean_confidence = format!("{:.2}", summary.mean_confidence),
        "Analysis summary"
    );
    for share in &summary.categories {
        info!("  {}: {} papers ({:.1}%)", share.label, share.count, share.percent);
    }
    if !summary.research_fields.is_empty() {
        info!("Research fields:");
        for share in &summary.research_fields {
            info!("  {}: {} papers ({:.1}%)", share.label, share.count, share.percent);
        }
    }
    if let Some(novelty) = &summary.novelty {
        info!(
            mean = format!("{:.2}", novelty.mean),
            max = novelty.max,
            min = novelty.min,
            high = novelty.high_count,
            "Novelty scores"
        );
    }
}
