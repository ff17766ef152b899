//! CSV export of analysis records and batch summaries.

use crate::analyzer::RecordSink;
use crate::error::Result;
use crate::paper::AnalysisRecord;
use crate::stats::Summary;
use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Institutions listed on fewer papers are left out of the summary.
pub const MIN_INSTITUTION_PAPERS: usize = 2;

/// `<dir>/<stem>_<YYYYmmdd_HHMMSS>.csv`, creating `dir` if needed.
pub fn timestamped_path(dir: &Path, stem: &str) -> Result<PathBuf> {
    timestamped_file(dir, stem, "csv")
}

/// Same as [`timestamped_path`] with another extension.
pub fn timestamped_file(dir: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(dir.join(format!("{}_{}.{}", stem, timestamp, extension)))
}

/// Analysis row without the extended-mode columns.
#[derive(Serialize)]
struct StandardRow<'a> {
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Authors")]
    authors: &'a str,
    #[serde(rename = "Authors_with_Affiliations")]
    authors_with_affiliations: &'a str,
    #[serde(rename = "Primary_Affiliations")]
    primary_affiliations: &'a str,
    #[serde(rename = "Task_Category")]
    task_category: &'a str,
    #[serde(rename = "Methods")]
    methods: &'a str,
    #[serde(rename = "Contributions")]
    contributions: &'a str,
    #[serde(rename = "Training_Dataset")]
    training_dataset: &'a str,
    #[serde(rename = "Testing_Dataset")]
    testing_dataset: &'a str,
    #[serde(rename = "Evaluation_Metrics")]
    evaluation_metrics: &'a str,
    #[serde(rename = "Publication_Date")]
    publication_date: &'a str,
    #[serde(rename = "Source_URL")]
    source_url: &'a str,
    #[serde(rename = "Source_Categories")]
    source_categories: &'a str,
    #[serde(rename = "Classification_Confidence")]
    confidence: f64,
}

impl<'a> From<&'a AnalysisRecord> for StandardRow<'a> {
    fn from(r: &'a AnalysisRecord) -> Self {
        Self {
            title: &r.title,
            authors: &r.authors,
            authors_with_affiliations: &r.authors_with_affiliations,
            primary_affiliations: &r.primary_affiliations,
            task_category: &r.task_category,
            methods: &r.methods,
            contributions: &r.contributions,
            training_dataset: &r.training_dataset,
            testing_dataset: &r.testing_dataset,
            evaluation_metrics: &r.evaluation_metrics,
            publication_date: &r.publication_date,
            source_url: &r.source_url,
            source_categories: &r.source_categories,
            confidence: r.confidence,
        }
    }
}

/// Writes each accepted record as one CSV row and flushes immediately,
/// so rows survive an interrupted batch.
///
/// Standard mode omits the `Research_Field` and `Novelty_Score` columns.
pub struct CsvRecordSink<W: Write> {
    writer: csv::Writer<W>,
    extended: bool,
    rows: usize,
    path: Option<PathBuf>,
}

impl CsvRecordSink<File> {
    pub fn create(path: &Path, extended: bool) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
        debug!(path = %path.display(), extended = extended, "Opened record sink");
        Ok(Self {
            writer,
            extended,
            rows: 0,
            path: Some(path.to_path_buf()),
        })
    }
}

impl<W: Write> CsvRecordSink<W> {
    pub fn from_writer(inner: W, extended: bool) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(true).from_writer(inner),
            extended,
            rows: 0,
            path: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }

    /// Flush and close the sink, returning the number of rows written.
    ///
    /// A file that never received a row is removed.
    pub fn finish(self) -> Result<usize> {
        let rows = self.rows;
        let path = self.path.clone();
        drop(self.into_inner()?);
        if rows == 0 {
            if let Some(path) = path {
                std::fs::remove_file(&path)?;
                debug!(path = %path.display(), "Removed empty record file");
            }
        }
        Ok(rows)
    }
}

impl<W: Write> RecordSink for CsvRecordSink<W> {
    fn accept(&mut self, record: &AnalysisRecord) -> Result<()> {
        if self.extended {
            self.writer.serialize(record)?;
        } else {
            self.writer.serialize(StandardRow::from(record))?;
        }
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

/// Write all records to `path`. Nothing is written for an empty slice.
pub fn export_records(path: &Path, records: &[AnalysisRecord], extended: bool) -> Result<bool> {
    if records.is_empty() {
        info!(path = %path.display(), "No records to export");
        return Ok(false);
    }
    let mut sink = CsvRecordSink::create(path, extended)?;
    for record in records {
        sink.accept(record)?;
    }
    let rows = sink.finish()?;
    info!(path = %path.display(), rows = rows, "Saved analysis records");
    Ok(true)
}

/// Write the sectioned summary: category distribution, research fields,
/// novelty statistics and frequent institutions.
pub fn export_summary(path: &Path, summary: &Summary) -> Result<bool> {
    if summary.total == 0 {
        info!(path = %path.display(), "No summary to export");
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    write_summary(&mut wtr, summary)?;
    wtr.flush()?;
    info!(path = %path.display(), "Saved analysis summary");
    Ok(true)
}

fn write_summary<W: Write>(wtr: &mut csv::Writer<W>, summary: &Summary) -> Result<()> {
    wtr.write_record(["Section", "Item", "Value", "Percent"])?;
    let total = summary.total.to_string();
    wtr.write_record(["Overview", "Total papers", total.as_str(), ""])?;
    let mean_confidence = format!("{:.2}", summary.mean_confidence);
    wtr.write_record(["Overview", "Mean confidence", mean_confidence.as_str(), ""])?;

    let sections = [
        ("Task category", &summary.categories),
        ("Research field", &summary.research_fields),
    ];
    for (section, shares) in sections {
        for share in shares {
            let count = share.count.to_string();
            let percent = format!("{:.1}%", share.percent);
            wtr.write_record([section, share.label.as_str(), count.as_str(), percent.as_str()])?;
        }
    }
    if let Some(novelty) = &summary.novelty {
        let rows = [
            ("Mean", format!("{:.2}", novelty.mean)),
            ("Max", novelty.max.to_string()),
            ("Min", novelty.min.to_string()),
            ("High novelty papers", novelty.high_count.to_string()),
        ];
        for (item, value) in rows {
            wtr.write_record(["Novelty score", item, value.as_str(), ""])?;
        }
    }
    for (institution, count) in summary.frequent_institutions(MIN_INSTITUTION_PAPERS) {
        let count = count.to_string();
        wtr.write_record(["Institution", institution.as_str(), count.as_str(), ""])?;
    }
    Ok(())
}

/// Records scoring at least `min_score`, highest first.
pub fn high_novelty(records: &[AnalysisRecord], min_score: u8) -> Vec<AnalysisRecord> {
    let mut selected: Vec<AnalysisRecord> = records
        .iter()
        .filter(|r| r.novelty_score.is_some_and(|s| s >= min_score))
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.novelty_score.cmp(&a.novelty_score));
    selected
}

/// Export the highly novel subset. Returns the number of rows written.
pub fn export_high_novelty(path: &Path, records: &[AnalysisRecord], min_score: u8) -> Result<usize> {
    let selected = high_novelty(records, min_score);
    export_records(path, &selected, true)?;
    Ok(selected.len())
}
