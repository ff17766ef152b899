//! User configuration persistence.
//!
//! Search settings and the custom taxonomy live in a JSON file, by default
//! `~/.rustpapertask/config.json`.

use crate::error::{PaperTaskError, Result};
use crate::sources::subjects;
use crate::taxonomy::{TaskCategory, Taxonomy};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Date format used for every date in the config file.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_MAX_PAPERS: usize = 50;

/// Default search window, counted back from today.
pub const DEFAULT_WINDOW_DAYS: i64 = 365;

/// Default config file path: `~/.rustpapertask/config.json`
pub fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".rustpapertask").join("config.json"))
        .ok_or_else(|| PaperTaskError::Config("Cannot determine home directory".to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub search_keywords: Vec<String>,
    /// Inclusive, `YYYY-MM-DD`
    pub start_date: String,
    /// Inclusive, `YYYY-MM-DD`
    pub end_date: String,
    pub max_papers: usize,
    /// arXiv subject codes (`cs.AI`, `cs.RO`, ...) that narrow the search
    pub research_categories: Vec<String>,
    /// Ordered so the rendered taxonomy is stable across runs
    pub custom_task_categories: Vec<TaskCategory>,
    pub use_default_categories: bool,
    pub include_author_affiliations: bool,
    /// Request research field and novelty score
    pub extended_analysis: bool,
    pub output_language: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        let end = Local::now().date_naive();
        let start = end - Duration::days(DEFAULT_WINDOW_DAYS);
        Self {
            search_keywords: vec![
                "embodied".to_string(),
                "multimodal".to_string(),
                "robotics".to_string(),
            ],
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
            max_papers: DEFAULT_MAX_PAPERS,
            research_categories: ["cs.AI", "cs.CV", "cs.RO", "cs.LG"]
                .into_iter()
                .map(String::from)
                .collect(),
            custom_task_categories: Vec::new(),
            use_default_categories: true,
            include_author_affiliations: true,
            extended_analysis: false,
            output_language: "English".to_string(),
        }
    }
}

impl UserConfig {
    /// Load from `path`.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found: {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PaperTaskError::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write as pretty JSON, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let (start, end) = self.date_range()?;
        if start > end {
            return Err(PaperTaskError::Validation(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.search_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(PaperTaskError::Validation(
                "search_keywords must not be empty".to_string(),
            ));
        }
        if self.max_papers == 0 {
            return Err(PaperTaskError::Validation(
                "max_papers must be greater than 0".to_string(),
            ));
        }
        if let Some(code) = self
            .research_categories
            .iter()
            .find(|c| subjects::find(c).is_none())
        {
            return Err(PaperTaskError::Validation(format!(
                "unknown research category '{}'",
                code
            )));
        }
        Ok(())
    }

    /// Parsed `(start_date, end_date)`.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        Ok((parse_date(&self.start_date)?, parse_date(&self.end_date)?))
    }

    /// Built-in categories merged with the custom ones, or the custom ones alone.
    pub fn taxonomy(&self) -> Result<Taxonomy> {
        Taxonomy::effective(self.use_default_categories, &self.custom_task_categories)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        PaperTaskError::Validation(format!("invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
    })
}
