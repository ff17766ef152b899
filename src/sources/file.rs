//! Load papers from local JSON or CSV files.

use crate::error::{PaperTaskError, Result};
use crate::paper::{Author, PaperInput};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One CSV row. List columns are `;`-separated; an author may carry an
/// institution as `Name (Institution)`.
#[derive(Debug, Deserialize)]
struct CsvPaper {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(rename = "abstract", alias = "summary", default)]
    abstract_text: String,
    #[serde(default)]
    authors: String,
    #[serde(default)]
    published: String,
    #[serde(default, alias = "source_url")]
    url: String,
    #[serde(default)]
    categories: String,
}

impl From<CsvPaper> for PaperInput {
    fn from(row: CsvPaper) -> Self {
        PaperInput {
            id: row.id.filter(|id| !id.trim().is_empty()),
            title: row.title.trim().to_string(),
            abstract_text: row.abstract_text.trim().to_string(),
            authors: split_list(&row.authors).map(parse_author).collect(),
            categories: split_list(&row.categories).map(str::to_string).collect(),
            published: non_empty(row.published),
            source_url: non_empty(row.url),
        }
    }
}

/// Load papers from `path`; the format follows the file extension.
pub fn load_papers(path: &Path) -> Result<Vec<PaperInput>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let papers = match extension.as_str() {
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => {
            return Err(PaperTaskError::Validation(format!(
                "unsupported paper file type '{}' ({}); expected .json or .csv",
                other,
                path.display()
            )))
        }
    };

    info!(path = %path.display(), count = papers.len(), "Loaded papers");
    Ok(papers)
}

fn load_json(path: &Path) -> Result<Vec<PaperInput>> {
    let content = std::fs::read_to_string(path)?;
    let papers = serde_json::from_str(&content)?;
    Ok(papers)
}

fn load_csv(path: &Path) -> Result<Vec<PaperInput>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;
    reader
        .deserialize::<CsvPaper>()
        .map(|row| -> Result<PaperInput> { Ok(row?.into()) })
        .collect()
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_author(entry: &str) -> Author {
    if let Some(open) = entry.find(" (") {
        if let Some(affiliation) = entry[open + 2..].strip_suffix(')') {
            return Author::Detailed {
                name: entry[..open].trim().to_string(),
                affiliation: Some(affiliation.trim().to_string()),
            };
        }
    }
    Author::Name(entry.to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("papers.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "First", "abstract": "One.", "authors": ["A"], "published": "2024-01-02"},
                {"title": "Second", "summary": "Two.", "authors": [{"name": "B", "affiliation": "MIT"}]}
            ]"#,
        )
        .expect("write");

        let papers = load_papers(&path).expect("load");
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].publication_date(), "2024-01-02");
        assert_eq!(papers[1].abstract_text, "Two.");
        assert_eq!(papers[1].primary_affiliations(), "MIT");
    }

    #[test]
    fn test_load_csv() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("papers.CSV");
        std::fs::write(
            &path,
            "title,abstract,authors,published,url,categories\n\
             Grasping,\"We grasp, well.\",Ada Lovelace (Cambridge); Alan Turing,2024-03-01,https://example.org/1,cs.RO; cs.AI\n\
             Bare,,,,,\n",
        )
        .expect("write");

        let papers = load_papers(&path).expect("load");
        assert_eq!(papers.len(), 2);
        let first = &papers[0];
        assert_eq!(first.abstract_text, "We grasp, well.");
        assert_eq!(first.authors_with_affiliations(), "Ada Lovelace (Cambridge); Alan Turing");
        assert_eq!(first.categories, vec!["cs.RO", "cs.AI"]);
        assert_eq!(first.source_url(), "https://example.org/1");

        let bare = &papers[1];
        assert!(bare.authors.is_empty());
        assert!(bare.published.is_none());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_papers(Path::new("papers.txt")).expect_err("txt rejected");
        assert!(matches!(err, PaperTaskError::Validation(_)));
    }

    #[test]
    fn test_parse_author() {
        assert_eq!(parse_author("Solo"), Author::Name("Solo".into()));
        assert_eq!(
            parse_author("Jane Doe (Univ. of X (Main Campus))"),
            Author::Detailed {
                name: "Jane Doe".into(),
                affiliation: Some("Univ. of X (Main Campus)".into()),
            }
        );
    }
}
