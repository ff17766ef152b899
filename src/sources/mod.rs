//! Paper sources feeding the analysis pipeline.

pub mod file;
pub mod openalex;
pub mod subjects;

use crate::config::UserConfig;
use crate::paper::PaperInput;

/// Keep papers whose title or abstract mentions any keyword, ignoring case.
///
/// An empty keyword list keeps everything.
pub fn retain_matching(papers: Vec<PaperInput>, keywords: &[String]) -> Vec<PaperInput> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if needles.is_empty() {
        return papers;
    }

    papers
        .into_iter()
        .filter(|paper| {
            let title = paper.title.to_lowercase();
            let abstract_text = paper.abstract_text.to_lowercase();
            needles
                .iter()
                .any(|n| title.contains(n.as_str()) || abstract_text.contains(n.as_str()))
        })
        .collect()
}

/// Narrow papers loaded from a file the way a search would.
///
/// With `filter` set, papers must mention a search keyword and fall in the
/// research categories. The result is always capped at `max_papers`.
pub fn narrow(papers: Vec<PaperInput>, config: &UserConfig, filter: bool) -> Vec<PaperInput> {
    let mut papers = if filter {
        let papers = retain_matching(papers, &config.search_keywords);
        subjects::retain_in_subjects(papers, &config.research_categories)
    } else {
        papers
    };
    papers.truncate(config.max_papers);
    papers
}
