//! arXiv subject classes used to narrow a search.
//!
//! Config files name subjects by arXiv code (`cs.AI`, `cs.RO`, ...). OpenAlex
//! has no arXiv classes, so each code maps onto the OpenAlex subfield that
//! covers it; a few codes have no sensible counterpart.

use crate::paper::PaperInput;

/// One arXiv subject class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub code: &'static str,
    pub name: &'static str,
    /// OpenAlex subfield `(id, display name)`
    pub subfield: Option<(u32, &'static str)>,
}

const AI: (u32, &str) = (1702, "Artificial Intelligence");
const VISION: (u32, &str) = (1707, "Computer Vision and Pattern Recognition");
const CONTROL: (u32, &str) = (2207, "Control and Systems Engineering");
const SIGNAL: (u32, &str) = (1711, "Signal Processing");
const STATISTICS: (u32, &str) = (2613, "Statistics and Probability");

pub const SUBJECTS: &[Subject] = &[
    Subject { code: "cs.AI", name: "Artificial Intelligence", subfield: Some(AI) },
    Subject { code: "cs.CV", name: "Computer Vision and Pattern Recognition", subfield: Some(VISION) },
    Subject { code: "cs.CL", name: "Computation and Language", subfield: Some(AI) },
    Subject { code: "cs.LG", name: "Machine Learning", subfield: Some(AI) },
    Subject { code: "cs.RO", name: "Robotics", subfield: Some(CONTROL) },
    Subject { code: "cs.HC", name: "Human-Computer Interaction", subfield: Some((1709, "Human-Computer Interaction")) },
    Subject { code: "cs.MA", name: "Multiagent Systems", subfield: Some(AI) },
    Subject { code: "cs.NE", name: "Neural and Evolutionary Computing", subfield: Some(AI) },
    Subject { code: "cs.IR", name: "Information Retrieval", subfield: Some((1710, "Information Systems")) },
    Subject { code: "cs.MM", name: "Multimedia", subfield: Some(SIGNAL) },
    Subject { code: "cs.SI", name: "Social and Information Networks", subfield: Some((1710, "Information Systems")) },
    Subject { code: "math.ST", name: "Statistics Theory", subfield: Some(STATISTICS) },
    Subject { code: "math.OC", name: "Optimization and Control", subfield: Some((2606, "Control and Optimization")) },
    Subject { code: "math.PR", name: "Probability", subfield: Some(STATISTICS) },
    Subject { code: "stat.ML", name: "Machine Learning (Statistics)", subfield: Some(AI) },
    Subject { code: "stat.AP", name: "Applications (Statistics)", subfield: Some(STATISTICS) },
    Subject { code: "physics.data-an", name: "Data Analysis, Statistics and Probability", subfield: Some(STATISTICS) },
    Subject { code: "physics.comp-ph", name: "Computational Physics", subfield: Some((2605, "Computational Mathematics")) },
    Subject { code: "q-bio.QM", name: "Quantitative Methods", subfield: None },
    Subject { code: "q-bio.NC", name: "Neurons and Cognition", subfield: Some((2805, "Cognitive Neuroscience")) },
    Subject { code: "eess.IV", name: "Image and Video Processing", subfield: Some(VISION) },
    Subject { code: "eess.AS", name: "Audio and Speech Processing", subfield: Some(SIGNAL) },
    Subject { code: "eess.SP", name: "Signal Processing", subfield: Some(SIGNAL) },
];

/// Look up a subject by code, ignoring case and surrounding whitespace.
pub fn find(code: &str) -> Option<&'static Subject> {
    let code = code.trim();
    SUBJECTS.iter().find(|s| s.code.eq_ignore_ascii_case(code))
}

/// Distinct OpenAlex subfield ids for `codes`, in first-seen order.
///
/// `None` when any code is unknown or has no subfield, since filtering on the
/// rest would drop that code's papers.
pub fn openalex_subfields(codes: &[String]) -> Option<Vec<u32>> {
    let mut ids = Vec::new();
    for code in codes {
        let (id, _) = find(code)?.subfield?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Some(ids)
}

/// Whether the paper's own categories place it in one of `codes`.
///
/// A category matches an arXiv code directly or the name of the OpenAlex
/// subfield the code maps to. Papers without categories always match.
pub fn paper_in_subjects(paper: &PaperInput, codes: &[String]) -> bool {
    if codes.is_empty() || paper.categories.is_empty() {
        return true;
    }
    codes.iter().any(|code| {
        let subfield = find(code).and_then(|s| s.subfield).map(|(_, name)| name);
        paper.categories.iter().any(|category| {
            let category = category.trim();
            category.eq_ignore_ascii_case(code.trim())
                || subfield.is_some_and(|name| category.eq_ignore_ascii_case(name))
        })
    })
}

/// Keep papers that fall in any of `codes`. An empty list keeps everything.
pub fn retain_in_subjects(papers: Vec<PaperInput>, codes: &[String]) -> Vec<PaperInput> {
    papers
        .into_iter()
        .filter(|paper| paper_in_subjects(paper, codes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    fn paper(title: &str, categories: &[&str]) -> PaperInput {
        let mut paper = PaperInput::new(title, "abstract");
        paper.categories = codes(categories);
        paper
    }

    #[test]
    fn test_find_ignores_case() {
        assert_eq!(find(" CS.ro ").map(|s| s.name), Some("Robotics"));
        assert!(find("cs.XX").is_none());
    }

    #[test]
    fn test_openalex_subfields() {
        assert_eq!(
            openalex_subfields(&codes(&["cs.AI", "cs.CV", "cs.RO", "cs.LG"])),
            Some(vec![1702, 1707, 2207])
        );
        assert_eq!(openalex_subfields(&codes(&["cs.AI", "q-bio.QM"])), None);
        assert_eq!(openalex_subfields(&codes(&["cs.AI", "bogus"])), None);
    }

    #[test]
    fn test_retain_in_subjects() {
        let papers = vec![
            paper("arxiv robotics", &["cs.RO", "cs.SY"]),
            paper("openalex vision", &["Computer Vision and Pattern Recognition", "Image Retrieval"]),
            paper("biology", &["q-bio.GN"]),
            paper("unknown", &[]),
        ];
        let kept = retain_in_subjects(papers.clone(), &codes(&["cs.RO", "cs.CV"]));
        let titles: Vec<&str> = kept.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["arxiv robotics", "openalex vision", "unknown"]);

        assert_eq!(retain_in_subjects(papers, &[]).len(), 4);
    }
}
