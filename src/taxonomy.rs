//! Research-task taxonomy.
//!
//! Holds the ordered set of task categories a paper can be classified into,
//! merges user-supplied categories over the built-in set, and renders the
//! taxonomy as prompt text.

use crate::error::{PaperTaskError, Result};
use serde::{Deserialize, Serialize};

/// Sentinel category for papers that match no taxonomy entry.
pub const UNCLASSIFIED: &str = "unclassified";

/// A single research-task category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCategory {
    pub name: String,
    pub definition: String,
    #[serde(default)]
    pub typical_output: String,
    #[serde(default)]
    pub datasets_metrics: String,
}

impl TaskCategory {
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        typical_output: impl Into<String>,
        datasets_metrics: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            typical_output: typical_output.into(),
            datasets_metrics: datasets_metrics.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PaperTaskError::Config(
                "task category with an empty name".to_string(),
            ));
        }
        if self.definition.trim().is_empty() {
            return Err(PaperTaskError::Config(format!(
                "task category '{}' has no definition",
                self.name
            )));
        }
        Ok(())
    }
}

/// Ordered mapping of category name to category.
///
/// Names are unique; iteration follows insertion order so the rendered
/// prompt is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    categories: Vec<TaskCategory>,
}

impl Taxonomy {
    /// The shipped category set.
    pub fn builtin() -> Self {
        Self {
            categories: builtin_categories(),
        }
    }

    /// Build a taxonomy from caller-supplied categories.
    ///
    /// Fails on a blank name or definition, or on a repeated name.
    pub fn from_categories<I>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = TaskCategory>,
    {
        let mut taxonomy = Self::default();
        for category in categories {
            category.validate()?;
            if taxonomy.position(&category.name).is_some() {
                return Err(PaperTaskError::Config(format!(
                    "duplicate task category '{}'",
                    category.name
                )));
            }
            taxonomy.categories.push(category);
        }
        Ok(taxonomy)
    }

    /// Merge `overrides` into a copy of this taxonomy.
    ///
    /// An override with an existing name replaces that entry in place;
    /// new names are appended in the order given.
    pub fn merged(&self, overrides: &Taxonomy) -> Self {
        let mut merged = self.clone();
        for category in &overrides.categories {
            match merged.position(&category.name) {
                Some(idx) => merged.categories[idx] = category.clone(),
                None => merged.categories.push(category.clone()),
            }
        }
        merged
    }

    /// The taxonomy a run should use: built-in plus custom, or custom alone.
    pub fn effective(use_builtin: bool, custom: &[TaskCategory]) -> Result<Self> {
        let custom = Self::from_categories(custom.iter().cloned())?;
        if use_builtin {
            Ok(Self::builtin().merged(&custom))
        } else if custom.is_empty() {
            Err(PaperTaskError::Config(
                "built-in categories disabled but no custom categories configured".to_string(),
            ))
        } else {
            Ok(custom)
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskCategory> {
        self.categories.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TaskCategory> {
        self.position(name).map(|idx| &self.categories[idx])
    }

    /// Map a model-supplied category name to its canonical taxonomy name.
    ///
    /// Exact match first, then case-insensitive; surrounding whitespace is ignored.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return None;
        }
        self.categories
            .iter()
            .find(|c| c.name == wanted)
            .or_else(|| {
                let lower = wanted.to_lowercase();
                self.categories.iter().find(|c| c.name.to_lowercase() == lower)
            })
            .map(|c| c.name.as_str())
    }

    /// Render as one `- name: definition` line per category.
    ///
    /// Line breaks and runs of whitespace inside a field collapse to a single
    /// space.
    pub fn format(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("- {}: {}\n", single_line(&c.name), single_line(&c.definition)))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format `categories` for a prompt, with `overrides` merged in first.
pub fn format_taxonomy(categories: &Taxonomy, overrides: Option<&Taxonomy>) -> String {
    match overrides {
        Some(overrides) => categories.merged(overrides).format(),
        None => categories.format(),
    }
}

fn builtin_categories() -> Vec<TaskCategory> {
    vec![
        TaskCategory::new(
            "Action Recognition",
            "Recognize predefined actions or activities in video or sensor data",
            "Class labels (e.g. \"walking\", \"waving\")",
            "UCF101, HMDB51; Accuracy",
        ),
        TaskCategory::new(
            "Hand-Object Interaction Detection (HOI)",
            "Detect humans and objects in images and identify the interaction (verb) between them",
            "<human, verb, object> triplets",
            "HICO-DET, V-COCO; mAP",
        ),
        TaskCategory::new(
            "Active Object Detection",
            "Detect objects (or \"hotspot\" regions) likely to be interacted with in an interaction scene",
            "Bounding boxes or hotspot maps of interacted objects",
            "Epic-Kitchens, EGTEA Gaze+",
        ),
        TaskCategory::new(
            "Cross-Embodiment Imitation Learning",
            "Transfer human actions (e.g. hand poses extracted from video) into robot-executable policies, covering visual-action mapping, motion retargeting and few-shot generalization across embodiments",
            "Robot action sequences (joint angles, wrist poses, grasp signals) or task execution trajectories",
            "Real-world demonstrations; task success rate, trajectory similarity, generalization",
        ),
        TaskCategory::new(
            "Episodic Memory",
            "Use episodic memory to optimize in-context example ordering and improve few-shot performance",
            "Example sequences that maximize reward for a test query",
            "",
        ),
        TaskCategory::new(
            "Natural Language Query (NLQ)",
            "Localize the moment or region in an egocentric video that answers a natural language question",
            "Timestamps or spatio-temporal bounding boxes",
            "Ego4D-NLQ",
        ),
        TaskCategory::new(
            "VQ2D/VQ3D",
            "Visual queries in 2D/3D: retrieve, localize and track a queried object across (multi-view) video",
            "Object trajectories or poses in 2D or 3D space",
            "EmbodiedScan",
        ),
        TaskCategory::new(
            "Embodied 3D Visual Grounding",
            "Localize a target object in a 3D environment from a first-person view given a natural language instruction",
            "9-DoF 3D bounding box (center, size, orientation)",
            "",
        ),
        TaskCategory::new(
            "Embodied Question Answering (EQA)",
            "An agent explores an environment (navigation, interaction) to answer questions about it",
            "Answers to natural language questions",
            "",
        ),
        TaskCategory::new(
            "Navigation",
            "Plan and execute a path from start to goal in an embodied environment following natural language instructions",
            "Navigation actions (forward, turn left, stop) or waypoint sequences",
            "R2R, RxR, GEL-R2R, FGR2R; Success Rate (SR), SPL",
        ),
        TaskCategory::new(
            "Task Progress Estimation",
            "Predict the completion percentage of a task for every video frame",
            "Progress values in 0-100%",
            "RoboCasa, OpenX Embodiment; Pearson correlation, L2 distance",
        ),
        TaskCategory::new(
            "Video Question Answering (VQA)",
            "Answer natural language questions about a whole video, especially whether and when an event happened",
            "Answers (e.g. \"yes, at frame 120\")",
            "RoboCasa, OpenX Embodiment; accuracy, precision, recall, temporal localization error",
        ),
        TaskCategory::new(
            "Natural Language State Reasoning",
            "Describe the current state of every video frame in natural language and verify it against ground truth",
            "Natural language state descriptions",
            "RoboCasa, OpenX Embodiment; error rate, accuracy",
        ),
        TaskCategory::new(
            "Behavior Forecasting",
            "Predict the future behavior or motion trajectory of an agent (person, vehicle)",
            "Future trajectory points or behavior classes",
            "User behavior datasets; accuracy",
        ),
        TaskCategory::new(
            "Next Active Object Detection",
            "Predict the object most likely to be interacted with next",
            "Bounding boxes or probability scores of candidate objects",
            "Epic-Kitchens, EGTEA Gaze+",
        ),
        TaskCategory::new(
            "Interaction Anticipation",
            "Predict interactions or interaction types likely to happen in the future",
            "Interaction verbs (e.g. \"grasp\", \"open\")",
            "Epic-Kitchens, EGTEA Gaze+",
        ),
        TaskCategory::new(
            "Egocentric Human Pose Estimation",
            "Estimate 2D or 3D body joint positions from a first-person (head-mounted) camera",
            "2D or 3D joint coordinates",
            "Human3.6M, MPI-INF-3DHP; MPJPE",
        ),
        TaskCategory::new(
            "Text-Driven Interaction Generation",
            "Generate human motion or interaction sequences that match a text description",
            "Generated motion sequences (video, 3D pose sequences)",
            "",
        ),
        TaskCategory::new(
            "Multimodal Learning",
            "Joint learning and reasoning over several modalities such as vision, language and audio",
            "Cross-modal representations, multimodal predictions",
            "CLIP, ALIGN; cross-modal retrieval accuracy",
        ),
        TaskCategory::new(
            "Reinforcement Learning",
            "Learn optimal policies through interaction with an environment",
            "Policies, action sequences, rewards",
            "Cumulative reward, success rate, convergence speed",
        ),
        TaskCategory::new(
            "Large Language Model Applications",
            "Apply large language models to specific tasks or domains",
            "Generated text, task completion results",
            "BLEU, ROUGE, human evaluation",
        ),
        TaskCategory::new(
            "Computer Vision Fundamentals",
            "Core vision tasks such as image classification, object detection and semantic segmentation",
            "Class labels, bounding boxes, segmentation masks",
            "ImageNet, COCO; mAP, IoU",
        ),
        TaskCategory::new(
            "Natural Language Processing",
            "Text understanding, generation and translation",
            "Text classes, generated text, translations",
            "GLUE, SuperGLUE; BLEU",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, definition: &str) -> TaskCategory {
        TaskCategory::new(name, definition, "", "")
    }

    #[test]
    fn test_format_one_line_per_category() {
        let taxonomy = Taxonomy::builtin();
        let text = taxonomy.format();
        assert_eq!(text.lines().count(), taxonomy.len());
        for c in taxonomy.iter() {
            assert!(text.contains(&format!("- {}: {}", c.name, c.definition)));
        }
    }

    #[test]
    fn test_format_preserves_order() {
        let taxonomy = Taxonomy::from_categories(vec![
            category("Zeta", "last letter"),
            category("Alpha", "first letter"),
        ])
        .expect("valid taxonomy");
        assert_eq!(taxonomy.format(), "- Zeta: last letter\n- Alpha: first letter\n");
    }

    #[test]
    fn test_format_flattens_multiline_fields() {
        let taxonomy = Taxonomy::from_categories(vec![
            category("Pick and\nPlace", "Pick objects.\nAlso place them.\r\n  Carefully."),
            category("Other", "single"),
        ])
        .expect("valid taxonomy");
        let text = taxonomy.format();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(
            text,
            "- Pick and Place: Pick objects. Also place them. Carefully.\n- Other: single\n"
        );
    }

    #[test]
    fn test_builtin_names_unique() {
        let taxonomy = Taxonomy::builtin();
        let rebuilt = Taxonomy::from_categories(taxonomy.iter().cloned());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_override_replaces_in_place() {
        let base = Taxonomy::from_categories(vec![
            category("A", "old a"),
            category("B", "old b"),
        ])
        .expect("valid base");
        let overrides = Taxonomy::from_categories(vec![
            TaskCategory::new("A", "new a", "boxes", ""),
            category("C", "brand new"),
        ])
        .expect("valid overrides");

        let merged = base.merged(&overrides);
        let names: Vec<&str> = merged.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let a = merged.get("A").expect("A present");
        assert_eq!(a.definition, "new a");
        assert_eq!(a.typical_output, "boxes");
        assert_eq!(
            format_taxonomy(&base, Some(&overrides)),
            "- A: new a\n- B: old b\n- C: brand new\n"
        );
    }

    #[test]
    fn test_missing_definition_fails_fast() {
        let err = Taxonomy::from_categories(vec![category("Empty", "  ")])
            .expect_err("blank definition must be rejected");
        assert!(matches!(err, PaperTaskError::Config(_)));
    }

    #[test]
    fn test_missing_definition_fails_deserialization() {
        let parsed: std::result::Result<TaskCategory, _> =
            serde_json::from_str(r#"{"name": "No Definition"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = Taxonomy::from_categories(vec![category("A", "x"), category("A", "y")])
            .expect_err("duplicate must be rejected");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_effective_custom_only() {
        let custom = vec![category("Only", "the one")];
        let taxonomy = Taxonomy::effective(false, &custom).expect("custom taxonomy");
        assert_eq!(taxonomy.len(), 1);

        assert!(Taxonomy::effective(false, &[]).is_err());

        let combined = Taxonomy::effective(true, &custom).expect("combined taxonomy");
        assert_eq!(combined.len(), Taxonomy::builtin().len() + 1);
    }

    #[test]
    fn test_resolve() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.resolve("Navigation"), Some("Navigation"));
        assert_eq!(taxonomy.resolve("  navigation "), Some("Navigation"));
        assert_eq!(taxonomy.resolve("Knitting"), None);
        assert_eq!(taxonomy.resolve(""), None);
    }
}
