//! Named search presets.

use crate::config::UserConfig;
use crate::taxonomy::TaskCategory;

/// A ready-made research focus: search terms plus optional extra categories.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub start_date: &'static str,
    pub end_date: &'static str,
    pub max_papers: usize,
    /// arXiv subject codes
    pub research_categories: &'static [&'static str],
    /// `(name, definition, typical_output, datasets_metrics)`
    pub custom_tasks: &'static [(&'static str, &'static str, &'static str, &'static str)],
}

impl Preset {
    pub fn custom_categories(&self) -> Vec<TaskCategory> {
        self.custom_tasks
            .iter()
            .map(|(name, definition, output, datasets)| {
                TaskCategory::new(*name, *definition, *output, *datasets)
            })
            .collect()
    }

    /// Overwrite the search settings and custom categories of `config`.
    ///
    /// The built-in categories stay enabled; preset categories are added on top.
    pub fn apply_to(&self, config: &mut UserConfig) {
        config.search_keywords = self.keywords.iter().map(|k| k.to_string()).collect();
        config.start_date = self.start_date.to_string();
        config.end_date = self.end_date.to_string();
        config.max_papers = self.max_papers;
        config.research_categories = self.research_categories.iter().map(|c| c.to_string()).collect();
        config.custom_task_categories = self.custom_categories();
        config.use_default_categories = true;
    }
}

pub fn find(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.key == key)
}

pub const PRESETS: &[Preset] = &[
    Preset {
        key: "embodied_ai",
        name: "Embodied AI",
        description: "Embodied AI, robotics and human-object interaction, using the built-in task categories",
        keywords: &[
            "embodied",
            "robotics",
            "manipulation",
            "navigation",
            "embodied AI",
            "robot learning",
            "imitation learning",
            "HOI",
            "egocentric",
        ],
        start_date: "2024-01-01",
        end_date: "2024-12-31",
        max_papers: 50,
        research_categories: &["cs.AI", "cs.RO", "cs.CV", "cs.LG"],
        custom_tasks: &[],
    },
    Preset {
        key: "multimodal_learning",
        name: "Multimodal Learning",
        description: "Cross-modal learning, vision-language models and multimodal fusion",
        keywords: &[
            "multimodal",
            "vision-language",
            "CLIP",
            "cross-modal",
            "VLM",
            "vision transformer",
        ],
        start_date: "2024-01-01",
        end_date: "2024-12-31",
        max_papers: 50,
        research_categories: &["cs.CV", "cs.CL", "cs.LG", "cs.AI"],
        custom_tasks: &[
            (
                "Vision-Language Pretraining",
                "Large-scale joint pretraining of vision and language models",
                "Cross-modal representations, image-text matching scores",
                "CLIP, ALIGN; zero-shot classification accuracy",
            ),
            (
                "Cross-Modal Retrieval",
                "Retrieving and matching images and text against each other",
                "Retrieval rankings, similarity scores",
                "Flickr30K, MS-COCO; Recall@K",
            ),
            (
                "Multimodal Dialogue",
                "Dialogue systems that ground responses in visual input",
                "Dialogue responses, visual answers",
                "VQA; BLEU, CIDEr",
            ),
        ],
    },
    Preset {
        key: "large_language_models",
        name: "Large Language Models",
        description: "Large language models, instruction tuning and reasoning",
        keywords: &[
            "LLM",
            "transformer",
            "GPT",
            "language model",
            "instruction tuning",
            "reasoning",
            "alignment",
        ],
        start_date: "2024-01-01",
        end_date: "2024-12-31",
        max_papers: 50,
        research_categories: &["cs.CL", "cs.AI", "cs.LG"],
        custom_tasks: &[
            (
                "Instruction Tuning",
                "Aligning models with human feedback and instruction following",
                "Instruction-following responses, alignment ratings",
                "Alpaca, Vicuna; human evaluation",
            ),
            (
                "Chain-of-Thought Reasoning",
                "Step-by-step reasoning and complex problem solving",
                "Reasoning steps, final answers",
                "GSM8K, MATH; reasoning accuracy",
            ),
            (
                "Code Generation",
                "Generating and understanding code from natural language",
                "Executable code, code explanations",
                "HumanEval, MBPP; Pass@K",
            ),
        ],
    },
    Preset {
        key: "computer_vision",
        name: "Computer Vision",
        description: "Image recognition, object detection and image generation",
        keywords: &[
            "computer vision",
            "object detection",
            "segmentation",
            "recognition",
            "image generation",
            "diffusion",
        ],
        start_date: "2024-01-01",
        end_date: "2024-12-31",
        max_papers: 50,
        research_categories: &["cs.CV", "cs.AI", "cs.LG"],
        custom_tasks: &[
            (
                "Object Detection",
                "Localizing and recognizing objects in images",
                "Bounding boxes, class labels, confidences",
                "COCO, Pascal VOC; mAP",
            ),
            (
                "Semantic Segmentation",
                "Pixel-level scene understanding and segmentation",
                "Segmentation masks, pixel labels",
                "Cityscapes, ADE20K; mIoU",
            ),
            (
                "Image Generation",
                "Conditional image synthesis and editing",
                "Generated images, edited results",
                "FID, IS, LPIPS",
            ),
        ],
    },
    Preset {
        key: "reinforcement_learning",
        name: "Reinforcement Learning",
        description: "Reinforcement learning algorithms, multi-agent systems and policy optimization",
        keywords: &[
            "reinforcement learning",
            "RL",
            "policy",
            "reward",
            "agent",
            "MARL",
            "offline RL",
        ],
        start_date: "2024-01-01",
        end_date: "2024-12-31",
        max_papers: 50,
        research_categories: &["cs.LG", "cs.AI", "cs.RO", "cs.MA"],
        custom_tasks: &[
            (
                "Offline Reinforcement Learning",
                "Learning policies from logged data without online interaction",
                "Offline policies, value functions",
                "D4RL; normalized score",
            ),
            (
                "Multi-Agent Reinforcement Learning",
                "Several agents learning to cooperate or compete",
                "Multi-agent policies, coordination mechanisms",
                "SMAC, MPE; win rate",
            ),
            (
                "Hierarchical Reinforcement Learning",
                "Hierarchical decision making and skill learning",
                "Hierarchical policies, subgoals",
                "Success rate, sample efficiency",
            ),
        ],
    },
    Preset {
        key: "recent_trends",
        name: "Recent Trends",
        description: "Current developments and frontier topics across AI",
        keywords: &[
            "AI",
            "machine learning",
            "deep learning",
            "neural network",
            "foundation model",
            "AGI",
        ],
        start_date: "2024-01-01",
        end_date: "2024-12-31",
        max_papers: 50,
        research_categories: &["cs.AI", "cs.LG", "cs.CV", "cs.CL"],
        custom_tasks: &[
            (
                "Foundation Models",
                "Research on large-scale pretrained foundation models",
                "Pretrained models, downstream task performance",
                "Multi-task evaluation; zero-shot performance",
            ),
            (
                "AI Safety",
                "Safety and reliability of AI systems",
                "Safety evaluations, adversarial example detection",
                "Robustness metrics, safety scores",
            ),
            (
                "Federated Learning",
                "Distributed privacy-preserving learning",
                "Federated models, privacy mechanisms",
                "Communication efficiency, privacy budget",
            ),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Taxonomy;

    #[test]
    fn test_all_presets_produce_valid_config() {
        for preset in PRESETS {
            let mut config = UserConfig::default();
            preset.apply_to(&mut config);
            config.validate().expect(preset.key);
            let taxonomy = config.taxonomy().expect(preset.key);
            assert_eq!(
                taxonomy.len(),
                Taxonomy::builtin().len() + preset.custom_tasks.len(),
                "{}",
                preset.key
            );
        }
    }

    #[test]
    fn test_find_preset() {
        let preset = find("computer_vision").expect("known preset");
        assert_eq!(preset.name, "Computer Vision");
        assert!(find("astrology").is_none());
    }

    #[test]
    fn test_apply_replaces_search_settings() {
        let mut config = UserConfig::default();
        config.custom_task_categories = vec![TaskCategory::new("Old", "stale", "", "")];
        find("embodied_ai").expect("preset").apply_to(&mut config);
        assert!(config.custom_task_categories.is_empty());
        assert_eq!(config.start_date, "2024-01-01");
        assert!(config.search_keywords.contains(&"egocentric".to_string()));

        find("reinforcement_learning").expect("preset").apply_to(&mut config);
        assert_eq!(config.research_categories, vec!["cs.LG", "cs.AI", "cs.RO", "cs.MA"]);
    }
}
