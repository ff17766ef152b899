//! # rustpapertask
//!
//! Academic paper task classification pipeline.
//!
//! Each paper's title and abstract is sent to an OpenAI-compatible chat model
//! together with a research-task taxonomy; the model's reply is interpreted
//! into a structured [`AnalysisRecord`] (task category, methods,
//! contributions, datasets, metrics, confidence).
//!
//! ## Modules
//!
//! - [`taxonomy`] - Research-task categories and their prompt rendering
//! - [`prompts`] - Prompt templates
//! - [`gateway`] - Chat-completion client with retries
//! - [`interpreter`] - Lenient JSON extraction from model replies
//! - [`analyzer`] - Sequential batch orchestration
//! - [`sources`] - Paper loading (local files, OpenAlex)
//! - [`export`] / [`stats`] - CSV output and batch statistics
//! - [`report`] - Markdown and JSON run reports
//! - [`config`] / [`presets`] - User configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustpapertask::{GatewayConfig, ModelGateway, PaperAnalyzer, PaperInput, Taxonomy};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = ModelGateway::connect(GatewayConfig::new("sk-..."))?;
//!     let analyzer = PaperAnalyzer::new(gateway, Taxonomy::builtin(), false);
//!     let papers = vec![PaperInput::new("Learning to Grasp", "We teach robots to grasp.")];
//!     let report = analyzer.run(&papers).await?;
//!     println!("{}", report.summary_line());
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod export;
pub mod gateway;
pub mod interpreter;
pub mod paper;
pub mod presets;
pub mod prompts;
pub mod report;
pub mod sources;
pub mod stats;
pub mod taxonomy;

pub use analyzer::{BatchReport, PaperAnalyzer, PaperOutcome, RecordSink, SkipReason};
pub use error::{PaperTaskError, Result};
pub use gateway::{GatewayConfig, ModelGateway};
pub use paper::{AnalysisRecord, Author, PaperInput};
pub use taxonomy::{TaskCategory, Taxonomy};
