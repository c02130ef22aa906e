pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::pipelines::ExtractionPipeline;
pub use app::Gateways;
pub use config::LakeConfig;
pub use core::{EtlEngine, ExtractionReport, Workflow, WorkflowStep};
pub use utils::error::{EtlError, Result};
