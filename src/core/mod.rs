pub mod etl;
pub mod workflow;

pub use etl::{EtlEngine, ExtractionReport};
pub use workflow::{execution_summary, StepOutcome, Workflow, WorkflowStep};
