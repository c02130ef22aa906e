pub mod extraction;

pub use extraction::ExtractionPipeline;
