pub mod pipeline;
pub mod scoring;

pub use pipeline::PredictionPipeline;
pub use scoring::{ScoringEngine, ScoringWeights};
