pub mod config;
pub mod engine;
pub mod similarity;
pub mod trace;

pub use config::SimilarityConfig;
pub use engine::{AssignRequest, Assignment, AssignmentEngine};
pub use similarity::{HttpSimilarityResolver, SimilarityResolver};
pub use trace::AssignmentTrace;
