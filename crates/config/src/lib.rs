pub mod env;
pub mod tracing_init;

pub use env::{AlertSettings, AppConfig, BlocklistSettings, SimilaritySettings};
pub use tracing_init::init_tracing;
