use expertline_config::SimilaritySettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Base URL of the related-words service. `None` disables lookups.
    pub url: Option<String>,
    pub timeout_ms: u64,
    pub max_results: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 2000,
            max_results: 25,
        }
    }
}

impl From<&SimilaritySettings> for SimilarityConfig {
    fn from(settings: &SimilaritySettings) -> Self {
        Self {
            url: settings.url.clone(),
            timeout_ms: settings.timeout_ms,
            max_results: settings.max_results,
        }
    }
}
