use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use expertline_common::error::{ExpertError, ExpertResult};
use expertline_db::users::models::normalize_term;
use reqwest::Client;
use serde::Deserialize;

use crate::config::SimilarityConfig;

/// Expands a topic into semantically related terms.
///
/// Never fails: an unreachable or empty source yields an empty set so that
/// question submission is not blocked.
#[async_trait]
pub trait SimilarityResolver: Send + Sync {
    async fn resolve(&self, topic: &str) -> BTreeSet<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
}

impl From<SimilarityError> for ExpertError {
    fn from(err: SimilarityError) -> Self {
        ExpertError::UpstreamUnavailable(format!("similarity service: {err}"))
    }
}

/// Related-words entry as returned by a Datamuse-compatible `?ml=` endpoint.
#[derive(Debug, Deserialize)]
struct RelatedWord {
    word: String,
}

#[derive(Clone)]
pub struct HttpSimilarityResolver {
    client: Client,
    config: SimilarityConfig,
}

impl HttpSimilarityResolver {
    pub fn new(config: SimilarityConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    async fn fetch(&self, url: &str, topic: &str) -> Result<BTreeSet<String>, SimilarityError> {
        let response = self
            .client
            .get(url)
            .query(&[
                ("ml", topic.to_string()),
                ("max", self.config.max_results.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SimilarityError::HttpStatus(status));
        }

        let words: Vec<RelatedWord> = response.json().await?;
        Ok(words
            .iter()
            .map(|w| normalize_term(&w.word))
            .filter(|w| !w.is_empty())
            .take(self.config.max_results)
            .collect())
    }
}

impl HttpSimilarityResolver {
    /// Look up related terms, surfacing an unreachable or misbehaving
    /// service as `UpstreamUnavailable`. A disabled resolver or a blank
    /// topic yields an empty set.
    pub async fn try_resolve(&self, topic: &str) -> ExpertResult<BTreeSet<String>> {
        let Some(url) = self.config.url.as_deref() else {
            tracing::debug!("similarity lookup disabled");
            return Ok(BTreeSet::new());
        };

        let topic = normalize_term(topic);
        if topic.is_empty() {
            return Ok(BTreeSet::new());
        }

        let terms = self.fetch(url, &topic).await?;
        tracing::debug!(%topic, count = terms.len(), "resolved related terms");
        Ok(terms)
    }
}

#[async_trait]
impl SimilarityResolver for HttpSimilarityResolver {
    async fn resolve(&self, topic: &str) -> BTreeSet<String> {
        match self.try_resolve(topic).await {
            Ok(terms) => terms,
            Err(e) => {
                tracing::warn!(%topic, error = %e, "similarity lookup degraded to empty set");
                BTreeSet::new()
            }
        }
    }
}
