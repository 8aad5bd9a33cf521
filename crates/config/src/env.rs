use expertline_common::error::{ExpertError, ExpertResult};
use serde::Deserialize;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cors_origins: Vec<String>,
    /// Peers whose `X-Forwarded-For` header is believed. Empty means the
    /// socket peer is always the client address.
    pub trusted_proxies: Vec<IpAddr>,
    pub similarity: SimilaritySettings,
    pub alerts: AlertSettings,
    pub blocklist: BlocklistSettings,
}

/// External similarity lookup. `url = None` means the resolver always
/// answers with an empty set.
#[derive(Debug, Clone, Deserialize)]
pub struct SimilaritySettings {
    pub url: Option<String>,
    pub timeout_ms: u64,
    pub max_results: usize,
}

/// Outbound moderation alert email. `api_key = None` disables sending;
/// alerts are then only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlocklistSettings {
    pub words: Vec<String>,
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> ExpertResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let alert_from = get_optional("ALERT_FROM");
        let alert_key = get_optional("ALERT_API_KEY");
        if alert_key.is_some() && alert_from.is_none() {
            return Err(ExpertError::Config(
                "ALERT_FROM is required when ALERT_API_KEY is set".to_string(),
            ));
        }

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "8080")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            cors_origins: split_csv(&get_var_or("CORS_ORIGINS", "http://localhost:3000")),
            trusted_proxies: parse_ip_list("TRUSTED_PROXIES")?,
            similarity: SimilaritySettings {
                url: get_optional("SIMILARITY_URL"),
                timeout_ms: parse_var("SIMILARITY_TIMEOUT_MS", "2000")?,
                max_results: parse_var("SIMILARITY_MAX_RESULTS", "25")?,
            },
            alerts: AlertSettings {
                api_url: get_var_or("ALERT_API_URL", "https://api.resend.com"),
                api_key: alert_key,
                to: get_optional("ALERT_TO").or_else(|| alert_from.clone()),
                from: alert_from,
                timeout_ms: parse_var("ALERT_TIMEOUT_MS", "5000")?,
            },
            blocklist: BlocklistSettings {
                words: get_optional("BLOCKLIST")
                    .map(|raw| split_csv(&raw))
                    .unwrap_or_default(),
                path: get_optional("BLOCKLIST_PATH").map(PathBuf::from),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl BlocklistSettings {
    /// Union of the words file and the inline list. File lines starting
    /// with `#` are comments.
    pub fn load_words(&self) -> ExpertResult<Vec<String>> {
        let mut words = Vec::new();

        if let Some(path) = &self.path {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                ExpertError::Config(format!("cannot read BLOCKLIST_PATH {}: {e}", path.display()))
            })?;
            words.extend(
                raw.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_owned),
            );
        }

        words.extend(self.words.iter().cloned());
        Ok(words)
    }
}

fn get_var(key: &str) -> ExpertResult<String> {
    env::var(key).map_err(|_| ExpertError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn get_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> ExpertResult<T>
where
    T::Err: std::fmt::Display,
{
    get_var_or(key, default)
        .parse()
        .map_err(|e| ExpertError::Config(format!("invalid {key}: {e}")))
}

fn parse_ip_list(key: &str) -> ExpertResult<Vec<IpAddr>> {
    split_csv(&get_var_or(key, ""))
        .iter()
        .map(|ip| {
            ip.parse()
                .map_err(|e| ExpertError::Config(format!("invalid {key} entry {ip}: {e}")))
        })
        .collect()
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
