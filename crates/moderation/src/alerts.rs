//! Best-effort moderation alerts.
//!
//! The pipeline hands each violation to an [`AlertQueue`] and returns at
//! once. A single worker task drains the queue and makes exactly one
//! delivery attempt per alert; failures are logged and never retried, so an
//! alert is never sent twice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use expertline_common::error::{ExpertError, ExpertResult};
use expertline_config::AlertSettings;
use expertline_db::moderation::models::{ModerationRecord, ParticipantSnapshot};
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const ALERT_SUBJECT: &str = "Moderation Alert";

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub api_url: String,
    /// `None` disables delivery; alerts are only logged.
    pub api_key: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub timeout_ms: u64,
}

impl From<&AlertSettings> for AlertConfig {
    fn from(settings: &AlertSettings) -> Self {
        Self {
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            from: settings.from.clone(),
            to: settings.to.clone(),
            timeout_ms: settings.timeout_ms,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("alert sender misconfigured: {0}")]
    Misconfigured(String),
}

impl From<AlertError> for ExpertError {
    fn from(err: AlertError) -> Self {
        ExpertError::UpstreamUnavailable(format!("alert sender: {err}"))
    }
}

#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, record: &ModerationRecord) -> Result<(), AlertError>;
}

/// Sends alerts through a Resend-compatible `POST /emails` API.
#[derive(Clone)]
pub struct HttpAlertSender {
    client: Client,
    config: AlertConfig,
}

impl HttpAlertSender {
    pub fn new(config: AlertConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl AlertSender for HttpAlertSender {
    async fn send(&self, record: &ModerationRecord) -> Result<(), AlertError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::info!(
                session_id = %record.session_id,
                offending_token = %record.offending_token,
                "alert delivery disabled, moderation alert logged only"
            );
            return Ok(());
        };
        let (from, to) = match (&self.config.from, &self.config.to) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(AlertError::Misconfigured(
                    "from and to addresses are required".to_string(),
                ))
            }
        };

        let payload = serde_json::json!({
            "from": from,
            "to": [to],
            "subject": ALERT_SUBJECT,
            "html": render_alert_html(record),
        });

        let response = self
            .client
            .post(format!("{}/emails", self.config.api_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(AlertError::HttpError { status, body })
    }
}

/// Handle the pipeline uses to hand alerts to the worker.
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<ModerationRecord>,
}

impl AlertQueue {
    /// Queue an alert without waiting. Returns false if the queue is full or
    /// the worker is gone; the audit record stays the source of truth.
    pub fn enqueue(&self, record: ModerationRecord) -> bool {
        let record_id = record.id;
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(%record_id, error = %e, "moderation alert not queued");
                false
            }
        }
    }
}

/// One bounded delivery attempt. Any failure, timeout included, comes back
/// as `UpstreamUnavailable`.
pub async fn dispatch(
    sender: &dyn AlertSender,
    record: &ModerationRecord,
    timeout: Duration,
) -> ExpertResult<()> {
    tokio::time::timeout(timeout, sender.send(record))
        .await
        .unwrap_or(Err(AlertError::Timeout(timeout)))
        .map_err(ExpertError::from)
}

/// Start the alert worker. The worker stops once every `AlertQueue` clone is
/// dropped and the queue is drained.
pub fn spawn_alert_worker(
    sender: Arc<dyn AlertSender>,
    capacity: usize,
    dispatch_timeout: Duration,
) -> (AlertQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ModerationRecord>(capacity);

    let handle = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match dispatch(sender.as_ref(), &record, dispatch_timeout).await {
                Ok(()) => tracing::info!(
                    record_id = %record.id,
                    session_id = %record.session_id,
                    "moderation alert dispatched"
                ),
                Err(e) => tracing::warn!(
                    record_id = %record.id,
                    session_id = %record.session_id,
                    error = %e,
                    "moderation alert failed"
                ),
            }
        }
        tracing::debug!("alert worker stopped");
    });

    (AlertQueue { tx }, handle)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn participant_rows(label: &str, snapshot: &Option<ParticipantSnapshot>) -> String {
    let (identity, created) = match snapshot {
        Some(s) => (
            s.identity.as_str(),
            s.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ),
        None => ("", String::new()),
    };
    format!(
        "<tr><th>{label}</th><td>{}</td></tr>\
         <tr><th>{label} since</th><td>{}</td></tr>",
        escape_html(identity),
        escape_html(&created)
    )
}

pub fn render_alert_html(record: &ModerationRecord) -> String {
    let row = |label: &str, value: &str| {
        format!("<tr><th>{label}</th><td>{}</td></tr>", escape_html(value))
    };

    format!(
        "<h2>{ALERT_SUBJECT}</h2><table>{}{}{}{}{}{}{}{}{}{}</table>",
        row("From", &record.sender),
        row("Sender role", record.sender_role.as_str()),
        row("Original text", &record.original_text),
        row("Filtered text", &record.redacted_text),
        row("Offending word", &record.offending_token),
        row("Chat", &record.session_id.to_string()),
        participant_rows("Asker", &record.asker),
        participant_rows("Expert", &record.expert),
        row("Topic", record.question_topic.as_deref().unwrap_or("")),
        row("Question", record.question_body.as_deref().unwrap_or("")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use expertline_db::moderation::models::SenderRole;
    use std::sync::Mutex;
    use uuid::Uuid;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> ModerationRecord {
        ModerationRecord {
            id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            sender: "asker@example.com".to_string(),
            sender_role: SenderRole::Asker,
            original_text: "you <b>idiot</b>".to_string(),
            redacted_text: "you <b>#####</b>".to_string(),
            offending_token: "idiot".to_string(),
            asker: Some(ParticipantSnapshot::unregistered("asker@example.com")),
            expert: None,
            question_topic: Some("volcanoes".to_string()),
            question_body: Some("Why?".to_string()),
            created_at: Utc::now(),
        }
    }

    fn config(api_url: String, key: Option<&str>) -> AlertConfig {
        AlertConfig {
            api_url,
            api_key: key.map(str::to_string),
            from: Some("admin@example.com".to_string()),
            to: Some("admin@example.com".to_string()),
            timeout_ms: 1000,
        }
    }

    struct RecordingSender {
        sent: Mutex<Vec<Uuid>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertSender for RecordingSender {
        async fn send(&self, record: &ModerationRecord) -> Result<(), AlertError> {
            self.sent.lock().unwrap().push(record.id);
            if self.fail {
                Err(AlertError::Misconfigured("test failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct SlowSender;

    #[async_trait]
    impl AlertSender for SlowSender {
        async fn send(&self, _record: &ModerationRecord) -> Result<(), AlertError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_reports_failures_as_upstream_unavailable() {
        let failing = RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail: true,
        };
        let result = dispatch(&failing, &record(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ExpertError::UpstreamUnavailable(msg)) if msg.contains("test failure")));

        let result = dispatch(&SlowSender, &record(), Duration::from_millis(20)).await;
        assert!(matches!(result, Err(ExpertError::UpstreamUnavailable(msg)) if msg.contains("timed out")));
    }

    #[test]
    fn config_is_built_from_env_settings() {
        let config = AlertConfig::from(&AlertSettings {
            api_url: "https://mail.local".to_string(),
            api_key: Some("key".to_string()),
            from: Some("alerts@example.com".to_string()),
            to: None,
            timeout_ms: 1500,
        });
        assert_eq!(config.api_url, "https://mail.local");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert!(config.to.is_none());
        assert_eq!(config.timeout_ms, 1500);
    }

    #[test]
    fn html_escapes_user_content() {
        let html = render_alert_html(&record());
        assert!(html.contains("you &lt;b&gt;idiot&lt;/b&gt;"));
        assert!(!html.contains("<b>idiot"));
        assert!(html.contains("volcanoes"));
        assert!(html.contains(ALERT_SUBJECT));
    }

    #[tokio::test]
    async fn http_sender_posts_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(bearer_token("re_test"))
            .and(body_partial_json(serde_json::json!({
                "from": "admin@example.com",
                "to": ["admin@example.com"],
                "subject": "Moderation Alert"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let sender = HttpAlertSender::new(config(server.uri(), Some("re_test"))).unwrap();
        sender.send(&record()).await.expect("send");
    }

    #[tokio::test]
    async fn http_sender_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad from"))
            .mount(&server)
            .await;

        let sender = HttpAlertSender::new(config(server.uri(), Some("re_test"))).unwrap();
        let err = sender.send(&record()).await.unwrap_err();
        assert!(matches!(err, AlertError::HttpError { status, .. } if status == StatusCode::UNPROCESSABLE_ENTITY));
    }

    #[tokio::test]
    async fn sender_without_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sender = HttpAlertSender::new(config(server.uri(), None)).unwrap();
        sender.send(&record()).await.expect("logged only");
    }

    #[tokio::test]
    async fn worker_delivers_each_alert_once() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail: false,
        });
        let (queue, handle) = spawn_alert_worker(sender.clone(), 8, Duration::from_secs(1));

        let a = record();
        let b = record();
        assert!(queue.enqueue(a.clone()));
        assert!(queue.enqueue(b.clone()));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(*sender.sent.lock().unwrap(), vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn worker_survives_failures_without_retrying() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let (queue, handle) = spawn_alert_worker(sender.clone(), 8, Duration::from_secs(1));

        queue.enqueue(record());
        queue.enqueue(record());
        drop(queue);
        handle.await.unwrap();

        assert_eq!(sender.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn worker_times_out_slow_sender() {
        let (queue, handle) =
            spawn_alert_worker(Arc::new(SlowSender), 8, Duration::from_millis(20));
        queue.enqueue(record());
        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker should not wait for the slow sender")
            .unwrap();
    }

    #[tokio::test]
    async fn full_queue_rejects_without_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let queue = AlertQueue { tx };
        assert!(queue.enqueue(record()));
        assert!(!queue.enqueue(record()));
    }
}
