pub mod alerts;
pub mod filter;
pub mod guard;
pub mod pipeline;
pub mod sessions;

pub use alerts::{spawn_alert_worker, AlertConfig, AlertQueue, AlertSender, HttpAlertSender};
pub use filter::{ProfanityFilter, Redaction};
pub use guard::{Access, AccessGuard, DenialReason, Subject};
pub use pipeline::ModerationPipeline;
pub use sessions::{ChatSessions, Transcript};
