use std::fmt;
use std::sync::Arc;

use expertline_common::error::{ExpertError, ExpertResult, ForbiddenReason};
use expertline_db::bans::models::BanKind;
use expertline_db::bans::repositories::BanRepository;

/// Who is making a request: the claimed identity and/or the client address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subject<'a> {
    pub identity: Option<&'a str>,
    pub address: Option<&'a str>,
}

impl<'a> Subject<'a> {
    pub fn new(identity: Option<&'a str>, address: Option<&'a str>) -> Self {
        Self { identity, address }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    BannedIdentity(String),
    BannedAddress(String),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BannedIdentity(id) => write!(f, "identity {id} is banned"),
            Self::BannedAddress(addr) => write!(f, "address {addr} is banned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied(DenialReason),
}

/// Refuses requests from banned identities or addresses before they reach
/// any mutating operation. Read-only; bans are managed elsewhere.
#[derive(Clone)]
pub struct AccessGuard {
    bans: Arc<dyn BanRepository>,
}

impl AccessGuard {
    pub fn new(bans: Arc<dyn BanRepository>) -> Self {
        Self { bans }
    }

    pub async fn check(&self, subject: Subject<'_>) -> ExpertResult<Access> {
        if let Some(address) = subject.address.filter(|a| !a.trim().is_empty()) {
            if self.bans.is_banned(BanKind::Address, address).await? {
                return Ok(Access::Denied(DenialReason::BannedAddress(
                    BanKind::Address.normalize(address),
                )));
            }
        }
        if let Some(identity) = subject.identity.filter(|i| !i.trim().is_empty()) {
            if self.bans.is_banned(BanKind::Identity, identity).await? {
                return Ok(Access::Denied(DenialReason::BannedIdentity(
                    BanKind::Identity.normalize(identity),
                )));
            }
        }
        Ok(Access::Allowed)
    }

    /// `check`, turning a denial into `Forbidden(Banned)`.
    pub async fn enforce(&self, subject: Subject<'_>) -> ExpertResult<()> {
        match self.check(subject).await? {
            Access::Allowed => Ok(()),
            Access::Denied(reason) => {
                tracing::warn!(%reason, "request denied by access guard");
                Err(ExpertError::Forbidden(ForbiddenReason::Banned))
            }
        }
    }
}
