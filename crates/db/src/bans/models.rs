use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::models::normalize_identity;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BanKind {
    Identity,
    Address,
}

impl BanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Address => "address",
        }
    }

    /// Canonical stored form of a ban value. Identities compare
    /// case-insensitively; addresses compare verbatim after trimming.
    pub fn normalize(&self, value: &str) -> String {
        match self {
            Self::Identity => normalize_identity(value),
            Self::Address => value.trim().to_string(),
        }
    }
}

impl FromStr for BanKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "identity" => Ok(Self::Identity),
            "address" => Ok(Self::Address),
            _ => Err(format!("unknown ban kind: {value}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ban {
    pub id: Uuid,
    pub kind: BanKind,
    pub value: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
