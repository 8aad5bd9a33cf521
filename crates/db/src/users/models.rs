use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical form of an expertise term or topic: trimmed and lower-cased.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Canonical form of an identity reference (an email address).
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Normalize, drop blanks and deduplicate while keeping first-seen order.
pub fn normalize_expertise(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = normalize_term(term);
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub expertise: Vec<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewUser {
    /// Apply canonical forms to the email and expertise list.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_identity(&self.email),
            expertise: normalize_expertise(&self.expertise),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub is_admin: Option<bool>,
}

impl UserUpdate {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.map(|e| normalize_identity(&e)),
            expertise: self.expertise.map(|e| normalize_expertise(&e)),
            is_admin: self.is_admin,
        }
    }

    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(expertise) = self.expertise {
            user.expertise = expertise;
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
    }
}
