//! Blocklist redaction.
//!
//! Masking policy: every matched word is replaced by `#` repeated once per
//! character of the match, so stored text keeps the original length.
//! Matching is case-insensitive on word boundaries.

use expertline_common::error::{ExpertError, ExpertResult};
use regex::Regex;

pub const MASK_CHAR: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    pub violated: bool,
    /// First offending word in whitespace-token order, `None` when clean.
    pub offending_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    words: Vec<String>,
    pattern: Option<Regex>,
}

impl ProfanityFilter {
    pub fn new<I, S>(words: I) -> ExpertResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        words.sort();
        words.dedup();

        if words.is_empty() {
            return Ok(Self {
                words,
                pattern: None,
            });
        }

        // Longest alternatives first so phrases win over their prefixes.
        let mut alternatives: Vec<&String> = words.iter().collect();
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let body = alternatives
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(r"(?i)\b(?:{body})\b"))
            .map_err(|e| ExpertError::Config(format!("invalid blocklist: {e}")))?;

        Ok(Self {
            words,
            pattern: Some(pattern),
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn is_profane(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    pub fn redact(&self, text: &str) -> Redaction {
        let Some(pattern) = &self.pattern else {
            return Redaction {
                text: text.to_string(),
                violated: false,
                offending_token: None,
            };
        };

        let redacted = pattern.replace_all(text, |caps: &regex::Captures| {
            MASK_CHAR.to_string().repeat(caps[0].chars().count())
        });
        let violated = redacted != text;

        Redaction {
            offending_token: if violated {
                self.offending_token(text)
            } else {
                None
            },
            text: redacted.into_owned(),
            violated,
        }
    }

    /// Scan whitespace-separated tokens in order and report the blocklisted
    /// word inside the first token that contains one. A blocklisted phrase
    /// spanning several tokens is not seen by the scan; the first match over
    /// the whole text is reported instead.
    ///
    /// Known precision gap: the report is the matched word, not the whole
    /// token, so "idiot!" is recorded as "idiot". The first occurrence wins;
    /// no word is ranked as more severe than another.
    pub fn offending_token(&self, text: &str) -> Option<String> {
        let pattern = self.pattern.as_ref()?;
        text.split_whitespace()
            .find_map(|token| pattern.find(token))
            .or_else(|| pattern.find(text))
            .map(|m| m.as_str().to_string())
    }
}
