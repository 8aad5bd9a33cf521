use serde::{Deserialize, Serialize};

/// How an assignment was reached, for logs and API responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentTrace {
    pub topic: String,
    /// Normalized topic plus related terms, sorted.
    pub candidates: Vec<String>,
    pub related_terms: usize,
    pub matched_term: Option<String>,
    pub expert: Option<String>,
}
