use std::sync::Arc;

use chrono::Utc;
use expertline_common::error::{ExpertError, ExpertResult};
use expertline_db::questions::models::Question;
use expertline_db::questions::repositories::QuestionRepository;
use expertline_db::users::models::{normalize_identity, normalize_term};
use expertline_db::users::repositories::ExpertDirectory;
use uuid::Uuid;

use crate::similarity::SimilarityResolver;
use crate::trace::AssignmentTrace;

#[derive(Debug, Clone)]
pub struct AssignRequest {
    pub topic: String,
    pub body: String,
    pub asked_by: String,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub question: Question,
    pub trace: AssignmentTrace,
}

/// Picks an expert for a new question and opens its chat session.
///
/// Tie-break: the directory's registration order; the first expert whose
/// expertise intersects the candidate set wins.
#[derive(Clone)]
pub struct AssignmentEngine {
    resolver: Arc<dyn SimilarityResolver>,
    directory: Arc<dyn ExpertDirectory>,
    questions: Arc<dyn QuestionRepository>,
}

impl AssignmentEngine {
    pub fn new(
        resolver: Arc<dyn SimilarityResolver>,
        directory: Arc<dyn ExpertDirectory>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            resolver,
            directory,
            questions,
        }
    }

    pub async fn assign(&self, request: AssignRequest) -> ExpertResult<Assignment> {
        let topic = normalize_term(&request.topic);
        if topic.is_empty() {
            return Err(ExpertError::Validation("topic must not be empty".to_string()));
        }
        if request.body.trim().is_empty() {
            return Err(ExpertError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        let asked_by = normalize_identity(&request.asked_by);
        if asked_by.is_empty() {
            return Err(ExpertError::Validation(
                "asked_by must not be empty".to_string(),
            ));
        }

        let mut related = self.resolver.resolve(&topic).await;
        related.remove(&topic);
        let related_terms = related.len();
        related.insert(topic.clone());
        let candidates: Vec<String> = related.into_iter().collect();

        let expert = self.directory.find_expert(&candidates).await?;
        let matched_term = expert.as_ref().and_then(|e| {
            e.expertise
                .iter()
                .find(|term| candidates.contains(term))
                .cloned()
        });

        let question = Question {
            id: Uuid::new_v4(),
            topic: request.topic.trim().to_string(),
            body: request.body.trim().to_string(),
            asked_by,
            assigned_to: expert.map(|e| e.email),
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let trace = AssignmentTrace {
            topic,
            candidates,
            related_terms,
            matched_term,
            expert: question.assigned_to.clone(),
        };

        let question = self.persist(question).await?;

        match &question.assigned_to {
            Some(expert) => tracing::info!(
                session_id = %question.session_id,
                %expert,
                matched = ?trace.matched_term,
                "question assigned"
            ),
            None => tracing::info!(
                session_id = %question.session_id,
                candidates = trace.candidates.len(),
                "no expert matched, question left unassigned"
            ),
        }

        Ok(Assignment { question, trace })
    }

    /// Write the question and its session. On a retryable failure the first
    /// write may still have landed, so check for it before trying once more.
    async fn persist(&self, question: Question) -> ExpertResult<Question> {
        match self.questions.create_with_session(question.clone()).await {
            Ok(saved) => Ok(saved),
            Err(e) if e.is_retryable() => {
                tracing::warn!(session_id = %question.session_id, error = %e, "retrying question write");
                if let Some(existing) = self.questions.get_by_session(question.session_id).await? {
                    if existing.id == question.id {
                        return Ok(existing);
                    }
                    let fresh = Question {
                        id: Uuid::new_v4(),
                        session_id: Uuid::new_v4(),
                        ..question
                    };
                    return self.questions.create_with_session(fresh).await;
                }
                self.questions.create_with_session(question).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use expertline_db::memory::MemoryStore;
    use expertline_db::questions::models::QuestionFilter;
    use expertline_db::chat::repositories::ChatRepository;
    use expertline_db::users::models::NewUser;
    use expertline_db::users::repositories::UserRepository;
    use std::collections::{BTreeSet, HashMap};

    struct StaticResolver {
        related: HashMap<String, Vec<String>>,
    }

    impl StaticResolver {
        fn empty() -> Self {
            Self {
                related: HashMap::new(),
            }
        }

        fn with(topic: &str, terms: &[&str]) -> Self {
            let mut related = HashMap::new();
            related.insert(
                topic.to_string(),
                terms.iter().map(|s| s.to_string()).collect(),
            );
            Self { related }
        }
    }

    #[async_trait]
    impl SimilarityResolver for StaticResolver {
        async fn resolve(&self, topic: &str) -> BTreeSet<String> {
            self.related
                .get(topic)
                .map(|terms| terms.iter().cloned().collect())
                .unwrap_or_default()
        }
    }

    fn engine(store: &MemoryStore, resolver: StaticResolver) -> AssignmentEngine {
        AssignmentEngine::new(
            Arc::new(resolver),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    async fn register(store: &MemoryStore, email: &str, expertise: &[&str]) {
        UserRepository::create(
            store,
            NewUser {
                name: email.to_string(),
                email: email.to_string(),
                expertise: expertise.iter().map(|s| s.to_string()).collect(),
                is_admin: false,
            },
        )
        .await
        .expect("register");
    }

    fn request(topic: &str) -> AssignRequest {
        AssignRequest {
            topic: topic.to_string(),
            body: "How does this work?".to_string(),
            asked_by: "Asker@Example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn related_term_reaches_expert() {
        let store = MemoryStore::new();
        register(&store, "geo@example.com", &["volcanology"]).await;
        let engine = engine(&store, StaticResolver::with("volcanoes", &["volcanology", "lava"]));

        let assignment = engine.assign(request("Volcanoes")).await.expect("assign");
        assert_eq!(
            assignment.question.assigned_to.as_deref(),
            Some("geo@example.com")
        );
        assert_eq!(assignment.trace.matched_term.as_deref(), Some("volcanology"));
        assert_eq!(assignment.trace.related_terms, 2);
        assert_eq!(assignment.question.asked_by, "asker@example.com");
    }

    #[tokio::test]
    async fn exact_topic_matches_without_related_terms() {
        let store = MemoryStore::new();
        register(&store, "rustacean@example.com", &["Rust"]).await;
        let engine = engine(&store, StaticResolver::empty());

        let assignment = engine.assign(request("rust")).await.expect("assign");
        assert_eq!(
            assignment.question.assigned_to.as_deref(),
            Some("rustacean@example.com")
        );
        assert_eq!(assignment.trace.candidates, vec!["rust"]);
    }

    #[tokio::test]
    async fn no_match_leaves_question_unassigned_with_open_session() {
        let store = MemoryStore::new();
        register(&store, "chef@example.com", &["cooking"]).await;
        let engine = engine(&store, StaticResolver::empty());

        let assignment = engine.assign(request("astrophysics")).await.expect("assign");
        assert!(assignment.question.assigned_to.is_none());

        let session = store
            .get_session(assignment.question.session_id)
            .await
            .expect("get")
            .expect("session created");
        assert!(!session.ended);
    }

    #[tokio::test]
    async fn ties_go_to_earliest_registration() {
        let store = MemoryStore::new();
        register(&store, "first@example.com", &["chess"]).await;
        register(&store, "second@example.com", &["chess"]).await;
        let engine = engine(&store, StaticResolver::empty());

        for _ in 0..3 {
            let assignment = engine.assign(request("chess")).await.expect("assign");
            assert_eq!(
                assignment.question.assigned_to.as_deref(),
                Some("first@example.com")
            );
        }
    }

    #[tokio::test]
    async fn every_question_gets_a_fresh_session() {
        let store = MemoryStore::new();
        let engine = engine(&store, StaticResolver::empty());

        let a = engine.assign(request("knots")).await.expect("assign");
        let b = engine.assign(request("knots")).await.expect("assign");
        assert_ne!(a.question.session_id, b.question.session_id);

        let all = QuestionRepository::list(&store, QuestionFilter::default())
            .await
            .expect("list");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn empty_topic_is_invalid() {
        let store = MemoryStore::new();
        let engine = engine(&store, StaticResolver::empty());
        let result = engine.assign(request("   ")).await;
        assert!(matches!(result, Err(ExpertError::Validation(msg)) if msg.contains("topic")));
    }

    #[tokio::test]
    async fn empty_asker_is_invalid() {
        let store = MemoryStore::new();
        let engine = engine(&store, StaticResolver::empty());
        let mut req = request("rust");
        req.asked_by = " ".to_string();
        assert!(matches!(
            engine.assign(req).await,
            Err(ExpertError::Validation(_))
        ));
    }
}
