use std::collections::HashMap;
use std::sync::Arc;

use crate::modules::directory::client::DirectoryClient;
use crate::modules::directory::model::DirectoryEntry;

use super::model::{MentionAnnotation, MentionKind, MentionToken};

/// Turns parsed tokens into annotations by asking the directory for
/// candidates. A failing or empty lookup degrades to an unresolved
/// annotation; message reads never fail because the directory is down.
pub struct MentionResolver {
    directory: Arc<dyn DirectoryClient>,
}

impl MentionResolver {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, tokens: &[MentionToken]) -> Vec<MentionAnnotation> {
        let sets = vec![tokens.to_vec()];
        self.resolve_batch(&sets).await.pop().unwrap_or_default()
    }

    /// Resolves several token sets in one pass. Lookups are cached across
    /// the batch so a page of messages mentioning the same user hits the
    /// directory once.
    pub async fn resolve_batch(
        &self,
        token_sets: &[Vec<MentionToken>],
    ) -> Vec<Vec<MentionAnnotation>> {
        let mut cache: HashMap<(MentionKind, String), Option<DirectoryEntry>> = HashMap::new();
        let mut resolved = Vec::with_capacity(token_sets.len());

        for tokens in token_sets {
            let mut annotations = Vec::with_capacity(tokens.len());

            for token in tokens {
                let key = (token.kind, token.text.clone());

                let entity = match cache.get(&key) {
                    Some(cached) => cached.clone(),
                    None => {
                        let looked_up = self.resolve_token(token).await;
                        cache.insert(key, looked_up.clone());
                        looked_up
                    }
                };

                annotations.push(MentionAnnotation {
                    kind: token.kind,
                    raw: token.raw.clone(),
                    entity,
                });
            }

            resolved.push(annotations);
        }

        resolved
    }

    async fn resolve_token(&self, token: &MentionToken) -> Option<DirectoryEntry> {
        let candidates = match self.directory.resolve(&token.text).await {
            Ok(candidates) => candidates,
            Err(err) => {
                log::warn!("Mention lookup for {:?} degraded: {err}", token.raw);
                return None;
            }
        };

        if candidates.is_empty() {
            return None;
        }

        let exact = match token.kind {
            MentionKind::Nickname => candidates
                .iter()
                .find(|c| c.nickname.to_lowercase() == token.text.to_lowercase()),
            MentionKind::CustomId => candidates
                .iter()
                .find(|c| c.custom_id.as_deref() == Some(token.text.as_str())),
        };

        Some(exact.unwrap_or(&candidates[0]).clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::api::error::SystemError;
    use crate::modules::mention::parser::parse_mentions;

    use super::*;

    struct StubDirectory {
        entries: Vec<DirectoryEntry>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubDirectory {
        fn with_entries(entries: Vec<DirectoryEntry>) -> Self {
            Self {
                entries,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                entries: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DirectoryClient for StubDirectory {
        async fn resolve(&self, _query: &str) -> Result<Vec<DirectoryEntry>, SystemError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SystemError::upstream("directory unavailable"));
            }
            Ok(self.entries.clone())
        }
    }

    fn entry(nickname: &str, custom_id: Option<&str>) -> DirectoryEntry {
        DirectoryEntry {
            id: Uuid::now_v7(),
            nickname: nickname.to_string(),
            custom_id: custom_id.map(|s| s.to_string()),
            full_name: format!("{nickname} Example"),
        }
    }

    #[actix_web::test]
    async fn exact_nickname_match_beats_first_candidate() {
        let john = entry("John", None);
        let directory = StubDirectory::with_entries(vec![entry("johnny", None), john.clone()]);
        let resolver = MentionResolver::new(Arc::new(directory));

        let tokens = parse_mentions("hi @john");
        let annotations = resolver.resolve(&tokens).await;

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].entity.as_ref().unwrap().id, john.id);
    }

    #[actix_web::test]
    async fn falls_back_to_first_candidate_without_exact_match() {
        let first = entry("johnny", None);
        let directory = StubDirectory::with_entries(vec![first.clone(), entry("johnson", None)]);
        let resolver = MentionResolver::new(Arc::new(directory));

        let annotations = resolver.resolve(&parse_mentions("hi @jo")).await;

        assert_eq!(annotations[0].entity.as_ref().unwrap().id, first.id);
    }

    #[actix_web::test]
    async fn custom_id_requires_exact_identifier() {
        let target = entry("ana", Some("42-1"));
        let directory = StubDirectory::with_entries(vec![entry("bob", Some("42")), target.clone()]);
        let resolver = MentionResolver::new(Arc::new(directory));

        let annotations = resolver.resolve(&parse_mentions("see #42-1")).await;

        assert_eq!(annotations[0].entity.as_ref().unwrap().id, target.id);
    }

    #[actix_web::test]
    async fn no_candidates_leaves_token_unresolved() {
        let resolver = MentionResolver::new(Arc::new(StubDirectory::with_entries(Vec::new())));

        let annotations = resolver.resolve(&parse_mentions("hi @ghost")).await;

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].raw, "@ghost");
        assert!(annotations[0].entity.is_none());
    }

    #[actix_web::test]
    async fn directory_failure_degrades_instead_of_erroring() {
        let resolver = MentionResolver::new(Arc::new(StubDirectory::failing()));

        let annotations = resolver.resolve(&parse_mentions("hi @john and #42-1")).await;

        assert_eq!(annotations.len(), 2);
        assert!(annotations.iter().all(|a| a.entity.is_none()));
    }

    #[actix_web::test]
    async fn batch_resolution_caches_repeated_tokens() {
        let directory = Arc::new(StubDirectory::with_entries(vec![entry("ana", None)]));
        let resolver = MentionResolver::new(directory.clone());

        let sets = vec![
            parse_mentions("ping @ana"),
            parse_mentions("@ana are you there"),
            parse_mentions("@ana !"),
        ];
        let resolved = resolver.resolve_batch(&sets).await;

        assert_eq!(resolved.len(), 3);
        assert!(resolved
            .iter()
            .all(|set| set[0].entity.is_some()));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }
}
