use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::message::model::MessageResponse;
use crate::modules::search::model::SearchHit;
use crate::modules::search::repository::SearchRepository;

#[derive(Clone)]
pub struct SearchService<S, C>
where
    S: SearchRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
{
    search_repo: Arc<S>,
    conversation_repo: Arc<C>,
}

impl<S, C> SearchService<S, C>
where
    S: SearchRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(search_repo: Arc<S>, conversation_repo: Arc<C>) -> Self {
        SearchService { search_repo, conversation_repo }
    }

    pub async fn search_in_conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<MessageResponse>, error::SystemError> {
        let (_, is_member) = self
            .conversation_repo
            .find_with_membership(&conversation_id, &user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !is_member {
            return Err(error::SystemError::forbidden(
                "You are not a participant in this conversation",
            ));
        }

        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let messages = self
            .search_repo
            .search_in_conversation(&conversation_id, query, limit)
            .await?;

        Ok(messages
            .into_iter()
            .map(|entity| MessageResponse::new(entity, Vec::new()))
            .collect())
    }

    pub async fn search_global(
        &self,
        user_id: Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<SearchHit>, error::SystemError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.search_repo.search_for_user(&user_id, query, limit).await?;

        Ok(hits
            .into_iter()
            .map(|(entity, conversation)| SearchHit {
                message: MessageResponse::new(entity, Vec::new()),
                conversation,
            })
            .collect())
    }
}
