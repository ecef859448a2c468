use uuid::Uuid;

use crate::api::error;
use crate::modules::message::schema::MessageEntity;
use crate::modules::search::model::ConversationContext;

/// Substring search over message content. Implementations receive the
/// user's raw query and are responsible for their own escaping.
#[async_trait::async_trait]
pub trait SearchRepository {
    /// Case-insensitive matches inside one conversation, newest first.
    async fn search_in_conversation(
        &self,
        conversation_id: &Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    /// Matches across every conversation the user belongs to, newest
    /// first, each with its conversation context.
    async fn search_for_user(
        &self,
        user_id: &Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<(MessageEntity, ConversationContext)>, error::SystemError>;
}
