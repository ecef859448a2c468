use uuid::Uuid;

use crate::api::error;
use crate::modules::message::model::{InsertMessage, MessageQuery};
use crate::modules::message::schema::MessageEntity;

#[async_trait::async_trait]
pub trait MessageRepository {
    async fn create(
        &self,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError>;

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Page of messages in ascending `(created_at, id)` order, starting
    /// strictly after the query position.
    async fn find_page(
        &self,
        query: &MessageQuery,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    /// Replaces the content and flags the message as edited. `None` when
    /// the message does not exist.
    async fn update_content(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    async fn delete(&self, message_id: &Uuid) -> Result<bool, error::SystemError>;

    /// Deletes messages older than `cutoff` in one conversation. The
    /// retention policy is re-checked inside the statement so a policy
    /// cleared after the sweep scanned it deletes nothing.
    async fn delete_expired(
        &self,
        conversation_id: &Uuid,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, error::SystemError>;
}
