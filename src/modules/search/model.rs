use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::conversation::schema::ConversationType;
use crate::modules::message::model::MessageResponse;
use crate::modules::message::schema::{MessageEntity, MessageType};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationContext {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub _type: ConversationType,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub message: MessageResponse,
    pub conversation: ConversationContext,
}

/// Flat row off the cross-conversation search join.
#[derive(Debug, FromRow)]
pub struct SearchHitRaw {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: MessageType,
    pub content: Option<String>,
    pub file_original_name: Option<String>,
    pub file_mime_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub file_url: Option<String>,
    pub is_edited: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub conversation_name: Option<String>,
    pub conversation_type: ConversationType,
}

impl SearchHitRaw {
    pub fn into_parts(self) -> (MessageEntity, ConversationContext) {
        let context = ConversationContext {
            id: self.conversation_id,
            name: self.conversation_name,
            _type: self.conversation_type,
        };

        let entity = MessageEntity {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            _type: self._type,
            content: self.content,
            file_original_name: self.file_original_name,
            file_mime_type: self.file_mime_type,
            file_size_bytes: self.file_size_bytes,
            file_url: self.file_url,
            is_edited: self.is_edited,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };

        (entity, context)
    }
}
