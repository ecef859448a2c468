use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "message_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    File,
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}

/// Flat storage row. File metadata columns are populated only for file
/// messages; `content` doubles as the optional caption there.
#[derive(Debug, Clone, FromRow)]
pub struct MessageEntity {
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
}
