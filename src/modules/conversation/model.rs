use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::conversation::schema::{ConversationType, ParticipantEntity};
use crate::modules::message::model::MessageResponse;
use crate::modules::message::schema::MessageType;
use crate::utils::double_option;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewConversation {
    #[validate(length(min = 1, message = "At least one member is required"))]
    pub participant_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_group: bool,
    pub name: Option<String>,
}

/// PATCH body for the retention policy. The field must be present; an
/// explicit null disables auto-deletion.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRetention {
    #[serde(default, deserialize_with = "double_option")]
    pub auto_delete_days: Option<Option<i32>>,
}

/// Flat row produced by the conversation list query.
#[derive(Debug, FromRow)]
pub struct ConversationSummaryRaw {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: ConversationType,
    pub name: Option<String>,
    pub auto_delete_days: Option<i32>,
    pub other_user_id: Option<Uuid>,
    pub last_message_id: Option<Uuid>,
    pub last_sender_id: Option<Uuid>,
    pub last_content: Option<String>,
    pub last_type: Option<MessageType>,
    pub last_created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessageRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    #[serde(rename = "type")]
    pub _type: MessageType,
    pub content: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub _type: ConversationType,
    pub name: Option<String>,
    pub auto_delete_days: Option<i32>,
    pub other_user_id: Option<Uuid>,
    pub last_message: Option<LastMessageRow>,
    pub last_message_time: Option<chrono::DateTime<chrono::Utc>>,
    pub unread_count: i64,
}

impl From<ConversationSummaryRaw> for ConversationSummary {
    fn from(raw: ConversationSummaryRaw) -> Self {
        let last_message = match (raw.last_message_id, raw.last_sender_id, raw.last_type) {
            (Some(id), Some(sender_id), Some(_type)) => Some(LastMessageRow {
                id,
                sender_id,
                _type,
                content: raw.last_content,
                created_at: raw.last_created_at.unwrap_or_default(),
            }),
            _ => None,
        };

        ConversationSummary {
            id: raw.id,
            _type: raw._type,
            name: raw.name,
            auto_delete_days: raw.auto_delete_days,
            other_user_id: raw.other_user_id,
            last_message_time: raw.last_created_at,
            last_message,
            unread_count: raw.unread_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub _type: ConversationType,
    pub name: Option<String>,
    pub auto_delete_days: Option<i32>,
    pub participants: Vec<ParticipantEntity>,
    pub messages: Vec<MessageResponse>,
    pub cursor: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Conversation with an active auto-delete policy, as seen by the
/// retention sweeper.
#[derive(Debug, Clone, FromRow)]
pub struct RetentionCandidate {
    pub id: Uuid,
    pub auto_delete_days: i32,
}
