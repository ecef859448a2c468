use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error;
use crate::modules::mention::model::MentionAnnotation;
use crate::modules::message::schema::{MessageEntity, MessageType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePayload {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub url: String,
}

/// What a message carries besides its caption text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessagePayload {
    Text,
    File(FilePayload),
}

impl MessagePayload {
    pub fn from_entity(entity: &MessageEntity) -> Self {
        match entity._type {
            MessageType::Text => MessagePayload::Text,
            MessageType::File => match (
                &entity.file_original_name,
                &entity.file_mime_type,
                entity.file_size_bytes,
                &entity.file_url,
            ) {
                (Some(original_name), Some(mime_type), Some(size_bytes), Some(url)) => {
                    MessagePayload::File(FilePayload {
                        original_name: original_name.clone(),
                        mime_type: mime_type.clone(),
                        size_bytes,
                        url: url.clone(),
                    })
                }
                _ => {
                    log::warn!("File message {} is missing payload columns", entity.id);
                    MessagePayload::Text
                }
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub _type: MessageType,
    pub content: Option<String>,
    pub file: Option<FilePayload>,
}

/// Keyset position for history reads; `after` is exclusive.
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub conversation_id: Uuid,
    pub after: Option<(chrono::DateTime<chrono::Utc>, Uuid)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    #[serde(rename = "type")]
    pub _type: MessageType,
    pub content: Option<String>,
    pub payload: MessagePayload,
    pub mentions: Vec<MentionAnnotation>,
    /// False on write responses; history and detail reads recompute it
    /// against the participant markers.
    pub is_read: bool,
    pub is_edited: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MessageResponse {
    pub fn new(entity: MessageEntity, mentions: Vec<MentionAnnotation>) -> Self {
        let payload = MessagePayload::from_entity(&entity);

        MessageResponse {
            id: entity.id,
            conversation_id: entity.conversation_id,
            sender_id: entity.sender_id,
            _type: entity._type,
            content: entity.content,
            payload,
            mentions,
            is_read: false,
            is_edited: entity.is_edited,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostMessage {
    #[validate(length(min = 1, message = "Message content must not be empty"))]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditMessage {
    #[validate(length(min = 1, message = "Message content must not be empty"))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HistoryQuery {
    pub cursor: Option<String>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i32>,
}

/// Cursors are `created_at/id` so pages stay stable when two messages
/// share a timestamp. Microsecond precision matches what the database
/// stores; anything coarser would skip or repeat rows at page edges.
pub fn encode_cursor(created_at: &chrono::DateTime<chrono::Utc>, id: &Uuid) -> String {
    format!("{}/{}", created_at.to_rfc3339_opts(SecondsFormat::Micros, true), id)
}

pub fn decode_cursor(
    cursor: &str,
) -> Result<(chrono::DateTime<chrono::Utc>, Uuid), error::SystemError> {
    let (ts, id) = cursor
        .split_once('/')
        .ok_or_else(|| error::SystemError::bad_request("Invalid cursor format"))?;

    let created_at = chrono::DateTime::parse_from_rfc3339(ts)
        .map_err(|_| error::SystemError::bad_request("Invalid cursor format"))?
        .with_timezone(&chrono::Utc);

    let id = Uuid::parse_str(id)
        .map_err(|_| error::SystemError::bad_request("Invalid cursor format"))?;

    Ok((created_at, id))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn text_entity() -> MessageEntity {
        MessageEntity {
            id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            _type: MessageType::Text,
            content: Some("hello".to_string()),
            file_original_name: None,
            file_mime_type: None,
            file_size_bytes: None,
            file_url: None,
            is_edited: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cursor_round_trips_at_microsecond_precision() {
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-05-02T10:30:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = Uuid::now_v7();

        let cursor = encode_cursor(&created_at, &id);
        let (decoded_at, decoded_id) = decode_cursor(&cursor).unwrap();

        assert_eq!(decoded_at, created_at);
        assert_eq!(decoded_id, id);
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        for cursor in ["", "garbage", "2024-05-02T10:30:00Z", "not-a-date/also-not-a-uuid"] {
            assert!(
                matches!(decode_cursor(cursor), Err(error::SystemError::BadRequest(_))),
                "cursor {cursor:?} should be rejected"
            );
        }
    }

    #[test]
    fn text_entity_maps_to_text_payload() {
        let response = MessageResponse::new(text_entity(), Vec::new());

        assert_eq!(response.payload, MessagePayload::Text);
        assert_eq!(response.content.as_deref(), Some("hello"));
    }

    #[test]
    fn file_entity_maps_to_file_payload() {
        let mut entity = text_entity();
        entity._type = MessageType::File;
        entity.content = Some("caption".to_string());
        entity.file_original_name = Some("report.pdf".to_string());
        entity.file_mime_type = Some("application/pdf".to_string());
        entity.file_size_bytes = Some(2048);
        entity.file_url = Some("/uploads/abc.pdf".to_string());

        let response = MessageResponse::new(entity, Vec::new());

        match response.payload {
            MessagePayload::File(file) => {
                assert_eq!(file.original_name, "report.pdf");
                assert_eq!(file.mime_type, "application/pdf");
                assert_eq!(file.size_bytes, 2048);
                assert_eq!(file.url, "/uploads/abc.pdf");
            }
            other => panic!("expected file payload, got {other:?}"),
        }
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let text = serde_json::to_value(MessagePayload::Text).unwrap();
        assert_eq!(text["kind"], "text");

        let file = serde_json::to_value(MessagePayload::File(FilePayload {
            original_name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 10,
            url: "/uploads/a.png".to_string(),
        }))
        .unwrap();
        assert_eq!(file["kind"], "file");
        assert_eq!(file["url"], "/uploads/a.png");
    }
}
