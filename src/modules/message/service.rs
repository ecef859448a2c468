use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::mention::parser::parse_mentions;
use crate::modules::mention::service::MentionResolver;
use crate::modules::message::model::{
    FilePayload, InsertMessage, MessageResponse, PostMessage,
};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::{MessageEntity, MessageType};
use crate::modules::storage::service::ObjectStorage;

#[derive(Clone)]
pub struct MessageService<M, C>
where
    M: MessageRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
{
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    storage: Arc<dyn ObjectStorage>,
    resolver: Arc<MentionResolver>,
}

impl<M, C> MessageService<M, C>
where
    M: MessageRepository + Send + Sync + 'static,
    C: ConversationRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        storage: Arc<dyn ObjectStorage>,
        resolver: Arc<MentionResolver>,
    ) -> Self {
        MessageService { message_repo, conversation_repo, storage, resolver }
    }

    pub async fn post_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: PostMessage,
    ) -> Result<MessageResponse, error::SystemError> {
        match body.message_type {
            MessageType::Text => self.append_text(conversation_id, sender_id, body.content).await,
            MessageType::File => Err(error::SystemError::bad_request(
                "File messages must be sent through the upload endpoint",
            )),
        }
    }

    pub async fn append_text(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(error::SystemError::bad_request("Message content must not be empty"));
        }

        self.check_sender(&conversation_id, &sender_id).await?;

        let entity = self
            .message_repo
            .create(&InsertMessage {
                conversation_id,
                sender_id,
                _type: MessageType::Text,
                content: Some(content),
                file: None,
            })
            .await?;

        Ok(self.annotate(entity).await)
    }

    /// Two phases: persist the bytes, then append the message row. When
    /// the append fails the stored object stays behind unreferenced; the
    /// URL is logged so it can be reaped, and the caller sees the error.
    pub async fn upload_file(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
        text: Option<String>,
    ) -> Result<MessageResponse, error::SystemError> {
        self.check_sender(&conversation_id, &sender_id).await?;

        let stored = self.storage.store(original_name, mime_type, bytes).await?;

        let payload = FilePayload {
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: stored.size_bytes,
            url: stored.url,
        };

        let content = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

        let inserted = self
            .message_repo
            .create(&InsertMessage {
                conversation_id,
                sender_id,
                _type: MessageType::File,
                content,
                file: Some(payload.clone()),
            })
            .await;

        match inserted {
            Ok(entity) => Ok(self.annotate(entity).await),
            Err(err) => {
                log::error!("Stored object {} has no message row: {err}", payload.url);
                Err(err)
            }
        }
    }

    pub async fn edit_message(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        content: String,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(error::SystemError::bad_request("Message content must not be empty"));
        }

        let existing = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if existing.sender_id != user_id {
            return Err(error::SystemError::forbidden("Only the sender can edit a message"));
        }

        let updated = self
            .message_repo
            .update_content(&message_id, &content)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        Ok(self.annotate(updated).await)
    }

    pub async fn delete_message(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let existing = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if existing.sender_id != user_id {
            return Err(error::SystemError::forbidden("Only the sender can delete a message"));
        }

        self.message_repo.delete(&message_id).await?;

        Ok(())
    }

    async fn check_sender(
        &self,
        conversation_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        let (_, is_member) = self
            .conversation_repo
            .find_with_membership(conversation_id, sender_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !is_member {
            return Err(error::SystemError::forbidden(
                "Sender is not a participant in this conversation",
            ));
        }

        Ok(())
    }

    async fn annotate(&self, entity: MessageEntity) -> MessageResponse {
        let tokens = parse_mentions(entity.content.as_deref().unwrap_or_default());
        let mentions = self.resolver.resolve(&tokens).await;

        MessageResponse::new(entity, mentions)
    }
}
