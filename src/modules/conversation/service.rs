use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    constants::AUTO_DELETE_DAYS,
    modules::{
        conversation::{
            model::{ConversationDetail, ConversationSummary, NewConversation},
            repository::{ConversationRepository, ParticipantRepository},
            schema::{ConversationEntity, ParticipantEntity},
        },
        mention::{model::MentionToken, parser::parse_mentions, service::MentionResolver},
        message::{
            model::{decode_cursor, encode_cursor, MessagePage, MessageQuery, MessageResponse},
            repository::MessageRepository,
        },
        receipt::service::is_read,
    },
};

#[derive(Clone)]
pub struct ConversationService<R, P, L>
where
    R: ConversationRepository + Send + Sync + 'static,
    P: ParticipantRepository + Send + Sync + 'static,
    L: MessageRepository + Send + Sync + 'static,
{
    conversation_repo: Arc<R>,
    participant_repo: Arc<P>,
    message_repo: Arc<L>,
    resolver: Arc<MentionResolver>,
}

impl<R, P, L> ConversationService<R, P, L>
where
    R: ConversationRepository + Send + Sync + 'static,
    P: ParticipantRepository + Send + Sync + 'static,
    L: MessageRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        conversation_repo: Arc<R>,
        participant_repo: Arc<P>,
        message_repo: Arc<L>,
        resolver: Arc<MentionResolver>,
    ) -> Self {
        ConversationService { conversation_repo, participant_repo, message_repo, resolver }
    }

    pub async fn create_conversation(
        &self,
        body: NewConversation,
        user_id: Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        if body.is_group {
            let name = body.name.as_deref().map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(error::SystemError::bad_request(
                    "A group conversation requires a name",
                ));
            }

            let mut members = body.participant_ids;
            members.push(user_id);
            members.sort();
            members.dedup();

            return self.conversation_repo.create_group(name, &members).await;
        }

        let other = *body.participant_ids.first().ok_or_else(|| {
            error::SystemError::bad_request(
                "At least one member is required to create a conversation",
            )
        })?;

        if body.participant_ids.len() > 1 {
            return Err(error::SystemError::bad_request(
                "A direct conversation has exactly two participants",
            ));
        }

        if other == user_id {
            return Err(error::SystemError::bad_request(
                "Cannot start a direct conversation with yourself",
            ));
        }

        self.conversation_repo.create_or_get_direct(&user_id, &other).await
    }

    pub async fn get_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, error::SystemError> {
        self.conversation_repo.list_for_user(&user_id).await
    }

    pub async fn get_detail(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<ConversationDetail, error::SystemError> {
        let conversation = self.check_member(&conversation_id, &user_id).await?;

        let participants =
            self.participant_repo.find_by_conversation(&conversation_id).await?;

        let (messages, cursor) =
            self.page_messages(conversation_id, limit, cursor, &participants).await?;

        Ok(ConversationDetail {
            id: conversation.id,
            _type: conversation._type,
            name: conversation.name,
            auto_delete_days: conversation.auto_delete_days,
            participants,
            messages,
            cursor,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    pub async fn get_messages(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        limit: i32,
        cursor: Option<String>,
    ) -> Result<MessagePage, error::SystemError> {
        self.check_member(&conversation_id, &user_id).await?;

        let participants =
            self.participant_repo.find_by_conversation(&conversation_id).await?;

        let (messages, cursor) =
            self.page_messages(conversation_id, limit, cursor, &participants).await?;

        Ok(MessagePage { messages, cursor })
    }

    pub async fn update_retention(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        days: Option<i32>,
    ) -> Result<ConversationEntity, error::SystemError> {
        if let Some(days) = days {
            if !AUTO_DELETE_DAYS.contains(&days) {
                return Err(error::SystemError::bad_request(
                    "auto_delete_days must be one of 3, 7, 14, 30 or 90",
                ));
            }
        }

        self.check_member(&conversation_id, &user_id).await?;

        let updated = self
            .conversation_repo
            .set_retention(&conversation_id, days)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        Ok(updated)
    }

    async fn check_member(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let (conversation, is_member) = self
            .conversation_repo
            .find_with_membership(conversation_id, user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !is_member {
            return Err(error::SystemError::forbidden(
                "You are not a participant in this conversation",
            ));
        }

        Ok(conversation)
    }

    /// Ascending keyset page with mention annotations and read flags. The
    /// extra row tells us whether a further page exists; the cursor points
    /// at the last row actually returned.
    async fn page_messages(
        &self,
        conversation_id: Uuid,
        limit: i32,
        cursor: Option<String>,
        participants: &[ParticipantEntity],
    ) -> Result<(Vec<MessageResponse>, Option<String>), error::SystemError> {
        let after = match cursor {
            Some(cursor) => Some(decode_cursor(&cursor)?),
            None => None,
        };

        let mut entities = self
            .message_repo
            .find_page(&MessageQuery { conversation_id, after }, limit as i64 + 1)
            .await?;

        let has_more = entities.len() > limit as usize;
        if has_more {
            entities.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            entities.last().map(|m| encode_cursor(&m.created_at, &m.id))
        } else {
            None
        };

        let token_sets: Vec<Vec<MentionToken>> = entities
            .iter()
            .map(|m| parse_mentions(m.content.as_deref().unwrap_or_default()))
            .collect();
        let mention_sets = self.resolver.resolve_batch(&token_sets).await;

        let messages = entities
            .into_iter()
            .zip(mention_sets)
            .map(|(entity, mentions)| {
                let read = is_read(&entity, participants);
                let mut message = MessageResponse::new(entity, mentions);
                message.is_read = read;
                message
            })
            .collect();

        Ok((messages, next_cursor))
    }
}
