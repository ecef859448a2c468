use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::ParticipantRepository;
use crate::modules::conversation::schema::ParticipantEntity;
use crate::modules::message::schema::MessageEntity;

#[derive(Clone)]
pub struct ReceiptService<P>
where
    P: ParticipantRepository + Send + Sync + 'static,
{
    participant_repo: Arc<P>,
}

impl<P> ReceiptService<P>
where
    P: ParticipantRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(participant_repo: Arc<P>) -> Self {
        ReceiptService { participant_repo }
    }

    /// Advances the caller's read marker to `at`. The repository applies a
    /// max-merge, so out-of-order and concurrent calls all land on the
    /// latest timestamp.
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<ParticipantEntity, error::SystemError> {
        let participant = self
            .participant_repo
            .mark_read(&conversation_id, &user_id, at)
            .await?
            .ok_or_else(|| {
                error::SystemError::not_found("Participant not found in this conversation")
            })?;

        Ok(participant)
    }
}

/// A message counts as read once some participant other than its sender
/// has a marker at or past the message's creation time. With nobody but
/// the sender in the list there is no one to have read it.
pub fn is_read(message: &MessageEntity, participants: &[ParticipantEntity]) -> bool {
    participants
        .iter()
        .filter(|p| p.user_id != message.sender_id)
        .any(|p| p.last_read_at.is_some_and(|read_at| read_at >= message.created_at))
}
