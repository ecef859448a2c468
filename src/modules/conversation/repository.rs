use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::model::{ConversationSummary, RetentionCandidate};
use crate::modules::conversation::schema::{ConversationEntity, ParticipantEntity};

/// Storage-agnostic repositories so services can be exercised against
/// in-memory implementations. Operations that must be atomic (direct
/// conversation dedupe, read-marker advancement) are single methods and
/// each backend keeps them atomic its own way.
#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Fetches the conversation together with whether `user_id` belongs to
    /// it, so callers can distinguish NotFound from Forbidden in one trip.
    async fn find_with_membership(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<(ConversationEntity, bool)>, error::SystemError>;

    /// Creates the 1:1 conversation for the pair, or returns the existing
    /// one. Concurrent calls for the same pair converge on a single row.
    async fn create_or_get_direct(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError>;

    async fn create_group(
        &self,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<ConversationEntity, error::SystemError>;

    async fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationSummary>, error::SystemError>;

    async fn set_retention(
        &self,
        conversation_id: &Uuid,
        days: Option<i32>,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    async fn find_retention_candidates(
        &self,
    ) -> Result<Vec<RetentionCandidate>, error::SystemError>;
}

#[async_trait::async_trait]
pub trait ParticipantRepository {
    async fn find_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError>;

    /// Advances the read marker to `at`, never backwards. Returns the
    /// updated row, or `None` when the user is not a participant.
    async fn mark_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<ParticipantEntity>, error::SystemError>;
}
