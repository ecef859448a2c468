use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::model::{
    ConversationSummary, ConversationSummaryRaw, RetentionCandidate,
};
use crate::modules::conversation::repository::{ConversationRepository, ParticipantRepository};
use crate::modules::conversation::schema::{ConversationEntity, ParticipantEntity};

/// Canonical key for a 1:1 pair. Both orderings of the same two users
/// produce the same key, which the unique index turns into dedupe.
pub(crate) fn direct_key(user_a: &Uuid, user_b: &Uuid) -> String {
    let (lo, hi) = if user_a <= user_b { (user_a, user_b) } else { (user_b, user_a) };
    format!("{lo}:{hi}")
}

#[derive(Clone)]
pub struct ConversationPgRepository {
    pool: sqlx::PgPool,
}

impl ConversationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationPgRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn find_with_membership(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<(ConversationEntity, bool)>, error::SystemError> {
        let row = sqlx::query(
            r#"
            SELECT c.*,
                EXISTS(
                SELECT 1
                FROM participants p
                WHERE p.conversation_id = c.id
                AND p.user_id = $2
                ) AS is_member
            FROM conversations c
            WHERE c.id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let is_member: bool = row.get("is_member");
                let conversation = ConversationEntity::from_row(&row)?;
                Ok(Some((conversation, is_member)))
            }
            None => Ok(None),
        }
    }

    async fn create_or_get_direct(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let key = direct_key(user_a, user_b);
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, direct_key)
            VALUES ($1, 'direct', $2)
            ON CONFLICT (direct_key) WHERE direct_key IS NOT NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&key)
        .fetch_optional(tx.as_mut())
        .await?;

        let conversation = match inserted {
            Some(conversation) => {
                sqlx::query(
                    r#"
                    INSERT INTO participants (conversation_id, user_id)
                    SELECT $1, unnest($2::uuid[])
                    "#,
                )
                .bind(conversation.id)
                .bind(vec![*user_a, *user_b])
                .execute(tx.as_mut())
                .await?;

                conversation
            }
            // Lost the race; the winner's row is committed by the time
            // ON CONFLICT resolves.
            None => sqlx::query_as::<_, ConversationEntity>(
                "SELECT * FROM conversations WHERE direct_key = $1",
            )
            .bind(&key)
            .fetch_one(tx.as_mut())
            .await?,
        };

        tx.commit().await?;

        Ok(conversation)
    }

    async fn create_group(
        &self,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, name)
            VALUES ($1, 'group', $2)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .fetch_one(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO participants (conversation_id, user_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(conversation.id)
        .bind(member_ids)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(conversation)
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationSummary>, error::SystemError> {
        let rows = sqlx::query_as::<_, ConversationSummaryRaw>(
            r#"
            SELECT
                c.id,
                c.type,
                c.name,
                c.auto_delete_days,

                CASE WHEN c.type = 'direct' THEN (
                    SELECT p2.user_id
                    FROM participants p2
                    WHERE p2.conversation_id = c.id
                    AND p2.user_id <> $1
                    LIMIT 1
                ) END           AS other_user_id,

                lm.id           AS last_message_id,
                lm.sender_id    AS last_sender_id,
                lm.content      AS last_content,
                lm.type         AS last_type,
                lm.created_at   AS last_created_at,

                (
                    SELECT COUNT(*)
                    FROM messages um
                    WHERE um.conversation_id = c.id
                    AND um.sender_id <> $1
                    AND (p.last_read_at IS NULL OR um.created_at > p.last_read_at)
                )               AS unread_count

            FROM conversations c

            JOIN participants p
                ON p.conversation_id = c.id
            AND p.user_id = $1

            LEFT JOIN LATERAL (
                SELECT id, sender_id, content, type, created_at
                FROM messages m
                WHERE m.conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) lm ON TRUE

            ORDER BY
                lm.created_at DESC NULLS LAST,
                c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConversationSummary::from).collect())
    }

    async fn set_retention(
        &self,
        conversation_id: &Uuid,
        days: Option<i32>,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            UPDATE conversations
            SET auto_delete_days = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(days)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find_retention_candidates(
        &self,
    ) -> Result<Vec<RetentionCandidate>, error::SystemError> {
        let candidates = sqlx::query_as::<_, RetentionCandidate>(
            "SELECT id, auto_delete_days FROM conversations WHERE auto_delete_days IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }
}

#[derive(Clone)]
pub struct ParticipantPgRepository {
    pool: sqlx::PgPool,
}

impl ParticipantPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for ParticipantPgRepository {
    async fn find_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        let participants = sqlx::query_as::<_, ParticipantEntity>(
            "SELECT * FROM participants WHERE conversation_id = $1 ORDER BY joined_at",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn mark_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<ParticipantEntity>, error::SystemError> {
        // GREATEST ignores a NULL marker, so the first read sets it and
        // stale or concurrent requests can never move it backwards.
        let participant = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            UPDATE participants
            SET last_read_at = GREATEST(last_read_at, $3)
            WHERE conversation_id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }
}
