use uuid::Uuid;

use crate::api::error;
use crate::modules::message::model::{InsertMessage, MessageQuery};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::MessageEntity;

#[derive(Clone)]
pub struct MessagePgRepository {
    pool: sqlx::PgPool,
}

impl MessagePgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessagePgRepository {
    async fn create(
        &self,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        let file = message.file.as_ref();

        let created = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages
                (id, conversation_id, sender_id, type, content,
                 file_original_name, file_mime_type, file_size_bytes, file_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message._type)
        .bind(&message.content)
        .bind(file.map(|f| f.original_name.as_str()))
        .bind(file.map(|f| f.mime_type.as_str()))
        .bind(file.map(|f| f.size_bytes))
        .bind(file.map(|f| f.url.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message =
            sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(message)
    }

    async fn find_page(
        &self,
        query: &MessageQuery,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        // keyset paging over the (conversation_id, created_at, id) index

        let messages = if let Some((created_at, id)) = query.after {
            sqlx::query_as::<_, MessageEntity>(
                "SELECT * FROM messages WHERE conversation_id = $1 AND (created_at, id) > ($2, $3) ORDER BY created_at ASC, id ASC LIMIT $4",
            )
            .bind(query.conversation_id)
            .bind(created_at)
            .bind(id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, MessageEntity>(
                "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC LIMIT $2",
            )
            .bind(query.conversation_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(messages)
    }

    async fn update_content(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let updated = sqlx::query_as::<_, MessageEntity>(
            r#"
            UPDATE messages
            SET content = $2, is_edited = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, message_id: &Uuid) -> Result<bool, error::SystemError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(
        &self,
        conversation_id: &Uuid,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, error::SystemError> {
        let result = sqlx::query(
            r#"
            DELETE FROM messages m
            USING conversations c
            WHERE c.id = m.conversation_id
            AND m.conversation_id = $1
            AND c.auto_delete_days IS NOT NULL
            AND m.created_at < $2
            "#,
        )
        .bind(conversation_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
