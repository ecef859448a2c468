use uuid::Uuid;

use crate::api::error;
use crate::modules::message::schema::MessageEntity;
use crate::modules::search::model::{ConversationContext, SearchHitRaw};
use crate::modules::search::repository::SearchRepository;

/// Wildcards in the user's query are literals, not pattern syntax.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct SearchPgRepository {
    pool: sqlx::PgPool,
}

impl SearchPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SearchRepository for SearchPgRepository {
    async fn search_in_conversation(
        &self,
        conversation_id: &Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        // file messages have NULL content unless captioned, so ILIKE
        // filters them out on its own
        let messages = sqlx::query_as::<_, MessageEntity>(
            "SELECT * FROM messages WHERE conversation_id = $1 AND content ILIKE $2 ORDER BY created_at DESC, id DESC LIMIT $3",
        )
        .bind(conversation_id)
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn search_for_user(
        &self,
        user_id: &Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<(MessageEntity, ConversationContext)>, error::SystemError> {
        let rows = sqlx::query_as::<_, SearchHitRaw>(
            r#"
            SELECT
                m.*,
                c.name AS conversation_name,
                c.type AS conversation_type
            FROM messages m
            JOIN conversations c
                ON c.id = m.conversation_id
            JOIN participants p
                ON p.conversation_id = m.conversation_id
            AND p.user_id = $1
            WHERE m.content ILIKE $2
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SearchHitRaw::into_parts).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_wraps_query_in_wildcards() {
        assert_eq!(like_pattern("invoice"), "%invoice%");
    }

    #[test]
    fn pattern_escapes_like_metacharacters() {
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern(r"c:\tmp"), "%c:\\\\tmp%");
    }
}
