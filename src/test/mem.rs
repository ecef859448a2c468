//! In-memory fakes for the repository traits, shared by the service
//! tests. They reproduce the observable behavior of the Postgres
//! implementations: direct conversations dedupe on the pair key, history
//! pages in ascending `(created_at, id)` order, read markers never move
//! backwards, and expiry deletes re-check the retention policy.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use uuid::Uuid;

use crate::api::error::SystemError;
use crate::modules::conversation::model::{
    ConversationSummary, LastMessageRow, RetentionCandidate,
};
use crate::modules::conversation::repository::{ConversationRepository, ParticipantRepository};
use crate::modules::conversation::repository_pg::direct_key;
use crate::modules::conversation::schema::{
    ConversationEntity, ConversationType, ParticipantEntity,
};
use crate::modules::directory::client::DirectoryClient;
use crate::modules::directory::model::DirectoryEntry;
use crate::modules::mention::service::MentionResolver;
use crate::modules::message::model::{InsertMessage, MessageQuery};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::{MessageEntity, MessageType};
use crate::modules::search::model::ConversationContext;
use crate::modules::search::repository::SearchRepository;
use crate::modules::storage::model::StoredObject;
use crate::modules::storage::service::ObjectStorage;

/// Postgres `timestamptz` stores microseconds, and the cursor format
/// relies on that (message::model::encode_cursor); message rows keep the
/// same precision so cursors round-trip losslessly against the fakes.
fn pg_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::microseconds(1)).unwrap()
}

#[derive(Default)]
struct Inner {
    conversations: Vec<ConversationEntity>,
    direct_keys: HashMap<String, Uuid>,
    participants: Vec<ParticipantEntity>,
    messages: Vec<MessageEntity>,
    fail_next_message_insert: bool,
    failing_deletes: HashSet<Uuid>,
    fail_candidate_scan: bool,
}

/// One shared store behind every repository fake, so a service wired from
/// several fakes still sees a single consistent world.
pub struct MemState {
    inner: Arc<Mutex<Inner>>,
}

impl MemState {
    pub fn fresh() -> Arc<Self> {
        Arc::new(MemState { inner: Arc::new(Mutex::new(Inner::default())) })
    }

    pub fn conversations(&self) -> MemConversationRepository {
        MemConversationRepository { inner: self.inner.clone() }
    }

    pub fn participants(&self) -> MemParticipantRepository {
        MemParticipantRepository { inner: self.inner.clone() }
    }

    pub fn messages(&self) -> MemMessageRepository {
        MemMessageRepository { inner: self.inner.clone() }
    }

    pub fn search(&self) -> MemSearchRepository {
        MemSearchRepository { inner: self.inner.clone() }
    }

    pub fn seed_direct(&self, user_a: Uuid, user_b: Uuid) -> ConversationEntity {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let entity = ConversationEntity {
            id: Uuid::now_v7(),
            _type: ConversationType::Direct,
            name: None,
            auto_delete_days: None,
            created_at: now,
            updated_at: now,
        };

        inner.direct_keys.insert(direct_key(&user_a, &user_b), entity.id);
        for user_id in [user_a, user_b] {
            inner.participants.push(ParticipantEntity {
                conversation_id: entity.id,
                user_id,
                joined_at: now,
                last_read_at: None,
            });
        }
        inner.conversations.push(entity.clone());

        entity
    }

    pub fn seed_group(&self, name: &str, member_ids: &[Uuid]) -> ConversationEntity {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let entity = ConversationEntity {
            id: Uuid::now_v7(),
            _type: ConversationType::Group,
            name: Some(name.to_string()),
            auto_delete_days: None,
            created_at: now,
            updated_at: now,
        };

        for user_id in member_ids {
            inner.participants.push(ParticipantEntity {
                conversation_id: entity.id,
                user_id: *user_id,
                joined_at: now,
                last_read_at: None,
            });
        }
        inner.conversations.push(entity.clone());

        entity
    }

    pub fn seed_message_at(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> MessageEntity {
        let created_at = pg_micros(created_at);
        let entity = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            _type: MessageType::Text,
            content: Some(content.to_string()),
            file_original_name: None,
            file_mime_type: None,
            file_size_bytes: None,
            file_url: None,
            is_edited: false,
            created_at,
            updated_at: created_at,
        };

        self.inner.lock().unwrap().messages.push(entity.clone());
        entity
    }

    pub fn seed_file_message_at(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        caption: Option<&str>,
        file_name: &str,
        created_at: DateTime<Utc>,
    ) -> MessageEntity {
        let created_at = pg_micros(created_at);
        let entity = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            _type: MessageType::File,
            content: caption.map(str::to_string),
            file_original_name: Some(file_name.to_string()),
            file_mime_type: Some(
                mime_guess::from_path(file_name).first_or_octet_stream().to_string(),
            ),
            file_size_bytes: Some(1024),
            file_url: Some(format!("/uploads/{file_name}")),
            is_edited: false,
            created_at,
            updated_at: created_at,
        };

        self.inner.lock().unwrap().messages.push(entity.clone());
        entity
    }

    pub fn message_exists(&self, message_id: &Uuid) -> bool {
        self.inner.lock().unwrap().messages.iter().any(|m| m.id == *message_id)
    }

    /// Makes the next `MessageRepository::create` call fail once.
    pub fn fail_next_message_insert(&self) {
        self.inner.lock().unwrap().fail_next_message_insert = true;
    }

    /// Makes `delete_expired` fail for the given conversation.
    pub fn fail_deletes_for(&self, conversation_id: Uuid) {
        self.inner.lock().unwrap().failing_deletes.insert(conversation_id);
    }

    /// Makes `find_retention_candidates` fail.
    pub fn fail_candidate_scan(&self) {
        self.inner.lock().unwrap().fail_candidate_scan = true;
    }
}

struct EmptyDirectory;

#[async_trait]
impl DirectoryClient for EmptyDirectory {
    async fn resolve(&self, _query: &str) -> Result<Vec<DirectoryEntry>, SystemError> {
        Ok(Vec::new())
    }
}

/// Resolver backed by a directory with no entries; mention tokens parse
/// but never resolve to a user.
pub fn unresolving_mentions() -> Arc<MentionResolver> {
    Arc::new(MentionResolver::new(Arc::new(EmptyDirectory)))
}

/// Object storage that keeps uploads in memory and counts them.
#[derive(Default)]
pub struct MemStorage {
    stored: Mutex<Vec<StoredObject>>,
}

impl MemStorage {
    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for MemStorage {
    async fn store(
        &self,
        original_name: &str,
        _mime_type: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, SystemError> {
        let object = StoredObject {
            file_name: original_name.to_string(),
            url: format!("/uploads/{original_name}"),
            size_bytes: bytes.len() as i64,
        };

        self.stored.lock().unwrap().push(object.clone());
        Ok(object)
    }
}

#[derive(Clone)]
pub struct MemConversationRepository {
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl ConversationRepository for MemConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, SystemError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.conversations.iter().find(|c| c.id == *conversation_id).cloned())
    }

    async fn find_with_membership(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<(ConversationEntity, bool)>, SystemError> {
        let inner = self.inner.lock().unwrap();
        let Some(conversation) =
            inner.conversations.iter().find(|c| c.id == *conversation_id)
        else {
            return Ok(None);
        };

        let is_member = inner
            .participants
            .iter()
            .any(|p| p.conversation_id == *conversation_id && p.user_id == *user_id);

        Ok(Some((conversation.clone(), is_member)))
    }

    async fn create_or_get_direct(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
    ) -> Result<ConversationEntity, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        let key = direct_key(user_a, user_b);

        if let Some(&existing_id) = inner.direct_keys.get(&key) {
            return inner
                .conversations
                .iter()
                .find(|c| c.id == existing_id)
                .cloned()
                .ok_or_else(|| {
                    SystemError::DatabaseError("direct key points at a missing conversation".into())
                });
        }

        let now = Utc::now();
        let entity = ConversationEntity {
            id: Uuid::now_v7(),
            _type: ConversationType::Direct,
            name: None,
            auto_delete_days: None,
            created_at: now,
            updated_at: now,
        };

        inner.direct_keys.insert(key, entity.id);
        for user_id in [*user_a, *user_b] {
            inner.participants.push(ParticipantEntity {
                conversation_id: entity.id,
                user_id,
                joined_at: now,
                last_read_at: None,
            });
        }
        inner.conversations.push(entity.clone());

        Ok(entity)
    }

    async fn create_group(
        &self,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<ConversationEntity, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let entity = ConversationEntity {
            id: Uuid::now_v7(),
            _type: ConversationType::Group,
            name: Some(name.to_string()),
            auto_delete_days: None,
            created_at: now,
            updated_at: now,
        };

        for user_id in member_ids {
            inner.participants.push(ParticipantEntity {
                conversation_id: entity.id,
                user_id: *user_id,
                joined_at: now,
                last_read_at: None,
            });
        }
        inner.conversations.push(entity.clone());

        Ok(entity)
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationSummary>, SystemError> {
        let inner = self.inner.lock().unwrap();
        type Rank = (Option<DateTime<Utc>>, DateTime<Utc>);
        let mut ranked: Vec<(Rank, ConversationSummary)> = Vec::new();

        for p in inner.participants.iter().filter(|p| p.user_id == *user_id) {
            let Some(conversation) =
                inner.conversations.iter().find(|c| c.id == p.conversation_id)
            else {
                continue;
            };

            let mut history: Vec<&MessageEntity> = inner
                .messages
                .iter()
                .filter(|m| m.conversation_id == conversation.id)
                .collect();
            history.sort_by_key(|m| (m.created_at, m.id));
            let last = history.last().copied();

            let unread_count = history
                .iter()
                .filter(|m| {
                    m.sender_id != *user_id
                        && p.last_read_at.map_or(true, |read| m.created_at > read)
                })
                .count() as i64;

            let other_user_id = match conversation._type {
                ConversationType::Direct => inner
                    .participants
                    .iter()
                    .find(|q| q.conversation_id == conversation.id && q.user_id != *user_id)
                    .map(|q| q.user_id),
                ConversationType::Group => None,
            };

            // Descending sort on Option puts None last, matching NULLS LAST.
            let activity = (last.map(|m| m.created_at), conversation.created_at);
            ranked.push((
                activity,
                ConversationSummary {
                    id: conversation.id,
                    _type: conversation._type,
                    name: conversation.name.clone(),
                    auto_delete_days: conversation.auto_delete_days,
                    other_user_id,
                    last_message: last.map(|m| LastMessageRow {
                        id: m.id,
                        sender_id: m.sender_id,
                        _type: m._type,
                        content: m.content.clone(),
                        created_at: m.created_at,
                    }),
                    last_message_time: last.map(|m| m.created_at),
                    unread_count,
                },
            ));
        }

        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(ranked.into_iter().map(|(_, summary)| summary).collect())
    }

    async fn set_retention(
        &self,
        conversation_id: &Uuid,
        days: Option<i32>,
    ) -> Result<Option<ConversationEntity>, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.conversations.iter_mut().find(|c| c.id == *conversation_id) {
            Some(conversation) => {
                conversation.auto_delete_days = days;
                conversation.updated_at = Utc::now();
                Ok(Some(conversation.clone()))
            }
            None => Ok(None),
        }
    }

    async fn find_retention_candidates(
        &self,
    ) -> Result<Vec<RetentionCandidate>, SystemError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_candidate_scan {
            return Err(SystemError::DatabaseError("injected scan failure".into()));
        }

        Ok(inner
            .conversations
            .iter()
            .filter_map(|c| {
                c.auto_delete_days
                    .map(|days| RetentionCandidate { id: c.id, auto_delete_days: days })
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct MemParticipantRepository {
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl ParticipantRepository for MemParticipantRepository {
    async fn find_by_conversation(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Vec<ParticipantEntity>, SystemError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .participants
            .iter()
            .filter(|p| p.conversation_id == *conversation_id)
            .cloned()
            .collect())
    }

    async fn mark_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ParticipantEntity>, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .participants
            .iter_mut()
            .find(|p| p.conversation_id == *conversation_id && p.user_id == *user_id)
        {
            Some(participant) => {
                participant.last_read_at =
                    Some(participant.last_read_at.map_or(at, |existing| existing.max(at)));
                Ok(Some(participant.clone()))
            }
            None => Ok(None),
        }
    }
}

#[derive(Clone)]
pub struct MemMessageRepository {
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl MessageRepository for MemMessageRepository {
    async fn create(&self, message: &InsertMessage) -> Result<MessageEntity, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_message_insert {
            inner.fail_next_message_insert = false;
            return Err(SystemError::DatabaseError("injected insert failure".into()));
        }

        let now = pg_micros(Utc::now());
        let entity = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            _type: message._type,
            content: message.content.clone(),
            file_original_name: message.file.as_ref().map(|f| f.original_name.clone()),
            file_mime_type: message.file.as_ref().map(|f| f.mime_type.clone()),
            file_size_bytes: message.file.as_ref().map(|f| f.size_bytes),
            file_url: message.file.as_ref().map(|f| f.url.clone()),
            is_edited: false,
            created_at: now,
            updated_at: now,
        };

        inner.messages.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, message_id: &Uuid) -> Result<Option<MessageEntity>, SystemError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.messages.iter().find(|m| m.id == *message_id).cloned())
    }

    async fn find_page(
        &self,
        query: &MessageQuery,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, SystemError> {
        let inner = self.inner.lock().unwrap();
        let mut page: Vec<MessageEntity> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == query.conversation_id)
            .filter(|m| query.after.map_or(true, |(ts, id)| (m.created_at, m.id) > (ts, id)))
            .cloned()
            .collect();

        page.sort_by_key(|m| (m.created_at, m.id));
        page.truncate(limit.max(0) as usize);
        Ok(page)
    }

    async fn update_content(
        &self,
        message_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.messages.iter_mut().find(|m| m.id == *message_id) {
            Some(message) => {
                message.content = Some(content.to_string());
                message.is_edited = true;
                message.updated_at = Utc::now();
                Ok(Some(message.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, message_id: &Uuid) -> Result<bool, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != *message_id);
        Ok(inner.messages.len() < before)
    }

    async fn delete_expired(
        &self,
        conversation_id: &Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, SystemError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_deletes.contains(conversation_id) {
            return Err(SystemError::DatabaseError("injected delete failure".into()));
        }

        // mirrors the guarded statement: no active policy, no deletion
        let policy_active = inner
            .conversations
            .iter()
            .any(|c| c.id == *conversation_id && c.auto_delete_days.is_some());
        if !policy_active {
            return Ok(0);
        }

        let before = inner.messages.len();
        inner
            .messages
            .retain(|m| m.conversation_id != *conversation_id || m.created_at >= cutoff);
        Ok((before - inner.messages.len()) as u64)
    }
}

#[derive(Clone)]
pub struct MemSearchRepository {
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl SearchRepository for MemSearchRepository {
    async fn search_in_conversation(
        &self,
        conversation_id: &Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<MessageEntity>, SystemError> {
        let inner = self.inner.lock().unwrap();
        let needle = query.to_lowercase();

        let mut hits: Vec<MessageEntity> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .filter(|m| m.content.as_ref().is_some_and(|c| c.to_lowercase().contains(&needle)))
            .cloned()
            .collect();

        hits.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    async fn search_for_user(
        &self,
        user_id: &Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<(MessageEntity, ConversationContext)>, SystemError> {
        let inner = self.inner.lock().unwrap();
        let needle = query.to_lowercase();
        let member_of: HashSet<Uuid> = inner
            .participants
            .iter()
            .filter(|p| p.user_id == *user_id)
            .map(|p| p.conversation_id)
            .collect();

        let mut hits: Vec<(MessageEntity, ConversationContext)> = inner
            .messages
            .iter()
            .filter(|m| member_of.contains(&m.conversation_id))
            .filter(|m| m.content.as_ref().is_some_and(|c| c.to_lowercase().contains(&needle)))
            .filter_map(|m| {
                inner.conversations.iter().find(|c| c.id == m.conversation_id).map(|c| {
                    (
                        m.clone(),
                        ConversationContext { id: c.id, name: c.name.clone(), _type: c._type },
                    )
                })
            })
            .collect();

        hits.sort_by(|a, b| (b.0.created_at, b.0.id).cmp(&(a.0.created_at, a.0.id)));
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }
}
