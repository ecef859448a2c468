use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One candidate returned by the directory service for a lookup string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub nickname: String,
    pub custom_id: Option<String>,
    pub full_name: String,
}
