use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceInfo {
    pub user_id: Uuid,
    pub is_online: bool,
    pub last_seen: Option<String>,
}

/// `ids` is a comma-separated list of user ids.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchStatusQuery {
    #[validate(length(min = 1, message = "ids must not be empty"))]
    pub ids: String,
}
