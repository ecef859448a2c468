use serde::Serialize;

use crate::modules::directory::model::DirectoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MentionKind {
    Nickname,
    CustomId,
}

/// One mention token lifted out of a message body. `text` carries the
/// lookup string without its sigil, `raw` the token as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionToken {
    pub kind: MentionKind,
    pub raw: String,
    pub text: String,
}

/// A token paired with the directory entity it resolved to. `entity` is
/// `None` when the directory had no candidate or the lookup degraded, in
/// which case clients render the raw text unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct MentionAnnotation {
    pub kind: MentionKind,
    pub raw: String,
    pub entity: Option<DirectoryEntry>,
}
