use lazy_static::lazy_static;
use regex::Regex;

use super::model::{MentionKind, MentionToken};

lazy_static! {
    // nicknames are letters and combining marks; digits or punctuation end
    // the token
    static ref NICKNAME_RE: Regex = Regex::new(r"@([\p{L}\p{M}]+)").unwrap();
    static ref CUSTOM_ID_RE: Regex = Regex::new(r"#(\d+(?:-\d+)*)").unwrap();
}

/// Extracts mention tokens from a message body in order of appearance.
/// The body itself is never rewritten; surrounding text stays untouched.
pub fn parse_mentions(content: &str) -> Vec<MentionToken> {
    let mut found: Vec<(usize, MentionToken)> = Vec::new();

    for caps in NICKNAME_RE.captures_iter(content) {
        let whole = caps.get(0).unwrap();
        found.push((
            whole.start(),
            MentionToken {
                kind: MentionKind::Nickname,
                raw: whole.as_str().to_string(),
                text: caps[1].to_string(),
            },
        ));
    }

    for caps in CUSTOM_ID_RE.captures_iter(content) {
        let whole = caps.get(0).unwrap();
        found.push((
            whole.start(),
            MentionToken {
                kind: MentionKind::CustomId,
                raw: whole.as_str().to_string(),
                text: caps[1].to_string(),
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, token)| token).collect()
}
