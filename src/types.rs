use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default coin balance granted at signup (and backfilled for records that
/// predate the coin system).
pub const DEFAULT_MOOD_COINS: i64 = 100;

/// Warning count at which a user is banned. The flag never auto-clears.
pub const BAN_THRESHOLD: u8 = 3;

/// One mood check-in. `mood_history` is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub mood: String,
    pub score: i32,
}

/// A citizen record. One per username; the roster holds every known user and
/// the session holds a mirror of the logged-in one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub email: String,
    /// Elevated title, only ever set by the hard-coded mayor override in
    /// `migrate::normalize`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
    #[serde(default)]
    pub mood_history: Vec<MoodEntry>,
    pub mood_coins: i64,
    #[serde(default)]
    pub mood_streak: u32,
    #[serde(default)]
    pub warnings: u8,
    #[serde(default)]
    pub is_banned: bool,

    // Pet sub-record. Gauges are clamped to [0, 100].
    pub pet_hunger: f64,
    pub pet_thirst: f64,
    pub pet_rest: f64,
    pub pet_level: u32,
    pub pet_exp: u32,
    pub pet_last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_sleep_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pet_emoji: String,
    #[serde(default)]
    pub pet_name: String,
    #[serde(default)]
    pub pet_chosen: bool,
    /// game id -> next-eligible time.
    #[serde(default)]
    pub game_cooldowns: HashMap<String, DateTime<Utc>>,
}

impl User {
    /// A fresh record with signup defaults applied.
    pub fn new(username: &str, display_name: &str, email: &str, now: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
            title: None,
            following: Vec::new(),
            followers: Vec::new(),
            blocked: Vec::new(),
            mood_history: Vec::new(),
            mood_coins: DEFAULT_MOOD_COINS,
            mood_streak: 0,
            warnings: 0,
            is_banned: false,
            pet_hunger: 100.0,
            pet_thirst: 100.0,
            pet_rest: 100.0,
            pet_level: 1,
            pet_exp: 0,
            pet_last_update: now,
            pet_sleep_until: None,
            pet_emoji: String::new(),
            pet_name: String::new(),
            pet_chosen: false,
            game_cooldowns: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Global,
    /// Limited to follow relations of the viewer.
    Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    /// Usernames that hearted this post. Set semantics.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_repost: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_author: Option<String>,
}

/// A comment or reply. Replies nest without a depth limit.
///
/// `hearts` is an unbounded counter, not a per-user set — unlike post likes
/// and message reactions. That asymmetry is long-standing observable behavior
/// and is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub hearts: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

/// One emoji's reactions on a message. At most one entry per distinct emoji;
/// the entry is removed when its user set empties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub users: Vec<String>,
}

/// Denormalized snapshot of a replied-to message. Deliberately not a live
/// reference: editing or deleting the original does not update the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub id: String,
    pub text: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: String,
    /// A username for direct messages, a group id for group messages.
    pub recipient: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner: String,
    /// Owner always included.
    pub members: Vec<String>,
    #[serde(default)]
    pub nicknames: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Heart,
    Repost,
    Follow,
    Comment,
    Reply,
    Warning,
    Achievement,
    Tier,
    System,
}

impl NotificationKind {
    /// Whether this kind may target the actor themselves. Social reactions to
    /// your own content are suppressed; system-to-user messages about your
    /// own state are not.
    pub fn allows_self_target(self) -> bool {
        matches!(
            self,
            NotificationKind::Achievement | NotificationKind::Tier | NotificationKind::Warning
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub from_user: String,
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// Short content excerpt for display context.
    #[serde(default)]
    pub snippet: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// The full in-memory application state hydrated by the persistence gateway.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppState {
    pub current_user: Option<User>,
    pub roster: Vec<User>,
    pub posts: Vec<Post>,
    pub messages: Vec<Message>,
    pub groups: Vec<Group>,
    pub notifications: Vec<Notification>,
    pub theme: Theme,
}

/// Insert preserving set semantics. Returns true if the value was absent.
pub(crate) fn insert_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// Remove every occurrence (duplicates are a bug, but don't let one linger).
pub(crate) fn remove_value(list: &mut Vec<String>, value: &str) -> bool {
    let before = list.len();
    list.retain(|v| v != value);
    list.len() != before
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_unique_rejects_duplicates() {
        let mut list = vec!["ana".to_string()];
        assert!(!insert_unique(&mut list, "ana"));
        assert!(insert_unique(&mut list, "ben"));
        assert_eq!(list, vec!["ana", "ben"]);
    }

    #[test]
    fn remove_value_clears_all_occurrences() {
        let mut list = vec!["x".to_string(), "y".to_string(), "x".to_string()];
        assert!(remove_value(&mut list, "x"));
        assert_eq!(list, vec!["y"]);
        assert!(!remove_value(&mut list, "x"));
    }

    #[test]
    fn self_target_allowlist_is_exactly_three_kinds() {
        for kind in [
            NotificationKind::Achievement,
            NotificationKind::Tier,
            NotificationKind::Warning,
        ] {
            assert!(kind.allows_self_target());
        }
        for kind in [
            NotificationKind::Heart,
            NotificationKind::Repost,
            NotificationKind::Follow,
            NotificationKind::Comment,
            NotificationKind::Reply,
            NotificationKind::System,
        ] {
            assert!(!kind.allows_self_target());
        }
    }
}
