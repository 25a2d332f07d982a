//! Messaging engine: direct/group/system sends, read receipts for direct
//! conversations, per-emoji reaction toggling, and group creation.
//!
//! The destination is a tagged [`MessageKind`] built through validating
//! constructors, so an "is_group with no group id" style of half-configured
//! send cannot be represented.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::types::{new_id, Group, Message, Reaction, ReplyRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Direct { recipient: String },
    Group { group_id: String },
    /// Announcements (e.g. group creation). Rendered differently by the UI
    /// and never attributed to a human conversation turn.
    System { group_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindError {
    EmptyRecipient,
    EmptyGroupId,
}

impl fmt::Display for KindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindError::EmptyRecipient => write!(f, "direct message needs a recipient"),
            KindError::EmptyGroupId => write!(f, "group message needs a group id"),
        }
    }
}

impl std::error::Error for KindError {}

impl MessageKind {
    pub fn direct(recipient: &str) -> Result<Self, KindError> {
        if recipient.trim().is_empty() {
            return Err(KindError::EmptyRecipient);
        }
        Ok(MessageKind::Direct { recipient: recipient.to_string() })
    }

    pub fn group(group_id: &str) -> Result<Self, KindError> {
        if group_id.trim().is_empty() {
            return Err(KindError::EmptyGroupId);
        }
        Ok(MessageKind::Group { group_id: group_id.to_string() })
    }

    pub fn system(group_id: &str) -> Result<Self, KindError> {
        if group_id.trim().is_empty() {
            return Err(KindError::EmptyGroupId);
        }
        Ok(MessageKind::System { group_id: group_id.to_string() })
    }
}

/// Append one message. The reply snapshot, if any, is copied verbatim and
/// never updated afterwards.
pub fn send(
    messages: &mut Vec<Message>,
    sender: &str,
    kind: MessageKind,
    text: &str,
    reply_to: Option<ReplyRef>,
    now: DateTime<Utc>,
) -> String {
    let (recipient, is_group, is_system) = match kind {
        MessageKind::Direct { recipient } => (recipient, false, false),
        MessageKind::Group { group_id } => (group_id, true, false),
        MessageKind::System { group_id } => (group_id, true, true),
    };
    let id = new_id();
    messages.push(Message {
        id: id.clone(),
        sender: sender.to_string(),
        recipient,
        text: text.to_string(),
        timestamp: now,
        read: false,
        is_group,
        is_system,
        reactions: Vec::new(),
        reply_to,
    });
    id
}

/// Mark every direct message from `counterpart` to `me` as read.
///
/// Group messages are untouched: there is no per-member read receipt, and
/// group unread counts are undefined at this layer.
pub fn mark_read(messages: &mut [Message], me: &str, counterpart: &str) {
    for m in messages
        .iter_mut()
        .filter(|m| !m.is_group && m.recipient == me && m.sender == counterpart)
    {
        m.read = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactOutcome {
    Added,
    Removed,
    NotFound,
}

/// Toggle `actor` on the reaction entry for `emoji`, creating the entry on
/// first use and dropping it when the last user leaves. A user may hold
/// reactions under several distinct emojis at once.
pub fn react(messages: &mut [Message], message_id: &str, actor: &str, emoji: &str) -> ReactOutcome {
    let Some(message) = messages.iter_mut().find(|m| m.id == message_id) else {
        return ReactOutcome::NotFound;
    };

    match message.reactions.iter_mut().position(|r| r.emoji == emoji) {
        Some(idx) => {
            let entry = &mut message.reactions[idx];
            if let Some(pos) = entry.users.iter().position(|u| u == actor) {
                entry.users.remove(pos);
                if entry.users.is_empty() {
                    message.reactions.remove(idx);
                }
                ReactOutcome::Removed
            } else {
                entry.users.push(actor.to_string());
                ReactOutcome::Added
            }
        }
        None => {
            message.reactions.push(Reaction {
                emoji: emoji.to_string(),
                users: vec![actor.to_string()],
            });
            ReactOutcome::Added
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The UI should auto-select this conversation.
    Created { group_id: String },
    EmptyName,
    NoOtherMembers,
}

/// Create a group and announce it with one system message.
///
/// Requires a non-empty name and at least one member besides the owner; the
/// owner is always a member.
pub fn create_group(
    groups: &mut Vec<Group>,
    messages: &mut Vec<Message>,
    owner: &str,
    name: &str,
    members: &[String],
    now: DateTime<Utc>,
) -> GroupOutcome {
    if name.trim().is_empty() {
        return GroupOutcome::EmptyName;
    }
    let mut all_members = vec![owner.to_string()];
    for m in members {
        if m != owner && !all_members.contains(m) {
            all_members.push(m.clone());
        }
    }
    if all_members.len() < 2 {
        return GroupOutcome::NoOtherMembers;
    }

    let id = new_id();
    groups.push(Group {
        id: id.clone(),
        name: name.trim().to_string(),
        owner: owner.to_string(),
        members: all_members,
        nicknames: Default::default(),
        created_at: now,
        photo: None,
    });

    // Constructor above guarantees a valid id.
    if let Ok(kind) = MessageKind::system(&id) {
        send(
            messages,
            owner,
            kind,
            &format!("{} created the group \"{}\"", owner, name.trim()),
            None,
            now,
        );
    }

    GroupOutcome::Created { group_id: id }
}

/// Whether `username` may see a message: direct messages are visible to the
/// two endpoints, group messages to current members only.
pub fn can_see(message: &Message, username: &str, groups: &[Group]) -> bool {
    if message.is_group {
        groups
            .iter()
            .find(|g| g.id == message.recipient)
            .is_some_and(|g| g.members.iter().any(|m| m == username))
    } else {
        message.sender == username || message.recipient == username
    }
}
