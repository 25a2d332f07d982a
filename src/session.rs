//! Session context and roster reconciliation.
//!
//! `Session` is the single mutation point for in-memory state. It owns the
//! "current user" mirror and the roster, and every change to the current
//! user is upserted back into the roster (merge-if-present,
//! insert-if-absent), so the roster never holds a staler snapshot of the
//! logged-in identity and never holds two entries for one username.
//!
//! The ban gate lives here, once, instead of being re-checked inside every
//! engine: mutating entry points call `require_active` first. Read paths and
//! violation recording stay available to a banned session.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::genai::AssistantProvider;
use crate::messaging::{self, GroupOutcome, MessageKind, ReactOutcome};
use crate::moderation::{self, ViolationOutcome};
use crate::notifications;
use crate::pet::{self, StatDelta};
use crate::relationships::{self, BlockOutcome, FollowOutcome};
use crate::social::{self, CommentAction, CommentOutcome, HeartOutcome, InteractionOutcome,
    PostOutcome, RepostOutcome};
use crate::types::{AppState, Comment, MoodEntry, NotificationKind, Post, ReplyRef, Theme, User,
    Visibility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No user is logged in.
    NoSession,
    /// The logged-in user is banned; all mutating operations are refused.
    Banned,
    UnknownUser(String),
    UsernameTaken(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoSession => write!(f, "no active session"),
            SessionError::Banned => write!(f, "account is banned"),
            SessionError::UnknownUser(u) => write!(f, "unknown user '{}'", u),
            SessionError::UsernameTaken(u) => write!(f, "username '{}' is taken", u),
        }
    }
}

impl std::error::Error for SessionError {}

/// Result of a safety-checked send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Sent { message_id: String },
    /// The content was flagged; nothing was sent and a strike was recorded.
    Rejected(ViolationOutcome),
}

pub struct Session {
    state: AppState,
    dirty: bool,
}

impl Session {
    /// Wrap state hydrated by the persistence gateway.
    pub fn new(state: AppState) -> Self {
        Self { state, dirty: false }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        self.state.current_user.as_ref()
    }

    /// True if any mutation happened since the last call; clears the flag.
    /// The caller batches one save per handled UI event.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    // -- lifecycle ---------------------------------------------------------

    /// Create a fresh user, add it to the roster and make it current.
    pub fn sign_up(
        &mut self,
        username: &str,
        display_name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.state.roster.iter().any(|u| u.username == username) {
            return Err(SessionError::UsernameTaken(username.to_string()));
        }
        let user = User::new(username, display_name, email, now);
        self.state.current_user = Some(user);
        self.upsert_roster();
        self.dirty = true;
        Ok(())
    }

    /// Resume a session for an existing roster entry.
    pub fn log_in(&mut self, username: &str) -> Result<(), SessionError> {
        let entry = self
            .state
            .roster
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| SessionError::UnknownUser(username.to_string()))?;
        self.state.current_user = Some(entry);
        self.dirty = true;
        Ok(())
    }

    /// Clears the current user; the roster (and everything else) survives.
    pub fn log_out(&mut self) {
        if self.state.current_user.take().is_some() {
            self.dirty = true;
        }
    }

    // -- reconciler --------------------------------------------------------

    fn require_active(&self) -> Result<&User, SessionError> {
        let user = self.state.current_user.as_ref().ok_or(SessionError::NoSession)?;
        if user.is_banned {
            return Err(SessionError::Banned);
        }
        Ok(user)
    }

    /// Mutate the current user without the ban gate. Internal paths only
    /// (violation recording must work on a user about to be banned).
    fn apply_to_current(
        &mut self,
        mutate: impl FnOnce(&mut User),
    ) -> Result<(), SessionError> {
        let user = self.state.current_user.as_mut().ok_or(SessionError::NoSession)?;
        mutate(user);
        self.upsert_roster();
        self.dirty = true;
        Ok(())
    }

    /// Apply a transform to the current user, then upsert the roster entry.
    pub fn set_current_user(
        &mut self,
        mutate: impl FnOnce(&mut User),
    ) -> Result<(), SessionError> {
        self.require_active()?;
        self.apply_to_current(mutate)
    }

    /// Merge the current-user snapshot over its roster entry, or append it.
    fn upsert_roster(&mut self) {
        let Some(user) = &self.state.current_user else { return };
        match self
            .state
            .roster
            .iter_mut()
            .find(|u| u.username == user.username)
        {
            Some(entry) => *entry = user.clone(),
            None => self.state.roster.push(user.clone()),
        }
    }

    /// Pull the roster entry back into the current-user mirror after an
    /// engine mutated the roster directly.
    fn refresh_current_from_roster(&mut self) {
        if let Some(current) = &mut self.state.current_user {
            if let Some(entry) = self
                .state
                .roster
                .iter()
                .find(|u| u.username == current.username)
            {
                *current = entry.clone();
            }
        }
    }

    /// Re-key the current user's identity and rewrite every edge that
    /// references the old name, so stale usernames never resolve.
    pub fn rename_current_user(&mut self, new_name: &str) -> Result<(), SessionError> {
        let old = self.require_active()?.username.clone();
        if new_name == old {
            return Ok(());
        }
        if self.state.roster.iter().any(|u| u.username == new_name) {
            return Err(SessionError::UsernameTaken(new_name.to_string()));
        }

        rename_everywhere(&mut self.state, &old, new_name);
        if let Some(user) = &mut self.state.current_user {
            user.username = new_name.to_string();
        }
        self.upsert_roster();
        self.dirty = true;
        debug!(%old, new = %new_name, "re-keyed username across all collections");
        Ok(())
    }

    // -- mood & pet --------------------------------------------------------

    /// Append a mood check-in and maintain the daily streak. A second
    /// check-in on the same day appends to history but leaves the streak.
    pub fn check_in_mood(
        &mut self,
        mood: &str,
        score: i32,
        today: NaiveDate,
    ) -> Result<(), SessionError> {
        self.require_active()?;
        self.apply_to_current(|user| {
            let last = user.mood_history.last().map(|e| e.date);
            if last != Some(today) {
                if last.is_some() && last == today.pred_opt() {
                    user.mood_streak += 1;
                } else {
                    user.mood_streak = 1;
                }
            }
            user.mood_history.push(MoodEntry {
                date: today,
                mood: mood.to_string(),
                score,
            });
        })
    }

    /// Bounded pet stat update (feeding, games, rewards).
    pub fn update_pet(&mut self, delta: StatDelta) -> Result<(), SessionError> {
        self.require_active()?;
        self.apply_to_current(|user| pet::update_stats(user, delta))
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.state.theme != theme {
            self.state.theme = theme;
            self.dirty = true;
        }
    }

    // -- relationships -----------------------------------------------------

    pub fn follow(&mut self, target: &str, now: DateTime<Utc>) -> Result<FollowOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = relationships::follow(&mut self.state.roster, &me, target);
        if matches!(outcome, FollowOutcome::Followed | FollowOutcome::Unfollowed) {
            self.dirty = true;
        }
        if outcome == FollowOutcome::Followed {
            notifications::emit(
                &mut self.state.notifications,
                &me,
                target,
                NotificationKind::Follow,
                "",
                None,
                now,
            );
        }
        self.refresh_current_from_roster();
        Ok(outcome)
    }

    pub fn block(&mut self, target: &str) -> Result<BlockOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = relationships::block(&mut self.state.roster, &me, target);
        if outcome == BlockOutcome::Blocked {
            self.dirty = true;
        }
        self.refresh_current_from_roster();
        Ok(outcome)
    }

    pub fn unblock(&mut self, target: &str) -> Result<bool, SessionError> {
        let me = self.require_active()?.username.clone();
        let removed = relationships::unblock(&mut self.state.roster, &me, target);
        self.refresh_current_from_roster();
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    // -- social content ----------------------------------------------------

    pub fn create_post(
        &mut self,
        content: &str,
        visibility: Visibility,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let me = self.require_active()?.username.clone();
        let id = social::create_post(&mut self.state.posts, &me, content, visibility, now);
        self.dirty = true;
        Ok(id)
    }

    pub fn heart_post(
        &mut self,
        post_id: &str,
        now: DateTime<Utc>,
    ) -> Result<HeartOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = social::heart(&mut self.state.posts, post_id, &me);
        if outcome != HeartOutcome::NotFound {
            self.dirty = true;
        }
        if let HeartOutcome::Liked { author, snippet } = &outcome {
            notifications::emit(
                &mut self.state.notifications,
                &me,
                author,
                NotificationKind::Heart,
                snippet,
                Some(post_id.to_string()),
                now,
            );
        }
        Ok(outcome)
    }

    pub fn repost(
        &mut self,
        post_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RepostOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = social::repost(&mut self.state.posts, post_id, &me, now);
        if let RepostOutcome::Created { post_id: new_id, original_author } = &outcome {
            self.dirty = true;
            notifications::emit(
                &mut self.state.notifications,
                &me,
                original_author,
                NotificationKind::Repost,
                "",
                Some(new_id.clone()),
                now,
            );
        }
        Ok(outcome)
    }

    pub fn comment(
        &mut self,
        post_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<CommentOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = social::comment(&mut self.state.posts, post_id, &me, text, now);
        if let CommentOutcome::Added { post_author, .. } = &outcome {
            self.dirty = true;
            notifications::emit(
                &mut self.state.notifications,
                &me,
                post_author,
                NotificationKind::Comment,
                &social::snippet_of(text),
                Some(post_id.to_string()),
                now,
            );
        }
        Ok(outcome)
    }

    /// Heart a nested comment, or reply to it. Replies notify the parent
    /// comment's author; comment hearts notify nobody.
    pub fn comment_interaction(
        &mut self,
        post_id: &str,
        comment_id: &str,
        reply_text: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<InteractionOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let action = match reply_text {
            Some(text) => CommentAction::Reply { author: &me, text },
            None => CommentAction::Heart,
        };
        let outcome =
            social::comment_interaction(&mut self.state.posts, post_id, comment_id, action, now);
        if outcome != InteractionOutcome::NotFound {
            self.dirty = true;
        }
        if let InteractionOutcome::Replied { parent_author, .. } = &outcome {
            notifications::emit(
                &mut self.state.notifications,
                &me,
                parent_author,
                NotificationKind::Reply,
                &social::snippet_of(reply_text.unwrap_or_default()),
                Some(post_id.to_string()),
                now,
            );
        }
        Ok(outcome)
    }

    pub fn edit_post(&mut self, post_id: &str, content: &str) -> Result<PostOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = social::edit_post(&mut self.state.posts, post_id, &me, content);
        if outcome == PostOutcome::Done {
            self.dirty = true;
        }
        Ok(outcome)
    }

    pub fn delete_post(&mut self, post_id: &str) -> Result<PostOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = social::delete_post(&mut self.state.posts, post_id, &me);
        if outcome == PostOutcome::Done {
            self.dirty = true;
        }
        Ok(outcome)
    }

    /// The current user's feed: blocked authors hidden, Circle posts limited
    /// to follow relations. Without a session only Global posts show.
    pub fn feed(&self) -> Vec<&Post> {
        match &self.state.current_user {
            Some(viewer) => self
                .state
                .posts
                .iter()
                .filter(|p| social::visible_to(p, viewer))
                .collect(),
            None => self
                .state
                .posts
                .iter()
                .filter(|p| p.visibility == Visibility::Global)
                .collect(),
        }
    }

    // -- messaging ---------------------------------------------------------

    pub fn send_message(
        &mut self,
        kind: MessageKind,
        text: &str,
        reply_to: Option<ReplyRef>,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let me = self.require_active()?.username.clone();
        let id = messaging::send(&mut self.state.messages, &me, kind, text, reply_to, now);
        self.dirty = true;
        Ok(id)
    }

    /// Run the content-safety check before sending. A flagged message is not
    /// sent; it becomes a strike via the violation governor instead. A
    /// failed check degrades to "safe" — the assistant is advisory only.
    pub async fn send_message_checked(
        &mut self,
        assistant: &dyn AssistantProvider,
        kind: MessageKind,
        text: &str,
        reply_to: Option<ReplyRef>,
        now: DateTime<Utc>,
    ) -> Result<SendResult, SessionError> {
        self.require_active()?;
        let verdict = assistant.check_content_safety(text).await;
        if verdict.is_inappropriate {
            let reason = verdict.reason.unwrap_or_else(|| "inappropriate content".to_string());
            let outcome = self.record_violation(&reason, now)?;
            return Ok(SendResult::Rejected(outcome));
        }
        let message_id = self.send_message(kind, text, reply_to, now)?;
        Ok(SendResult::Sent { message_id })
    }

    pub fn mark_conversation_read(&mut self, counterpart: &str) -> Result<(), SessionError> {
        let me = self.require_active()?.username.clone();
        messaging::mark_read(&mut self.state.messages, &me, counterpart);
        self.dirty = true;
        Ok(())
    }

    pub fn react(&mut self, message_id: &str, emoji: &str) -> Result<ReactOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = messaging::react(&mut self.state.messages, message_id, &me, emoji);
        if outcome != ReactOutcome::NotFound {
            self.dirty = true;
        }
        Ok(outcome)
    }

    pub fn create_group(
        &mut self,
        name: &str,
        members: &[String],
        now: DateTime<Utc>,
    ) -> Result<GroupOutcome, SessionError> {
        let me = self.require_active()?.username.clone();
        let outcome = messaging::create_group(
            &mut self.state.groups,
            &mut self.state.messages,
            &me,
            name,
            members,
            now,
        );
        if matches!(outcome, GroupOutcome::Created { .. }) {
            self.dirty = true;
        }
        Ok(outcome)
    }

    // -- notifications & moderation ----------------------------------------

    pub fn mark_notifications_read(&mut self) -> Result<(), SessionError> {
        let me = self.state.current_user.as_ref().ok_or(SessionError::NoSession)?;
        let me = me.username.clone();
        notifications::mark_all_read(&mut self.state.notifications, &me);
        self.dirty = true;
        Ok(())
    }

    /// Record a strike against the current user. Deliberately not behind the
    /// ban gate: the third strike must be recordable, and so must strikes
    /// attempted after it.
    pub fn record_violation(
        &mut self,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ViolationOutcome, SessionError> {
        let user = self.state.current_user.as_mut().ok_or(SessionError::NoSession)?;
        let outcome = moderation::record_violation(user, reason);
        let me = user.username.clone();
        self.upsert_roster();
        self.dirty = true;
        // Warning is on the self-target allowlist, so this always lands.
        notifications::emit(
            &mut self.state.notifications,
            &me,
            &me,
            NotificationKind::Warning,
            &outcome.notice,
            None,
            now,
        );
        Ok(outcome)
    }
}

/// Rewrite every reference to `old` across the whole state. Keeps usernames
/// as the identity key while letting the rare rename stay coherent.
fn rename_everywhere(state: &mut AppState, old: &str, new: &str) {
    let swap = |value: &mut String| {
        if value.as_str() == old {
            *value = new.to_string();
        }
    };
    let swap_list = |list: &mut Vec<String>| list.iter_mut().for_each(swap);

    for user in state.roster.iter_mut() {
        swap(&mut user.username);
        swap_list(&mut user.following);
        swap_list(&mut user.followers);
        swap_list(&mut user.blocked);
    }

    for group in state.groups.iter_mut() {
        swap(&mut group.owner);
        swap_list(&mut group.members);
        if let Some(nick) = group.nicknames.remove(old) {
            group.nicknames.insert(new.to_string(), nick);
        }
    }

    fn rename_comments(comments: &mut [Comment], old: &str, new: &str) {
        for c in comments.iter_mut() {
            if c.author == old {
                c.author = new.to_string();
            }
            rename_comments(&mut c.replies, old, new);
        }
    }

    for post in state.posts.iter_mut() {
        swap(&mut post.author);
        swap_list(&mut post.likes);
        if let Some(orig) = &mut post.original_author {
            swap(orig);
        }
        rename_comments(&mut post.comments, old, new);
    }

    for message in state.messages.iter_mut() {
        swap(&mut message.sender);
        if !message.is_group {
            swap(&mut message.recipient);
        }
        if let Some(reply) = &mut message.reply_to {
            swap(&mut reply.sender);
        }
        for reaction in message.reactions.iter_mut() {
            swap_list(&mut reaction.users);
        }
    }

    for n in state.notifications.iter_mut() {
        swap(&mut n.recipient);
        swap(&mut n.from_user);
    }
}
