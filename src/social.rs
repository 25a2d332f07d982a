//! Social content engine: posts, hearts, reposts, and the recursive
//! comment/reply tree.
//!
//! Engines here are total functions over the post collection; "not found"
//! and "not the author" are outcomes, not errors. Notification emission is
//! the session layer's job — operations return whatever the emitter needs.

use chrono::{DateTime, Utc};

use crate::types::{insert_unique, new_id, remove_value, Comment, Post, User, Visibility};

/// Length of the content excerpt attached to heart/repost notifications.
const SNIPPET_CHARS: usize = 20;

pub fn snippet_of(content: &str) -> String {
    content.chars().take(SNIPPET_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartOutcome {
    /// Like transition; notify `author` with `snippet`.
    Liked { author: String, snippet: String },
    Unliked,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepostOutcome {
    /// Notify `original_author`; `post_id` is the new record.
    Created { post_id: String, original_author: String },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    /// Top-level comment added; notify the post author.
    Added { comment_id: String, post_author: String },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    Hearted,
    /// Reply appended; notify the parent comment's author.
    Replied { reply_id: String, parent_author: String },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    Done,
    NotFound,
    /// Author check is enforced here in the engine, not just by hiding UI
    /// controls.
    NotAuthor,
}

/// Create a post at the front of the collection (most-recent-first).
pub fn create_post(
    posts: &mut Vec<Post>,
    author: &str,
    content: &str,
    visibility: Visibility,
    now: DateTime<Utc>,
) -> String {
    let id = new_id();
    posts.insert(
        0,
        Post {
            id: id.clone(),
            author: author.to_string(),
            content: content.to_string(),
            likes: Vec::new(),
            comments: Vec::new(),
            timestamp: now,
            visibility,
            is_repost: false,
            original_author: None,
        },
    );
    id
}

/// Toggle `actor`'s heart on a post.
pub fn heart(posts: &mut [Post], post_id: &str, actor: &str) -> HeartOutcome {
    let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
        return HeartOutcome::NotFound;
    };
    if insert_unique(&mut post.likes, actor) {
        HeartOutcome::Liked {
            author: post.author.clone(),
            snippet: snippet_of(&post.content),
        }
    } else {
        remove_value(&mut post.likes, actor);
        HeartOutcome::Unliked
    }
}

/// Clone a post's content into a fresh record owned by `actor`.
///
/// A repost is a copy, not a reference: later edits to the original don't
/// propagate. Visibility is forced to Global.
pub fn repost(posts: &mut Vec<Post>, post_id: &str, actor: &str, now: DateTime<Utc>) -> RepostOutcome {
    let Some(original) = posts.iter().find(|p| p.id == post_id) else {
        return RepostOutcome::NotFound;
    };
    let original_author = original.author.clone();
    let content = original.content.clone();

    let id = new_id();
    posts.insert(
        0,
        Post {
            id: id.clone(),
            author: actor.to_string(),
            content,
            likes: Vec::new(),
            comments: Vec::new(),
            timestamp: now,
            visibility: Visibility::Global,
            is_repost: true,
            original_author: Some(original_author.clone()),
        },
    );
    RepostOutcome::Created { post_id: id, original_author }
}

/// Append a top-level comment.
pub fn comment(
    posts: &mut [Post],
    post_id: &str,
    author: &str,
    text: &str,
    now: DateTime<Utc>,
) -> CommentOutcome {
    let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
        return CommentOutcome::NotFound;
    };
    let id = new_id();
    post.comments.push(Comment {
        id: id.clone(),
        author: author.to_string(),
        text: text.to_string(),
        hearts: 0,
        timestamp: now,
        replies: Vec::new(),
    });
    CommentOutcome::Added { comment_id: id, post_author: post.author.clone() }
}

pub enum CommentAction<'a> {
    /// Increments the counter by exactly 1 every call; hearts on comments
    /// are not a per-user toggle.
    Heart,
    Reply { author: &'a str, text: &'a str },
}

/// Depth-first search of the comment tree for `id`, continuing into sibling
/// subtrees after a non-match.
fn find_comment_mut<'a>(comments: &'a mut [Comment], id: &str) -> Option<&'a mut Comment> {
    for c in comments.iter_mut() {
        if c.id == id {
            return Some(c);
        }
        if let Some(found) = find_comment_mut(&mut c.replies, id) {
            return Some(found);
        }
    }
    None
}

/// Heart or reply to a comment nested at any depth.
pub fn comment_interaction(
    posts: &mut [Post],
    post_id: &str,
    comment_id: &str,
    action: CommentAction<'_>,
    now: DateTime<Utc>,
) -> InteractionOutcome {
    let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
        return InteractionOutcome::NotFound;
    };
    let Some(target) = find_comment_mut(&mut post.comments, comment_id) else {
        return InteractionOutcome::NotFound;
    };
    match action {
        CommentAction::Heart => {
            target.hearts += 1;
            InteractionOutcome::Hearted
        }
        CommentAction::Reply { author, text } => {
            let id = new_id();
            let parent_author = target.author.clone();
            target.replies.push(Comment {
                id: id.clone(),
                author: author.to_string(),
                text: text.to_string(),
                hearts: 0,
                timestamp: now,
                replies: Vec::new(),
            });
            InteractionOutcome::Replied { reply_id: id, parent_author }
        }
    }
}

/// Replace a post's content in place. Author-only.
pub fn edit_post(posts: &mut [Post], post_id: &str, actor: &str, content: &str) -> PostOutcome {
    let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
        return PostOutcome::NotFound;
    };
    if post.author != actor {
        return PostOutcome::NotAuthor;
    }
    post.content = content.to_string();
    PostOutcome::Done
}

/// Remove a post by id. Author-only.
pub fn delete_post(posts: &mut Vec<Post>, post_id: &str, actor: &str) -> PostOutcome {
    let Some(idx) = posts.iter().position(|p| p.id == post_id) else {
        return PostOutcome::NotFound;
    };
    if posts[idx].author != actor {
        return PostOutcome::NotAuthor;
    }
    posts.remove(idx);
    PostOutcome::Done
}

/// Feed filter: hides authors the viewer has blocked, and limits Circle
/// posts to follow relations (either direction) plus the viewer's own.
pub fn visible_to(post: &Post, viewer: &User) -> bool {
    if viewer.blocked.iter().any(|b| *b == post.author) {
        return false;
    }
    match post.visibility {
        Visibility::Global => true,
        Visibility::Circle => {
            post.author == viewer.username
                || viewer.following.iter().any(|u| *u == post.author)
                || viewer.followers.iter().any(|u| *u == post.author)
        }
    }
}
