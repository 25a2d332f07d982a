//! Follow/unfollow and block/unblock over the roster.
//!
//! Every edit touches exactly two roster entries and keeps the two-sided
//! invariant: `target ∈ actor.following` iff `actor ∈ target.followers`.

use crate::types::{insert_unique, remove_value, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// Edge added on both sides; caller should notify the target.
    Followed,
    /// Edge removed on both sides; no notification.
    Unfollowed,
    SelfTarget,
    UnknownUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Blocked,
    SelfTarget,
    UnknownUser,
}

fn index_of(roster: &[User], username: &str) -> Option<usize> {
    roster.iter().position(|u| u.username == username)
}

/// Toggle the follow edge between `actor` and `target`.
pub fn follow(roster: &mut [User], actor: &str, target: &str) -> FollowOutcome {
    if actor == target {
        return FollowOutcome::SelfTarget;
    }
    let (Some(a), Some(t)) = (index_of(roster, actor), index_of(roster, target)) else {
        return FollowOutcome::UnknownUser;
    };

    if roster[a].following.iter().any(|u| u == target) {
        remove_value(&mut roster[a].following, target);
        remove_value(&mut roster[t].followers, actor);
        FollowOutcome::Unfollowed
    } else {
        insert_unique(&mut roster[a].following, target);
        insert_unique(&mut roster[t].followers, actor);
        FollowOutcome::Followed
    }
}

/// Record a block and sever the follow edge in both directions,
/// unconditionally. Blocking never notifies.
pub fn block(roster: &mut [User], actor: &str, target: &str) -> BlockOutcome {
    if actor == target {
        return BlockOutcome::SelfTarget;
    }
    let (Some(a), Some(t)) = (index_of(roster, actor), index_of(roster, target)) else {
        return BlockOutcome::UnknownUser;
    };

    insert_unique(&mut roster[a].blocked, target);
    remove_value(&mut roster[a].following, target);
    remove_value(&mut roster[a].followers, target);
    remove_value(&mut roster[t].following, actor);
    remove_value(&mut roster[t].followers, actor);
    BlockOutcome::Blocked
}

/// Remove the block mark only. Severed follow edges are not restored.
pub fn unblock(roster: &mut [User], actor: &str, target: &str) -> bool {
    match index_of(roster, actor) {
        Some(a) => remove_value(&mut roster[a].blocked, target),
        None => false,
    }
}
