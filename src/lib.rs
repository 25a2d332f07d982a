//! Local-first state core for Mooderia.
//!
//! Everything the UI layer needs that isn't rendering lives here: the
//! persisted data model, schema normalization for records written by older
//! app versions, the sqlite-backed persistence gateway, and the engines that
//! mutate in-memory state (relationships, posts, messaging, notifications,
//! moderation). Local state is the source of truth; the cloud sync and
//! assistant clients are best-effort collaborators that degrade silently.

pub mod cloud;
pub mod config;
mod db;
pub mod genai;
pub mod messaging;
pub mod migrate;
pub mod moderation;
pub mod notifications;
pub mod pet;
pub mod relationships;
pub mod session;
pub mod social;
pub mod store;
pub mod types;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod testing;
