//! Schema normalization for persisted user records.
//!
//! There is no version field in stored state; older app versions simply wrote
//! fewer fields. Instead of presence checks scattered at call sites, every
//! record loaded from storage (or fetched from the cloud) is decoded into the
//! permissive [`RawUser`] shape and converted into the strict current
//! [`User`] with explicit default-filling. Safe to run any number of times:
//! `normalize(normalize(u)) == normalize(u)`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::types::{MoodEntry, User, DEFAULT_MOOD_COINS};

/// Hard-coded identity override: this one email is force-assigned the mayor
/// title on every load. A one-off, not a general title mechanism.
const MAYOR_EMAIL: &str = "mayor@mooderia.app";
const MAYOR_TITLE: &str = "Mayor of Mooderia";

/// Every field optional; aliases cover the key spellings older app versions
/// persisted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    username: Option<String>,
    #[serde(alias = "displayName")]
    display_name: Option<String>,
    email: Option<String>,
    title: Option<String>,
    following: Option<Vec<String>>,
    followers: Option<Vec<String>>,
    #[serde(alias = "blockedUsers")]
    blocked: Option<Vec<String>>,
    #[serde(alias = "moodHistory")]
    mood_history: Option<Vec<MoodEntry>>,
    #[serde(alias = "moodCoins")]
    mood_coins: Option<i64>,
    #[serde(alias = "moodStreak")]
    mood_streak: Option<u32>,
    warnings: Option<u8>,
    #[serde(alias = "isBanned")]
    is_banned: Option<bool>,
    #[serde(alias = "petHunger")]
    pet_hunger: Option<f64>,
    #[serde(alias = "petThirst")]
    pet_thirst: Option<f64>,
    #[serde(alias = "petRest")]
    pet_rest: Option<f64>,
    #[serde(alias = "petLevel")]
    pet_level: Option<u32>,
    #[serde(alias = "petExp")]
    pet_exp: Option<u32>,
    #[serde(alias = "petLastUpdate")]
    pet_last_update: Option<DateTime<Utc>>,
    #[serde(alias = "petSleepUntil")]
    pet_sleep_until: Option<DateTime<Utc>>,
    #[serde(alias = "petEmoji")]
    pet_emoji: Option<String>,
    #[serde(alias = "petName")]
    pet_name: Option<String>,
    #[serde(alias = "petHasBeenChosen", alias = "pet_chosen")]
    pet_has_been_chosen: Option<bool>,
    #[serde(alias = "gameCooldowns")]
    game_cooldowns: Option<HashMap<String, DateTime<Utc>>>,
}

/// Upgrade a persisted record of unknown shape into the current [`User`].
///
/// Pure and total: a record that doesn't decode at all (wrong types, not an
/// object) falls back to all-defaults rather than failing. Present values are
/// never overwritten — note the nullish coalescing on `mood_coins`, where an
/// explicit 0 balance must survive while an absent field gets the signup
/// grant.
pub fn normalize(raw: &Value, now: DateTime<Utc>) -> User {
    let raw: RawUser = serde_json::from_value(raw.clone()).unwrap_or_default();

    let warnings = raw.warnings.unwrap_or(0);
    let mut user = User {
        username: raw.username.unwrap_or_default(),
        display_name: raw.display_name.unwrap_or_default(),
        email: raw.email.unwrap_or_default(),
        title: raw.title,
        following: raw.following.unwrap_or_default(),
        followers: raw.followers.unwrap_or_default(),
        blocked: raw.blocked.unwrap_or_default(),
        mood_history: raw.mood_history.unwrap_or_default(),
        mood_coins: raw.mood_coins.unwrap_or(DEFAULT_MOOD_COINS),
        mood_streak: raw.mood_streak.unwrap_or(0),
        warnings,
        // Monotonic: once banned, a stale warnings count never un-bans.
        is_banned: raw.is_banned.unwrap_or(false)
            || warnings >= crate::types::BAN_THRESHOLD,
        pet_hunger: raw.pet_hunger.unwrap_or(100.0),
        pet_thirst: raw.pet_thirst.unwrap_or(100.0),
        pet_rest: raw.pet_rest.unwrap_or(100.0),
        pet_level: raw.pet_level.unwrap_or(1).max(1),
        pet_exp: raw.pet_exp.unwrap_or(0),
        pet_last_update: raw.pet_last_update.unwrap_or(now),
        pet_sleep_until: raw.pet_sleep_until,
        pet_emoji: raw.pet_emoji.unwrap_or_default(),
        pet_name: raw.pet_name.unwrap_or_default(),
        pet_chosen: raw.pet_has_been_chosen.unwrap_or(false),
        game_cooldowns: raw.game_cooldowns.unwrap_or_default(),
    };

    if user.email == MAYOR_EMAIL {
        user.title = Some(MAYOR_TITLE.to_string());
    }

    user
}
