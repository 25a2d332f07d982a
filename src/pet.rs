//! Pet clock: offline stat decay and bounded stat/experience updates.
//!
//! Decay runs exactly once per load from the persistence gateway (not per
//! render); every in-app mutation goes through [`update_stats`] so clamping
//! and level rollover happen in one place.

use chrono::{DateTime, Utc};

use crate::types::User;

/// Per-minute decay rates while the pet is awake.
const HUNGER_PER_MIN: f64 = 0.15;
const THIRST_PER_MIN: f64 = 0.2;
const REST_PER_MIN: f64 = 0.1;

/// Experience required to clear `level`: floor(100 * 1.5^(level-1)).
pub fn exp_needed(level: u32) -> u32 {
    (100.0 * 1.5_f64.powi(level as i32 - 1)).floor() as u32
}

/// Bounded deltas applied by feeding, games, sleep and so on.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatDelta {
    pub hunger: f64,
    pub thirst: f64,
    pub rest: f64,
    pub coins: i64,
    pub exp: u32,
}

/// Apply wall-clock decay for the whole window since `pet_last_update`.
///
/// Whole elapsed minutes only. A sleeping pet (`pet_sleep_until` in the
/// future) keeps losing hunger and thirst but not rest; an expired sleep is
/// cleared and rest decays normally.
pub fn apply_offline_decay(user: &mut User, now: DateTime<Utc>) {
    let minutes = (now - user.pet_last_update).num_minutes().max(0) as f64;
    if minutes == 0.0 {
        return;
    }

    let asleep = match user.pet_sleep_until {
        Some(until) if until > now => true,
        Some(_) => {
            user.pet_sleep_until = None;
            false
        }
        None => false,
    };

    user.pet_hunger = (user.pet_hunger - minutes * HUNGER_PER_MIN).clamp(0.0, 100.0);
    user.pet_thirst = (user.pet_thirst - minutes * THIRST_PER_MIN).clamp(0.0, 100.0);
    if !asleep {
        user.pet_rest = (user.pet_rest - minutes * REST_PER_MIN).clamp(0.0, 100.0);
    }
    user.pet_last_update = now;
}

/// Apply a bounded stat update and roll over any level-ups.
///
/// Stats clamp to [0, 100], coins floor at 0. The rollover loops: a single
/// large reward can cross several thresholds.
pub fn update_stats(user: &mut User, delta: StatDelta) {
    user.pet_hunger = (user.pet_hunger + delta.hunger).clamp(0.0, 100.0);
    user.pet_thirst = (user.pet_thirst + delta.thirst).clamp(0.0, 100.0);
    user.pet_rest = (user.pet_rest + delta.rest).clamp(0.0, 100.0);
    user.mood_coins = (user.mood_coins + delta.coins).max(0);

    user.pet_exp += delta.exp;
    while user.pet_exp >= exp_needed(user.pet_level) {
        user.pet_exp -= exp_needed(user.pet_level);
        user.pet_level += 1;
    }
}

/// True if `game` is still cooling down at `now`.
pub fn cooldown_active(user: &User, game: &str, now: DateTime<Utc>) -> bool {
    user.game_cooldowns
        .get(game)
        .is_some_and(|until| *until > now)
}

pub fn set_cooldown(user: &mut User, game: &str, until: DateTime<Utc>) {
    user.game_cooldowns.insert(game.to_string(), until);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_at(now: DateTime<Utc>) -> User {
        User::new("ana", "Ana", "ana@example.com", now)
    }

    fn now() -> DateTime<Utc> {
        "2026-08-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn exp_thresholds_match_the_curve() {
        assert_eq!(exp_needed(1), 100);
        assert_eq!(exp_needed(2), 150);
        assert_eq!(exp_needed(3), 225);
    }

    #[test]
    fn awake_decay_hits_all_three_gauges() {
        let mut u = user_at(now());
        apply_offline_decay(&mut u, now() + Duration::minutes(100));
        assert_eq!(u.pet_hunger, 85.0);
        assert_eq!(u.pet_thirst, 80.0);
        assert_eq!(u.pet_rest, 90.0);
        assert_eq!(u.pet_last_update, now() + Duration::minutes(100));
    }

    #[test]
    fn decay_uses_whole_minutes_only() {
        let mut u = user_at(now());
        apply_offline_decay(&mut u, now() + Duration::seconds(90));
        assert_eq!(u.pet_hunger, 100.0 - HUNGER_PER_MIN);
    }

    #[test]
    fn sleeping_pet_keeps_its_rest() {
        let mut u = user_at(now());
        u.pet_sleep_until = Some(now() + Duration::hours(8));
        apply_offline_decay(&mut u, now() + Duration::minutes(60));
        assert_eq!(u.pet_rest, 100.0);
        assert!(u.pet_hunger < 100.0);
        assert!(u.pet_sleep_until.is_some());
    }

    #[test]
    fn expired_sleep_is_cleared_and_rest_decays() {
        let mut u = user_at(now());
        u.pet_sleep_until = Some(now() + Duration::minutes(5));
        apply_offline_decay(&mut u, now() + Duration::minutes(60));
        assert!(u.pet_sleep_until.is_none());
        assert_eq!(u.pet_rest, 94.0);
    }

    #[test]
    fn gauges_clamp_at_zero() {
        let mut u = user_at(now());
        apply_offline_decay(&mut u, now() + Duration::days(30));
        assert_eq!(u.pet_hunger, 0.0);
        assert_eq!(u.pet_thirst, 0.0);
        assert_eq!(u.pet_rest, 0.0);
    }

    #[test]
    fn single_threshold_rollover() {
        let mut u = user_at(now());
        u.pet_exp = 95;
        update_stats(&mut u, StatDelta { exp: 10, ..Default::default() });
        assert_eq!(u.pet_level, 2);
        assert_eq!(u.pet_exp, 5);
    }

    #[test]
    fn one_reward_can_cross_two_thresholds() {
        let mut u = user_at(now());
        u.pet_exp = 240;
        update_stats(&mut u, StatDelta { exp: 20, ..Default::default() });
        assert_eq!(u.pet_level, 3);
        assert_eq!(u.pet_exp, 10);
    }

    #[test]
    fn coins_floor_at_zero_and_stats_clamp() {
        let mut u = user_at(now());
        u.mood_coins = 5;
        update_stats(
            &mut u,
            StatDelta { hunger: 50.0, coins: -20, ..Default::default() },
        );
        assert_eq!(u.mood_coins, 0);
        assert_eq!(u.pet_hunger, 100.0);
    }

    #[test]
    fn cooldowns_expire() {
        let mut u = user_at(now());
        set_cooldown(&mut u, "bubble_pop", now() + Duration::minutes(10));
        assert!(cooldown_active(&u, "bubble_pop", now()));
        assert!(!cooldown_active(&u, "bubble_pop", now() + Duration::minutes(11)));
        assert!(!cooldown_active(&u, "memory_match", now()));
    }
}
