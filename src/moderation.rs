//! Violation/ban governor: a 3-strike counter per user.
//!
//! The governor only decides; it performs no I/O and emits nothing itself.
//! The session layer emits the warning self-notification and surfaces the
//! blocking acknowledgment, and the session's ban gate is the single place
//! that refuses further interaction once `is_banned` flips.

use crate::types::{User, BAN_THRESHOLD};

/// What the caller must do after a strike: notify and show the blocking
/// modal text, and stop dispatching if `banned` flipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationOutcome {
    pub warnings: u8,
    pub banned: bool,
    /// Text for the blocking acknowledgment modal.
    pub notice: String,
}

/// Record one strike. Monotonic: there is no decrement and `is_banned` never
/// clears once set.
pub fn record_violation(user: &mut User, reason: &str) -> ViolationOutcome {
    user.warnings = user.warnings.saturating_add(1).min(BAN_THRESHOLD);
    if user.warnings >= BAN_THRESHOLD {
        user.is_banned = true;
    }

    let notice = if user.is_banned {
        format!(
            "Your account has been banned after {} violations. Last violation: {}",
            BAN_THRESHOLD, reason
        )
    } else {
        format!(
            "Community guidelines violation ({}). Warning {} of {}.",
            reason, user.warnings, BAN_THRESHOLD
        )
    };

    ViolationOutcome {
        warnings: user.warnings,
        banned: user.is_banned,
        notice,
    }
}
