//! Test infrastructure: seeded sessions and a scripted assistant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::genai::{AssistantProvider, SafetyVerdict};
use crate::session::Session;
use crate::types::{AppState, User};

/// Fixed wall-clock instant used across tests.
pub const NOW: &str = "2026-08-01T12:00:00Z";

pub fn ts() -> DateTime<Utc> {
    NOW.parse().unwrap()
}

pub fn sample_user(name: &str) -> User {
    User::new(
        name,
        &format!("{}{}", name[..1].to_uppercase(), &name[1..]),
        &format!("{}@example.com", name),
        ts(),
    )
}

/// A session with `ana` (current), `ben` and `cleo` on the roster and
/// nothing else. Dirty flag starts clear.
pub fn seeded_session() -> Session {
    let ana = sample_user("ana");
    let state = AppState {
        current_user: Some(ana.clone()),
        roster: vec![ana, sample_user("ben"), sample_user("cleo")],
        ..Default::default()
    };
    Session::new(state)
}

/// Scripted assistant: pops verdicts FIFO, defaulting to "safe" when the
/// queue is empty. Records every checked text.
pub struct MockAssistant {
    verdicts: Mutex<Vec<SafetyVerdict>>,
    pub checked: Mutex<Vec<String>>,
}

impl MockAssistant {
    pub fn safe() -> Self {
        Self::with_verdicts(Vec::new())
    }

    pub fn with_verdicts(verdicts: Vec<SafetyVerdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts),
            checked: Mutex::new(Vec::new()),
        }
    }

    pub fn flagging(reason: &str) -> Self {
        Self::with_verdicts(vec![SafetyVerdict {
            is_inappropriate: true,
            reason: Some(reason.to_string()),
        }])
    }
}

#[async_trait]
impl AssistantProvider for MockAssistant {
    async fn check_content_safety(&self, text: &str) -> SafetyVerdict {
        self.checked.lock().await.push(text.to_string());
        let mut verdicts = self.verdicts.lock().await;
        if verdicts.is_empty() {
            SafetyVerdict::default()
        } else {
            verdicts.remove(0)
        }
    }

    async fn conversational_reply(&self, _text: &str) -> String {
        "Mock reply".to_string()
    }
}
