//! Cross-engine flows: signup through feed, safety-checked sends, the ban
//! gate, and persistence round trips with live session mutations.

use chrono::Duration;

use crate::messaging::MessageKind;
use crate::session::{SendResult, Session, SessionError};
use crate::social::HeartOutcome;
use crate::store::SqliteStateStore;
use crate::testing::{seeded_session, ts, MockAssistant};
use crate::types::{NotificationKind, Theme, Visibility};

#[test]
fn heart_flow_notifies_the_author_with_a_snippet() {
    let mut s = seeded_session();
    let post_id = s
        .create_post("checking in after a long week of rain", Visibility::Global, ts())
        .unwrap();

    // Ben opens the app and hearts Ana's post.
    s.log_in("ben").unwrap();
    let outcome = s.heart_post(&post_id, ts()).unwrap();
    assert!(matches!(outcome, HeartOutcome::Liked { .. }));

    let n = s
        .state()
        .notifications
        .iter()
        .find(|n| n.kind == NotificationKind::Heart)
        .expect("author notified");
    assert_eq!(n.recipient, "ana");
    assert_eq!(n.from_user, "ben");
    assert_eq!(n.snippet, "checking in after a ");
    assert_eq!(n.post_id.as_deref(), Some(post_id.as_str()));

    // Back as Ana: one unread, then bulk-read.
    s.log_in("ana").unwrap();
    s.mark_notifications_read().unwrap();
    assert!(s.state().notifications.iter().all(|n| n.recipient != "ana" || n.read));
}

#[test]
fn hearting_your_own_post_stays_silent() {
    let mut s = seeded_session();
    let post_id = s.create_post("note to self", Visibility::Global, ts()).unwrap();
    s.heart_post(&post_id, ts()).unwrap();
    assert!(s.state().notifications.is_empty());
}

#[test]
fn repost_flow_credits_the_original_author() {
    let mut s = seeded_session();
    let post_id = s.create_post("original thought", Visibility::Circle, ts()).unwrap();

    s.log_in("ben").unwrap();
    s.repost(&post_id, ts()).unwrap();

    let clone = &s.state().posts[0];
    assert_eq!(clone.author, "ben");
    assert_eq!(clone.original_author.as_deref(), Some("ana"));
    assert_eq!(clone.visibility, Visibility::Global);

    let n = &s.state().notifications[0];
    assert_eq!((n.kind, n.recipient.as_str()), (NotificationKind::Repost, "ana"));
}

#[tokio::test]
async fn flagged_message_becomes_a_strike_instead_of_a_send() {
    let mut s = seeded_session();
    let assistant = MockAssistant::flagging("harassment");

    let result = s
        .send_message_checked(
            &assistant,
            MessageKind::direct("ben").unwrap(),
            "something nasty",
            None,
            ts(),
        )
        .await
        .unwrap();

    let SendResult::Rejected(outcome) = result else {
        panic!("expected rejection");
    };
    assert_eq!(outcome.warnings, 1);
    assert!(outcome.notice.contains("harassment"));
    assert!(s.state().messages.is_empty(), "nothing was sent");
    assert_eq!(s.state().notifications[0].kind, NotificationKind::Warning);
    assert_eq!(assistant.checked.lock().await.as_slice(), ["something nasty"]);
}

#[tokio::test]
async fn safe_message_sends_and_third_strike_closes_the_gate() {
    let mut s = seeded_session();
    let assistant = MockAssistant::safe();

    let sent = s
        .send_message_checked(&assistant, MessageKind::direct("ben").unwrap(), "hello!", None, ts())
        .await
        .unwrap();
    assert!(matches!(sent, SendResult::Sent { .. }));
    assert_eq!(s.state().messages.len(), 1);

    for _ in 0..3 {
        s.record_violation("spam", ts()).unwrap();
    }
    let refused = s
        .send_message_checked(&assistant, MessageKind::direct("ben").unwrap(), "hello?", None, ts())
        .await;
    assert_eq!(refused, Err(SessionError::Banned));
}

#[test]
fn blocking_cleans_the_feed_and_the_graph() {
    let mut s = seeded_session();
    s.follow("ben", ts()).unwrap();

    s.log_in("ben").unwrap();
    s.create_post("ben's take", Visibility::Global, ts()).unwrap();

    s.log_in("ana").unwrap();
    s.block("ben").unwrap();

    let me = s.current_user().unwrap();
    assert!(me.following.is_empty());
    assert!(me.blocked.contains(&"ben".to_string()));
    assert!(s.feed().iter().all(|p| p.author != "ben"), "blocked author filtered");

    let ben = s.state().roster.iter().find(|u| u.username == "ben").unwrap();
    assert!(ben.followers.is_empty());
}

#[tokio::test]
async fn session_mutations_survive_a_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let store = SqliteStateStore::new(path.to_str().unwrap()).await.unwrap();

    let mut s = Session::new(store.load(ts()).await.unwrap());
    s.sign_up("ana", "Ana", "ana@example.com", ts()).unwrap();
    s.sign_up("ben", "Ben", "ben@example.com", ts()).ok();
    s.log_in("ana").unwrap();
    let post_id = s.create_post("first!", Visibility::Global, ts()).unwrap();
    s.check_in_mood("happy", 4, ts().date_naive()).unwrap();
    s.set_theme(Theme::Dark);
    s.send_message(MessageKind::direct("ben").unwrap(), "welcome", None, ts())
        .unwrap();

    assert!(s.take_dirty());
    store.save(s.state()).await.unwrap();

    // Fresh process: hydrate at the same instant (no decay drift) and check
    // the logical collections came back intact.
    let reloaded = store.load(ts()).await.unwrap();
    assert_eq!(reloaded, *s.state());
    assert_eq!(reloaded.posts[0].id, post_id);
    assert_eq!(reloaded.current_user.as_ref().unwrap().mood_streak, 1);
    assert_eq!(reloaded.theme, Theme::Dark);
}

#[tokio::test]
async fn offline_decay_applies_on_reload_after_time_passes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let store = SqliteStateStore::new(path.to_str().unwrap()).await.unwrap();

    let mut s = Session::new(store.load(ts()).await.unwrap());
    s.sign_up("ana", "Ana", "ana@example.com", ts()).unwrap();
    store.save(s.state()).await.unwrap();

    let later = store.load(ts() + Duration::minutes(200)).await.unwrap();
    let user = later.current_user.unwrap();
    assert_eq!(user.pet_hunger, 70.0);
    assert_eq!(user.pet_thirst, 60.0);
    assert_eq!(user.pet_rest, 80.0);
}

#[test]
fn group_chat_flow_announces_and_scopes_visibility() {
    let mut s = seeded_session();
    let crate::messaging::GroupOutcome::Created { group_id } =
        s.create_group("night owls", &["ben".to_string()], ts()).unwrap()
    else {
        panic!("expected Created");
    };

    s.send_message(MessageKind::group(&group_id).unwrap(), "welcome owls", None, ts())
        .unwrap();

    let state = s.state();
    assert_eq!(state.messages.len(), 2, "announcement plus the first message");
    assert!(state.messages[0].is_system);
    assert!(crate::messaging::can_see(&state.messages[1], "ben", &state.groups));
    assert!(!crate::messaging::can_see(&state.messages[1], "cleo", &state.groups));
}
