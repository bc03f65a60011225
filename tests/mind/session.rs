use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use hybrid_ops::{
    mind::MindErrorKind,
    session::{STALE_SESSION_AFTER, SessionManager},
};
use tokio_util::sync::CancellationToken;

use crate::{MindFixture, VALID_CONFIG_YAML, no_env};

#[tokio::test]
async fn given_two_sessions_when_created_then_they_share_one_mind() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);

    let first = sessions.get_session("a").await.expect("session a");
    let second = sessions.get_session("b").await.expect("session b");

    assert!(Arc::ptr_eq(&first.mind, &second.mind));
    assert!(first.mind.is_loaded());
    assert_eq!(sessions.session_count(), 2);
}

#[tokio::test]
async fn given_existing_session_when_requested_again_then_request_count_grows() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);

    let created = sessions.get_session("a").await.expect("session a");
    let repeated = sessions.get_session("a").await.expect("session a again");
    let third = sessions.get_session("a").await.expect("session a third time");

    assert_eq!(created.request_count, 0);
    assert_eq!(repeated.request_count, 1);
    assert_eq!(third.request_count, 2);
    assert_eq!(created.created_at, third.created_at);
    assert_eq!(sessions.session_count(), 1);
}

#[tokio::test]
async fn given_session_when_ended_then_only_first_end_reports_removal() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);
    sessions.get_session("a").await.expect("session a");

    assert!(sessions.end_session("a"));
    assert!(!sessions.end_session("a"));
    assert_eq!(sessions.session_count(), 0);
}

#[tokio::test]
async fn given_idle_sessions_when_swept_after_eight_hours_then_they_are_removed() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);
    sessions.get_session("a").await.expect("session a");
    sessions.get_session("b").await.expect("session b");

    assert_eq!(sessions.cleanup_stale_sessions_at(Instant::now()), 0);
    let later = Instant::now() + STALE_SESSION_AFTER + Duration::from_secs(60 * 60);
    assert_eq!(sessions.cleanup_stale_sessions_at(later), 2);
    assert_eq!(sessions.session_count(), 0);
    assert!(sessions.mind().is_loaded());
}

#[tokio::test]
async fn given_active_sessions_when_destroyed_then_mind_is_reset() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);
    sessions.get_session("a").await.expect("session a");

    sessions.destroy_all();

    assert_eq!(sessions.session_count(), 0);
    assert!(!sessions.mind().is_loaded());
    let stats = sessions.memory_stats();
    assert_eq!(stats.active_sessions, 0);
    assert!(!stats.shared_mind_loaded);
}

#[tokio::test]
async fn given_loaded_sessions_when_memory_stats_requested_then_counts_match() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);
    sessions.get_session("a").await.expect("session a");

    let stats = sessions.memory_stats();

    assert_eq!(stats.active_sessions, 1);
    assert!(stats.shared_mind_loaded);
}

#[tokio::test]
async fn given_missing_mind_when_session_requested_then_error_and_no_session() {
    let fixture = MindFixture::empty().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);

    let err = match sessions.get_session("a").await {
        Ok(_) => panic!("session must not be created without a mind"),
        Err(err) => err,
    };

    assert_eq!(err.kind, MindErrorKind::LoadFailed);
    assert_eq!(sessions.session_count(), 0);
}

#[tokio::test]
async fn given_running_sweeper_when_cancelled_then_task_finishes() {
    let fixture = MindFixture::new().with_config(VALID_CONFIG_YAML);
    let (_store, loader) = fixture.loader(no_env());
    let sessions = SessionManager::new(loader);
    let cancel = CancellationToken::new();

    let sweeper = sessions.spawn_sweeper(Duration::from_millis(10), cancel.clone());
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(2), sweeper)
        .await
        .expect("sweeper should stop")
        .expect("sweeper should not panic");
}
