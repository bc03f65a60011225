use std::{
    fs,
    sync::{Arc, Mutex},
};

use hybrid_ops::config::{ConfigDocument, ConfigStore, ConfigSubscriber, ReloadOutcome};

use crate::{VALID_CONFIG_YAML, temp_config};

#[test]
fn given_valid_file_when_get_twice_then_same_cached_document_is_returned() {
    let store = ConfigStore::without_file_watching(temp_config(VALID_CONFIG_YAML));

    let first = store.get().expect("config should load");
    let second = store.get().expect("config should be cached");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.value["version"], "1.0");
    assert_eq!(first.fingerprint.len(), 64);
}

#[test]
fn given_missing_file_when_get_then_none_and_nothing_cached() {
    let path = std::env::temp_dir().join(format!("hybrid-ops-missing-{}.yaml", uuid::Uuid::now_v7()));
    let store = ConfigStore::without_file_watching(path);

    assert!(store.get().is_none());
    assert!(!store.is_loaded());
}

#[tokio::test]
async fn given_cached_config_when_file_is_broken_and_reconciled_then_previous_document_is_kept() {
    let path = temp_config(VALID_CONFIG_YAML);
    let store = ConfigStore::without_file_watching(&path);
    let before = store.get().expect("config should load");

    fs::write(&path, "version: [unclosed\n  heuristics: {").expect("config should be overwritten");
    let outcome = store.reconcile().await;

    assert_eq!(outcome, ReloadOutcome::KeptPrevious);
    let after = store.get().expect("cache should survive");
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn given_unchanged_content_when_reconciled_then_subscribers_are_not_notified() {
    let store = ConfigStore::without_file_watching(temp_config(VALID_CONFIG_YAML));
    store.get().expect("config should load");
    let calls = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&calls);
    let subscriber: Arc<dyn ConfigSubscriber> = Arc::new(
        move |_new: &Arc<ConfigDocument>, _old: Option<&Arc<ConfigDocument>>| {
            *counter.lock().expect("lock") += 1;
        },
    );
    store.watch(subscriber);

    assert_eq!(store.reconcile().await, ReloadOutcome::Unchanged);
    assert_eq!(*calls.lock().expect("lock"), 0);
}

#[tokio::test]
async fn given_changed_file_when_reconciled_then_subscribers_receive_new_and_old_documents() {
    let path = temp_config(VALID_CONFIG_YAML);
    let store = ConfigStore::without_file_watching(&path);
    let original = store.get().expect("config should load");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscriber: Arc<dyn ConfigSubscriber> = Arc::new(
        move |new: &Arc<ConfigDocument>, old: Option<&Arc<ConfigDocument>>| {
            sink.lock().expect("lock").push((
                new.value["version"].clone(),
                old.map(|old| old.value["version"].clone()),
            ));
        },
    );
    store.watch(subscriber);
    assert_eq!(store.subscriber_count(), 1);
    assert!(!store.is_watching());

    fs::write(&path, VALID_CONFIG_YAML.replace("\"1.0\"", "\"1.1\""))
        .expect("config should be overwritten");
    let outcome = store.reconcile().await;

    assert_eq!(outcome, ReloadOutcome::Applied { notified: 1 });
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "1.1");
    assert_eq!(seen[0].1.as_ref(), Some(&original.value["version"]));
}

#[tokio::test]
async fn given_panicking_subscriber_when_reconciled_then_other_subscribers_still_run() {
    let path = temp_config(VALID_CONFIG_YAML);
    let store = ConfigStore::without_file_watching(&path);
    store.get().expect("config should load");

    let calls = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&calls);
    let panicking: Arc<dyn ConfigSubscriber> = Arc::new(
        |_new: &Arc<ConfigDocument>, _old: Option<&Arc<ConfigDocument>>| {
            panic!("subscriber failure");
        },
    );
    let counting: Arc<dyn ConfigSubscriber> = Arc::new(
        move |_new: &Arc<ConfigDocument>, _old: Option<&Arc<ConfigDocument>>| {
            *counter.lock().expect("lock") += 1;
        },
    );
    store.watch(panicking);
    store.watch(counting);

    fs::write(&path, VALID_CONFIG_YAML.replace("0.75", "0.8")).expect("config should be overwritten");
    let outcome = store.reconcile().await;

    assert_eq!(outcome, ReloadOutcome::Applied { notified: 1 });
    assert_eq!(*calls.lock().expect("lock"), 1);
}

#[test]
fn given_watching_store_when_unwatch_then_subscribers_are_forgotten() {
    let store = ConfigStore::without_file_watching(temp_config(VALID_CONFIG_YAML));
    let subscriber: Arc<dyn ConfigSubscriber> =
        Arc::new(|_new: &Arc<ConfigDocument>, _old: Option<&Arc<ConfigDocument>>| {});
    store.watch(subscriber);

    store.unwatch();

    assert_eq!(store.subscriber_count(), 0);
}
