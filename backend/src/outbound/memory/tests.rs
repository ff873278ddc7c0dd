//! Behavioural tests for the in-memory device store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::configuration::fixtures::sample_document;
use crate::domain::{Coordinate, DeviceKey, Hemisphere};

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn id() -> DeviceId {
    DeviceId::new("D1").expect("valid id")
}

#[fixture]
async fn store() -> InMemoryDeviceStore {
    let store = InMemoryDeviceStore::default();
    let key = DeviceKey::new(vec![5u8; 16]).expect("valid key");
    store
        .insert_device(DeviceState::provisioned(id(), key))
        .await
        .expect("inserted");
    store
}

fn configuration() -> Configuration {
    Configuration {
        id: ConfigurationId::random(),
        created_at: at(0),
        document: sample_document(),
    }
}

fn reading() -> LocationReading {
    LocationReading::new(
        Coordinate {
            coordinate: 6.2,
            hemisphere: Hemisphere::S,
        },
        Coordinate {
            coordinate: 106.8,
            hemisphere: Hemisphere::E,
        },
        0.9,
    )
    .expect("valid reading")
}

#[rstest]
#[tokio::test]
async fn duplicate_insert_is_rejected(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    let key = DeviceKey::new(vec![6u8; 16]).expect("valid key");
    let err = store
        .insert_device(DeviceState::provisioned(id(), key))
        .await
        .expect_err("duplicate");
    assert_eq!(err, DeviceStoreError::duplicate("D1"));
}

#[rstest]
#[tokio::test]
async fn command_is_delivered_at_most_once(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    store
        .set_pending_command(&id(), DeviceCommand::new("reboot").expect("valid"))
        .await
        .expect("queued");

    let first = store.take_pending_command(&id(), at(1)).await.expect("poll");
    let second = store.take_pending_command(&id(), at(2)).await.expect("poll");

    assert_eq!(first.as_deref(), Some("reboot"));
    assert_eq!(second, None);
    let history = store.command_history(&id()).await.expect("history");
    assert_eq!(
        history,
        vec![CommandRecord {
            command: "reboot".to_owned(),
            delivered_at: at(1),
        }]
    );
}

#[rstest]
#[tokio::test]
async fn concurrent_polls_deliver_once(#[future] store: InMemoryDeviceStore) {
    let store = Arc::new(store.await);
    store
        .set_pending_command(&id(), DeviceCommand::new("reboot").expect("valid"))
        .await
        .expect("queued");

    let polls = (0..8).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.take_pending_command(&id(), at(3)).await })
    });
    let mut delivered = 0;
    for poll in futures::future::join_all(polls).await {
        if poll.expect("task").expect("poll").is_some() {
            delivered += 1;
        }
    }

    assert_eq!(delivered, 1);
    assert_eq!(store.command_history(&id()).await.expect("history").len(), 1);
}

#[rstest]
#[tokio::test]
async fn reissued_command_replaces_undelivered(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    for command in ["reboot", "sleep"] {
        store
            .set_pending_command(&id(), DeviceCommand::new(command).expect("valid"))
            .await
            .expect("queued");
    }
    let taken = store.take_pending_command(&id(), at(1)).await.expect("poll");
    assert_eq!(taken.as_deref(), Some("sleep"));
}

#[rstest]
#[tokio::test]
async fn dirty_flag_is_consumed_once(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    let pushed = configuration();
    store
        .push_configuration(&id(), pushed.clone(), at(0))
        .await
        .expect("pushed");

    let first = store.take_configuration_update(&id()).await.expect("sync");
    let second = store.take_configuration_update(&id()).await.expect("sync");

    assert_eq!(first, ConfigurationSync::Updated(pushed.clone()));
    assert_eq!(second, ConfigurationSync::UpToDate);
    let device = store
        .find_by_device_id(&id())
        .await
        .expect("lookup")
        .expect("device");
    assert_eq!(device.current_config_id(), Some(pushed.id));
    assert!(!device.config_dirty());
}

#[rstest]
#[tokio::test]
async fn pushes_append_history_and_move_pointer(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    let first = configuration();
    let second = configuration();
    store
        .push_configuration(&id(), first.clone(), at(1))
        .await
        .expect("pushed");
    store
        .push_configuration(&id(), second.clone(), at(2))
        .await
        .expect("pushed");

    let history = store.config_history(&id()).await.expect("history");
    let ids: Vec<_> = history.iter().map(|entry| entry.configuration_id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let sync = store.take_configuration_update(&id()).await.expect("sync");
    assert_eq!(sync, ConfigurationSync::Updated(second));
}

#[rstest]
#[tokio::test]
async fn ownerless_device_records_nothing(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    let stored = store
        .record_location(&id(), reading(), at(4))
        .await
        .expect("write");
    assert!(stored.is_none());
    assert!(store.locations_for(&id()).expect("locations").is_empty());
}

#[rstest]
#[tokio::test]
async fn owned_device_updates_pointers(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    let owner = AccountId::random();
    store.set_owner(&id(), owner).await.expect("owner set");

    let location = store
        .record_location(&id(), reading(), at(5))
        .await
        .expect("write")
        .expect("stored");

    assert_eq!(location.owner, owner);
    let device = store
        .find_owned_by_device_id(&id())
        .await
        .expect("lookup")
        .expect("owned device");
    assert_eq!(device.last_known_location(), Some(location.id));
    assert_eq!(device.last_seen_at(), Some(at(5)));
    assert_eq!(store.locations_for(&id()).expect("locations").len(), 1);
}

#[rstest]
#[tokio::test]
async fn owned_lookup_hides_ownerless_devices(#[future] store: InMemoryDeviceStore) {
    let store = store.await;
    assert!(store.find_owned_by_device_id(&id()).await.expect("lookup").is_none());
    assert!(store.find_by_device_id(&id()).await.expect("lookup").is_some());
}

#[rstest]
#[tokio::test]
async fn mutations_on_unknown_device_are_not_found() {
    let store = InMemoryDeviceStore::default();
    let ghost = DeviceId::new("ghost").expect("valid id");
    assert_eq!(
        store.set_owner(&ghost, AccountId::random()).await,
        Err(DeviceStoreError::not_found("ghost"))
    );
    assert_eq!(
        store.take_pending_command(&ghost, at(0)).await,
        Err(DeviceStoreError::not_found("ghost"))
    );
}

#[rstest]
#[tokio::test]
async fn healthy_store_answers_ping(#[future] store: InMemoryDeviceStore) {
    store.await.ping().await.expect("reachable");
}

#[rstest]
#[tokio::test]
async fn poisoned_store_fails_ping() {
    let store = Arc::new(InMemoryDeviceStore::default());
    let poisoner = Arc::clone(&store);
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.state.lock().expect("first lock");
        panic!("poison the store");
    })
    .join();

    let err = store.ping().await.expect_err("poisoned");
    assert!(matches!(err, DeviceStoreError::Query { .. }));
}
