//! Integration tests for `DieselDeviceStore` against embedded PostgreSQL.
//!
//! These exercise the row-locked transactions behind the device protocol:
//! compare-and-clear of pending commands, one-shot consumption of the
//! configuration dirty flag, ownership re-checks on ingest and the
//! configuration push unit.

use chrono::{DateTime, TimeZone, Utc};
use diesel::pg::PgConnection;
use diesel::{Connection, RunQueryDsl};
use futures::future::join_all;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use serde_json::json;
use tokio::runtime::Runtime;

use tracker_backend::domain::ports::{
    ConfigurationSync, DeviceDirectory, DeviceStateRepository, DeviceStoreError,
    FleetAdministrationRepository, StoreHealth,
};
use tracker_backend::domain::{
    AccountId, Configuration, ConfigurationDocument, ConfigurationId, Coordinate, DeviceCommand,
    DeviceId, DeviceKey, DeviceState, Hemisphere, LocationReading,
};
use tracker_backend::outbound::persistence::{DbPool, DieselDeviceStore, PoolConfig};

mod support;

use support::{handle_cluster_setup_failure, migrated_database};

struct TestContext {
    runtime: Runtime,
    store: DieselDeviceStore,
    database_url: String,
    _database: TemporaryDatabase,
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn d1() -> DeviceId {
    DeviceId::new("D1").expect("valid id")
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
        1.1,
    )
    .expect("valid reading")
}

fn configuration(minute: u32) -> Configuration {
    let document: ConfigurationDocument = serde_json::from_value(json!({
        "initCommand": {
            "deviceCheck": { "command": "AT", "response": "OK" },
            "simCheck": { "command": "AT+CPIN?", "response": "+CPIN: READY" },
            "signalCheck": { "command": "AT+CSQ", "response": "+CSQ" },
            "regCheck": { "command": "AT+CREG?", "response": "+CREG: 0,1" },
            "gprsRegCheck": { "command": "AT+CGREG?", "response": "+CGREG: 0,1" },
            "gprsCheck": { "command": "AT+CGATT?", "response": "+CGATT: 1" },
            "operatorCheck": { "command": "AT+COPS?", "response": "+COPS" }
        },
        "gpsThreshold": { "satellite": 5, "hdop": 2.0, "distance": 25.0 },
        "espConfig": {
            "timeInterval": 60,
            "GPS": { "moduleName": "NEO-6M", "baudRate": 9600 },
            "SIM": { "moduleName": "SIM800L", "baudRate": 115200 }
        },
        "networkConfig": {
            "apn": "internet",
            "operator": "Telkomsel",
            "rssiThreshold": 12,
            "URL": "http://tracker.example/device",
            "key": "MDEyMzQ1Njc4OWFiY2RlZg==",
            "phoneNumber": "+620000000001"
        }
    }))
    .expect("configuration document parses");
    Configuration {
        id: ConfigurationId::random(),
        created_at: at(minute),
        document,
    }
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = migrated_database(&runtime)?;
    let database_url = database.url().to_owned();

    let config = PoolConfig::new(&database_url)
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;
    let store = DieselDeviceStore::new(pool);

    let key = DeviceKey::new(vec![9u8; 16]).map_err(|err| err.to_string())?;
    runtime
        .block_on(store.insert_device(DeviceState::provisioned(d1(), key)))
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        store,
        database_url,
        _database: database,
    })
}

#[fixture]
fn store_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn concurrent_takes_deliver_a_command_once(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_takes_deliver_a_command_once skipped");
        return;
    };
    let store = &context.store;
    let id = d1();

    let taken = context.runtime.block_on(async {
        store
            .set_pending_command(&id, DeviceCommand::new("reboot").expect("valid command"))
            .await
            .expect("queue command");
        join_all((0..6).map(|_| store.take_pending_command(&id, at(5)))).await
    });

    let delivered: Vec<String> = taken
        .into_iter()
        .filter_map(|result| result.expect("take succeeds"))
        .collect();
    assert_eq!(delivered, vec!["reboot".to_owned()]);

    let history = context
        .runtime
        .block_on(store.command_history(&id))
        .expect("command history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].command, "reboot");
    assert_eq!(history[0].delivered_at, at(5));

    let device = context
        .runtime
        .block_on(store.find_by_device_id(&id))
        .expect("lookup")
        .expect("device exists");
    assert_eq!(device.pending_command(), None);
}

#[rstest]
fn dirty_flag_is_consumed_once(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: dirty_flag_is_consumed_once skipped");
        return;
    };
    let store = &context.store;
    let id = d1();
    let pushed = configuration(1);

    let (first, second) = context.runtime.block_on(async {
        store
            .push_configuration(&id, pushed.clone(), at(2))
            .await
            .expect("push configuration");
        let first = store.take_configuration_update(&id).await.expect("first sync");
        let second = store.take_configuration_update(&id).await.expect("second sync");
        (first, second)
    });

    assert_eq!(first, ConfigurationSync::Updated(pushed.clone()));
    assert_eq!(second, ConfigurationSync::UpToDate);

    let device = context
        .runtime
        .block_on(store.find_by_device_id(&id))
        .expect("lookup")
        .expect("device exists");
    assert!(!device.config_dirty());
    assert_eq!(device.current_config_id(), Some(pushed.id));
}

#[rstest]
fn ownerless_device_records_nothing(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: ownerless_device_records_nothing skipped");
        return;
    };
    let store = &context.store;
    let id = d1();

    let recorded = context
        .runtime
        .block_on(store.record_location(&id, reading(), at(3)))
        .expect("record succeeds");
    assert!(recorded.is_none());

    let device = context
        .runtime
        .block_on(store.find_by_device_id(&id))
        .expect("lookup")
        .expect("device exists");
    assert_eq!(device.last_known_location(), None);
    assert_eq!(device.last_seen_at(), None);
    let owned = context
        .runtime
        .block_on(store.find_owned_by_device_id(&id))
        .expect("owned lookup");
    assert!(owned.is_none());
}

#[rstest]
fn owned_device_records_location_and_pointer(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: owned_device_records_location_and_pointer skipped");
        return;
    };
    let store = &context.store;
    let id = d1();
    let owner = AccountId::random();

    let location = context
        .runtime
        .block_on(async {
            store.set_owner(&id, owner).await.expect("assign owner");
            store.record_location(&id, reading(), at(4)).await
        })
        .expect("record succeeds")
        .expect("location stored");
    assert_eq!(location.owner, owner);

    let device = context
        .runtime
        .block_on(store.find_owned_by_device_id(&id))
        .expect("owned lookup")
        .expect("device is owned");
    assert_eq!(device.last_known_location(), Some(location.id));
    assert_eq!(device.last_seen_at(), Some(at(4)));
}

#[rstest]
fn pushes_append_configuration_history(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: pushes_append_configuration_history skipped");
        return;
    };
    let store = &context.store;
    let id = d1();
    let first = configuration(1);
    let second = configuration(2);

    let history = context.runtime.block_on(async {
        store
            .push_configuration(&id, first.clone(), at(10))
            .await
            .expect("first push");
        store
            .push_configuration(&id, second.clone(), at(11))
            .await
            .expect("second push");
        store.config_history(&id).await.expect("config history")
    });

    let pushed: Vec<_> = history
        .iter()
        .map(|entry| (entry.configuration_id, entry.pushed_at))
        .collect();
    assert_eq!(pushed, vec![(first.id, at(10)), (second.id, at(11))]);

    let device = context
        .runtime
        .block_on(store.find_by_device_id(&id))
        .expect("lookup")
        .expect("device exists");
    assert!(device.config_dirty());
    assert_eq!(device.current_config_id(), Some(second.id));
}

#[rstest]
fn unknown_device_mutations_are_not_found(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: unknown_device_mutations_are_not_found skipped");
        return;
    };
    let store = &context.store;
    let ghost = DeviceId::new("ghost").expect("valid id");

    let (command, push) = context.runtime.block_on(async {
        let command = store
            .set_pending_command(&ghost, DeviceCommand::new("reboot").expect("valid command"))
            .await;
        let push = store.push_configuration(&ghost, configuration(1), at(1)).await;
        (command, push)
    });

    assert!(matches!(command, Err(DeviceStoreError::NotFound { .. })));
    assert!(matches!(push, Err(DeviceStoreError::NotFound { .. })));
}

#[rstest]
fn schema_rejects_dirty_flag_without_configuration(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: schema_rejects_dirty_flag_without_configuration skipped");
        return;
    };
    let mut conn = PgConnection::establish(&context.database_url).expect("connect");

    let result = diesel::sql_query("UPDATE devices SET config_dirty = TRUE WHERE device_id = 'D1'")
        .execute(&mut conn);

    assert!(result.is_err());
}

#[rstest]
fn reachable_store_answers_ping(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: reachable_store_answers_ping skipped");
        return;
    };
    context
        .runtime
        .block_on(context.store.ping())
        .expect("store reachable");
}
