//! PostgreSQL-backed device store.
//!
//! Implements every device port over one pool. Read-modify-write operations
//! run in a transaction that first takes `SELECT ... FOR UPDATE` on the
//! device row, so concurrent polls for the same device queue behind each
//! other while different devices never contend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    ConfigurationSync, DeviceDirectory, DeviceStateRepository, DeviceStoreError,
    FleetAdministrationRepository, StoreHealth,
};
use crate::domain::{
    AccountId, CommandRecord, ConfigHistoryEntry, Configuration, ConfigurationDocument,
    ConfigurationId, Device, DeviceCommand, DeviceId, DeviceKey, DeviceState, Location,
    LocationId, LocationReading,
};

use super::models::{
    CommandHistoryRow, ConfigHistoryRow, ConfigurationRow, DeviceRow, NewCommandHistoryRow,
    NewConfigHistoryRow, NewConfigurationRow, NewDeviceRow, NewLocationRow,
};
use super::pool::DbPool;
use super::schema::{
    configurations, device_command_history, device_config_history, devices, locations,
};

/// Diesel adapter for the device directory, protocol state and
/// administration ports.
#[derive(Clone)]
pub struct DieselDeviceStore {
    pool: DbPool,
}

impl DieselDeviceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Error carried out of a transaction closure; any variant rolls back.
enum TxError {
    Diesel(DieselError),
    Store(DeviceStoreError),
}

impl From<DieselError> for TxError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

impl From<TxError> for DeviceStoreError {
    fn from(error: TxError) -> Self {
        match error {
            TxError::Diesel(error) => map_diesel_error(error),
            TxError::Store(error) => error,
        }
    }
}

fn map_diesel_error(error: DieselError) -> DeviceStoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DeviceStoreError::connection("database connection error")
        }
        DieselError::DatabaseError(_, info) => {
            DeviceStoreError::query(format!("database error: {}", info.message()))
        }
        other => DeviceStoreError::query(other.to_string()),
    }
}

fn row_to_device(row: DeviceRow) -> Result<Device, DeviceStoreError> {
    let id = DeviceId::new(row.device_id).map_err(|err| DeviceStoreError::corrupt(err.to_string()))?;
    let state = DeviceState {
        id,
        key: row.symmetric_key.map(DeviceKey::from_stored),
        owner: row.owner_id.map(AccountId::from_uuid),
        last_known_location: row.last_location_id.map(LocationId::from_uuid),
        last_seen_at: row.last_seen_at,
        pending_command: row.pending_command,
        current_config_id: row.current_config_id.map(ConfigurationId::from_uuid),
        config_dirty: row.config_dirty,
    };
    Device::try_from(state).map_err(|err| DeviceStoreError::corrupt(err.to_string()))
}

fn row_to_configuration(row: ConfigurationRow) -> Result<Configuration, DeviceStoreError> {
    let document = serde_json::json!({
        "initCommand": row.init_command,
        "gpsThreshold": row.gps_threshold,
        "espConfig": row.esp_config,
        "networkConfig": row.network_config,
    });
    let document: ConfigurationDocument = serde_json::from_value(document).map_err(|err| {
        DeviceStoreError::corrupt(format!("configuration {}: {err}", row.id))
    })?;
    Ok(Configuration {
        id: ConfigurationId::from_uuid(row.id),
        created_at: row.created_at,
        document,
    })
}

fn configuration_to_row(configuration: &Configuration) -> Result<NewConfigurationRow, DeviceStoreError> {
    let section = |value: Result<serde_json::Value, serde_json::Error>| {
        value.map_err(|err| DeviceStoreError::query(format!("failed to encode configuration: {err}")))
    };
    let document = &configuration.document;
    Ok(NewConfigurationRow {
        id: *configuration.id.as_uuid(),
        init_command: section(serde_json::to_value(&document.init_command))?,
        gps_threshold: section(serde_json::to_value(&document.gps_threshold))?,
        esp_config: section(serde_json::to_value(&document.esp_config))?,
        network_config: section(serde_json::to_value(&document.network_config))?,
        created_at: configuration.created_at,
    })
}

fn location_to_row<'a>(
    id: Uuid,
    device_id: &'a str,
    owner_id: Uuid,
    reading: &LocationReading,
    recorded_at: DateTime<Utc>,
) -> NewLocationRow<'a> {
    NewLocationRow {
        id,
        device_id,
        owner_id,
        lat_coordinate: reading.lat().coordinate,
        lat_hemisphere: reading.lat().hemisphere.as_char().to_string(),
        lon_coordinate: reading.lon().coordinate,
        lon_hemisphere: reading.lon().hemisphere.as_char().to_string(),
        hdop: reading.hdop(),
        recorded_at,
    }
}

async fn ensure_device_exists(
    conn: &mut AsyncPgConnection,
    device_id: &str,
) -> Result<(), DeviceStoreError> {
    let found: Option<String> = devices::table
        .find(device_id)
        .select(devices::device_id)
        .get_result(conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
    found
        .map(|_| ())
        .ok_or_else(|| DeviceStoreError::not_found(device_id))
}

#[async_trait]
impl StoreHealth for DieselDeviceStore {
    async fn ping(&self) -> Result<(), DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}

#[async_trait]
impl DeviceDirectory for DieselDeviceStore {
    async fn find_by_device_id(&self, id: &DeviceId) -> Result<Option<Device>, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let row: Option<DeviceRow> = devices::table
            .find(id.as_str())
            .select(DeviceRow::as_select())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_device).transpose()
    }

    async fn find_owned_by_device_id(
        &self,
        id: &DeviceId,
    ) -> Result<Option<Device>, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let row: Option<DeviceRow> = devices::table
            .find(id.as_str())
            .filter(devices::owner_id.is_not_null())
            .select(DeviceRow::as_select())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_device).transpose()
    }
}

#[async_trait]
impl DeviceStateRepository for DieselDeviceStore {
    async fn record_location(
        &self,
        id: &DeviceId,
        reading: LocationReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<Option<Location>, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let device_id = id.as_str();
        let location_id = Uuid::new_v4();
        let reading_ref = &reading;

        let owner = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let owner: Option<Option<Uuid>> = devices::table
                        .find(device_id)
                        .select(devices::owner_id)
                        .for_update()
                        .get_result(conn)
                        .await
                        .optional()?;
                    let Some(Some(owner)) = owner else {
                        return Ok(None);
                    };

                    let row = location_to_row(location_id, device_id, owner, reading_ref, recorded_at);
                    diesel::insert_into(locations::table)
                        .values(&row)
                        .execute(conn)
                        .await?;
                    diesel::update(devices::table.find(device_id))
                        .set((
                            devices::last_location_id.eq(Some(location_id)),
                            devices::last_seen_at.eq(Some(recorded_at)),
                            devices::updated_at.eq(recorded_at),
                        ))
                        .execute(conn)
                        .await?;
                    Ok(Some(owner))
                }
                .scope_boxed()
            })
            .await?;

        Ok(owner.map(|owner| Location {
            id: LocationId::from_uuid(location_id),
            device_id: id.clone(),
            owner: AccountId::from_uuid(owner),
            reading,
            recorded_at,
        }))
    }

    async fn take_pending_command(
        &self,
        id: &DeviceId,
        delivered_at: DateTime<Utc>,
    ) -> Result<Option<String>, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let device_id = id.as_str();

        let command = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let pending: Option<Option<String>> = devices::table
                        .find(device_id)
                        .select(devices::pending_command)
                        .for_update()
                        .get_result(conn)
                        .await
                        .optional()?;
                    let command = match pending {
                        None => return Err(TxError::Store(DeviceStoreError::not_found(device_id))),
                        Some(None) => return Ok(None),
                        Some(Some(command)) => command,
                    };

                    diesel::update(devices::table.find(device_id))
                        .set((
                            devices::pending_command.eq(None::<String>),
                            devices::updated_at.eq(delivered_at),
                        ))
                        .execute(conn)
                        .await?;
                    diesel::insert_into(device_command_history::table)
                        .values(&NewCommandHistoryRow {
                            device_id,
                            command: &command,
                            delivered_at,
                        })
                        .execute(conn)
                        .await?;
                    Ok(Some(command))
                }
                .scope_boxed()
            })
            .await?;
        Ok(command)
    }

    async fn take_configuration_update(
        &self,
        id: &DeviceId,
    ) -> Result<ConfigurationSync, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let device_id = id.as_str();

        let row = conn
            .transaction::<_, TxError, _>(|conn| {
                async move {
                    let flags: Option<(bool, Option<Uuid>)> = devices::table
                        .find(device_id)
                        .select((devices::config_dirty, devices::current_config_id))
                        .for_update()
                        .get_result(conn)
                        .await
                        .optional()?;
                    let config_id = match flags {
                        None => return Err(TxError::Store(DeviceStoreError::not_found(device_id))),
                        Some((false, _)) => return Ok(None),
                        Some((true, None)) => {
                            return Err(TxError::Store(DeviceStoreError::corrupt(format!(
                                "device {device_id} is flagged for sync without a configuration"
                            ))));
                        }
                        Some((true, Some(config_id))) => config_id,
                    };

                    let row: ConfigurationRow = configurations::table
                        .find(config_id)
                        .select(ConfigurationRow::as_select())
                        .get_result(conn)
                        .await?;
                    diesel::update(devices::table.find(device_id))
                        .set(devices::config_dirty.eq(false))
                        .execute(conn)
                        .await?;
                    Ok(Some(row))
                }
                .scope_boxed()
            })
            .await?;

        match row {
            None => Ok(ConfigurationSync::UpToDate),
            Some(row) => row_to_configuration(row).map(ConfigurationSync::Updated),
        }
    }
}

#[async_trait]
impl FleetAdministrationRepository for DieselDeviceStore {
    async fn insert_device(&self, state: DeviceState) -> Result<Device, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let row = NewDeviceRow {
            device_id: state.id.as_str(),
            symmetric_key: state.key.as_ref().map(DeviceKey::as_bytes),
            owner_id: state.owner.map(|owner| *owner.as_uuid()),
            pending_command: state.pending_command.as_deref(),
            current_config_id: state.current_config_id.map(|id| *id.as_uuid()),
            config_dirty: state.config_dirty,
        };
        diesel::insert_into(devices::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    DeviceStoreError::duplicate(state.id.as_str())
                }
                other => map_diesel_error(other),
            })?;
        Device::try_from(state).map_err(|err| DeviceStoreError::corrupt(err.to_string()))
    }

    async fn set_pending_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<(), DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let updated = diesel::update(devices::table.find(id.as_str()))
            .set((
                devices::pending_command.eq(Some(command.as_str())),
                devices::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(DeviceStoreError::not_found(id.as_str()));
        }
        Ok(())
    }

    async fn push_configuration(
        &self,
        id: &DeviceId,
        configuration: Configuration,
        pushed_at: DateTime<Utc>,
    ) -> Result<(), DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let device_id = id.as_str();
        let row = configuration_to_row(&configuration)?;
        let config_id = row.id;

        conn.transaction::<_, TxError, _>(|conn| {
            async move {
                let locked: Option<String> = devices::table
                    .find(device_id)
                    .select(devices::device_id)
                    .for_update()
                    .get_result(conn)
                    .await
                    .optional()?;
                if locked.is_none() {
                    return Err(TxError::Store(DeviceStoreError::not_found(device_id)));
                }

                diesel::insert_into(configurations::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(device_config_history::table)
                    .values(&NewConfigHistoryRow {
                        device_id,
                        configuration_id: config_id,
                        pushed_at,
                    })
                    .execute(conn)
                    .await?;
                diesel::update(devices::table.find(device_id))
                    .set((
                        devices::current_config_id.eq(Some(config_id)),
                        devices::config_dirty.eq(true),
                        devices::updated_at.eq(pushed_at),
                    ))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await?;
        Ok(())
    }

    async fn set_owner(&self, id: &DeviceId, owner: AccountId) -> Result<(), DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        let updated = diesel::update(devices::table.find(id.as_str()))
            .set((
                devices::owner_id.eq(Some(*owner.as_uuid())),
                devices::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(DeviceStoreError::not_found(id.as_str()));
        }
        Ok(())
    }

    async fn command_history(
        &self,
        id: &DeviceId,
    ) -> Result<Vec<CommandRecord>, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        ensure_device_exists(&mut conn, id.as_str()).await?;
        let rows: Vec<CommandHistoryRow> = device_command_history::table
            .filter(device_command_history::device_id.eq(id.as_str()))
            .order(device_command_history::id.asc())
            .select(CommandHistoryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| CommandRecord {
                command: row.command,
                delivered_at: row.delivered_at,
            })
            .collect())
    }

    async fn config_history(
        &self,
        id: &DeviceId,
    ) -> Result<Vec<ConfigHistoryEntry>, DeviceStoreError> {
        let mut conn = self.pool.get().await?;
        ensure_device_exists(&mut conn, id.as_str()).await?;
        let rows: Vec<ConfigHistoryRow> = device_config_history::table
            .filter(device_config_history::device_id.eq(id.as_str()))
            .order(device_config_history::id.asc())
            .select(ConfigHistoryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|row| ConfigHistoryEntry {
                configuration_id: ConfigurationId::from_uuid(row.configuration_id),
                pushed_at: row.pushed_at,
            })
            .collect())
    }
}
