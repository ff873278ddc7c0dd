//! Internal Diesel row structs.
//!
//! These never leave the persistence layer; the repository converts them to
//! domain types and back.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    configurations, device_command_history, device_config_history, devices, locations,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = devices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DeviceRow {
    pub device_id: String,
    pub symmetric_key: Option<Vec<u8>>,
    pub owner_id: Option<Uuid>,
    pub last_location_id: Option<Uuid>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub pending_command: Option<String>,
    pub current_config_id: Option<Uuid>,
    pub config_dirty: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub(crate) struct NewDeviceRow<'a> {
    pub device_id: &'a str,
    pub symmetric_key: Option<&'a [u8]>,
    pub owner_id: Option<Uuid>,
    pub pending_command: Option<&'a str>,
    pub current_config_id: Option<Uuid>,
    pub config_dirty: bool,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = configurations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ConfigurationRow {
    pub id: Uuid,
    pub init_command: serde_json::Value,
    pub gps_threshold: serde_json::Value,
    pub esp_config: serde_json::Value,
    pub network_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = configurations)]
pub(crate) struct NewConfigurationRow {
    pub id: Uuid,
    pub init_command: serde_json::Value,
    pub gps_threshold: serde_json::Value,
    pub esp_config: serde_json::Value,
    pub network_config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = locations)]
pub(crate) struct NewLocationRow<'a> {
    pub id: Uuid,
    pub device_id: &'a str,
    pub owner_id: Uuid,
    pub lat_coordinate: f64,
    pub lat_hemisphere: String,
    pub lon_coordinate: f64,
    pub lon_hemisphere: String,
    pub hdop: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = device_command_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommandHistoryRow {
    pub command: String,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = device_command_history)]
pub(crate) struct NewCommandHistoryRow<'a> {
    pub device_id: &'a str,
    pub command: &'a str,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = device_config_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ConfigHistoryRow {
    pub configuration_id: Uuid,
    pub pushed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = device_config_history)]
pub(crate) struct NewConfigHistoryRow<'a> {
    pub device_id: &'a str,
    pub configuration_id: Uuid,
    pub pushed_at: DateTime<Utc>,
}
