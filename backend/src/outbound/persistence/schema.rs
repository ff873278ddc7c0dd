//! Diesel table definitions for the device gateway schema.
//!
//! These must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Immutable configuration documents, one JSONB column per section.
    configurations (id) {
        id -> Uuid,
        init_command -> Jsonb,
        gps_threshold -> Jsonb,
        esp_config -> Jsonb,
        network_config -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Device records keyed by the firmware-reported identifier.
    ///
    /// A `CHECK` constraint enforces that `config_dirty` implies a non-null
    /// `current_config_id`.
    devices (device_id) {
        #[max_length = 64]
        device_id -> Varchar,
        symmetric_key -> Nullable<Bytea>,
        owner_id -> Nullable<Uuid>,
        last_location_id -> Nullable<Uuid>,
        last_seen_at -> Nullable<Timestamptz>,
        #[max_length = 256]
        pending_command -> Nullable<Varchar>,
        current_config_id -> Nullable<Uuid>,
        config_dirty -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Location readings, denormalised with the owner at ingest time.
    locations (id) {
        id -> Uuid,
        #[max_length = 64]
        device_id -> Varchar,
        owner_id -> Uuid,
        lat_coordinate -> Float8,
        #[max_length = 1]
        lat_hemisphere -> Varchar,
        lon_coordinate -> Float8,
        #[max_length = 1]
        lon_hemisphere -> Varchar,
        hdop -> Float8,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only log of delivered commands.
    device_command_history (id) {
        id -> Int8,
        #[max_length = 64]
        device_id -> Varchar,
        #[max_length = 256]
        command -> Varchar,
        delivered_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only log of configuration pushes.
    device_config_history (id) {
        id -> Int8,
        #[max_length = 64]
        device_id -> Varchar,
        configuration_id -> Uuid,
        pushed_at -> Timestamptz,
    }
}

diesel::joinable!(device_command_history -> devices (device_id));
diesel::joinable!(device_config_history -> configurations (configuration_id));
diesel::joinable!(device_config_history -> devices (device_id));
diesel::joinable!(devices -> configurations (current_config_id));
diesel::joinable!(locations -> devices (device_id));

diesel::allow_tables_to_appear_in_same_query!(
    configurations,
    device_command_history,
    device_config_history,
    devices,
    locations,
);
