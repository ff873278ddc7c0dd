//! Device configuration documents.
//!
//! A configuration is immutable once created. Administration pushes a new
//! document and moves the device pointer; devices only ever read. Field names
//! follow the firmware's wire format, including the upper-case `GPS`, `SIM`
//! and `URL` keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::ConfigurationId;

/// Validation errors for configuration drafts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationValidationError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} must be finite and non-negative")]
    Negative { field: &'static str },
}

/// AT command paired with the response the modem is expected to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtCheck {
    pub command: String,
    pub response: String,
}

/// Modem bring-up sequence run by the firmware at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitCommand {
    pub device_check: AtCheck,
    pub sim_check: AtCheck,
    pub signal_check: AtCheck,
    pub reg_check: AtCheck,
    pub gprs_reg_check: AtCheck,
    pub gprs_check: AtCheck,
    pub operator_check: AtCheck,
}

impl InitCommand {
    fn checks(&self) -> [(&'static str, &AtCheck); 7] {
        [
            ("initCommand.deviceCheck", &self.device_check),
            ("initCommand.simCheck", &self.sim_check),
            ("initCommand.signalCheck", &self.signal_check),
            ("initCommand.regCheck", &self.reg_check),
            ("initCommand.gprsRegCheck", &self.gprs_reg_check),
            ("initCommand.gprsCheck", &self.gprs_check),
            ("initCommand.operatorCheck", &self.operator_check),
        ]
    }
}

/// Fix quality gate applied before a reading is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsThreshold {
    pub satellite: u32,
    pub hdop: f64,
    pub distance: f64,
}

/// Serial module wiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleBaud {
    pub module_name: String,
    pub baud_rate: u32,
}

/// Microcontroller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspConfig {
    pub time_interval: u32,
    #[serde(rename = "GPS")]
    pub gps: ModuleBaud,
    #[serde(rename = "SIM")]
    pub sim: ModuleBaud,
}

/// Cellular network and upstream endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub apn: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub operator: String,
    pub rssi_threshold: i32,
    #[serde(rename = "URL")]
    pub url: String,
    pub key: String,
    pub phone_number: String,
}

/// Full configuration content as delivered to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDocument {
    pub init_command: InitCommand,
    pub gps_threshold: GpsThreshold,
    pub esp_config: EspConfig,
    pub network_config: NetworkConfig,
}

impl ConfigurationDocument {
    /// Check the draft before it is stored.
    pub fn validate(&self) -> Result<(), ConfigurationValidationError> {
        for (field, check) in self.init_command.checks() {
            if check.command.trim().is_empty() {
                return Err(ConfigurationValidationError::Blank { field });
            }
        }

        let threshold = &self.gps_threshold;
        if !threshold.hdop.is_finite() || threshold.hdop < 0.0 {
            return Err(ConfigurationValidationError::Negative {
                field: "gpsThreshold.hdop",
            });
        }
        if !threshold.distance.is_finite() || threshold.distance < 0.0 {
            return Err(ConfigurationValidationError::Negative {
                field: "gpsThreshold.distance",
            });
        }

        let esp = &self.esp_config;
        if esp.time_interval == 0 {
            return Err(ConfigurationValidationError::NotPositive {
                field: "espConfig.timeInterval",
            });
        }
        for (field, module) in [("espConfig.GPS", &esp.gps), ("espConfig.SIM", &esp.sim)] {
            if module.baud_rate == 0 {
                return Err(ConfigurationValidationError::NotPositive { field });
            }
        }

        let network = &self.network_config;
        for (field, value) in [
            ("networkConfig.apn", &network.apn),
            ("networkConfig.URL", &network.url),
            ("networkConfig.key", &network.key),
            ("networkConfig.phoneNumber", &network.phone_number),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationValidationError::Blank { field });
            }
        }
        Ok(())
    }
}

/// Stored, immutable configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub created_at: DateTime<Utc>,
    pub document: ConfigurationDocument,
}
