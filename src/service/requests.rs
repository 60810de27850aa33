//! Typed, validated payloads accepted by the configuration service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::{Appliance, Battery, InstallTemperature, InstallationType, Inverter, LoadTotals, SUPPORTED_SYSTEM_VOLTAGES};

fn default_inverter_temperature() -> i32 {
    25
}

fn default_battery_temperature() -> i32 {
    25
}

fn validate_months(months: &[u8]) -> Result<(), ValidationError> {
    if months.iter().all(|m| (1..=12).contains(m)) {
        Ok(())
    } else {
        Err(ValidationError::new("month_out_of_range"))
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppliancesRequest {
    #[validate(nested)]
    pub appliances: Vec<Appliance>,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize)]
pub struct SystemVoltageRequest {
    pub system_voltage: u32,
}

impl SystemVoltageRequest {
    pub fn is_supported(&self) -> bool {
        SUPPORTED_SYSTEM_VOLTAGES.contains(&self.system_voltage)
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SelectInverterRequest {
    pub inverter_id: Uuid,
    /// Installation temperature; only 25, 40 and 65 °C have ratings.
    #[serde(default = "default_inverter_temperature")]
    pub temperature_c: i32,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SelectBatteryRequest {
    pub battery_id: Uuid,
    #[validate(range(min = 1, max = 30))]
    pub autonomy_days: u32,
    #[serde(default = "default_battery_temperature")]
    #[validate(range(min = -50, max = 70))]
    pub temperature_c: i32,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SelectSolarArrayRequest {
    pub solar_panel_id: Uuid,
    #[validate(range(exclusive_min = 0.0, max = 5.0))]
    pub oversize_coefficient: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub battery_efficiency: f64,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub cable_efficiency: f64,
    #[serde(default)]
    pub panel_temperature_c: Option<f64>,
    #[validate(length(min = 1, max = 12), custom(function = "validate_months"))]
    pub selected_months: Vec<u8>,
    #[serde(default)]
    pub installation_type: InstallationType,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SelectControllerRequest {
    pub controller_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuitableInvertersQuery {
    #[serde(default = "default_inverter_temperature")]
    pub temperature: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuitableBatteriesQuery {
    pub technology: String,
}

/// Current load aggregates with the advised and effective bus voltage.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoadSnapshot {
    #[serde(flatten)]
    pub totals: LoadTotals,
    pub recommended_system_voltage: Option<u32>,
    pub system_voltage: Option<u32>,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuitableInverters {
    pub install_temperature: InstallTemperature,
    pub temperature_fallback: bool,
    pub inverters: Vec<Inverter>,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuitableBatteries {
    pub technology: String,
    pub batteries: Vec<Battery>,
}
