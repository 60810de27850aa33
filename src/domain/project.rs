//! The project aggregate and its configuration model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Appliance, ControllerType, InstallTemperature, InstallationType, ProductionAggregation, Site,
};

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub appliances: Vec<Appliance>,
    #[serde(default)]
    pub site: Option<Site>,
    /// Created on the first selection call.
    #[serde(default)]
    pub configuration: Option<ConfigurationModel>,
    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

impl Project {
    pub fn new(id: Uuid, owner_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            owner_id,
            name: name.into(),
            appliances: Vec::new(),
            site: None,
            configuration: None,
            version: 0,
        }
    }

    pub fn configuration_mut(&mut self) -> &mut ConfigurationModel {
        self.configuration.get_or_insert_with(ConfigurationModel::default)
    }
}

/// Load aggregates derived from the appliance list.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct LoadTotals {
    pub total_ac_energy_wh: f64,
    pub total_dc_energy_wh: f64,
    pub total_ac_peak_power_w: f64,
    pub total_dc_peak_power_w: f64,
    /// Continuous AC draw with every appliance on (Σ power × quantity).
    pub total_ac_power_w: f64,
    pub unclassified_appliances: usize,
}

impl LoadTotals {
    pub fn total_energy_wh(&self) -> f64 {
        self.total_ac_energy_wh + self.total_dc_energy_wh
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigurationModel {
    #[serde(flatten)]
    pub load: LoadTotals,
    pub recommended_system_voltage: Option<u32>,
    /// Effective bus voltage. Tracks the recommendation until the user
    /// sets one explicitly.
    pub system_voltage: Option<u32>,
    #[serde(default)]
    pub system_voltage_overridden: bool,
    pub inverter: Option<InverterSelection>,
    pub battery: Option<BatterySelection>,
    pub solar_array: Option<SolarArraySelection>,
    pub controller: Option<ControllerSelection>,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InverterSelection {
    pub inverter_id: Option<Uuid>,
    pub install_temperature: InstallTemperature,
    /// The requested temperature had no rating and 65 °C was used.
    pub temperature_fallback: bool,
    /// Whether the inverter passes the compatibility filter for the
    /// current bus voltage and load. Informational only.
    pub compatible: bool,
    pub total_adjusted_ac_energy_wh: f64,
    pub total_daily_energy_wh: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BatterySelection {
    pub battery_id: Option<Uuid>,
    pub autonomy_days: u32,
    pub install_temperature_c: i32,
    pub temperature_coefficient: f64,
    /// No exact table entry existed and a neutral 1.0 was used.
    pub coefficient_fallback: bool,
    pub required_capacity_ah: f64,
    pub usable_capacity_ah: f64,
    pub parallel_count: u32,
    pub series_count: u32,
    pub total_available_capacity_ah: f64,
    pub operational_days_estimate: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MonthlyCalc {
    pub month: u8,
    pub psh: f64,
    pub ambient_temperature_c: f64,
    pub required_energy_wh: f64,
    pub required_power_w: f64,
    pub temperature_efficiency: f64,
    pub derated_power_w: f64,
    pub num_panels: u32,
    /// Per-panel daily production (Wh).
    pub estimated_daily_energy_wh: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SolarArraySelection {
    pub solar_panel_id: Option<Uuid>,
    pub installation_type: InstallationType,
    pub oversize_coefficient: f64,
    pub battery_efficiency: f64,
    pub cable_efficiency: f64,
    pub panel_temperature_c: Option<f64>,
    pub selected_months: Vec<u8>,
    pub number_of_panels: u32,
    /// Month whose panel count drove the array size.
    pub sizing_month: Option<u8>,
    pub total_power_generated_w: f64,
    pub production_aggregation: ProductionAggregation,
    pub estimated_daily_production_wh: f64,
    pub monthly: Vec<MonthlyCalc>,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ControllerSelection {
    pub controller_id: Option<Uuid>,
    pub controller_type: Option<ControllerType>,
    pub series_modules: u32,
    pub parallel_modules: u32,
    pub required_current_a: f64,
    pub adjusted_open_circuit_voltage_v: Option<f64>,
    pub adjusted_vmp_v: Option<f64>,
    pub min_series_modules: Option<u32>,
    /// Reported only; not yet applied to the voltage adjustment.
    pub installation_temperature_adder_c: f64,
    pub is_valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}
