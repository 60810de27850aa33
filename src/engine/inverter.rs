//! Inverter compatibility filter and AC loss folding.

use crate::domain::{InstallTemperature, Inverter, LoadTotals};

/// What the load side asks of an inverter.
#[derive(Debug, Clone, Copy)]
pub struct InverterDemand {
    pub system_voltage: u32,
    pub total_ac_power_w: f64,
    pub total_ac_peak_power_w: f64,
}

impl InverterDemand {
    pub fn new(system_voltage: u32, load: &LoadTotals) -> Self {
        Self {
            system_voltage,
            total_ac_power_w: load.total_ac_power_w,
            total_ac_peak_power_w: load.total_ac_peak_power_w,
        }
    }
}

/// Voltage must match exactly and both ratings must strictly exceed the
/// efficiency-corrected demand.
pub fn is_suitable_inverter(inverter: &Inverter, demand: &InverterDemand, bucket: InstallTemperature) -> bool {
    let efficiency = inverter.efficiency_fraction();
    if efficiency <= 0.0 || inverter.voltage_v != demand.system_voltage {
        return false;
    }
    inverter.continuous_power_w(bucket) > demand.total_ac_power_w / efficiency
        && inverter.max_power_w > demand.total_ac_peak_power_w / efficiency
}

pub fn suitable_inverters<'a>(
    inverters: &'a [Inverter],
    demand: &InverterDemand,
    bucket: InstallTemperature,
) -> Vec<&'a Inverter> {
    inverters
        .iter()
        .filter(|inv| is_suitable_inverter(inv, demand, bucket))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverterSizing {
    pub total_adjusted_ac_energy_wh: f64,
    pub total_daily_energy_wh: f64,
}

/// Fold inverter conversion losses into the AC energy and add the DC side.
pub fn size_inverter(inverter: &Inverter, load: &LoadTotals) -> InverterSizing {
    let total_adjusted_ac_energy_wh = load.total_ac_energy_wh / inverter.efficiency_fraction();
    InverterSizing {
        total_adjusted_ac_energy_wh,
        total_daily_energy_wh: load.total_dc_energy_wh + total_adjusted_ac_energy_wh,
    }
}
