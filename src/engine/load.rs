//! Appliance load aggregation.

use crate::domain::{Appliance, ApplianceType, LoadTotals};

/// Reduce an appliance list to AC/DC daily energy and peak power.
///
/// Energy is summed per appliance without the quantity multiplier; peak and
/// continuous power are multiplied by quantity. Appliances without a type
/// are counted but excluded from both sums.
pub fn aggregate_loads(appliances: &[Appliance]) -> LoadTotals {
    appliances
        .iter()
        .fold(LoadTotals::default(), |mut totals, appliance| {
            match appliance.appliance_type {
                Some(ApplianceType::Ac) => {
                    totals.total_ac_energy_wh += appliance.daily_energy_wh();
                    totals.total_ac_peak_power_w += appliance.total_peak_power_w();
                    totals.total_ac_power_w += appliance.total_power_w();
                }
                Some(ApplianceType::Dc) => {
                    totals.total_dc_energy_wh += appliance.daily_energy_wh();
                    totals.total_dc_peak_power_w += appliance.total_peak_power_w();
                }
                None => totals.unclassified_appliances += 1,
            }
            totals
        })
}
