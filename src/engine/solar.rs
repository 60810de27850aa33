//! Worst-month solar array sizing.

use itertools::Itertools;

use crate::domain::{MonthlyCalc, ProductionAggregation, Site, SolarPanel, STC_TEMPERATURE_C};
use crate::error::{EngineError, EngineResult};

/// User-chosen design factors for the array.
#[derive(Debug, Clone)]
pub struct SolarDesign {
    pub oversize_coefficient: f64,
    pub battery_efficiency: f64,
    pub cable_efficiency: f64,
    pub selected_months: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarSizing {
    pub monthly: Vec<MonthlyCalc>,
    pub number_of_panels: u32,
    pub sizing_month: Option<u8>,
    pub total_power_generated_w: f64,
    pub estimated_daily_production_wh: f64,
}

/// Power derating factor for a panel at `ambient_c`.
pub fn temperature_efficiency(temp_coefficient_pmax: f64, ambient_c: f64) -> f64 {
    (100.0 + (ambient_c - STC_TEMPERATURE_C) * temp_coefficient_pmax) / 100.0
}

fn size_month(
    panel: &SolarPanel,
    site: &Site,
    month: u8,
    total_daily_energy_wh: f64,
    design: &SolarDesign,
) -> EngineResult<MonthlyCalc> {
    let data = site
        .month(month)
        .ok_or_else(|| EngineError::invalid(format!("site has no climate data for month {month}")))?;
    if data.irradiance_psh <= 0.0 {
        return Err(EngineError::invalid(format!(
            "month {month} has no usable irradiance (psh = {})",
            data.irradiance_psh
        )));
    }

    let required_energy_wh = total_daily_energy_wh / (design.battery_efficiency * design.cable_efficiency);
    let required_power_w = (required_energy_wh / data.irradiance_psh) * design.oversize_coefficient;
    let temperature_efficiency = temperature_efficiency(panel.temp_coefficient_pmax, data.ambient_temperature_c);
    let derated_power_w = panel.rated_power_w * temperature_efficiency;
    if derated_power_w <= 0.0 {
        return Err(EngineError::invalid(format!(
            "panel {} produces no power at {} °C in month {month}",
            panel.id, data.ambient_temperature_c
        )));
    }

    Ok(MonthlyCalc {
        month,
        psh: data.irradiance_psh,
        ambient_temperature_c: data.ambient_temperature_c,
        required_energy_wh,
        required_power_w,
        temperature_efficiency,
        derated_power_w,
        num_panels: (required_power_w / derated_power_w).ceil() as u32,
        estimated_daily_energy_wh: derated_power_w * data.irradiance_psh,
    })
}

/// Size the array for every selected month and keep the largest panel count,
/// so no selected month is under-provisioned.
pub fn size_solar_array(
    panel: &SolarPanel,
    site: &Site,
    total_daily_energy_wh: f64,
    design: &SolarDesign,
    aggregation: ProductionAggregation,
) -> EngineResult<SolarSizing> {
    if design.selected_months.is_empty() {
        return Err(EngineError::invalid("at least one month must be selected"));
    }
    if panel.rated_power_w <= 0.0 {
        return Err(EngineError::invalid(format!("panel {} has no rated power", panel.id)));
    }

    let monthly = design
        .selected_months
        .iter()
        .copied()
        .sorted_unstable()
        .dedup()
        .map(|month| size_month(panel, site, month, total_daily_energy_wh, design))
        .collect::<EngineResult<Vec<_>>>()?;

    // First month wins on ties.
    let sizing = monthly
        .iter()
        .fold(None::<&MonthlyCalc>, |best, calc| match best {
            Some(b) if b.num_panels >= calc.num_panels => Some(b),
            _ => Some(calc),
        });

    let number_of_panels = sizing.map_or(0, |c| c.num_panels);
    let panels = f64::from(number_of_panels);
    let estimated_daily_production_wh = match aggregation {
        ProductionAggregation::SumOfSelectedMonths => {
            monthly.iter().map(|c| c.estimated_daily_energy_wh * panels).sum()
        }
        ProductionAggregation::SizingMonth => sizing.map_or(0.0, |c| c.estimated_daily_energy_wh * panels),
    };

    Ok(SolarSizing {
        sizing_month: sizing.map(|c| c.month),
        number_of_panels,
        total_power_generated_w: panel.rated_power_w * panels,
        estimated_daily_production_wh,
        monthly,
    })
}
