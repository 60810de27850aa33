//! Battery bank sizing from daily energy, autonomy and install temperature.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::domain::{Battery, BatteryChemistry};
use crate::error::{EngineError, EngineResult};

/// Capacity derating factors keyed by chemistry then by exact °C.
///
/// Lookups never interpolate; a temperature without an entry yields a
/// neutral factor that is reported as a fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureCoefficients {
    table: BTreeMap<BatteryChemistry, BTreeMap<i32, f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientLookup {
    pub value: f64,
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
struct CoefficientFile {
    chemistries: BTreeMap<String, BTreeMap<String, f64>>,
}

impl TemperatureCoefficients {
    pub fn new(table: BTreeMap<BatteryChemistry, BTreeMap<i32, f64>>) -> Self {
        Self { table }
    }

    /// Parse a TOML table of the form `[chemistries."Lead Acid"] "-10" = 0.7`.
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let raw: CoefficientFile = toml::from_str(content)
            .map_err(|e| EngineError::invalid(format!("coefficient table: {e}")))?;

        let mut table = BTreeMap::new();
        for (chemistry, rows) in raw.chemistries {
            let chemistry = BatteryChemistry::from_str(&chemistry)
                .map_err(|_| EngineError::invalid(format!("coefficient table: unknown chemistry '{chemistry}'")))?;
            let mut parsed = BTreeMap::new();
            for (temperature, value) in rows {
                let temperature: i32 = temperature.trim().parse().map_err(|_| {
                    EngineError::invalid(format!(
                        "coefficient table: temperature '{temperature}' for {chemistry} is not an integer"
                    ))
                })?;
                if value <= 0.0 {
                    return Err(EngineError::invalid(format!(
                        "coefficient table: {chemistry} at {temperature} °C must be positive"
                    )));
                }
                parsed.insert(temperature, value);
            }
            table.insert(chemistry, parsed);
        }
        Ok(Self { table })
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Storage(format!("failed to read coefficient table {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn lookup(&self, chemistry: BatteryChemistry, temperature_c: i32) -> EngineResult<CoefficientLookup> {
        let row = self
            .table
            .get(&chemistry)
            .ok_or_else(|| EngineError::not_found("Temperature coefficients", chemistry))?;
        Ok(match row.get(&temperature_c) {
            Some(value) => CoefficientLookup {
                value: *value,
                fallback: false,
            },
            None => CoefficientLookup {
                value: 1.0,
                fallback: true,
            },
        })
    }
}

impl Default for TemperatureCoefficients {
    fn default() -> Self {
        let row = |pairs: &[(i32, f64)]| pairs.iter().copied().collect::<BTreeMap<_, _>>();
        let mut table = BTreeMap::new();
        table.insert(
            BatteryChemistry::LiIon,
            row(&[(-20, 0.60), (-10, 0.75), (0, 0.85), (10, 0.95), (25, 1.0), (40, 1.0)]),
        );
        table.insert(
            BatteryChemistry::LiFePO4,
            row(&[(-20, 0.55), (-10, 0.70), (0, 0.80), (10, 0.90), (25, 1.0), (40, 1.0)]),
        );
        table.insert(
            BatteryChemistry::LeadAcid,
            row(&[(-20, 0.50), (-10, 0.65), (0, 0.80), (10, 0.90), (25, 1.0), (40, 1.05)]),
        );
        Self { table }
    }
}

/// Rated voltage must not exceed the bus and chemistry must match
/// (case-insensitive).
pub fn is_suitable_battery(battery: &Battery, system_voltage: u32, technology: &str) -> bool {
    battery.voltage_v <= f64::from(system_voltage) && battery.chemistry.trim().eq_ignore_ascii_case(technology.trim())
}

#[derive(Debug, Clone, Copy)]
pub struct BatteryDemand {
    pub total_daily_energy_wh: f64,
    pub system_voltage: u32,
    pub autonomy_days: u32,
    pub temperature_c: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySizing {
    pub coefficient: CoefficientLookup,
    pub required_capacity_ah: f64,
    pub usable_capacity_ah: f64,
    pub parallel_count: u32,
    pub series_count: u32,
    pub total_available_capacity_ah: f64,
    pub operational_days_estimate: f64,
}

pub fn size_battery(
    battery: &Battery,
    demand: &BatteryDemand,
    coefficients: &TemperatureCoefficients,
) -> EngineResult<BatterySizing> {
    let chemistry = BatteryChemistry::from_str(battery.chemistry.trim())
        .map_err(|_| EngineError::invalid(format!("unknown battery chemistry '{}'", battery.chemistry)))?;
    if demand.system_voltage == 0 {
        return Err(EngineError::invalid("system voltage must be set before battery sizing"));
    }
    if demand.total_daily_energy_wh <= 0.0 {
        return Err(EngineError::invalid("no daily energy demand to size a battery bank for"));
    }
    if battery.voltage_v <= 0.0 {
        return Err(EngineError::invalid(format!("battery {} has no rated voltage", battery.id)));
    }
    let usable_capacity_ah = battery.capacity_ah * battery.dod;
    if usable_capacity_ah <= 0.0 {
        return Err(EngineError::invalid(format!("battery {} has no usable capacity", battery.id)));
    }

    let coefficient = coefficients.lookup(chemistry, demand.temperature_c)?;
    let system_voltage = f64::from(demand.system_voltage);
    let daily_ah = demand.total_daily_energy_wh / system_voltage;

    let required_capacity_ah = daily_ah * f64::from(demand.autonomy_days) / coefficient.value;
    let parallel_count = (required_capacity_ah / usable_capacity_ah).ceil() as u32;
    let series_count = (system_voltage / battery.voltage_v).ceil() as u32;
    let total_available_capacity_ah = usable_capacity_ah * f64::from(parallel_count);
    let operational_days_estimate = total_available_capacity_ah / (daily_ah / coefficient.value);

    Ok(BatterySizing {
        coefficient,
        required_capacity_ah,
        usable_capacity_ah,
        parallel_count,
        series_count,
        total_available_capacity_ah,
        operational_days_estimate,
    })
}
