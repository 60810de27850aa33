use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Nominal DC bus voltages the engine sizes for.
pub const SUPPORTED_SYSTEM_VOLTAGES: [u32; 3] = [12, 24, 48];

/// Standard test conditions reference temperature (°C).
pub const STC_TEMPERATURE_C: f64 = 25.0;

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ApplianceType {
    Ac,
    Dc,
}

/// Inverter continuous power ratings are published for three installation
/// temperatures. Anything else falls back to the hottest rating.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InstallTemperature {
    #[serde(rename = "25")]
    C25,
    #[serde(rename = "40")]
    C40,
    #[default]
    #[serde(rename = "65")]
    C65,
}

impl InstallTemperature {
    /// Exact-match bucket lookup. The boolean is `true` when the requested
    /// temperature is not one of the rated buckets and 65 °C was used.
    pub fn from_celsius(celsius: i32) -> (Self, bool) {
        match celsius {
            25 => (InstallTemperature::C25, false),
            40 => (InstallTemperature::C40, false),
            65 => (InstallTemperature::C65, false),
            _ => (InstallTemperature::C65, true),
        }
    }
}

/// Mounting style of the array.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InstallationType {
    #[default]
    Ground,
    RoofAngle,
    #[serde(rename = "parallel_greater_150mm")]
    #[strum(serialize = "parallel_greater_150mm")]
    ParallelGreater150mm,
    #[serde(rename = "parallel_less_150mm")]
    #[strum(serialize = "parallel_less_150mm")]
    ParallelLess150mm,
    #[serde(other)]
    Unknown,
}

impl InstallationType {
    /// Cell temperature rise above ambient for this mounting (°C).
    pub fn temperature_adder_c(&self) -> f64 {
        match self {
            InstallationType::Ground | InstallationType::RoofAngle => 25.0,
            InstallationType::ParallelGreater150mm => 30.0,
            InstallationType::ParallelLess150mm => 35.0,
            InstallationType::Unknown => 0.0,
        }
    }
}

/// Battery chemistries with a temperature coefficient row.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum BatteryChemistry {
    #[serde(rename = "Li-ion")]
    #[strum(serialize = "Li-ion")]
    LiIon,
    #[serde(rename = "LiFePO4")]
    #[strum(serialize = "LiFePO4")]
    LiFePO4,
    #[serde(rename = "Lead Acid")]
    #[strum(serialize = "Lead Acid")]
    LeadAcid,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ControllerType {
    Pwm,
    Mppt,
}

/// How the solar stage reports estimated daily production.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductionAggregation {
    /// Sum of the array's production over every selected month.
    #[default]
    SumOfSelectedMonths,
    /// Production of the month that set the panel count.
    SizingMonth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[test]
    fn test_install_temperature_exact_match() {
        assert_eq!(InstallTemperature::from_celsius(25), (InstallTemperature::C25, false));
        assert_eq!(InstallTemperature::from_celsius(40), (InstallTemperature::C40, false));
        assert_eq!(InstallTemperature::from_celsius(65), (InstallTemperature::C65, false));
    }

    #[test]
    fn test_install_temperature_fallback_is_flagged() {
        assert_eq!(InstallTemperature::from_celsius(30), (InstallTemperature::C65, true));
        assert_eq!(InstallTemperature::from_celsius(-5), (InstallTemperature::C65, true));
    }

    #[test]
    fn test_chemistry_parse_case_insensitive() {
        assert_eq!(BatteryChemistry::from_str("lifepo4").unwrap(), BatteryChemistry::LiFePO4);
        assert_eq!(BatteryChemistry::from_str("LEAD ACID").unwrap(), BatteryChemistry::LeadAcid);
        assert_eq!(BatteryChemistry::from_str("li-ion").unwrap(), BatteryChemistry::LiIon);
        assert!(BatteryChemistry::from_str("NiCd").is_err());
    }

    #[test]
    fn test_installation_type_unknown_deserializes() {
        let t: InstallationType = serde_json::from_str("\"floating\"").unwrap();
        assert_eq!(t, InstallationType::Unknown);
        assert_eq!(t.temperature_adder_c(), 0.0);
    }

    #[rstest]
    #[case("\"ground\"", 25.0)]
    #[case("\"roof_angle\"", 25.0)]
    #[case("\"parallel_greater_150mm\"", 30.0)]
    #[case("\"parallel_less_150mm\"", 35.0)]
    fn test_installation_type_adders(#[case] json: &str, #[case] adder: f64) {
        let t: InstallationType = serde_json::from_str(json).unwrap();
        assert_eq!(t.temperature_adder_c(), adder);
    }

    #[test]
    fn test_install_temperature_serde_uses_celsius() {
        let json = serde_json::to_string(&InstallTemperature::C40).unwrap();
        assert_eq!(json, "\"40\"");
    }
}
