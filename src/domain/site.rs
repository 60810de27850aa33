use serde::{Deserialize, Serialize};

/// Climate for one calendar month at the project site.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonthlyData {
    /// 1 = January.
    pub month: u8,
    /// Peak sun hours (kWh/m²/day on the panel plane).
    pub irradiance_psh: f64,
    pub ambient_temperature_c: f64,
}

impl MonthlyData {
    pub fn zeroed(month: u8) -> Self {
        Self {
            month,
            irradiance_psh: 0.0,
            ambient_temperature_c: 0.0,
        }
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Site {
    pub latitude: f64,
    pub longitude: f64,
    pub min_ambient_temperature_c: f64,
    pub max_ambient_temperature_c: f64,
    pub panel_angle_deg: f64,
    pub panel_aspect_deg: f64,
    pub monthly: Vec<MonthlyData>,
    /// Set when any provider call failed and its fields were zeroed.
    #[serde(default)]
    pub degraded: bool,
}

impl Site {
    pub fn month(&self, month: u8) -> Option<&MonthlyData> {
        self.monthly.iter().find(|m| m.month == month)
    }
}
