use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::ApplianceType;

/// A load on the project's appliance list.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Appliance {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    /// `None` means the appliance was never classified; it contributes to
    /// neither the AC nor the DC totals.
    #[serde(rename = "type", default)]
    pub appliance_type: Option<ApplianceType>,
    #[validate(range(min = 0.0))]
    pub power_w: f64,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[validate(range(min = 0.0, max = 24.0))]
    pub hours_per_day: f64,
    #[validate(range(max = 7))]
    pub days_per_week: u8,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub peak_power_w: f64,
}

impl Appliance {
    /// Average daily energy in Wh, spreading weekly usage over seven days.
    pub fn daily_energy_wh(&self) -> f64 {
        self.power_w * self.hours_per_day * f64::from(self.days_per_week) / 7.0
    }

    pub fn total_peak_power_w(&self) -> f64 {
        self.peak_power_w * f64::from(self.quantity)
    }

    pub fn total_power_w(&self) -> f64 {
        self.power_w * f64::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fridge() -> Appliance {
        Appliance {
            id: Uuid::new_v4(),
            name: "fridge".into(),
            appliance_type: Some(ApplianceType::Ac),
            power_w: 150.0,
            quantity: 2,
            hours_per_day: 10.0,
            days_per_week: 7,
            peak_power_w: 600.0,
        }
    }

    #[test]
    fn test_daily_energy_ignores_quantity() {
        assert_eq!(fridge().daily_energy_wh(), 1500.0);
    }

    #[test]
    fn test_daily_energy_weekly_spread() {
        let mut a = fridge();
        a.days_per_week = 5;
        a.power_w = 70.0;
        a.hours_per_day = 2.0;
        assert!((a.daily_energy_wh() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_power_multiplies_quantity() {
        assert_eq!(fridge().total_peak_power_w(), 1200.0);
    }

    #[test]
    fn test_validation_rejects_eight_days() {
        let mut a = fridge();
        a.days_per_week = 8;
        assert!(a.validate().is_err());
    }
}
