//! Sizing and compatibility calculators, in pipeline order.
//!
//! Every function here is a pure computation over values already fetched by
//! the caller. Persistence and ordering between stages live in
//! [`crate::service`].

pub mod battery;
pub mod controller;
pub mod inverter;
pub mod load;
pub mod solar;
pub mod voltage;

pub use battery::{is_suitable_battery, size_battery, BatteryDemand, BatterySizing, CoefficientLookup, TemperatureCoefficients};
pub use controller::{refine_layout, size_controller, ArrayContext, ArrayLayout, ControllerSizing, MpptSizing, PwmSizing};
pub use inverter::{is_suitable_inverter, size_inverter, suitable_inverters, InverterDemand, InverterSizing};
pub use load::aggregate_loads;
pub use solar::{size_solar_array, SolarDesign, SolarSizing};
pub use voltage::recommend_system_voltage;
