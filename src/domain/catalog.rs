//! Component catalog entries.
//!
//! Catalog data is maintained outside the engine and only ever read by key.
//! Selections reference entries by id; they never embed the records.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use uuid::Uuid;

use super::{ControllerType, InstallTemperature};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    #[strum(serialize = "Solar panel")]
    SolarPanel,
    Battery,
    Inverter,
    Controller,
}

impl CatalogKind {
    /// Entity name used in lookup errors.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolarPanel {
    pub id: Uuid,
    pub manufacturer: String,
    pub model: String,
    /// Rated maximum power at STC (W).
    pub rated_power_w: f64,
    pub voc_v: f64,
    pub vmp_v: f64,
    pub isc_a: f64,
    pub imp_a: f64,
    /// Power temperature coefficient (%/°C), normally negative.
    pub temp_coefficient_pmax: f64,
    /// Open-circuit voltage temperature coefficient (V/°C).
    pub temp_coefficient_voc: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Battery {
    pub id: Uuid,
    pub manufacturer: String,
    pub model: String,
    /// Free-form chemistry label as published, e.g. "LiFePO4".
    pub chemistry: String,
    pub voltage_v: f64,
    pub capacity_ah: f64,
    /// Usable fraction of rated capacity (0..=1).
    pub dod: f64,
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inverter {
    pub id: Uuid,
    pub manufacturer: String,
    pub model: String,
    /// Nominal DC input voltage.
    pub voltage_v: u32,
    pub continuous_power_25c_w: f64,
    pub continuous_power_40c_w: f64,
    pub continuous_power_65c_w: f64,
    /// Surge rating (W).
    pub max_power_w: f64,
    /// Conversion efficiency in percent.
    pub efficiency_percent: f64,
}

impl Inverter {
    pub fn continuous_power_w(&self, bucket: InstallTemperature) -> f64 {
        match bucket {
            InstallTemperature::C25 => self.continuous_power_25c_w,
            InstallTemperature::C40 => self.continuous_power_40c_w,
            InstallTemperature::C65 => self.continuous_power_65c_w,
        }
    }

    pub fn efficiency_fraction(&self) -> f64 {
        self.efficiency_percent / 100.0
    }
}

/// Electrical limits of a charge controller, by regulation technology.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ControllerSpec {
    Pwm {
        current_rating_a: f64,
    },
    Mppt {
        max_voltage_v: f64,
        current_rating_a: f64,
        rated_power_w: f64,
    },
}

impl ControllerSpec {
    pub fn controller_type(&self) -> ControllerType {
        match self {
            ControllerSpec::Pwm { .. } => ControllerType::Pwm,
            ControllerSpec::Mppt { .. } => ControllerType::Mppt,
        }
    }
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Controller {
    pub id: Uuid,
    pub manufacturer: String,
    pub model: String,
    #[serde(flatten)]
    pub spec: ControllerSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogItem {
    SolarPanel(SolarPanel),
    Battery(Battery),
    Inverter(Inverter),
    Controller(Controller),
}

impl CatalogItem {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogItem::SolarPanel(_) => CatalogKind::SolarPanel,
            CatalogItem::Battery(_) => CatalogKind::Battery,
            CatalogItem::Inverter(_) => CatalogKind::Inverter,
            CatalogItem::Controller(_) => CatalogKind::Controller,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            CatalogItem::SolarPanel(p) => p.id,
            CatalogItem::Battery(b) => b.id,
            CatalogItem::Inverter(i) => i.id,
            CatalogItem::Controller(c) => c.id,
        }
    }
}

/// A concrete catalog record type that can be pulled out of a [`CatalogItem`].
pub trait CatalogEntry: TryFrom<CatalogItem, Error = EngineError> + Send {
    const KIND: CatalogKind;
}

macro_rules! catalog_entry {
    ($ty:ident, $variant:ident) => {
        impl TryFrom<CatalogItem> for $ty {
            type Error = EngineError;

            fn try_from(item: CatalogItem) -> Result<Self, Self::Error> {
                match item {
                    CatalogItem::$variant(inner) => Ok(inner),
                    other => Err(EngineError::Storage(format!(
                        "catalog returned {} {} where {} was requested",
                        other.kind(),
                        other.id(),
                        CatalogKind::$variant
                    ))),
                }
            }
        }

        impl From<$ty> for CatalogItem {
            fn from(inner: $ty) -> Self {
                CatalogItem::$variant(inner)
            }
        }

        impl CatalogEntry for $ty {
            const KIND: CatalogKind = CatalogKind::$variant;
        }
    };
}

catalog_entry!(SolarPanel, SolarPanel);
catalog_entry!(Battery, Battery);
catalog_entry!(Inverter, Inverter);
catalog_entry!(Controller, Controller);
