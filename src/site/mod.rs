//! Site climate data: provider seam and degradation policy.
//!
//! Provider failures never abort site configuration. Each failed call zeroes
//! the fields it would have filled and marks the site as degraded.

pub mod pvgis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::domain::{MonthlyData, Site};
use crate::error::EngineResult;

pub use pvgis::PvgisClient;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub angle_deg: f64,
    pub aspect_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelOrientation {
    pub angle_deg: f64,
    pub aspect_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClimate {
    pub monthly: Vec<MonthlyData>,
    pub min_ambient_c: f64,
    pub max_ambient_c: f64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SiteDataProvider: Send + Sync {
    /// Twelve months of plane-of-array PSH and ambient temperature, plus
    /// the coldest and hottest ambient temperature.
    async fn monthly_climate(&self, location: &SiteLocation) -> EngineResult<MonthlyClimate>;

    /// Recommended panel tilt and azimuth for a location.
    async fn recommended_orientation(&self, latitude: f64, longitude: f64) -> EngineResult<PanelOrientation>;
}

#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SiteRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0, max = 90.0))]
    pub panel_angle_deg: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub panel_aspect_deg: Option<f64>,
}

/// Build a [`Site`] from the provider, degrading failed fields to zero.
pub async fn resolve_site(provider: &dyn SiteDataProvider, request: &SiteRequest) -> Site {
    let mut degraded = false;

    let (angle_deg, aspect_deg) = match (request.panel_angle_deg, request.panel_aspect_deg) {
        (Some(angle), Some(aspect)) => (angle, aspect),
        (angle, aspect) => match provider.recommended_orientation(request.latitude, request.longitude).await {
            Ok(rec) => (angle.unwrap_or(rec.angle_deg), aspect.unwrap_or(rec.aspect_deg)),
            Err(e) => {
                warn!(error = %e, "orientation lookup failed, using zero defaults");
                degraded = true;
                (angle.unwrap_or(0.0), aspect.unwrap_or(0.0))
            }
        },
    };

    let location = SiteLocation {
        latitude: request.latitude,
        longitude: request.longitude,
        angle_deg,
        aspect_deg,
    };

    let (monthly, min_ambient_c, max_ambient_c) = match provider.monthly_climate(&location).await {
        Ok(climate) => {
            let monthly: Vec<MonthlyData> = (1..=12u8)
                .map(|m| {
                    climate.monthly.iter().find(|d| d.month == m).copied().unwrap_or_else(|| {
                        degraded = true;
                        MonthlyData::zeroed(m)
                    })
                })
                .collect();
            (monthly, climate.min_ambient_c, climate.max_ambient_c)
        }
        Err(e) => {
            warn!(error = %e, "climate lookup failed, using zero defaults");
            degraded = true;
            ((1..=12u8).map(MonthlyData::zeroed).collect(), 0.0, 0.0)
        }
    };

    info!(
        latitude = request.latitude,
        longitude = request.longitude,
        degraded,
        "site resolved"
    );

    Site {
        latitude: request.latitude,
        longitude: request.longitude,
        min_ambient_temperature_c: min_ambient_c,
        max_ambient_temperature_c: max_ambient_c,
        panel_angle_deg: angle_deg,
        panel_aspect_deg: aspect_deg,
        monthly,
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn request(angle: Option<f64>, aspect: Option<f64>) -> SiteRequest {
        SiteRequest {
            latitude: 45.0,
            longitude: 7.0,
            panel_angle_deg: angle,
            panel_aspect_deg: aspect,
        }
    }

    fn climate() -> MonthlyClimate {
        MonthlyClimate {
            monthly: (1..=12u8)
                .map(|m| MonthlyData {
                    month: m,
                    irradiance_psh: 2.0 + f64::from(m) / 4.0,
                    ambient_temperature_c: 10.0,
                })
                .collect(),
            min_ambient_c: -8.0,
            max_ambient_c: 33.0,
        }
    }

    #[tokio::test]
    async fn test_uses_recommended_orientation_when_missing() {
        let mut provider = MockSiteDataProvider::new();
        provider.expect_recommended_orientation().times(1).returning(|_, _| {
            Ok(PanelOrientation {
                angle_deg: 38.0,
                aspect_deg: -2.0,
            })
        });
        provider
            .expect_monthly_climate()
            .withf(|loc| loc.angle_deg == 38.0 && loc.aspect_deg == -2.0)
            .returning(|_| Ok(climate()));

        let site = resolve_site(&provider, &request(None, None)).await;
        assert_eq!(site.panel_angle_deg, 38.0);
        assert_eq!(site.monthly.len(), 12);
        assert_eq!(site.min_ambient_temperature_c, -8.0);
        assert!(!site.degraded);
    }

    #[tokio::test]
    async fn test_explicit_orientation_skips_lookup() {
        let mut provider = MockSiteDataProvider::new();
        provider.expect_recommended_orientation().never();
        provider.expect_monthly_climate().returning(|_| Ok(climate()));

        let site = resolve_site(&provider, &request(Some(20.0), Some(10.0))).await;
        assert_eq!((site.panel_angle_deg, site.panel_aspect_deg), (20.0, 10.0));
    }

    #[tokio::test]
    async fn test_partial_orientation_fills_missing_field() {
        let mut provider = MockSiteDataProvider::new();
        provider.expect_recommended_orientation().returning(|_, _| {
            Ok(PanelOrientation {
                angle_deg: 38.0,
                aspect_deg: 5.0,
            })
        });
        provider.expect_monthly_climate().returning(|_| Ok(climate()));

        let site = resolve_site(&provider, &request(Some(20.0), None)).await;
        assert_eq!((site.panel_angle_deg, site.panel_aspect_deg), (20.0, 5.0));
    }

    #[tokio::test]
    async fn test_climate_failure_degrades_to_zero() {
        let mut provider = MockSiteDataProvider::new();
        provider
            .expect_monthly_climate()
            .returning(|_| Err(EngineError::UpstreamUnavailable("timeout".into())));

        let site = resolve_site(&provider, &request(Some(30.0), Some(0.0))).await;
        assert!(site.degraded);
        assert_eq!(site.monthly.len(), 12);
        assert!(site.monthly.iter().all(|m| m.irradiance_psh == 0.0));
        assert_eq!(site.max_ambient_temperature_c, 0.0);
        assert_eq!(site.panel_angle_deg, 30.0);
    }

    #[tokio::test]
    async fn test_orientation_failure_keeps_climate() {
        let mut provider = MockSiteDataProvider::new();
        provider
            .expect_recommended_orientation()
            .returning(|_, _| Err(EngineError::UpstreamUnavailable("503".into())));
        provider.expect_monthly_climate().returning(|_| Ok(climate()));

        let site = resolve_site(&provider, &request(None, None)).await;
        assert!(site.degraded);
        assert_eq!(site.panel_angle_deg, 0.0);
        assert!(site.monthly.iter().all(|m| m.irradiance_psh > 0.0));
    }

    #[tokio::test]
    async fn test_missing_months_are_zero_filled() {
        let mut provider = MockSiteDataProvider::new();
        provider.expect_monthly_climate().returning(|_| {
            let mut c = climate();
            c.monthly.retain(|m| m.month != 2);
            Ok(c)
        });

        let site = resolve_site(&provider, &request(Some(30.0), Some(0.0))).await;
        assert!(site.degraded);
        assert_eq!(site.month(2).map(|m| m.irradiance_psh), Some(0.0));
    }
}
