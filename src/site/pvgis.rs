//! PVGIS (EU JRC photovoltaic geographical information system) client.
//!
//! Each request is a single attempt bounded by the client timeout; callers
//! decide how to degrade on failure.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{MonthlyClimate, PanelOrientation, SiteDataProvider, SiteLocation};
use crate::domain::MonthlyData;
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_BASE_URL: &str = "https://re.jrc.ec.europa.eu/api/v5_2";

pub struct PvgisClient {
    client: Client,
    base_url: String,
    loss_percent: f64,
}

impl PvgisClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, loss_percent: f64) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("offgrid-planner/0.1")
            .build()
            .map_err(|e| EngineError::UpstreamUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            loss_percent,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, endpoint: &str, query: &[(&str, String)]) -> EngineResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "PVGIS request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("PVGIS {endpoint} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, endpoint, "PVGIS returned error status");
            return Err(EngineError::UpstreamUnavailable(format!("PVGIS {endpoint} returned {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("PVGIS {endpoint} response unreadable: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct RadiationResponse {
    outputs: RadiationOutputs,
}

#[derive(Debug, Deserialize)]
struct RadiationOutputs {
    monthly: Vec<RadiationMonth>,
}

#[derive(Debug, Deserialize)]
struct RadiationMonth {
    year: i32,
    month: u32,
    /// Monthly irradiation on the inclined plane (kWh/m²).
    #[serde(rename = "H(i)_m")]
    irradiation_kwh_m2: f64,
    #[serde(rename = "T2m")]
    temperature_c: f64,
}

#[derive(Debug, Deserialize)]
struct PvCalcResponse {
    inputs: PvCalcInputs,
}

#[derive(Debug, Deserialize)]
struct PvCalcInputs {
    mounting_system: MountingSystem,
}

#[derive(Debug, Deserialize)]
struct MountingSystem {
    fixed: FixedMounting,
}

#[derive(Debug, Deserialize)]
struct FixedMounting {
    slope: AngleValue,
    azimuth: AngleValue,
}

#[derive(Debug, Deserialize)]
struct AngleValue {
    value: f64,
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Average every year of a month into one PSH / temperature pair.
fn summarize(records: &[RadiationMonth]) -> EngineResult<MonthlyClimate> {
    if records.is_empty() {
        return Err(EngineError::UpstreamUnavailable("PVGIS returned no monthly records".into()));
    }

    let mut by_month: BTreeMap<u32, (f64, f64, u32)> = BTreeMap::new();
    for r in records {
        let days = days_in_month(r.year, r.month)
            .ok_or_else(|| EngineError::UpstreamUnavailable(format!("PVGIS returned invalid month {}-{}", r.year, r.month)))?;
        let entry = by_month.entry(r.month).or_insert((0.0, 0.0, 0));
        entry.0 += r.irradiation_kwh_m2 / f64::from(days);
        entry.1 += r.temperature_c;
        entry.2 += 1;
    }

    let monthly = by_month
        .into_iter()
        .map(|(month, (psh, temp, n))| MonthlyData {
            month: month as u8,
            irradiance_psh: psh / f64::from(n),
            ambient_temperature_c: temp / f64::from(n),
        })
        .collect();

    let min_ambient_c = records.iter().map(|r| r.temperature_c).fold(f64::INFINITY, f64::min);
    let max_ambient_c = records.iter().map(|r| r.temperature_c).fold(f64::NEG_INFINITY, f64::max);

    Ok(MonthlyClimate {
        monthly,
        min_ambient_c,
        max_ambient_c,
    })
}

#[async_trait]
impl SiteDataProvider for PvgisClient {
    async fn monthly_climate(&self, location: &SiteLocation) -> EngineResult<MonthlyClimate> {
        let query = [
            ("lat", format!("{:.6}", location.latitude)),
            ("lon", format!("{:.6}", location.longitude)),
            ("horirrad", "0".to_string()),
            ("selectrad", "1".to_string()),
            ("angle", format!("{:.1}", location.angle_deg)),
            ("aspect", format!("{:.1}", location.aspect_deg)),
            ("avtemp", "1".to_string()),
            ("outputformat", "json".to_string()),
        ];
        let response: RadiationResponse = self.get_json("MRcalc", &query).await?;
        let climate = summarize(&response.outputs.monthly)?;
        info!(
            latitude = location.latitude,
            longitude = location.longitude,
            months = climate.monthly.len(),
            "fetched monthly climate from PVGIS"
        );
        Ok(climate)
    }

    async fn recommended_orientation(&self, latitude: f64, longitude: f64) -> EngineResult<PanelOrientation> {
        let query = [
            ("lat", format!("{latitude:.6}")),
            ("lon", format!("{longitude:.6}")),
            ("peakpower", "1".to_string()),
            ("loss", format!("{:.1}", self.loss_percent)),
            ("optimalangles", "1".to_string()),
            ("outputformat", "json".to_string()),
        ];
        let response: PvCalcResponse = self.get_json("PVcalc", &query).await?;
        let fixed = response.inputs.mounting_system.fixed;
        Ok(PanelOrientation {
            angle_deg: fixed.slope.value,
            aspect_deg: fixed.azimuth.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PvgisClient {
        PvgisClient::new(server.uri(), Duration::from_secs(5), 14.0).unwrap()
    }

    fn location() -> SiteLocation {
        SiteLocation {
            latitude: 45.0,
            longitude: 7.5,
            angle_deg: 35.0,
            aspect_deg: 0.0,
        }
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2020, 2), Some(29));
        assert_eq!(days_in_month(2021, 2), Some(28));
        assert_eq!(days_in_month(2021, 12), Some(31));
        assert_eq!(days_in_month(2021, 13), None);
    }

    #[tokio::test]
    async fn test_monthly_climate_averages_years() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/MRcalc"))
            .and(query_param("selectrad", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "outputs": { "monthly": [
                    { "year": 2020, "month": 1, "H(i)_m": 62.0, "T2m": -2.0 },
                    { "year": 2021, "month": 1, "H(i)_m": 93.0, "T2m": 4.0 },
                    { "year": 2020, "month": 6, "H(i)_m": 180.0, "T2m": 24.0 }
                ]}
            })))
            .mount(&server)
            .await;

        let climate = client(&server).monthly_climate(&location()).await.unwrap();
        assert_eq!(climate.monthly.len(), 2);
        // (62/31 + 93/31) / 2 = 2.5
        assert_relative_eq!(climate.monthly[0].irradiance_psh, 2.5, epsilon = 1e-9);
        assert_relative_eq!(climate.monthly[0].ambient_temperature_c, 1.0);
        assert_relative_eq!(climate.monthly[1].irradiance_psh, 6.0, epsilon = 1e-9);
        assert_eq!(climate.min_ambient_c, -2.0);
        assert_eq!(climate.max_ambient_c, 24.0);
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/MRcalc"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).monthly_climate(&location()).await.unwrap_err();
        assert!(matches!(err, EngineError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_recommended_orientation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PVcalc"))
            .and(query_param("optimalangles", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "inputs": { "mounting_system": { "fixed": {
                    "slope": { "value": 37, "optimal": true },
                    "azimuth": { "value": -3, "optimal": true },
                    "type": "free-standing"
                }}}
            })))
            .mount(&server)
            .await;

        let orientation = client(&server).recommended_orientation(45.0, 7.5).await.unwrap();
        assert_eq!(orientation.angle_deg, 37.0);
        assert_eq!(orientation.aspect_deg, -3.0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PVcalc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).recommended_orientation(45.0, 7.5).await.unwrap_err();
        assert!(matches!(err, EngineError::UpstreamUnavailable(_)));
    }
}
