//! End-to-end tests of the HTTP surface over in-memory stores.
//!
//! The site provider is replaced by a fixed climate so no network is used.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use figment::{providers::{Format, Toml}, Figment};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use offgrid_planner::{
    api,
    config::Config,
    domain::{MonthlyData, Project},
    engine::TemperatureCoefficients,
    error::EngineResult,
    repo::{CatalogSeed, InMemoryCatalog, InMemoryProjectStore},
    service::{AppState, ConfigurationService},
    site::{MonthlyClimate, PanelOrientation, SiteDataProvider, SiteLocation},
};

const TOKEN: &str = "test-token";
const OWNER: &str = "00000000-0000-0000-0000-0000000000aa";
const PROJECT: &str = "9a0e0000-0000-4000-8000-000000000001";
const OTHER_PROJECT: &str = "9a0e0000-0000-4000-8000-000000000002";

const CONFIG: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0

    [auth.users]
    test-token = "00000000-0000-0000-0000-0000000000aa"

    [site_provider]
    base_url = "http://localhost:9"
    http_timeout_seconds = 1

    [data]
    catalog_path = "data/catalog.json"
"#;

struct FixedClimate;

#[async_trait]
impl SiteDataProvider for FixedClimate {
    async fn monthly_climate(&self, _location: &SiteLocation) -> EngineResult<MonthlyClimate> {
        Ok(MonthlyClimate {
            monthly: (1..=12u8)
                .map(|month| MonthlyData {
                    month,
                    irradiance_psh: if month == 1 { 3.5 } else { 5.0 },
                    ambient_temperature_c: 25.0,
                })
                .collect(),
            min_ambient_c: -5.0,
            max_ambient_c: 35.0,
        })
    }

    async fn recommended_orientation(&self, _latitude: f64, _longitude: f64) -> EngineResult<PanelOrientation> {
        Ok(PanelOrientation {
            angle_deg: 35.0,
            aspect_deg: 0.0,
        })
    }
}

fn catalog_seed() -> CatalogSeed {
    serde_json::from_value(json!({
        "solar_panels": [{
            "id": "5a1e0000-0000-4000-8000-000000000002",
            "manufacturer": "Sunforge", "model": "SF-300M",
            "rated_power_w": 300.0, "voc_v": 40.0, "vmp_v": 33.0, "isc_a": 9.8, "imp_a": 9.1,
            "temp_coefficient_pmax": -0.4, "temp_coefficient_voc": -0.12
        }],
        "batteries": [{
            "id": "ba770000-0000-4000-8000-000000000001",
            "manufacturer": "Cellwerk", "model": "LFP-12-100",
            "chemistry": "LiFePO4", "voltage_v": 12.0, "capacity_ah": 100.0, "dod": 0.8
        }],
        "inverters": [{
            "id": "1a7e0000-0000-4000-8000-000000000002",
            "manufacturer": "Voltix", "model": "PI-24-1000",
            "voltage_v": 24,
            "continuous_power_25c_w": 1000.0, "continuous_power_40c_w": 900.0, "continuous_power_65c_w": 700.0,
            "max_power_w": 2000.0, "efficiency_percent": 90.0
        }],
        "controllers": [{
            "id": "c0a70000-0000-4000-8000-000000000002",
            "manufacturer": "Chargeline", "model": "MPPT-150/100",
            "type": "MPPT", "max_voltage_v": 150.0, "current_rating_a": 100.0, "rated_power_w": 3000.0
        }]
    }))
    .unwrap()
}

async fn app() -> Router {
    let cfg = Config::from_figment(Figment::new().merge(Toml::string(CONFIG))).unwrap();
    let owner: Uuid = OWNER.parse().unwrap();

    let projects = InMemoryProjectStore::new();
    projects.insert(Project::new(PROJECT.parse().unwrap(), owner, "cabin")).await;
    projects
        .insert(Project::new(OTHER_PROJECT.parse().unwrap(), Uuid::new_v4(), "someone else's"))
        .await;

    let service = ConfigurationService::new(
        Arc::new(InMemoryCatalog::from_seed(catalog_seed())),
        Arc::new(projects),
        Arc::new(FixedClimate),
        Arc::new(TemperatureCoefficients::default()),
        cfg.engine.clone(),
    );
    let state = AppState {
        identities: Arc::new(cfg.auth.users.clone()),
        service: Arc::new(service),
        cfg: cfg.clone(),
    };
    api::router(state, &cfg)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn project_uri(path: &str) -> String {
    format!("/api/v1/projects/{PROJECT}/{path}")
}

#[tokio::test]
async fn test_healthz_needs_no_token() {
    let app = app().await;
    let (status, _) = send(&app, Method::GET, "/api/v1/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_unknown_token_is_unauthorized() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, &project_uri("configuration"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = send(&app, Method::GET, &project_uri("configuration"), None, Some("nope")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_selection_queries_return_defaults() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, &project_uri("controller"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["controller_id"], Value::Null);
    assert_eq!(body["is_valid"], false);

    let (status, body) = send(&app, Method::GET, &project_uri("solar-array"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number_of_panels"], 0);
}

#[tokio::test]
async fn test_unknown_and_foreign_projects_are_not_found() {
    let app = app().await;
    let uri = format!("/api/v1/projects/{}/configuration", Uuid::new_v4());
    let (status, body) = send(&app, Method::GET, &uri, None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");

    let uri = format!("/api/v1/projects/{OTHER_PROJECT}/configuration");
    let (status, _) = send(&app, Method::GET, &uri, None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_payloads_are_bad_requests() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &project_uri("system-voltage"),
        Some(json!({ "system_voltage": 36 })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, body) = send(
        &app,
        Method::POST,
        &project_uri("solar-array"),
        Some(json!({ "solar_panel_id": "5a1e0000-0000-4000-8000-000000000002", "oversize_coefficient": "big" })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (status, _) = send(
        &app,
        Method::POST,
        &project_uri("solar-array"),
        Some(json!({
            "solar_panel_id": "5a1e0000-0000-4000-8000-000000000002",
            "oversize_coefficient": 1.0,
            "battery_efficiency": 0.85,
            "cable_efficiency": 0.97,
            "selected_months": [13]
        })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_configuration_flow() {
    let app = app().await;

    let (status, load) = send(
        &app,
        Method::PUT,
        &project_uri("appliances"),
        Some(json!({ "appliances": [
            { "name": "fridge", "type": "AC", "power_w": 100.0, "quantity": 1,
              "hours_per_day": 24.0, "days_per_week": 7, "peak_power_w": 300.0 },
            { "name": "lights", "type": "DC", "power_w": 10.0, "quantity": 4,
              "hours_per_day": 5.0, "days_per_week": 7, "peak_power_w": 10.0 }
        ]})),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(load["recommended_system_voltage"], 24);
    assert_eq!(load["system_voltage"], 24);

    let (status, suitable) = send(&app, Method::GET, &project_uri("inverters/suitable?temperature=40"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(suitable["temperature_fallback"], false);
    assert_eq!(suitable["inverters"].as_array().unwrap().len(), 1);

    let (status, inverter) = send(
        &app,
        Method::POST,
        &project_uri("inverter"),
        Some(json!({ "inverter_id": "1a7e0000-0000-4000-8000-000000000002", "temperature_c": 25 })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inverter["compatible"], true);

    let (status, batteries) = send(&app, Method::GET, &project_uri("batteries/suitable?technology=lifepo4"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batteries["batteries"].as_array().unwrap().len(), 1);

    let (status, battery) = send(
        &app,
        Method::POST,
        &project_uri("battery"),
        Some(json!({ "battery_id": "ba770000-0000-4000-8000-000000000001", "autonomy_days": 2, "temperature_c": 25 })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(battery["parallel_count"], 3);
    assert_eq!(battery["series_count"], 2);

    let (status, site) = send(
        &app,
        Method::PUT,
        &project_uri("site"),
        Some(json!({ "latitude": 45.0, "longitude": 7.0 })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(site["panel_angle_deg"], 35.0);
    assert_eq!(site["degraded"], false);

    let (status, solar) = send(
        &app,
        Method::POST,
        &project_uri("solar-array"),
        Some(json!({
            "solar_panel_id": "5a1e0000-0000-4000-8000-000000000002",
            "oversize_coefficient": 1.0,
            "battery_efficiency": 0.85,
            "cable_efficiency": 0.97,
            "selected_months": [1, 6],
            "installation_type": "parallel_less_150mm"
        })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(solar["number_of_panels"], 4);
    assert_eq!(solar["sizing_month"], 1);

    let (status, controller) = send(
        &app,
        Method::POST,
        &project_uri("controller"),
        Some(json!({ "controller_id": "c0a70000-0000-4000-8000-000000000002" })),
        Some(TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(controller["controller_type"], "MPPT");
    assert_eq!(controller["is_valid"], true);
    assert_eq!(controller["series_modules"], 2);
    assert_eq!(controller["parallel_modules"], 2);
    assert_eq!(controller["installation_temperature_adder_c"], 35.0);

    let (status, model) = send(&app, Method::GET, &project_uri("configuration"), None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(model["controller"], controller);
    assert_eq!(model["total_ac_energy_wh"], 2400.0);
}
