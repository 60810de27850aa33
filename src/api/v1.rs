use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{
    auth::AuthBearer,
    domain::{BatterySelection, ConfigurationModel, ControllerSelection, InverterSelection, Site, SolarArraySelection},
    service::{
        AppState, AppliancesRequest, LoadSnapshot, SelectBatteryRequest, SelectControllerRequest,
        SelectInverterRequest, SelectSolarArrayRequest, SuitableBatteries, SuitableBatteriesQuery,
        SuitableInverters, SuitableInvertersQuery, SystemVoltageRequest,
    },
    site::SiteRequest,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/projects/:id/configuration", get(get_configuration))
        .route("/projects/:id/appliances", put(put_appliances))
        .route("/projects/:id/load-totals", get(get_load_totals).post(refresh_load_totals))
        .route("/projects/:id/system-voltage", put(put_system_voltage))
        .route("/projects/:id/site", put(put_site))
        .route("/projects/:id/inverters/suitable", get(get_suitable_inverters))
        .route("/projects/:id/inverter", get(get_inverter).post(select_inverter))
        .route("/projects/:id/batteries/suitable", get(get_suitable_batteries))
        .route("/projects/:id/battery", get(get_battery).post(select_battery))
        .route("/projects/:id/solar-array", get(get_solar_array).post(select_solar_array))
        .route("/projects/:id/controller", get(get_controller).post(select_controller))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn get_configuration(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<ConfigurationModel> {
    Ok(Json(st.service.configuration(user, project_id).await?))
}

pub async fn put_appliances(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AppliancesRequest>,
) -> ApiResult<LoadSnapshot> {
    Ok(Json(st.service.replace_appliances(user, project_id, req).await?))
}

pub async fn get_load_totals(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<LoadSnapshot> {
    Ok(Json(st.service.load_totals(user, project_id).await?))
}

pub async fn refresh_load_totals(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<LoadSnapshot> {
    Ok(Json(st.service.refresh_load_totals(user, project_id).await?))
}

pub async fn put_system_voltage(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SystemVoltageRequest>,
) -> ApiResult<LoadSnapshot> {
    Ok(Json(st.service.set_system_voltage(user, project_id, req).await?))
}

pub async fn put_site(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SiteRequest>,
) -> ApiResult<Site> {
    Ok(Json(st.service.configure_site(user, project_id, req).await?))
}

pub async fn get_suitable_inverters(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiQuery(q): ApiQuery<SuitableInvertersQuery>,
) -> ApiResult<SuitableInverters> {
    Ok(Json(st.service.suitable_inverters(user, project_id, q.temperature).await?))
}

pub async fn get_inverter(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<InverterSelection> {
    Ok(Json(st.service.inverter_selection(user, project_id).await?))
}

pub async fn select_inverter(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SelectInverterRequest>,
) -> ApiResult<InverterSelection> {
    Ok(Json(st.service.select_inverter(user, project_id, req).await?))
}

pub async fn get_suitable_batteries(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiQuery(q): ApiQuery<SuitableBatteriesQuery>,
) -> ApiResult<SuitableBatteries> {
    Ok(Json(st.service.suitable_batteries(user, project_id, &q.technology).await?))
}

pub async fn get_battery(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<BatterySelection> {
    Ok(Json(st.service.battery_selection(user, project_id).await?))
}

pub async fn select_battery(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SelectBatteryRequest>,
) -> ApiResult<BatterySelection> {
    Ok(Json(st.service.select_battery(user, project_id, req).await?))
}

pub async fn get_solar_array(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<SolarArraySelection> {
    Ok(Json(st.service.solar_array_selection(user, project_id).await?))
}

pub async fn select_solar_array(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SelectSolarArrayRequest>,
) -> ApiResult<SolarArraySelection> {
    Ok(Json(st.service.select_solar_array(user, project_id, req).await?))
}

pub async fn get_controller(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
) -> ApiResult<ControllerSelection> {
    Ok(Json(st.service.controller_selection(user, project_id).await?))
}

pub async fn select_controller(
    State(st): State<AppState>,
    AuthBearer(user): AuthBearer,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SelectControllerRequest>,
) -> ApiResult<ControllerSelection> {
    Ok(Json(st.service.select_controller(user, project_id, req).await?))
}
