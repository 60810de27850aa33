//! Project configuration service: runs one pipeline stage per call against a
//! freshly read project and persists it with an optimistic version check.

pub mod requests;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::{Config, EngineConfig};
use crate::domain::{
    Battery, BatterySelection, ConfigurationModel, Controller, ControllerSelection, ControllerSpec,
    InstallTemperature, Inverter, InverterSelection, Project, Site, SolarArraySelection, SolarPanel,
    STC_TEMPERATURE_C,
};
use crate::engine::{
    aggregate_loads, is_suitable_battery, is_suitable_inverter, recommend_system_voltage, size_battery,
    size_controller, size_inverter, size_solar_array, suitable_inverters, ArrayContext, BatteryDemand,
    InverterDemand, SolarDesign, TemperatureCoefficients,
};
use crate::error::{EngineError, EngineResult};
use crate::repo::{fetch, fetch_all, CatalogStore, InMemoryCatalog, InMemoryProjectStore, ProjectStore};
use crate::site::{resolve_site, PvgisClient, SiteDataProvider, SiteRequest};

pub use requests::{
    AppliancesRequest, LoadSnapshot, SelectBatteryRequest, SelectControllerRequest, SelectInverterRequest,
    SelectSolarArrayRequest, SuitableBatteries, SuitableBatteriesQuery, SuitableInverters, SuitableInvertersQuery,
    SystemVoltageRequest,
};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub service: Arc<ConfigurationService>,
    /// Bearer token to user id.
    pub identities: Arc<HashMap<String, Uuid>>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let catalog = InMemoryCatalog::from_json_file(&cfg.data.catalog_path)?;
        let projects = match &cfg.data.projects_path {
            Some(path) => InMemoryProjectStore::from_json_file(path)?,
            None => InMemoryProjectStore::new(),
        };
        let coefficients = match &cfg.engine.coefficient_table_path {
            Some(path) => TemperatureCoefficients::from_file(path)?,
            None => TemperatureCoefficients::default(),
        };
        let site_provider = PvgisClient::new(
            cfg.site_provider.base_url.clone(),
            Duration::from_secs(cfg.site_provider.http_timeout_seconds),
            cfg.site_provider.loss_percent,
        )?;

        let catalog_items = catalog.len().await;
        info!(catalog_items, "configuration service ready");

        let service = Arc::new(ConfigurationService::new(
            Arc::new(catalog),
            Arc::new(projects),
            Arc::new(site_provider),
            Arc::new(coefficients),
            cfg.engine.clone(),
        ));

        Ok(Self {
            identities: Arc::new(cfg.auth.users.clone()),
            cfg,
            service,
        })
    }

    pub fn resolve_token(&self, token: &str) -> Option<Uuid> {
        self.identities.get(token).copied()
    }
}

pub struct ConfigurationService {
    catalog: Arc<dyn CatalogStore>,
    projects: Arc<dyn ProjectStore>,
    site_provider: Arc<dyn SiteDataProvider>,
    coefficients: Arc<TemperatureCoefficients>,
    settings: EngineConfig,
}

fn snapshot(model: &ConfigurationModel) -> LoadSnapshot {
    LoadSnapshot {
        totals: model.load,
        recommended_system_voltage: model.recommended_system_voltage,
        system_voltage: model.system_voltage,
    }
}

/// Recompute the load aggregate from the appliance list. The bus voltage
/// follows the recommendation while the user has not overridden it.
fn apply_load_totals(project: &mut Project) -> LoadSnapshot {
    let totals = aggregate_loads(&project.appliances);
    let recommended = recommend_system_voltage(totals.total_energy_wh());
    if totals.unclassified_appliances > 0 {
        warn!(
            project_id = %project.id,
            count = totals.unclassified_appliances,
            "appliances without a type excluded from load totals"
        );
    }

    let model = project.configuration_mut();
    model.load = totals;
    model.recommended_system_voltage = Some(recommended);
    if !model.system_voltage_overridden {
        model.system_voltage = Some(recommended);
    }
    snapshot(model)
}

/// The project's configuration model, created with a fresh load snapshot on
/// first use.
fn ensure_model(project: &mut Project) -> &mut ConfigurationModel {
    if project.configuration.is_none() {
        apply_load_totals(project);
    }
    project.configuration_mut()
}

fn system_voltage(model: &ConfigurationModel) -> EngineResult<u32> {
    model
        .system_voltage
        .ok_or_else(|| EngineError::invalid("system voltage is not set"))
}

/// Daily energy the storage and generation stages must cover. AC loads need
/// the inverter's loss-adjusted figure; DC-only projects can skip the
/// inverter.
fn daily_energy_demand(model: &ConfigurationModel) -> EngineResult<f64> {
    match &model.inverter {
        Some(inverter) if inverter.inverter_id.is_some() => Ok(inverter.total_daily_energy_wh),
        _ if model.load.total_ac_energy_wh > 0.0 => Err(EngineError::invalid(
            "an inverter must be selected before sizing storage or generation for AC loads",
        )),
        _ => Ok(model.load.total_dc_energy_wh),
    }
}

/// Read-only view of the model; projects that never ran a stage get a
/// snapshot computed on the fly.
fn current_model(project: &Project) -> ConfigurationModel {
    match &project.configuration {
        Some(model) => model.clone(),
        None => {
            let mut scratch = project.clone();
            apply_load_totals(&mut scratch);
            scratch.configuration.unwrap_or_default()
        }
    }
}

impl ConfigurationService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        projects: Arc<dyn ProjectStore>,
        site_provider: Arc<dyn SiteDataProvider>,
        coefficients: Arc<TemperatureCoefficients>,
        settings: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            projects,
            site_provider,
            coefficients,
            settings,
        }
    }

    async fn load_owned(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<Project> {
        let project = self.projects.find_by_id(project_id).await?;
        if project.owner_id != user_id {
            warn!(%project_id, %user_id, "project access by non-owner");
            return Err(EngineError::not_found("Project", project_id));
        }
        Ok(project)
    }

    /// Read, mutate, and save the project, re-running `apply` against a fresh
    /// read whenever the save hits a concurrent update.
    async fn update<T, F>(&self, user_id: Uuid, project_id: Uuid, mut apply: F) -> EngineResult<T>
    where
        T: Send,
        F: FnMut(&mut Project) -> EngineResult<T> + Send,
    {
        let mut retries = 0;
        loop {
            let mut project = self.load_owned(user_id, project_id).await?;
            let expected = project.version;
            let outcome = apply(&mut project)?;
            match self.projects.save(project, expected).await {
                Ok(_) => return Ok(outcome),
                Err(EngineError::Conflict { found, .. }) if retries < self.settings.max_update_retries => {
                    retries += 1;
                    warn!(%project_id, expected, found, retries, "concurrent project update, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn configuration(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<ConfigurationModel> {
        let project = self.load_owned(user_id, project_id).await?;
        Ok(project.configuration.unwrap_or_default())
    }

    pub async fn load_totals(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<LoadSnapshot> {
        let project = self.load_owned(user_id, project_id).await?;
        Ok(snapshot(&current_model(&project)))
    }

    pub async fn refresh_load_totals(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<LoadSnapshot> {
        let snapshot = self.update(user_id, project_id, |p| Ok(apply_load_totals(p))).await?;
        info!(
            %project_id,
            total_energy_wh = snapshot.totals.total_energy_wh(),
            recommended_system_voltage = snapshot.recommended_system_voltage,
            "load totals refreshed"
        );
        Ok(snapshot)
    }

    pub async fn replace_appliances(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: AppliancesRequest,
    ) -> EngineResult<LoadSnapshot> {
        request.validate()?;
        let count = request.appliances.len();
        let snapshot = self
            .update(user_id, project_id, |p| {
                p.appliances = request.appliances.clone();
                Ok(apply_load_totals(p))
            })
            .await?;
        info!(
            %project_id,
            appliances = count,
            total_energy_wh = snapshot.totals.total_energy_wh(),
            "appliances replaced"
        );
        Ok(snapshot)
    }

    pub async fn set_system_voltage(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: SystemVoltageRequest,
    ) -> EngineResult<LoadSnapshot> {
        if !request.is_supported() {
            return Err(EngineError::invalid(format!(
                "unsupported system voltage {} V (expected 12, 24 or 48)",
                request.system_voltage
            )));
        }
        let snapshot = self
            .update(user_id, project_id, |p| {
                let model = ensure_model(p);
                model.system_voltage = Some(request.system_voltage);
                model.system_voltage_overridden = true;
                Ok(snapshot(model))
            })
            .await?;
        info!(%project_id, system_voltage = request.system_voltage, "system voltage set");
        Ok(snapshot)
    }

    /// Resolve site climate through the provider and store it on the project.
    /// Provider failures degrade the site instead of failing the call.
    pub async fn configure_site(&self, user_id: Uuid, project_id: Uuid, request: SiteRequest) -> EngineResult<Site> {
        request.validate()?;
        // Ownership first so a foreign project never triggers upstream calls.
        self.load_owned(user_id, project_id).await?;

        let site = resolve_site(self.site_provider.as_ref(), &request).await;
        if site.degraded {
            warn!(%project_id, "site stored with degraded climate data");
        }
        self.update(user_id, project_id, |p| {
            p.site = Some(site.clone());
            Ok(())
        })
        .await?;
        Ok(site)
    }

    pub async fn suitable_inverters(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        temperature_c: i32,
    ) -> EngineResult<SuitableInverters> {
        let project = self.load_owned(user_id, project_id).await?;
        let model = current_model(&project);
        let demand = InverterDemand::new(system_voltage(&model)?, &model.load);
        let (bucket, fallback) = InstallTemperature::from_celsius(temperature_c);
        if fallback {
            warn!(%project_id, temperature_c, "no inverter rating at requested temperature, using 65 °C");
        }

        let catalog: Vec<Inverter> = fetch_all(self.catalog.as_ref()).await?;
        let inverters: Vec<Inverter> = suitable_inverters(&catalog, &demand, bucket).into_iter().cloned().collect();
        info!(%project_id, candidates = catalog.len(), suitable = inverters.len(), "inverter filter");

        Ok(SuitableInverters {
            install_temperature: bucket,
            temperature_fallback: fallback,
            inverters,
        })
    }

    pub async fn select_inverter(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: SelectInverterRequest,
    ) -> EngineResult<InverterSelection> {
        let inverter: Inverter = fetch(self.catalog.as_ref(), request.inverter_id).await?;
        if inverter.efficiency_fraction() <= 0.0 {
            return Err(EngineError::invalid(format!("inverter {} has no efficiency rating", inverter.id)));
        }
        let (bucket, fallback) = InstallTemperature::from_celsius(request.temperature_c);
        if fallback {
            warn!(
                %project_id,
                temperature_c = request.temperature_c,
                "no inverter rating at requested temperature, using 65 °C"
            );
        }

        let selection = self
            .update(user_id, project_id, |p| {
                let model = ensure_model(p);
                let compatible = model
                    .system_voltage
                    .map(|sv| is_suitable_inverter(&inverter, &InverterDemand::new(sv, &model.load), bucket))
                    .unwrap_or(false);
                let sizing = size_inverter(&inverter, &model.load);
                let selection = InverterSelection {
                    inverter_id: Some(inverter.id),
                    install_temperature: bucket,
                    temperature_fallback: fallback,
                    compatible,
                    total_adjusted_ac_energy_wh: sizing.total_adjusted_ac_energy_wh,
                    total_daily_energy_wh: sizing.total_daily_energy_wh,
                };
                model.inverter = Some(selection.clone());
                Ok(selection)
            })
            .await?;

        if !selection.compatible {
            warn!(%project_id, inverter_id = %inverter.id, "selected inverter does not pass the compatibility filter");
        }
        info!(
            %project_id,
            inverter_id = %inverter.id,
            total_daily_energy_wh = selection.total_daily_energy_wh,
            "inverter selected"
        );
        Ok(selection)
    }

    pub async fn inverter_selection(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<InverterSelection> {
        let model = self.configuration(user_id, project_id).await?;
        Ok(model.inverter.unwrap_or_default())
    }

    pub async fn suitable_batteries(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        technology: &str,
    ) -> EngineResult<SuitableBatteries> {
        if technology.trim().is_empty() {
            return Err(EngineError::invalid("battery technology is required"));
        }
        let project = self.load_owned(user_id, project_id).await?;
        let sv = system_voltage(&current_model(&project))?;

        let catalog: Vec<Battery> = fetch_all(self.catalog.as_ref()).await?;
        let batteries: Vec<Battery> = catalog
            .into_iter()
            .filter(|b| is_suitable_battery(b, sv, technology))
            .collect();
        info!(%project_id, technology, suitable = batteries.len(), "battery filter");

        Ok(SuitableBatteries {
            technology: technology.to_string(),
            batteries,
        })
    }

    pub async fn select_battery(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: SelectBatteryRequest,
    ) -> EngineResult<BatterySelection> {
        request.validate()?;
        let battery: Battery = fetch(self.catalog.as_ref(), request.battery_id).await?;

        let selection = self
            .update(user_id, project_id, |p| {
                let model = ensure_model(p);
                let demand = BatteryDemand {
                    total_daily_energy_wh: daily_energy_demand(model)?,
                    system_voltage: system_voltage(model)?,
                    autonomy_days: request.autonomy_days,
                    temperature_c: request.temperature_c,
                };
                let sizing = size_battery(&battery, &demand, &self.coefficients)?;
                let selection = BatterySelection {
                    battery_id: Some(battery.id),
                    autonomy_days: request.autonomy_days,
                    install_temperature_c: request.temperature_c,
                    temperature_coefficient: sizing.coefficient.value,
                    coefficient_fallback: sizing.coefficient.fallback,
                    required_capacity_ah: sizing.required_capacity_ah,
                    usable_capacity_ah: sizing.usable_capacity_ah,
                    parallel_count: sizing.parallel_count,
                    series_count: sizing.series_count,
                    total_available_capacity_ah: sizing.total_available_capacity_ah,
                    operational_days_estimate: sizing.operational_days_estimate,
                };
                model.battery = Some(selection.clone());
                Ok(selection)
            })
            .await?;

        if selection.coefficient_fallback {
            warn!(
                %project_id,
                chemistry = %battery.chemistry,
                temperature_c = request.temperature_c,
                "no temperature coefficient for exact temperature, using 1.0"
            );
        }
        info!(
            %project_id,
            battery_id = %battery.id,
            parallel = selection.parallel_count,
            series = selection.series_count,
            "battery bank sized"
        );
        Ok(selection)
    }

    pub async fn battery_selection(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<BatterySelection> {
        let model = self.configuration(user_id, project_id).await?;
        Ok(model.battery.unwrap_or_default())
    }

    pub async fn select_solar_array(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: SelectSolarArrayRequest,
    ) -> EngineResult<SolarArraySelection> {
        request.validate()?;
        let panel: SolarPanel = fetch(self.catalog.as_ref(), request.solar_panel_id).await?;
        let aggregation = self.settings.production_aggregation;
        let design = SolarDesign {
            oversize_coefficient: request.oversize_coefficient,
            battery_efficiency: request.battery_efficiency,
            cable_efficiency: request.cable_efficiency,
            selected_months: request.selected_months.clone(),
        };

        let selection = self
            .update(user_id, project_id, |p| {
                let site = p
                    .site
                    .clone()
                    .ok_or_else(|| EngineError::invalid("site must be configured before sizing the solar array"))?;
                let model = ensure_model(p);
                let sizing = size_solar_array(&panel, &site, daily_energy_demand(model)?, &design, aggregation)?;
                let selection = SolarArraySelection {
                    solar_panel_id: Some(panel.id),
                    installation_type: request.installation_type,
                    oversize_coefficient: request.oversize_coefficient,
                    battery_efficiency: request.battery_efficiency,
                    cable_efficiency: request.cable_efficiency,
                    panel_temperature_c: request.panel_temperature_c,
                    selected_months: sizing.monthly.iter().map(|m| m.month).collect(),
                    number_of_panels: sizing.number_of_panels,
                    sizing_month: sizing.sizing_month,
                    total_power_generated_w: sizing.total_power_generated_w,
                    production_aggregation: aggregation,
                    estimated_daily_production_wh: sizing.estimated_daily_production_wh,
                    monthly: sizing.monthly,
                };
                model.solar_array = Some(selection.clone());
                Ok(selection)
            })
            .await?;

        info!(
            %project_id,
            solar_panel_id = %panel.id,
            panels = selection.number_of_panels,
            sizing_month = selection.sizing_month,
            "solar array sized"
        );
        Ok(selection)
    }

    pub async fn solar_array_selection(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<SolarArraySelection> {
        let model = self.configuration(user_id, project_id).await?;
        Ok(model.solar_array.unwrap_or_default())
    }

    pub async fn select_controller(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        request: SelectControllerRequest,
    ) -> EngineResult<ControllerSelection> {
        let controller: Controller = fetch(self.catalog.as_ref(), request.controller_id).await?;

        let read = self.load_owned(user_id, project_id).await?;
        let panel_id = read
            .configuration
            .as_ref()
            .and_then(|m| m.solar_array.as_ref())
            .and_then(|s| s.solar_panel_id)
            .ok_or_else(|| EngineError::invalid("solar array must be sized before selecting a controller"))?;
        let panel: SolarPanel = fetch(self.catalog.as_ref(), panel_id).await?;

        let selection = self
            .update(user_id, project_id, |p| {
                let (min_ambient_c, max_ambient_c) = match (&controller.spec, &p.site) {
                    (_, Some(site)) => (site.min_ambient_temperature_c, site.max_ambient_temperature_c),
                    (ControllerSpec::Mppt { .. }, None) => {
                        return Err(EngineError::invalid("MPPT sizing needs site temperatures"));
                    }
                    (ControllerSpec::Pwm { .. }, None) => (STC_TEMPERATURE_C, STC_TEMPERATURE_C),
                };
                let version = p.version;
                let model = ensure_model(p);
                let solar = model
                    .solar_array
                    .clone()
                    .ok_or_else(|| EngineError::invalid("solar array must be sized before selecting a controller"))?;
                // The array changed panel model after it was read above.
                if solar.solar_panel_id != Some(panel.id) {
                    return Err(EngineError::Conflict {
                        project_id,
                        expected: read.version,
                        found: version,
                    });
                }

                let ctx = ArrayContext {
                    panel: &panel,
                    number_of_panels: solar.number_of_panels,
                    system_voltage: system_voltage(model)?,
                    min_ambient_c,
                    max_ambient_c,
                };
                let selection =
                    size_controller(&controller.spec, &ctx).into_selection(&controller, solar.installation_type);
                model.controller = Some(selection.clone());
                Ok(selection)
            })
            .await?;

        if selection.is_valid {
            info!(
                %project_id,
                controller_id = %controller.id,
                series = selection.series_modules,
                parallel = selection.parallel_modules,
                "controller configuration valid"
            );
        } else {
            warn!(
                %project_id,
                controller_id = %controller.id,
                issues = ?selection.issues,
                "no compatible controller configuration"
            );
        }
        Ok(selection)
    }

    pub async fn controller_selection(&self, user_id: Uuid, project_id: Uuid) -> EngineResult<ControllerSelection> {
        let model = self.configuration(user_id, project_id).await?;
        Ok(model.controller.unwrap_or_default())
    }
}
