use utoipa::OpenApi;

use crate::domain::{
    Appliance, ApplianceType, Battery, BatteryChemistry, BatterySelection, ConfigurationModel, Controller,
    ControllerSelection, ControllerSpec, ControllerType, InstallTemperature, InstallationType, Inverter,
    InverterSelection, LoadTotals, MonthlyCalc, MonthlyData, ProductionAggregation, Site, SolarArraySelection,
    SolarPanel,
};
use crate::service::{
    AppliancesRequest, LoadSnapshot, SelectBatteryRequest, SelectControllerRequest, SelectInverterRequest,
    SelectSolarArrayRequest, SuitableBatteries, SuitableInverters, SystemVoltageRequest,
};
use crate::site::SiteRequest;

#[derive(OpenApi)]
#[openapi(
    components(schemas(
        Appliance,
        ApplianceType,
        AppliancesRequest,
        Battery,
        BatteryChemistry,
        BatterySelection,
        ConfigurationModel,
        Controller,
        ControllerSelection,
        ControllerSpec,
        ControllerType,
        InstallTemperature,
        InstallationType,
        Inverter,
        InverterSelection,
        LoadSnapshot,
        LoadTotals,
        MonthlyCalc,
        MonthlyData,
        ProductionAggregation,
        SelectBatteryRequest,
        SelectControllerRequest,
        SelectInverterRequest,
        SelectSolarArrayRequest,
        Site,
        SiteRequest,
        SolarArraySelection,
        SolarPanel,
        SuitableBatteries,
        SuitableInverters,
        SystemVoltageRequest,
    )),
    tags((name = "offgrid-planner", description = "Off-grid project configuration API v1"))
)]
pub struct ApiDoc;
