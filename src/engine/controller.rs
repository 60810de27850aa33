//! Charge controller electrical matching for PWM and MPPT controllers.


use crate::domain::{Controller, ControllerSelection, ControllerSpec, InstallationType, SolarPanel, STC_TEMPERATURE_C};

/// Margin applied to panel current for PWM controllers.
pub const PWM_CURRENT_SAFETY_FACTOR: f64 = 1.25;

/// Lowest battery bus an MPPT string must be able to charge.
pub const MPPT_MIN_BUS_VOLTAGE_V: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayLayout {
    pub series: u32,
    pub parallel: u32,
}

/// Find the smallest series count dividing `number_of_panels` whose string
/// count fits `max_parallel`. Smaller series counts are tried first, so the
/// result favours more parallel strings.
pub fn refine_layout(number_of_panels: u32, max_serial: u32, max_parallel: u32) -> Option<ArrayLayout> {
    if number_of_panels == 0 {
        return None;
    }
    (1..=max_serial)
        .filter(|series| number_of_panels % series == 0)
        .map(|series| ArrayLayout {
            series,
            parallel: number_of_panels / series,
        })
        .find(|layout| layout.parallel <= max_parallel)
}

/// Array and site facts the controller is matched against.
#[derive(Debug, Clone, Copy)]
pub struct ArrayContext<'a> {
    pub panel: &'a SolarPanel,
    pub number_of_panels: u32,
    pub system_voltage: u32,
    pub min_ambient_c: f64,
    pub max_ambient_c: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PwmSizing {
    pub max_series: u32,
    pub max_parallel: u32,
    pub layout: Option<ArrayLayout>,
    pub required_short_circuit_current_a: f64,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MpptSizing {
    pub adjusted_voc_v: f64,
    pub adjusted_vmp_v: f64,
    pub max_series: u32,
    pub min_series: u32,
    pub max_parallel: u32,
    pub total_array_power_w: f64,
    pub required_current_a: f64,
    pub power_valid: bool,
    pub layout: Option<ArrayLayout>,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerSizing {
    Pwm(PwmSizing),
    Mppt(MpptSizing),
}

impl ControllerSizing {
    pub fn is_valid(&self) -> bool {
        match self {
            ControllerSizing::Pwm(s) => s.is_valid,
            ControllerSizing::Mppt(s) => s.is_valid,
        }
    }

    /// Record the sizing against the catalog controller it was computed for.
    pub fn into_selection(self, controller: &Controller, installation_type: InstallationType) -> ControllerSelection {
        let mut selection = ControllerSelection {
            controller_id: Some(controller.id),
            controller_type: Some(controller.spec.controller_type()),
            installation_temperature_adder_c: installation_type.temperature_adder_c(),
            ..Default::default()
        };
        match self {
            ControllerSizing::Pwm(s) => {
                let layout = s.layout.unwrap_or(ArrayLayout { series: 0, parallel: 0 });
                selection.series_modules = layout.series;
                selection.parallel_modules = layout.parallel;
                selection.required_current_a = s.required_short_circuit_current_a;
                selection.is_valid = s.is_valid;
                selection.issues = s.issues;
            }
            ControllerSizing::Mppt(s) => {
                let layout = s.layout.unwrap_or(ArrayLayout { series: 0, parallel: 0 });
                selection.series_modules = layout.series;
                selection.parallel_modules = layout.parallel;
                selection.required_current_a = s.required_current_a;
                selection.adjusted_open_circuit_voltage_v = Some(s.adjusted_voc_v);
                selection.adjusted_vmp_v = Some(s.adjusted_vmp_v);
                selection.min_series_modules = Some(s.min_series);
                selection.is_valid = s.is_valid;
                selection.issues = s.issues;
            }
        }
        selection
    }
}

fn capacity_layout(ctx: &ArrayContext<'_>, max_series: u32, max_parallel: u32, issues: &mut Vec<String>) -> Option<ArrayLayout> {
    let capacity = u64::from(max_series) * u64::from(max_parallel);
    if capacity < u64::from(ctx.number_of_panels) {
        issues.push(format!(
            "controller accepts at most {max_series} in series x {max_parallel} in parallel, array has {} panels",
            ctx.number_of_panels
        ));
        return None;
    }
    let layout = refine_layout(ctx.number_of_panels, max_series, max_parallel);
    if layout.is_none() {
        issues.push(format!(
            "no series/parallel split of {} panels fits {max_series} x {max_parallel}",
            ctx.number_of_panels
        ));
    }
    layout
}

pub fn size_pwm(current_rating_a: f64, ctx: &ArrayContext<'_>) -> PwmSizing {
    let panel = ctx.panel;
    let mut issues = Vec::new();

    let max_series = if panel.vmp_v > 0.0 {
        (f64::from(ctx.system_voltage) / panel.vmp_v).floor() as u32
    } else {
        0
    };
    let max_parallel = if panel.imp_a > 0.0 {
        (current_rating_a / (panel.imp_a * PWM_CURRENT_SAFETY_FACTOR)).floor() as u32
    } else {
        0
    };

    if max_series == 0 {
        issues.push(format!(
            "panel Vmp {} V is above the {} V bus, no series string fits",
            panel.vmp_v, ctx.system_voltage
        ));
        return PwmSizing {
            max_series,
            max_parallel,
            layout: None,
            required_short_circuit_current_a: 0.0,
            is_valid: false,
            issues,
        };
    }

    let layout = capacity_layout(ctx, max_series, max_parallel, &mut issues);
    let required_short_circuit_current_a = layout
        .map(|l| panel.isc_a * f64::from(l.parallel) * PWM_CURRENT_SAFETY_FACTOR)
        .unwrap_or(0.0);

    let current_ok = current_rating_a >= required_short_circuit_current_a;
    if layout.is_some() && !current_ok {
        issues.push(format!(
            "controller rating {current_rating_a} A is below required {required_short_circuit_current_a:.2} A"
        ));
    }

    PwmSizing {
        max_series,
        max_parallel,
        is_valid: layout.is_some() && current_ok,
        layout,
        required_short_circuit_current_a,
        issues,
    }
}

pub fn size_mppt(max_voltage_v: f64, current_rating_a: f64, rated_power_w: f64, ctx: &ArrayContext<'_>) -> MpptSizing {
    let panel = ctx.panel;
    let mut issues = Vec::new();

    let adjusted_voc_v = panel.voc_v + panel.temp_coefficient_voc * (ctx.min_ambient_c - STC_TEMPERATURE_C);
    let adjusted_vmp_v = panel.vmp_v + panel.temp_coefficient_pmax * (ctx.max_ambient_c - STC_TEMPERATURE_C);
    let total_array_power_w = panel.rated_power_w * f64::from(ctx.number_of_panels);
    let required_current_a = if ctx.system_voltage > 0 {
        total_array_power_w / f64::from(ctx.system_voltage)
    } else {
        0.0
    };

    let power_valid = rated_power_w >= total_array_power_w;
    if !power_valid {
        issues.push(format!(
            "controller rating {rated_power_w} W is below array power {total_array_power_w} W"
        ));
    }

    if adjusted_voc_v <= 0.0 || adjusted_vmp_v <= 0.0 {
        issues.push(format!(
            "temperature-adjusted voltages are not positive (Voc {adjusted_voc_v:.2} V, Vmp {adjusted_vmp_v:.2} V)"
        ));
        return MpptSizing {
            adjusted_voc_v,
            adjusted_vmp_v,
            max_series: 0,
            min_series: 0,
            max_parallel: 0,
            total_array_power_w,
            required_current_a,
            power_valid,
            layout: None,
            is_valid: false,
            issues,
        };
    }

    let max_series = (max_voltage_v / adjusted_voc_v).floor() as u32;
    let min_series = (MPPT_MIN_BUS_VOLTAGE_V / adjusted_vmp_v).ceil() as u32;
    let max_parallel = if required_current_a > 0.0 {
        (current_rating_a / required_current_a).floor() as u32
    } else {
        0
    };

    let layout = capacity_layout(ctx, max_series, max_parallel, &mut issues);

    MpptSizing {
        adjusted_voc_v,
        adjusted_vmp_v,
        max_series,
        min_series,
        max_parallel,
        total_array_power_w,
        required_current_a,
        power_valid,
        is_valid: power_valid && layout.is_some(),
        layout,
        issues,
    }
}

/// Dispatch on the controller's regulation technology.
pub fn size_controller(spec: &ControllerSpec, ctx: &ArrayContext<'_>) -> ControllerSizing {
    match *spec {
        ControllerSpec::Pwm { current_rating_a } => ControllerSizing::Pwm(size_pwm(current_rating_a, ctx)),
        ControllerSpec::Mppt {
            max_voltage_v,
            current_rating_a,
            rated_power_w,
        } => ControllerSizing::Mppt(size_mppt(max_voltage_v, current_rating_a, rated_power_w, ctx)),
    }
}
