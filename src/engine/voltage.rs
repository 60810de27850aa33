/// Recommend a nominal bus voltage for a total daily energy (Wh).
///
/// Advisory only: downstream stages use the project's `system_voltage`.
pub fn recommend_system_voltage(total_energy_wh: f64) -> u32 {
    if total_energy_wh < 1000.0 {
        12
    } else if total_energy_wh < 3000.0 {
        24
    } else {
        48
    }
}
