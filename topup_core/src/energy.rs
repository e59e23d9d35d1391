//! Energy expenditure model.
//!
//! Two pure estimates:
//! - A workload-only rate from the preset's MET value and body weight
//! - A heart-rate modulation of that rate using heart-rate reserve

use crate::HeartRateProfile;

/// Calories per minute for a MET value and body weight
///
/// `met * weight_kg * 3.5 / 200`
pub fn base_calories_per_minute(met: f64, weight_kg: f64) -> f64 {
    met * weight_kg * 3.5 / 200.0
}

/// Scale a base rate by where the current heart rate sits in the reserve
///
/// A sample of 0 (no reading) or below resting returns `base_rate` unchanged.
/// Otherwise the multiplier runs from 0.7 at resting to 1.3 at maximum, and
/// keeps growing past maximum.
pub fn hr_adjusted_calories_per_minute(
    base_rate: f64,
    current_bpm: u16,
    profile: &HeartRateProfile,
) -> f64 {
    if current_bpm == 0 || current_bpm < profile.resting_bpm {
        return base_rate;
    }

    let reserve = f64::from(profile.max_bpm) - f64::from(profile.resting_bpm);
    let fraction = (f64::from(current_bpm) - f64::from(profile.resting_bpm)) / reserve;
    base_rate * (0.7 + fraction * 0.6)
}
