//! Adaptive fueling scheduler.
//!
//! Decides, once per simulated second, whether the rider should eat and how
//! much carbohydrate to take:
//! 1. Nothing fires until cumulative burn reaches the preset's first-alert threshold
//! 2. After that, an alert fires whenever burn since the last fueling event
//!    reaches the preset's interval
//! 3. The dose replaces ~55% of those calories at 4 kcal/g, clamped to 30-80 g
//!
//! Both thresholds are linear in MET and anchored at the moderate preset (8 MET),
//! floored at zero. Recovery (4 MET) has no first-alert threshold at all and
//! runs on its 100 kcal interval from the first tick.

use crate::FuelingCountdown;
use serde::{Deserialize, Serialize};

/// Share of burned calories a dose should replace
const REPLACEMENT_RATIO: f64 = 0.55;

/// Energy density of carbohydrate
pub const KCAL_PER_GRAM_CARB: f64 = 4.0;

pub const MIN_CARBS_G: u32 = 30;
pub const MAX_CARBS_G: u32 = 80;

/// Calorie thresholds derived from a preset's MET value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelingThresholds {
    /// Cumulative burn before the first alert may fire
    pub initial: f64,
    /// Burn since the last fueling event before the next alert fires
    pub interval: f64,
}

impl FuelingThresholds {
    pub fn for_met(met: f64) -> Self {
        Self {
            initial: (150.0 + (met - 8.0) * 50.0).max(0.0),
            interval: (200.0 + (met - 8.0) * 25.0).max(0.0),
        }
    }
}

/// A dose the scheduler decided to recommend
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelingDose {
    /// Unrounded calories burned since the last fueling event
    pub calories_since_last: f64,
    pub carbs: u32,
}

/// Outcome of one scheduler evaluation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub countdown: FuelingCountdown,
    pub dose: Option<FuelingDose>,
}

/// Carbohydrate grams that replace the recommended share of `calories_since_last`
pub fn carbs_for(calories_since_last: f64) -> u32 {
    let raw = (calories_since_last * REPLACEMENT_RATIO / KCAL_PER_GRAM_CARB).round();
    raw.clamp(f64::from(MIN_CARBS_G), f64::from(MAX_CARBS_G)) as u32
}

/// Scheduler state: the burn total at the last fueling event
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FuelingScheduler {
    last_fueling_kcal: f64,
}

impl FuelingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative burn at the moment the last alert fired (0 before any)
    pub fn last_fueling_kcal(&self) -> f64 {
        self.last_fueling_kcal
    }

    /// Evaluate the schedule against the current cumulative burn
    pub fn evaluate(&mut self, met: f64, calories_burned: f64) -> Evaluation {
        let thresholds = FuelingThresholds::for_met(met);

        if calories_burned < thresholds.initial {
            return Evaluation {
                countdown: FuelingCountdown::UntilFirst(thresholds.initial - calories_burned),
                dose: None,
            };
        }

        let since_last = calories_burned - self.last_fueling_kcal;
        if since_last < thresholds.interval {
            return Evaluation {
                countdown: FuelingCountdown::UntilNext(thresholds.interval - since_last),
                dose: None,
            };
        }

        let carbs = carbs_for(since_last);
        self.last_fueling_kcal = calories_burned;

        tracing::debug!(
            "Fueling threshold reached: {:.1} kcal since last fuel, recommending {} g",
            since_last,
            carbs
        );

        Evaluation {
            countdown: FuelingCountdown::UntilNext(thresholds.interval),
            dose: Some(FuelingDose {
                calories_since_last: since_last,
                carbs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntensityPreset;

    const MODERATE: f64 = 8.0;

    #[test]
    fn test_thresholds_per_preset() {
        let expected = [
            (IntensityPreset::Recovery, 0.0, 100.0),
            (IntensityPreset::Moderate, 150.0, 200.0),
            (IntensityPreset::Tempo, 250.0, 250.0),
            (IntensityPreset::Hard, 350.0, 300.0),
            (IntensityPreset::Race, 450.0, 350.0),
        ];

        for (preset, initial, interval) in expected {
            let t = FuelingThresholds::for_met(preset.met());
            assert_eq!(t.initial, initial, "{:?}", preset);
            assert_eq!(t.interval, interval, "{:?}", preset);
            assert!(t.initial >= 0.0 && t.interval > 0.0);
        }
    }

    #[test]
    fn test_thresholds_never_negative() {
        for met in [0.0, 1.0, 2.5, 4.0] {
            let t = FuelingThresholds::for_met(met);
            assert!(t.initial >= 0.0, "initial {} at {} MET", t.initial, met);
            assert!(t.interval >= 0.0, "interval {} at {} MET", t.interval, met);
        }
    }

    #[test]
    fn test_recovery_counts_down_to_interval_from_start() {
        let recovery = IntensityPreset::Recovery.met();
        let mut scheduler = FuelingScheduler::new();

        let eval = scheduler.evaluate(recovery, 0.0);
        assert!(eval.dose.is_none());
        assert_eq!(eval.countdown, FuelingCountdown::UntilNext(100.0));

        let eval = scheduler.evaluate(recovery, 40.0);
        assert_eq!(eval.countdown, FuelingCountdown::UntilNext(60.0));

        assert!(scheduler.evaluate(recovery, 100.0).dose.is_some());
    }

    #[test]
    fn test_no_alert_before_initial_threshold() {
        let mut scheduler = FuelingScheduler::new();
        let eval = scheduler.evaluate(MODERATE, 149.9);

        assert!(eval.dose.is_none());
        match eval.countdown {
            FuelingCountdown::UntilFirst(kcal) => assert!((kcal - 0.1).abs() < 1e-9),
            other => panic!("expected first-alert countdown, got {:?}", other),
        }
    }

    #[test]
    fn test_interval_check_applies_from_initial_threshold() {
        let mut scheduler = FuelingScheduler::new();
        let eval = scheduler.evaluate(MODERATE, 150.0);

        assert!(eval.dose.is_none());
        assert_eq!(eval.countdown, FuelingCountdown::UntilNext(50.0));
        assert_eq!(scheduler.last_fueling_kcal(), 0.0);
    }

    #[test]
    fn test_fire_updates_reference_and_resets_countdown() {
        let mut scheduler = FuelingScheduler::new();
        let eval = scheduler.evaluate(MODERATE, 200.25);

        let dose = eval.dose.expect("alert should fire");
        assert_eq!(dose.calories_since_last, 200.25);
        // 27.5 g raw, lifted to the minimum dose
        assert_eq!(dose.carbs, MIN_CARBS_G);
        assert_eq!(scheduler.last_fueling_kcal(), 200.25);
        assert_eq!(eval.countdown, FuelingCountdown::UntilNext(200.0));
    }

    #[test]
    fn test_next_alert_waits_a_full_interval() {
        let mut scheduler = FuelingScheduler::new();
        assert!(scheduler.evaluate(MODERATE, 200.0).dose.is_some());

        let eval = scheduler.evaluate(MODERATE, 399.9);
        assert!(eval.dose.is_none());
        assert!(matches!(eval.countdown, FuelingCountdown::UntilNext(k) if (k - 0.1).abs() < 1e-9));

        assert!(scheduler.evaluate(MODERATE, 400.0).dose.is_some());
        assert_eq!(scheduler.last_fueling_kcal(), 400.0);
    }

    #[test]
    fn test_high_intensity_first_alert_waits_for_initial_threshold() {
        // Race: interval (350) is below the first-alert threshold (450)
        let mut scheduler = FuelingScheduler::new();
        assert!(scheduler.evaluate(14.0, 400.0).dose.is_none());
        assert!(scheduler.evaluate(14.0, 450.0).dose.is_some());
    }

    #[test]
    fn test_carbs_are_clamped() {
        // 100 kcal -> 13.75 g raw
        assert_eq!(carbs_for(100.0), 30);
        // 400 kcal -> 55 g raw
        assert_eq!(carbs_for(400.0), 55);
        // 1000 kcal -> 137.5 g raw
        assert_eq!(carbs_for(1000.0), 80);
    }

    #[test]
    fn test_carbs_computed_from_unrounded_calories() {
        // 250.8 kcal -> 34.485 g; rounding the calories first (251) would give 35
        assert_eq!(carbs_for(250.8), 34);
        assert_eq!(carbs_for(251.0), 35);
    }
}
