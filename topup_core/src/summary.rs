//! End-of-session summary.

use crate::{IntensityPreset, SessionState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Share of burned calories to replace after the session
const RECOVERY_MIN_RATIO: f64 = 0.3;
const RECOVERY_MAX_RATIO: f64 = 0.5;

/// Calories to eat within 30 minutes of finishing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecoveryWindow {
    pub min_kcal: f64,
    pub max_kcal: f64,
}

impl RecoveryWindow {
    pub fn for_burned(calories_burned: f64) -> Self {
        Self {
            min_kcal: calories_burned * RECOVERY_MIN_RATIO,
            max_kcal: calories_burned * RECOVERY_MAX_RATIO,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub preset: IntensityPreset,
    pub elapsed_seconds: u64,
    pub duration: String,
    pub avg_heart_rate: Option<u16>,
    pub calories_burned: f64,
    pub pre_session_kcal: f64,
    pub during_session_kcal: f64,
    pub total_intake_kcal: f64,
    pub net_deficit_kcal: f64,
    pub alerts_fired: u32,
    pub fueling_events: u32,
    pub recovery: RecoveryWindow,
}

impl SessionSummary {
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            preset: state.config.preset,
            elapsed_seconds: state.elapsed_seconds,
            duration: format_elapsed(state.elapsed_seconds),
            avg_heart_rate: (state.avg_heart_rate > 0).then_some(state.avg_heart_rate),
            calories_burned: state.calories_burned,
            pre_session_kcal: state.config.pre_session_kcal,
            during_session_kcal: state.during_session_intake(),
            total_intake_kcal: state.calories_consumed,
            net_deficit_kcal: state.calorie_deficit(),
            alerts_fired: state.alerts_fired,
            fueling_events: state.fueling_events,
            recovery: RecoveryWindow::for_burned(state.calories_burned),
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session Summary ({})", self.preset.display_name())?;
        writeln!(f, "  Duration:           {}", self.duration)?;
        match self.avg_heart_rate {
            Some(bpm) => writeln!(f, "  Avg Heart Rate:     {} bpm", bpm)?,
            None => writeln!(f, "  Avg Heart Rate:     --")?,
        }
        writeln!(f, "  Calories Burned:    {:.0}", self.calories_burned)?;
        if self.pre_session_kcal > 0.0 {
            writeln!(f, "  Pre-Session Intake: {:.0}", self.pre_session_kcal)?;
        }
        writeln!(f, "  During-Session:     {:.0}", self.during_session_kcal)?;
        writeln!(f, "  Total Intake:       {:.0}", self.total_intake_kcal)?;
        writeln!(f, "  Net Deficit:        {:.0}", self.net_deficit_kcal)?;
        writeln!(f, "  Alerts Fired:       {}", self.alerts_fired)?;
        writeln!(f, "  Fueling Events:     {}", self.fueling_events)?;
        write!(
            f,
            "  Recovery: replenish with {:.0}-{:.0} calories within 30 minutes. Include protein for muscle recovery.",
            self.recovery.min_kcal, self.recovery.max_kcal
        )
    }
}

/// `H:MM:SS` from one hour up, `M:SS` below
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
