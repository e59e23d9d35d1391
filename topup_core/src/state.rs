//! Mutable session state and its shared, serialized cell.
//!
//! `SessionState` is the single record the clock, the voice loop and manual
//! confirmation all mutate. Every mutation goes through [`SharedState::mutate`],
//! which holds one lock for the whole change and then publishes a snapshot, so
//! readers never observe a tick or a resolution half applied.

use crate::audio::alert_message;
use crate::energy::{base_calories_per_minute, hr_adjusted_calories_per_minute};
use crate::heart_rate::HeartRateWindow;
use crate::scheduler::{FuelingScheduler, KCAL_PER_GRAM_CARB};
use crate::{FuelingAlert, FuelingCountdown, SessionConfig, SessionPhase};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;

/// Everything the presentation layer reads about the current session
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub config: SessionConfig,
    pub elapsed_seconds: u64,
    pub heart_rate: HeartRateWindow,
    /// Rounded mean of the recent window, 0 when unknown
    pub avg_heart_rate: u16,
    pub calories_burned: f64,
    /// Starts at the pre-session intake and grows by `carbs * 4` per fueling event
    pub calories_consumed: f64,
    pub scheduler: FuelingScheduler,
    pub next_fueling_in: Option<FuelingCountdown>,
    /// Unresolved alerts; only the last one is ever actionable
    pub alerts: Vec<FuelingAlert>,
    pub alerts_fired: u32,
    pub fueling_events: u32,
}

impl SessionState {
    /// Fresh state for a session about to start with `config`
    pub fn new(config: SessionConfig) -> Self {
        Self {
            calories_consumed: config.pre_session_kcal,
            config,
            ..Self::default()
        }
    }

    /// The alert a confirmation would resolve
    pub fn pending_alert(&self) -> Option<&FuelingAlert> {
        self.alerts.last()
    }

    pub fn calorie_deficit(&self) -> f64 {
        self.calories_burned - self.calories_consumed
    }

    pub fn during_session_intake(&self) -> f64 {
        self.calories_consumed - self.config.pre_session_kcal
    }

    pub fn heart_rate_seen(&self) -> bool {
        self.heart_rate.seen()
    }

    /// Advance one simulated second
    ///
    /// Returns the alert created by this tick, if the scheduler fired. The
    /// caller is responsible for only ticking a running session.
    pub fn apply_tick(&mut self) -> Option<FuelingAlert> {
        self.elapsed_seconds += 1;

        let met = self.config.preset.met();
        let base = base_calories_per_minute(met, self.config.weight_kg);
        let adjusted =
            hr_adjusted_calories_per_minute(base, self.heart_rate.latest(), &self.config.heart_rate);
        self.calories_burned += adjusted / 60.0;

        if let Some(avg) = self.heart_rate.average() {
            self.avg_heart_rate = avg.round() as u16;
        }

        let evaluation = self.scheduler.evaluate(met, self.calories_burned);
        self.next_fueling_in = Some(evaluation.countdown);

        let dose = evaluation.dose?;
        let alert = FuelingAlert {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            elapsed_seconds: self.elapsed_seconds,
            calories: dose.calories_since_last.round() as u32,
            carbs: dose.carbs,
            message: alert_message(dose.carbs),
        };
        self.alerts.push(alert.clone());
        self.alerts_fired += 1;

        tracing::info!(
            "Fueling alert at {}s: {} g carbs ({} kcal since last fuel)",
            self.elapsed_seconds,
            alert.carbs,
            alert.calories
        );
        Some(alert)
    }

    /// Resolve the pending alert, crediting its carbohydrate calories
    ///
    /// Idempotent on an empty alert list: returns `None` and changes nothing.
    pub fn resolve_pending(&mut self) -> Option<FuelingAlert> {
        let alert = self.alerts.pop()?;
        self.calories_consumed += f64::from(alert.carbs) * KCAL_PER_GRAM_CARB;
        self.fueling_events += 1;

        tracing::info!(
            "Fueling confirmed: {} g carbs, {:.0} kcal consumed",
            alert.carbs,
            self.calories_consumed
        );
        Some(alert)
    }
}

/// The single serialized owner of a `SessionState`
pub(crate) struct SharedState {
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionState>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        let (updates, _) = watch::channel(SessionState::default());
        Self {
            state: Mutex::new(SessionState::default()),
            updates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Every mutation leaves the state consistent, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` under the lock, then publish the resulting snapshot
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.updates.send_replace(state.clone());
        result
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }
}
