//! Session clock: the one-second periodic driver.
//!
//! Each tick advances elapsed time, folds the heart-rate-adjusted burn rate
//! into the running total and runs the fueling scheduler, all inside a single
//! critical section. Alerts are announced after the lock is released.

use crate::audio::Announcer;
use crate::state::SharedState;
use crate::SessionPhase;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Tick until `cancel` fires; the first tick lands one interval after start
pub(crate) async fn run_clock(
    shared: Arc<SharedState>,
    announcer: Announcer,
    cancel: CancellationToken,
    tick: Duration,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        // A pause may have committed while this tick was waiting for the lock
        let fired = shared.mutate(|state| {
            if cancel.is_cancelled() || state.phase != SessionPhase::Running {
                return None;
            }
            let alert = state.apply_tick();
            tracing::trace!(
                "Tick {}s: {:.2} kcal burned",
                state.elapsed_seconds,
                state.calories_burned
            );
            alert.map(|alert| (alert, state.config.voice_alerts_enabled))
        });

        if let Some((alert, voice_alerts)) = fired {
            announcer.announce_alert(&alert, voice_alerts);
        }
    }

    tracing::debug!("Session clock stopped");
}
