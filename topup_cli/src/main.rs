use clap::{Args, Parser, Subcommand};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use topup_core::scheduler::FuelingThresholds;
use topup_core::*;

#[derive(Parser)]
#[command(name = "topup")]
#[command(about = "Real-time ride fueling alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct RiderArgs {
    /// Body weight in kg
    #[arg(long)]
    weight: Option<f64>,

    /// Intensity preset (recovery, moderate, tempo, hard, race)
    #[arg(long)]
    preset: Option<String>,

    /// Calories eaten before the ride
    #[arg(long)]
    pre_intake: Option<f64>,

    /// Constant heart rate to feed the engine (bpm)
    #[arg(long)]
    heart_rate: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// List intensity presets and their fueling thresholds
    Presets,

    /// Forecast the fueling alerts of a ride without waiting for the clock
    Plan {
        #[command(flatten)]
        rider: RiderArgs,

        /// Ride length in minutes
        #[arg(long, default_value_t = 120)]
        minutes: u64,

        /// Print alerts and summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ride with live fueling alerts
    ///
    /// Commands on stdin: 'm' mark as consumed, 'p' pause, 'r' resume, 'e' end.
    /// Any other line is treated as a spoken phrase (say "topped up").
    Ride {
        #[command(flatten)]
        rider: RiderArgs,

        /// End automatically after this many simulated minutes
        #[arg(long)]
        minutes: Option<u64>,

        /// Wall-clock milliseconds per simulated second
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Tone only, no spoken alerts
        #[arg(long)]
        no_voice_alerts: bool,

        /// Ignore spoken confirmations
        #[arg(long)]
        no_voice_commands: bool,

        /// Suppress the live display and print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    topup_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Presets => cmd_presets(),
        Commands::Plan {
            rider,
            minutes,
            json,
        } => {
            let session_config = rider_config(&config, &rider)?;
            cmd_plan(session_config, rider.heart_rate, minutes, json)
        }
        Commands::Ride {
            rider,
            minutes,
            tick_ms,
            no_voice_alerts,
            no_voice_commands,
            json,
        } => {
            let mut session_config = rider_config(&config, &rider)?;
            session_config.voice_alerts_enabled &= !no_voice_alerts;
            session_config.voice_commands_enabled &= !no_voice_commands;

            let mut config = config;
            if let Some(tick_ms) = tick_ms {
                config.clock.tick_interval_ms = tick_ms;
            }

            cmd_ride(
                session_config,
                config.engine_timing(),
                rider.heart_rate,
                minutes,
                json,
            )
            .await
        }
    }
}

/// Merge command-line overrides into the configured rider and validate
fn rider_config(config: &Config, rider: &RiderArgs) -> Result<SessionConfig> {
    let mut session_config = config.session_config();

    if let Some(weight) = rider.weight {
        session_config.weight_kg = weight;
    }
    if let Some(ref preset) = rider.preset {
        session_config.preset = preset.parse()?;
    }
    if let Some(pre_intake) = rider.pre_intake {
        session_config.pre_session_kcal = pre_intake;
    }

    session_config.validate()?;
    Ok(session_config)
}

fn cmd_presets() -> Result<()> {
    println!(
        "{:<10} {:>5} {:>8} {:>12} {:>10}",
        "PRESET", "MET", "HR %", "FIRST (kcal)", "EVERY (kcal)"
    );
    for preset in IntensityPreset::ALL {
        let thresholds = FuelingThresholds::for_met(preset.met());
        println!(
            "{:<10} {:>5.1} {:>8} {:>12.0} {:>10.0}",
            preset.to_string(),
            preset.met(),
            preset.target_hr_percent(),
            thresholds.initial,
            thresholds.interval
        );
    }
    Ok(())
}

fn cmd_plan(
    config: SessionConfig,
    heart_rate: Option<u16>,
    minutes: u64,
    json: bool,
) -> Result<()> {
    let mut state = SessionState::new(config);
    if let Some(bpm) = heart_rate {
        state.heart_rate.push(bpm);
    }
    state.phase = SessionPhase::Running;

    if !json {
        println!(
            "Fueling plan: {} ride, {} kg, {} minutes",
            state.config.preset.display_name(),
            state.config.weight_kg,
            minutes
        );
    }

    // Assume every alert is eaten as soon as it fires
    let mut alerts = Vec::new();
    for _ in 0..minutes * 60 {
        if let Some(alert) = state.apply_tick() {
            if !json {
                println!(
                    "  {:>8}  {} ({} kcal burned since last fuel)",
                    format_elapsed(alert.elapsed_seconds),
                    alert.message,
                    alert.calories
                );
            }
            state.resolve_pending();
            alerts.push(alert);
        }
    }
    state.phase = SessionPhase::Ended;

    let summary = SessionSummary::from_state(&state);
    if json {
        let output = serde_json::json!({
            "alerts": alerts,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if alerts.is_empty() {
            println!("  No fueling needed.");
        }
        println!();
        println!("{}", summary);
    }

    Ok(())
}

async fn cmd_ride(
    config: SessionConfig,
    timing: EngineTiming,
    heart_rate: Option<u16>,
    minutes: Option<u64>,
    json: bool,
) -> Result<()> {
    let (utterance_tx, utterance_rx) = mpsc::unbounded_channel();
    let speech = Arc::new(TerminalSpeech::new(utterance_rx));
    let announcer = if json {
        Announcer::silent()
    } else {
        Announcer::new(Arc::new(ConsoleAudio), Arc::new(ConsoleAudio))
    };
    let voice_commands = config.voice_commands_enabled;

    let mut session = Session::new(announcer, speech.clone(), timing);
    if let Some(bpm) = heart_rate {
        session.heart_rate_feed().push(bpm);
    }

    let mut updates = session.subscribe();
    let caps = session.start_session(config)?;
    tracing::info!(
        "Ride started (voice input: {}, speech output: {})",
        caps.voice_input,
        caps.speech_output
    );
    if !json {
        println!("Ride started. 'm' = mark as consumed, 'p' = pause, 'r' = resume, 'e' = end.");
        if caps.voice_input {
            println!("Say \"topped up\" (type it) to confirm a fueling alert.");
        }
    }

    let target_seconds = minutes.map(|m| m * 60);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut alerts_shown = 0;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if !json {
                    render(&state, &mut alerts_shown);
                }
                if target_seconds.is_some_and(|target| state.elapsed_seconds >= target) {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    tracing::debug!("Standard input closed");
                    stdin_open = false;
                    // Nothing can resume a paused ride any more
                    if target_seconds.is_none() || session.phase() != SessionPhase::Running {
                        break;
                    }
                    continue;
                };

                let command = line.trim().to_lowercase();
                match command.as_str() {
                    "" => {}
                    "m" | "eat" => match session.confirm_fueling() {
                        Some(alert) => {
                            feedback(json, format!("✓ Fueling logged (+{} kcal)", alert.carbs * 4))
                        }
                        None => feedback(json, "No fueling alert pending"),
                    },
                    "p" | "pause" => {
                        let paused = session.pause_session();
                        speech.discard_pending();
                        report(json, paused, "Paused");
                    }
                    "r" | "resume" => {
                        speech.discard_pending();
                        report(json, session.resume_session(), "Resumed");
                    }
                    "e" | "end" => break,
                    _ if !voice_commands => {
                        feedback(json, "Voice commands are off; type 'm' to mark as consumed");
                    }
                    _ if session.phase() != SessionPhase::Running => {}
                    _ => {
                        // The receiver lives as long as the session
                        let _ = utterance_tx.send(line);
                    }
                }
            }
        }
    }

    let summary = session.end_session()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("{}", summary);
    }

    Ok(())
}

/// Command feedback; kept off stdout when it carries JSON
fn feedback(json: bool, message: impl std::fmt::Display) {
    if json {
        eprintln!("{}", message);
    } else {
        println!("{}", message);
    }
}

fn report(json: bool, result: Result<()>, done: &str) {
    match result {
        Ok(()) => feedback(json, done),
        Err(e) => feedback(json, e),
    }
}

/// Print new alerts and a status line once per simulated minute
fn render(state: &SessionState, alerts_shown: &mut u32) {
    if state.alerts_fired > *alerts_shown {
        *alerts_shown = state.alerts_fired;
        if let Some(alert) = state.pending_alert() {
            println!("⚡ FUEL NOW! {}", alert.message);
            println!(
                "   ({} calories burned since last fuel)",
                alert.calories
            );
        }
    }

    if state.elapsed_seconds == 0 || state.elapsed_seconds % 60 != 0 {
        return;
    }

    let heart_rate = match state.heart_rate.latest() {
        0 => "--".to_string(),
        bpm => format!("{} bpm", bpm),
    };
    let next = match state.next_fueling_in {
        Some(countdown) => format!("{:.0} kcal", countdown.kcal()),
        None => "--".to_string(),
    };
    println!(
        "[{}] burned {:.0} | consumed {:.0} | deficit {:.0} | HR {} | next fueling in {}",
        format_elapsed(state.elapsed_seconds),
        state.calories_burned,
        state.calories_consumed,
        state.calorie_deficit(),
        heart_rate,
        next
    );
}

/// Tone and speech rendered as terminal text
struct ConsoleAudio;

impl ToneSink for ConsoleAudio {
    fn play_alert_tone(&self) {
        print!("\x07");
    }
}

impl SpeechSink for ConsoleAudio {
    fn speak(&self, text: &str) {
        println!("🔊 {}", text);
    }
}

/// Lines typed on the terminal, played back as recognised utterances
struct TerminalSpeech {
    utterances: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl TerminalSpeech {
    fn new(utterances: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            utterances: Arc::new(Mutex::new(utterances)),
        }
    }
}

impl TerminalSpeech {
    /// Drop lines typed while no listener was consuming them
    fn discard_pending(&self) {
        // Held only by a live listener, which pause has already cancelled
        let Ok(mut utterances) = self.utterances.try_lock() else {
            return;
        };
        let mut dropped = 0;
        while utterances.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("Discarded {} queued utterances", dropped);
        }
    }
}

impl SpeechInput for TerminalSpeech {
    fn listen(&self) -> Result<BoxStream<'static, Recognition>> {
        let utterances = self.utterances.clone();
        let results = stream::unfold(utterances, |utterances| async move {
            let text = utterances.lock().await.recv().await?;
            Some((Recognition::Transcript(text), utterances))
        });
        Ok(results.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_discard_pending_drops_queued_utterances() {
        let (tx, rx) = mpsc::unbounded_channel();
        let speech = TerminalSpeech::new(rx);

        tx.send("topped up".to_string()).unwrap();
        tx.send("top it up".to_string()).unwrap();
        speech.discard_pending();

        let mut results = speech.listen().unwrap();
        let stale = tokio::time::timeout(Duration::from_millis(50), results.next()).await;
        assert!(stale.is_err(), "queued lines must not reach a new listener");

        tx.send("topped up".to_string()).unwrap();
        assert_eq!(
            results.next().await,
            Some(Recognition::Transcript("topped up".to_string()))
        );
    }

    #[tokio::test]
    async fn test_listener_ends_when_input_closes() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let speech = TerminalSpeech::new(rx);
        drop(tx);

        let mut results = speech.listen().unwrap();
        assert_eq!(results.next().await, None);
    }
}
