//! `archie checkin toggle` and `archie daemon`.

use archie_config::{AppState, StateStore};
use chrono::{DateTime, Duration, Local};
use tracing::{info, warn};

use super::runtime::{CliResult, Runtime, load_config};

const CHECK_IN_MESSAGE: &str = "Hey there! Just checking in – how are you doing?";
const TICK: std::time::Duration = std::time::Duration::from_secs(30 * 60);
const MIN_GAP_HOURS: i64 = 2;

pub fn toggle() -> CliResult {
    let config = load_config()?;
    let enabled = StateStore::new(config.state_path()).toggle_check_in()?;
    println!(
        "Check-ins {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Whether a check-in should be sent at `now`.
fn check_in_due(state: &AppState, now: DateTime<Local>) -> bool {
    state.check_in_enabled
        && state
            .last_checked
            .is_none_or(|last| now - last >= Duration::hours(MIN_GAP_HOURS))
}

pub async fn daemon() -> CliResult {
    let runtime = Runtime::load()?;
    let state = StateStore::new(runtime.config.state_path());
    let mode = runtime.mode(false);

    println!("archie daemon: checking in every 30 minutes while enabled. Ctrl+C to stop.");
    let mut interval = tokio::time::interval(TICK);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Daemon stopping");
                return Ok(());
            }
        }

        let now = Local::now();
        if !check_in_due(&state.load(), now) {
            continue;
        }

        info!("Sending check-in");
        if let Err(e) = runtime.turn(CHECK_IN_MESSAGE, mode).await {
            warn!(error = %e, "Check-in failed");
            continue;
        }
        if let Err(e) = state.update(|s| s.last_checked = Some(now)) {
            warn!(error = %e, "Could not record check-in time");
        }
    }
}
