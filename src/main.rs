//! Pocket Farm command surface.
//!
//! ```text
//! pocket-farm [open [seconds]]   run a live session (default 30s), then save
//! pocket-farm status             print the reconciled farm as JSON
//! pocket-farm reset              delete the save file
//! ```

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use serde::Serialize;

use pocket_farm::economy::{format_gold, FarmLedger};
use pocket_farm::offline::{reconcile_offline, CatchUpSummary};
use pocket_farm::save::{delete_farm, load_or_fresh, SaveSettings};
use pocket_farm::shared::*;
use pocket_farm::FarmPlugins;

const DEFAULT_SESSION_SECS: u64 = 30;
const STATUS_LOG_SECS: f32 = 5.0;

enum Command {
    Open { seconds: u64 },
    Status,
    Reset,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, String> {
        match args.first().map(String::as_str) {
            None | Some("open") => {
                let seconds = match args.get(1) {
                    Some(raw) => raw
                        .parse()
                        .map_err(|_| format!("'{}' is not a number of seconds", raw))?,
                    None => DEFAULT_SESSION_SECS,
                };
                Ok(Command::Open { seconds })
            }
            Some("status") => Ok(Command::Status),
            Some("reset") => Ok(Command::Reset),
            Some(other) => Err(format!("unknown command '{}'", other)),
        }
    }
}

/// Ends the `open` session and logs a heartbeat while it runs.
#[derive(Resource)]
struct SessionLimit {
    remaining: Timer,
    heartbeat: Timer,
}

fn main() -> AppExit {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("pocket-farm: {}", msg);
            eprintln!("usage: pocket-farm [open [seconds] | status | reset]");
            return AppExit::error();
        }
    };

    match command {
        Command::Open { seconds } => run_session(seconds),
        Command::Status => print_status(),
        Command::Reset => reset_save(),
    }
}

fn run_session(seconds: u64) -> AppExit {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(StatesPlugin)
        .add_plugins(FarmPlugins)
        .insert_resource(SimRng::from_entropy())
        .insert_resource(SessionLimit {
            remaining: Timer::new(Duration::from_secs(seconds), TimerMode::Once),
            heartbeat: Timer::from_seconds(STATUS_LOG_SECS, TimerMode::Repeating),
        })
        .add_systems(Update, tick_session_limit)
        .run()
}

fn tick_session_limit(
    time: Res<Time>,
    mut limit: ResMut<SessionLimit>,
    ledger: Res<FarmLedger>,
    mut exit: EventWriter<AppExit>,
) {
    limit.heartbeat.tick(time.delta());
    if limit.heartbeat.just_finished() {
        let farm = ledger.state();
        let planted = farm.plots.iter().filter(|p| !p.is_empty()).count();
        let ready = farm.plots.iter().filter(|p| p.is_mature()).count();
        info!(
            "[Farm] {} | {} | {} tick {} | {} planted, {} ready",
            farm.farm_name,
            format_gold(farm.gold as u64),
            farm.season.name(),
            farm.season_elapsed_ticks,
            planted,
            ready
        );
    }

    limit.remaining.tick(time.delta());
    if limit.remaining.just_finished() {
        info!("[Farm] Session over; saving.");
        exit.send(AppExit::Success);
    }
}

#[derive(Serialize)]
struct StatusReport {
    farm: FarmState,
    offline: Option<CatchUpSummary>,
}

fn print_status() -> AppExit {
    let settings = SaveSettings::default();
    let mut farm = load_or_fresh(&settings.path);
    let offline = reconcile_offline(&mut farm, FarmClock::System.now_ms());

    match serde_json::to_string_pretty(&StatusReport { farm, offline }) {
        Ok(json) => {
            println!("{}", json);
            AppExit::Success
        }
        Err(e) => {
            eprintln!("pocket-farm: could not encode status: {}", e);
            AppExit::error()
        }
    }
}

fn reset_save() -> AppExit {
    let settings = SaveSettings::default();
    match delete_farm(&settings.path) {
        Ok(true) => {
            println!("Deleted {}", settings.path.display());
            AppExit::Success
        }
        Ok(false) => {
            println!("No save at {}", settings.path.display());
            AppExit::Success
        }
        Err(e) => {
            eprintln!("pocket-farm: {}", e);
            AppExit::error()
        }
    }
}
