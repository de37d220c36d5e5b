//! Clock domain: the fixed 20 Hz tick driver.
//!
//! Exactly one driver advances the farm at a time, selected by
//! `SessionState`:
//! - `Loading`: the save domain loads and reconciles, then hands off to Live
//! - `Live`: `live_tick` runs every FixedUpdate while the view is open
//! - `Offscreen`: `offscreen_tick` keeps the farm growing with the view closed
//!
//! Both tick systems share `FarmLedger::tick` and differ only in their
//! counter, the maturity notice flag, and the save reason.

use bevy::prelude::*;

use crate::economy::FarmLedger;
use crate::farming::TickReport;
use crate::shared::*;

pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(TICKS_PER_SECOND as f64))
            .init_resource::<SessionTicks>()
            .add_event::<OpenViewEvent>()
            .add_event::<CloseViewEvent>()
            .add_systems(
                FixedUpdate,
                (
                    live_tick.run_if(in_state(SessionState::Live)),
                    offscreen_tick.run_if(in_state(SessionState::Offscreen)),
                ),
            )
            .add_systems(Update, (handle_view_requests, reset_ticks_on_farm_reset));
    }
}

/// Tick counters for the current process. The evaporation and autosave
/// cadences are measured against these, not against persisted state.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTicks {
    pub live: u64,
    pub offscreen: u64,
}

/// Turns a tick report into events. Returns nothing; the ledger already
/// holds the new state.
fn publish_tick(
    report: TickReport,
    offscreen: bool,
    matured: &mut EventWriter<PlotMaturedEvent>,
    seasons: &mut EventWriter<SeasonChangeEvent>,
    evaporated: &mut EventWriter<WaterEvaporatedEvent>,
) {
    for (plot, crop) in report.matured {
        matured.send(PlotMaturedEvent { plot, crop, offscreen });
    }
    if let Some(change) = report.season_change {
        seasons.send(SeasonChangeEvent { from: change.from, to: change.to });
    }
    if !report.evaporated.is_empty() {
        evaporated.send(WaterEvaporatedEvent { plots: report.evaporated });
    }
}

pub fn live_tick(
    mut ticks: ResMut<SessionTicks>,
    mut ledger: ResMut<FarmLedger>,
    mut matured: EventWriter<PlotMaturedEvent>,
    mut seasons: EventWriter<SeasonChangeEvent>,
    mut evaporated: EventWriter<WaterEvaporatedEvent>,
    mut saves: EventWriter<SaveRequestEvent>,
) {
    ticks.live += 1;
    let report = ledger.tick(ticks.live);
    publish_tick(report, false, &mut matured, &mut seasons, &mut evaporated);

    if ticks.live % AUTOSAVE_INTERVAL_TICKS == 0 {
        saves.send(SaveRequestEvent { reason: SaveReason::Autosave });
    }
}

pub fn offscreen_tick(
    mut ticks: ResMut<SessionTicks>,
    mut ledger: ResMut<FarmLedger>,
    mut matured: EventWriter<PlotMaturedEvent>,
    mut seasons: EventWriter<SeasonChangeEvent>,
    mut evaporated: EventWriter<WaterEvaporatedEvent>,
    mut saves: EventWriter<SaveRequestEvent>,
) {
    ticks.offscreen += 1;
    let report = ledger.tick(ticks.offscreen);
    publish_tick(report, true, &mut matured, &mut seasons, &mut evaporated);

    if ticks.offscreen % AUTOSAVE_INTERVAL_TICKS == 0 {
        saves.send(SaveRequestEvent { reason: SaveReason::Suspend });
    }
}

/// Open/close requests from the command surface. Closing stamps the
/// suspend time and saves; reopening drops the stamp because the
/// offscreen ticker already covered the gap.
pub fn handle_view_requests(
    mut opens: EventReader<OpenViewEvent>,
    mut closes: EventReader<CloseViewEvent>,
    state: Res<State<SessionState>>,
    clock: Res<FarmClock>,
    mut ledger: ResMut<FarmLedger>,
    mut next_state: ResMut<NextState<SessionState>>,
    mut saves: EventWriter<SaveRequestEvent>,
) {
    let opened = opens.read().count() > 0;
    let closed = closes.read().count() > 0;

    match state.get() {
        SessionState::Live if closed => {
            ledger.mark_suspended(clock.now_ms());
            ledger.cancel_pending_prestige();
            saves.send(SaveRequestEvent { reason: SaveReason::Suspend });
            next_state.set(SessionState::Offscreen);
            info!("[Clock] View closed; farm keeps growing offscreen.");
        }
        SessionState::Offscreen if opened => {
            ledger.clear_suspended();
            next_state.set(SessionState::Live);
            info!("[Clock] View opened.");
        }
        _ => {}
    }
}

fn reset_ticks_on_farm_reset(mut resets: EventReader<ResetFarmEvent>, mut ticks: ResMut<SessionTicks>) {
    if resets.read().count() > 0 {
        *ticks = SessionTicks::default();
    }
}
