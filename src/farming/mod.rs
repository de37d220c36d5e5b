//! Farming domain: plot growth, maturity detection, water evaporation.
//!
//! The growth math lives in `growth` as pure functions over `FarmState`;
//! the clock domain calls `simulate_tick` and forwards the report here as
//! events.

use bevy::prelude::*;
use crate::shared::*;

mod growth;

pub use growth::{
    advance_plot_one_tick, enforce_plot_invariants, evaporate_all, growth_rate, simulate_tick,
    TickReport,
};

pub struct FarmingPlugin;

impl Plugin for FarmingPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlotMaturedEvent>()
            .add_event::<WaterEvaporatedEvent>()
            .add_systems(Update, (log_maturity, log_evaporation));
    }
}

fn log_maturity(mut matured: EventReader<PlotMaturedEvent>) {
    for ev in matured.read() {
        if ev.offscreen {
            info!("[Farm] {} in plot {} is ready to harvest! (offscreen)", ev.crop.name(), ev.plot + 1);
        } else {
            info!("[Farm] {} in plot {} is ready to harvest!", ev.crop.name(), ev.plot + 1);
        }
    }
}

fn log_evaporation(mut evaporated: EventReader<WaterEvaporatedEvent>) {
    for ev in evaporated.read() {
        if !ev.plots.is_empty() {
            info!("[Farm] Water evaporated from {} plot(s)", ev.plots.len());
        }
    }
}
