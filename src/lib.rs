//! Pocket Farm library crate: a persistent farming-economy tick simulation.
//!
//! The binary crate (`main.rs`) is a thin command surface over this crate.
//! Every domain is a Bevy plugin; `FarmPlugins` wires them together so a
//! host app (or a headless test) only adds one plugin group.

pub mod shared;
pub mod data;
pub mod calendar;
pub mod farming;
pub mod economy;
pub mod offline;
pub mod save;
pub mod clock;

use bevy::app::PluginGroupBuilder;
use bevy::prelude::*;

use shared::*;

/// Session state, shared resources and the cross-domain events.
pub struct FarmCorePlugin;

impl Plugin for FarmCorePlugin {
    fn build(&self, app: &mut App) {
        app
            // Session state
            .init_state::<SessionState>()
            // Shared resources
            .init_resource::<FarmClock>()
            .init_resource::<SimRng>()
            .init_resource::<economy::FarmLedger>()
            .init_resource::<economy::HostBridge>()
            // Events
            .add_event::<FarmActionEvent>()
            .add_event::<ActionRejectedEvent>()
            .add_event::<PlotMaturedEvent>()
            .add_event::<SeasonChangeEvent>()
            .add_event::<WaterEvaporatedEvent>()
            .add_event::<CropHarvestedEvent>()
            .add_event::<MilestoneReachedEvent>()
            .add_event::<SaveRequestEvent>()
            .add_event::<OpenViewEvent>()
            .add_event::<CloseViewEvent>()
            .add_event::<ResetFarmEvent>();
    }
}

/// Everything needed to run a farm. Requires `StatesPlugin` (included in
/// `DefaultPlugins`, added by hand next to `MinimalPlugins`).
pub struct FarmPlugins;

impl PluginGroup for FarmPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(FarmCorePlugin)
            .add(calendar::CalendarPlugin)
            .add(farming::FarmingPlugin)
            .add(economy::EconomyPlugin)
            .add(offline::OfflinePlugin)
            .add(save::SavePlugin)
            .add(clock::ClockPlugin)
    }
}
