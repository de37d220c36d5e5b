//! Economy domain: the farm ledger, upgrades, crop bank export, prestige.
//!
//! `FarmLedger` is the single owner of `FarmState`. The view only ever
//! reads `FarmLedger::state()`; changes arrive as `FarmActionEvent`s and
//! are applied by `actions::handle_farm_actions`.

use bevy::prelude::*;
use crate::shared::*;

pub mod actions;
pub mod crop_bank;
pub mod ledger;
pub mod prestige;
pub mod upgrades;

pub use crate::shared::Rejection;
pub use actions::{apply_action, ActionOutcome};
pub use crop_bank::{
    ExportDelivery, ExportEntry, ExportManifest, ExportReceipt, HostBridge, HostInventory, NoHost,
};
pub use ledger::{format_gold, roll_harvest_reward, FarmLedger, HarvestReceipt, SmartOutcome};
pub use prestige::{PrestigeGate, PrestigeOutcome};
pub use upgrades::leveled_upgrade_cost;

/// The crop bank was emptied.
#[derive(Event, Debug, Clone)]
pub struct CropsExportedEvent {
    pub receipt: ExportReceipt,
}

/// First prestige click; a second one before `expires_at_ms` confirms.
#[derive(Event, Debug, Clone)]
pub struct PrestigeArmedEvent {
    pub expires_at_ms: u64,
}

#[derive(Event, Debug, Clone)]
pub struct PrestigeCompletedEvent {
    pub level: u32,
    pub starting_gold: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin
// ─────────────────────────────────────────────────────────────────────────────

pub struct EconomyPlugin;

impl Plugin for EconomyPlugin {
    fn build(&self, app: &mut App) {
        // ── Resources ──────────────────────────────────────────────────────
        app.init_resource::<FarmLedger>()
            .init_resource::<HostBridge>();

        // ── Events ─────────────────────────────────────────────────────────
        app.add_event::<FarmActionEvent>()
            .add_event::<ActionRejectedEvent>()
            .add_event::<CropHarvestedEvent>()
            .add_event::<MilestoneReachedEvent>()
            .add_event::<CropsExportedEvent>()
            .add_event::<PrestigeArmedEvent>()
            .add_event::<PrestigeCompletedEvent>();

        // ── Systems: Live only ─────────────────────────────────────────────
        app.add_systems(
            Update,
            (
                actions::handle_farm_actions,
                log_milestones,
                log_export_manifests,
            )
                .chain()
                .run_if(in_state(SessionState::Live)),
        );

        info!("[Economy] EconomyPlugin registered.");
    }
}

fn log_milestones(mut milestones: EventReader<MilestoneReachedEvent>, ledger: Res<FarmLedger>) {
    for ev in milestones.read() {
        info!(
            "[Economy] Milestone! {} harvests. Lifetime gold: {}",
            ev.harvests,
            format_gold(ledger.state().lifetime_gold_earned)
        );
    }
}

fn log_export_manifests(mut exports: EventReader<CropsExportedEvent>) {
    for ev in exports.read() {
        match ev.receipt.manifest.to_json() {
            Ok(json) => info!("[Economy] Export manifest: {}", json),
            Err(e) => warn!("[Economy] Could not encode export manifest: {}", e),
        }
    }
}
