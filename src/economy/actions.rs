//! Applies `FarmActionEvent` requests to the ledger and publishes results.

use bevy::prelude::*;
use rand::Rng;

use super::crop_bank::{ExportDelivery, ExportReceipt, HostBridge, HostInventory};
use super::ledger::{format_gold, FarmLedger, HarvestReceipt, SmartOutcome};
use super::prestige::PrestigeOutcome;
use super::{CropsExportedEvent, PrestigeArmedEvent, PrestigeCompletedEvent};
use crate::shared::*;

/// What an applied action did.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Planted { plot: usize, crop: CropKind },
    Watered { plots: Vec<usize> },
    Harvested(Vec<HarvestReceipt>),
    Fertilized { plot: usize, kind: Fertilizer, matured: bool },
    LuckyWatered { plot: usize },
    OneShotBought { kind: OneShotUpgrade, cost: u32 },
    LevelBought { kind: LeveledUpgrade, level: u8 },
    Exported(ExportReceipt),
    Prestige(PrestigeOutcome),
    Smart { plot: usize, outcome: SmartOutcome },
    PlotSelected { plot: usize },
    SpeedChanged(f32),
    Renamed,
}

/// Routes one request to the matching ledger operation.
pub fn apply_action(
    ledger: &mut FarmLedger,
    action: &FarmAction,
    rng: &mut impl Rng,
    now_ms: u64,
    host: &mut dyn HostInventory,
) -> Result<ActionOutcome, Rejection> {
    if action.is_economy_action() && ledger.cancel_pending_prestige() {
        info!("[Economy] Pending prestige cancelled by {:?}", action);
    }
    let outcome = match *action {
        FarmAction::Plant { plot, crop } => {
            ledger.plant(plot, crop)?;
            ActionOutcome::Planted { plot, crop }
        }
        FarmAction::Water { plot } => {
            ledger.water(plot)?;
            ActionOutcome::Watered { plots: vec![plot] }
        }
        FarmAction::Harvest { plot } => ActionOutcome::Harvested(vec![ledger.harvest(plot, rng)?]),
        FarmAction::Fertilize { plot, kind } => {
            let matured = ledger.apply_fertilizer(plot, kind)?;
            ActionOutcome::Fertilized { plot, kind, matured }
        }
        FarmAction::LuckyWater { plot } => {
            ledger.apply_lucky_water(plot)?;
            ActionOutcome::LuckyWatered { plot }
        }
        FarmAction::BuyOneShot(kind) => {
            let cost = ledger.buy_one_shot_upgrade(kind)?;
            ActionOutcome::OneShotBought { kind, cost }
        }
        FarmAction::BuyLevel(kind) => {
            let level = ledger.buy_leveled_upgrade(kind)?;
            ActionOutcome::LevelBought { kind, level }
        }
        FarmAction::ExportCropBank => ActionOutcome::Exported(ledger.export_crop_bank(host)?),
        FarmAction::Prestige => ActionOutcome::Prestige(ledger.prestige(now_ms)?),
        FarmAction::WaterAll => ActionOutcome::Watered { plots: ledger.water_all()? },
        FarmAction::HarvestAll => ActionOutcome::Harvested(ledger.harvest_all(rng)?),
        FarmAction::SmartAction { plot } => {
            let outcome = ledger.smart_action(plot, rng)?;
            ActionOutcome::Smart { plot, outcome }
        }
        FarmAction::SelectPlot { plot } => {
            ledger.select_plot(plot)?;
            ActionOutcome::PlotSelected { plot }
        }
        FarmAction::SetSpeedMultiplier(multiplier) => {
            ledger.set_speed_multiplier(multiplier)?;
            ActionOutcome::SpeedChanged(multiplier)
        }
        FarmAction::RenameFarm(ref name) => {
            ledger.rename_farm(name)?;
            ActionOutcome::Renamed
        }
    };
    Ok(outcome)
}

/// Drains action requests while the view is live. Rejections go back out
/// as `ActionRejectedEvent`; successes fan out into domain events.
#[allow(clippy::too_many_arguments)]
pub fn handle_farm_actions(
    mut requests: EventReader<FarmActionEvent>,
    mut ledger: ResMut<FarmLedger>,
    mut rng: ResMut<SimRng>,
    clock: Res<FarmClock>,
    mut host: ResMut<HostBridge>,
    mut rejected: EventWriter<ActionRejectedEvent>,
    mut harvested: EventWriter<CropHarvestedEvent>,
    mut milestones: EventWriter<MilestoneReachedEvent>,
    mut matured: EventWriter<PlotMaturedEvent>,
    mut exported: EventWriter<CropsExportedEvent>,
    mut armed: EventWriter<PrestigeArmedEvent>,
    mut prestiged: EventWriter<PrestigeCompletedEvent>,
) {
    let now_ms = clock.now_ms();
    for ev in requests.read() {
        let result = apply_action(&mut ledger, &ev.action, &mut rng.0, now_ms, host.0.as_mut());
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(reason) => {
                info!("[Economy] {:?} rejected: {}", ev.action, reason);
                rejected.send(ActionRejectedEvent { action: ev.action.clone(), reason });
                continue;
            }
        };

        let gold = ledger.state().gold as u64;
        match outcome {
            ActionOutcome::Planted { plot, crop } => {
                info!("[Economy] Planted {} in plot {}. Gold: {}", crop.name(), plot + 1, format_gold(gold));
            }
            ActionOutcome::Watered { plots } => {
                info!("[Economy] Watered {} plot(s)", plots.len());
            }
            ActionOutcome::Harvested(receipts) => {
                for receipt in receipts {
                    publish_harvest(&receipt, &mut harvested, &mut milestones);
                }
                info!("[Economy] Gold: {}", format_gold(gold));
            }
            ActionOutcome::Fertilized { plot, kind, matured: now_mature } => {
                info!("[Economy] {:?} fertilizer on plot {}", kind, plot + 1);
                if now_mature {
                    if let Some(crop) = ledger.state().plots[plot].crop {
                        matured.send(PlotMaturedEvent { plot, crop, offscreen: false });
                    }
                }
            }
            ActionOutcome::LuckyWatered { plot } => {
                info!("[Economy] Lucky water on plot {} (3x growth)", plot + 1);
            }
            ActionOutcome::OneShotBought { kind, cost } => {
                info!("[Economy] Bought {} for {}", kind.name(), format_gold(cost as u64));
            }
            ActionOutcome::LevelBought { kind, level } => {
                info!("[Economy] {} upgraded to level {}", kind.name(), level);
            }
            ActionOutcome::Exported(receipt) => {
                match receipt.delivery {
                    ExportDelivery::Materialized => {
                        info!("[Economy] Exported {} crop(s) to the host", receipt.manifest.total_units());
                    }
                    ExportDelivery::FallbackGold(bonus) => {
                        info!(
                            "[Economy] Host refused {} crop(s); paid {} instead",
                            receipt.manifest.total_units(),
                            format_gold(bonus as u64)
                        );
                    }
                }
                exported.send(CropsExportedEvent { receipt });
            }
            ActionOutcome::Prestige(PrestigeOutcome::Armed { expires_at_ms }) => {
                info!("[Economy] Prestige requested; confirm within 5s");
                armed.send(PrestigeArmedEvent { expires_at_ms });
            }
            ActionOutcome::Prestige(PrestigeOutcome::Completed { level, starting_gold }) => {
                info!("[Economy] PRESTIGE! Now level {} (+{}% rewards)", level, level * 15);
                prestiged.send(PrestigeCompletedEvent { level, starting_gold });
            }
            ActionOutcome::Smart { plot, outcome } => match outcome {
                SmartOutcome::Harvested { harvest, replanted } => {
                    publish_harvest(&harvest, &mut harvested, &mut milestones);
                    if let Some(crop) = replanted {
                        info!("[Economy] Replanted {} in plot {}", crop.name(), plot + 1);
                    }
                }
                SmartOutcome::Watered => info!("[Economy] Watered plot {}", plot + 1),
                SmartOutcome::Planted(crop) => {
                    info!("[Economy] Planted {} in plot {}", crop.name(), plot + 1);
                }
            },
            ActionOutcome::PlotSelected { .. } => {}
            ActionOutcome::SpeedChanged(multiplier) => {
                info!("[Economy] Growth speed set to {:.1}x", multiplier);
            }
            ActionOutcome::Renamed => {
                info!("[Economy] Farm renamed to '{}'", ledger.state().farm_name);
            }
        }
    }
}

fn publish_harvest(
    receipt: &HarvestReceipt,
    harvested: &mut EventWriter<CropHarvestedEvent>,
    milestones: &mut EventWriter<MilestoneReachedEvent>,
) {
    if receipt.lucky {
        info!("[Economy] LUCKY! Harvested {} for {} (doubled)", receipt.crop.name(), format_gold(receipt.reward as u64));
    } else {
        info!("[Economy] Harvested {} for {}", receipt.crop.name(), format_gold(receipt.reward as u64));
    }
    harvested.send(CropHarvestedEvent {
        plot: receipt.plot,
        crop: receipt.crop,
        reward: receipt.reward,
        lucky: receipt.lucky,
    });
    if let Some(harvests) = receipt.milestone {
        milestones.send(MilestoneReachedEvent { harvests });
    }
}
