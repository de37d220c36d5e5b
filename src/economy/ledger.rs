//! The farm ledger: sole owner of `FarmState` and every atomic action on it.
//!
//! Each action validates all of its preconditions before touching state,
//! so a `Rejection` always means nothing changed. Every economy action
//! cancels a pending prestige confirmation first.

use bevy::prelude::*;
use rand::Rng;

use super::crop_bank::{export_bank, ExportReceipt, HostInventory};
use super::prestige::{apply_prestige_reset, prestige_starting_gold, PrestigeGate, PrestigeOutcome, PrestigeStep};
use crate::farming::{simulate_tick, TickReport};
use crate::offline::{reconcile_offline, CatchUpSummary};
use crate::shared::*;

#[derive(Resource, Debug, Clone, Default)]
pub struct FarmLedger {
    pub(super) state: FarmState,
    pub(super) prestige: PrestigeGate,
    /// Session memory for smart-action replanting. Not persisted.
    pub(super) last_planted: [Option<CropKind>; NUM_PLOTS],
}

/// One successful harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestReceipt {
    pub plot: usize,
    pub crop: CropKind,
    pub reward: u32,
    pub lucky: bool,
    /// Harvest count after this harvest, when it lands on a milestone.
    pub milestone: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartOutcome {
    Harvested { harvest: HarvestReceipt, replanted: Option<CropKind> },
    Watered,
    Planted(CropKind),
}

impl FarmLedger {
    pub fn new(state: FarmState) -> Self {
        Self { state, ..Default::default() }
    }

    /// Read-only view for the UI and observers.
    pub fn state(&self) -> &FarmState {
        &self.state
    }

    pub fn snapshot(&self) -> FarmState {
        self.state.clone()
    }

    pub fn prestige_gate(&self) -> PrestigeGate {
        self.prestige
    }

    pub fn last_planted(&self, plot: usize) -> Option<CropKind> {
        self.last_planted.get(plot).copied().flatten()
    }

    pub fn cancel_pending_prestige(&mut self) -> bool {
        self.prestige.cancel()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Driver hooks
    // ─────────────────────────────────────────────────────────────────────

    /// One live or offscreen tick.
    pub fn tick(&mut self, tick_index: u64) -> TickReport {
        simulate_tick(&mut self.state, tick_index)
    }

    /// Runs offline catch-up against `now_ms`. See [`reconcile_offline`].
    pub fn reconcile(&mut self, now_ms: u64) -> Option<CatchUpSummary> {
        reconcile_offline(&mut self.state, now_ms)
    }

    pub fn mark_suspended(&mut self, now_ms: u64) {
        self.state.last_suspended_at_ms = Some(now_ms);
    }

    /// Drops the suspend stamp without reconciling. Used when the offscreen
    /// ticker already simulated the gap.
    pub fn clear_suspended(&mut self) {
        self.state.last_suspended_at_ms = None;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Plot actions
    // ─────────────────────────────────────────────────────────────────────

    pub fn plant(&mut self, plot: usize, crop: CropKind) -> Result<(), Rejection> {
        self.prestige.cancel();
        self.plant_inner(plot, crop)
    }

    fn plant_inner(&mut self, plot: usize, crop: CropKind) -> Result<(), Rejection> {
        let cost = crop.def().base_cost;
        let target = self.plot_ref(plot)?;
        if !target.is_empty() {
            return Err(Rejection::PlotOccupied { index: plot });
        }
        self.check_gold(cost)?;

        self.state.gold -= cost;
        let water = if self.state.upgrades.auto_water {
            WaterState::Watered
        } else {
            WaterState::Dry
        };
        self.state.plots[plot] = Plot { crop: Some(crop), growth: 0.0, water };
        self.last_planted[plot] = Some(crop);
        Ok(())
    }

    pub fn water(&mut self, plot: usize) -> Result<(), Rejection> {
        self.prestige.cancel();
        self.check_waterable(plot)?;
        self.state.plots[plot].water = WaterState::Watered;
        Ok(())
    }

    pub fn harvest(&mut self, plot: usize, rng: &mut impl Rng) -> Result<HarvestReceipt, Rejection> {
        self.prestige.cancel();
        self.harvest_inner(plot, rng)
    }

    fn harvest_inner(&mut self, plot: usize, rng: &mut impl Rng) -> Result<HarvestReceipt, Rejection> {
        let target = self.plot_ref(plot)?;
        let Some(crop) = target.crop else {
            return Err(Rejection::PlotEmpty { index: plot });
        };
        if !target.is_mature() {
            return Err(Rejection::NotMature { index: plot });
        }

        let (reward, lucky) =
            roll_harvest_reward(crop, &self.state.upgrades, self.state.prestige_level, rng);

        let farm = &mut self.state;
        farm.gold = farm.gold.saturating_add(reward);
        farm.lifetime_gold_earned = farm.lifetime_gold_earned.saturating_add(reward as u64);
        farm.harvest_count = farm.harvest_count.saturating_add(1);
        farm.crop_bank.add(crop, 1);
        farm.plots[plot].clear();

        let milestone = (farm.harvest_count % MILESTONE_INTERVAL == 0).then_some(farm.harvest_count);
        Ok(HarvestReceipt { plot, crop, reward, lucky, milestone })
    }

    /// Returns true if the boost brought the crop to maturity.
    pub fn apply_fertilizer(&mut self, plot: usize, kind: Fertilizer) -> Result<bool, Rejection> {
        self.prestige.cancel();
        self.check_growing(plot)?;
        self.check_gold(kind.cost())?;

        self.state.gold -= kind.cost();
        let target = &mut self.state.plots[plot];
        target.growth = (target.growth + kind.boost()).min(1.0);
        Ok(target.growth >= 1.0)
    }

    pub fn apply_lucky_water(&mut self, plot: usize) -> Result<(), Rejection> {
        self.prestige.cancel();
        self.check_waterable(plot)?;
        self.check_gold(LUCKY_WATER_COST)?;

        self.state.gold -= LUCKY_WATER_COST;
        self.state.plots[plot].water = WaterState::LuckyWatered;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Bulk and convenience actions
    // ─────────────────────────────────────────────────────────────────────

    /// Waters every growing, dry plot. Returns the plots watered.
    pub fn water_all(&mut self) -> Result<Vec<usize>, Rejection> {
        self.prestige.cancel();
        let targets: Vec<usize> = (0..NUM_PLOTS)
            .filter(|&i| self.state.plots[i].is_growing() && !self.state.plots[i].is_watered())
            .collect();
        if targets.is_empty() {
            return Err(Rejection::NothingToDo);
        }
        for &i in &targets {
            self.state.plots[i].water = WaterState::Watered;
        }
        Ok(targets)
    }

    /// Harvests every mature plot in grid order.
    pub fn harvest_all(&mut self, rng: &mut impl Rng) -> Result<Vec<HarvestReceipt>, Rejection> {
        self.prestige.cancel();
        let targets: Vec<usize> = (0..NUM_PLOTS)
            .filter(|&i| self.state.plots[i].is_mature())
            .collect();
        if targets.is_empty() {
            return Err(Rejection::NothingToDo);
        }
        targets
            .into_iter()
            .map(|i| self.harvest_inner(i, &mut *rng))
            .collect()
    }

    /// Double-click: harvest and replant a mature plot, water a dry growing
    /// one, or plant an empty one with the crop last planted there.
    pub fn smart_action(&mut self, plot: usize, rng: &mut impl Rng) -> Result<SmartOutcome, Rejection> {
        self.prestige.cancel();
        let target = *self.plot_ref(plot)?;

        if target.is_mature() {
            let harvest = self.harvest_inner(plot, rng)?;
            let crop = self.last_planted[plot].unwrap_or(harvest.crop);
            let replanted = self.plant_inner(plot, crop).ok().map(|_| crop);
            return Ok(SmartOutcome::Harvested { harvest, replanted });
        }

        if target.is_growing() {
            self.check_waterable(plot)?;
            self.state.plots[plot].water = WaterState::Watered;
            return Ok(SmartOutcome::Watered);
        }

        let crop = self.last_planted[plot].unwrap_or(CropKind::Wheat);
        self.plant_inner(plot, crop)?;
        Ok(SmartOutcome::Planted(crop))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Export and prestige
    // ─────────────────────────────────────────────────────────────────────

    pub fn export_crop_bank(&mut self, host: &mut dyn HostInventory) -> Result<ExportReceipt, Rejection> {
        self.prestige.cancel();
        export_bank(&mut self.state, host)
    }

    /// First call arms a confirmation; a second call within the window
    /// performs the reset.
    pub fn prestige(&mut self, now_ms: u64) -> Result<PrestigeOutcome, Rejection> {
        if !self.state.prestige_available() {
            return Err(Rejection::PrestigeLocked {
                harvests: self.state.harvest_count,
                required: PRESTIGE_HARVEST_THRESHOLD,
            });
        }

        match self.prestige.request(now_ms) {
            PrestigeStep::Armed { expires_at_ms } => Ok(PrestigeOutcome::Armed { expires_at_ms }),
            PrestigeStep::Confirmed => {
                let level = apply_prestige_reset(&mut self.state);
                self.last_planted = [None; NUM_PLOTS];
                Ok(PrestigeOutcome::Completed { level, starting_gold: prestige_starting_gold(level) })
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Settings (not economy actions)
    // ─────────────────────────────────────────────────────────────────────

    pub fn select_plot(&mut self, plot: usize) -> Result<(), Rejection> {
        self.plot_ref(plot)?;
        self.state.selected_plot = plot;
        Ok(())
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f32) -> Result<(), Rejection> {
        if !multiplier.is_finite() || !(MIN_SPEED_MULTIPLIER..=MAX_SPEED_MULTIPLIER).contains(&multiplier) {
            return Err(Rejection::InvalidSpeedMultiplier { requested: multiplier });
        }
        self.state.speed_multiplier = multiplier;
        Ok(())
    }

    pub fn rename_farm(&mut self, name: &str) -> Result<(), Rejection> {
        let name = name.trim();
        let len = name.chars().count();
        if len == 0 || len > MAX_FARM_NAME_LEN || name.chars().any(char::is_control) {
            return Err(Rejection::InvalidFarmName);
        }
        self.state.farm_name = name.to_string();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Precondition helpers
    // ─────────────────────────────────────────────────────────────────────

    fn plot_ref(&self, plot: usize) -> Result<&Plot, Rejection> {
        self.state.plot(plot).ok_or(Rejection::NoSuchPlot { index: plot })
    }

    pub(super) fn check_gold(&self, cost: u32) -> Result<(), Rejection> {
        if self.state.can_afford(cost) {
            Ok(())
        } else {
            Err(Rejection::InsufficientGold { needed: cost, available: self.state.gold })
        }
    }

    /// Planted and below maturity.
    fn check_growing(&self, plot: usize) -> Result<(), Rejection> {
        let target = self.plot_ref(plot)?;
        if target.is_empty() {
            return Err(Rejection::PlotEmpty { index: plot });
        }
        if target.is_mature() {
            return Err(Rejection::AlreadyMature { index: plot });
        }
        Ok(())
    }

    fn check_waterable(&self, plot: usize) -> Result<(), Rejection> {
        self.check_growing(plot)?;
        if self.state.plots[plot].is_watered() {
            return Err(Rejection::AlreadyWatered { index: plot });
        }
        Ok(())
    }
}

/// Draws a reward and applies, in order: gold magnet (+50%), quality
/// (+20% per level), prestige (+15% per level), then the lucky double.
/// Fractions are truncated after each step.
pub fn roll_harvest_reward(
    crop: CropKind,
    upgrades: &UpgradeLevels,
    prestige_level: u32,
    rng: &mut impl Rng,
) -> (u32, bool) {
    let def = crop.def();
    let mut reward = rng.gen_range(def.reward_min..=def.reward_max) as u64;

    if upgrades.gold_magnet {
        reward += reward / 2;
    }
    reward = reward * (100 + 20 * upgrades.quality as u64) / 100;
    reward = reward * (100 + 15 * prestige_level as u64) / 100;

    let lucky = upgrades.lucky > 0 && rng.gen_range(0..100u32) < upgrades.lucky as u32 * 10;
    if lucky {
        reward *= 2;
    }

    (u32::try_from(reward).unwrap_or(u32::MAX), lucky)
}

/// Format a gold amount as a display string (e.g. "1,234g").
pub fn format_gold(amount: u64) -> String {
    let digits = amount.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.push('g');
    result
}
