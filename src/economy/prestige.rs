//! Two-phase prestige confirmation and the reset it triggers.

use crate::shared::*;

/// Confirmation state for prestige. The only transition function is
/// [`PrestigeGate::request`]; every other economy action calls
/// [`PrestigeGate::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrestigeGate {
    #[default]
    Idle,
    PendingConfirm { expires_at_ms: u64 },
}

/// Result of one `request` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrestigeStep {
    /// First click: nothing changed yet.
    Armed { expires_at_ms: u64 },
    /// Second click within the window: perform the reset.
    Confirmed,
}

impl PrestigeGate {
    pub fn request(&mut self, now_ms: u64) -> PrestigeStep {
        match *self {
            PrestigeGate::PendingConfirm { expires_at_ms } if now_ms <= expires_at_ms => {
                *self = PrestigeGate::Idle;
                PrestigeStep::Confirmed
            }
            _ => {
                let expires_at_ms = now_ms.saturating_add(PRESTIGE_CONFIRM_WINDOW_MS);
                *self = PrestigeGate::PendingConfirm { expires_at_ms };
                PrestigeStep::Armed { expires_at_ms }
            }
        }
    }

    /// Drops a pending confirmation. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        *self = PrestigeGate::Idle;
        was_pending
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PrestigeGate::PendingConfirm { .. })
    }
}

/// What a prestige call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrestigeOutcome {
    Armed { expires_at_ms: u64 },
    Completed { level: u32, starting_gold: u32 },
}

/// Gold granted right after reaching `level`.
pub fn prestige_starting_gold(level: u32) -> u32 {
    STARTING_GOLD.saturating_add(25u32.saturating_mul(level))
}

/// Wipes run progress and bumps the prestige level. Lifetime counters,
/// the farm name and the UI cursor survive. Returns the new level.
pub(super) fn apply_prestige_reset(farm: &mut FarmState) -> u32 {
    let level = farm.prestige_level.saturating_add(1);

    for plot in farm.plots.iter_mut() {
        plot.clear();
    }
    farm.crop_bank.clear();
    farm.gold = prestige_starting_gold(level);
    farm.harvest_count = 0;
    farm.season = SeasonPhase::Spring;
    farm.season_elapsed_ticks = 0;
    farm.upgrades = UpgradeLevels::default();
    farm.speed_multiplier = 1.0;
    farm.prestige_level = level;

    level
}
