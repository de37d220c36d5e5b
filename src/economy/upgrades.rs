//! Permanent upgrades: one-shot flags and leveled counters.

use super::ledger::FarmLedger;
use crate::shared::*;

/// Price of the next level when `level` levels are already owned.
pub fn leveled_upgrade_cost(kind: LeveledUpgrade, level: u8) -> u32 {
    kind.base_cost().saturating_mul(level as u32 + 1)
}

impl FarmLedger {
    /// Returns the gold spent.
    pub fn buy_one_shot_upgrade(&mut self, kind: OneShotUpgrade) -> Result<u32, Rejection> {
        self.prestige.cancel();
        if self.state.upgrades.owns(kind) {
            return Err(Rejection::UpgradeOwned(kind));
        }
        let cost = kind.cost();
        self.check_gold(cost)?;

        self.state.gold -= cost;
        match kind {
            OneShotUpgrade::AutoWater => self.state.upgrades.auto_water = true,
            OneShotUpgrade::GoldMagnet => self.state.upgrades.gold_magnet = true,
        }
        Ok(cost)
    }

    /// Returns the new level.
    pub fn buy_leveled_upgrade(&mut self, kind: LeveledUpgrade) -> Result<u8, Rejection> {
        self.prestige.cancel();
        let level = self.state.upgrades.level(kind);
        if level >= MAX_UPGRADE_LEVEL {
            return Err(Rejection::UpgradeMaxed(kind));
        }
        let cost = leveled_upgrade_cost(kind, level);
        self.check_gold(cost)?;

        self.state.gold -= cost;
        let slot = self.state.upgrades.level_mut(kind);
        *slot += 1;
        Ok(*slot)
    }

    /// Cost of the next level, or `None` once maxed.
    pub fn next_level_cost(&self, kind: LeveledUpgrade) -> Option<u32> {
        let level = self.state.upgrades.level(kind);
        (level < MAX_UPGRADE_LEVEL).then(|| leveled_upgrade_cost(kind, level))
    }
}
