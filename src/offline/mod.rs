//! Offline catch-up: folds the wall-clock gap since the last suspend into
//! the farm in one analytic step instead of replaying every tick.
//!
//! Seasons are advanced exactly. Growth is approximated: the whole window
//! uses the season multiplier in effect at the end of it, and the water
//! bonus only covers the first evaporation window.

use std::fmt;

use bevy::prelude::*;
use serde::Serialize;

use crate::calendar::advance_season_by;
use crate::farming::enforce_plot_invariants;
use crate::shared::*;

pub struct OfflinePlugin;

impl Plugin for OfflinePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<OfflineCatchUpEvent>()
            .add_systems(Update, log_catch_up);
    }
}

/// Sent once after load when a real gap was reconciled.
#[derive(Event, Debug, Clone)]
pub struct OfflineCatchUpEvent {
    pub summary: CatchUpSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatchUpSummary {
    pub elapsed_ms: u64,
    pub ticks_elapsed: u64,
    /// Growing plots that received catch-up growth.
    pub crops_advanced: usize,
    /// Plots that reached maturity during the gap.
    pub crops_matured: Vec<(usize, CropKind)>,
    pub seasons_advanced: u64,
    pub water_evaporated: usize,
}

impl fmt::Display for CatchUpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}s away ({} ticks): {} crop(s) grew, {} ready, {} season change(s)",
            self.elapsed_ms / 1_000,
            self.ticks_elapsed,
            self.crops_advanced,
            self.crops_matured.len(),
            self.seasons_advanced
        )?;
        if self.water_evaporated > 0 {
            write!(f, ", water dried on {} plot(s)", self.water_evaporated)?;
        }
        Ok(())
    }
}

/// Applies the gap between the suspend stamp and `now_ms`, then clears the
/// stamp. Returns `None` with no stamp (already reconciled) or when the gap
/// is within `OFFLINE_NOISE_MS`; the stamp is consumed either way.
pub fn reconcile_offline(farm: &mut FarmState, now_ms: u64) -> Option<CatchUpSummary> {
    let suspended_at = farm.last_suspended_at_ms.take()?;
    let elapsed_ms = now_ms.saturating_sub(suspended_at);
    if elapsed_ms <= OFFLINE_NOISE_MS {
        return None;
    }

    let ticks = elapsed_ms / TICK_MS;
    let mut summary = CatchUpSummary {
        elapsed_ms,
        ticks_elapsed: ticks,
        ..Default::default()
    };

    summary.seasons_advanced = advance_season_by(farm, ticks);

    let season_multiplier = farm.season.growth_multiplier();
    let soil_bonus = farm.upgrades.soil_bonus();
    let watered_window = ticks.min(WATER_EVAPORATION_TICKS);

    for (i, plot) in farm.plots.iter_mut().enumerate() {
        let Some(crop) = plot.crop else { continue };
        if !plot.is_growing() {
            continue;
        }

        let watered_ticks = if plot.is_watered() { watered_window } else { 0 };
        let effective_ticks = (watered_ticks * 2 + (ticks - watered_ticks)) as f64;
        let gained = crop.def().growth_rate_per_tick as f64
            * season_multiplier as f64
            * soil_bonus as f64
            * TICK_GRANULARITY as f64
            * effective_ticks;

        plot.growth = (plot.growth as f64 + gained).min(1.0) as f32;
        if enforce_plot_invariants(plot) {
            warn!("[Offline] Plot {} growth out of range after catch-up; clamped", i);
        }
        summary.crops_advanced += 1;
        if plot.growth >= 1.0 {
            summary.crops_matured.push((i, crop));
        }
    }

    if ticks >= WATER_EVAPORATION_TICKS {
        for plot in farm.plots.iter_mut() {
            if plot.water.is_wet() {
                plot.water = WaterState::Dry;
                summary.water_evaporated += 1;
            }
        }
    }

    Some(summary)
}

fn log_catch_up(mut catch_ups: EventReader<OfflineCatchUpEvent>) {
    for ev in catch_ups.read() {
        info!("[Offline] Welcome back! {}", ev.summary);
        for (plot, crop) in &ev.summary.crops_matured {
            info!("[Offline] {} in plot {} is ready to harvest!", crop.name(), plot + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suspended_at(ms: u64) -> FarmState {
        FarmState {
            last_suspended_at_ms: Some(ms),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_stamp_is_noop() {
        let mut farm = FarmState::default();
        let before = farm.clone();
        assert_eq!(reconcile_offline(&mut farm, 1_000_000), None);
        assert_eq!(farm, before);
    }

    #[test]
    fn test_noise_gap_is_ignored_but_consumed() {
        let mut farm = suspended_at(10_000);
        farm.plots[0] = Plot { crop: Some(CropKind::Wheat), growth: 0.1, water: WaterState::Dry };
        assert_eq!(reconcile_offline(&mut farm, 10_500), None);
        assert_eq!(farm.last_suspended_at_ms, None);
        assert_eq!(farm.plots[0].growth, 0.1);
        assert_eq!(farm.season_elapsed_ticks, 0);
    }

    #[test]
    fn test_clock_going_backwards_is_ignored() {
        let mut farm = suspended_at(50_000);
        assert_eq!(reconcile_offline(&mut farm, 1_000), None);
        assert_eq!(farm.last_suspended_at_ms, None);
    }

    #[test]
    fn test_fifteen_seconds_mid_spring() {
        let mut farm = suspended_at(0);
        farm.season_elapsed_ticks = 750;

        let summary = reconcile_offline(&mut farm, 15_000).expect("real gap");

        assert_eq!(summary.ticks_elapsed, 300);
        assert_eq!(summary.seasons_advanced, 1);
        assert_eq!(farm.season, SeasonPhase::Summer);
        assert_eq!(farm.season_elapsed_ticks, 250);
    }

    #[test]
    fn test_growth_uses_final_season_and_water_window() {
        // 300 ticks, ending in Summer (x1.5). Watered for the first 200.
        let mut farm = suspended_at(0);
        farm.season_elapsed_ticks = 750;
        farm.plots[0] = Plot { crop: Some(CropKind::Pumpkin), growth: 0.0, water: WaterState::Watered };
        farm.plots[1] = Plot { crop: Some(CropKind::Pumpkin), growth: 0.0, water: WaterState::Dry };

        let summary = reconcile_offline(&mut farm, 15_000).expect("real gap");

        // 0.03 * 1.5 * 0.02 * (200*2 + 100) = 0.45
        assert!((farm.plots[0].growth - 0.45).abs() < 1e-4, "{}", farm.plots[0].growth);
        // 0.03 * 1.5 * 0.02 * 300 = 0.27
        assert!((farm.plots[1].growth - 0.27).abs() < 1e-4, "{}", farm.plots[1].growth);
        assert_eq!(summary.crops_advanced, 2);
        assert!(summary.crops_matured.is_empty());
        assert_eq!(summary.water_evaporated, 1);
        assert!(!farm.plots[0].is_watered());
    }

    #[test]
    fn test_short_gap_keeps_water() {
        let mut farm = suspended_at(0);
        farm.plots[2] = Plot { crop: Some(CropKind::Wheat), growth: 0.0, water: WaterState::Watered };
        let summary = reconcile_offline(&mut farm, 5_000).expect("real gap");
        assert_eq!(summary.ticks_elapsed, 100);
        assert_eq!(summary.water_evaporated, 0);
        assert!(farm.plots[2].is_watered());
        assert!((farm.plots[2].growth - 0.4).abs() < 1e-4);
    }

    #[test]
    fn test_long_absence_matures_and_clamps() {
        let mut farm = suspended_at(0);
        farm.upgrades.soil = 2;
        farm.plots[0] = Plot { crop: Some(CropKind::Wheat), growth: 0.2, water: WaterState::Dry };
        farm.plots[5] = Plot { crop: Some(CropKind::Melon), growth: 1.0, water: WaterState::Dry };

        // One hour: 72 000 ticks, 27 full cycles plus 1 800 ticks.
        let summary = reconcile_offline(&mut farm, 3_600_000).expect("real gap");

        assert_eq!(summary.ticks_elapsed, 72_000);
        assert_eq!(summary.seasons_advanced, 27 * 4 + 2);
        assert_eq!(farm.season, SeasonPhase::Autumn);
        assert_eq!(farm.season_elapsed_ticks, 200);
        assert_eq!(farm.plots[0].growth, 1.0);
        assert_eq!(summary.crops_matured, vec![(0, CropKind::Wheat)]);
        // Already-mature plots are left alone.
        assert_eq!(summary.crops_advanced, 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut farm = suspended_at(0);
        farm.plots[0] = Plot { crop: Some(CropKind::Carrot), growth: 0.0, water: WaterState::Watered };
        assert!(reconcile_offline(&mut farm, 20_000).is_some());
        let after_first = farm.clone();
        assert_eq!(reconcile_offline(&mut farm, 20_000), None);
        assert_eq!(farm, after_first);
    }

    #[test]
    fn test_summary_display() {
        let summary = CatchUpSummary {
            elapsed_ms: 15_000,
            ticks_elapsed: 300,
            crops_advanced: 2,
            crops_matured: vec![(1, CropKind::Wheat)],
            seasons_advanced: 1,
            water_evaporated: 1,
        };
        assert_eq!(
            summary.to_string(),
            "15s away (300 ticks): 2 crop(s) grew, 1 ready, 1 season change(s), water dried on 1 plot(s)"
        );
    }
}
