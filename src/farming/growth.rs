//! Per-plot growth math and the single-tick simulation step shared by the
//! live and offscreen drivers.

use bevy::prelude::*;

use crate::calendar::{advance_season_one_tick, SeasonChange};
use crate::shared::*;

/// Everything one tick changed, for the driver to turn into events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub matured: Vec<(usize, CropKind)>,
    pub season_change: Option<SeasonChange>,
    pub evaporated: Vec<usize>,
}

/// Effective growth rate per tick before `TICK_GRANULARITY` is applied.
/// Empty plots grow at 0.
pub fn growth_rate(
    plot: &Plot,
    season: SeasonPhase,
    upgrades: &UpgradeLevels,
    speed_multiplier: f32,
) -> f32 {
    let Some(crop) = plot.crop else {
        return 0.0;
    };
    crop.def().growth_rate_per_tick
        * plot.water.multiplier()
        * upgrades.soil_bonus()
        * season.growth_multiplier()
        * speed_multiplier
}

/// Grows one plot by one tick. Returns true only on the tick that takes
/// growth from below 1.0 to exactly 1.0.
pub fn advance_plot_one_tick(
    plot: &mut Plot,
    season: SeasonPhase,
    upgrades: &UpgradeLevels,
    speed_multiplier: f32,
) -> bool {
    if !plot.is_growing() {
        return false;
    }

    let rate = growth_rate(plot, season, upgrades, speed_multiplier);
    let next = plot.growth + rate * TICK_GRANULARITY;
    plot.growth = if next.is_finite() {
        next.clamp(0.0, 1.0)
    } else {
        warn!("[Farm] Non-finite growth {} (rate {}), holding at {}", next, rate, plot.growth);
        plot.growth.clamp(0.0, 1.0)
    };

    plot.growth >= 1.0
}

/// Dries every plot. Returns the indices that were wet.
pub fn evaporate_all(plots: &mut [Plot; NUM_PLOTS]) -> Vec<usize> {
    let mut dried = Vec::new();
    for (i, plot) in plots.iter_mut().enumerate() {
        if plot.water.is_wet() {
            plot.water = WaterState::Dry;
            dried.push(i);
        }
    }
    dried
}

/// One simulated tick: grow every plot, advance the season, then
/// evaporate all water when `tick_index` lands on the evaporation window.
pub fn simulate_tick(farm: &mut FarmState, tick_index: u64) -> TickReport {
    let mut report = TickReport::default();

    let season = farm.season;
    let upgrades = farm.upgrades;
    let speed = farm.speed_multiplier;
    for (i, plot) in farm.plots.iter_mut().enumerate() {
        if advance_plot_one_tick(plot, season, &upgrades, speed) {
            if let Some(crop) = plot.crop {
                report.matured.push((i, crop));
            }
        }
    }

    report.season_change = advance_season_one_tick(farm);

    if tick_index % WATER_EVAPORATION_TICKS == 0 {
        report.evaporated = evaporate_all(&mut farm.plots);
    }

    report
}

/// Restores the plot invariants: growth finite and within [0, 1], and an
/// empty plot carries neither growth nor water. Returns true if anything
/// had to change.
pub fn enforce_plot_invariants(plot: &mut Plot) -> bool {
    let before = *plot;
    if !plot.growth.is_finite() {
        plot.growth = 0.0;
    }
    plot.growth = plot.growth.clamp(0.0, 1.0);
    if plot.crop.is_none() {
        plot.growth = 0.0;
        plot.water = WaterState::Dry;
    }
    *plot != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planted(crop: CropKind, water: WaterState) -> Plot {
        Plot { crop: Some(crop), growth: 0.0, water }
    }

    #[test]
    fn test_unwatered_wheat_250_ticks_is_half_grown() {
        let mut plot = planted(CropKind::Wheat, WaterState::Dry);
        let upgrades = UpgradeLevels::default();
        for _ in 0..250 {
            advance_plot_one_tick(&mut plot, SeasonPhase::Spring, &upgrades, 1.0);
        }
        assert!((plot.growth - 0.5).abs() < 1e-3, "growth was {}", plot.growth);
    }

    #[test]
    fn test_watered_wheat_100_ticks() {
        let mut plot = planted(CropKind::Wheat, WaterState::Watered);
        let upgrades = UpgradeLevels::default();
        for _ in 0..100 {
            advance_plot_one_tick(&mut plot, SeasonPhase::Autumn, &upgrades, 1.0);
        }
        assert!((plot.growth - 0.4).abs() < 1e-3, "growth was {}", plot.growth);
    }

    #[test]
    fn test_rate_combines_every_multiplier() {
        let plot = planted(CropKind::Wheat, WaterState::LuckyWatered);
        let upgrades = UpgradeLevels { soil: 2, ..Default::default() };
        let rate = growth_rate(&plot, SeasonPhase::Summer, &upgrades, 2.0);
        // 0.10 * 3 * 1.4 * 1.5 * 2
        assert!((rate - 1.26).abs() < 1e-5, "rate was {}", rate);
    }

    #[test]
    fn test_empty_plot_never_grows() {
        let mut plot = Plot::default();
        assert_eq!(growth_rate(&plot, SeasonPhase::Summer, &UpgradeLevels::default(), 5.0), 0.0);
        assert!(!advance_plot_one_tick(&mut plot, SeasonPhase::Summer, &UpgradeLevels::default(), 5.0));
        assert_eq!(plot.growth, 0.0);
    }

    #[test]
    fn test_maturity_edge_fires_once() {
        let mut plot = Plot { crop: Some(CropKind::Wheat), growth: 0.99, water: WaterState::Dry };
        let upgrades = UpgradeLevels::default();
        let mut edges = 0;
        for _ in 0..20 {
            if advance_plot_one_tick(&mut plot, SeasonPhase::Spring, &upgrades, 5.0) {
                edges += 1;
            }
        }
        assert_eq!(edges, 1);
        assert_eq!(plot.growth, 1.0);
    }

    #[test]
    fn test_growth_stays_in_range_at_max_speed() {
        let upgrades = UpgradeLevels { soil: MAX_UPGRADE_LEVEL, ..Default::default() };
        for crop in CropKind::ALL {
            let mut plot = planted(crop, WaterState::LuckyWatered);
            for _ in 0..500 {
                advance_plot_one_tick(&mut plot, SeasonPhase::Summer, &upgrades, MAX_SPEED_MULTIPLIER);
                assert!((0.0..=1.0).contains(&plot.growth));
            }
        }
    }

    #[test]
    fn test_non_finite_speed_is_held() {
        let mut plot = Plot { crop: Some(CropKind::Melon), growth: 0.3, water: WaterState::Dry };
        advance_plot_one_tick(&mut plot, SeasonPhase::Spring, &UpgradeLevels::default(), f32::NAN);
        assert_eq!(plot.growth, 0.3);
    }

    #[test]
    fn test_evaporation_on_window_tick_only() {
        let mut farm = FarmState::default();
        farm.plots[0] = planted(CropKind::Wheat, WaterState::Watered);
        farm.plots[3] = planted(CropKind::Carrot, WaterState::LuckyWatered);

        let report = simulate_tick(&mut farm, 199);
        assert!(report.evaporated.is_empty());
        assert!(farm.plots[0].is_watered());

        let report = simulate_tick(&mut farm, 200);
        assert_eq!(report.evaporated, vec![0, 3]);
        assert!(farm.plots.iter().all(|p| !p.is_watered()));
    }

    #[test]
    fn test_simulate_tick_reports_season_change() {
        let mut farm = FarmState {
            season: SeasonPhase::Winter,
            season_elapsed_ticks: 399,
            ..Default::default()
        };
        let report = simulate_tick(&mut farm, 1);
        assert_eq!(
            report.season_change,
            Some(SeasonChange { from: SeasonPhase::Winter, to: SeasonPhase::Spring })
        );
    }

    #[test]
    fn test_enforce_invariants_clears_empty_plot() {
        let mut plot = Plot { crop: None, growth: 0.7, water: WaterState::Watered };
        assert!(enforce_plot_invariants(&mut plot));
        assert_eq!(plot, Plot::default());

        let mut plot = Plot { crop: Some(CropKind::Potato), growth: 1.8, water: WaterState::Dry };
        assert!(enforce_plot_invariants(&mut plot));
        assert_eq!(plot.growth, 1.0);

        let mut ok = planted(CropKind::Potato, WaterState::Watered);
        assert!(!enforce_plot_invariants(&mut ok));
    }
}
