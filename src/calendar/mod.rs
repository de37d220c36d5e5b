//! Calendar domain: the four-phase season cycle.
//!
//! Responsible for:
//! - Advancing the season clock one tick at a time (live and offscreen drivers)
//! - Advancing it by a whole offline window in one step (catch-up)
//! - Logging SeasonChangeEvent for observers
//!
//! The season only modulates growth speed; it has no other side effects.

use bevy::prelude::*;

use crate::shared::*;

pub struct CalendarPlugin;

impl Plugin for CalendarPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SeasonChangeEvent>()
            .add_systems(Update, log_season_changes);
    }
}

/// A completed phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonChange {
    pub from: SeasonPhase,
    pub to: SeasonPhase,
}

/// Advances the season clock by exactly one tick.
///
/// Returns the transition when the elapsed counter reaches the current
/// phase's duration; the counter then restarts at 0 in the next phase.
pub fn advance_season_one_tick(farm: &mut FarmState) -> Option<SeasonChange> {
    farm.season_elapsed_ticks = farm.season_elapsed_ticks.saturating_add(1);
    if farm.season_elapsed_ticks < farm.season.duration_ticks() {
        return None;
    }

    let from = farm.season;
    farm.season = from.next();
    farm.season_elapsed_ticks = 0;
    Some(SeasonChange { from, to: farm.season })
}

/// Advances the season clock by `ticks` at once, landing on exactly the
/// `(phase, elapsed)` that `ticks` calls to `advance_season_one_tick`
/// would produce. Returns how many phase boundaries were crossed.
pub fn advance_season_by(farm: &mut FarmState, ticks: u64) -> u64 {
    // Whole cycles return to the same (phase, elapsed) after 4 transitions.
    let cycle = SeasonPhase::CYCLE_TICKS as u64;
    let mut phases_advanced = (ticks / cycle) * 4;
    let mut remaining = ticks % cycle;

    let mut season = farm.season;
    let mut elapsed = farm.season_elapsed_ticks as u64;

    while remaining > 0 {
        let left = (season.duration_ticks() as u64).saturating_sub(elapsed);
        if remaining >= left {
            remaining -= left;
            season = season.next();
            elapsed = 0;
            phases_advanced += 1;
        } else {
            elapsed += remaining;
            remaining = 0;
        }
    }

    farm.season = season;
    farm.season_elapsed_ticks = elapsed as u32;
    phases_advanced
}

fn log_season_changes(mut season_events: EventReader<SeasonChangeEvent>) {
    for ev in season_events.read() {
        info!("[Calendar] Season changed: {} -> {}", ev.from.name(), ev.to.name());
        match ev.to {
            SeasonPhase::Summer => info!("[Calendar] Summer! Growth boosted."),
            SeasonPhase::Winter => info!("[Calendar] Winter! Growth slowed."),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farm_at(season: SeasonPhase, elapsed: u32) -> FarmState {
        FarmState {
            season,
            season_elapsed_ticks: elapsed,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_tick_without_transition() {
        let mut farm = farm_at(SeasonPhase::Spring, 10);
        assert_eq!(advance_season_one_tick(&mut farm), None);
        assert_eq!(farm.season_elapsed_ticks, 11);
    }

    #[test]
    fn test_transition_on_reaching_duration() {
        let mut farm = farm_at(SeasonPhase::Spring, 799);
        let change = advance_season_one_tick(&mut farm);
        assert_eq!(
            change,
            Some(SeasonChange { from: SeasonPhase::Spring, to: SeasonPhase::Summer })
        );
        assert_eq!(farm.season, SeasonPhase::Summer);
        assert_eq!(farm.season_elapsed_ticks, 0);
    }

    #[test]
    fn test_winter_wraps_to_spring() {
        let mut farm = farm_at(SeasonPhase::Winter, 399);
        let change = advance_season_one_tick(&mut farm).expect("winter should end");
        assert_eq!(change.to, SeasonPhase::Spring);
    }

    #[test]
    fn test_offline_advance_crosses_into_summer() {
        // 15s offline = 300 ticks, starting 750 ticks into Spring.
        let mut farm = farm_at(SeasonPhase::Spring, 750);
        let crossed = advance_season_by(&mut farm, 300);
        assert_eq!(crossed, 1);
        assert_eq!(farm.season, SeasonPhase::Summer);
        assert_eq!(farm.season_elapsed_ticks, 250);
    }

    #[test]
    fn test_bulk_advance_matches_tick_by_tick() {
        for &(season, elapsed, ticks) in &[
            (SeasonPhase::Spring, 0, 0u64),
            (SeasonPhase::Spring, 799, 1),
            (SeasonPhase::Autumn, 123, 2_600),
            (SeasonPhase::Winter, 399, 5_201),
            (SeasonPhase::Summer, 400, 7_777),
        ] {
            let mut bulk = farm_at(season, elapsed);
            let mut stepped = bulk.clone();

            let crossed = advance_season_by(&mut bulk, ticks);
            let mut stepped_crossings = 0;
            for _ in 0..ticks {
                if advance_season_one_tick(&mut stepped).is_some() {
                    stepped_crossings += 1;
                }
            }

            assert_eq!(bulk.season, stepped.season, "phase after {} ticks", ticks);
            assert_eq!(bulk.season_elapsed_ticks, stepped.season_elapsed_ticks);
            assert_eq!(crossed, stepped_crossings);
        }
    }

    #[test]
    fn test_full_cycle_returns_to_start() {
        let mut farm = farm_at(SeasonPhase::Autumn, 42);
        let crossed = advance_season_by(&mut farm, SeasonPhase::CYCLE_TICKS as u64 * 3);
        assert_eq!(crossed, 12);
        assert_eq!(farm.season, SeasonPhase::Autumn);
        assert_eq!(farm.season_elapsed_ticks, 42);
    }
}
