//! Flat `key=value` text codec for `FarmState`.
//!
//! One field per line, arrays comma-joined. Decoding never fails: every
//! field (and every array element) falls back to its own default when
//! missing or unparseable, and the result is then clamped back inside the
//! farm's invariants.

use std::collections::HashMap;
use std::str::FromStr;

use bevy::prelude::*;

use crate::farming::enforce_plot_invariants;
use crate::shared::*;

const HEADER: &str = "# pocket-farm save";

// ═══════════════════════════════════════════════════════════════════════
// ENCODE
// ═══════════════════════════════════════════════════════════════════════

pub fn encode(farm: &FarmState) -> String {
    let mut out = String::with_capacity(768);
    out.push_str(HEADER);
    out.push('\n');

    let mut put = |key: &str, value: String| {
        out.push_str(&format!("{}={}\n", key, value));
    };

    put("gold", farm.gold.to_string());
    put("harvest_count", farm.harvest_count.to_string());
    put("season", farm.season.index().to_string());
    put("season_ticks", farm.season_elapsed_ticks.to_string());
    put("selected_plot", farm.selected_plot.to_string());
    put(
        "last_suspended_at",
        farm.last_suspended_at_ms.map(|ms| ms.to_string()).unwrap_or_default(),
    );
    put("auto_water", farm.upgrades.auto_water.to_string());
    put("gold_magnet", farm.upgrades.gold_magnet.to_string());
    put("soil_level", farm.upgrades.soil.to_string());
    put("quality_level", farm.upgrades.quality.to_string());
    put("lucky_level", farm.upgrades.lucky.to_string());
    put("prestige_level", farm.prestige_level.to_string());
    put("lifetime_gold_earned", farm.lifetime_gold_earned.to_string());
    put("lifetime_crops_exported", farm.lifetime_crops_exported.to_string());
    put("speed_multiplier", farm.speed_multiplier.to_string());
    put("farm_name", farm.farm_name.replace(['\n', '\r'], " "));
    put("crop_bank", join(farm.crop_bank.counts.iter()));
    put(
        "plot_crops",
        join(farm.plots.iter().map(|p| p.crop.map_or(-1, |c| c.index() as i32))),
    );
    put("plot_growth", join(farm.plots.iter().map(|p| p.growth)));
    put("plot_water", join(farm.plots.iter().map(|p| water_token(p.water))));

    out
}

fn join<T: ToString>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

fn water_token(water: WaterState) -> &'static str {
    match water {
        WaterState::Dry => "dry",
        WaterState::Watered => "watered",
        WaterState::LuckyWatered => "lucky",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// DECODE
// ═══════════════════════════════════════════════════════════════════════

/// Parses a save. Blank lines, `#` comments and unknown keys are skipped;
/// the first occurrence of a key wins.
pub fn decode(text: &str) -> FarmState {
    let fields = Fields::parse(text);
    let defaults = FarmState::default();

    let mut farm = FarmState {
        gold: fields.scalar("gold", defaults.gold),
        harvest_count: fields.scalar("harvest_count", defaults.harvest_count),
        season: fields.with("season", defaults.season, parse_season),
        season_elapsed_ticks: fields.scalar("season_ticks", defaults.season_elapsed_ticks),
        selected_plot: fields.scalar("selected_plot", defaults.selected_plot),
        last_suspended_at_ms: fields.with("last_suspended_at", None, parse_optional_ms),
        upgrades: UpgradeLevels {
            soil: fields.scalar("soil_level", 0),
            quality: fields.scalar("quality_level", 0),
            lucky: fields.scalar("lucky_level", 0),
            auto_water: fields.scalar("auto_water", false),
            gold_magnet: fields.scalar("gold_magnet", false),
        },
        prestige_level: fields.scalar("prestige_level", defaults.prestige_level),
        lifetime_gold_earned: fields.scalar("lifetime_gold_earned", defaults.lifetime_gold_earned),
        lifetime_crops_exported: fields
            .scalar("lifetime_crops_exported", defaults.lifetime_crops_exported),
        crop_bank: CropBank {
            counts: fields.list("crop_bank", [0u32; CROP_COUNT], |s| s.parse().ok()),
        },
        speed_multiplier: fields.scalar("speed_multiplier", defaults.speed_multiplier),
        farm_name: fields
            .raw("farm_name")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.farm_name),
        plots: defaults.plots,
    };

    let crops = fields.list("plot_crops", [None; NUM_PLOTS], parse_plot_crop);
    let growth = fields.list("plot_growth", [0.0f32; NUM_PLOTS], |s| s.parse().ok());
    let water = fields.list("plot_water", [WaterState::Dry; NUM_PLOTS], parse_water);
    for (i, plot) in farm.plots.iter_mut().enumerate() {
        *plot = Plot { crop: crops[i], growth: growth[i], water: water[i] };
    }

    normalize(&mut farm);
    farm
}

struct Fields<'a> {
    map: HashMap<&'a str, &'a str>,
}

impl<'a> Fields<'a> {
    fn parse(text: &'a str) -> Self {
        let mut map = HashMap::new();
        for line in text.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!("[Save] Skipping malformed line '{}'", line);
                continue;
            };
            map.entry(key.trim()).or_insert(value);
        }
        Self { map }
    }

    fn raw(&self, key: &str) -> Option<&'a str> {
        self.map.get(key).copied()
    }

    fn with<T>(&self, key: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> T {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match parse(raw.trim()) {
            Some(value) => value,
            None => {
                warn!("[Save] Bad value '{}' for '{}'; using default", raw.trim(), key);
                default
            }
        }
    }

    fn scalar<T: FromStr>(&self, key: &str, default: T) -> T {
        self.with(key, default, |s| s.parse().ok())
    }

    /// Element-wise: a bad or missing element keeps its default while its
    /// neighbours still load.
    fn list<T: Copy, const N: usize>(
        &self,
        key: &str,
        default: [T; N],
        parse: impl Fn(&str) -> Option<T>,
    ) -> [T; N] {
        let mut out = default;
        let Some(raw) = self.raw(key) else {
            return out;
        };
        for (i, part) in raw.split(',').enumerate() {
            if i >= N {
                warn!("[Save] '{}' has more than {} entries; ignoring the rest", key, N);
                break;
            }
            match parse(part.trim()) {
                Some(value) => out[i] = value,
                None => warn!("[Save] Bad entry {} '{}' in '{}'; using default", i, part.trim(), key),
            }
        }
        out
    }
}

fn parse_season(s: &str) -> Option<SeasonPhase> {
    if let Ok(index) = s.parse::<usize>() {
        return SeasonPhase::from_index(index);
    }
    SeasonPhase::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(s))
}

fn parse_optional_ms(s: &str) -> Option<Option<u64>> {
    if s.is_empty() {
        return Some(None);
    }
    s.parse().ok().map(Some)
}

fn parse_plot_crop(s: &str) -> Option<Option<CropKind>> {
    let index: i64 = s.parse().ok()?;
    if index < 0 {
        return Some(None);
    }
    CropKind::from_index(index as usize).map(Some)
}

fn parse_water(s: &str) -> Option<WaterState> {
    match s.to_ascii_lowercase().as_str() {
        "dry" | "false" | "0" => Some(WaterState::Dry),
        "watered" | "true" | "1" => Some(WaterState::Watered),
        "lucky" | "2" => Some(WaterState::LuckyWatered),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// INVARIANTS
// ═══════════════════════════════════════════════════════════════════════

/// Clamps a decoded farm back inside its invariants, logging each repair.
pub fn normalize(farm: &mut FarmState) {
    for (i, plot) in farm.plots.iter_mut().enumerate() {
        if enforce_plot_invariants(plot) {
            warn!("[Save] Plot {} was inconsistent; clamped", i);
        }
    }

    let duration = farm.season.duration_ticks();
    if farm.season_elapsed_ticks >= duration {
        warn!(
            "[Save] Season tick {} past {} length {}; clamped",
            farm.season_elapsed_ticks,
            farm.season.name(),
            duration
        );
        farm.season_elapsed_ticks = duration - 1;
    }

    for kind in LeveledUpgrade::ALL {
        let level = farm.upgrades.level_mut(kind);
        if *level > MAX_UPGRADE_LEVEL {
            warn!("[Save] {} level {} above max; clamped", kind.name(), level);
            *level = MAX_UPGRADE_LEVEL;
        }
    }

    if farm.selected_plot >= NUM_PLOTS {
        farm.selected_plot = 0;
    }

    let speed = farm.speed_multiplier;
    if !speed.is_finite() {
        warn!("[Save] Speed multiplier {} invalid; reset to 1.0", speed);
        farm.speed_multiplier = 1.0;
    } else if !(MIN_SPEED_MULTIPLIER..=MAX_SPEED_MULTIPLIER).contains(&speed) {
        warn!("[Save] Speed multiplier {} out of range; clamped", speed);
        farm.speed_multiplier = speed.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER);
    }

    if farm.farm_name.is_empty() {
        farm.farm_name = DEFAULT_FARM_NAME.to_string();
    } else if farm.farm_name.chars().count() > MAX_FARM_NAME_LEN {
        farm.farm_name = farm.farm_name.chars().take(MAX_FARM_NAME_LEN).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy_farm() -> FarmState {
        let mut farm = FarmState {
            gold: 1_234,
            harvest_count: 37,
            season: SeasonPhase::Autumn,
            season_elapsed_ticks: 412,
            selected_plot: 4,
            last_suspended_at_ms: Some(1_700_000_000_123),
            upgrades: UpgradeLevels { soil: 2, quality: 5, lucky: 1, auto_water: true, gold_magnet: false },
            prestige_level: 3,
            lifetime_gold_earned: 98_765,
            lifetime_crops_exported: 210,
            speed_multiplier: 1.75,
            farm_name: "Sunny Acres".to_string(),
            ..Default::default()
        };
        farm.crop_bank.add(CropKind::Potato, 7);
        farm.crop_bank.add(CropKind::Pumpkin, 2);
        farm.plots[0] = Plot { crop: Some(CropKind::Wheat), growth: 0.123_456_7, water: WaterState::Watered };
        farm.plots[3] = Plot { crop: Some(CropKind::Melon), growth: 1.0, water: WaterState::Dry };
        farm.plots[5] = Plot { crop: Some(CropKind::Beetroot), growth: 0.5, water: WaterState::LuckyWatered };
        farm
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let farm = busy_farm();
        assert_eq!(decode(&encode(&farm)), farm);
    }

    #[test]
    fn test_encoded_layout() {
        let text = encode(&busy_farm());
        assert!(text.starts_with(HEADER));
        assert!(text.contains("\nplot_crops=0,-1,-1,4,-1,3\n"));
        assert!(text.contains("\nplot_water=watered,dry,dry,dry,dry,lucky\n"));
        assert!(text.contains("\ncrop_bank=0,0,7,0,0,2\n"));
        assert!(text.contains("\nlast_suspended_at=1700000000123\n"));
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().next(), Some(HEADER));
        assert!(text.lines().skip(1).all(|line| line.contains('=')));
        assert_eq!(text.lines().count(), 21);
    }

    #[test]
    fn test_empty_input_is_fresh_farm() {
        assert_eq!(decode(""), FarmState::default());
        assert_eq!(decode("complete garbage\n\u{0}\u{1}"), FarmState::default());
    }

    #[test]
    fn test_bad_field_falls_back_alone() {
        let mut text = encode(&busy_farm());
        text = text.replace("gold=1234", "gold=lots");
        let farm = decode(&text);
        assert_eq!(farm.gold, STARTING_GOLD);
        assert_eq!(farm.harvest_count, 37);
        assert_eq!(farm.upgrades.quality, 5);
    }

    #[test]
    fn test_bad_array_element_falls_back_alone() {
        let farm = decode("plot_crops=0,banana,2\nplot_growth=0.5,x,0.25\nplot_water=true,false,nope\n");
        assert_eq!(farm.plots[0].crop, Some(CropKind::Wheat));
        assert_eq!(farm.plots[0].growth, 0.5);
        assert_eq!(farm.plots[0].water, WaterState::Watered);
        assert_eq!(farm.plots[1], Plot::default());
        assert_eq!(farm.plots[2].crop, Some(CropKind::Potato));
        assert_eq!(farm.plots[2].growth, 0.25);
        assert_eq!(farm.plots[2].water, WaterState::Dry);
    }

    #[test]
    fn test_truncated_file_keeps_prefix() {
        let text = encode(&busy_farm());
        let cut = text.find("prestige_level").expect("field present");
        let farm = decode(&text[..cut]);
        assert_eq!(farm.gold, 1_234);
        assert_eq!(farm.upgrades.soil, 2);
        assert_eq!(farm.prestige_level, 0);
        assert!(farm.plots.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let farm = decode("gold=10\ngold=20\n");
        assert_eq!(farm.gold, 10);
    }

    #[test]
    fn test_missing_suspend_stamp_is_none() {
        assert_eq!(decode("last_suspended_at=\n").last_suspended_at_ms, None);
        assert_eq!(decode("last_suspended_at=42\n").last_suspended_at_ms, Some(42));
    }

    #[test]
    fn test_invariant_violations_are_clamped() {
        let farm = decode(
            "season=3\nseason_ticks=9999\nsoil_level=9\nselected_plot=12\nspeed_multiplier=40\n\
             plot_crops=-1,1\nplot_growth=0.7,2.5\nplot_water=watered,dry\n",
        );
        assert_eq!(farm.season, SeasonPhase::Winter);
        assert_eq!(farm.season_elapsed_ticks, 399);
        assert_eq!(farm.upgrades.soil, MAX_UPGRADE_LEVEL);
        assert_eq!(farm.selected_plot, 0);
        assert_eq!(farm.speed_multiplier, MAX_SPEED_MULTIPLIER);
        assert_eq!(farm.plots[0], Plot::default());
        assert_eq!(farm.plots[1].growth, 1.0);
    }

    #[test]
    fn test_unknown_crop_index_falls_back() {
        let farm = decode("plot_crops=6,-1\nplot_growth=0.4,0\n");
        // Crop rejected, so the orphaned growth is cleared too.
        assert_eq!(farm.plots[0], Plot::default());
    }

    #[test]
    fn test_season_accepts_name() {
        assert_eq!(decode("season=summer\n").season, SeasonPhase::Summer);
        assert_eq!(decode("season=7\n").season, SeasonPhase::Spring);
    }

    #[test]
    fn test_farm_name_with_equals_sign() {
        let farm = FarmState { farm_name: "A=B Farm".to_string(), ..Default::default() };
        assert_eq!(decode(&encode(&farm)).farm_name, "A=B Farm");
    }
}
