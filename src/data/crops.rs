use serde::{Deserialize, Serialize};

/// Number of crop species. The crop bank has one slot per species.
pub const CROP_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropKind {
    Wheat,
    Carrot,
    Potato,
    Beetroot,
    Melon,
    Pumpkin,
}

/// Static definition of one crop species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropDef {
    pub kind: CropKind,
    pub name: &'static str,
    pub base_cost: u32,
    /// Base growth rate; growth per tick is `rate × TICK_GRANULARITY`.
    pub growth_rate_per_tick: f32,
    pub reward_min: u32,
    pub reward_max: u32,
}

/// Varied economics for strategic choice: fast cheap crops pay little,
/// slow expensive ones pay more per harvest.
///
/// | Crop     | Cost | Rate | Reward  | Ticks to mature (unwatered) |
/// |----------|------|------|---------|-----------------------------|
/// | Wheat    | 3g   | 0.10 | 6–14g   | 500                         |
/// | Carrot   | 4g   | 0.08 | 8–16g   | 625                         |
/// | Potato   | 4g   | 0.07 | 8–18g   | ~715                        |
/// | Beetroot | 6g   | 0.05 | 12–22g  | 1000                        |
/// | Melon    | 8g   | 0.04 | 16–28g  | 1250                        |
/// | Pumpkin  | 10g  | 0.03 | 20–35g  | ~1667                       |
pub static CROPS: [CropDef; CROP_COUNT] = [
    CropDef {
        kind: CropKind::Wheat,
        name: "Wheat",
        base_cost: 3,
        growth_rate_per_tick: 0.10,
        reward_min: 6,
        reward_max: 14,
    },
    CropDef {
        kind: CropKind::Carrot,
        name: "Carrot",
        base_cost: 4,
        growth_rate_per_tick: 0.08,
        reward_min: 8,
        reward_max: 16,
    },
    CropDef {
        kind: CropKind::Potato,
        name: "Potato",
        base_cost: 4,
        growth_rate_per_tick: 0.07,
        reward_min: 8,
        reward_max: 18,
    },
    CropDef {
        kind: CropKind::Beetroot,
        name: "Beetroot",
        base_cost: 6,
        growth_rate_per_tick: 0.05,
        reward_min: 12,
        reward_max: 22,
    },
    CropDef {
        kind: CropKind::Melon,
        name: "Melon",
        base_cost: 8,
        growth_rate_per_tick: 0.04,
        reward_min: 16,
        reward_max: 28,
    },
    CropDef {
        kind: CropKind::Pumpkin,
        name: "Pumpkin",
        base_cost: 10,
        growth_rate_per_tick: 0.03,
        reward_min: 20,
        reward_max: 35,
    },
];

impl CropKind {
    pub const ALL: [CropKind; CROP_COUNT] = [
        CropKind::Wheat,
        CropKind::Carrot,
        CropKind::Potato,
        CropKind::Beetroot,
        CropKind::Melon,
        CropKind::Pumpkin,
    ];

    pub fn index(self) -> usize {
        match self {
            CropKind::Wheat => 0,
            CropKind::Carrot => 1,
            CropKind::Potato => 2,
            CropKind::Beetroot => 3,
            CropKind::Melon => 4,
            CropKind::Pumpkin => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn def(self) -> &'static CropDef {
        &CROPS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_indexed_by_kind() {
        for (i, def) in CROPS.iter().enumerate() {
            assert_eq!(def.kind.index(), i, "{} is out of order", def.name);
            assert_eq!(CropKind::from_index(i), Some(def.kind));
        }
        assert_eq!(CropKind::from_index(CROP_COUNT), None);
    }

    #[test]
    fn test_reward_ranges_are_ordered() {
        for def in CROPS.iter() {
            assert!(def.reward_min <= def.reward_max, "{} has an inverted range", def.name);
            assert!(def.growth_rate_per_tick > 0.0);
            assert!(def.base_cost > 0);
        }
    }

    #[test]
    fn test_wheat_is_cheapest_and_fastest() {
        let wheat = CropKind::Wheat.def();
        assert_eq!(wheat.base_cost, 3);
        assert_eq!(wheat.growth_rate_per_tick, 0.10);
        for def in CROPS.iter() {
            assert!(def.base_cost >= wheat.base_cost);
            assert!(def.growth_rate_per_tick <= wheat.growth_rate_per_tick);
        }
    }
}
