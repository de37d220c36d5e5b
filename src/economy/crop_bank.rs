//! Crop bank export and the host-inventory seam.
//!
//! Harvests drop one unit per crop into the bank. Exporting hands a
//! manifest to the host; if the host cannot take items, the ledger pays
//! fallback gold instead.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::shared::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub crop: CropKind,
    pub count: u32,
}

/// Per-species counts leaving the bank, in catalog order, zeros omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExportManifest {
    pub entries: Vec<ExportEntry>,
}

impl ExportManifest {
    pub fn from_bank(bank: &CropBank) -> Self {
        let entries = CropKind::ALL
            .iter()
            .filter_map(|&crop| {
                let count = bank.count(crop);
                (count > 0).then_some(ExportEntry { crop, count })
            })
            .collect();
        Self { entries }
    }

    pub fn total_units(&self) -> u64 {
        self.entries.iter().map(|e| e.count as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The host game's inventory. Returns true if it materialized the items.
pub trait HostInventory: Send + Sync + 'static {
    fn accept(&mut self, manifest: &ExportManifest) -> bool;
}

/// No host attached; every export pays fallback gold.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl HostInventory for NoHost {
    fn accept(&mut self, _manifest: &ExportManifest) -> bool {
        false
    }
}

#[derive(Resource)]
pub struct HostBridge(pub Box<dyn HostInventory>);

impl Default for HostBridge {
    fn default() -> Self {
        Self(Box::new(NoHost))
    }
}

impl HostBridge {
    pub fn new(host: impl HostInventory) -> Self {
        Self(Box::new(host))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportDelivery {
    Materialized,
    FallbackGold(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub manifest: ExportManifest,
    pub delivery: ExportDelivery,
}

pub fn fallback_gold_for(units: u64) -> u32 {
    let gold = units.saturating_mul(EXPORT_FALLBACK_GOLD_PER_UNIT as u64);
    u32::try_from(gold).unwrap_or(u32::MAX)
}

/// Empties the bank into `host`. Nothing is touched when the bank is empty.
pub(super) fn export_bank(
    farm: &mut FarmState,
    host: &mut dyn HostInventory,
) -> Result<ExportReceipt, Rejection> {
    let manifest = ExportManifest::from_bank(&farm.crop_bank);
    if manifest.is_empty() {
        return Err(Rejection::BankEmpty);
    }

    let units = manifest.total_units();
    let delivery = if host.accept(&manifest) {
        ExportDelivery::Materialized
    } else {
        let bonus = fallback_gold_for(units);
        farm.gold = farm.gold.saturating_add(bonus);
        farm.lifetime_gold_earned = farm.lifetime_gold_earned.saturating_add(bonus as u64);
        ExportDelivery::FallbackGold(bonus)
    };

    farm.crop_bank.clear();
    farm.lifetime_crops_exported = farm.lifetime_crops_exported.saturating_add(units);

    Ok(ExportReceipt { manifest, delivery })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        seen: Vec<ExportManifest>,
    }

    impl HostInventory for RecordingHost {
        fn accept(&mut self, manifest: &ExportManifest) -> bool {
            self.seen.push(manifest.clone());
            true
        }
    }

    #[test]
    fn test_manifest_skips_empty_slots() {
        let mut bank = CropBank::default();
        bank.add(CropKind::Carrot, 2);
        bank.add(CropKind::Pumpkin, 1);
        let manifest = ExportManifest::from_bank(&bank);
        assert_eq!(
            manifest.entries,
            vec![
                ExportEntry { crop: CropKind::Carrot, count: 2 },
                ExportEntry { crop: CropKind::Pumpkin, count: 1 },
            ]
        );
        assert_eq!(manifest.total_units(), 3);
    }

    #[test]
    fn test_export_to_host_materializes() {
        let mut farm = FarmState::default();
        farm.crop_bank.add(CropKind::Wheat, 4);
        let mut host = RecordingHost::default();

        let receipt = export_bank(&mut farm, &mut host).expect("bank has crops");

        assert_eq!(receipt.delivery, ExportDelivery::Materialized);
        assert_eq!(host.seen.len(), 1);
        assert_eq!(farm.gold, STARTING_GOLD);
        assert_eq!(farm.lifetime_crops_exported, 4);
        assert!(farm.crop_bank.is_empty());
    }

    #[test]
    fn test_export_without_host_pays_fallback() {
        let mut farm = FarmState::default();
        farm.crop_bank.add(CropKind::Wheat, 4);
        farm.crop_bank.add(CropKind::Melon, 1);

        let receipt = export_bank(&mut farm, &mut NoHost).expect("bank has crops");

        assert_eq!(receipt.delivery, ExportDelivery::FallbackGold(15));
        assert_eq!(farm.gold, STARTING_GOLD + 15);
        assert_eq!(farm.lifetime_gold_earned, 15);
        assert_eq!(farm.lifetime_crops_exported, 5);
    }

    #[test]
    fn test_empty_bank_is_rejected_without_change() {
        let mut farm = FarmState::default();
        let before = farm.clone();
        let mut host = RecordingHost::default();
        assert_eq!(export_bank(&mut farm, &mut host), Err(Rejection::BankEmpty));
        assert_eq!(farm, before);
        assert!(host.seen.is_empty());
    }

    #[test]
    fn test_manifest_json_names_crops() {
        let mut bank = CropBank::default();
        bank.add(CropKind::Beetroot, 3);
        let json = ExportManifest::from_bank(&bank).to_json().expect("serializable");
        assert_eq!(json, r#"{"entries":[{"crop":"Beetroot","count":3}]}"#);
    }
}
