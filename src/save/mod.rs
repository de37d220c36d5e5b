//! Save domain: farm file I/O, load-at-startup, autosave/suspend writes, reset.
//!
//! The file is a flat `key=value` text document (see `codec`). Writes go to
//! a temp file first and are renamed into place. I/O faults are logged and
//! reported through `SaveCompleteEvent`; they never stop the simulation.

use bevy::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::economy::FarmLedger;
use crate::offline::OfflineCatchUpEvent;
use crate::shared::*;

pub mod codec;

pub const SAVE_FILE_NAME: &str = "farm_save.txt";

// ═══════════════════════════════════════════════════════════════════════
// PUBLIC TYPES
// ═══════════════════════════════════════════════════════════════════════

/// Where the farm lives on disk.
#[derive(Resource, Debug, Clone)]
pub struct SaveSettings {
    pub path: PathBuf,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            path: saves_directory().join(SAVE_FILE_NAME),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("could not create save directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("write failed for {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("rename to {} failed: {source}", path.display())]
    Rename { path: PathBuf, source: io::Error },
    #[error("read failed for {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("could not delete {}: {source}", path.display())]
    Delete { path: PathBuf, source: io::Error },
}

/// Sent by SavePlugin after a write completes (success or failure).
#[derive(Event, Debug, Clone)]
pub struct SaveCompleteEvent {
    pub reason: SaveReason,
    pub success: bool,
    pub error_message: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app
            // Resources
            .init_resource::<SaveSettings>()
            // Events emitted/received by this plugin
            .add_event::<SaveRequestEvent>()
            .add_event::<SaveCompleteEvent>()
            .add_event::<ResetFarmEvent>()
            // Resume: load, reconcile, go live
            .add_systems(OnEnter(SessionState::Loading), load_farm_on_startup)
            // Saves and resets are honoured in every state
            .add_systems(Update, (handle_reset_request, handle_save_requests).chain())
            // Shutdown: the in-memory farm is authoritative until written here
            .add_systems(Last, save_on_app_exit);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILESYSTEM HELPERS
// ═══════════════════════════════════════════════════════════════════════

fn saves_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir.join("saves")
}

fn ensure_parent_dir(path: &Path) -> Result<(), SaveError> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| SaveError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Writes `farm` with its suspend stamp set to `stamp_ms`, so a crash
/// before the next write resumes through offline catch-up. The caller's
/// copy is not touched.
pub fn write_farm(path: &Path, farm: &FarmState, stamp_ms: u64) -> Result<(), SaveError> {
    let mut persisted = farm.clone();
    persisted.last_suspended_at_ms = Some(stamp_ms);
    let text = codec::encode(&persisted);

    ensure_parent_dir(path)?;

    // Write to a temp file first, then rename for atomicity
    let tmp_path = path.with_extension("txt.tmp");
    fs::write(&tmp_path, text).map_err(|source| SaveError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| SaveError::Rename {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// `Ok(None)` when there is no save yet. Invalid UTF-8 is replaced rather
/// than rejected so a damaged byte only costs the field it lands in.
pub fn read_farm(path: &Path) -> Result<Option<FarmState>, SaveError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(codec::decode(&String::from_utf8_lossy(&bytes)))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SaveError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Returns whether a file was actually removed.
pub fn delete_farm(path: &Path) -> Result<bool, SaveError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SaveError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Loads the saved farm, falling back to a fresh one on a missing or
/// unreadable file.
pub fn load_or_fresh(path: &Path) -> FarmState {
    match read_farm(path) {
        Ok(Some(farm)) => {
            info!("[Save] Loaded farm '{}' from {}", farm.farm_name, path.display());
            farm
        }
        Ok(None) => {
            info!("[Save] No save at {}; starting a fresh farm", path.display());
            FarmState::default()
        }
        Err(e) => {
            warn!("[Save] {}; starting a fresh farm", e);
            FarmState::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

fn load_farm_on_startup(
    settings: Res<SaveSettings>,
    clock: Res<FarmClock>,
    mut ledger: ResMut<FarmLedger>,
    mut catch_up: EventWriter<OfflineCatchUpEvent>,
    mut next_state: ResMut<NextState<SessionState>>,
) {
    *ledger = FarmLedger::new(load_or_fresh(&settings.path));
    if let Some(summary) = ledger.reconcile(clock.now_ms()) {
        catch_up.send(OfflineCatchUpEvent { summary });
    }
    next_state.set(SessionState::Live);
}

fn handle_save_requests(
    mut save_events: EventReader<SaveRequestEvent>,
    mut complete_events: EventWriter<SaveCompleteEvent>,
    settings: Res<SaveSettings>,
    clock: Res<FarmClock>,
    ledger: Res<FarmLedger>,
) {
    for ev in save_events.read() {
        match write_farm(&settings.path, ledger.state(), clock.now_ms()) {
            Ok(()) => {
                info!("[Save] {:?} save succeeded.", ev.reason);
                complete_events.send(SaveCompleteEvent {
                    reason: ev.reason,
                    success: true,
                    error_message: None,
                });
            }
            Err(e) => {
                warn!("[Save] {:?} save FAILED: {}", ev.reason, e);
                complete_events.send(SaveCompleteEvent {
                    reason: ev.reason,
                    success: false,
                    error_message: Some(e.to_string()),
                });
            }
        }
    }
}

fn handle_reset_request(
    mut reset_events: EventReader<ResetFarmEvent>,
    settings: Res<SaveSettings>,
    mut ledger: ResMut<FarmLedger>,
) {
    // Several resets in one frame collapse into one.
    if reset_events.read().count() == 0 {
        return;
    }
    match delete_farm(&settings.path) {
        Ok(true) => info!("[Save] Deleted {}", settings.path.display()),
        Ok(false) => info!("[Save] No save file to delete"),
        Err(e) => warn!("[Save] {}", e),
    }
    *ledger = FarmLedger::default();
    info!("[Save] Farm reset to a fresh state.");
}

fn save_on_app_exit(
    mut exit_events: EventReader<AppExit>,
    settings: Res<SaveSettings>,
    clock: Res<FarmClock>,
    mut ledger: ResMut<FarmLedger>,
) {
    if exit_events.read().count() == 0 {
        return;
    }
    let now_ms = clock.now_ms();
    ledger.mark_suspended(now_ms);
    match write_farm(&settings.path, ledger.state(), now_ms) {
        Ok(()) => info!("[Save] Saved on exit to {}", settings.path.display()),
        Err(e) => warn!("[Save] Save on exit FAILED: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pocket-farm-save-{}-{}", std::process::id(), name))
            .join(SAVE_FILE_NAME)
    }

    #[test]
    fn test_write_then_read_stamps_copy_only() {
        let path = scratch_path("stamp");
        let mut farm = FarmState::default();
        farm.gold = 321;

        write_farm(&path, &farm, 9_999).expect("writable temp dir");
        assert_eq!(farm.last_suspended_at_ms, None);

        let loaded = read_farm(&path).expect("readable").expect("file exists");
        assert_eq!(loaded.gold, 321);
        assert_eq!(loaded.last_suspended_at_ms, Some(9_999));
        assert!(!path.with_extension("txt.tmp").exists());

        assert_eq!(delete_farm(&path).ok(), Some(true));
        assert_eq!(delete_farm(&path).ok(), Some(false));
    }

    #[test]
    fn test_invalid_utf8_only_costs_one_field() {
        let path = scratch_path("utf8");
        let mut farm = FarmState::default();
        farm.gold = 4321;
        farm.prestige_level = 3;
        farm.farm_name = "Hilltop".to_string();
        write_farm(&path, &farm, 1_000).expect("writable temp dir");

        let mut bytes = fs::read(&path).expect("readable");
        let name_at = bytes
            .windows(b"Hilltop".len())
            .position(|w| w == b"Hilltop")
            .expect("name written");
        bytes[name_at + 2] = 0xFF;
        fs::write(&path, &bytes).expect("writable");

        let loaded = read_farm(&path).expect("readable").expect("file exists");
        assert_eq!(loaded.gold, 4321);
        assert_eq!(loaded.prestige_level, 3);
        assert_eq!(loaded.last_suspended_at_ms, Some(1_000));
        assert_ne!(loaded.farm_name, "Hilltop");
        assert!(loaded.farm_name.starts_with("Hi"));

        let _ = delete_farm(&path);
    }

    #[test]
    fn test_missing_file_loads_fresh() {
        let path = scratch_path("missing");
        assert!(matches!(read_farm(&path), Ok(None)));
        assert_eq!(load_or_fresh(&path), FarmState::default());
    }

    #[test]
    fn test_error_message_names_path() {
        let err = SaveError::Read {
            path: PathBuf::from("/nowhere/farm_save.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "read failed for /nowhere/farm_save.txt: denied");
    }
}
