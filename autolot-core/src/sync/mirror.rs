//! Local mirror: the on-device snapshot of the whole vehicle collection.
//!
//! The unit of storage is the full collection serialized as one JSON
//! document under a single key. There is no per-vehicle access.

use crate::inventory::Vehicle;
use crate::{InventoryError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Storage key of the mirror payload.
pub const STORAGE_KEY: &str = "vehicle_inventory";

/// Persisted snapshot of the vehicle collection.
pub trait LocalMirror: Send + Sync {
    /// Persisted collection, or empty when nothing is stored or the payload
    /// is unreadable.
    fn load(&self) -> Vec<Vehicle>;

    /// Overwrite the whole persisted payload.
    fn save(&self, vehicles: &[Vehicle]) -> Result<()>;
}

fn decode_payload(raw: &str) -> Vec<Vehicle> {
    match serde_json::from_str::<Vec<Vehicle>>(raw) {
        Ok(vehicles) => vehicles,
        Err(e) => {
            warn!("Discarding unreadable local mirror payload: {}", e);
            Vec::new()
        }
    }
}

fn encode_payload(vehicles: &[Vehicle]) -> Result<String> {
    serde_json::to_string(vehicles).map_err(|e| InventoryError::Storage(e.to_string()))
}

/// Mirror stored as `<dir>/vehicle_inventory.json`.
#[derive(Debug, Clone)]
pub struct JsonFileMirror {
    path: PathBuf,
}

impl JsonFileMirror {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalMirror for JsonFileMirror {
    fn load(&self) -> Vec<Vehicle> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => decode_payload(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Failed to read local mirror {:?}: {}", self.path, e);
                Vec::new()
            }
        }
    }

    fn save(&self, vehicles: &[Vehicle]) -> Result<()> {
        let payload = encode_payload(vehicles)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| {
            InventoryError::Storage(format!("Failed to create {:?}: {}", dir, e))
        })?;

        // One temp file per save; readers only ever see whole snapshots.
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| InventoryError::Storage(format!("Failed to write mirror: {}", e)))?;
        tmp.write_all(payload.as_bytes())
            .map_err(|e| InventoryError::Storage(format!("Failed to write mirror: {}", e)))?;
        tmp.persist(&self.path).map_err(|e| {
            InventoryError::Storage(format!("Failed to replace mirror: {}", e.error))
        })?;

        debug!("Saved {} vehicles to {:?}", vehicles.len(), self.path);
        Ok(())
    }
}

/// In-process mirror holding the serialized payload in memory.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    slot: Mutex<Option<String>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror pre-filled with an arbitrary raw payload.
    pub fn with_payload(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// Raw payload currently stored, if any.
    pub fn payload(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl LocalMirror for MemoryMirror {
    fn load(&self) -> Vec<Vehicle> {
        match self.slot.lock() {
            Ok(slot) => slot.as_deref().map(decode_payload).unwrap_or_default(),
            Err(_) => {
                warn!("Local mirror lock poisoned, treating as empty");
                Vec::new()
            }
        }
    }

    fn save(&self, vehicles: &[Vehicle]) -> Result<()> {
        let payload = encode_payload(vehicles)?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| InventoryError::Storage("Local mirror lock poisoned".to_string()))?;
        *slot = Some(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{NewVehicle, Status};
    use chrono::Utc;

    fn sample() -> Vec<Vehicle> {
        let now = Utc::now();
        vec![
            Vehicle::new(
                NewVehicle {
                    make: "Toyota".to_string(),
                    model: "RAV4".to_string(),
                    year: 2024,
                    price: 32999.0,
                    ..Default::default()
                },
                now,
            ),
            Vehicle::new(
                NewVehicle {
                    make: "Honda".to_string(),
                    model: "CR-V".to_string(),
                    year: 2022,
                    price: 32500.0,
                    status: Status::Pending,
                    ..Default::default()
                },
                now,
            ),
        ]
    }

    #[test]
    fn file_mirror_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = JsonFileMirror::new(dir.path());
        let vehicles = sample();

        mirror.save(&vehicles).unwrap();
        assert_eq!(mirror.load(), vehicles);
        assert!(mirror.path().ends_with("vehicle_inventory.json"));
    }

    #[test]
    fn file_mirror_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = JsonFileMirror::new(dir.path());
        mirror.save(&sample()).unwrap();

        assert_eq!(mirror.load(), mirror.load());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = JsonFileMirror::new(dir.path().join("nested"));
        assert!(mirror.load().is_empty());
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = JsonFileMirror::new(dir.path());
        std::fs::write(mirror.path(), "{not json").unwrap();

        assert!(mirror.load().is_empty());
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = JsonFileMirror::new(dir.path().join("a").join("b"));
        mirror.save(&sample()).unwrap();
        assert_eq!(mirror.load().len(), 2);
    }

    #[test]
    fn save_into_unwritable_location_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let mirror = JsonFileMirror::new(&blocker);
        assert!(matches!(
            mirror.save(&sample()),
            Err(InventoryError::Storage(_))
        ));
    }

    #[test]
    fn concurrent_saves_leave_a_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = std::sync::Arc::new(JsonFileMirror::new(dir.path()));
        let small = sample()[..1].to_vec();
        let large = sample();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mirror = mirror.clone();
                let vehicles = if i % 2 == 0 { small.clone() } else { large.clone() };
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        mirror.save(&vehicles).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = mirror.load();
        assert!(loaded == small || loaded == large);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn memory_mirror_roundtrip_and_corruption() {
        let mirror = MemoryMirror::new();
        assert!(mirror.load().is_empty());

        let vehicles = sample();
        mirror.save(&vehicles).unwrap();
        assert_eq!(mirror.load(), vehicles);
        assert!(mirror.payload().unwrap().contains("\"createdAt\""));

        let corrupt = MemoryMirror::with_payload("[{\"id\": 42}]");
        assert!(corrupt.load().is_empty());
    }
}
