//! Remote store adapter: CRUD against the hosted `vehicles` table.

use crate::inventory::{Condition, Status, Vehicle, VehiclePatch};
use crate::{InventoryError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Hosted table holding the vehicle collection.
///
/// Every call is a single round trip; implementations do not retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All rows, most recently updated first.
    async fn list(&self) -> Result<Vec<Vehicle>>;

    /// Insert one row and return it as stored.
    async fn insert(&self, vehicle: &Vehicle) -> Result<Vehicle>;

    /// Apply a partial field set to the row with `id` and return it as stored.
    async fn update(
        &self,
        id: Uuid,
        patch: &VehiclePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Vehicle>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Insert or replace every given row by id.
    async fn upsert(&self, vehicles: &[Vehicle]) -> Result<Vec<Vehicle>>;
}

/// Row layout of the `vehicles` table (snake_case timestamps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRow {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub condition: Condition,
    pub status: Status,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub specifications: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Vehicle> for VehicleRow {
    fn from(v: &Vehicle) -> Self {
        Self {
            id: v.id,
            make: v.make.clone(),
            model: v.model.clone(),
            year: v.year,
            price: v.price,
            condition: v.condition,
            status: v.status,
            description: Some(v.description.clone()),
            specifications: Some(v.specifications.clone()),
            images: Some(v.images.clone()),
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: row.id,
            make: row.make,
            model: row.model,
            year: row.year,
            price: row.price,
            condition: row.condition,
            status: row.status,
            description: row.description.unwrap_or_default(),
            specifications: row.specifications.unwrap_or_default(),
            images: row.images.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// In-process table with switchable failure, for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    rows: Mutex<Vec<Vehicle>>,
    failing: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicles(vehicles: Vec<Vehicle>) -> Self {
        Self {
            rows: Mutex::new(vehicles),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every following call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current rows in storage order.
    pub fn snapshot(&self) -> Vec<Vehicle> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<Vehicle>>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(InventoryError::Remote(
                "remote store unreachable".to_string(),
            ));
        }
        self.rows
            .lock()
            .map_err(|_| InventoryError::Remote("remote table lock poisoned".to_string()))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list(&self) -> Result<Vec<Vehicle>> {
        let mut rows = self.rows()?.clone();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn insert(&self, vehicle: &Vehicle) -> Result<Vehicle> {
        let mut rows = self.rows()?;
        if rows.iter().any(|v| v.id == vehicle.id) {
            return Err(InventoryError::Remote(format!(
                "duplicate key value violates unique constraint: {}",
                vehicle.id
            )));
        }
        rows.push(vehicle.clone());
        Ok(vehicle.clone())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &VehiclePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Vehicle> {
        let mut rows = self.rows()?;
        let row = rows
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| InventoryError::NotFound(id.to_string()))?;
        patch.apply_to(row, updated_at);
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.rows()?.retain(|v| v.id != id);
        Ok(())
    }

    async fn upsert(&self, vehicles: &[Vehicle]) -> Result<Vec<Vehicle>> {
        let mut rows = self.rows()?;
        for vehicle in vehicles {
            match rows.iter_mut().find(|v| v.id == vehicle.id) {
                Some(existing) => *existing = vehicle.clone(),
                None => rows.push(vehicle.clone()),
            }
        }
        Ok(vehicles.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::NewVehicle;
    use chrono::{Duration, TimeZone};

    fn vehicle(model: &str, updated_days: i64) -> Vehicle {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut v = Vehicle::new(
            NewVehicle {
                make: "Toyota".to_string(),
                model: model.to_string(),
                year: 2024,
                price: 30000.0,
                ..Default::default()
            },
            created,
        );
        v.updated_at = created + Duration::days(updated_days);
        v
    }

    #[test]
    fn row_conversion_roundtrip() {
        let v = vehicle("RAV4", 1);
        let row = VehicleRow::from(&v);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("updated_at").is_some());
        assert_eq!(Vehicle::from(row), v);
    }

    #[test]
    fn row_tolerates_null_columns() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "make": "Honda",
            "model": "CR-V",
            "year": 2022,
            "price": 32500,
            "condition": "used",
            "status": "sold",
            "description": null,
            "created_at": "2024-01-01T00:00:00+00:00",
            "updated_at": "2024-01-01T00:00:00+00:00"
        });
        let row: VehicleRow = serde_json::from_value(json).unwrap();
        let v = Vehicle::from(row);
        assert_eq!(v.description, "");
        assert!(v.images.is_empty());
    }

    #[tokio::test]
    async fn memory_remote_lists_most_recent_first() {
        let remote = MemoryRemote::with_vehicles(vec![vehicle("Old", 1), vehicle("New", 5)]);
        let listed = remote.list().await.unwrap();
        assert_eq!(listed[0].model, "New");
        assert_eq!(listed[1].model, "Old");
    }

    #[tokio::test]
    async fn memory_remote_failure_switch() {
        let remote = MemoryRemote::new();
        remote.set_failing(true);
        assert!(matches!(
            remote.list().await,
            Err(InventoryError::Remote(_))
        ));
        remote.set_failing(false);
        assert!(remote.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_remote_update_and_upsert() {
        let v = vehicle("RAV4", 0);
        let remote = MemoryRemote::with_vehicles(vec![v.clone()]);

        let patch = VehiclePatch {
            price: Some(31000.0),
            ..Default::default()
        };
        let updated = remote
            .update(v.id, &patch, v.created_at + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(updated.price, 31000.0);

        let missing = remote.update(Uuid::new_v4(), &patch, Utc::now()).await;
        assert!(matches!(missing, Err(InventoryError::NotFound(_))));

        let other = vehicle("Corolla", 3);
        remote.upsert(&[updated, other]).await.unwrap();
        assert_eq!(remote.snapshot().len(), 2);

        assert!(remote.insert(&v).await.is_err());
    }
}
