//! Vehicle catalog domain.
//!
//! This module holds the catalog data model, the pure filter engine used by
//! the public listing, and the starter catalogue.

pub mod filter;
pub mod models;
pub mod seed;

pub use filter::{filter_vehicles, FilterUpdate, InventoryFilters};
pub use models::{Condition, NewVehicle, Status, Vehicle, VehiclePatch};
pub use seed::sample_vehicles;
