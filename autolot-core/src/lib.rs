//! AutoLot Core Library
//!
//! This library provides the core functionality for the vehicle inventory,
//! including the catalog data model, the filter engine, and the
//! offline-first synchronized store layered over a hosted table.

pub mod config;
pub mod embed;
pub mod import;
pub mod inventory;
pub mod platform;
pub mod sync;
pub mod vin;

pub use config::AppConfig;
pub use inventory::{
    filter_vehicles, Condition, FilterUpdate, InventoryFilters, NewVehicle, Status, Vehicle,
    VehiclePatch,
};
pub use platform::{
    ensure_data_dir, get_config_dir, get_data_dir, get_default_config_path, get_default_mirror_dir,
};
pub use sync::{
    ConnectivityOracle, JsonFileMirror, LocalMirror, MemoryMirror, MemoryRemote, NetworkStatus,
    Notice, NoticeLevel, RemoteStore, RestClient, StoreFailure, VehicleStore,
};

use thiserror::Error;

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// General error type for inventory operations
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Vehicle not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`InventoryError`], kept by the store as its
/// last recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteFailure,
    StorageFailure,
    NotFound,
    ParseFailure,
    InvalidInput,
    ConfigFailure,
}

impl InventoryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(_) => ErrorKind::RemoteFailure,
            Self::Storage(_) | Self::Io(_) => ErrorKind::StorageFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Parse(_) => ErrorKind::ParseFailure,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Config(_) => ErrorKind::ConfigFailure,
        }
    }
}

impl From<reqwest::Error> for InventoryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote(e.to_string())
    }
}
