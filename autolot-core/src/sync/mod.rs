//! Offline-first synchronization of the vehicle inventory.
//!
//! - Remote table access over PostgREST
//! - Local mirror of the whole collection
//! - Last-write-wins reconciliation on reconnect

pub mod client;
pub mod conflict;
pub mod connectivity;
pub mod mirror;
pub mod notice;
pub mod remote;
pub mod store;

pub use client::RestClient;
pub use conflict::{ConflictResolver, Resolution};
pub use connectivity::{ConnectivityOracle, NetworkStatus};
pub use mirror::{JsonFileMirror, LocalMirror, MemoryMirror, STORAGE_KEY};
pub use notice::{Notice, NoticeLevel};
pub use remote::{MemoryRemote, RemoteStore, VehicleRow};
pub use store::{StoreFailure, VehicleStore};
