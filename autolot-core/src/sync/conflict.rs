//! Last-Write-Wins conflict resolution.

use crate::inventory::Vehicle;
use std::collections::HashMap;
use uuid::Uuid;

/// Conflict resolution outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Accept the remote record (remote is newer or equal).
    AcceptRemote,
    /// Keep the local record (local is strictly newer).
    KeepLocal,
}

pub struct ConflictResolver;

impl ConflictResolver {
    /// Resolve a conflict between local and remote versions of one vehicle.
    ///
    /// LWW rules:
    /// 1. Strictly greater `updated_at` wins.
    /// 2. On a tie the remote version is kept.
    ///
    /// Whole records are compared; fields are never mixed.
    pub fn resolve(local: &Vehicle, remote: &Vehicle) -> Resolution {
        if local.updated_at > remote.updated_at {
            Resolution::KeepLocal
        } else {
            Resolution::AcceptRemote
        }
    }

    /// Merge the remote and local collections by id.
    ///
    /// Ids present on one side only are carried over unchanged. The result
    /// is ordered most recently updated first.
    pub fn merge(remote: Vec<Vehicle>, local: Vec<Vehicle>) -> Vec<Vehicle> {
        let mut merged: Vec<Vehicle> = Vec::with_capacity(remote.len().max(local.len()));
        let mut index: HashMap<Uuid, usize> = HashMap::new();

        for vehicle in remote {
            match index.get(&vehicle.id).copied() {
                // Duplicate ids within one side: keep the newer.
                Some(i) if vehicle.updated_at > merged[i].updated_at => merged[i] = vehicle,
                Some(_) => {}
                None => {
                    index.insert(vehicle.id, merged.len());
                    merged.push(vehicle);
                }
            }
        }

        for vehicle in local {
            match index.get(&vehicle.id).copied() {
                Some(i) => {
                    if Self::resolve(&vehicle, &merged[i]) == Resolution::KeepLocal {
                        merged[i] = vehicle;
                    }
                }
                None => {
                    index.insert(vehicle.id, merged.len());
                    merged.push(vehicle);
                }
            }
        }

        merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        merged
    }
}
