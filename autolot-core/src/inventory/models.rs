//! Catalog data model: vehicles, their enumerations, and the inputs of the
//! create and update operations.

use crate::{InventoryError, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Oldest model year accepted for a listing.
pub const MIN_MODEL_YEAR: i32 = 1900;

/// Newest model year accepted for a listing (next year's models are sold early).
pub fn max_model_year() -> i32 {
    Utc::now().year() + 1
}

/// Condition of a listed vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    New,
    Used,
    Certified,
}

impl Condition {
    pub const ALL: [Condition; 3] = [Self::New, Self::Used, Self::Certified];

    /// Convert the condition to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Certified => "certified",
        }
    }

    /// Parse a condition, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Self::New),
            "used" => Some(Self::Used),
            "certified" => Some(Self::Certified),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sales status of a listed vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Available,
    Sold,
    Pending,
}

impl Status {
    pub const ALL: [Status; 3] = [Self::Available, Self::Sold, Self::Pending];

    /// Convert the status to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
            Self::Pending => "pending",
        }
    }

    /// Parse a status, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Some(Self::Available),
            "sold" => Some(Self::Sold),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry.
///
/// Serialized with camelCase keys (`createdAt`, `updatedAt`), the layout of
/// the local mirror payload. Snake_case timestamp keys are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub condition: Condition,
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Build a vehicle with a fresh id, created and updated at `now`.
    pub fn new(fields: NewVehicle, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            make: fields.make,
            model: fields.model,
            year: fields.year,
            price: fields.price,
            condition: fields.condition,
            status: fields.status,
            description: fields.description,
            specifications: fields.specifications,
            images: fields.images,
            created_at: now,
            updated_at: now,
        }
    }

    /// One-line summary used by listings.
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

/// Attributes of a vehicle about to be created (no id, no timestamps).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewVehicle {
    /// Check the listing rules: make and model present, plausible year,
    /// non-negative price.
    pub fn validate(&self) -> Result<()> {
        if self.make.trim().is_empty() {
            return Err(InventoryError::InvalidInput("Make is required".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(InventoryError::InvalidInput("Model is required".to_string()));
        }
        validate_year(self.year)?;
        validate_price(self.price)
    }
}

/// Partial field set applied by an update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehiclePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specifications: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl VehiclePatch {
    /// True when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the fields that are present against the listing rules.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.make.as_deref(), Some(m) if m.trim().is_empty()) {
            return Err(InventoryError::InvalidInput("Make is required".to_string()));
        }
        if matches!(self.model.as_deref(), Some(m) if m.trim().is_empty()) {
            return Err(InventoryError::InvalidInput("Model is required".to_string()));
        }
        if let Some(year) = self.year {
            validate_year(year)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Replace the present fields on `vehicle` and refresh its update time.
    ///
    /// `updated_at` never moves before `created_at`.
    pub fn apply_to(&self, vehicle: &mut Vehicle, now: DateTime<Utc>) {
        if let Some(make) = &self.make {
            vehicle.make = make.clone();
        }
        if let Some(model) = &self.model {
            vehicle.model = model.clone();
        }
        if let Some(year) = self.year {
            vehicle.year = year;
        }
        if let Some(price) = self.price {
            vehicle.price = price;
        }
        if let Some(condition) = self.condition {
            vehicle.condition = condition;
        }
        if let Some(status) = self.status {
            vehicle.status = status;
        }
        if let Some(description) = &self.description {
            vehicle.description = description.clone();
        }
        if let Some(specifications) = &self.specifications {
            vehicle.specifications = specifications.clone();
        }
        if let Some(images) = &self.images {
            vehicle.images = images.clone();
        }
        vehicle.updated_at = now.max(vehicle.created_at);
    }
}

fn validate_year(year: i32) -> Result<()> {
    let max = max_model_year();
    if !(MIN_MODEL_YEAR..=max).contains(&year) {
        return Err(InventoryError::InvalidInput(format!(
            "Year must be between {} and {}, got {}",
            MIN_MODEL_YEAR, max, year
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(InventoryError::InvalidInput(format!(
            "Price must be a non-negative number, got {}",
            price
        )));
    }
    Ok(())
}
