//! Filter engine for the public catalog view.

use super::models::{max_model_year, Condition, Status, Vehicle, MIN_MODEL_YEAR};
use serde::{Deserialize, Serialize};

/// Upper price bound of the initial filters.
pub const DEFAULT_MAX_PRICE: f64 = 1_000_000.0;

/// Narrowing criteria for the catalog.
///
/// Bounds are not normalized: an inverted range simply matches nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryFilters {
    pub search: String,
    pub condition: Vec<Condition>,
    pub status: Vec<Status>,
    pub min_price: f64,
    pub max_price: f64,
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for InventoryFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            condition: Vec::new(),
            status: Vec::new(),
            min_price: 0.0,
            max_price: DEFAULT_MAX_PRICE,
            min_year: MIN_MODEL_YEAR,
            max_year: max_model_year(),
        }
    }
}

impl InventoryFilters {
    /// Whether a single vehicle passes every criterion.
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        let matches_search = self.search.is_empty()
            || format!("{} {} {}", vehicle.make, vehicle.model, vehicle.year)
                .to_lowercase()
                .contains(&self.search.to_lowercase());

        let matches_condition =
            self.condition.is_empty() || self.condition.contains(&vehicle.condition);

        let matches_status = self.status.is_empty() || self.status.contains(&vehicle.status);

        let matches_price = vehicle.price >= self.min_price && vehicle.price <= self.max_price;

        let matches_year = vehicle.year >= self.min_year && vehicle.year <= self.max_year;

        matches_search && matches_condition && matches_status && matches_price && matches_year
    }

    /// Merge a partial change into these filters.
    pub fn apply(&mut self, update: FilterUpdate) {
        if let Some(search) = update.search {
            self.search = search;
        }
        if let Some(condition) = update.condition {
            self.condition = condition;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(min_price) = update.min_price {
            self.min_price = min_price;
        }
        if let Some(max_price) = update.max_price {
            self.max_price = max_price;
        }
        if let Some(min_year) = update.min_year {
            self.min_year = min_year;
        }
        if let Some(max_year) = update.max_year {
            self.max_year = max_year;
        }
    }
}

/// Partial filter change; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterUpdate {
    pub search: Option<String>,
    pub condition: Option<Vec<Condition>>,
    pub status: Option<Vec<Status>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

/// Narrow `vehicles` to those matching `filters`, keeping input order.
pub fn filter_vehicles<'a>(vehicles: &'a [Vehicle], filters: &InventoryFilters) -> Vec<&'a Vehicle> {
    vehicles.iter().filter(|v| filters.matches(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::models::NewVehicle;
    use chrono::Utc;

    fn vehicle(make: &str, model: &str, year: i32, price: f64, status: Status) -> Vehicle {
        Vehicle::new(
            NewVehicle {
                make: make.to_string(),
                model: model.to_string(),
                year,
                price,
                status,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    fn wide_open() -> InventoryFilters {
        InventoryFilters {
            search: String::new(),
            condition: vec![],
            status: vec![],
            min_price: 0.0,
            max_price: 1_000_000.0,
            min_year: 1900,
            max_year: 2100,
        }
    }

    #[test]
    fn rav4_search_scenario() {
        let collection = vec![vehicle("Toyota", "RAV4", 2024, 32999.0, Status::Available)];

        let filters = InventoryFilters {
            search: "rav4".to_string(),
            ..wide_open()
        };
        let found = filter_vehicles(&collection, &filters);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].model, "RAV4");

        let sold_only = InventoryFilters {
            status: vec![Status::Sold],
            ..filters
        };
        assert!(filter_vehicles(&collection, &sold_only).is_empty());
    }

    #[test]
    fn search_covers_year_and_ignores_case() {
        let collection = vec![
            vehicle("Tesla", "Model Y", 2024, 45990.0, Status::Available),
            vehicle("Ford", "F-150 Lightning", 2023, 55000.0, Status::Available),
        ];
        let filters = InventoryFilters {
            search: "TESLA model y 2024".to_string(),
            ..wide_open()
        };
        assert_eq!(filter_vehicles(&collection, &filters).len(), 1);

        let by_year = InventoryFilters {
            search: "2023".to_string(),
            ..wide_open()
        };
        let found = filter_vehicles(&collection, &by_year);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].make, "Ford");
    }

    #[test]
    fn output_is_ordered_subsequence() {
        let collection = vec![
            vehicle("A", "One", 2020, 10_000.0, Status::Available),
            vehicle("B", "Two", 2021, 90_000.0, Status::Sold),
            vehicle("C", "Three", 2022, 20_000.0, Status::Available),
        ];
        let filters = InventoryFilters {
            status: vec![Status::Available],
            ..wide_open()
        };
        let found: Vec<&str> = filter_vehicles(&collection, &filters)
            .iter()
            .map(|v| v.make.as_str())
            .collect();
        assert_eq!(found, vec!["A", "C"]);
    }

    #[test]
    fn widening_bounds_never_drops_matches() {
        let collection = vec![
            vehicle("A", "One", 2015, 5_000.0, Status::Available),
            vehicle("B", "Two", 2019, 15_000.0, Status::Pending),
            vehicle("C", "Three", 2023, 45_000.0, Status::Available),
        ];
        let narrow = InventoryFilters {
            max_price: 20_000.0,
            min_year: 2016,
            ..wide_open()
        };
        let before = filter_vehicles(&collection, &narrow);

        let wider = InventoryFilters {
            max_price: 50_000.0,
            min_year: 2010,
            ..narrow.clone()
        };
        let after = filter_vehicles(&collection, &wider);

        for v in &before {
            assert!(after.iter().any(|w| w.id == v.id));
        }
        assert!(after.len() >= before.len());
    }

    #[test]
    fn inverted_bounds_match_nothing() {
        let collection = vec![vehicle("A", "One", 2020, 10_000.0, Status::Available)];
        let filters = InventoryFilters {
            min_price: 50_000.0,
            max_price: 1_000.0,
            ..wide_open()
        };
        assert!(filter_vehicles(&collection, &filters).is_empty());
    }

    #[test]
    fn apply_merges_partial_update() {
        let mut filters = InventoryFilters::default();
        filters.apply(FilterUpdate {
            search: Some("ford".to_string()),
            max_price: Some(60_000.0),
            ..Default::default()
        });
        assert_eq!(filters.search, "ford");
        assert_eq!(filters.max_price, 60_000.0);
        assert_eq!(filters.min_year, MIN_MODEL_YEAR);
        assert_eq!(filters.min_price, 0.0);
    }
}
