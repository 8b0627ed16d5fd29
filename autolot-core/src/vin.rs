//! VIN helpers: scan acceptance and mapping of vPIC decode responses.

use crate::inventory::NewVehicle;
use crate::{InventoryError, Result};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Length of a modern (post-1981) VIN.
pub const VIN_LENGTH: usize = 17;

/// Specification keys filled from decode variables.
const SPEC_VARIABLES: [(&str, &str); 5] = [
    ("Engine Configuration", "Engine Type"),
    ("Fuel Type - Primary", "Fuel Type"),
    ("Drive Type", "Drive Type"),
    ("Body Class", "Body Class"),
    ("Vehicle Type", "Vehicle Type"),
];

/// Accept a scanned barcode as a VIN when it has exactly 17 characters
/// after trimming. Anything else is ignored.
pub fn accept_scanned_vin(scanned: &str) -> Option<String> {
    let vin = scanned.trim();
    (vin.chars().count() == VIN_LENGTH).then(|| vin.to_string())
}

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    #[serde(rename = "Results")]
    results: Vec<DecodeVariable>,
}

#[derive(Debug, Deserialize)]
struct DecodeVariable {
    #[serde(rename = "Variable", default)]
    variable: Option<String>,
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

/// Vehicle attributes recovered from a VIN decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VinDecoded {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub specifications: BTreeMap<String, String>,
}

impl VinDecoded {
    /// Map a vPIC `DecodeVin` JSON response.
    pub fn from_nhtsa(response: &serde_json::Value) -> Result<Self> {
        let decoded: DecodeResponse = serde_json::from_value(response.clone())
            .map_err(|e| InventoryError::Parse(format!("Invalid VIN decode response: {}", e)))?;

        let values: BTreeMap<String, String> = decoded
            .results
            .into_iter()
            .filter_map(|r| {
                let value = r.value?.trim().to_string();
                if value.is_empty() || value.eq_ignore_ascii_case("null") {
                    return None;
                }
                Some((r.variable?, value))
            })
            .collect();

        let text = |key: &str| values.get(key).cloned().unwrap_or_default();

        let year = values
            .get("Model Year")
            .and_then(|y| y.parse().ok())
            .unwrap_or_else(|| Utc::now().year());

        let specifications = SPEC_VARIABLES
            .iter()
            .filter_map(|(variable, key)| {
                values
                    .get(*variable)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();

        Ok(Self {
            make: text("Make"),
            model: text("Model"),
            year,
            specifications,
        })
    }

    /// Copy the decoded attributes into create input. Existing
    /// specifications are kept unless a decoded key replaces them.
    pub fn prefill(&self, fields: &mut NewVehicle) {
        if !self.make.is_empty() {
            fields.make = self.make.clone();
        }
        if !self.model.is_empty() {
            fields.model = self.model.clone();
        }
        fields.year = self.year;
        fields
            .specifications
            .extend(self.specifications.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> serde_json::Value {
        json!({
            "Count": 7,
            "Results": [
                { "Variable": "Make", "Value": "TOYOTA" },
                { "Variable": "Model", "Value": "RAV4" },
                { "Variable": "Model Year", "Value": "2024" },
                { "Variable": "Fuel Type - Primary", "Value": "Gasoline" },
                { "Variable": "Drive Type", "Value": "AWD/All-Wheel Drive" },
                { "Variable": "Body Class", "Value": "" },
                { "Variable": "Engine Configuration", "Value": null },
                { "Variable": "Vehicle Type", "Value": "null" }
            ]
        })
    }

    #[test]
    fn test_accept_scanned_vin() {
        assert_eq!(
            accept_scanned_vin("  JTMWRREV0RD000001\n"),
            Some("JTMWRREV0RD000001".to_string())
        );
        assert_eq!(accept_scanned_vin("12345"), None);
        assert_eq!(accept_scanned_vin("JTMWRREV0RD0000012"), None);
    }

    #[test]
    fn test_decode_mapping() {
        let decoded = VinDecoded::from_nhtsa(&response()).unwrap();
        assert_eq!(decoded.make, "TOYOTA");
        assert_eq!(decoded.model, "RAV4");
        assert_eq!(decoded.year, 2024);
        assert_eq!(decoded.specifications.len(), 2);
        assert_eq!(decoded.specifications["Fuel Type"], "Gasoline");
        assert_eq!(decoded.specifications["Drive Type"], "AWD/All-Wheel Drive");
        assert!(!decoded.specifications.contains_key("Body Class"));
        assert!(!decoded.specifications.contains_key("Vehicle Type"));
    }

    #[test]
    fn test_unparseable_year_defaults_to_current() {
        let decoded = VinDecoded::from_nhtsa(&json!({
            "Results": [{ "Variable": "Model Year", "Value": "unknown" }]
        }))
        .unwrap();
        assert_eq!(decoded.year, Utc::now().year());
        assert!(decoded.make.is_empty());
    }

    #[test]
    fn test_missing_results_is_parse_error() {
        assert!(matches!(
            VinDecoded::from_nhtsa(&json!({ "Message": "bad" })),
            Err(InventoryError::Parse(_))
        ));
    }

    #[test]
    fn test_prefill() {
        let decoded = VinDecoded::from_nhtsa(&response()).unwrap();
        let mut fields = NewVehicle {
            price: 32999.0,
            ..Default::default()
        };
        fields
            .specifications
            .insert("Color".to_string(), "Blue".to_string());

        decoded.prefill(&mut fields);
        assert_eq!(fields.make, "TOYOTA");
        assert_eq!(fields.year, 2024);
        assert_eq!(fields.price, 32999.0);
        assert_eq!(fields.specifications.len(), 3);
        assert!(fields.validate().is_ok());
    }
}
