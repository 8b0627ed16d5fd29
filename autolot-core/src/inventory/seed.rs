//! Starter catalogue used to populate an empty inventory.

use super::models::{Condition, NewVehicle, Status};
use std::collections::BTreeMap;

fn specs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The sample listings inserted by `VehicleStore::seed_if_empty`.
pub fn sample_vehicles() -> Vec<NewVehicle> {
    vec![
        NewVehicle {
            make: "Toyota".to_string(),
            model: "RAV4".to_string(),
            year: 2024,
            price: 32999.0,
            condition: Condition::New,
            status: Status::Available,
            description: "Brand new Toyota RAV4 with Toyota Safety Sense 2.5, AWD, and premium audio system.".to_string(),
            specifications: specs(&[
                ("Engine", "2.5L 4-Cylinder"),
                ("Transmission", "8-Speed Automatic"),
                ("Drivetrain", "All-Wheel Drive"),
                ("Fuel Economy", "27 city / 35 highway"),
                ("Interior", "Black SofTex"),
                ("Exterior", "Blueprint"),
            ]),
            images: vec!["https://images.unsplash.com/photo-1581540222194-0def2dda95b8".to_string()],
        },
        NewVehicle {
            make: "Tesla".to_string(),
            model: "Model Y".to_string(),
            year: 2024,
            price: 45990.0,
            condition: Condition::New,
            status: Status::Available,
            description: "All-electric SUV with advanced Autopilot, premium interior, and impressive range.".to_string(),
            specifications: specs(&[
                ("Range", "330 miles"),
                ("Acceleration", "0-60 mph in 4.8s"),
                ("Drive", "Dual Motor AWD"),
                ("Top Speed", "135 mph"),
                ("Interior", "White Vegan Leather"),
                ("Exterior", "Pearl White"),
            ]),
            images: vec!["https://images.unsplash.com/photo-1619317554478-c3a56acd2b45".to_string()],
        },
        NewVehicle {
            make: "Ford".to_string(),
            model: "F-150 Lightning".to_string(),
            year: 2023,
            price: 55000.0,
            condition: Condition::Certified,
            status: Status::Available,
            description: "Electric pickup truck with extended range battery and Pro Power Onboard.".to_string(),
            specifications: specs(&[
                ("Range", "320 miles"),
                ("Power", "580 hp"),
                ("Towing", "10,000 lbs"),
                ("Payload", "2,000 lbs"),
                ("Interior", "Black Leather"),
                ("Exterior", "Antimatter Blue"),
            ]),
            images: vec!["https://images.unsplash.com/photo-1675950087025-908c2fb2dd88".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_valid_listings() {
        let samples = sample_vehicles();
        assert_eq!(samples.len(), 3);
        for sample in &samples {
            assert!(sample.validate().is_ok(), "{} should validate", sample.model);
        }
    }
}
