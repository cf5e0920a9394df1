//! Product master entries

use serde::{Deserialize, Serialize};

/// One entry of the product master: a code, a human description and the
/// unit weight used to derive request weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    pub description: String,
    /// Kilograms per unit
    pub weight_per_unit: f64,
}

impl Product {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        weight_per_unit: f64,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            weight_per_unit,
        }
    }

    /// Total weight of `quantity` units, rounded to 3 decimals
    pub fn total_weight(&self, quantity: u32) -> f64 {
        round3(self.weight_per_unit * f64::from(quantity))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
