//! Ingredient value type and the `name-quantity-unit` input syntax.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::IngredientError;

/// A single pantry ingredient.
///
/// Identity is the exact, case-sensitive `name`. Quantity is kept as the user typed it;
/// parsing only checks that it reads as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
    pub unit_of_measure: String,
}

impl Ingredient {
    pub fn new(
        name: impl Into<String>,
        quantity: impl Into<String>,
        unit_of_measure: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit_of_measure: unit_of_measure.into(),
        }
    }

    /// Parse user input of the form `name-quantity-unit`.
    ///
    /// The input must split into exactly three hyphen-delimited fields, the quantity
    /// must be a finite decimal number, and name and unit must be non-empty.
    /// Surrounding whitespace on each field is ignored.
    pub fn parse(raw: &str) -> Result<Self, IngredientError> {
        let invalid = |reason| IngredientError::InvalidFormat {
            input: raw.to_string(),
            reason,
        };

        let fields: Vec<&str> = raw.split('-').map(str::trim).collect();
        let [name, quantity, unit] = fields.as_slice() else {
            return Err(invalid("expected exactly three fields: name-quantity-unit"));
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if unit.is_empty() {
            return Err(invalid("unit of measure is empty"));
        }
        match quantity.parse::<f64>() {
            Ok(value) if value.is_finite() => {}
            _ => return Err(invalid("quantity is not a number")),
        }

        Ok(Self::new(*name, *quantity, *unit))
    }
}

impl FromStr for Ingredient {
    type Err = IngredientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.quantity, self.unit_of_measure)
    }
}

/// Check whether raw user input is valid ingredient syntax.
pub fn verify_format(raw: &str) -> bool {
    Ingredient::parse(raw).is_ok()
}
