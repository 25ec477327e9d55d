//! Resource request string parsing
//!
//! Turns the compact `cpu=100m,memory=100Mi` flag syntax into a typed
//! quantity mapping used for every pod in a batch.

use std::collections::BTreeMap;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Suffixes accepted for a resource quantity, longest first so that `Mi`
/// is tried before `M`.
const QUANTITY_SUFFIXES: &[&str] = &[
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// Error produced while parsing a resource request string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An entry did not have the `name=quantity` shape
    #[error("malformed resource request entry {0:?}, expected name=quantity")]
    MalformedEntry(String),

    /// The quantity part of an entry is not a valid resource quantity
    #[error("invalid quantity {quantity:?} for resource {name:?}")]
    InvalidQuantity { name: String, quantity: String },
}

/// Resource name to quantity mapping shared by all pods in a batch
///
/// Built once per process lifetime from the `--requests` flag. Duplicate
/// resource names keep the last entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequests(BTreeMap<String, Quantity>);

impl ResourceRequests {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.0.get(name)
    }

    /// The underlying mapping, in the shape `ResourceRequirements.requests`
    /// expects.
    pub fn to_resource_list(&self) -> BTreeMap<String, Quantity> {
        self.0.clone()
    }
}

impl FromStr for ResourceRequests {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut requests = BTreeMap::new();
        for entry in s.split(',') {
            let entry = entry.trim();
            let (name, quantity) = entry
                .split_once('=')
                .ok_or_else(|| ParseError::MalformedEntry(entry.to_string()))?;
            let (name, quantity) = (name.trim(), quantity.trim());
            if name.is_empty() || quantity.is_empty() || quantity.contains('=') {
                return Err(ParseError::MalformedEntry(entry.to_string()));
            }
            if !is_valid_quantity(quantity) {
                return Err(ParseError::InvalidQuantity {
                    name: name.to_string(),
                    quantity: quantity.to_string(),
                });
            }
            requests.insert(name.to_string(), Quantity(quantity.to_string()));
        }
        Ok(ResourceRequests(requests))
    }
}

/// Validates the quantity grammar: a decimal number with an optional
/// binary-SI (`Ki`, `Mi`, ...) or decimal-SI (`n`, `u`, `m`, `k`, `M`, ...)
/// suffix. Scientific notation is allowed in the number part.
fn is_valid_quantity(s: &str) -> bool {
    let number = QUANTITY_SUFFIXES
        .iter()
        .find_map(|suffix| s.strip_suffix(suffix))
        .unwrap_or(s);
    if number.is_empty() {
        return false;
    }
    if !number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return false;
    }
    number.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}
