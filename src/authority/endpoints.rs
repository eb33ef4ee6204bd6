//! Jurisdiction → authority endpoint lookup.

use std::collections::{BTreeMap, HashMap};

/// Case-insensitive endpoint table.
#[derive(Debug, Clone, Default)]
pub struct EndpointResolver {
    endpoints: HashMap<String, String>,
}

impl EndpointResolver {
    pub fn new(endpoints: &BTreeMap<String, String>) -> Self {
        Self {
            endpoints: endpoints
                .iter()
                .map(|(k, v)| (k.trim().to_uppercase(), v.clone()))
                .collect(),
        }
    }

    pub fn resolve(&self, jurisdiction: &str) -> Option<&str> {
        self.endpoints
            .get(&jurisdiction.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn jurisdictions(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}
