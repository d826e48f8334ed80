//! Key → supplier registry consulted while the application context boots.
//!
//! The registry is a `figment` provider, merged above every other
//! configuration source. Keys are dotted paths (`datasource.url`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use figment::providers::Serialized;
use figment::value::{Dict, Map};
use figment::{Figment, Metadata, Profile, Provider};

use crate::error::HarnessResult;

/// Zero-argument supplier of a property value. Re-evaluated on every lookup.
pub type Supplier = Arc<dyn Fn() -> HarnessResult<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct DynamicPropertyRegistry {
    suppliers: BTreeMap<String, Supplier>,
}

impl fmt::Debug for DynamicPropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicPropertyRegistry")
            .field("keys", &self.suppliers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DynamicPropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a supplier; a later registration for the same key wins.
    pub fn add<F>(&mut self, key: impl Into<String>, supplier: F)
    where
        F: Fn() -> HarnessResult<String> + Send + Sync + 'static,
    {
        self.suppliers.insert(key.into(), Arc::new(supplier));
    }

    /// Register a constant value.
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        self.add(key, move || Ok(value.clone()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.suppliers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    /// Evaluate the supplier for `key`, if one is registered.
    pub fn resolve(&self, key: &str) -> Option<HarnessResult<String>> {
        self.suppliers.get(key).map(|supplier| supplier())
    }

    /// Evaluate every supplier once, surfacing the first failure.
    pub fn validate(&self) -> HarnessResult<()> {
        for (key, supplier) in &self.suppliers {
            supplier().inspect_err(|e| {
                tracing::error!(key = %key, error = %e, "property supplier failed");
            })?;
        }
        Ok(())
    }
}

impl Provider for DynamicPropertyRegistry {
    fn metadata(&self) -> Metadata {
        Metadata::named("dynamic property registry")
    }

    /// Evaluates every supplier; the first failure fails the provider.
    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut figment = Figment::new();
        for (key, supplier) in &self.suppliers {
            let value = supplier().map_err(|e| {
                tracing::error!(key = %key, error = %e, "property supplier failed");
                figment::Error::from(format!("property supplier for '{key}' failed: {e}"))
            })?;
            figment = figment.merge(Serialized::default(key, value));
        }
        figment.data()
    }
}
