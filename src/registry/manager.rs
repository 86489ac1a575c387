//! Breaker registry.
//!
//! # Responsibilities
//! - Own one breaker per guarded dependency, keyed by name
//! - Build breakers from configuration
//! - Provide snapshots for status reporting

use std::sync::Arc;
use dashmap::DashMap;

use crate::config::schema::TripwireConfig;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker};
use crate::resilience::settings::Settings;

/// Concurrent name → breaker map.
#[derive(Debug, Clone, Default)]
pub struct BreakerRegistry {
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding one breaker per configured entry.
    pub fn from_config(config: &TripwireConfig) -> Self {
        let registry = Self::new();
        for breaker in &config.breakers {
            let settings = Settings::from_config(breaker)
                .with_metrics(config.observability.metrics_enabled);
            registry.insert(settings);
        }
        tracing::info!(breakers = registry.len(), "Breaker registry initialized");
        registry
    }

    /// Look up a breaker by name.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|r| r.value().clone())
    }

    /// Return the named breaker, building it on first use.
    ///
    /// The settings' name is replaced by `name`.
    pub fn get_or_insert_with<F>(&self, name: &str, f: F) -> Arc<CircuitBreaker>
    where
        F: FnOnce() -> Settings,
    {
        if let Some(existing) = self.get(name) {
            return existing;
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(f().with_name(name))))
            .value()
            .clone()
    }

    /// Add a breaker, replacing (and returning) any previous one of that name.
    pub fn insert(&self, settings: Settings) -> Option<Arc<CircuitBreaker>> {
        let name = settings.name().to_string();
        let previous = self
            .breakers
            .insert(name.clone(), Arc::new(CircuitBreaker::new(settings)));
        if previous.is_some() {
            tracing::warn!(breaker = %name, "Replaced existing breaker");
        }
        previous
    }

    /// Remove a breaker. Callers still holding it keep a working handle.
    pub fn remove(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.remove(name).map(|(_, breaker)| breaker)
    }

    /// Sorted breaker names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.breakers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot of every breaker, sorted by name.
    pub fn snapshot(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|r| r.value().snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
