//! # External Collaborators
//!
//! Contracts for the services this core consumes but does not implement:
//! availability/pricing, registrar provisioning, and the DNS record
//! backend. The blockchain side has no trait here — the settlement watcher
//! calls *into* the lifecycle manager (`on_payment_observed` /
//! `on_payment_confirmed`), it is not called by it.
//!
//! Dev implementations live at the bottom so the gateway runs end-to-end
//! without any external service. They log loudly; nobody should mistake
//! them for production wiring.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CoreError;
use crate::order::types::Resource;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Availability + price quote for a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Whether the resource can currently be registered.
    pub available: bool,
    /// Quoted price in atomic units of the requested currency.
    pub price: u64,
}

/// Answers "can this be bought, and for how much" before order creation.
#[async_trait]
pub trait AvailabilityOracle: Send + Sync {
    /// Checks availability and quotes a price for the resource.
    async fn check(&self, resource: &Resource) -> Result<Quote, CoreError>;
}

/// Outcome of a provisioning call. `AlreadyProvisioned` is what makes the
/// contract idempotent: an operator-triggered retry after a transport
/// failure must be safe even when the first attempt actually landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The resource was registered by this call.
    Provisioned,
    /// The resource was already registered to us by an earlier attempt.
    AlreadyProvisioned,
}

/// The registrar-side provisioning service invoked during fulfillment.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    /// Provisions the resource, or reports it already provisioned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ProvisioningFailure`] with internal detail.
    /// The caller moves the order to `Failed` and never retries on its own.
    async fn provision(&self, resource: &Resource) -> Result<ProvisionOutcome, CoreError>;
}

/// A requested DNS record mutation, applied only after ownership
/// authorization succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordChange {
    /// Record type, e.g. `A`, `AAAA`, `MX`, `TXT`.
    pub record_type: String,
    /// Record name relative to the zone apex.
    pub name: String,
    /// Record value.
    pub value: String,
    /// TTL in seconds.
    pub ttl: u32,
}

/// The registrar-side record store. Storage and propagation are its
/// problem; authorization is ours and happens before any call lands here.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Applies a record change to the resource's zone.
    async fn apply(&self, resource: &Resource, change: RecordChange) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Dev implementations
// ---------------------------------------------------------------------------

/// Flat-price oracle for local development: everything is available at a
/// fixed quote except names it has been told are taken.
pub struct DevAvailabilityOracle {
    price: u64,
    taken: Mutex<HashSet<String>>,
}

impl DevAvailabilityOracle {
    /// Creates an oracle quoting `price` for every available name.
    pub fn new(price: u64) -> Self {
        Self {
            price,
            taken: Mutex::new(HashSet::new()),
        }
    }

    /// Marks a name as taken, for exercising the unavailable path.
    pub fn mark_taken(&self, resource: &Resource) {
        self.taken.lock().insert(resource.canonical());
    }
}

#[async_trait]
impl AvailabilityOracle for DevAvailabilityOracle {
    async fn check(&self, resource: &Resource) -> Result<Quote, CoreError> {
        let available = !self.taken.lock().contains(&resource.canonical());
        Ok(Quote {
            available,
            price: self.price,
        })
    }
}

/// Logging provisioner for local development. Tracks what it has
/// "registered" so retries exercise the idempotent path.
#[derive(Default)]
pub struct DevProvisioner {
    provisioned: Mutex<HashSet<String>>,
}

impl DevProvisioner {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceProvisioner for DevProvisioner {
    async fn provision(&self, resource: &Resource) -> Result<ProvisionOutcome, CoreError> {
        let mut provisioned = self.provisioned.lock();
        if provisioned.insert(resource.canonical()) {
            tracing::info!(resource = %resource, "dev provisioner: registered");
            Ok(ProvisionOutcome::Provisioned)
        } else {
            tracing::info!(resource = %resource, "dev provisioner: already registered");
            Ok(ProvisionOutcome::AlreadyProvisioned)
        }
    }
}

/// Record backend that logs changes and drops them on the floor.
#[derive(Default)]
pub struct DevRecordBackend;

impl DevRecordBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordBackend for DevRecordBackend {
    async fn apply(&self, resource: &Resource, change: RecordChange) -> Result<(), CoreError> {
        tracing::info!(
            resource = %resource,
            record_type = %change.record_type,
            name = %change.name,
            ttl = change.ttl,
            "dev record backend: change accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_oracle_quotes_until_taken() {
        let oracle = DevAvailabilityOracle::new(1_500);
        let r = Resource::parse("example.com").unwrap();

        let quote = oracle.check(&r).await.unwrap();
        assert!(quote.available);
        assert_eq!(quote.price, 1_500);

        oracle.mark_taken(&r);
        assert!(!oracle.check(&r).await.unwrap().available);
    }

    #[tokio::test]
    async fn dev_provisioner_is_idempotent() {
        let prov = DevProvisioner::new();
        let r = Resource::parse("example.com").unwrap();

        assert_eq!(
            prov.provision(&r).await.unwrap(),
            ProvisionOutcome::Provisioned
        );
        assert_eq!(
            prov.provision(&r).await.unwrap(),
            ProvisionOutcome::AlreadyProvisioned
        );
    }
}
