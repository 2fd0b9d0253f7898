//! # Ownership Registry
//!
//! The write-once map from resource to commitment — the only ownership
//! record the platform holds. Binding happens exactly once, at the
//! fulfillment transition, and is never re-derived, replaced, or reset.
//! Whoever holds the matching secret owns the resource; the platform is
//! just the bookkeeper.
//!
//! [`OwnershipRegistry::authorize`] is the single authorization decision
//! for record mutations. It has exactly one failure mode from the outside:
//! `false`. Unknown resource, malformed secret, wrong secret — all
//! indistinguishable, so the endpoint cannot be used to probe which
//! resources exist.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::commitment::{self, Commitment};
use crate::error::CoreError;
use crate::order::types::{OrderId, Resource};

/// The persisted binding of a commitment to a delivered resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipRecord {
    /// The commitment — the one-way derivative of the owner's secret.
    pub commitment: Commitment,
    /// The order that delivered this resource.
    pub order_id: OrderId,
    /// When the binding was made.
    pub bound_at: DateTime<Utc>,
}

/// Concurrent write-once registry of ownership records, keyed by the
/// resource's canonical form.
#[derive(Default)]
pub struct OwnershipRegistry {
    records: DashMap<String, OwnershipRecord>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a commitment to a resource. Exactly once: a second bind for
    /// the same resource fails with [`CoreError::AlreadyBound`] no matter
    /// what commitment it carries.
    pub fn bind(
        &self,
        resource: &Resource,
        commitment: Commitment,
        order_id: OrderId,
    ) -> Result<(), CoreError> {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(resource.canonical()) {
            Entry::Occupied(_) => Err(CoreError::AlreadyBound),
            Entry::Vacant(slot) => {
                slot.insert(OwnershipRecord {
                    commitment,
                    order_id,
                    bound_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    /// Decides whether a claimed secret proves ownership of a resource.
    ///
    /// Recomputes the commitment from the claimed secret and compares it
    /// constant-time against the stored one. Every failure collapses to
    /// `false`; callers surface it as an opaque "unauthorized".
    pub fn authorize(&self, resource: &Resource, claimed_secret_hex: &str) -> bool {
        match self.records.get(&resource.canonical()) {
            Some(record) => commitment::verify(claimed_secret_hex, &record.commitment),
            None => false,
        }
    }

    /// Looks up the record for a resource. Operator/audit surface, not the
    /// authorization path.
    pub fn record(&self, resource: &Resource) -> Option<OwnershipRecord> {
        self.records.get(&resource.canonical()).map(|r| r.clone())
    }

    /// Number of bound resources.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn bound_registry() -> (OwnershipRegistry, Resource, String) {
        let registry = OwnershipRegistry::new();
        let resource = Resource::parse("example.com").unwrap();
        let (secret, commitment) = commitment::generate();
        registry
            .bind(&resource, commitment, Uuid::new_v4())
            .unwrap();
        (registry, resource, secret.reveal_hex())
    }

    #[test]
    fn bind_then_authorize_with_matching_secret() {
        let (registry, resource, secret_hex) = bound_registry();
        assert!(registry.authorize(&resource, &secret_hex));
    }

    #[test]
    fn wrong_secret_denied() {
        let (registry, resource, _) = bound_registry();
        let (other_secret, _) = commitment::generate();
        assert!(!registry.authorize(&resource, &other_secret.reveal_hex()));
    }

    #[test]
    fn unknown_resource_and_wrong_secret_are_indistinguishable() {
        let (registry, _, secret_hex) = bound_registry();
        let ghost = Resource::parse("not-registered.com").unwrap();
        // Both paths return the same bare false — no error, no detail.
        assert!(!registry.authorize(&ghost, &secret_hex));
    }

    #[test]
    fn malformed_secret_denied_without_error() {
        let (registry, resource, _) = bound_registry();
        assert!(!registry.authorize(&resource, "not-hex-at-all"));
        assert!(!registry.authorize(&resource, ""));
    }

    #[test]
    fn second_bind_rejected() {
        let (registry, resource, _) = bound_registry();
        let (_, second_commitment) = commitment::generate();
        assert!(matches!(
            registry.bind(&resource, second_commitment, Uuid::new_v4()),
            Err(CoreError::AlreadyBound)
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn record_exposes_audit_fields() {
        let (registry, resource, _) = bound_registry();
        let record = registry.record(&resource).unwrap();
        assert!(record.bound_at <= Utc::now());
    }
}
