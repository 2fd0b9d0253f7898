//! # Error Taxonomy
//!
//! The shared error type for the Umbra core. Two propagation rules apply
//! everywhere:
//!
//! 1. Anything touching credentials collapses to a single opaque failure at
//!    the public boundary. Callers of the authorization path never learn
//!    whether the resource was missing, the secret malformed, or the secret
//!    simply wrong — distinguishing those is an oracle.
//! 2. Payment and provisioning failures are logged with full internal
//!    detail for operators but surfaced to end users only as coarse status
//!    values. Funds were received; silence is not an option, but neither is
//!    leaking registrar internals.

use thiserror::Error;

/// Errors produced by the commitment engine and order lifecycle.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The presented secret is structurally invalid (wrong length, bad
    /// encoding). Surfaced to external callers as a generic "unauthorized" —
    /// never as this variant.
    #[error("invalid secret: malformed credential input")]
    InvalidSecret,

    /// A duplicate order creation for the same resource inside the cooldown
    /// window. The existing deposit target must be reused, not shadowed.
    #[error("duplicate order attempt for this resource; retry after {retry_after_secs}s")]
    DuplicateOrderAttempt {
        /// Seconds until a fresh create for this resource is accepted.
        retry_after_secs: u64,
    },

    /// An observed payment below the tolerance-adjusted quoted price.
    /// The order stays open; the shortfall is recorded for manual handling.
    #[error("insufficient payment: expected at least {expected}, received {received}")]
    InsufficientPayment {
        /// Minimum acceptable amount in atomic units.
        expected: u64,
        /// Amount actually observed.
        received: u64,
    },

    /// The downstream registrar call failed after payment was confirmed.
    /// Fatal to the order: it moves to `Failed` and waits for an operator.
    /// Never retried automatically — a retry could mint a second, orphaned
    /// commitment for the same resource.
    #[error("provisioning failure: {reason}")]
    ProvisioningFailure {
        /// Internal detail for operator review.
        reason: String,
    },

    /// No order exists for the given identifier.
    #[error("unknown order")]
    UnknownOrder,

    /// The order is not in a state that allows this operation.
    #[error("invalid state transition: order is {current}, expected {expected}")]
    InvalidTransition {
        /// The order's current status.
        current: String,
        /// The status required for this operation.
        expected: String,
    },

    /// The requested settlement currency is not supported.
    #[error("unsupported settlement currency: {currency}")]
    UnsupportedCurrency {
        /// The currency string the caller asked for.
        currency: String,
    },

    /// The availability collaborator reports the resource as taken.
    #[error("resource is not available for registration")]
    ResourceUnavailable,

    /// The resource failed structural validation (bad label, bad length).
    #[error("invalid resource name: {reason}")]
    InvalidResource {
        /// What specifically failed validation.
        reason: String,
    },

    /// A commitment is already bound to this resource. Binding happens
    /// exactly once, at the fulfillment transition, and is never replaced.
    #[error("a commitment is already bound to this resource")]
    AlreadyBound,
}

impl CoreError {
    /// Returns the retry-after hint in seconds, if this error carries one.
    /// Used by the gateway to populate the `Retry-After` header.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            CoreError::DuplicateOrderAttempt { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Whether this error must surface as an opaque "unauthorized" with a
    /// constant response shape, regardless of the underlying reason.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, CoreError::InvalidSecret)
    }
}
