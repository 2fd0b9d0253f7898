//! # Protocol Configuration & Constants
//!
//! Every magic number in Umbra lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! The commitment-scheme parameters in particular are pinned protocol
//! values: changing a domain tag or the scheme version silently invalidates
//! every commitment ever issued, which means orphaning every domain ever
//! sold. Treat them like consensus constants, because they are.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Commitment Scheme (pinned — see module docs before touching anything)
// ---------------------------------------------------------------------------

/// Version of the commitment derivation scheme. Baked into the domain tags
/// below. A future circuit-friendly scheme (Poseidon or similar) ships as
/// v2 with new tags; v1 derivations are never reinterpreted.
pub const COMMITMENT_SCHEME_VERSION: u32 = 1;

/// BLAKE3 `derive_key` context for nullifier derivation.
pub const NULLIFIER_DOMAIN: &str = "umbra/nullifier/v1";

/// BLAKE3 `derive_key` context for commitment derivation.
pub const COMMITMENT_DOMAIN: &str = "umbra/commitment/v1";

/// Secret length in bytes. 32 bytes = 256 bits of entropy from the OS RNG.
/// Anything shorter is rejected as structurally invalid.
pub const SECRET_LENGTH: usize = 32;

/// Commitment length in bytes. BLAKE3 output, full width.
pub const COMMITMENT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Order Lifecycle
// ---------------------------------------------------------------------------

/// Cooldown window for duplicate order creation on the same resource.
/// A second create inside this window is rejected instead of allocating a
/// second on-chain deposit target for the same purchase intent.
pub const CREATE_COOLDOWN: Duration = Duration::from_secs(10);

/// How long an order waits for payment before expiring. Crypto payments
/// either arrive within the hour or never; a longer window just grows the
/// set of live deposit targets the settlement watcher has to scan.
pub const PAYMENT_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Underpayment tolerance in basis points. Exchange withdrawals routinely
/// shave a fee off the sent amount; 50 bps (0.5%) absorbs that without
/// accepting genuinely partial payments.
pub const PAYMENT_TOLERANCE_BPS: u64 = 50;

/// Suggested client polling interval, surfaced in status responses.
/// Polling faster than this buys nothing — payment confirmations are
/// measured in minutes, not milliseconds.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Deposit Targets
// ---------------------------------------------------------------------------

/// Bech32 human-readable prefix for deposit targets. Short enough to type,
/// distinct enough that nobody mistakes one for a wallet address.
pub const DEPOSIT_TARGET_HRP: &str = "udep";

/// Entropy per deposit target in bytes. 32 bytes of OS randomness makes
/// target collisions a non-event; uniqueness is additionally enforced by
/// the dead-target index, which reserves expired targets forever.
pub const DEPOSIT_TARGET_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Gateway Defaults
// ---------------------------------------------------------------------------

/// Default port for the order/record HTTP API.
pub const DEFAULT_API_PORT: u16 = 8640;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8641;

/// How often the background sweeper checks for overdue orders.
pub const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_tags_are_distinct_and_versioned() {
        // Colliding tags would collapse nullifier and commitment derivation
        // into the same function, which breaks the whole scheme.
        assert_ne!(NULLIFIER_DOMAIN, COMMITMENT_DOMAIN);
        assert!(NULLIFIER_DOMAIN.ends_with(&format!("v{}", COMMITMENT_SCHEME_VERSION)));
        assert!(COMMITMENT_DOMAIN.ends_with(&format!("v{}", COMMITMENT_SCHEME_VERSION)));
    }

    #[test]
    fn secret_meets_minimum_entropy_bound() {
        // 256 bits is the floor, not a suggestion.
        assert!(SECRET_LENGTH * 8 >= 256);
        assert_eq!(COMMITMENT_LENGTH, 32);
    }

    #[test]
    fn timing_constants_sanity() {
        // The cooldown must be far shorter than the payment window, and the
        // sweeper has to run often enough to actually enforce the window.
        assert!(CREATE_COOLDOWN < PAYMENT_WINDOW);
        assert!(EXPIRY_SWEEP_INTERVAL < PAYMENT_WINDOW);
        assert!(STATUS_POLL_INTERVAL.as_secs() > 0);
    }

    #[test]
    fn tolerance_is_a_shave_not_a_discount() {
        // Anything above a few hundred bps stops being fee tolerance and
        // starts being a price cut.
        assert!(PAYMENT_TOLERANCE_BPS < 500);
    }
}
