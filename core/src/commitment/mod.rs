//! # Identity Commitments
//!
//! Anonymous ownership for the Umbra registry. A buyer holds a [`Secret`];
//! the platform holds only its one-way [`Commitment`]. Proving ownership
//! means presenting the secret and letting the server recompute and compare
//! — the server can verify, but it can never forge or recover.
//!
//! The scheme is a hash-based secret/nullifier pair:
//!
//! ```text
//! nullifier  = BLAKE3_derive_key("umbra/nullifier/v1",  secret)
//! commitment = BLAKE3_derive_key("umbra/commitment/v1", secret || nullifier)
//! ```
//!
//! `derive_key` gives proper domain separation by construction — the two
//! contexts use different internal IVs, so cross-context collisions are
//! impossible. The nullifier exists so a future proof system can consume
//! the same credential without a re-issue; today it is folded into the
//! commitment and never leaves this module.
//!
//! Derivation is split from generation on purpose: [`engine::verify`] can be
//! exercised deterministically in tests, while [`engine::generate`] — the
//! one place that produces new credentials — stays small and auditable.

pub mod engine;
pub mod secret;

pub use engine::{derive, generate, verify};
pub use secret::{Commitment, Nullifier, Secret};
