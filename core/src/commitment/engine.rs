//! # Derivation Engine
//!
//! The three operations of the commitment scheme: [`derive`], [`generate`],
//! and [`verify`]. All stateless, which makes them trivially safe under
//! concurrency — there is nothing here to lock.
//!
//! ## Failure semantics
//!
//! `derive` never fails for a well-formed secret; the type system makes
//! malformed input unrepresentable past [`Secret::from_hex`]. `verify`
//! returns `false` — never an error — for anything that does not check out,
//! so the caller cannot distinguish "malformed" from "wrong secret" through
//! error behavior. BLAKE3 has no failure mode to propagate; if the hashing
//! backend were somehow broken we would rather abort than return a wrong
//! commitment, and pure-Rust BLAKE3 makes that scenario unreachable.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::config::{COMMITMENT_DOMAIN, NULLIFIER_DOMAIN, SECRET_LENGTH};
use crate::error::CoreError;

use super::secret::{Commitment, Nullifier, Secret};

/// Derives the nullifier for a secret under its own domain tag.
fn derive_nullifier(secret: &Secret) -> Nullifier {
    let mut hasher = blake3::Hasher::new_derive_key(NULLIFIER_DOMAIN);
    hasher.update(secret.as_bytes());
    Nullifier {
        bytes: *hasher.finalize().as_bytes(),
    }
}

/// Derives the public commitment for a secret.
///
/// Pure and deterministic: the same secret always yields the same
/// commitment. Randomness belongs to secret *generation*, not derivation —
/// that separation is what lets the verification path be tested without an
/// RNG in sight.
pub fn derive(secret: &Secret) -> Commitment {
    let nullifier = derive_nullifier(secret);
    let mut hasher = blake3::Hasher::new_derive_key(COMMITMENT_DOMAIN);
    hasher.update(secret.as_bytes());
    hasher.update(&nullifier.bytes);
    Commitment {
        bytes: *hasher.finalize().as_bytes(),
    }
}

/// Mints a fresh credential: a new random secret and its commitment.
///
/// Called exactly once per order, at the fulfillment transition, after
/// payment is confirmed. Uses `OsRng` — `/dev/urandom` on Unix,
/// `BCryptGenRandom` on Windows. Predictable or reused randomness here is
/// a critical defect: it would let the platform (or anyone reading its
/// logs) reconstruct buyer credentials.
pub fn generate() -> (Secret, Commitment) {
    let mut bytes = [0u8; SECRET_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    let secret = Secret::from_bytes(bytes);
    let commitment = derive(&secret);
    (secret, commitment)
}

/// Checks a claimed secret (hex form, as presented over the wire) against a
/// stored commitment.
///
/// Recomputes the derivation and compares in constant time via
/// [`subtle::ConstantTimeEq`], so response timing reveals nothing about how
/// many digest bytes matched. Malformed input returns plain `false`.
pub fn verify(claimed_secret_hex: &str, stored: &Commitment) -> bool {
    let secret = match Secret::from_hex(claimed_secret_hex) {
        Ok(s) => s,
        Err(CoreError::InvalidSecret) => return false,
        Err(_) => return false,
    };
    let recomputed = derive(&secret);
    recomputed.as_bytes().ct_eq(stored.as_bytes()).into()
}
