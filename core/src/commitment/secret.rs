//! # Credential Types
//!
//! The three value types of the commitment scheme. The rules:
//!
//! - A [`Secret`] is never logged, never implicitly serialized, and never
//!   stored server-side. It exists in memory between `generate()` and the
//!   one delivery response, and in verification it exists only as the
//!   caller-presented bytes being recomputed.
//! - A [`Commitment`] is public by definition — it is the only ownership
//!   record the platform persists, so it gets the full serde treatment.
//! - A [`Nullifier`] is internal plumbing; it never crosses the crate
//!   boundary.
//!
//! `Secret` intentionally does NOT implement `Serialize`/`Deserialize` or a
//! revealing `Debug`. Shipping a secret to a client should be a deliberate,
//! conscious act — that is what [`Secret::reveal_hex`] is for — not something
//! that happens because someone shoved one into a JSON response.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{COMMITMENT_LENGTH, SECRET_LENGTH};
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A buyer-held ownership credential: 256 bits of OS entropy.
///
/// Custody is entirely the holder's problem, by design. There is no reset
/// flow, because a reset flow is an account system, and an account system
/// is exactly what Umbra promises not to have.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    bytes: [u8; SECRET_LENGTH],
}

impl Secret {
    /// Wraps raw bytes as a secret. Crate-internal; the public ways in are
    /// [`engine::generate`](super::engine::generate) and [`Secret::from_hex`].
    pub(crate) fn from_bytes(bytes: [u8; SECRET_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parses a claimed secret from its hex form.
    ///
    /// Rejects anything that is not exactly 64 hex characters. The error is
    /// deliberately unspecific — callers on the authorization path must not
    /// be able to distinguish "too short" from "not hex".
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let raw = hex::decode(s).map_err(|_| CoreError::InvalidSecret)?;
        if raw.len() != SECRET_LENGTH {
            return Err(CoreError::InvalidSecret);
        }
        let mut bytes = [0u8; SECRET_LENGTH];
        bytes.copy_from_slice(&raw);
        Ok(Self { bytes })
    }

    /// The raw bytes, for derivation only.
    pub(crate) fn as_bytes(&self) -> &[u8; SECRET_LENGTH] {
        &self.bytes
    }

    /// Encodes the secret as hex for the one-time delivery response.
    ///
    /// Call sites of this method are the complete list of places a secret
    /// leaves the process. Keep that list short.
    pub fn reveal_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 32 bytes of redaction. If this ever prints key material, the
        // tracing pipeline becomes a credential store.
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

// ---------------------------------------------------------------------------
// Nullifier
// ---------------------------------------------------------------------------

/// Auxiliary secret-derived value mixed into commitment derivation.
///
/// Exists so a future proof scheme can prevent credential replay without a
/// re-issue. Never serialized, never exposed; it lives and dies inside
/// [`super::engine::derive`].
#[derive(Clone, PartialEq, Eq)]
pub struct Nullifier {
    pub(crate) bytes: [u8; 32],
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier(***)")
    }
}

// ---------------------------------------------------------------------------
// Commitment
// ---------------------------------------------------------------------------

/// The public, one-way derivative of a secret — the only ownership record
/// the platform stores. Collision-resistant, non-invertible, and immutable
/// once bound to a resource.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    pub(crate) bytes: [u8; COMMITMENT_LENGTH],
}

impl Commitment {
    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; COMMITMENT_LENGTH] {
        &self.bytes
    }

    /// Hex encoding for storage and API responses.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parses a stored commitment from hex.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let raw = hex::decode(s).map_err(|_| CoreError::InvalidSecret)?;
        if raw.len() != COMMITMENT_LENGTH {
            return Err(CoreError::InvalidSecret);
        }
        let mut bytes = [0u8; COMMITMENT_LENGTH];
        bytes.copy_from_slice(&raw);
        Ok(Self { bytes })
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Commitment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.bytes)
        }
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Commitment::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != COMMITMENT_LENGTH {
                return Err(serde::de::Error::custom(format!(
                    "expected {}-byte commitment, got {}",
                    COMMITMENT_LENGTH,
                    bytes.len()
                )));
            }
            let mut arr = [0u8; COMMITMENT_LENGTH];
            arr.copy_from_slice(&bytes);
            Ok(Commitment { bytes: arr })
        }
    }
}
