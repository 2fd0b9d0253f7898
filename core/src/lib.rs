// Copyright (c) 2026 Umbra Labs. MIT License.
// See LICENSE for details.

//! # Umbra Core
//!
//! The engine room of the Umbra registry: anonymous ownership proofs and a
//! payment-gated order lifecycle for irreversible cryptocurrency purchases.
//!
//! Umbra sells domains to people it never identifies. The only credential a
//! buyer ever holds is a 256-bit secret handed over exactly once at delivery;
//! the platform keeps a one-way commitment and nothing else. No accounts, no
//! emails, no password resets — lose the secret and the domain is gone. That
//! is the product, not a bug.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of an
//! anonymous registrar:
//!
//! - **commitment** — Secret generation and one-way commitment derivation.
//!   The only place new credentials are minted.
//! - **order** — The purchase state machine: deposit targets, payment
//!   observation, confirmation gating, fulfillment, expiry.
//! - **ownership** — The write-once commitment registry and the single
//!   authorization decision every record mutation goes through.
//! - **external** — Contracts for the collaborators this core consumes but
//!   does not implement: availability/pricing, registrar provisioning, and
//!   the DNS record backend.
//! - **config** — Protocol constants and pinned scheme parameters.
//! - **error** — The shared error taxonomy.
//!
//! ## Design Philosophy
//!
//! 1. The server can never forge, recover, or log a secret. Verify-only.
//! 2. Payments are irreversible, so nothing mints a secret before the
//!    settlement watcher confirms payment. No exceptions, no test shortcuts.
//! 3. Per-order locking, never a global lock. Orders are independent.
//! 4. If it touches money or credentials, it has tests. Plural.

pub mod commitment;
pub mod config;
pub mod error;
pub mod external;
pub mod order;
pub mod ownership;

pub use commitment::{Commitment, Secret};
pub use error::CoreError;
pub use order::{OrderLifecycleManager, OrderStatus, PaymentStatus, StatusSnapshot};
pub use ownership::OwnershipRegistry;
