//! # Order Lifecycle
//!
//! The purchase state machine, from creation through irreversible payment
//! to delivery of the ownership secret:
//!
//! ```text
//! Created -> AwaitingPayment -> PaymentDetected -> PaymentConfirmed
//!         -> Fulfilling -> Delivered
//! ```
//!
//! with terminal failure exits `Expired` (no payment inside the window) and
//! `Failed` (registrar error after payment — flagged for an operator, never
//! silently discarded, because the funds already arrived).
//!
//! The module splits the way the concerns split:
//!
//! - **types** — value types: resources, currencies, deposit targets,
//!   status enums, the client-facing status snapshot.
//! - **order** — a single [`Order`] record and its guarded transitions.
//! - **manager** — the concurrent [`OrderLifecycleManager`]: per-order
//!   locking, the create cooldown, dead-target bookkeeping, and the
//!   fulfillment pipeline that mints exactly one secret per order.

pub mod manager;
pub mod order;
pub mod types;

pub use manager::{DeliveredCredential, ManagerConfig, OrderLifecycleManager, UnmatchedDeposit};
pub use order::Order;
pub use types::{
    Currency, DepositTarget, OrderId, OrderStatus, PaymentStatus, Resource, StatusSnapshot,
};
