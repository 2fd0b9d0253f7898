//! # Order Value Types
//!
//! Resources, currencies, deposit targets, and the status enums. Everything
//! here is a value: cheap to clone, serde-friendly, and free of lifecycle
//! logic — that lives in [`super::order`] and [`super::manager`].

use bech32::{Bech32, Hrp};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::{DEPOSIT_TARGET_HRP, DEPOSIT_TARGET_LENGTH};
use crate::error::CoreError;

/// Unique order identifier. UUID v4 under the hood.
pub type OrderId = Uuid;

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A purchasable resource: a domain name plus its extension.
///
/// Normalized to lowercase at construction. Structural validation only —
/// whether the name is actually registrable is the availability
/// collaborator's call, not ours.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    /// The second-level label, e.g. `example`.
    name: String,
    /// The extension without the leading dot, e.g. `com`.
    tld: String,
}

/// Maximum DNS label length per RFC 1035.
const MAX_LABEL_LENGTH: usize = 63;

impl Resource {
    /// Builds a resource from a label and extension, validating DNS label
    /// rules: ASCII alphanumerics and interior hyphens, 1–63 characters.
    pub fn new(name: &str, tld: &str) -> Result<Self, CoreError> {
        let name = name.trim().to_ascii_lowercase();
        let tld = tld.trim().to_ascii_lowercase();
        validate_label(&name)?;
        validate_label(&tld)?;
        Ok(Self { name, tld })
    }

    /// Parses the canonical `name.tld` form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.split_once('.') {
            Some((name, tld)) => Self::new(name, tld),
            None => Err(CoreError::InvalidResource {
                reason: "expected name.tld".into(),
            }),
        }
    }

    /// The canonical key used for cooldown tracking and ownership binding.
    pub fn canonical(&self) -> String {
        format!("{}.{}", self.name, self.tld)
    }
}

fn validate_label(label: &str) -> Result<(), CoreError> {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return Err(CoreError::InvalidResource {
            reason: format!("label must be 1..={} characters", MAX_LABEL_LENGTH),
        });
    }
    if !label
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(CoreError::InvalidResource {
            reason: "labels may contain only a-z, 0-9, and hyphens".into(),
        });
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(CoreError::InvalidResource {
            reason: "labels may not start or end with a hyphen".into(),
        });
    }
    Ok(())
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.tld)
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Supported settlement currencies. Exhaustive on purpose: an unsupported
/// currency is a create-time error, not a stringly-typed surprise at
/// payment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Bitcoin.
    Btc,
    /// Monero — the house favorite for obvious reasons.
    Xmr,
    /// Ether.
    Eth,
}

impl Currency {
    /// Parses a currency code, case-insensitive.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(Currency::Btc),
            "XMR" => Ok(Currency::Xmr),
            "ETH" => Ok(Currency::Eth),
            other => Err(CoreError::UnsupportedCurrency {
                currency: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Btc => write!(f, "BTC"),
            Currency::Xmr => write!(f, "XMR"),
            Currency::Eth => write!(f, "ETH"),
        }
    }
}

// ---------------------------------------------------------------------------
// DepositTarget
// ---------------------------------------------------------------------------

/// A one-time payment destination, unique per order and never reused.
///
/// Encoded as Bech32 with the `udep` prefix over 32 bytes of fresh OS
/// randomness. Bech32's checksum catches copy-paste mangling before a
/// payment disappears into a typo. An issued target cannot be "un-issued"
/// on-chain; expiry only marks it dead in our bookkeeping so later payments
/// to it are flagged rather than silently lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepositTarget(String);

impl DepositTarget {
    /// Allocates a fresh target from OS randomness.
    pub fn allocate() -> Self {
        let mut entropy = [0u8; DEPOSIT_TARGET_LENGTH];
        OsRng.fill_bytes(&mut entropy);
        let hrp = Hrp::parse(DEPOSIT_TARGET_HRP).expect("static HRP is valid");
        let encoded = bech32::encode::<Bech32>(hrp, &entropy)
            .expect("encoding a 32-byte payload should never fail");
        Self(encoded)
    }

    /// The encoded address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepositTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// The lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, deposit target allocated; transitions immediately to
    /// `AwaitingPayment` before the order is ever visible to a client.
    Created,
    /// Waiting for a payment to the deposit target.
    AwaitingPayment,
    /// A sufficient payment was observed on-chain, confirmations pending.
    PaymentDetected,
    /// The settlement watcher reports enough confirmations. The single gate
    /// before any secret is minted.
    PaymentConfirmed,
    /// Registrar provisioning in flight.
    Fulfilling,
    /// Terminal: resource provisioned, secret delivered exactly once.
    Delivered,
    /// Terminal: no payment inside the window; deposit target marked dead.
    Expired,
    /// Terminal: provisioning failed after confirmed payment. Requires
    /// operator reconciliation — funds were received.
    Failed,
}

impl OrderStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Expired | OrderStatus::Failed
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Created => "Created",
            OrderStatus::AwaitingPayment => "AwaitingPayment",
            OrderStatus::PaymentDetected => "PaymentDetected",
            OrderStatus::PaymentConfirmed => "PaymentConfirmed",
            OrderStatus::Fulfilling => "Fulfilling",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Expired => "Expired",
            OrderStatus::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Client-facing payment status, folded out of the order's payment
/// bookkeeping. Coarser than [`OrderStatus`] on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing observed yet.
    None,
    /// One or more payments observed, all below the acceptable amount.
    Underpaid,
    /// A sufficient payment observed, confirmations pending.
    Detected,
    /// Payment confirmed by the settlement watcher.
    Confirmed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::None => "none",
            PaymentStatus::Underpaid => "underpaid",
            PaymentStatus::Detected => "detected",
            PaymentStatus::Confirmed => "confirmed",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// The read model returned by status polls: a consistent view of one order
/// taken under its lock, safe to call arbitrarily often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// The order's lifecycle status.
    pub order_status: OrderStatus,
    /// Coarse payment status.
    pub payment_status: PaymentStatus,
    /// When the order reached `Delivered`, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// One-shot notice that the secret was already issued. `true` on exactly
    /// one read — the first poll after delivery — then `false` forever.
    /// The secret itself is never part of any snapshot.
    pub secret_issued: bool,
}
