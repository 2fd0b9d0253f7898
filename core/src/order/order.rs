//! # The Order Record
//!
//! A single purchase, with guarded transition methods. Invalid transitions
//! return [`CoreError::InvalidTransition`]; terminal states are immutable.
//! Everything immutable after creation — resource, currency, quoted price,
//! deposit target — is set once in [`Order::create`] and never touched
//! again; only status and payment/fulfillment bookkeeping move.
//!
//! This type is single-threaded on purpose. Serialization of concurrent
//! transitions is the manager's job (one `tokio::sync::Mutex` per order);
//! the record itself just enforces the state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PAYMENT_TOLERANCE_BPS;
use crate::error::CoreError;

use super::types::{
    Currency, DepositTarget, OrderId, OrderStatus, PaymentStatus, Resource, StatusSnapshot,
};

/// A single observed payment to the order's deposit target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentObservation {
    /// Amount in atomic units of the order's currency.
    pub amount: u64,
    /// On-chain transaction reference, for operator reconciliation.
    pub tx_ref: String,
    /// When the settlement watcher reported it.
    pub observed_at: DateTime<Utc>,
    /// Whether this observation alone met the acceptable amount.
    pub sufficient: bool,
}

/// A tracked purchase moving through the payment-gated lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for this order.
    pub id: OrderId,
    /// The resource being purchased.
    pub resource: Resource,
    /// Settlement currency.
    pub currency: Currency,
    /// Quoted price in atomic units.
    pub price: u64,
    /// Minimum acceptable payment after the underpayment tolerance.
    pub min_accepted: u64,
    /// The one-time deposit target allocated for this order.
    pub deposit_target: DepositTarget,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Every payment the watcher has reported for this order, sufficient
    /// or not. Underpayments are kept for manual reconciliation.
    pub payments: Vec<PaymentObservation>,
    /// Hex of the commitment bound at delivery. Audit trail only — the
    /// authoritative record lives in the ownership registry.
    pub commitment_hex: Option<String>,
    /// Operator-facing failure detail, set when the order moves to `Failed`.
    pub failure_reason: Option<String>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent state change.
    pub updated_at: DateTime<Utc>,
    /// When the order reached `Delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
    /// One-shot flag backing the `secret_issued` notice in status snapshots.
    secret_notice_pending: bool,
}

impl Order {
    /// Creates a new order and immediately opens it for payment.
    ///
    /// The `Created -> AwaitingPayment` hop happens here, before the order
    /// is visible to anyone, so clients only ever observe `AwaitingPayment`
    /// onward.
    pub fn create(
        resource: Resource,
        currency: Currency,
        price: u64,
        deposit_target: DepositTarget,
    ) -> Self {
        let now = Utc::now();
        let tolerance = price.saturating_mul(PAYMENT_TOLERANCE_BPS) / 10_000;
        Self {
            id: Uuid::new_v4(),
            resource,
            currency,
            price,
            min_accepted: price.saturating_sub(tolerance),
            deposit_target,
            status: OrderStatus::AwaitingPayment,
            payments: Vec::new(),
            commitment_hex: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            secret_notice_pending: false,
        }
    }

    /// Records a payment observation from the settlement watcher.
    ///
    /// A single observation meeting the tolerance-adjusted price moves the
    /// order to `PaymentDetected`. Underpayments are recorded and rejected
    /// with [`CoreError::InsufficientPayment`] — the order stays open and
    /// nothing accumulates toward acceptance; there is no top-up path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the order is
    /// `AwaitingPayment`. Terminal orders are the caller's no-op case.
    pub fn observe_payment(&mut self, amount: u64, tx_ref: &str) -> Result<(), CoreError> {
        if self.status != OrderStatus::AwaitingPayment {
            return Err(CoreError::InvalidTransition {
                current: self.status.to_string(),
                expected: "AwaitingPayment".into(),
            });
        }

        let sufficient = amount >= self.min_accepted;
        self.payments.push(PaymentObservation {
            amount,
            tx_ref: tx_ref.to_string(),
            observed_at: Utc::now(),
            sufficient,
        });
        self.updated_at = Utc::now();

        if !sufficient {
            return Err(CoreError::InsufficientPayment {
                expected: self.min_accepted,
                received: amount,
            });
        }

        self.status = OrderStatus::PaymentDetected;
        Ok(())
    }

    /// Marks the detected payment as confirmed by the settlement watcher.
    ///
    /// This transition is the single gate before any secret is minted.
    pub fn confirm_payment(&mut self) -> Result<(), CoreError> {
        if self.status != OrderStatus::PaymentDetected {
            return Err(CoreError::InvalidTransition {
                current: self.status.to_string(),
                expected: "PaymentDetected".into(),
            });
        }
        self.status = OrderStatus::PaymentConfirmed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Enters the fulfillment phase. Only valid from `PaymentConfirmed`,
    /// which is what makes a concurrent double-fulfill impossible: the
    /// second caller finds `Fulfilling` (or `Delivered`) and is rejected.
    pub fn begin_fulfillment(&mut self) -> Result<(), CoreError> {
        if self.status != OrderStatus::PaymentConfirmed {
            return Err(CoreError::InvalidTransition {
                current: self.status.to_string(),
                expected: "PaymentConfirmed".into(),
            });
        }
        self.status = OrderStatus::Fulfilling;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Completes delivery: records the bound commitment and arms the
    /// one-shot secret-issued notice.
    pub fn complete_delivery(&mut self, commitment_hex: String) -> Result<(), CoreError> {
        if self.status != OrderStatus::Fulfilling {
            return Err(CoreError::InvalidTransition {
                current: self.status.to_string(),
                expected: "Fulfilling".into(),
            });
        }
        let now = Utc::now();
        self.status = OrderStatus::Delivered;
        self.commitment_hex = Some(commitment_hex);
        self.delivered_at = Some(now);
        self.updated_at = now;
        self.secret_notice_pending = true;
        Ok(())
    }

    /// Moves a fulfillment-phase order to `Failed` with operator detail.
    ///
    /// Valid from `Fulfilling` only — a failure before payment confirmation
    /// is not a failed order, it is an open one.
    pub fn fail(&mut self, reason: &str) -> Result<(), CoreError> {
        if self.status != OrderStatus::Fulfilling {
            return Err(CoreError::InvalidTransition {
                current: self.status.to_string(),
                expected: "Fulfilling".into(),
            });
        }
        self.status = OrderStatus::Failed;
        self.failure_reason = Some(reason.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Expires an unpaid order. Valid from `AwaitingPayment` only: once a
    /// payment was detected, the expiry clock no longer applies.
    pub fn expire(&mut self) -> Result<(), CoreError> {
        if self.status != OrderStatus::AwaitingPayment {
            return Err(CoreError::InvalidTransition {
                current: self.status.to_string(),
                expected: "AwaitingPayment".into(),
            });
        }
        self.status = OrderStatus::Expired;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether the payment window has elapsed for an unpaid order.
    pub fn is_overdue(&self, window: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::AwaitingPayment
            && now.signed_duration_since(self.created_at).to_std().ok()
                >= Some(window)
    }

    /// The coarse payment status derived from the bookkeeping.
    pub fn payment_status(&self) -> PaymentStatus {
        match self.status {
            OrderStatus::PaymentDetected | OrderStatus::Fulfilling => PaymentStatus::Detected,
            OrderStatus::PaymentConfirmed | OrderStatus::Delivered | OrderStatus::Failed => {
                PaymentStatus::Confirmed
            }
            _ if self.payments.is_empty() => PaymentStatus::None,
            _ => PaymentStatus::Underpaid,
        }
    }

    /// Takes a consistent snapshot and consumes the one-shot secret notice.
    ///
    /// The consume happens under the same per-order lock the caller already
    /// holds, so "first read after delivery" is well-defined even with
    /// concurrent pollers.
    pub fn snapshot(&mut self) -> StatusSnapshot {
        let secret_issued = self.secret_notice_pending;
        self.secret_notice_pending = false;
        StatusSnapshot {
            order_status: self.status,
            payment_status: self.payment_status(),
            delivered_at: self.delivered_at,
            secret_issued,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_order(price: u64) -> Order {
        Order::create(
            Resource::parse("example.com").unwrap(),
            Currency::Xmr,
            price,
            DepositTarget::allocate(),
        )
    }

    #[test]
    fn new_order_awaits_payment() {
        let order = open_order(15_00);
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.payment_status(), PaymentStatus::None);
        assert!(order.min_accepted <= order.price);
    }

    #[test]
    fn exact_payment_detected() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        assert_eq!(order.status, OrderStatus::PaymentDetected);
    }

    #[test]
    fn tolerance_absorbs_exchange_fee_shave() {
        let mut order = open_order(10_000);
        // 50 bps tolerance: 9_950 is acceptable, 9_949 is not.
        order.observe_payment(order.min_accepted, "tx-1").unwrap();
        assert_eq!(order.status, OrderStatus::PaymentDetected);
    }

    #[test]
    fn underpayment_recorded_but_order_stays_open() {
        let mut order = open_order(15_00);
        let err = order.observe_payment(7_50, "tx-half").unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.payments.len(), 1);
        assert!(!order.payments[0].sufficient);
        assert_eq!(order.payment_status(), PaymentStatus::Underpaid);
    }

    #[test]
    fn underpayments_never_accumulate() {
        // No top-up path: two half payments do not make a whole one.
        let mut order = open_order(15_00);
        let _ = order.observe_payment(7_50, "tx-a");
        let _ = order.observe_payment(7_50, "tx-b");
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.payments.len(), 2);
    }

    #[test]
    fn full_lifecycle_to_delivered() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        order.confirm_payment().unwrap();
        order.begin_fulfillment().unwrap();
        order.complete_delivery("aa".repeat(32)).unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.delivered_at.is_some());
        assert!(order.commitment_hex.is_some());
    }

    #[test]
    fn cannot_fulfill_before_confirmation() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        // Detected but not confirmed — the gate holds.
        assert!(matches!(
            order.begin_fulfillment(),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn confirm_requires_detection_first() {
        let mut order = open_order(15_00);
        assert!(order.confirm_payment().is_err());
    }

    #[test]
    fn delivered_is_immutable() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        order.confirm_payment().unwrap();
        order.begin_fulfillment().unwrap();
        order.complete_delivery("bb".repeat(32)).unwrap();

        assert!(order.observe_payment(15_00, "tx-2").is_err());
        assert!(order.confirm_payment().is_err());
        assert!(order.begin_fulfillment().is_err());
        assert!(order.expire().is_err());
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.payments.len(), 1);
    }

    #[test]
    fn expire_only_from_awaiting_payment() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        assert!(order.expire().is_err());

        let mut unpaid = open_order(15_00);
        unpaid.expire().unwrap();
        assert_eq!(unpaid.status, OrderStatus::Expired);
    }

    #[test]
    fn failure_keeps_operator_detail() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        order.confirm_payment().unwrap();
        order.begin_fulfillment().unwrap();
        order.fail("registrar returned 503").unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.failure_reason.as_deref(), Some("registrar returned 503"));
        // Confirmed funds, failed provisioning — payment status stays confirmed.
        assert_eq!(order.payment_status(), PaymentStatus::Confirmed);
    }

    #[test]
    fn secret_notice_fires_exactly_once() {
        let mut order = open_order(15_00);
        order.observe_payment(15_00, "tx-1").unwrap();
        order.confirm_payment().unwrap();
        order.begin_fulfillment().unwrap();
        order.complete_delivery("cc".repeat(32)).unwrap();

        assert!(order.snapshot().secret_issued);
        assert!(!order.snapshot().secret_issued);
        assert!(!order.snapshot().secret_issued);
    }

    #[test]
    fn overdue_detection_respects_status() {
        let order = open_order(15_00);
        let far_future = Utc::now() + chrono::Duration::hours(2);
        assert!(order.is_overdue(std::time::Duration::from_secs(1800), far_future));
        assert!(!order.is_overdue(std::time::Duration::from_secs(1800), Utc::now()));

        let mut paid = open_order(15_00);
        paid.observe_payment(15_00, "tx-1").unwrap();
        assert!(!paid.is_overdue(std::time::Duration::from_secs(1800), far_future));
    }
}
