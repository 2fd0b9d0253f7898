//! # Order Lifecycle Manager
//!
//! The concurrent front door for everything order-shaped: creation with a
//! per-resource cooldown, payment callbacks from the settlement watcher,
//! the fulfillment pipeline that mints exactly one secret per order, expiry
//! sweeps, and idempotent status polls.
//!
//! ## Concurrency
//!
//! Per-order records in a `DashMap`, each behind its own
//! `tokio::sync::Mutex`. Transitions within one order serialize on that
//! mutex; orders never contend with each other beyond DashMap shard
//! locking. There is no global lock, and `get_status` takes the same
//! per-order mutex briefly so a poll never observes a half-applied
//! transition.
//!
//! The fulfillment path holds the order lock across the provisioning await.
//! That is deliberate: a concurrent `fulfill` or payment callback for the
//! same order must queue behind it, otherwise two callers could race into
//! minting two commitments for one resource.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::commitment::{self, Commitment, Secret};
use crate::config::{CREATE_COOLDOWN, PAYMENT_WINDOW};
use crate::error::CoreError;
use crate::external::{AvailabilityOracle, ResourceProvisioner};
use crate::ownership::OwnershipRegistry;

use super::order::Order;
use super::types::{Currency, DepositTarget, OrderId, OrderStatus, Resource, StatusSnapshot};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable lifecycle parameters. Defaults come from [`crate::config`];
/// tests shrink them to keep the suite fast.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Duplicate-create rejection window per resource.
    pub create_cooldown: Duration,
    /// How long an unpaid order lives before expiring.
    pub payment_window: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            create_cooldown: CREATE_COOLDOWN,
            payment_window: PAYMENT_WINDOW,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// What `fulfill` hands back: the secret, exactly once, in the same
/// response that reports delivery. There is no second chance to read it —
/// not from us, anyway.
#[derive(Debug)]
pub struct DeliveredCredential {
    /// The delivered order.
    pub order_id: OrderId,
    /// The resource now owned by whoever holds the secret.
    pub resource: Resource,
    /// The owner's credential. Handle like the radioactive material it is.
    pub secret: Secret,
    /// The commitment persisted as the ownership record.
    pub commitment: Commitment,
}

/// A payment that arrived for a dead deposit target. Flagged for operators,
/// never matched to the expired order — the funds need a human decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedDeposit {
    /// The dead target the payment landed on.
    pub deposit_target: DepositTarget,
    /// The expired order that originally owned the target.
    pub original_order: OrderId,
    /// Amount observed, in atomic units.
    pub amount: u64,
    /// On-chain transaction reference.
    pub tx_ref: String,
    /// When the watcher reported it.
    pub seen_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Manages every live order. One instance per gateway process.
pub struct OrderLifecycleManager {
    /// Per-order records, each independently lockable.
    orders: DashMap<OrderId, Arc<Mutex<Order>>>,
    /// Last create attempt per canonical resource, for the cooldown guard.
    cooldowns: DashMap<String, Instant>,
    /// Deposit targets of expired orders. A target, once issued, cannot be
    /// un-issued on-chain; this index is what turns a late payment into a
    /// flag instead of a silent loss.
    dead_targets: DashMap<String, OrderId>,
    /// Operator ledger of payments to dead targets.
    unmatched: parking_lot::Mutex<Vec<UnmatchedDeposit>>,
    oracle: Arc<dyn AvailabilityOracle>,
    provisioner: Arc<dyn ResourceProvisioner>,
    registry: Arc<OwnershipRegistry>,
    config: ManagerConfig,
}

impl OrderLifecycleManager {
    /// Creates a manager with default lifecycle parameters.
    pub fn new(
        oracle: Arc<dyn AvailabilityOracle>,
        provisioner: Arc<dyn ResourceProvisioner>,
        registry: Arc<OwnershipRegistry>,
    ) -> Self {
        Self::with_config(oracle, provisioner, registry, ManagerConfig::default())
    }

    /// Creates a manager with custom parameters (shorter windows in tests).
    pub fn with_config(
        oracle: Arc<dyn AvailabilityOracle>,
        provisioner: Arc<dyn ResourceProvisioner>,
        registry: Arc<OwnershipRegistry>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            orders: DashMap::new(),
            cooldowns: DashMap::new(),
            dead_targets: DashMap::new(),
            unmatched: parking_lot::Mutex::new(Vec::new()),
            oracle,
            provisioner,
            registry,
            config,
        }
    }

    /// Creates an order for a resource, allocating a unique deposit target.
    ///
    /// Idempotent under client retry: a second create for the same resource
    /// inside the cooldown window is rejected with
    /// [`CoreError::DuplicateOrderAttempt`] instead of allocating a second
    /// on-chain payment target for the same intent.
    pub async fn create(&self, resource: Resource, currency: Currency) -> Result<Order, CoreError> {
        // Cooldown first — it is the cheap check and the abuse guard.
        // The entry guard makes check-and-arm atomic per resource, and is
        // dropped before the availability await below.
        {
            use dashmap::mapref::entry::Entry;
            let now = Instant::now();
            match self.cooldowns.entry(resource.canonical()) {
                Entry::Occupied(mut slot) => {
                    let elapsed = slot.get().elapsed();
                    if elapsed < self.config.create_cooldown {
                        let remaining = self.config.create_cooldown - elapsed;
                        tracing::warn!(
                            resource = %resource,
                            retry_after_secs = remaining.as_secs(),
                            "duplicate order attempt inside cooldown window"
                        );
                        return Err(CoreError::DuplicateOrderAttempt {
                            retry_after_secs: remaining.as_secs().max(1),
                        });
                    }
                    slot.insert(now);
                }
                Entry::Vacant(slot) => {
                    slot.insert(now);
                }
            }
        }

        let quote = self.oracle.check(&resource).await?;
        if !quote.available {
            return Err(CoreError::ResourceUnavailable);
        }

        let deposit_target = DepositTarget::allocate();
        let order = Order::create(resource, currency, quote.price, deposit_target);

        tracing::info!(
            order_id = %order.id,
            resource = %order.resource,
            currency = %order.currency,
            price = order.price,
            deposit_target = %order.deposit_target,
            "order created, awaiting payment"
        );

        self.orders
            .insert(order.id, Arc::new(Mutex::new(order.clone())));
        Ok(order)
    }

    /// Settlement-watcher callback: a payment landed on the order's
    /// deposit target.
    ///
    /// Sufficient payment moves the order to `PaymentDetected`.
    /// Underpayment is recorded, logged, and rejected with
    /// [`CoreError::InsufficientPayment`]; the order stays open and partial
    /// payments never auto-fulfill. Callbacks for delivered or otherwise
    /// settled orders are ignored and logged, not reprocessed; payments to
    /// an expired order's dead target are flagged as unmatched deposits.
    pub async fn on_payment_observed(
        &self,
        order_id: OrderId,
        amount: u64,
        tx_ref: &str,
    ) -> Result<(), CoreError> {
        let entry = self.lookup(order_id)?;
        let mut order = entry.lock().await;

        match order.status {
            OrderStatus::AwaitingPayment => {
                match order.observe_payment(amount, tx_ref) {
                    Ok(()) => {
                        tracing::info!(
                            order_id = %order_id,
                            amount,
                            tx_ref,
                            "payment detected at or above quoted price"
                        );
                        Ok(())
                    }
                    Err(CoreError::InsufficientPayment { expected, received }) => {
                        tracing::warn!(
                            order_id = %order_id,
                            expected,
                            received,
                            tx_ref,
                            "underpayment observed; order stays open for manual handling"
                        );
                        Err(CoreError::InsufficientPayment { expected, received })
                    }
                    Err(e) => Err(e),
                }
            }
            OrderStatus::Expired => {
                let deposit = UnmatchedDeposit {
                    deposit_target: order.deposit_target.clone(),
                    original_order: order_id,
                    amount,
                    tx_ref: tx_ref.to_string(),
                    seen_at: Utc::now(),
                };
                tracing::warn!(
                    order_id = %order_id,
                    deposit_target = %deposit.deposit_target,
                    amount,
                    tx_ref,
                    "payment to dead deposit target flagged as unmatched"
                );
                self.unmatched.lock().push(deposit);
                Ok(())
            }
            other => {
                // Already detected, confirmed, fulfilling, delivered, or
                // failed — nothing to reprocess.
                tracing::info!(
                    order_id = %order_id,
                    status = %other,
                    amount,
                    tx_ref,
                    "payment observation ignored for settled order"
                );
                Ok(())
            }
        }
    }

    /// Settlement-watcher callback: the detected payment has enough
    /// confirmations. This is the single gate before any secret is minted.
    pub async fn on_payment_confirmed(&self, order_id: OrderId) -> Result<(), CoreError> {
        let entry = self.lookup(order_id)?;
        let mut order = entry.lock().await;

        if order.status.is_terminal() || order.status == OrderStatus::PaymentConfirmed {
            tracing::info!(
                order_id = %order_id,
                status = %order.status,
                "payment confirmation ignored for settled order"
            );
            return Ok(());
        }

        order.confirm_payment()?;
        tracing::info!(order_id = %order_id, "payment confirmed; order eligible for fulfillment");
        Ok(())
    }

    /// Fulfills a payment-confirmed order: provisions the resource, mints
    /// the credential, binds the commitment, and returns the secret — in
    /// this response and never again.
    ///
    /// On provisioning failure the order moves to `Failed` and is flagged
    /// for operator reconciliation. No automatic retry: funds were
    /// received, and a blind retry could mint a second, orphaned commitment
    /// for the same resource.
    pub async fn fulfill(&self, order_id: OrderId) -> Result<DeliveredCredential, CoreError> {
        let entry = self.lookup(order_id)?;
        // Held across the provisioning await on purpose — see module docs.
        let mut order = entry.lock().await;

        order.begin_fulfillment()?;

        if let Err(e) = self.provisioner.provision(&order.resource).await {
            let reason = e.to_string();
            tracing::error!(
                order_id = %order_id,
                resource = %order.resource,
                error = %reason,
                "provisioning failed after confirmed payment; order flagged for reconciliation"
            );
            order.fail(&reason)?;
            return Err(CoreError::ProvisioningFailure { reason });
        }

        // The one place in the lifecycle that mints a credential.
        let (secret, commitment) = commitment::generate();

        if let Err(e) = self.registry.bind(&order.resource, commitment, order_id) {
            // Should be unreachable: availability was checked at create and
            // binding happens once per delivered resource. If it fires, the
            // funds are already ours, so fail loudly and keep the order.
            let reason = format!("ownership binding rejected: {}", e);
            tracing::error!(
                order_id = %order_id,
                resource = %order.resource,
                error = %reason,
                "delivery aborted after provisioning"
            );
            order.fail(&reason)?;
            return Err(CoreError::ProvisioningFailure { reason });
        }

        order.complete_delivery(commitment.to_hex())?;
        tracing::info!(
            order_id = %order_id,
            resource = %order.resource,
            commitment = %commitment,
            "order delivered; secret issued to caller"
        );

        Ok(DeliveredCredential {
            order_id,
            resource: order.resource.clone(),
            secret,
            commitment,
        })
    }

    /// Expires an unpaid order and marks its deposit target dead.
    pub async fn expire(&self, order_id: OrderId) -> Result<(), CoreError> {
        let entry = self.lookup(order_id)?;
        let mut order = entry.lock().await;

        order.expire()?;
        self.dead_targets
            .insert(order.deposit_target.as_str().to_string(), order_id);
        tracing::info!(
            order_id = %order_id,
            deposit_target = %order.deposit_target,
            "order expired; deposit target marked dead"
        );
        Ok(())
    }

    /// Sweeps every order past its payment window into `Expired`.
    /// Called periodically by the gateway's background task. Returns the
    /// number of orders expired in this pass.
    pub async fn expire_overdue(&self) -> usize {
        let now = Utc::now();
        let candidates: Vec<(OrderId, Arc<Mutex<Order>>)> = self
            .orders
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();

        let mut expired = 0;
        for (order_id, entry) in candidates {
            let mut order = entry.lock().await;
            if order.is_overdue(self.config.payment_window, now) && order.expire().is_ok() {
                self.dead_targets
                    .insert(order.deposit_target.as_str().to_string(), order_id);
                tracing::info!(order_id = %order_id, "order expired by sweep");
                expired += 1;
            }
        }
        expired
    }

    /// Returns a consistent status snapshot for an order. Safe to poll
    /// arbitrarily often; the only state it touches is the one-shot
    /// secret-issued notice, consumed on the first read after delivery.
    pub async fn get_status(&self, order_id: OrderId) -> Result<StatusSnapshot, CoreError> {
        let entry = self.lookup(order_id)?;
        let mut order = entry.lock().await;
        Ok(order.snapshot())
    }

    /// Full order detail for the creation response and operator views.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, CoreError> {
        let entry = self.lookup(order_id)?;
        let order = entry.lock().await;
        Ok(order.clone())
    }

    /// Operator view: payments that arrived on dead deposit targets.
    pub fn unmatched_deposits(&self) -> Vec<UnmatchedDeposit> {
        self.unmatched.lock().clone()
    }

    /// Operator view: orders stuck in `Failed` awaiting reconciliation.
    pub async fn failed_orders(&self) -> Vec<Order> {
        let entries: Vec<Arc<Mutex<Order>>> =
            self.orders.iter().map(|e| Arc::clone(e.value())).collect();

        let mut failed = Vec::new();
        for entry in entries {
            let order = entry.lock().await;
            if order.status == OrderStatus::Failed {
                failed.push(order.clone());
            }
        }
        failed
    }

    /// Number of tracked orders, live and terminal.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Whether a deposit target has been marked dead.
    pub fn is_dead_target(&self, target: &DepositTarget) -> bool {
        self.dead_targets.contains_key(target.as_str())
    }

    fn lookup(&self, order_id: OrderId) -> Result<Arc<Mutex<Order>>, CoreError> {
        self.orders
            .get(&order_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(CoreError::UnknownOrder)
    }
}
