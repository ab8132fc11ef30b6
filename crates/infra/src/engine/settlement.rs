//! Refund settlement poller.
//!
//! Fallback completion path for refunds: without a gateway webhook
//! integration, a refund would otherwise sit in `PROCESSING` forever. The
//! sweep promotes every refund whose processing-start clock is older than the
//! configured threshold into the terminal `PROCESSED` state and reconciles
//! the payment status.
//!
//! `sweep_once` is deterministic (the clock is a parameter), so tests drive
//! it directly; the spawned loop feeds it wall-clock time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use tradegate_core::OrderId;
use tradegate_orders::{OrderEvent, OrderEventType};
use tradegate_payments::{PaymentGatewayClient, PaymentStatus};
use tradegate_refunds::RefundStatus;

use crate::engine::EngineResult;
use crate::store::MarketStore;

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Master switch; the sweep does nothing unless explicitly enabled.
    pub enabled: bool,
    /// How often the background loop runs.
    pub poll_interval: Duration,
    /// Minutes a refund must have been in `PROCESSING` before auto-completion.
    pub auto_complete_after_minutes: i64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval: Duration::from_millis(2_000),
            auto_complete_after_minutes: 5,
        }
    }
}

/// Handle to control and join the background sweep task.
#[derive(Debug)]
pub struct SettlementPollerHandle {
    shutdown: tokio::sync::mpsc::Sender<()>,
    join: tokio::task::JoinHandle<()>,
}

impl SettlementPollerHandle {
    /// Request graceful shutdown and wait for the task to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(()).await;
        let _ = self.join.await;
    }
}

#[derive(Clone)]
pub struct SettlementPoller {
    store: Arc<dyn MarketStore>,
    gateway: Arc<dyn PaymentGatewayClient>,
    config: SettlementConfig,
}

impl SettlementPoller {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGatewayClient>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Spawn the periodic sweep on the current runtime.
    pub fn spawn(self) -> SettlementPollerHandle {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
        let poll_interval = self.config.poll_interval;

        let join = tokio::spawn(async move {
            let mut tick = tokio::time::interval(poll_interval);
            info!(interval_ms = poll_interval.as_millis() as u64, "refund settlement poller started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tick.tick() => {
                        if let Err(err) = self.sweep_once(Utc::now()).await {
                            warn!(error = %err, "refund settlement sweep failed");
                        }
                    }
                }
            }
            info!("refund settlement poller stopped");
        });

        SettlementPollerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    /// Run one sweep against the given clock. Returns how many refunds were
    /// settled. A gateway failure for one refund never poisons the others.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> EngineResult<u32> {
        if !self.config.enabled {
            return Ok(0);
        }

        let cutoff = now - chrono::Duration::minutes(self.config.auto_complete_after_minutes);
        let eligible = {
            let mut tx = self.store.begin().await?;
            tx.list_processing_refunds_started_before(cutoff).await?
        };

        let mut settled = 0;
        for refund in eligible {
            match self.settle_one(refund.order_id, now).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(order_id = %refund.order_id, error = %err, "refund settlement failed");
                }
            }
        }
        Ok(settled)
    }

    /// Settle a single refund in its own transaction.
    async fn settle_one(&self, order_id: OrderId, now: DateTime<Utc>) -> EngineResult<bool> {
        let mut tx = self.store.begin().await?;

        // Re-read inside the transaction; the refund may have settled since
        // the sweep listed it.
        let Some(mut refund) = tx.find_refund_by_order(order_id).await? else {
            return Ok(false);
        };
        if refund.status != RefundStatus::Processing {
            return Ok(false);
        }

        if let Some(mut payment) = tx.find_payment_by_order(order_id).await? {
            // Gateway-aware path: initiate the remote refund while we still
            // hold a verified gateway payment id.
            if payment.status == PaymentStatus::RefundPending {
                if let Some(gateway_payment_id) = payment.gateway_payment_id.clone() {
                    match self.gateway.refund_payment(&gateway_payment_id, payment.amount).await {
                        Ok(gateway_refund) => {
                            if refund.refund_reference.is_none() {
                                refund.refund_reference = Some(gateway_refund.id);
                            }
                        }
                        Err(err) => {
                            error!(order_id = %order_id, error = %err, "gateway refund failed");
                            payment.mark_refund_failed()?;
                            tx.update_payment(&payment).await?;
                            tx.commit().await?;
                            // Refund stays PROCESSING; a later sweep finalizes.
                            return Ok(false);
                        }
                    }
                }
            }

            if matches!(payment.status, PaymentStatus::RefundPending | PaymentStatus::Success) {
                payment.mark_refunded()?;
                tx.update_payment(&payment).await?;
            }
        }

        refund.finalize(now)?;
        tx.update_refund(&refund).await?;

        if let Some(order) = tx.find_order(order_id).await? {
            tx.insert_order_event(&OrderEvent::new(
                order_id,
                OrderEventType::RefundProcessed,
                Some(order.status),
                Some(order.status),
                None,
                Some(format!(
                    "Refund auto-completed after {} minutes in PROCESSING",
                    self.config.auto_complete_after_minutes
                )),
                now,
            ))
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
