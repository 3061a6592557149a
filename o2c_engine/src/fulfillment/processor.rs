use log::*;

use crate::{
    db_types::{Order, OrderStatusType},
    events::{EventProducers, LowStockEvent, OrderFailedEvent, OrderFulfilledEvent},
    message::{DeadLetter, FailureReason, OrderMessage},
    retry::RetryPolicy,
    traits::{FulfillmentDatabase, StockAdjustment, StoreError},
};

//--------------------------------------     Disposition     ---------------------------------------------------------
/// What the consumer must do with the working delivery once a message has been processed.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// The message is stale (order missing or already terminal). Ack and drop.
    Discard,
    /// The order was handled. Ack.
    Ack,
    /// A recoverable failure. Hand the redelivery envelope to the retry scheduler, then ack.
    Retry(OrderMessage),
    /// A terminal failure. Publish the dead letter, and ack only once that publish has succeeded.
    DeadLetter(DeadLetter),
}

//--------------------------------------  FulfillmentProcessor  ------------------------------------------------------
/// `FulfillmentProcessor` is the primary API for reconciling queued orders against inventory.
///
/// One call to [`FulfillmentProcessor::process`] handles one message envelope, end to end:
/// idempotency guard, stock reservation, status transition, retry/dead-letter classification and
/// event emission. It never touches the broker itself; the returned [`Disposition`] tells the
/// consumer loop what to do. It never panics on a poisoned message; every store failure is
/// folded into the retry path.
pub struct FulfillmentProcessor<B> {
    db: B,
    policy: RetryPolicy,
    producers: EventProducers,
}

impl<B> FulfillmentProcessor<B>
where B: FulfillmentDatabase
{
    pub fn new(db: B, policy: RetryPolicy, producers: EventProducers) -> Self {
        Self { db, policy, producers }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Processes one order message and decides the fate of its delivery.
    pub async fn process(&self, msg: &OrderMessage) -> Disposition {
        let order = match self.db.fetch_order(msg.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!("🔄️📦️ Received a message for order {}, which does not exist. Discarding.", msg.order_id);
                return Disposition::Discard;
            },
            Err(e) => {
                warn!("🔄️📦️ Could not load order {}: {e}", msg.order_id);
                return self.recoverable(msg, None, FailureReason::StoreUnavailable).await;
            },
        };
        // The idempotent re-delivery guard: the broker may deliver the same message any number of
        // times, but a terminal order is never mutated again.
        if order.status.is_terminal() {
            debug!("🔄️📦️ Order {} is already {}. Duplicate delivery discarded.", order.id, order.status);
            return Disposition::Discard;
        }
        if let Err(e) = self.db.update_order_status(order.id, OrderStatusType::Processing).await {
            warn!("🔄️📦️ Could not mark order {} as Processing: {e}", order.id);
            return self.recoverable(msg, Some(&order), FailureReason::StoreUnavailable).await;
        }
        match self.db.adjust_stock(order.product_id, -order.quantity).await {
            Ok(adjustment) => self.fulfilled(msg, &order, adjustment).await,
            Err(StoreError::InsufficientStock { available, .. }) => {
                info!(
                    "🔄️📦️ Order {} needs {} of product {}, but only {available} are left. Awaiting restock.",
                    order.id, order.quantity, order.product_id
                );
                if let Err(e) = self.db.update_order_status(order.id, OrderStatusType::AwaitingRestock).await {
                    warn!("🔄️📦️ Could not mark order {} as AwaitingRestock: {e}", order.id);
                }
                if let Ok(Some(product)) = self.db.fetch_product(order.product_id).await {
                    self.call_low_stock_hook(LowStockEvent::order_unmet(product, order.quantity)).await;
                }
                self.recoverable(msg, Some(&order), FailureReason::InsufficientStock).await
            },
            Err(StoreError::ProductNotFound(product_id)) => {
                // A product that does not exist will not start existing because we waited, so this
                // is terminal on the first attempt rather than burning the whole retry budget.
                error!("🔄️📦️ Order {} references product {product_id}, which does not exist.", order.id);
                let attempts = self.bump_attempts(msg).await;
                self.fail(msg, Some(order), attempts, FailureReason::ProductNotFound).await
            },
            Err(e) => {
                warn!("🔄️📦️ Stock reservation for order {} hit a store error: {e}", order.id);
                self.recoverable(msg, Some(&order), FailureReason::StoreUnavailable).await
            },
        }
    }

    async fn fulfilled(&self, msg: &OrderMessage, order: &Order, adjustment: StockAdjustment) -> Disposition {
        match self.db.update_order_status(order.id, OrderStatusType::Fulfilled).await {
            Ok(updated) => {
                info!(
                    "🔄️📦️ Order {} fulfilled. Product {} has {} remaining.",
                    updated.id,
                    order.product_id,
                    adjustment.new_level()
                );
                self.call_order_fulfilled_hook(OrderFulfilledEvent::new(updated)).await;
                if adjustment.crossed_below_threshold() {
                    warn!(
                        "🔄️📦️ Product {} dropped below its reorder threshold ({} < {}).",
                        order.product_id,
                        adjustment.new_level(),
                        adjustment.product.reorder_threshold
                    );
                    self.call_low_stock_hook(LowStockEvent::threshold_crossed(adjustment.product.clone())).await;
                }
                Disposition::Ack
            },
            Err(e) => {
                // The stock is already reserved but the status write failed. Compensate the
                // decrement before retrying, otherwise the redelivery would reserve stock twice.
                error!("🔄️📦️ Could not mark order {} as Fulfilled: {e}. Returning reserved stock.", order.id);
                if let Err(e2) = self.db.adjust_stock(order.product_id, order.quantity).await {
                    error!(
                        "🔄️📦️ Compensating increment for product {} failed as well: {e2}. Stock may be \
                         under-counted until the store recovers.",
                        order.product_id
                    );
                }
                self.recoverable(msg, Some(order), FailureReason::StoreUnavailable).await
            },
        }
    }

    /// Bumps the persisted attempt counter and reconciles it with the envelope's count. The
    /// envelope is authoritative; a store that lags (or is down) can only under-count, so the
    /// retry budget is enforced on the maximum of the two.
    async fn bump_attempts(&self, msg: &OrderMessage) -> i64 {
        let persisted = match self.db.increment_attempts(msg.order_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!("🔄️📦️ Could not persist the attempt count for order {}: {e}", msg.order_id);
                0
            },
        };
        persisted.max(msg.attempt_count + 1)
    }

    async fn recoverable(&self, msg: &OrderMessage, order: Option<&Order>, reason: FailureReason) -> Disposition {
        let attempts = self.bump_attempts(msg).await;
        if self.policy.is_exhausted(attempts) {
            self.fail(msg, order.cloned(), attempts, reason).await
        } else {
            debug!("🔄️📦️ Order {} will be redelivered (attempt {attempts} of {}).", msg.order_id, self.policy.max_attempts);
            Disposition::Retry(msg.redelivery(attempts))
        }
    }

    async fn fail(
        &self,
        msg: &OrderMessage,
        order: Option<Order>,
        attempts: i64,
        reason: FailureReason,
    ) -> Disposition {
        error!("🔄️📦️ Order {} failed terminally after {attempts} attempts: {reason}", msg.order_id);
        match self.db.update_order_status(msg.order_id, OrderStatusType::Failed).await {
            Ok(updated) => self.call_order_failed_hook(OrderFailedEvent::new(updated, reason)).await,
            Err(e) => {
                warn!("🔄️📦️ Could not mark order {} as Failed: {e}", msg.order_id);
                if let Some(order) = order {
                    self.call_order_failed_hook(OrderFailedEvent::new(order, reason)).await;
                }
            },
        }
        Disposition::DeadLetter(DeadLetter::new(msg.order_id, attempts, reason))
    }

    async fn call_order_fulfilled_hook(&self, event: OrderFulfilledEvent) {
        for emitter in &self.producers.order_fulfilled_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_order_failed_hook(&self, event: OrderFailedEvent) {
        for emitter in &self.producers.order_failed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_low_stock_hook(&self, event: LowStockEvent) {
        for emitter in &self.producers.low_stock_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}
