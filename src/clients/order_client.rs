use crate::model::{Order, OrderId, OrderStatus, ProductId};
use crate::order_actor::{OrderAction, OrderQuery, StoreError};
use async_trait::async_trait;
use resource_actor::{ActorClient, FrameworkError, ResourceClient};
use tracing::{debug, instrument};

/// Durable keyed storage for orders.
///
/// `insert` is atomic per record and the assigned id is visible once it returns.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<Order, StoreError>;

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders for one product, newest first.
    async fn get_by_product_id(&self, product_id: ProductId) -> Result<Vec<Order>, StoreError>;

    /// Moves an order out of `pending`. Only the reconciliation path calls this.
    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<OrderStatus, StoreError>;
}

/// Client for interacting with the Order actor.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
}

impl OrderClient {
    pub fn new(inner: ResourceClient<Order>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ActorClient<Order> for OrderClient {
    type Error = StoreError;

    fn inner(&self) -> &ResourceClient<Order> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::NotFound(id) => StoreError::NotFound(id),
            FrameworkError::EntityError(inner) => StoreError::Rejected(inner.to_string()),
            disconnected => StoreError::Unavailable(disconnected.to_string()),
        }
    }
}

#[async_trait]
impl OrderStore for OrderClient {
    #[instrument(skip(self, order), fields(product_id = %order.product_id))]
    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        debug!(?order, "insert called");
        let stored = self.inner.create(order).await.map_err(Self::map_error)?;
        if !stored.id.is_assigned() {
            return Err(StoreError::MissingId);
        }
        Ok(stored)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch(id).await
    }

    async fn get_by_product_id(&self, product_id: ProductId) -> Result<Vec<Order>, StoreError> {
        let mut orders = self.find_all(OrderQuery::ByProduct(product_id)).await?;
        orders.reverse();
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderStatus, StoreError> {
        let action = match status {
            OrderStatus::Confirmed => OrderAction::Confirm,
            OrderStatus::Failed => OrderAction::Fail,
            OrderStatus::Pending => {
                return Err(StoreError::Rejected(format!("{id} cannot be moved back to pending")))
            }
        };
        self.inner
            .perform_action(id, action)
            .await
            .map_err(Self::map_error)
    }
}
