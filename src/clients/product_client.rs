use crate::clients::product_lookup::{LookupError, ProductLookup};
use crate::model::{OrderId, Product, ProductCreate, ProductId, ProductInfo};
use crate::product_actor::{ProductAction, ProductActionResult, ProductError};
use async_trait::async_trait;
use resource_actor::{ActorClient, FrameworkError, ResourceClient};
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for interacting with the in-process catalog actor.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl ProductClient {
    pub fn new(inner: ResourceClient<Product>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<Product, ProductError> {
        debug!("Sending request");
        self.inner.create(params).await.map_err(Self::map_error)
    }

    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: ProductId) -> Result<i64, ProductError> {
        debug!("Sending request");
        match self
            .inner
            .perform_action(id, ProductAction::CheckStock)
            .await
            .map_err(Self::map_error)?
        {
            ProductActionResult::CheckStock(qty) => Ok(qty),
            other => Err(ProductError::UnexpectedResult(format!("{other:?}"))),
        }
    }

    /// Reserves `qty` units for `order_id`; returns the remaining stock and whether
    /// the reservation had already been applied earlier.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        id: ProductId,
        order_id: OrderId,
        qty: i64,
    ) -> Result<(i64, bool), ProductError> {
        debug!("Sending request");
        match self
            .inner
            .perform_action(id, ProductAction::Reserve { order_id, qty })
            .await
            .map_err(Self::map_error)?
        {
            ProductActionResult::Reserved {
                remaining,
                already_applied,
            } => Ok((remaining, already_applied)),
            other => Err(ProductError::UnexpectedResult(format!("{other:?}"))),
        }
    }
}

#[async_trait]
impl ActorClient<Product> for ProductClient {
    type Error = ProductError;

    fn inner(&self) -> &ResourceClient<Product> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::NotFound(id) => ProductError::NotFound(id),
            FrameworkError::EntityError(inner) => match inner.downcast::<ProductError>() {
                Ok(product_error) => *product_error,
                Err(other) => ProductError::ActorCommunicationError(other.to_string()),
            },
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}

#[async_trait]
impl ProductLookup for ProductClient {
    async fn fetch(
        &self,
        id: ProductId,
        deadline: Duration,
    ) -> Result<Option<ProductInfo>, LookupError> {
        match tokio::time::timeout(deadline, self.inner.get(id)).await {
            Ok(Ok(product)) => Ok(product.map(|p| p.info())),
            Ok(Err(e)) => Err(LookupError::Transport(e.to_string())),
            Err(_) => Err(LookupError::Timeout(deadline)),
        }
    }
}
