//! Authoritative product lookups against the catalog service.

use crate::model::{ProductId, ProductInfo};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("product lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("product service returned status {0}")]
    Status(u16),

    #[error("product lookup failed: {0}")]
    Transport(String),

    #[error("product service returned an invalid product: {0}")]
    InvalidProduct(String),
}

/// Fetches a product from the catalog. `Ok(None)` means the product does not exist.
///
/// The caller owns the deadline; implementations must give up once it passes.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn fetch(
        &self,
        id: ProductId,
        deadline: Duration,
    ) -> Result<Option<ProductInfo>, LookupError>;
}

/// Catalog lookups over HTTP: `GET {base_url}/products/{id}`.
#[derive(Clone)]
pub struct HttpProductLookup {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProductLookup {
    /// `timeout` bounds every request; a shorter per-call deadline wins.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }
}

#[async_trait]
impl ProductLookup for HttpProductLookup {
    #[instrument(skip(self), fields(product_id = id.0))]
    async fn fetch(
        &self,
        id: ProductId,
        deadline: Duration,
    ) -> Result<Option<ProductInfo>, LookupError> {
        let budget = deadline.min(self.timeout);
        let url = format!("{}/products/{}", self.base_url, id.0);

        let response = self
            .client
            .get(&url)
            .timeout(budget)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Timeout(budget)
                } else {
                    LookupError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("product not found");
            return Ok(None);
        }
        if status != reqwest::StatusCode::OK {
            return Err(LookupError::Status(status.as_u16()));
        }

        let info = response
            .json::<ProductInfo>()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        checked(id, info).map(Some)
    }
}

/// Refuses catalog answers that would poison the cache.
fn checked(id: ProductId, info: ProductInfo) -> Result<ProductInfo, LookupError> {
    if info.id != id {
        return Err(LookupError::InvalidProduct(format!(
            "asked for {id}, got {}",
            info.id
        )));
    }
    if info.qty < 0 {
        return Err(LookupError::InvalidProduct(format!(
            "{id} has negative quantity {}",
            info.qty
        )));
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_catalog_is_a_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let lookup =
            HttpProductLookup::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        let err = lookup.fetch(ProductId(1), Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, LookupError::Transport(_) | LookupError::Timeout(_)));
    }

    #[test]
    fn test_base_url_is_normalised() {
        let lookup =
            HttpProductLookup::new("http://catalog:3000/", Duration::from_millis(500)).unwrap();
        assert_eq!(lookup.base_url, "http://catalog:3000");
    }

    fn info(id: u64, qty: i64) -> ProductInfo {
        ProductInfo {
            id: ProductId(id),
            name: "Widget".into(),
            price: 1000,
            qty,
        }
    }

    #[test]
    fn test_negative_quantity_is_refused() {
        let err = checked(ProductId(1), info(1, -3)).unwrap_err();
        assert!(matches!(err, LookupError::InvalidProduct(_)));
    }

    #[test]
    fn test_mismatched_id_is_refused() {
        let err = checked(ProductId(1), info(2, 5)).unwrap_err();
        assert!(matches!(err, LookupError::InvalidProduct(_)));
    }

    #[test]
    fn test_valid_product_passes() {
        assert_eq!(checked(ProductId(1), info(1, 0)).unwrap(), info(1, 0));
    }
}
