//! Shared cache tier.
//!
//! Products are stored under `product:{id}` as JSON with a per-key expiry.
//! [`RedisTier`] is the production backend; [`SharedMemoryTier`] stands in for it when
//! no Redis URL is configured and in tests.

use super::local::CacheEntry;
use crate::model::{ProductId, ProductInfo};
use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote cache error: {0}")]
    Backend(String),

    #[error("remote cache held an undecodable value: {0}")]
    Codec(String),
}

#[async_trait]
pub trait RemoteTier: Send + Sync {
    async fn get(&self, id: ProductId) -> Result<Option<ProductInfo>, RemoteError>;

    async fn set(&self, info: &ProductInfo, ttl: Duration) -> Result<(), RemoteError>;
}

pub fn product_key(id: ProductId) -> String {
    format!("product:{}", id.0)
}

/// In-process stand-in for the shared tier. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct SharedMemoryTier {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl SharedMemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemoteTier for SharedMemoryTier {
    async fn get(&self, id: ProductId) -> Result<Option<ProductInfo>, RemoteError> {
        let key = product_key(id);
        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(&key, |_, entry| entry.is_expired());
        Ok(None)
    }

    async fn set(&self, info: &ProductInfo, ttl: Duration) -> Result<(), RemoteError> {
        self.entries
            .insert(product_key(info.id), CacheEntry::new(info.clone(), ttl));
        Ok(())
    }
}

/// Redis-backed shared tier using a multiplexed `ConnectionManager`.
#[derive(Clone)]
pub struct RedisTier {
    conn_manager: ConnectionManager,
}

impl RedisTier {
    pub async fn connect(redis_url: &str) -> Result<Self, RemoteError> {
        let client = Client::open(redis_url)
            .map_err(|e| RemoteError::Backend(format!("Failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| RemoteError::Backend(format!("Failed to connect to Redis: {e}")))?;
        Ok(Self { conn_manager })
    }
}

#[async_trait]
impl RemoteTier for RedisTier {
    async fn get(&self, id: ProductId) -> Result<Option<ProductInfo>, RemoteError> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn
            .get(product_key(id))
            .await
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        raw.map(|json| serde_json::from_str(&json).map_err(|e| RemoteError::Codec(e.to_string())))
            .transpose()
    }

    async fn set(&self, info: &ProductInfo, ttl: Duration) -> Result<(), RemoteError> {
        let mut conn = self.conn_manager.clone();
        let json = serde_json::to_string(info).map_err(|e| RemoteError::Codec(e.to_string()))?;
        let _: () = conn
            .set_ex(product_key(info.id), json, ttl.as_secs().max(1))
            .await
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        Ok(())
    }
}
