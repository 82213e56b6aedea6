use crate::model::{ProductId, ProductInfo};
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// One cached product snapshot and the moment it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: ProductInfo,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(value: ProductInfo, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local tier. Concurrent writers race and the last write wins.
#[derive(Debug)]
pub struct LocalTier {
    entries: DashMap<ProductId, CacheEntry>,
    ttl: Duration,
}

impl LocalTier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Unexpired snapshot for `id`. Expired entries are evicted on the way out.
    pub fn get(&self, id: ProductId) -> Option<ProductInfo> {
        if let Some(entry) = self.entries.get(&id) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(&id, |_, entry| entry.is_expired());
        None
    }

    pub fn insert(&self, info: ProductInfo) {
        self.entries.insert(info.id, CacheEntry::new(info, self.ttl));
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u64) -> ProductInfo {
        ProductInfo {
            id: ProductId(id),
            name: format!("p{id}"),
            price: 100,
            qty: 1,
        }
    }

    #[test]
    fn test_fresh_entry_is_served() {
        let tier = LocalTier::new(Duration::from_secs(30));
        tier.insert(info(1));
        assert_eq!(tier.get(ProductId(1)), Some(info(1)));
        assert_eq!(tier.get(ProductId(2)), None);
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let tier = LocalTier::new(Duration::ZERO);
        tier.insert(info(1));
        assert_eq!(tier.get(ProductId(1)), None);
        assert!(tier.is_empty());
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let tier = LocalTier::new(Duration::ZERO);
        tier.insert(info(1));
        tier.entries
            .insert(ProductId(2), CacheEntry::new(info(2), Duration::from_secs(60)));

        assert_eq!(tier.purge_expired(), 1);
        assert_eq!(tier.len(), 1);
    }
}
