use crate::model::{Order, ProductId};
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Listing {
    orders: Vec<Order>,
    expires_at: Instant,
}

/// Short-lived cache of by-product order listings.
///
/// Entries expire after the TTL, and a write for a product must call
/// [`invalidate`](Self::invalidate) so a client that creates then lists sees its order.
/// Each invalidation bumps the product's generation; a listing read from the store
/// before the bump is refused by [`put`](Self::put), so it cannot resurrect stale data.
#[derive(Debug)]
pub struct OrderListingCache {
    entries: DashMap<ProductId, Listing>,
    generations: DashMap<ProductId, u64>,
    ttl: Duration,
}

impl OrderListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            ttl,
        }
    }

    /// Log-friendly name of the listing for `product_id`.
    pub fn key(product_id: ProductId) -> String {
        format!("orders:product{}", product_id.0)
    }

    pub fn get(&self, product_id: ProductId) -> Option<Vec<Order>> {
        if let Some(listing) = self.entries.get(&product_id) {
            if Instant::now() < listing.expires_at {
                return Some(listing.orders.clone());
            }
        }
        self.entries
            .remove_if(&product_id, |_, listing| Instant::now() >= listing.expires_at);
        None
    }

    /// Current generation; read it before loading the listing from the store.
    pub fn generation(&self, product_id: ProductId) -> u64 {
        self.generations.get(&product_id).map(|g| *g).unwrap_or(0)
    }

    /// Caches `orders` unless the product was invalidated since `generation` was read.
    pub fn put(&self, product_id: ProductId, generation: u64, orders: Vec<Order>) -> bool {
        let current = self.generations.entry(product_id).or_insert(0);
        if *current != generation {
            return false;
        }
        self.entries.insert(
            product_id,
            Listing {
                orders,
                expires_at: Instant::now() + self.ttl,
            },
        );
        true
    }

    pub fn invalidate(&self, product_id: ProductId) {
        let mut generation = self.generations.entry(product_id).or_insert(0);
        *generation += 1;
        self.entries.remove(&product_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderId;

    fn order(id: u64) -> Order {
        let mut order = Order::pending(ProductId(1), 100);
        order.id = OrderId(id);
        order
    }

    #[test]
    fn test_put_get_invalidate() {
        let cache = OrderListingCache::new(Duration::from_secs(10));
        let generation = cache.generation(ProductId(1));
        assert!(cache.put(ProductId(1), generation, vec![order(1)]));
        assert_eq!(cache.get(ProductId(1)), Some(vec![order(1)]));

        cache.invalidate(ProductId(1));
        assert_eq!(cache.get(ProductId(1)), None);
    }

    #[test]
    fn test_listing_read_before_invalidation_is_refused() {
        let cache = OrderListingCache::new(Duration::from_secs(10));
        let generation = cache.generation(ProductId(1));

        cache.invalidate(ProductId(1));

        assert!(!cache.put(ProductId(1), generation, vec![order(1)]));
        assert_eq!(cache.get(ProductId(1)), None);
    }

    #[test]
    fn test_expired_listing_is_absent() {
        let cache = OrderListingCache::new(Duration::ZERO);
        cache.put(ProductId(1), 0, vec![order(1)]);
        assert_eq!(cache.get(ProductId(1)), None);
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(OrderListingCache::key(ProductId(7)), "orders:product7");
    }
}
