//! Per-key request coalescing.
//!
//! The first caller for a key becomes the leader and runs the load; everyone who arrives
//! while it is in flight subscribes to the leader's channel and receives a clone of the
//! same outcome. The entry is removed before the outcome is sent, so a caller that
//! arrives afterwards starts a fresh load instead of waiting on a finished one.
//!
//! If the leader is dropped mid-load (its caller timed out or was cancelled) the
//! channel closes without a value and one of the waiting followers takes over.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::broadcast;

pub struct Coalescer<K, T> {
    in_flight: DashMap<K, broadcast::Sender<T>>,
}

impl<K, T> Default for Coalescer<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    /// Number of keys with a load currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Runs `load` for `key` unless a load for the same key is already running, in
    /// which case the running load's outcome is returned instead.
    pub async fn run<F, Fut>(&self, key: K, load: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let sender = loop {
            let mut receiver = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(leader) => leader.get().subscribe(),
                Entry::Vacant(slot) => {
                    let (sender, _) = broadcast::channel(1);
                    slot.insert(sender.clone());
                    break sender;
                }
            };
            match receiver.recv().await {
                Ok(outcome) => return outcome,
                // Leader went away without an outcome; race to replace it.
                Err(_) => continue,
            }
        };

        let guard = LeaderGuard {
            in_flight: &self.in_flight,
            key,
            sender: &sender,
        };
        let outcome = load().await;
        drop(guard);
        let _ = sender.send(outcome.clone());
        outcome
    }
}

/// Removes the leader's entry on completion and on cancellation alike.
struct LeaderGuard<'a, K: Eq + Hash, T> {
    in_flight: &'a DashMap<K, broadcast::Sender<T>>,
    key: K,
    sender: &'a broadcast::Sender<T>,
}

impl<K: Eq + Hash, T> Drop for LeaderGuard<'_, K, T> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.key, |_, registered| registered.same_channel(self.sender));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let coalescer = Arc::new(Coalescer::<u64, u64>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = coalescer.clone();
            let loads = loads.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .run(7, || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        42
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_callers_each_load() {
        let coalescer = Coalescer::<u64, u64>::new();
        assert_eq!(coalescer.run(1, || async { 1 }).await, 1);
        assert_eq!(coalescer.run(1, || async { 2 }).await, 2);
    }

    #[tokio::test]
    async fn test_follower_takes_over_from_cancelled_leader() {
        let coalescer = Arc::new(Coalescer::<u64, &'static str>::new());

        let leader = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move {
                coalescer
                    .run(1, || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        "leader"
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coalescer.in_flight(), 1);

        let follower = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move { coalescer.run(1, || async { "follower" }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();

        let outcome = tokio::time::timeout(Duration::from_secs(1), follower)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, "follower");
        assert_eq!(coalescer.in_flight(), 0);
    }
}
