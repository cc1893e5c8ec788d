//! 标识分配器
//!
//! 患者编号与婴儿编号各自维护独立的单调计数器，并发调用不会得到重复值。

use bidan_core::{BidanError, Result};
use std::sync::Arc;
use tracing::{debug, error};

use crate::store::DocumentStore;

/// 计数器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    PatientId,
    BabyNumber,
}

impl Counter {
    /// 计数器在 id_counters 中的名称
    pub fn name(&self) -> &'static str {
        match self {
            Counter::PatientId => "patient_id",
            Counter::BabyNumber => "baby_number",
        }
    }
}

#[derive(Clone)]
pub struct IdentityAllocator {
    store: Arc<dyn DocumentStore>,
}

impl IdentityAllocator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 原子地递增计数器并返回新值，首次调用返回 1
    pub async fn next_id(&self, counter: Counter) -> Result<u64> {
        match self.store.next_sequence(counter.name()).await {
            Ok(value) => {
                debug!("Allocated {} = {}", counter.name(), value);
                Ok(value)
            }
            Err(BidanError::Allocation(msg)) => {
                error!("Failed to allocate {}: {}", counter.name(), msg);
                Err(BidanError::Allocation(msg))
            }
            Err(e) => {
                error!("Failed to allocate {}: {}", counter.name(), e);
                Err(BidanError::Allocation(format!("{}: {}", counter.name(), e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use bidan_core::collections;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_counters_are_independent() {
        let allocator = IdentityAllocator::new(Arc::new(InMemoryStore::new()));

        assert_eq!(allocator.next_id(Counter::PatientId).await.unwrap(), 1);
        assert_eq!(allocator.next_id(Counter::PatientId).await.unwrap(), 2);
        assert_eq!(allocator.next_id(Counter::BabyNumber).await.unwrap(), 1);
        assert_eq!(allocator.next_id(Counter::PatientId).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_allocation_has_no_duplicates() {
        let allocator = IdentityAllocator::new(Arc::new(InMemoryStore::new()));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move { allocator.next_id(Counter::PatientId).await })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap().unwrap();
            assert!(seen.insert(id), "duplicate id {}", id);
        }
        assert_eq!(seen.len(), 100);
        assert_eq!(seen.iter().max(), Some(&100));
    }

    #[tokio::test]
    async fn test_store_failure_becomes_allocation_error() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_writes_to(collections::ID_COUNTERS).await;
        let allocator = IdentityAllocator::new(store);

        let err = allocator.next_id(Counter::BabyNumber).await.unwrap_err();
        assert!(matches!(err, BidanError::Allocation(_)));
    }
}
