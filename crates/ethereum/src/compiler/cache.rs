//! Read-through compile cache

use super::backend::CompilerBackend;
use super::standard_json::{StandardJsonInput, StandardJsonOutput};
use crate::codegen::parser::keccak256;
use async_trait::async_trait;
use reactgen_core::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

struct CacheSlot {
    cell: Arc<OnceCell<StandardJsonOutput>>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    slots: HashMap<String, CacheSlot>,
    clock: u64,
}

impl CacheState {
    /// Make room for one more slot. In-flight compilations are never evicted.
    fn evict_for_insert(&mut self, capacity: usize) {
        while self.slots.len() >= capacity {
            let victim = self
                .slots
                .iter()
                .filter(|(_, slot)| slot.cell.initialized())
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    self.slots.remove(&key);
                    debug!(key = %key, "Evicted compile cache entry");
                }
                None => break,
            }
        }
    }
}

/// Wraps a backend and remembers successful compilations by request hash.
///
/// Concurrent requests for the same key wait on one in-flight compilation.
/// A failed compilation drops its slot so the next caller tries again. At
/// most `capacity` results are kept, evicting the least recently used.
pub struct CachedBackend<B> {
    inner: B,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl<B: CompilerBackend> CachedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: B, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots held, in-flight compilations included
    pub async fn len(&self) -> usize {
        self.state.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.state.lock().await.slots.clear();
    }

    fn cache_key(input: &StandardJsonInput) -> Result<String> {
        let request = serde_json::to_vec(input)?;
        Ok(hex::encode(keccak256(&request)))
    }

    async fn slot(&self, key: &str) -> Arc<OnceCell<StandardJsonOutput>> {
        let mut state = self.state.lock().await;
        state.clock += 1;
        let now = state.clock;

        let existing = state.slots.get_mut(key).map(|slot| {
            slot.last_used = now;
            slot.cell.clone()
        });
        if let Some(cell) = existing {
            return cell;
        }

        state.evict_for_insert(self.capacity);
        let cell = Arc::new(OnceCell::new());
        state.slots.insert(
            key.to_string(),
            CacheSlot {
                cell: cell.clone(),
                last_used: now,
            },
        );
        cell
    }

    async fn discard_failed(&self, key: &str, cell: &Arc<OnceCell<StandardJsonOutput>>) {
        let mut state = self.state.lock().await;
        let stale = state
            .slots
            .get(key)
            .is_some_and(|slot| Arc::ptr_eq(&slot.cell, cell) && !slot.cell.initialized());
        if stale {
            state.slots.remove(key);
        }
    }
}

#[async_trait]
impl<B: CompilerBackend> CompilerBackend for CachedBackend<B> {
    async fn compile(&self, input: &StandardJsonInput) -> Result<StandardJsonOutput> {
        let key = Self::cache_key(input)?;
        let cell = self.slot(&key).await;

        if cell.initialized() {
            debug!(key = %key, "Compile cache hit");
        }

        let result = cell
            .get_or_try_init(|| async {
                debug!(key = %key, "Compile cache miss");
                self.inner.compile(input).await
            })
            .await
            .map(Clone::clone);

        if result.is_err() {
            self.discard_failed(&key, &cell).await;
        }
        result
    }
}
