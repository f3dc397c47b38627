use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::ports::ReadModelRepository;

/// Query for [`InMemoryReadModelStore::search`]: a predicate plus an optional limit.
pub struct ModelFilter<M> {
    predicate: Arc<dyn Fn(&M) -> bool + Send + Sync>,
    limit: Option<usize>,
}

impl<M> ModelFilter<M> {
    pub fn new(predicate: impl Fn(&M) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
            limit: None,
        }
    }

    pub fn all() -> Self {
        Self::new(|_| true)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, model: &M) -> bool {
        (self.predicate)(model)
    }
}

impl<M> Clone for ModelFilter<M> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            limit: self.limit,
        }
    }
}

impl<M> core::fmt::Debug for ModelFilter<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelFilter")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// In-memory read model storage for tests/dev.
///
/// Models are disposable: projections upsert them and `clear` supports rebuilds.
/// Search results come back in key order.
#[derive(Debug)]
pub struct InMemoryReadModelStore<K, M> {
    inner: RwLock<BTreeMap<K, M>>,
}

impl<K, M> InMemoryReadModelStore<K, M> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, M> Default for InMemoryReadModelStore<K, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, M> InMemoryReadModelStore<K, M> {
    pub fn upsert(&self, key: K, model: M) -> Result<(), PersistenceError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| PersistenceError::poisoned("read model"))?;
        map.insert(key, model);
        Ok(())
    }

    pub fn remove(&self, key: &K) -> Result<Option<M>, PersistenceError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| PersistenceError::poisoned("read model"))?;
        Ok(map.remove(key))
    }

    /// Clear every model (rebuild support).
    pub fn clear(&self) -> Result<(), PersistenceError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| PersistenceError::poisoned("read model"))?;
        map.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize, PersistenceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| PersistenceError::poisoned("read model"))?;
        Ok(map.len())
    }

    pub fn is_empty(&self) -> Result<bool, PersistenceError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl<K, M> ReadModelRepository for InMemoryReadModelStore<K, M>
where
    K: Ord + Send + Sync,
    M: Clone + Send + Sync,
{
    type Id = K;
    type Model = M;
    type Query = ModelFilter<M>;

    async fn find_by_id(&self, id: &K) -> Result<Option<M>, PersistenceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| PersistenceError::poisoned("read model"))?;
        Ok(map.get(id).cloned())
    }

    async fn search(&self, query: &ModelFilter<M>) -> Result<Vec<M>, PersistenceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| PersistenceError::poisoned("read model"))?;
        let matching = map.values().filter(|m| query.matches(m)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}
