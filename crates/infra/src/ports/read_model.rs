use async_trait::async_trait;

use crate::error::PersistenceError;

/// Query side: read projections built from the event stream.
///
/// `Query` semantics are left to each implementation.
#[async_trait]
pub trait ReadModelRepository: Send + Sync {
    type Id: Send + Sync;
    type Model: Send;
    type Query: Send + Sync;

    async fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Model>, PersistenceError>;

    async fn search(&self, query: &Self::Query) -> Result<Vec<Self::Model>, PersistenceError>;
}
