//! Data store collaborator
//!
//! The engine never builds store queries itself. It asks a [`ModelStore`]
//! for root records and for batched relation loads over whole collections.

use crate::core::error::LoadError;
use crate::core::record::Record;
use crate::core::relation::RelationPath;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

/// Criteria for fetching root records of a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    /// Attribute equality constraints
    pub filters: IndexMap<String, Value>,

    /// Maximum number of records to return
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, attribute: impl Into<String>, value: Value) -> Self {
        self.filters.insert(attribute.into(), value);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Store trait for fetching records and eager loading their relations
///
/// Implementations are agnostic to GraphQL: they receive model names and
/// relation paths only.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Fetch records of a model
    async fn fetch(&self, model: &str, query: &RecordQuery) -> Result<Vec<Record>, LoadError>;

    /// Eager load a (possibly dotted) relation path onto every record of the collection
    ///
    /// The collection is mutated in place. One call must cover the whole
    /// collection and the full path. `target_type` is set when the
    /// collection is one concrete group of a polymorphic collection.
    async fn load_relation(
        &self,
        collection: &mut [Record],
        relation: &RelationPath,
        target_type: Option<&str>,
    ) -> Result<(), LoadError>;
}
