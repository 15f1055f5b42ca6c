//! Eager-Load Dispatcher
//!
//! Issues the load plan against the store, one batched `load_relation` call
//! per (collection, relation path). Polymorphic collections are split by
//! concrete type first, so each group only receives the relations its type
//! declares. A failed load is recorded against its (collection, relation)
//! and does not stop the other loads of the collection.

use crate::core::error::LoadError;
use crate::core::record::Record;
use crate::core::relation::RelationPath;
use crate::core::store::ModelStore;
use crate::execution::planner::{CollectionKey, CollectionPath, LoadPlan};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type LoadKey = (CollectionKey, RelationPath);

pub struct EagerLoadDispatcher {
    plan: LoadPlan,
    store: Arc<dyn ModelStore>,
    issued: HashSet<LoadKey>,
    failed: HashMap<LoadKey, LoadError>,
}

impl EagerLoadDispatcher {
    pub fn new(plan: LoadPlan, store: Arc<dyn ModelStore>) -> Self {
        Self {
            plan,
            store,
            issued: HashSet::new(),
            failed: HashMap::new(),
        }
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Number of loads issued so far
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// The error of a failed load, if the relation failed for the collection
    pub fn failure(&self, key: &CollectionKey, relation: &RelationPath) -> Option<&LoadError> {
        self.failed.get(&(key.clone(), relation.clone()))
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Load every planned relation of the collection at `path`
    ///
    /// `concrete_types[i]` is the resolved type of `records[i]`. Loaded
    /// relations are attached to the records in place. Requirements already
    /// issued during this execution are not issued again. Returns the number
    /// of store calls made; failures are kept for [`Self::failure`].
    pub async fn dispatch(
        &mut self,
        path: &CollectionPath,
        records: &mut [Record],
        concrete_types: &[String],
    ) -> usize {
        let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (index, concrete) in concrete_types.iter().enumerate().take(records.len()) {
            groups.entry(concrete.as_str()).or_default().push(index);
        }

        let mut calls = 0;
        for (concrete, indexes) in groups {
            let key = CollectionKey::new(path.clone(), concrete);
            let pending: Vec<_> = self
                .plan
                .requirements(&key)
                .into_iter()
                .filter(|r| !self.issued.contains(&(key.clone(), r.relation.clone())))
                .cloned()
                .collect();
            if pending.is_empty() {
                continue;
            }

            let mut group: Vec<Record> = indexes
                .iter()
                .map(|&index| std::mem::take(&mut records[index]))
                .collect();

            for requirement in &pending {
                let load_key = (key.clone(), requirement.relation.clone());
                self.issued.insert(load_key.clone());
                tracing::debug!(
                    collection = %key,
                    relation = %requirement.relation,
                    records = group.len(),
                    "Dispatching eager load"
                );
                calls += 1;

                if let Err(e) = self
                    .store
                    .load_relation(&mut group, &requirement.relation, requirement.discriminator.as_deref())
                    .await
                {
                    tracing::warn!(
                        collection = %key,
                        relation = %requirement.relation,
                        error = %e,
                        "Eager load failed"
                    );
                    self.failed.insert(load_key, e);
                }
            }

            for (index, record) in indexes.into_iter().zip(group) {
                records[index] = record;
            }
        }

        calls
    }
}
