//! In-memory implementation of ModelStore for testing and development

use crate::config::{EngineConfig, RelationDefinition, RelationKind};
use crate::core::error::LoadError;
use crate::core::naming::Naming;
use crate::core::record::{Record, Relation, value_key};
use crate::core::relation::RelationPath;
use crate::core::store::{ModelStore, RecordQuery};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One `load_relation` call received by the store
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCall {
    /// Relation path as requested
    pub relation: String,

    /// Polymorphic target type passed by the dispatcher
    pub target_type: Option<String>,

    /// Model of every record in the collection, in order
    pub models: Vec<String>,
}

type Tables = HashMap<String, Vec<Record>>;

/// In-memory model store
///
/// Relations are resolved from the [`EngineConfig`] model definitions. Every
/// hop of a relation path is one batched scan over the related table,
/// whatever the size of the collection. Uses RwLock for thread-safe access.
#[derive(Clone)]
pub struct InMemoryModelStore {
    config: Arc<EngineConfig>,
    tables: Arc<RwLock<Tables>>,
    load_log: Arc<RwLock<Vec<LoadCall>>>,
}

impl InMemoryModelStore {
    /// Create a new in-memory store for the configured models
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            tables: Arc::new(RwLock::new(HashMap::new())),
            load_log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Insert a record into its model table
    pub fn insert(&self, record: Record) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        tables
            .entry(record.model().to_string())
            .or_default()
            .push(record);

        Ok(())
    }

    /// Every relation load received so far
    pub fn load_log(&self) -> Result<Vec<LoadCall>> {
        let log = self
            .load_log
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(log.clone())
    }

    /// Number of loads received for a relation path
    pub fn load_count(&self, relation: &str) -> Result<usize> {
        Ok(self
            .load_log()?
            .iter()
            .filter(|call| call.relation == relation)
            .count())
    }

    pub fn clear_load_log(&self) -> Result<()> {
        let mut log = self
            .load_log
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        log.clear();
        Ok(())
    }

    fn record_call(&self, call: LoadCall) -> Result<(), LoadError> {
        let mut log = self.load_log.write().map_err(|e| LoadError::Store {
            message: format!("Failed to acquire write lock: {}", e),
        })?;
        log.push(call);
        Ok(())
    }

    fn load_segments<'a>(
        &self,
        tables: &Tables,
        records: Vec<&'a mut Record>,
        segments: &[&str],
    ) -> Result<(), LoadError> {
        let Some((name, rest)) = segments.split_first() else {
            return Ok(());
        };

        let mut by_model: IndexMap<String, Vec<&'a mut Record>> = IndexMap::new();
        for record in records {
            by_model
                .entry(record.model().to_string())
                .or_default()
                .push(record);
        }

        let mut children: Vec<&'a mut Record> = Vec::new();
        for (model, group) in by_model {
            let definition =
                self.config
                    .find_relation(&model, name)
                    .ok_or_else(|| LoadError::UnknownRelation {
                        model: model.clone(),
                        relation: name.to_string(),
                    })?;

            // Relations loaded by an earlier path are reused, not reloaded
            let (loaded, mut pending): (Vec<_>, Vec<_>) = group
                .into_iter()
                .partition(|record| record.relation(name).is_some());

            if !pending.is_empty() {
                attach(tables, &model, definition, &mut pending)?;
            }

            if !rest.is_empty() {
                for record in loaded.into_iter().chain(pending) {
                    if let Some(relation) = record.relation_mut(name) {
                        children.extend(relation.records_mut());
                    }
                }
            }
        }

        if children.is_empty() {
            return Ok(());
        }
        self.load_segments(tables, children, rest)
    }
}

fn table<'t>(tables: &'t Tables, model: &str) -> &'t [Record] {
    tables.get(model).map(Vec::as_slice).unwrap_or(&[])
}

fn target_of<'d>(definition: &'d RelationDefinition, model: &str) -> Result<&'d str, LoadError> {
    definition
        .target
        .as_deref()
        .ok_or_else(|| LoadError::Store {
            message: format!(
                "Relation '{}' of model '{}' has no target model",
                definition.name, model
            ),
        })
}

/// Batch-load one relation hop onto records that do not have it yet
fn attach(
    tables: &Tables,
    model: &str,
    definition: &RelationDefinition,
    records: &mut [&mut Record],
) -> Result<(), LoadError> {
    let name = definition.name.as_str();

    match definition.kind {
        RelationKind::HasMany | RelationKind::HasOne => {
            let target = target_of(definition, model)?;
            let foreign_key = definition
                .foreign_key
                .clone()
                .unwrap_or_else(|| format!("{}_id", Naming::camel_to_snake(model)));
            let owner_key = definition.owner_key.as_deref().unwrap_or("id");

            let keys: HashSet<String> = records
                .iter()
                .filter_map(|r| r.attribute_key(owner_key))
                .collect();
            let mut grouped: HashMap<String, Vec<Record>> = HashMap::new();
            for row in table(tables, target) {
                if let Some(key) = row.attribute_key(&foreign_key)
                    && keys.contains(&key)
                {
                    grouped.entry(key).or_default().push(row.clone());
                }
            }

            for record in records.iter_mut() {
                let related = record
                    .attribute_key(owner_key)
                    .and_then(|key| grouped.get(&key).cloned())
                    .unwrap_or_default();
                let relation = if definition.kind == RelationKind::HasMany {
                    Relation::Many(related)
                } else {
                    Relation::One(related.into_iter().next().map(Box::new))
                };
                record.set_relation(name, relation);
            }
        }
        RelationKind::BelongsTo => {
            let target = target_of(definition, model)?;
            let foreign_key = definition
                .foreign_key
                .clone()
                .unwrap_or_else(|| format!("{}_id", Naming::camel_to_snake(name)));
            let owner_key = definition.owner_key.as_deref().unwrap_or("id");

            let keys: HashSet<String> = records
                .iter()
                .filter_map(|r| r.attribute_key(&foreign_key))
                .collect();
            let owners: HashMap<String, &Record> = table(tables, target)
                .iter()
                .filter_map(|row| row.attribute_key(owner_key).map(|key| (key, row)))
                .filter(|(key, _)| keys.contains(key))
                .collect();

            for record in records.iter_mut() {
                let relation = match record.attribute_key(&foreign_key) {
                    None => Relation::One(None),
                    Some(key) => {
                        let owner = owners.get(&key).ok_or_else(|| LoadError::BrokenReference {
                            model: model.to_string(),
                            relation: name.to_string(),
                            key: key.clone(),
                        })?;
                        Relation::One(Some(Box::new((*owner).clone())))
                    }
                };
                record.set_relation(name, relation);
            }
        }
        RelationKind::MorphTo => {
            let type_attribute = format!("{}_type", name);
            let id_attribute = definition
                .foreign_key
                .clone()
                .unwrap_or_else(|| format!("{}_id", name));
            let owner_key = definition.owner_key.as_deref().unwrap_or("id");

            // One scan per concrete target model present in the collection
            let mut wanted: IndexMap<String, HashSet<String>> = IndexMap::new();
            for record in records.iter() {
                if let (Some(morph_type), Some(key)) = (
                    record.attribute_key(&type_attribute),
                    record.attribute_key(&id_attribute),
                ) {
                    wanted.entry(morph_type).or_default().insert(key);
                }
            }
            let mut owners: HashMap<(String, String), &Record> = HashMap::new();
            for (morph_type, keys) in &wanted {
                for row in table(tables, morph_type) {
                    if let Some(key) = row.attribute_key(owner_key)
                        && keys.contains(&key)
                    {
                        owners.insert((morph_type.clone(), key), row);
                    }
                }
            }

            for record in records.iter_mut() {
                let relation = match (
                    record.attribute_key(&type_attribute),
                    record.attribute_key(&id_attribute),
                ) {
                    (Some(morph_type), Some(key)) => {
                        let owner = owners.get(&(morph_type.clone(), key.clone())).ok_or_else(
                            || LoadError::BrokenReference {
                                model: model.to_string(),
                                relation: name.to_string(),
                                key: format!("{}:{}", morph_type, key),
                            },
                        )?;
                        Relation::One(Some(Box::new((*owner).clone())))
                    }
                    _ => Relation::One(None),
                };
                record.set_relation(name, relation);
            }
        }
        RelationKind::MorphMany => {
            let target = target_of(definition, model)?;
            let morph_name = definition.morph_name.as_deref().unwrap_or(name);
            let type_attribute = format!("{}_type", morph_name);
            let id_attribute = definition
                .foreign_key
                .clone()
                .unwrap_or_else(|| format!("{}_id", morph_name));
            let owner_key = definition.owner_key.as_deref().unwrap_or("id");

            let keys: HashSet<String> = records
                .iter()
                .filter_map(|r| r.attribute_key(owner_key))
                .collect();
            let mut grouped: HashMap<String, Vec<Record>> = HashMap::new();
            for row in table(tables, target) {
                if row.attribute_key(&type_attribute).as_deref() == Some(model)
                    && let Some(key) = row.attribute_key(&id_attribute)
                    && keys.contains(&key)
                {
                    grouped.entry(key).or_default().push(row.clone());
                }
            }

            for record in records.iter_mut() {
                let related = record
                    .attribute_key(owner_key)
                    .and_then(|key| grouped.get(&key).cloned())
                    .unwrap_or_default();
                record.set_relation(name, Relation::Many(related));
            }
        }
    }

    Ok(())
}

#[async_trait]
impl ModelStore for InMemoryModelStore {
    async fn fetch(&self, model: &str, query: &RecordQuery) -> Result<Vec<Record>, LoadError> {
        let tables = self.tables.read().map_err(|e| LoadError::Store {
            message: format!("Failed to acquire read lock: {}", e),
        })?;

        let rows = table(&tables, model)
            .iter()
            .filter(|row| {
                query.filters.iter().all(|(attribute, expected)| {
                    row.attribute_key(attribute).is_some_and(|key| Some(key) == value_key(expected))
                })
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(rows)
    }

    async fn load_relation(
        &self,
        collection: &mut [Record],
        relation: &RelationPath,
        target_type: Option<&str>,
    ) -> Result<(), LoadError> {
        self.record_call(LoadCall {
            relation: relation.to_string(),
            target_type: target_type.map(str::to_string),
            models: collection.iter().map(|r| r.model().to_string()).collect(),
        })?;

        let tables = self.tables.read().map_err(|e| LoadError::Store {
            message: format!("Failed to acquire read lock: {}", e),
        })?;

        let records: Vec<&mut Record> = collection.iter_mut().collect();
        self.load_segments(&tables, records, &relation.segments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_store() -> InMemoryModelStore {
        let store = InMemoryModelStore::new(Arc::new(EngineConfig::default_config()));
        store.insert(Record::new("User").with("id", 1).with("name", "Ada")).unwrap();
        store.insert(Record::new("User").with("id", 2).with("name", "Linus")).unwrap();
        for (id, user) in [(1, 1), (2, 1), (3, 2)] {
            store
                .insert(Record::new("Task").with("id", id).with("user_id", user))
                .unwrap();
        }
        store
            .insert(Record::new("Post").with("id", 1).with("user_id", 1).with("task_id", 1))
            .unwrap();
        store
            .insert(Record::new("Comment").with("id", 1).with("post_id", 1))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_with_filters_and_limit() {
        let store = seeded_store();

        let all = store.fetch("Task", &RecordQuery::new()).await.unwrap();
        assert_eq!(all.len(), 3);

        let first = store.fetch("Task", &RecordQuery::new().limit(1)).await.unwrap();
        assert_eq!(first.len(), 1);

        let by_user = store
            .fetch("Task", &RecordQuery::new().filter("user_id", json!("1")))
            .await
            .unwrap();
        assert_eq!(by_user.len(), 2);
    }

    #[tokio::test]
    async fn test_has_many_batched_over_collection() {
        let store = seeded_store();
        let mut users = store.fetch("User", &RecordQuery::new()).await.unwrap();

        store
            .load_relation(&mut users, &RelationPath::parse("tasks").unwrap(), None)
            .await
            .unwrap();

        assert!(users.iter().all(|u| u.relation_loaded("tasks")));
        let counts: Vec<usize> = users
            .iter()
            .map(|u| u.relation("tasks").unwrap().records().len())
            .collect();
        assert_eq!(counts, vec![2, 1]);
        assert_eq!(store.load_count("tasks").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nested_path_is_one_call() {
        let store = seeded_store();
        let mut users = store.fetch("User", &RecordQuery::new()).await.unwrap();

        store
            .load_relation(&mut users, &RelationPath::parse("posts.comments").unwrap(), None)
            .await
            .unwrap();

        assert!(users[0].relation_loaded("posts.comments"));
        assert_eq!(store.load_log().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_prefix_paths_keep_both_branches() {
        let store = seeded_store();
        let mut users = store.fetch("User", &RecordQuery::new()).await.unwrap();

        for path in ["posts.task", "posts.comments"] {
            store
                .load_relation(&mut users, &RelationPath::parse(path).unwrap(), None)
                .await
                .unwrap();
        }

        assert!(users[0].relation_loaded("posts.task"));
        assert!(users[0].relation_loaded("posts.comments"));
        assert_eq!(store.load_log().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_relation_fails() {
        let store = seeded_store();
        let mut users = store.fetch("User", &RecordQuery::new()).await.unwrap();

        let err = store
            .load_relation(&mut users, &RelationPath::parse("friends").unwrap(), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::UnknownRelation {
                model: "User".to_string(),
                relation: "friends".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_broken_belongs_to_reference() {
        let store = seeded_store();
        store
            .insert(Record::new("Comment").with("id", 2).with("post_id", 99))
            .unwrap();
        let mut comments = store.fetch("Comment", &RecordQuery::new()).await.unwrap();

        let err = store
            .load_relation(&mut comments, &RelationPath::parse("post").unwrap(), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "BROKEN_REFERENCE");
    }

    #[tokio::test]
    async fn test_morph_to_and_morph_many() {
        let store = seeded_store();
        store
            .insert(
                Record::new("Activity")
                    .with("id", 1)
                    .with("content_type", "Post")
                    .with("content_id", 1),
            )
            .unwrap();
        store
            .insert(
                Record::new("Activity")
                    .with("id", 2)
                    .with("content_type", "Task")
                    .with("content_id", 3),
            )
            .unwrap();
        store
            .insert(
                Record::new("Image")
                    .with("id", 1)
                    .with("imageable_type", "Task")
                    .with("imageable_id", 3),
            )
            .unwrap();

        let mut activities = store.fetch("Activity", &RecordQuery::new()).await.unwrap();
        store
            .load_relation(&mut activities, &RelationPath::parse("content.images").unwrap(), None)
            .await
            .unwrap();

        let models: Vec<String> = activities
            .iter()
            .map(|a| a.relation("content").unwrap().records()[0].model().to_string())
            .collect();
        assert_eq!(models, vec!["Post", "Task"]);

        let task = activities[1].relation("content").unwrap().records()[0];
        assert_eq!(task.relation("images").unwrap().records().len(), 1);
        let post = activities[0].relation("content").unwrap().records()[0];
        assert!(post.relation("images").unwrap().records().is_empty());
    }
}
