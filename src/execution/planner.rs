//! Eager-Load Planner
//!
//! Walks the whole operation against the executable schema before any
//! resolver runs and records, per collection of the response tree, the
//! relation paths declared by the selected fields. The resulting
//! [`LoadPlan`] is immutable: the executor only reads it.

use crate::core::relation::{LoadRequirement, RelationPath};
use crate::execution::selection::{Operation, OperationKind, SelectionItem, collect_fields};
use crate::schema::executable::ExecutableSchema;
use indexmap::IndexMap;
use std::fmt;

/// One step from a collection to a child collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionSegment {
    /// Response key of the field producing the child collection
    pub field: String,

    /// Concrete parent type when the parent collection is polymorphic
    pub on: Option<String>,
}

/// Position of a collection in the response tree, ignoring list indexes
///
/// Every record reached through the same fields belongs to the same
/// collection, whatever parent it hangs from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CollectionPath(Vec<CollectionSegment>);

impl CollectionPath {
    /// The collection holding the root value
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, field: impl Into<String>, on: Option<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(CollectionSegment {
            field: field.into(),
            on,
        });
        Self(segments)
    }

    pub fn segments(&self) -> &[CollectionSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|segment| match &segment.on {
                Some(on) => format!("{}<{}>", segment.field, on),
                None => segment.field.clone(),
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Identity of a root collection: its path plus the concrete type of its records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    pub path: CollectionPath,
    pub concrete_type: String,
}

impl CollectionKey {
    pub fn new(path: CollectionPath, concrete_type: impl Into<String>) -> Self {
        Self {
            path,
            concrete_type: concrete_type.into(),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.concrete_type)
    }
}

/// Deduplicated load requirements per collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPlan {
    entries: IndexMap<CollectionKey, IndexMap<RelationPath, LoadRequirement>>,
}

impl LoadPlan {
    /// Record a requirement; a path already required on the collection is kept once
    pub(crate) fn require(&mut self, key: CollectionKey, requirement: LoadRequirement) {
        self.entries
            .entry(key)
            .or_default()
            .entry(requirement.relation.clone())
            .or_insert(requirement);
    }

    /// Requirements of one collection, in first-requested order
    pub fn requirements(&self, key: &CollectionKey) -> Vec<&LoadRequirement> {
        self.entries
            .get(key)
            .map(|requirements| requirements.values().collect())
            .unwrap_or_default()
    }

    /// Number of (collection, path) pairs
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CollectionKey, &LoadRequirement)> {
        self.entries
            .iter()
            .flat_map(|(key, requirements)| requirements.values().map(move |r| (key, r)))
    }
}

pub struct EagerLoadPlanner<'a> {
    schema: &'a ExecutableSchema,
}

impl<'a> EagerLoadPlanner<'a> {
    pub fn new(schema: &'a ExecutableSchema) -> Self {
        Self { schema }
    }

    /// Build the load plan of an operation
    ///
    /// Fields unknown to the schema are skipped here; the executor reports them.
    pub fn plan(&self, operation: &Operation) -> LoadPlan {
        let root_type = match operation.kind {
            OperationKind::Query => Some(self.schema.query_type()),
            OperationKind::Mutation => self.schema.mutation_type(),
        };

        let mut plan = LoadPlan::default();
        if let Some(root_type) = root_type {
            self.walk(&mut plan, &CollectionPath::root(), root_type, &operation.selection);
        }

        tracing::debug!(
            operation = operation.name.as_deref().unwrap_or("<anonymous>"),
            requirements = plan.len(),
            "Planned eager loads"
        );
        plan
    }

    fn walk(
        &self,
        plan: &mut LoadPlan,
        path: &CollectionPath,
        declared_type: &str,
        items: &[SelectionItem],
    ) {
        let polymorphic = self.schema.is_abstract(declared_type);

        for concrete in self.schema.possible_types(declared_type) {
            let key = CollectionKey::new(path.clone(), concrete.as_str());

            for (response_key, selection) in collect_fields(self.schema, items, &concrete) {
                let Some(field) = self.schema.field(&concrete, &selection.name) else {
                    continue;
                };

                for relation in &field.eager_loads {
                    let requirement = LoadRequirement::new(relation.clone(), concrete.as_str());
                    let requirement = if polymorphic {
                        requirement.polymorphic()
                    } else {
                        requirement
                    };
                    tracing::debug!(
                        collection = %key,
                        field = %selection.name,
                        requirement = %requirement,
                        "Collected load requirement"
                    );
                    plan.require(key.clone(), requirement);
                }

                let child_type = field.ty.named();
                if self.schema.is_composite(child_type) {
                    let child = path.child(response_key, polymorphic.then(|| concrete.clone()));
                    self.walk(plan, &child, child_type, &selection.selection);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::execution::selection::parse_operation;
    use crate::schema::SchemaBuilder;
    use serde_json::{Map, json};

    const SDL: &str = r#"
        type Query {
            users: [User!]! @all
            activities: [Activity!]! @all
        }
        type User {
            id: ID!
            tasksLoaded: Boolean @with(relation: "tasks") @method
            tasks: [Task!]! @hasMany
            posts: [Post!]! @hasMany
            commented: Boolean @with(relation: "posts.comments") @method(name: "tasksLoaded")
        }
        type Task { id: ID! title: String images: [Image!]! @hasMany }
        type Post { id: ID! title: String comments: [Comment!]! @hasMany images: [Image!]! @hasMany }
        type Comment { id: ID! }
        type Image { id: ID! url: String }
        type Activity { id: ID! content: Content @morphTo }
        union Content = Post | Task
    "#;

    fn plan(query: &str) -> LoadPlan {
        let schema = SchemaBuilder::new(EngineConfig::default_config())
            .with_method("User", "tasksLoaded", |user, _| Ok(json!(user.relation_loaded("tasks"))))
            .build_sdl(SDL)
            .unwrap();
        let operation = parse_operation(query, None, &Map::new()).unwrap();
        EagerLoadPlanner::new(&schema).plan(&operation)
    }

    fn users() -> CollectionKey {
        CollectionKey::new(CollectionPath::root().child("users", None), "User")
    }

    fn relations(plan: &LoadPlan, key: &CollectionKey) -> Vec<String> {
        plan.requirements(key)
            .iter()
            .map(|r| r.to_string())
            .collect()
    }

    #[test]
    fn test_same_path_from_two_fields_is_required_once() {
        let plan = plan("{ users { tasksLoaded tasks { id } } }");
        assert_eq!(relations(&plan, &users()), vec!["tasks"]);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_nested_path_is_kept_whole() {
        let plan = plan("{ users { commented } }");
        assert_eq!(relations(&plan, &users()), vec!["posts.comments"]);
    }

    #[test]
    fn test_requirements_are_recorded_on_nested_collections() {
        let plan = plan("{ users { posts { comments { id } } } }");
        let posts = CollectionKey::new(users().path.child("posts", None), "Post");

        assert_eq!(relations(&plan, &users()), vec!["posts"]);
        assert_eq!(relations(&plan, &posts), vec!["comments"]);
    }

    #[test]
    fn test_polymorphic_collection_is_grouped_by_concrete_type() {
        let plan = plan(
            "{ activities { content { ... on Post { images { id } } ... on Task { title } } } }",
        );
        let content = CollectionPath::root().child("activities", None).child("content", None);

        let post = CollectionKey::new(content.clone(), "Post");
        let task = CollectionKey::new(content, "Task");
        assert_eq!(relations(&plan, &post), vec!["images on Post"]);
        assert!(relations(&plan, &task).is_empty());
    }

    #[test]
    fn test_unselected_fields_are_not_planned() {
        let plan = plan("{ users { id } }");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_planning_is_idempotent() {
        let query = "{ users { tasksLoaded posts { comments { id } } } }";
        assert_eq!(plan(query), plan(query));
    }
}
