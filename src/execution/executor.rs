//! Query executor
//!
//! Executes an operation in two phases. Planning walks the whole operation
//! and produces the [`LoadPlan`]; resolution then completes the response
//! one collection at a time. Before the fields of a collection resolve, its
//! planned loads are dispatched over every record of the collection, so
//! resolvers read relations from the records and never go back to the store.

use crate::core::error::{ExecutionError, LoadError};
use crate::core::node::TypeRef;
use crate::core::record::Record;
use crate::core::store::ModelStore;
use crate::execution::dispatcher::EagerLoadDispatcher;
use crate::execution::planner::{CollectionKey, CollectionPath, EagerLoadPlanner};
use crate::execution::response::{GraphQLError, PathSegment, Response, ResponsePath};
use crate::execution::selection::{
    FieldSelection, OperationKind, SelectionItem, collect_fields, parse_operation,
};
use crate::schema::executable::{
    ExecutableField, ExecutableSchema, ResolveInfo, Resolved, ResolverContext,
};
use anyhow::{Result, bail};
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Executes operations against an executable schema and a model store
#[derive(Clone)]
pub struct QueryExecutor {
    schema: Arc<ExecutableSchema>,
    store: Arc<dyn ModelStore>,
}

impl QueryExecutor {
    pub fn new(schema: Arc<ExecutableSchema>, store: Arc<dyn ModelStore>) -> Self {
        Self { schema, store }
    }

    pub fn schema(&self) -> &ExecutableSchema {
        &self.schema
    }

    /// Execute the only operation of a query document
    pub async fn execute(&self, query: &str, variables: Option<&Value>) -> Response {
        self.execute_operation(query, None, variables).await
    }

    /// Execute the named operation of a query document
    pub async fn execute_operation(
        &self,
        query: &str,
        operation_name: Option<&str>,
        variables: Option<&Value>,
    ) -> Response {
        let no_variables = Map::new();
        let variables = match variables {
            Some(Value::Object(variables)) => variables,
            _ => &no_variables,
        };

        let operation = match parse_operation(query, operation_name, variables) {
            Ok(operation) => operation,
            Err(e) => return Response::from_error(e),
        };

        let root_type = match operation.kind {
            OperationKind::Query => self.schema.query_type().to_string(),
            OperationKind::Mutation => match self.schema.mutation_type() {
                Some(mutation) => mutation.to_string(),
                None => {
                    return Response::from_error(ExecutionError::UnsupportedOperation {
                        kind: "Mutation".to_string(),
                    });
                }
            },
        };

        let plan = EagerLoadPlanner::new(&self.schema).plan(&operation);
        let mut execution = Execution {
            schema: self.schema.clone(),
            store: self.store.clone(),
            dispatcher: EagerLoadDispatcher::new(plan, self.store.clone()),
            errors: Vec::new(),
        };

        let root = CollectionPath::root();
        let parents = vec![Parent {
            record: None,
            concrete_type: root_type.clone(),
            path: Vec::new(),
        }];
        let data = execution
            .resolve_objects(&root, &root_type, &operation.selection, parents)
            .await
            .pop()
            .unwrap_or(Value::Null);

        tracing::debug!(
            loads = execution.dispatcher.issued(),
            errors = execution.errors.len(),
            "Executed operation"
        );
        Response::new(data, execution.errors)
    }
}

/// One object being resolved: the root value or a record
struct Parent {
    record: Option<Arc<Record>>,
    concrete_type: String,
    path: ResponsePath,
}

/// A record waiting in a child collection
struct Entry {
    record: Record,
    path: ResponsePath,
}

/// Records produced by one field across every parent of a collection
struct ChildCollection {
    declared_type: String,
    selection: Vec<SelectionItem>,
    entries: Vec<Entry>,
}

/// Where the value of a parent field comes from
enum Slot {
    Value(Value),
    One(usize, usize),
    Many(usize, Vec<usize>),
}

/// One selected field of a parent object
///
/// `errored` is set once an error was reported for the field, so a null it
/// completes to is not reported again as a non-null violation.
struct Cell {
    key: String,
    field: String,
    ty: Option<TypeRef>,
    slot: Slot,
    errored: bool,
}

impl Cell {
    fn new(key: String, field: Option<&ExecutableField>) -> Self {
        Self {
            key,
            field: field.map(|f| f.name.clone()).unwrap_or_default(),
            ty: field.map(|f| f.ty.clone()),
            slot: Slot::Value(Value::Null),
            errored: false,
        }
    }

    fn with(mut self, slot: Slot) -> Self {
        self.slot = slot;
        self
    }

    fn failed(mut self) -> Self {
        self.errored = true;
        self
    }
}

enum Produced {
    One(Option<Record>),
    Many(Vec<Record>),
}

/// State of one execution
struct Execution {
    schema: Arc<ExecutableSchema>,
    store: Arc<dyn ModelStore>,
    dispatcher: EagerLoadDispatcher,
    errors: Vec<GraphQLError>,
}

impl Execution {
    /// Resolve the selection on every parent of a collection
    ///
    /// Returns one value per parent, in order: the object, or null when a
    /// non-null field of it completed to null. Child records are gathered
    /// per child collection across all parents, then completed together.
    fn resolve_objects<'a>(
        &'a mut self,
        path: &'a CollectionPath,
        declared_type: &'a str,
        selection: &'a [SelectionItem],
        parents: Vec<Parent>,
    ) -> BoxFuture<'a, Vec<Value>> {
        async move {
            let schema = self.schema.clone();
            let polymorphic = schema.is_abstract(declared_type);
            let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(parents.len());
            let mut children: IndexMap<CollectionPath, ChildCollection> = IndexMap::new();

            for parent in &parents {
                let fields = collect_fields(&schema, selection, &parent.concrete_type);
                let mut row = Vec::with_capacity(fields.len());

                for (key, selection) in fields {
                    let field_path = field_path(&parent.path, &key);

                    if selection.name == "__typename" {
                        let typename = Value::String(parent.concrete_type.clone());
                        row.push(Cell::new(key, None).with(Slot::Value(typename)));
                        continue;
                    }

                    let Some(field) = schema.field(&parent.concrete_type, &selection.name) else {
                        self.errors.push(
                            GraphQLError::from(ExecutionError::UnknownField {
                                type_name: parent.concrete_type.clone(),
                                field: selection.name.clone(),
                            })
                            .with_path(field_path),
                        );
                        row.push(Cell::new(key, None).failed());
                        continue;
                    };
                    let cell = Cell::new(key, Some(field));

                    if let Some(error) = self.failed_load(path, parent, field) {
                        self.load_failed(error, field_path);
                        row.push(cell.failed());
                        continue;
                    }

                    let resolved = match self.call_resolver(field, parent, &selection).await {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            self.errors
                                .push(GraphQLError::from_resolver_error(&e).with_path(field_path));
                            row.push(cell.failed());
                            continue;
                        }
                    };

                    let child_type = field.ty.named();
                    if !schema.is_composite(child_type) {
                        let value = match resolved {
                            Resolved::Value(value) => value,
                            Resolved::Record(record) => {
                                record.map(|r| r.to_json()).unwrap_or(Value::Null)
                            }
                            Resolved::Records(records) => {
                                Value::Array(records.iter().map(Record::to_json).collect())
                            }
                        };
                        match schema.serialize_leaf(&field.ty, value) {
                            Ok(value) => row.push(cell.with(Slot::Value(value))),
                            Err(e) => {
                                self.errors.push(
                                    GraphQLError::from_resolver_error(&e).with_path(field_path),
                                );
                                row.push(cell.failed());
                            }
                        }
                        continue;
                    }

                    let produced = match produced_records(resolved, child_type, field.ty.is_list()) {
                        Ok(produced) => produced,
                        Err(e) => {
                            self.errors
                                .push(GraphQLError::from_resolver_error(&e).with_path(field_path));
                            row.push(cell.failed());
                            continue;
                        }
                    };

                    let child_path = path.child(
                        cell.key.clone(),
                        polymorphic.then(|| parent.concrete_type.clone()),
                    );
                    let entry = children.entry(child_path);
                    let index = entry.index();
                    let collection = entry.or_insert_with(|| ChildCollection {
                        declared_type: child_type.to_string(),
                        selection: selection.selection.clone(),
                        entries: Vec::new(),
                    });

                    // Child objects only complete to null after reporting an error
                    let cell = match produced {
                        Produced::One(None) => cell,
                        Produced::One(Some(record)) => {
                            collection.entries.push(Entry {
                                record,
                                path: field_path,
                            });
                            cell.with(Slot::One(index, collection.entries.len() - 1)).failed()
                        }
                        Produced::Many(records) => {
                            let mut positions = Vec::with_capacity(records.len());
                            for (i, record) in records.into_iter().enumerate() {
                                let mut path = field_path.clone();
                                path.push(PathSegment::Index(i));
                                collection.entries.push(Entry { record, path });
                                positions.push(collection.entries.len() - 1);
                            }
                            cell.with(Slot::Many(index, positions)).failed()
                        }
                    };
                    row.push(cell);
                }

                rows.push(row);
            }

            let mut completed = Vec::with_capacity(children.len());
            for (child_path, collection) in children {
                completed.push(self.complete_collection(&child_path, collection).await);
            }

            let mut output = Vec::with_capacity(rows.len());
            for (row, parent) in rows.into_iter().zip(&parents) {
                let mut object = Map::new();
                let mut nulled = false;
                for cell in row {
                    let value = match cell.slot {
                        Slot::Value(value) => value,
                        Slot::One(collection, position) => {
                            std::mem::take(&mut completed[collection][position])
                        }
                        Slot::Many(collection, positions) => Value::Array(
                            positions
                                .into_iter()
                                .map(|position| std::mem::take(&mut completed[collection][position]))
                                .collect(),
                        ),
                    };

                    let Some(ty) = &cell.ty else {
                        object.insert(cell.key, value);
                        continue;
                    };
                    let (value, violated) = enforce_non_null(ty, value);
                    if violated && !cell.errored {
                        self.errors.push(
                            GraphQLError::from(ExecutionError::NonNullField {
                                type_name: parent.concrete_type.clone(),
                                field: cell.field.clone(),
                            })
                            .with_path(field_path(&parent.path, &cell.key)),
                        );
                    }
                    nulled |= value.is_null() && ty.is_non_null();
                    object.insert(cell.key, value);
                }
                output.push(if nulled { Value::Null } else { Value::Object(object) });
            }

            output
        }
        .boxed()
    }

    /// Dispatch the planned loads of a child collection, then resolve its records
    ///
    /// Returns one value per entry; entries whose concrete type can not be
    /// resolved are null.
    async fn complete_collection(
        &mut self,
        path: &CollectionPath,
        collection: ChildCollection,
    ) -> Vec<Value> {
        let ChildCollection {
            declared_type,
            selection,
            entries,
        } = collection;

        let mut values = vec![Value::Null; entries.len()];
        let mut records = Vec::with_capacity(entries.len());
        let mut types = Vec::with_capacity(entries.len());
        let mut paths = Vec::with_capacity(entries.len());
        let mut positions = Vec::with_capacity(entries.len());

        for (position, entry) in entries.into_iter().enumerate() {
            match self.schema.concrete_type(&declared_type, &entry.record) {
                Some(concrete) => {
                    records.push(entry.record);
                    types.push(concrete);
                    paths.push(entry.path);
                    positions.push(position);
                }
                None => self.errors.push(
                    GraphQLError::from(ExecutionError::UnresolvedType {
                        abstract_type: declared_type.clone(),
                        model: entry.record.model().to_string(),
                    })
                    .with_path(entry.path),
                ),
            }
        }

        self.dispatcher.dispatch(path, &mut records, &types).await;

        let parents = records
            .into_iter()
            .zip(types)
            .zip(paths)
            .map(|((record, concrete_type), path)| Parent {
                record: Some(Arc::new(record)),
                concrete_type,
                path,
            })
            .collect();
        let resolved = self
            .resolve_objects(path, &declared_type, &selection, parents)
            .await;

        for (position, value) in positions.into_iter().zip(resolved) {
            values[position] = value;
        }
        values
    }

    /// The first failed load among the relations a field eager loads
    fn failed_load(
        &self,
        path: &CollectionPath,
        parent: &Parent,
        field: &ExecutableField,
    ) -> Option<LoadError> {
        if field.eager_loads.is_empty() || !self.dispatcher.has_failures() {
            return None;
        }
        let key = CollectionKey::new(path.clone(), parent.concrete_type.clone());
        field
            .eager_loads
            .iter()
            .find_map(|relation| self.dispatcher.failure(&key, relation))
            .cloned()
    }

    async fn call_resolver(
        &self,
        field: &ExecutableField,
        parent: &Parent,
        selection: &FieldSelection,
    ) -> Result<Resolved> {
        let args = self.schema.coerce_arguments(field, &selection.arguments)?;
        let context = ResolverContext {
            parent: parent.record.clone(),
            args,
            info: Arc::new(ResolveInfo {
                field_name: field.name.clone(),
                parent_type: parent.concrete_type.clone(),
                return_type: field.ty.clone(),
            }),
            store: self.store.clone(),
        };
        (field.resolver)(context).await
    }

    fn load_failed(&mut self, error: LoadError, path: ResponsePath) {
        self.errors.push(GraphQLError::from(&error).with_path(path));
    }
}

fn field_path(parent: &ResponsePath, key: &str) -> ResponsePath {
    let mut path = parent.clone();
    path.push(PathSegment::Field(key.to_string()));
    path
}

/// Apply the non-null wrappers of `ty` to a completed value
///
/// A null in a non-null list item nulls the list. Returns the value and
/// whether any non-null position in it was null.
fn enforce_non_null(ty: &TypeRef, value: Value) -> (Value, bool) {
    match ty {
        TypeRef::Named(_) => (value, false),
        TypeRef::NonNull(inner) => {
            let (value, violated) = enforce_non_null(inner, value);
            let violated = violated || value.is_null();
            (value, violated)
        }
        TypeRef::List(item) => match value {
            Value::Array(items) => {
                let mut violated = false;
                let mut completed = Vec::with_capacity(items.len());
                for value in items {
                    let (value, item_violated) = enforce_non_null(item, value);
                    if item_violated && item.is_non_null() && value.is_null() {
                        return (Value::Null, true);
                    }
                    violated |= item_violated;
                    completed.push(value);
                }
                (Value::Array(completed), violated)
            }
            value => (value, false),
        },
    }
}

/// Records a composite field resolved to
///
/// JSON objects become records of the declared type, or of the type named
/// by their `__typename`.
fn produced_records(resolved: Resolved, declared_type: &str, list: bool) -> Result<Produced> {
    let from_json = |value: Value| {
        let model = value
            .get("__typename")
            .and_then(Value::as_str)
            .unwrap_or(declared_type)
            .to_string();
        Record::from_json(model, value)
    };

    let produced = match resolved {
        Resolved::Record(record) => Produced::One(record),
        Resolved::Records(records) => Produced::Many(records),
        Resolved::Value(Value::Null) => Produced::One(None),
        Resolved::Value(Value::Array(items)) => Produced::Many(
            items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(from_json)
                .collect(),
        ),
        Resolved::Value(value @ Value::Object(_)) => Produced::One(Some(from_json(value))),
        Resolved::Value(other) => {
            bail!("Expected an object of type '{}', got {}", declared_type, other)
        }
    };

    match (produced, list) {
        (Produced::One(Some(record)), true) => Ok(Produced::Many(vec![record])),
        (Produced::Many(_), false) => {
            bail!("Expected a single '{}' but the resolver returned a list", declared_type)
        }
        (produced, _) => Ok(produced),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::schema::SchemaBuilder;
    use crate::storage::InMemoryModelStore;
    use serde_json::json;

    fn executor(sdl: &str) -> (QueryExecutor, Arc<InMemoryModelStore>) {
        let config = Arc::new(EngineConfig::default_config());
        let store = Arc::new(InMemoryModelStore::new(config.clone()));
        store.insert(Record::new("User").with("id", 1).with("name", "ada")).unwrap();
        store.insert(Record::new("User").with("id", 2).with("name", "bob")).unwrap();
        for (id, user_id) in [(1, 1), (2, 1), (3, 2)] {
            store
                .insert(
                    Record::new("Task")
                        .with("id", id)
                        .with("user_id", user_id)
                        .with("title", format!("task {}", id)),
                )
                .unwrap();
        }

        let schema = SchemaBuilder::new((*config).clone())
            .with_method("User", "tasksLoaded", |user, _| {
                Ok(json!(user.relation_loaded("tasks")))
            })
            .with_method("User", "aliases", |user, _| {
                Ok(json!([user.attribute("name"), null]))
            })
            .build_sdl(sdl)
            .unwrap();
        (QueryExecutor::new(Arc::new(schema), store.clone()), store)
    }

    const SDL: &str = r#"
        type Query {
            users: [User!]! @all
            user(id: ID!): User @find
        }
        type User {
            id: ID!
            name: String @upperCase
            tasksLoaded: Boolean @with(relation: "tasks") @method
            tasks: [Task!]! @hasMany
            nickname: String!
            aliases: [String!] @method
        }
        type Task { id: ID! title: String }
    "#;

    #[tokio::test]
    async fn test_relations_load_once_per_collection() {
        let (executor, store) = executor(SDL);
        let response = executor
            .execute("{ users { name tasksLoaded tasks { title } } }", None)
            .await;

        assert!(!response.has_errors(), "{:?}", response.errors);
        assert_eq!(
            response.data(),
            &json!({
                "users": [
                    { "name": "ADA", "tasksLoaded": true, "tasks": [{ "title": "task 1" }, { "title": "task 2" }] },
                    { "name": "BOB", "tasksLoaded": true, "tasks": [{ "title": "task 3" }] }
                ]
            })
        );
        assert_eq!(store.load_count("tasks").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_arguments_aliases_and_typename() {
        let (executor, _) = executor(SDL);
        let response = executor
            .execute(
                r#"query($id: ID!) { who: user(id: $id) { __typename id } }"#,
                Some(&json!({ "id": 2 })),
            )
            .await;

        assert!(!response.has_errors(), "{:?}", response.errors);
        assert_eq!(
            response.data(),
            &json!({ "who": { "__typename": "User", "id": "2" } })
        );
    }

    #[tokio::test]
    async fn test_unknown_field_is_reported_with_path() {
        let (executor, _) = executor(SDL);
        let response = executor.execute("{ users { nope } }", None).await;

        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[0].code(), Some("UNKNOWN_FIELD"));
        assert_eq!(
            response.errors[0].path,
            vec![PathSegment::from("users"), 0.into(), "nope".into()]
        );
    }

    #[tokio::test]
    async fn test_parse_error_has_no_data() {
        let (executor, _) = executor(SDL);
        let response = executor.execute("{ users ", None).await;
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].code(), Some("GRAPHQL_PARSE_FAILED"));
    }

    #[tokio::test]
    async fn test_null_non_null_leaf_nulls_the_parent() {
        let (executor, _) = executor(SDL);
        let response = executor
            .execute(r#"{ user(id: "1") { id nickname } users { id } }"#, None)
            .await;

        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].code(), Some("NON_NULL_VIOLATION"));
        assert_eq!(
            response.errors[0].message,
            "Cannot return null for non-nullable field 'User.nickname'"
        );
        assert_eq!(
            response.errors[0].path,
            vec![PathSegment::from("user"), "nickname".into()]
        );
        assert_eq!(
            response.data(),
            &json!({ "user": null, "users": [{ "id": "1" }, { "id": "2" }] })
        );
    }

    #[tokio::test]
    async fn test_null_item_nulls_a_nullable_list() {
        let (executor, _) = executor(SDL);
        let response = executor
            .execute(r#"{ user(id: "2") { name aliases } }"#, None)
            .await;

        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].code(), Some("NON_NULL_VIOLATION"));
        assert_eq!(
            response.errors[0].path,
            vec![PathSegment::from("user"), "aliases".into()]
        );
        assert_eq!(
            response.data(),
            &json!({ "user": { "name": "BOB", "aliases": null } })
        );
    }

    #[test]
    fn test_enforce_non_null() {
        let named = || TypeRef::Named("String".to_string());
        let non_null = |ty| TypeRef::NonNull(Box::new(ty));
        let list = |ty| TypeRef::List(Box::new(ty));

        assert_eq!(enforce_non_null(&named(), Value::Null), (Value::Null, false));
        assert_eq!(enforce_non_null(&non_null(named()), Value::Null), (Value::Null, true));
        assert_eq!(
            enforce_non_null(&list(named()), json!(["a", null])),
            (json!(["a", null]), false)
        );
        assert_eq!(
            enforce_non_null(&list(non_null(named())), json!(["a", null])),
            (Value::Null, true)
        );
        assert_eq!(
            enforce_non_null(&list(list(non_null(named()))), json!([["a"], [null]])),
            (json!([["a"], null]), true)
        );
        assert_eq!(
            enforce_non_null(&non_null(list(non_null(named()))), json!([])),
            (json!([]), false)
        );
    }

    #[test]
    fn test_produced_records_wraps_single_record_for_lists() {
        let produced = produced_records(
            Resolved::Value(json!({ "__typename": "Task", "id": 1 })),
            "Content",
            true,
        )
        .unwrap();

        let Produced::Many(records) = produced else {
            panic!("expected a list");
        };
        assert_eq!(records[0].model(), "Task");

        assert!(produced_records(Resolved::Records(Vec::new()), "Task", false).is_err());
        assert!(produced_records(Resolved::Value(json!(3)), "Task", false).is_err());
    }
}
