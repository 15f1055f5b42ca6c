//! Integration tests for schema compilation
//!
//! Build errors must abort compilation before any query is served, with a
//! message naming the offending node. Custom directives and scalars are
//! bound by naming convention through the configured namespaces.

mod engine_harness;

use engine_harness::*;
use futures::FutureExt;
use serde_json::{Map, json};
use this_eager::execution::parse_operation;
use this_eager::prelude::*;

fn build(sdl: &str) -> Result<ExecutableSchema, EngineError> {
    schema_builder().build_sdl(sdl)
}

/// Appends `!` to string results
struct ShoutDirective;

impl ShoutDirective {
    fn create(
        _directive: &Directive,
        _context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Ok(Arc::new(Self))
    }
}

impl DirectiveHandler for ShoutDirective {
    fn name(&self) -> &str {
        "shout"
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::FieldMiddleware]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        let value = value.wrap_resolver(|inner| {
            Arc::new(move |ctx: ResolverContext| -> FieldFuture {
                let inner = inner.clone();
                async move {
                    let resolved = inner(ctx).await?;
                    Ok(resolved.map_strings(|s| format!("{}!", s)))
                }
                .boxed()
            })
        });
        next.run(value)
    }
}

struct EmailScalar;

impl ScalarType for EmailScalar {
    fn serialize(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }

    fn parse_value(&self, value: &Value) -> Result<Value> {
        match value.as_str() {
            Some(s) if s.contains('@') => Ok(value.clone()),
            _ => anyhow::bail!("Not an email address: {}", value),
        }
    }
}

async fn first_name(schema: ExecutableSchema) -> Response {
    let store = seeded_store();
    QueryExecutor::new(Arc::new(schema), store)
        .execute(r#"{ user(id: "1") { name } }"#, None)
        .await
}

#[test]
fn test_harness_schema_builds() {
    let schema = build_schema();

    for name in ["Query", "User", "Task", "Post", "Comment", "Image", "Activity", "Content"] {
        assert!(schema.get_type(name).is_some(), "missing type {}", name);
    }
    assert!(schema.is_abstract("Content"));
    assert_eq!(schema.possible_types("Content"), vec!["Post", "Task"]);
    assert_eq!(
        schema.field("User", "commentsLoaded").map(|f| f.eager_loads.len()),
        Some(1)
    );
    assert_eq!(
        schema
            .field("User", "tasksAndComments")
            .map(|f| f.eager_loads.iter().map(|p| p.as_str()).collect::<Vec<_>>()),
        Some(vec!["tasks", "posts.comments"])
    );
}

#[test]
fn test_with_on_root_field_fails_the_build() {
    let sdl = r#"
        type Query { users: [User!]! @all @with(relation: "tasks") }
        type User { id: ID! }
    "#;

    // Deterministic: the same error on every build
    for _ in 0..2 {
        let err = build(sdl).err().unwrap();
        assert_eq!(err.error_code(), "ROOT_FIELD_RELATION");
        assert!(err.is_build_error());
        assert!(err.to_string().contains("'Query.users'"), "{}", err);
    }
}

#[test]
fn test_unknown_directive_names_the_node() {
    let err = build("type Query { a: String @nope }").err().unwrap();

    assert_eq!(err.error_code(), "CLASS_NOT_FOUND");
    assert_eq!(
        err.to_string(),
        "Unable to find class [NopeDirective] assigned to Query.a directive"
    );
}

#[test]
fn test_directive_on_wrong_location() {
    let err = build("type Query { a: String } type User @hasMany { id: ID! }")
        .err()
        .unwrap();

    assert_eq!(err.error_code(), "INVALID_DIRECTIVE_LOCATION");
}

#[test]
fn test_two_resolver_directives_on_one_field() {
    let sdl = r#"
        type Query { users: [User!]! @all }
        type User { id: ID! tasks: [Task!]! @hasMany @rename(attribute: "todo") }
        type Task { id: ID! }
    "#;

    let err = build(sdl).err().unwrap();
    assert_eq!(err.error_code(), "MULTIPLE_RESOLVERS");
    assert_eq!(
        err.to_string(),
        "Field 'User.tasks' can only have one resolver directive, found: @hasMany, @rename"
    );
}

#[test]
fn test_unregistered_method_fails_the_build() {
    let sdl = r#"
        type Query { users: [User!]! @all }
        type User { id: ID! score: Int @method }
    "#;

    let err = build(sdl).err().unwrap();
    assert_eq!(err.error_code(), "METHOD_NOT_FOUND");
}

#[test]
fn test_custom_scalar_resolved_in_namespace() {
    let sdl = "scalar Email type Query { email: Email }";

    let schema = schema_builder()
        .with_scalar_in("app::scalars", "Email", || Arc::new(EmailScalar) as Arc<dyn ScalarType>)
        .build_sdl(sdl)
        .unwrap();
    assert!(schema.get_type("Email").is_some());

    // Bare class names are the fallback
    let schema = schema_builder()
        .with_scalar("Email", || Arc::new(EmailScalar) as Arc<dyn ScalarType>)
        .build_sdl(sdl);
    assert!(schema.is_ok());
}

#[test]
fn test_missing_scalar_class() {
    let err = build("scalar Email type Query { email: Email }").err().unwrap();

    assert_eq!(err.error_code(), "CLASS_NOT_FOUND");
    assert_eq!(err.to_string(), "Unable to find class [Email] assigned to Email scalar");
}

#[tokio::test]
async fn test_custom_directive_resolved_in_namespace() {
    let sdl = r#"
        type Query { user(id: ID!): User @find }
        type User { id: ID! name: String @shout }
    "#;

    let schema = schema_builder()
        .with_directive_in("app::directives", "ShoutDirective", ShoutDirective::create)
        .build_sdl(sdl)
        .unwrap();

    let response = first_name(schema).await;
    assert!(!response.has_errors(), "{:?}", response.errors);
    assert_eq!(response.data(), &json!({ "user": { "name": "Ada!" } }));
}

#[tokio::test]
async fn test_directive_bound_in_config() {
    let mut config = EngineConfig::default_config();
    config
        .directive_bindings
        .insert("loud".to_string(), "ShoutDirective".to_string());

    let sdl = r#"
        type Query { user(id: ID!): User @find }
        type User { id: ID! name: String @loud @upperCase }
    "#;
    let schema = SchemaBuilder::new(config)
        .with_directive("ShoutDirective", ShoutDirective::create)
        .build_sdl(sdl)
        .unwrap();

    let response = first_name(schema).await;
    assert_eq!(response.data(), &json!({ "user": { "name": "ADA!" } }));
}

#[test]
fn test_namespaced_class_shadows_builtin() {
    let sdl = r#"
        type Query { user(id: ID!): User @find }
        type User { id: ID! name: String @upperCase }
    "#;

    let schema = schema_builder()
        .with_directive_in("app::directives", "UpperCaseDirective", ShoutDirective::create)
        .build_sdl(sdl)
        .unwrap();

    let response = tokio_test::block_on(first_name(schema));
    assert_eq!(response.data(), &json!({ "user": { "name": "Ada!" } }));
}

#[test]
fn test_plans_are_identical_across_builds() {
    let query = "{ users { tasksLoaded posts { comments { id } } } activities { content { ... on Post { images { id } } } } }";
    let operation = parse_operation(query, None, &Map::new()).unwrap();

    let first = build_schema();
    let second = build_schema();
    let a = EagerLoadPlanner::new(&first).plan(&operation);
    let b = EagerLoadPlanner::new(&second).plan(&operation);

    assert!(!a.is_empty());
    assert_eq!(a, b);
    assert_eq!(a, EagerLoadPlanner::new(&first).plan(&operation));
}
