//! Shared test harness for engine integration tests
//!
//! Provides a seeded `InMemoryModelStore` over the default model
//! configuration, a schema exercising every relation directive, and helpers
//! to build executors. `User.friends`, `User.rivals` and `Image.owner` have
//! no configured relation, so loading them fails.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod engine_harness;
//! use engine_harness::*;
//! ```

#![allow(dead_code)]

use std::sync::{Arc, Once};

use serde_json::json;
use this_eager::prelude::*;

pub const SCHEMA: &str = r#"
type Query {
    users: [User!]! @all
    user(id: ID! @trim): User @find
    posts: [Post!]! @all
    activities: [Activity!]! @all
}

type User {
    id: ID!
    name: String
    tasksLoaded: Boolean @with(relation: "tasks") @method
    commentsLoaded: Boolean @with(relation: "posts.comments") @method
    postImagesLoaded: Boolean @with(relation: "posts.images") @method
    tasksAndComments: Boolean
        @with(relation: "tasks")
        @with(relation: "posts.comments")
        @with(relation: "tasks")
        @method
    tasks: [Task!]! @hasMany
    posts: [Post!]! @hasMany
    friends: [User!] @hasMany
    rivals: [User!]! @hasMany
}

type Task {
    id: ID!
    title: String
    user: User! @belongsTo
    post: Post @hasOne
    images: [Image!]! @hasMany
}

type Post {
    id: ID!
    title: String @upperCase
    user: User! @belongsTo
    comments: [Comment!]! @hasMany
    images: [Image!]! @hasMany
}

type Comment {
    id: ID!
    body: String
}

type Image {
    id: ID!
    url: String
    owner: User @belongsTo
}

type Activity {
    id: ID!
    content: Content @morphTo
}

union Content = Post | Task
"#;

static TRACING: Once = Once::new();

/// Initialise tracing once, honouring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Users 1 and 2, their tasks, posts and comments, images on posts and
/// tasks, and activities pointing at a post or a task
pub fn seeded_store() -> Arc<InMemoryModelStore> {
    let store = InMemoryModelStore::new(Arc::new(EngineConfig::default_config()));

    let records = vec![
        Record::new("User").with("id", 1).with("name", "Ada"),
        Record::new("User").with("id", 2).with("name", "Bob"),
        task(1, 1, "draft plan"),
        task(2, 1, "review"),
        task(3, 1, "ship"),
        task(4, 2, "rest"),
        Record::new("Post")
            .with("id", 10)
            .with("user_id", 1)
            .with("task_id", 1)
            .with("title", "hello"),
        Record::new("Post")
            .with("id", 11)
            .with("user_id", 2)
            .with("title", "world"),
        comment(100, 10, "first"),
        comment(101, 10, "second"),
        comment(102, 11, "third"),
        image(1000, "Post", 10),
        image(1001, "Task", 1),
        image(1002, "Task", 4),
        activity(1, "Post", 10),
        activity(2, "Task", 1),
        activity(3, "Task", 4),
    ];
    for record in records {
        store.insert(record).expect("insert seed record");
    }

    Arc::new(store)
}

fn task(id: i64, user_id: i64, title: &str) -> Record {
    Record::new("Task")
        .with("id", id)
        .with("user_id", user_id)
        .with("title", title)
}

fn comment(id: i64, post_id: i64, body: &str) -> Record {
    Record::new("Comment")
        .with("id", id)
        .with("post_id", post_id)
        .with("body", body)
}

fn image(id: i64, imageable_type: &str, imageable_id: i64) -> Record {
    Record::new("Image")
        .with("id", id)
        .with("imageable_type", imageable_type)
        .with("imageable_id", imageable_id)
        .with("url", format!("/images/{}.png", id))
}

fn activity(id: i64, content_type: &str, content_id: i64) -> Record {
    Record::new("Activity")
        .with("id", id)
        .with("content_type", content_type)
        .with("content_id", content_id)
}

/// Builder with the methods used by `SCHEMA`
pub fn schema_builder() -> SchemaBuilder {
    SchemaBuilder::new(EngineConfig::default_config())
        .with_method("User", "tasksLoaded", |user, _| {
            Ok(json!(user.relation_loaded("tasks")))
        })
        .with_method("User", "commentsLoaded", |user, _| {
            Ok(json!(user.relation_loaded("posts.comments")))
        })
        .with_method("User", "postImagesLoaded", |user, _| {
            Ok(json!(user.relation_loaded("posts.images")))
        })
        .with_method("User", "tasksAndComments", |user, _| {
            Ok(json!(
                user.relation_loaded("tasks") && user.relation_loaded("posts.comments")
            ))
        })
}

pub fn build_schema() -> Arc<ExecutableSchema> {
    Arc::new(schema_builder().build_sdl(SCHEMA).expect("schema builds"))
}

/// Executor over a freshly seeded store
pub fn executor() -> (QueryExecutor, Arc<InMemoryModelStore>) {
    init_tracing();
    let store = seeded_store();
    let executor = QueryExecutor::new(build_schema(), store.clone());
    (executor, store)
}

/// Relations requested from the store, in call order
pub fn load_log(store: &InMemoryModelStore) -> Vec<String> {
    store
        .load_log()
        .expect("read load log")
        .into_iter()
        .map(|call| call.relation)
        .collect()
}
