//! # This-Eager
//!
//! Directive-driven GraphQL schema resolution with batched relation eager loading.
//!
//! ## Features
//!
//! - **Directive Registry**: directive names bound to handler factories by naming convention,
//!   with configurable namespaces and explicit bindings
//! - **Directive Pipelines**: every directive of a node chained in declaration order
//! - **Resolver Generators**: scalars, unions and interfaces bound to registered classes,
//!   object fields resolved through their directives
//! - **Eager Loading**: relation paths declared by `@with`, `@hasMany` and friends are
//!   planned over the whole query and loaded once per collection
//! - **Fail Fast**: unknown directives, classes, methods or misplaced directives abort the
//!   schema build
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use this_eager::prelude::*;
//!
//! let config = EngineConfig::default_config();
//! let store = Arc::new(InMemoryModelStore::new(Arc::new(config.clone())));
//!
//! let schema = SchemaBuilder::new(config)
//!     .with_method("User", "tasksLoaded", |user, _args| {
//!         Ok(json!(user.relation_loaded("tasks")))
//!     })
//!     .build_sdl(r#"
//!         type Query { users: [User!]! @all }
//!         type User {
//!             id: ID!
//!             tasksLoaded: Boolean @with(relation: "tasks") @method
//!         }
//!     "#)?;
//!
//! let executor = QueryExecutor::new(Arc::new(schema), store);
//! let response = executor.execute("{ users { tasksLoaded } }", None).await;
//! ```

pub mod config;
pub mod core;
pub mod directives;
pub mod execution;
pub mod schema;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        directive::{ArgValue, Directive},
        error::{
            Capability, DefinitionError, DirectiveResolutionError, EngineError, ExecutionError,
            LoadError,
        },
        node::{NodeKind, SchemaDocument, TypeRef},
        record::{Record, Relation},
        relation::{LoadRequirement, RelationPath},
        store::{ModelStore, RecordQuery},
    };

    // === Directives ===
    pub use crate::directives::{
        DirectiveContext, DirectiveHandler, DirectiveLocation, DirectiveRole, FieldNext,
        MethodRegistry, NodeNext,
    };

    // === Schema ===
    pub use crate::schema::{
        ExecutableSchema, FieldFuture, FieldResolverFn, FieldValue, FnTypeResolver, NodeValue,
        Resolved, ResolverArgs, ResolverContext, ScalarType, SchemaBuilder, TypeResolver,
    };

    // === Execution ===
    pub use crate::execution::{
        EagerLoadPlanner, GraphQLError, LoadPlan, PathSegment, QueryExecutor, Response,
    };

    // === Storage ===
    pub use crate::storage::InMemoryModelStore;

    // === Config ===
    pub use crate::config::{EngineConfig, ModelConfig, RelationDefinition, RelationKind};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
