//! Schema compilation: from an SDL document to an executable schema

pub mod builder;
pub mod executable;
pub mod generators;
pub mod pipeline;
pub mod scalars;
pub mod values;

pub use builder::SchemaBuilder;
pub use executable::{
    AbstractType, EnumType, ExecutableArgument, ExecutableField, ExecutableSchema, ExecutableType,
    FieldFuture, FieldResolverFn, FnTypeResolver, InputObjectType, ModelTypeResolver, ObjectType,
    ResolveInfo, Resolved, ResolverArgs, ResolverContext, TypeResolver,
};
pub use generators::TypeGenerator;
pub use pipeline::DirectivePipeline;
pub use scalars::ScalarType;
pub use values::{FieldValue, NodeValue};
