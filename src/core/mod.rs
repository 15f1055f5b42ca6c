//! Core module containing the schema, record and store types of the engine

pub mod directive;
pub mod error;
pub mod naming;
pub mod node;
pub mod record;
pub mod relation;
pub mod store;

pub use directive::{ArgValue, ArgumentError, Directive};
pub use error::{
    Capability, DefinitionError, DirectiveResolutionError, EngineError, ExecutionError, LoadError,
};
pub use naming::Naming;
pub use node::{
    ArgumentNode, EnumValueNode, FieldNode, NodeKind, SchemaDocument, TypeNode, TypeRef,
};
pub use record::{Record, Relation};
pub use relation::{LoadRequirement, RelationPath};
pub use store::{ModelStore, RecordQuery};
