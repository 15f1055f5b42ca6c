//! Directive registry, handler seam and built-in directives

pub mod builtin;
pub mod handler;
pub mod registry;

pub use builtin::{MethodFn, MethodRegistry, register_builtins};
pub use handler::{
    DirectiveContext, DirectiveHandler, DirectiveLocation, DirectiveRole, FieldNext, NodeNext,
};
pub use registry::{ClassLookup, ClassRegistry, ClassResolver, DirectiveFactory, DirectiveRegistry};
