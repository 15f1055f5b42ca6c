//! Built-in directive handlers

pub mod annotation;
pub mod middleware;
pub mod relation;
pub mod resolver;

pub use annotation::AnnotationDirective;
pub use middleware::{CaseDirective, TrimDirective};
pub use relation::{Cardinality, RelationDirective, WithDirective};
pub use resolver::{MethodDirective, MethodFn, MethodRegistry, QueryDirective, RenameDirective};

use crate::directives::registry::DirectiveRegistry;

/// Register every built-in handler under its bare class name
pub fn register_builtins(registry: &mut DirectiveRegistry) {
    registry.register("WithDirective", WithDirective::create);
    registry.register("HasManyDirective", RelationDirective::has_many);
    registry.register("HasOneDirective", RelationDirective::has_one);
    registry.register("BelongsToDirective", RelationDirective::belongs_to);
    registry.register("MorphToDirective", RelationDirective::morph_to);

    registry.register("MethodDirective", MethodDirective::create);
    registry.register("RenameDirective", RenameDirective::create);
    registry.register("AllDirective", QueryDirective::all);
    registry.register("FirstDirective", QueryDirective::first);
    registry.register("FindDirective", QueryDirective::find);

    registry.register("UpperCaseDirective", CaseDirective::upper);
    registry.register("LowerCaseDirective", CaseDirective::lower);
    registry.register("TrimDirective", TrimDirective::create);

    registry.register("ScalarDirective", AnnotationDirective::scalar);
    registry.register("UnionDirective", AnnotationDirective::type_resolver);
    registry.register("InterfaceDirective", AnnotationDirective::type_resolver);
    registry.register("EnumDirective", AnnotationDirective::enum_value);
    registry.register("CacheKeyDirective", AnnotationDirective::marker);
    registry.register("DeprecatedDirective", AnnotationDirective::marker);
}
