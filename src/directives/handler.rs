//! Directive handlers and the continuations they are chained with
//!
//! A handler is created once per (node, directive) pair at build time. It
//! receives the value being resolved and a `next` continuation running the
//! remaining handlers; it may change the value before or after calling
//! `next`, or return without calling it.

use crate::core::directive::Directive;
use crate::core::error::{DefinitionError, EngineError};
use crate::core::node::NodeKind;
use crate::directives::builtin::MethodRegistry;
use crate::schema::values::{FieldValue, NodeValue};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a handler contributes to resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveRole {
    /// Hint for the type generator (scalar class, type resolver class)
    TypeResolver,
    /// Provides the field resolver; at most one per field
    FieldResolver,
    /// Wraps the field resolver
    FieldMiddleware,
    /// Transforms argument values before the resolver runs
    ArgTransformer,
    /// Declares relations to eager load on the enclosing collection
    RelationLoader,
    /// Metadata read by generators, no behavior of its own
    Annotation,
}

impl DirectiveRole {
    /// Whether the role has a meaning at the location
    pub fn allowed_at(&self, location: DirectiveLocation) -> bool {
        match self {
            DirectiveRole::Annotation => true,
            DirectiveRole::TypeResolver => matches!(location, DirectiveLocation::Type(_)),
            DirectiveRole::FieldResolver
            | DirectiveRole::FieldMiddleware
            | DirectiveRole::RelationLoader => matches!(location, DirectiveLocation::Field),
            DirectiveRole::ArgTransformer => {
                matches!(location, DirectiveLocation::Field | DirectiveLocation::Argument)
            }
        }
    }
}

/// Where a directive is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    Type(NodeKind),
    Field,
    Argument,
    EnumValue,
}

impl fmt::Display for DirectiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveLocation::Type(kind) => write!(f, "{} definitions", kind),
            DirectiveLocation::Field => write!(f, "fields"),
            DirectiveLocation::Argument => write!(f, "arguments"),
            DirectiveLocation::EnumValue => write!(f, "enum values"),
        }
    }
}

/// Build-time context handed to directive factories
pub struct DirectiveContext<'a> {
    /// Qualified name of the annotated node (`User`, `User.posts`, `User.posts(first)`)
    pub node: &'a str,

    /// Object or interface owning the field, or the annotated type itself
    pub type_name: &'a str,

    /// The annotated field, or the field owning the annotated argument
    pub field: Option<&'a str>,

    pub location: DirectiveLocation,

    pub methods: &'a MethodRegistry,
}

impl DirectiveContext<'_> {
    /// Build an `InvalidArgument` error for a directive of this node
    pub fn invalid_argument(&self, directive: &Directive, message: impl fmt::Display) -> EngineError {
        DefinitionError::InvalidArgument {
            directive: directive.name.clone(),
            node: self.node.to_string(),
            message: message.to_string(),
        }
        .into()
    }
}

/// A directive bound to one schema node
pub trait DirectiveHandler: Send + Sync {
    /// Directive name without the `@`
    fn name(&self) -> &str;

    fn roles(&self) -> &'static [DirectiveRole];

    fn has_role(&self, role: DirectiveRole) -> bool {
        self.roles().contains(&role)
    }

    /// Whether any role of the handler applies at the location
    fn accepts(&self, location: DirectiveLocation) -> bool {
        self.roles().iter().any(|role| role.allowed_at(location))
    }

    /// Type-level resolution
    fn handle_node(&self, value: NodeValue, next: NodeNext<'_>) -> Result<NodeValue, EngineError> {
        next.run(value)
    }

    /// Field-level resolution
    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        next.run(value)
    }

    /// Transform one argument value before it reaches the resolver
    fn transform_argument(&self, value: Value) -> Value {
        value
    }
}

type NodeTerminal<'a> = &'a dyn Fn(NodeValue) -> Result<NodeValue, EngineError>;

/// Continuation over the remaining type-level handlers
pub struct NodeNext<'a> {
    rest: &'a [Arc<dyn DirectiveHandler>],
    terminal: NodeTerminal<'a>,
}

impl<'a> NodeNext<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn DirectiveHandler>], terminal: NodeTerminal<'a>) -> Self {
        Self {
            rest: handlers,
            terminal,
        }
    }

    /// Run the remaining handlers, then the terminal step
    pub fn run(self, value: NodeValue) -> Result<NodeValue, EngineError> {
        match self.rest.split_first() {
            Some((handler, rest)) => handler.handle_node(
                value,
                NodeNext {
                    rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(value),
        }
    }
}

/// Continuation over the remaining field-level handlers
pub struct FieldNext<'a> {
    rest: &'a [Arc<dyn DirectiveHandler>],
}

impl<'a> FieldNext<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn DirectiveHandler>]) -> Self {
        Self { rest: handlers }
    }

    pub fn run(self, value: FieldValue) -> Result<FieldValue, EngineError> {
        match self.rest.split_first() {
            Some((handler, rest)) => handler.handle_field(value, FieldNext { rest }),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_allowed_at_locations() {
        assert!(DirectiveRole::RelationLoader.allowed_at(DirectiveLocation::Field));
        assert!(!DirectiveRole::RelationLoader.allowed_at(DirectiveLocation::Type(NodeKind::Object)));
        assert!(DirectiveRole::TypeResolver.allowed_at(DirectiveLocation::Type(NodeKind::Scalar)));
        assert!(!DirectiveRole::TypeResolver.allowed_at(DirectiveLocation::Field));
        assert!(DirectiveRole::ArgTransformer.allowed_at(DirectiveLocation::Argument));
        assert!(DirectiveRole::Annotation.allowed_at(DirectiveLocation::EnumValue));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(
            DirectiveLocation::Type(NodeKind::Union).to_string(),
            "union definitions"
        );
        assert_eq!(DirectiveLocation::Field.to_string(), "fields");
    }
}
