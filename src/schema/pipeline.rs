//! Directive pipelines
//!
//! All directives of one node are turned into handlers once, in declaration
//! order, and chained through continuations. Each handler sees the value
//! produced by the handlers declared before it.

use crate::core::directive::Directive;
use crate::core::error::{DefinitionError, EngineError};
use crate::directives::handler::{
    DirectiveContext, DirectiveHandler, DirectiveRole, FieldNext, NodeNext,
};
use crate::directives::registry::DirectiveRegistry;
use crate::schema::values::{FieldValue, NodeValue};
use std::sync::Arc;

/// The ordered handlers of one schema node
pub struct DirectivePipeline {
    handlers: Vec<Arc<dyn DirectiveHandler>>,
}

impl DirectivePipeline {
    /// Create a handler per directive and check each is legal at the node
    pub fn new(
        registry: &DirectiveRegistry,
        directives: &[Directive],
        context: &DirectiveContext<'_>,
    ) -> Result<Self, EngineError> {
        let mut handlers = Vec::with_capacity(directives.len());

        for directive in directives {
            let handler = registry.create(directive, context)?;
            if !handler.accepts(context.location) {
                return Err(DefinitionError::InvalidLocation {
                    directive: directive.name.clone(),
                    node: context.node.to_string(),
                    location: context.location.to_string(),
                }
                .into());
            }
            handlers.push(handler);
        }

        Ok(Self { handlers })
    }

    pub fn handlers(&self) -> &[Arc<dyn DirectiveHandler>] {
        &self.handlers
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handlers having the given role, in declaration order
    pub fn with_role(&self, role: DirectiveRole) -> Vec<Arc<dyn DirectiveHandler>> {
        self.handlers
            .iter()
            .filter(|h| h.has_role(role))
            .cloned()
            .collect()
    }

    /// Run a type definition through its handlers
    ///
    /// `terminal` runs once every handler called `next`; a handler may skip
    /// it by returning without calling `next`.
    pub fn resolve_node(
        &self,
        value: NodeValue,
        terminal: &dyn Fn(NodeValue) -> Result<NodeValue, EngineError>,
    ) -> Result<NodeValue, EngineError> {
        NodeNext::new(&self.handlers, terminal).run(value)
    }

    /// Run a field through its handlers
    ///
    /// The resolver directive is applied first so that middleware wraps the
    /// resolver it provides; every other handler follows in declaration
    /// order.
    pub fn resolve_field(&self, value: FieldValue) -> Result<FieldValue, EngineError> {
        let (resolvers, others): (Vec<_>, Vec<_>) = self
            .handlers
            .iter()
            .cloned()
            .partition(|h| h.has_role(DirectiveRole::FieldResolver));

        if resolvers.len() > 1 {
            return Err(DefinitionError::MultipleResolvers {
                field: value.qualified_name(),
                directives: resolvers.iter().map(|h| h.name().to_string()).collect(),
            }
            .into());
        }

        let value = match resolvers.first() {
            Some(resolver) => resolver.handle_field(value, FieldNext::new(&[]))?,
            None => value,
        };
        FieldNext::new(&others).run(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{NodeKind, SchemaDocument};
    use crate::core::relation::RelationPath;
    use crate::directives::builtin::{MethodRegistry, register_builtins};
    use crate::directives::handler::DirectiveLocation;
    use crate::schema::executable::{FieldFuture, FieldResolverFn, Resolved, ResolverContext};
    use futures::FutureExt;

    /// Appends its name as an eager load, optionally without calling `next`
    struct Marker {
        name: &'static str,
        stop: bool,
    }

    impl DirectiveHandler for Marker {
        fn name(&self) -> &str {
            self.name
        }

        fn roles(&self) -> &'static [DirectiveRole] {
            &[DirectiveRole::RelationLoader]
        }

        fn handle_field(
            &self,
            value: FieldValue,
            next: FieldNext<'_>,
        ) -> Result<FieldValue, EngineError> {
            let value = value.with_eager_load(RelationPath::parse(self.name).unwrap());
            if self.stop { Ok(value) } else { next.run(value) }
        }
    }

    fn registry() -> DirectiveRegistry {
        let mut registry = DirectiveRegistry::new(Vec::new());
        register_builtins(&mut registry);
        for (class, name, stop) in [
            ("AlphaDirective", "alpha", false),
            ("BetaDirective", "beta", false),
            ("HaltDirective", "halt", true),
        ] {
            registry.register(
                class,
                move |_: &Directive, _: &DirectiveContext<'_>| {
                    Ok(Arc::new(Marker { name, stop }) as Arc<dyn DirectiveHandler>)
                },
            );
        }
        registry
    }

    fn null_resolver() -> FieldResolverFn {
        Arc::new(|_ctx: ResolverContext| -> FieldFuture {
            async { Ok(Resolved::null()) }.boxed()
        })
    }

    fn run_field(sdl: &str, field: &str) -> Result<FieldValue, EngineError> {
        let doc = SchemaDocument::parse(sdl).unwrap();
        let user = Arc::new(doc.get("User").unwrap().clone());
        let field_node = user.field(field).unwrap().clone();
        let methods = MethodRegistry::new();
        let node = format!("User.{}", field);
        let context = DirectiveContext {
            node: &node,
            type_name: "User",
            field: Some(field),
            location: DirectiveLocation::Field,
            methods: &methods,
        };

        let pipeline = DirectivePipeline::new(&registry(), &field_node.directives, &context)?;
        pipeline.resolve_field(FieldValue::new(user, field_node, false, null_resolver()))
    }

    #[test]
    fn test_handlers_run_in_declaration_order() {
        let value = run_field("type User { a: Int @beta @alpha }", "a").unwrap();
        let paths: Vec<_> = value.eager_loads().iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, vec!["beta", "alpha"]);
    }

    #[test]
    fn test_handler_can_short_circuit() {
        let value = run_field("type User { a: Int @alpha @halt @beta }", "a").unwrap();
        let paths: Vec<_> = value.eager_loads().iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, vec!["alpha", "halt"]);
    }

    #[test]
    fn test_two_resolver_directives_fail() {
        let err = run_field(
            r#"type User { posts: [Int] @hasMany @rename(attribute: "posts") }"#,
            "posts",
        )
        .err()
        .unwrap();

        assert_eq!(
            err.to_string(),
            "Field 'User.posts' can only have one resolver directive, found: @hasMany, @rename"
        );
    }

    #[test]
    fn test_field_directive_on_type_is_rejected() {
        let doc = SchemaDocument::parse(r#"type User @with(relation: "tasks") { a: Int }"#).unwrap();
        let user = doc.get("User").unwrap();
        let methods = MethodRegistry::new();
        let context = DirectiveContext {
            node: "User",
            type_name: "User",
            field: None,
            location: DirectiveLocation::Type(NodeKind::Object),
            methods: &methods,
        };

        let err = DirectivePipeline::new(&registry(), &user.directives, &context)
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "INVALID_DIRECTIVE_LOCATION");
    }
}
