//! Schema builder
//!
//! Collects the directive, scalar, type resolver and method registrations,
//! then compiles a schema document into an [`ExecutableSchema`]. Every
//! type definition runs through its directive pipeline with the type
//! generator as the terminal step. The first error aborts the build.

use crate::config::EngineConfig;
use crate::core::directive::Directive;
use crate::core::error::{DefinitionError, EngineError};
use crate::core::node::{BUILTIN_SCALARS, NodeKind, SchemaDocument};
use crate::core::record::Record;
use crate::directives::builtin::{MethodRegistry, register_builtins};
use crate::directives::handler::{DirectiveContext, DirectiveHandler, DirectiveLocation};
use crate::directives::registry::{ClassRegistry, DirectiveRegistry};
use crate::schema::executable::{ExecutableSchema, ExecutableType, ResolverArgs, TypeResolver};
use crate::schema::generators::TypeGenerator;
use crate::schema::pipeline::DirectivePipeline;
use crate::schema::scalars::{DateTimeScalar, JsonScalar, ScalarType, standard_scalar};
use crate::schema::values::NodeValue;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Builder of executable schemas
///
/// # Example
///
/// ```rust,ignore
/// let schema = SchemaBuilder::new(EngineConfig::default_config())
///     .with_method("User", "tasksLoaded", |user, _args| {
///         Ok(json!(user.relation_loaded("tasks")))
///     })
///     .build_sdl(sdl)?;
/// ```
pub struct SchemaBuilder {
    config: EngineConfig,
    directives: DirectiveRegistry,
    scalars: ClassRegistry<Arc<dyn ScalarType>>,
    type_resolvers: ClassRegistry<Arc<dyn TypeResolver>>,
    methods: MethodRegistry,
}

impl SchemaBuilder {
    pub fn new(config: EngineConfig) -> Self {
        let mut directives = DirectiveRegistry::new(config.namespaces.directives.clone());
        register_builtins(&mut directives);
        for (directive, class) in &config.directive_bindings {
            directives.bind(directive.clone(), class.clone());
        }

        let mut scalars = ClassRegistry::new();
        scalars.register("DateTime", || Arc::new(DateTimeScalar) as Arc<dyn ScalarType>);
        scalars.register("JSON", || Arc::new(JsonScalar) as Arc<dyn ScalarType>);

        Self {
            config,
            directives,
            scalars,
            type_resolvers: ClassRegistry::new(),
            methods: MethodRegistry::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a directive handler class under its bare name
    pub fn with_directive<F>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Directive, &DirectiveContext<'_>) -> Result<Arc<dyn DirectiveHandler>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.directives.register(class, factory);
        self
    }

    /// Register a directive handler class inside a namespace
    pub fn with_directive_in<F>(mut self, namespace: &str, class: &str, factory: F) -> Self
    where
        F: Fn(&Directive, &DirectiveContext<'_>) -> Result<Arc<dyn DirectiveHandler>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.directives.register_in(namespace, class, factory);
        self
    }

    /// Bind a directive name to a class, bypassing the naming convention
    pub fn bind_directive(mut self, directive: impl Into<String>, class: impl Into<String>) -> Self {
        self.directives.bind(directive, class);
        self
    }

    pub fn with_scalar<F>(mut self, class: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn ScalarType> + Send + Sync + 'static,
    {
        self.scalars.register(class, constructor);
        self
    }

    pub fn with_scalar_in<F>(mut self, namespace: &str, class: &str, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn ScalarType> + Send + Sync + 'static,
    {
        self.scalars.register_in(namespace, class, constructor);
        self
    }

    pub fn with_type_resolver<F>(mut self, class: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn TypeResolver> + Send + Sync + 'static,
    {
        self.type_resolvers.register(class, constructor);
        self
    }

    pub fn with_type_resolver_in<F>(mut self, namespace: &str, class: &str, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn TypeResolver> + Send + Sync + 'static,
    {
        self.type_resolvers.register_in(namespace, class, constructor);
        self
    }

    /// Register a method callable through `@method`
    pub fn with_method<F>(
        mut self,
        type_name: impl Into<String>,
        method: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&Record, &ResolverArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.methods.register(type_name, method, f);
        self
    }

    /// Parse and compile an SDL document
    pub fn build_sdl(&self, sdl: &str) -> Result<ExecutableSchema, EngineError> {
        let document = SchemaDocument::parse(sdl)?;
        self.build(&document)
    }

    /// Compile a schema document
    pub fn build(&self, document: &SchemaDocument) -> Result<ExecutableSchema, EngineError> {
        self.validate(document)?;

        let generator = TypeGenerator {
            document,
            config: &self.config,
            directives: &self.directives,
            scalars: &self.scalars,
            type_resolvers: &self.type_resolvers,
            methods: &self.methods,
        };

        let mut types = IndexMap::new();
        for name in BUILTIN_SCALARS {
            if let Some(scalar) = standard_scalar(name) {
                types.insert(name.to_string(), ExecutableType::Scalar(scalar));
            }
        }

        for node in document.types.values() {
            let node = Arc::new(node.clone());
            let context = DirectiveContext {
                node: &node.name,
                type_name: &node.name,
                field: None,
                location: DirectiveLocation::Type(node.kind),
                methods: &self.methods,
            };
            let pipeline = DirectivePipeline::new(&self.directives, &node.directives, &context)?;

            let value = pipeline.resolve_node(NodeValue::new(node.clone()), &|value| {
                generator.generate(value)
            })?;
            let ty = value.into_type().ok_or_else(|| {
                EngineError::Internal(format!("No executable type produced for '{}'", node.name))
            })?;

            tracing::debug!(type_name = %node.name, kind = %node.kind, "Resolved type");
            types.insert(node.name.clone(), ty);
        }

        tracing::debug!(types = types.len(), query_type = %document.query_type, "Built schema");
        Ok(ExecutableSchema::new(
            types,
            document.query_type.clone(),
            document.mutation_type.clone(),
        ))
    }

    /// Check root types and type references before generating anything
    fn validate(&self, document: &SchemaDocument) -> Result<(), DefinitionError> {
        match document.get(&document.query_type) {
            Some(node) if node.kind == NodeKind::Object => {}
            _ => {
                return Err(DefinitionError::MissingQueryType {
                    type_name: document.query_type.clone(),
                });
            }
        }

        if let Some(mutation) = &document.mutation_type
            && !document
                .get(mutation)
                .is_some_and(|node| node.kind == NodeKind::Object)
        {
            return Err(DefinitionError::UnknownType {
                type_name: mutation.clone(),
                referenced_by: "schema".to_string(),
            });
        }

        let require = |type_name: &str, referenced_by: String| {
            if document.is_defined(type_name) {
                Ok(())
            } else {
                Err(DefinitionError::UnknownType {
                    type_name: type_name.to_string(),
                    referenced_by,
                })
            }
        };

        for node in document.types.values() {
            for field in &node.fields {
                let qualified = format!("{}.{}", node.name, field.name);
                require(field.ty.named(), qualified.clone())?;
                for argument in &field.arguments {
                    require(
                        argument.ty.named(),
                        format!("{}({})", qualified, argument.name),
                    )?;
                }
            }
            for member in node.members.iter().chain(&node.interfaces) {
                require(member, node.name.clone())?;
            }
        }

        Ok(())
    }
}
