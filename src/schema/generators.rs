//! Resolver generators
//!
//! A generator turns a type definition that no directive resolved into its
//! executable type. Scalars, unions and interfaces are bound to registered
//! classes by naming convention; object fields get their resolver from the
//! field directive pipeline, falling back to reading the parent record.

use crate::config::EngineConfig;
use crate::core::directive::{ArgValue, Directive};
use crate::core::error::{Capability, EngineError};
use crate::core::naming::Naming;
use crate::core::node::{ArgumentNode, FieldNode, NodeKind, SchemaDocument, TypeNode};
use crate::core::record::Relation;
use crate::directives::builtin::MethodRegistry;
use crate::directives::handler::{DirectiveContext, DirectiveLocation, DirectiveRole};
use crate::directives::registry::{ClassLookup, ClassRegistry, DirectiveRegistry};
use crate::schema::executable::{
    AbstractType, EnumType, ExecutableArgument, ExecutableField, ExecutableType, FieldFuture,
    FieldResolverFn, InputObjectType, ModelTypeResolver, ObjectType, Resolved, ResolverContext,
    TypeResolver,
};
use crate::schema::pipeline::DirectivePipeline;
use crate::schema::scalars::ScalarType;
use crate::schema::values::{FieldValue, NodeValue};
use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// Everything a generator reads while producing executable types
pub struct TypeGenerator<'a> {
    pub document: &'a SchemaDocument,
    pub config: &'a EngineConfig,
    pub directives: &'a DirectiveRegistry,
    pub scalars: &'a ClassRegistry<Arc<dyn ScalarType>>,
    pub type_resolvers: &'a ClassRegistry<Arc<dyn TypeResolver>>,
    pub methods: &'a MethodRegistry,
}

impl TypeGenerator<'_> {
    /// Produce the executable type of a value no handler resolved
    pub fn generate(&self, value: NodeValue) -> Result<NodeValue, EngineError> {
        if value.has_type() {
            return Ok(value);
        }

        match value.node().kind {
            NodeKind::Scalar => self.scalar(value),
            NodeKind::Object => self.object(value),
            NodeKind::Interface | NodeKind::Union => self.abstract_type(value),
            NodeKind::Enum => self.enumeration(value),
            NodeKind::InputObject => self.input_object(value),
        }
    }

    /// Bind a scalar to its implementation class
    ///
    /// The class comes from `@scalar(class: ...)`, or is the type name with
    /// its first letter upper-cased.
    pub fn scalar(&self, value: NodeValue) -> Result<NodeValue, EngineError> {
        let scalar = {
            let node = value.node();
            let explicit = self.string_hint(node, "scalar", "class")?;
            let conventional = Naming::ucfirst(&node.name);
            let namespaces = namespace_list(&self.config.namespaces.scalars);

            ClassLookup {
                capability: Capability::Scalar,
                explicit: explicit.as_deref(),
                conventional: &conventional,
                namespaces: &namespaces,
                node: &node.name,
            }
            .resolve(self.scalars)?
        };

        Ok(value.with_type(ExecutableType::Scalar(scalar)))
    }

    /// Bind an interface or union to its type resolver
    ///
    /// Without an explicit `resolveType` and without a class matching the
    /// type name, records resolve to the type named by their model.
    pub fn abstract_type(&self, value: NodeValue) -> Result<NodeValue, EngineError> {
        let ty = {
            let node = value.node();
            let (capability, directive, namespace) = match node.kind {
                NodeKind::Union => (Capability::Union, "union", &self.config.namespaces.unions),
                _ => (
                    Capability::Interface,
                    "interface",
                    &self.config.namespaces.interfaces,
                ),
            };
            let explicit = self.string_hint(node, directive, "resolveType")?;
            let conventional = Naming::ucfirst(&node.name);
            let namespaces = namespace_list(namespace);

            let lookup = ClassLookup {
                capability,
                explicit: explicit.as_deref(),
                conventional: &conventional,
                namespaces: &namespaces,
                node: &node.name,
            };
            let resolver = match lookup.resolve(self.type_resolvers) {
                Ok(resolver) => resolver,
                Err(e) if explicit.is_some() => return Err(e.into()),
                Err(_) => {
                    tracing::debug!(
                        type_name = %node.name,
                        "No type resolver class, resolving by model name"
                    );
                    Arc::new(ModelTypeResolver) as Arc<dyn TypeResolver>
                }
            };

            let abstract_type = AbstractType {
                name: node.name.clone(),
                possible_types: self.document.possible_types(&node.name),
                resolver,
            };
            match node.kind {
                NodeKind::Union => ExecutableType::Union(abstract_type),
                _ => ExecutableType::Interface(abstract_type),
            }
        };

        if let ExecutableType::Interface(_) = ty {
            // Interface fields are never resolved, their directives are still checked
            let node = value.shared_node();
            for field in &node.fields {
                self.field_pipeline(&node, field)?;
            }
        }

        Ok(value.with_type(ty))
    }

    pub fn enumeration(&self, value: NodeValue) -> Result<NodeValue, EngineError> {
        let ty = {
            let node = value.node();
            let mut values = IndexMap::new();
            let mut deprecated = IndexMap::new();

            for enum_value in &node.values {
                let qualified = format!("{}.{}", node.name, enum_value.name);
                let context = self.context(&qualified, &node.name, None, DirectiveLocation::EnumValue);
                DirectivePipeline::new(self.directives, &enum_value.directives, &context)?;

                let internal = enum_value
                    .directives
                    .iter()
                    .find(|d| d.name == "enum")
                    .and_then(|d| d.argument("value"))
                    .map(ArgValue::to_json)
                    .unwrap_or_else(|| Value::String(enum_value.name.clone()));
                values.insert(enum_value.name.clone(), internal);

                if let Some(directive) = enum_value.directives.iter().find(|d| d.name == "deprecated") {
                    let reason = deprecation_reason(directive, &context)?;
                    deprecated.insert(enum_value.name.clone(), reason);
                }
            }

            ExecutableType::Enum(EnumType {
                name: node.name.clone(),
                values,
                deprecated,
            })
        };

        Ok(value.with_type(ty))
    }

    pub fn input_object(&self, value: NodeValue) -> Result<NodeValue, EngineError> {
        let ty = {
            let node = value.node();
            let mut fields = IndexMap::new();
            for field in &node.fields {
                let qualified = format!("{}.{}", node.name, field.name);
                let context =
                    self.context(&qualified, &node.name, Some(&field.name), DirectiveLocation::Argument);
                DirectivePipeline::new(self.directives, &field.directives, &context)?;
                fields.insert(field.name.clone(), field.ty.clone());
            }

            ExecutableType::InputObject(InputObjectType {
                name: node.name.clone(),
                fields,
            })
        };

        Ok(value.with_type(ty))
    }

    /// Build every field of an object type through its directive pipeline
    pub fn object(&self, value: NodeValue) -> Result<NodeValue, EngineError> {
        let node = value.shared_node();
        let mut fields = IndexMap::new();
        for field in &node.fields {
            fields.insert(field.name.clone(), self.field(&node, field)?);
        }

        let cache_key = node
            .fields
            .iter()
            .find(|f| f.directive("cacheKey").is_some())
            .or_else(|| node.field("id"))
            .map(|f| f.name.clone());

        let object = ObjectType {
            name: node.name.clone(),
            fields,
            interfaces: node.interfaces.clone(),
            cache_key: cache_key.clone(),
        };

        let value = value.with_type(ExecutableType::Object(object));
        Ok(match cache_key {
            Some(key) => value.with_cache_key(key),
            None => value,
        })
    }

    /// Resolve one field of an object type
    pub fn field(
        &self,
        parent: &Arc<TypeNode>,
        field: &Arc<FieldNode>,
    ) -> Result<ExecutableField, EngineError> {
        let qualified = format!("{}.{}", parent.name, field.name);
        let pipeline = self.field_pipeline(parent, field)?;

        let root = self.document.is_root_type(&parent.name);
        let resolver = if root {
            null_resolver()
        } else {
            default_resolver(&field.name)
        };
        let value = pipeline.resolve_field(FieldValue::new(
            parent.clone(),
            field.clone(),
            root,
            resolver,
        ))?;

        let arguments = field
            .arguments
            .iter()
            .map(|argument| self.argument(parent, field, argument))
            .collect::<Result<Vec<_>, _>>()?;

        let deprecation = match field.directive("deprecated") {
            Some(directive) => {
                let context =
                    self.context(&qualified, &parent.name, Some(&field.name), DirectiveLocation::Field);
                Some(deprecation_reason(directive, &context)?)
            }
            None => None,
        };

        tracing::debug!(
            field = %qualified,
            directives = pipeline.handlers().len(),
            eager_loads = value.eager_loads().len(),
            "Resolved field"
        );
        Ok(value.into_field(arguments, deprecation))
    }

    fn field_pipeline(
        &self,
        parent: &TypeNode,
        field: &FieldNode,
    ) -> Result<DirectivePipeline, EngineError> {
        let qualified = format!("{}.{}", parent.name, field.name);
        let context = self.context(&qualified, &parent.name, Some(&field.name), DirectiveLocation::Field);
        DirectivePipeline::new(self.directives, &field.directives, &context)
    }

    fn argument(
        &self,
        parent: &TypeNode,
        field: &FieldNode,
        argument: &ArgumentNode,
    ) -> Result<ExecutableArgument, EngineError> {
        let qualified = format!("{}.{}({})", parent.name, field.name, argument.name);
        let context = self.context(&qualified, &parent.name, Some(&field.name), DirectiveLocation::Argument);
        let pipeline = DirectivePipeline::new(self.directives, &argument.directives, &context)?;

        Ok(ExecutableArgument {
            name: argument.name.clone(),
            ty: argument.ty.clone(),
            default_value: argument.default_value.clone(),
            transformers: pipeline.with_role(DirectiveRole::ArgTransformer),
        })
    }

    fn context<'c>(
        &'c self,
        node: &'c str,
        type_name: &'c str,
        field: Option<&'c str>,
        location: DirectiveLocation,
    ) -> DirectiveContext<'c> {
        DirectiveContext {
            node,
            type_name,
            field,
            location,
            methods: self.methods,
        }
    }

    /// String argument of a type-level hint directive, if the directive is present
    fn string_hint(
        &self,
        node: &TypeNode,
        directive: &str,
        argument: &str,
    ) -> Result<Option<String>, EngineError> {
        let Some(hint) = node.directive(directive) else {
            return Ok(None);
        };
        let context = self.context(&node.name, &node.name, None, DirectiveLocation::Type(node.kind));
        hint.require_string(argument)
            .map(Some)
            .map_err(|e| context.invalid_argument(hint, e))
    }
}

fn namespace_list(namespace: &Option<String>) -> Vec<String> {
    namespace.iter().cloned().collect()
}

fn deprecation_reason(
    directive: &Directive,
    context: &DirectiveContext<'_>,
) -> Result<String, EngineError> {
    directive
        .string_arg_or("reason", DEFAULT_DEPRECATION_REASON)
        .map_err(|e| context.invalid_argument(directive, e))
}

/// Resolver of root fields without a resolver directive
pub fn null_resolver() -> FieldResolverFn {
    Arc::new(|_ctx: ResolverContext| -> FieldFuture { futures::future::ready(Ok(Resolved::null())).boxed() })
}

/// Resolver reading the field from the parent record
///
/// Tries the attribute of the same name, then its snake_case form, then a
/// relation already loaded under the field name.
pub fn default_resolver(field: &str) -> FieldResolverFn {
    let field = field.to_string();
    let snake = Naming::camel_to_snake(&field);

    Arc::new(move |ctx: ResolverContext| -> FieldFuture {
        let resolved = match ctx.parent.as_deref() {
            None => Resolved::null(),
            Some(parent) => {
                if let Some(value) = parent.attribute(&field).or_else(|| parent.attribute(&snake)) {
                    Resolved::Value(value.clone())
                } else {
                    match parent.relation(&field) {
                        Some(Relation::Many(records)) => Resolved::Records(records.clone()),
                        Some(Relation::One(record)) => {
                            Resolved::Record(record.as_deref().cloned())
                        }
                        None => Resolved::null(),
                    }
                }
            }
        };
        futures::future::ready(Ok(resolved)).boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DefinitionError;
    use crate::core::record::Record;
    use crate::directives::builtin::register_builtins;
    use crate::schema::executable::{ResolveInfo, ResolverArgs};
    use crate::schema::scalars::JsonScalar;
    use crate::storage::InMemoryModelStore;
    use serde_json::json;

    struct Fixture {
        config: EngineConfig,
        directives: DirectiveRegistry,
        scalars: ClassRegistry<Arc<dyn ScalarType>>,
        type_resolvers: ClassRegistry<Arc<dyn TypeResolver>>,
        methods: MethodRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let mut directives = DirectiveRegistry::new(Vec::new());
            register_builtins(&mut directives);
            Self {
                config: EngineConfig::default_config(),
                directives,
                scalars: ClassRegistry::new(),
                type_resolvers: ClassRegistry::new(),
                methods: MethodRegistry::new(),
            }
        }

        fn generate(&self, sdl: &str, type_name: &str) -> Result<NodeValue, EngineError> {
            let document = SchemaDocument::parse(sdl)?;
            let generator = TypeGenerator {
                document: &document,
                config: &self.config,
                directives: &self.directives,
                scalars: &self.scalars,
                type_resolvers: &self.type_resolvers,
                methods: &self.methods,
            };
            let node = Arc::new(document.get(type_name).unwrap().clone());
            generator.generate(NodeValue::new(node))
        }
    }

    fn context(parent: Option<Record>) -> ResolverContext {
        ResolverContext {
            parent: parent.map(Arc::new),
            args: ResolverArgs::new(),
            info: Arc::new(ResolveInfo {
                field_name: "f".to_string(),
                parent_type: "User".to_string(),
                return_type: crate::core::node::TypeRef::Named("String".to_string()),
            }),
            store: Arc::new(InMemoryModelStore::new(Arc::new(EngineConfig::default_config()))),
        }
    }

    #[test]
    fn test_scalar_resolved_by_convention_in_namespace() {
        let mut fixture = Fixture::new();
        fixture.config.namespaces.scalars = Some("app::scalars".to_string());
        fixture
            .scalars
            .register_in("app::scalars", "Email", || Arc::new(JsonScalar) as Arc<dyn ScalarType>);

        let value = fixture
            .generate("type Query { a: Int } scalar email", "email")
            .unwrap();
        assert!(matches!(value.executable_type(), Some(ExecutableType::Scalar(_))));
    }

    #[test]
    fn test_missing_scalar_class_names_attempted_class() {
        let fixture = Fixture::new();
        let err = fixture
            .generate(
                r#"type Query { a: Int } scalar Email @scalar(class: "EmailAddress")"#,
                "Email",
            )
            .err()
            .unwrap();

        assert_eq!(err.error_code(), "CLASS_NOT_FOUND");
        assert_eq!(
            err.to_string(),
            "Unable to find class [EmailAddress] assigned to Email scalar"
        );
    }

    #[test]
    fn test_union_falls_back_to_model_name() {
        let fixture = Fixture::new();
        let value = fixture
            .generate(
                "type Query { a: Int } type Post { id: ID } type Task { id: ID } union Content = Post | Task",
                "Content",
            )
            .unwrap();

        let Some(ExecutableType::Union(union)) = value.executable_type() else {
            panic!("expected a union");
        };
        assert_eq!(union.possible_types, vec!["Post", "Task"]);
        assert_eq!(
            union.resolver.resolve_type(&Record::new("Task")).as_deref(),
            Some("Task")
        );
    }

    #[test]
    fn test_explicit_type_resolver_must_exist() {
        let fixture = Fixture::new();
        let err = fixture
            .generate(
                r#"type Query { a: Int } type Post { id: ID } union Content @union(resolveType: "Missing") = Post"#,
                "Content",
            )
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "CLASS_NOT_FOUND");
    }

    #[test]
    fn test_enum_internal_values_and_deprecation() {
        let fixture = Fixture::new();
        let value = fixture
            .generate(
                r#"type Query { a: Int }
                enum Status { ACTIVE @enum(value: 1) RETIRED @deprecated }"#,
                "Status",
            )
            .unwrap();

        let Some(ExecutableType::Enum(status)) = value.executable_type() else {
            panic!("expected an enum");
        };
        assert_eq!(status.values["ACTIVE"], json!(1));
        assert_eq!(status.values["RETIRED"], json!("RETIRED"));
        assert_eq!(status.deprecated["RETIRED"], DEFAULT_DEPRECATION_REASON);
    }

    #[test]
    fn test_object_cache_key_and_field_relations() {
        let fixture = Fixture::new();
        let value = fixture
            .generate(
                r#"type Query { a: Int }
                type User { uuid: ID @cacheKey id: ID tasks: [Int] @hasMany }"#,
                "User",
            )
            .unwrap();

        assert_eq!(value.cache_key(), Some("uuid"));
        let Some(ExecutableType::Object(user)) = value.executable_type() else {
            panic!("expected an object");
        };
        assert_eq!(user.fields["tasks"].eager_loads[0].as_str(), "tasks");
    }

    #[test]
    fn test_relation_directive_on_root_field_fails() {
        let fixture = Fixture::new();
        let err = fixture
            .generate("type Query { users: [Int] @hasMany }", "Query")
            .err()
            .unwrap();
        assert!(matches!(
            err,
            EngineError::Definition(DefinitionError::RootFieldRelation { .. })
        ));
    }

    #[tokio::test]
    async fn test_default_resolver_reads_attributes_and_relations() {
        let parent = Record::new("User")
            .with("created_at", "2024-01-01")
            .with("name", "Ada");
        let mut parent = parent;
        parent.set_relation("tasks", Relation::Many(vec![Record::new("Task").with("id", 1)]));

        let name = default_resolver("name")(context(Some(parent.clone()))).await.unwrap();
        assert_eq!(name, Resolved::Value(json!("Ada")));

        let created = default_resolver("createdAt")(context(Some(parent.clone())))
            .await
            .unwrap();
        assert_eq!(created, Resolved::Value(json!("2024-01-01")));

        let tasks = default_resolver("tasks")(context(Some(parent))).await.unwrap();
        assert!(matches!(tasks, Resolved::Records(ref r) if r.len() == 1));

        let root = default_resolver("name")(context(None)).await.unwrap();
        assert_eq!(root, Resolved::null());
    }
}
