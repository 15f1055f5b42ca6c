//! The executable schema produced by the builder
//!
//! Every type of the schema document is bound to exactly one
//! [`ExecutableType`], every object field to one resolver function plus the
//! relation paths its directives asked to eager load.

use crate::core::record::Record;
use crate::core::node::TypeRef;
use crate::core::relation::RelationPath;
use crate::core::store::ModelStore;
use crate::directives::handler::DirectiveHandler;
use crate::schema::scalars::ScalarType;
use anyhow::{Result, anyhow, bail};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Future returned by a field resolver
pub type FieldFuture = BoxFuture<'static, Result<Resolved>>;

/// A field resolver
pub type FieldResolverFn = Arc<dyn Fn(ResolverContext) -> FieldFuture + Send + Sync>;

/// Value produced by a field resolver
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Leaf value, or a JSON object/array for composite fields
    Value(Value),
    /// A single record, `None` for null
    Record(Option<Record>),
    /// A list of records
    Records(Vec<Record>),
}

impl Resolved {
    pub fn null() -> Self {
        Resolved::Value(Value::Null)
    }

    /// Apply `f` to every string of a leaf value
    pub fn map_strings(self, f: impl Fn(&str) -> String) -> Self {
        fn walk(value: Value, f: &dyn Fn(&str) -> String) -> Value {
            match value {
                Value::String(s) => Value::String(f(&s)),
                Value::Array(items) => Value::Array(items.into_iter().map(|v| walk(v, f)).collect()),
                other => other,
            }
        }

        match self {
            Resolved::Value(value) => Resolved::Value(walk(value, &f)),
            other => other,
        }
    }
}

/// Coerced arguments of a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverArgs {
    args: IndexMap<String, Value>,
}

impl ResolverArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            args: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Gets an argument as a specific type
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.args
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Gets a required argument, returning an error if not found
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .args
            .get(name)
            .ok_or_else(|| anyhow!("Missing required argument '{}'", name))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow!("Invalid argument '{}': {}", name, e))
    }

    pub fn all(&self) -> &IndexMap<String, Value> {
        &self.args
    }
}

/// Static information about the field being resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveInfo {
    pub field_name: String,
    pub parent_type: String,
    pub return_type: TypeRef,
}

/// Everything a resolver receives
#[derive(Clone)]
pub struct ResolverContext {
    /// The record owning the field, `None` on root fields
    pub parent: Option<Arc<Record>>,
    pub args: ResolverArgs,
    pub info: Arc<ResolveInfo>,
    pub store: Arc<dyn ModelStore>,
}

impl ResolverContext {
    /// The parent record, an error on root fields
    pub fn parent(&self) -> Result<&Record> {
        self.parent.as_deref().ok_or_else(|| {
            anyhow!(
                "Field '{}.{}' has no parent record",
                self.info.parent_type,
                self.info.field_name
            )
        })
    }
}

/// Maps a record to the concrete object type of an interface or union
pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, record: &Record) -> Option<String>;
}

/// Default discriminator: the model name of the record
pub struct ModelTypeResolver;

impl TypeResolver for ModelTypeResolver {
    fn resolve_type(&self, record: &Record) -> Option<String> {
        Some(record.model().to_string())
    }
}

/// Type resolver backed by a closure
pub struct FnTypeResolver<F>(pub F);

impl<F> TypeResolver for FnTypeResolver<F>
where
    F: Fn(&Record) -> Option<String> + Send + Sync,
{
    fn resolve_type(&self, record: &Record) -> Option<String> {
        (self.0)(record)
    }
}

/// An argument of an executable field
#[derive(Clone)]
pub struct ExecutableArgument {
    pub name: String,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
    /// Argument transformers, applied in declaration order
    pub transformers: Vec<Arc<dyn DirectiveHandler>>,
}

impl fmt::Debug for ExecutableArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableArgument")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("default_value", &self.default_value)
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

/// A field of an object type, bound to its resolver
#[derive(Clone)]
pub struct ExecutableField {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: Vec<ExecutableArgument>,
    pub resolver: FieldResolverFn,
    /// Relation paths eager loaded on the collection owning this field
    pub eager_loads: Vec<RelationPath>,
    pub deprecation: Option<String>,
}

impl fmt::Debug for ExecutableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableField")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("eager_loads", &self.eager_loads)
            .field("deprecation", &self.deprecation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, ExecutableField>,
    pub interfaces: Vec<String>,
    /// Field identifying a record of this type
    pub cache_key: Option<String>,
}

/// Interface or union with its discriminator
#[derive(Clone)]
pub struct AbstractType {
    pub name: String,
    pub possible_types: Vec<String>,
    pub resolver: Arc<dyn TypeResolver>,
}

impl fmt::Debug for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractType")
            .field("name", &self.name)
            .field("possible_types", &self.possible_types)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    /// Value name -> internal value
    pub values: IndexMap<String, Value>,
    pub deprecated: IndexMap<String, String>,
}

impl EnumType {
    /// Internal value -> value name
    pub fn serialize(&self, value: &Value) -> Result<Value> {
        if let Some((name, _)) = self.values.iter().find(|(_, internal)| *internal == value) {
            return Ok(Value::String(name.clone()));
        }
        match value {
            Value::String(s) if self.values.contains_key(s) => Ok(value.clone()),
            _ => bail!("Enum '{}' cannot represent value: {}", self.name, value),
        }
    }

    /// Value name -> internal value
    pub fn parse_value(&self, value: &Value) -> Result<Value> {
        value
            .as_str()
            .and_then(|name| self.values.get(name))
            .cloned()
            .ok_or_else(|| anyhow!("Value {} does not exist in '{}' enum", value, self.name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: IndexMap<String, TypeRef>,
}

/// A schema type bound to its runtime behavior
#[derive(Clone)]
pub enum ExecutableType {
    Scalar(Arc<dyn ScalarType>),
    Object(ObjectType),
    Interface(AbstractType),
    Union(AbstractType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl ExecutableType {
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ExecutableType::Object(_) | ExecutableType::Interface(_) | ExecutableType::Union(_)
        )
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, ExecutableType::Interface(_) | ExecutableType::Union(_))
    }
}

impl fmt::Debug for ExecutableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutableType::Scalar(_) => write!(f, "Scalar"),
            ExecutableType::Object(o) => o.fmt(f),
            ExecutableType::Interface(a) | ExecutableType::Union(a) => a.fmt(f),
            ExecutableType::Enum(e) => e.fmt(f),
            ExecutableType::InputObject(i) => i.fmt(f),
        }
    }
}

/// The compiled schema; immutable once built
#[derive(Debug, Clone)]
pub struct ExecutableSchema {
    types: IndexMap<String, ExecutableType>,
    query_type: String,
    mutation_type: Option<String>,
}

impl ExecutableSchema {
    pub(crate) fn new(
        types: IndexMap<String, ExecutableType>,
        query_type: String,
        mutation_type: Option<String>,
    ) -> Self {
        Self {
            types,
            query_type,
            mutation_type,
        }
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn get_type(&self, name: &str) -> Option<&ExecutableType> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = (&String, &ExecutableType)> {
        self.types.iter()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(ExecutableType::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&ExecutableField> {
        self.object(type_name).and_then(|o| o.fields.get(field))
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(ExecutableType::is_abstract)
    }

    pub fn is_composite(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(ExecutableType::is_composite)
    }

    /// Concrete object types that can stand in for `name`
    pub fn possible_types(&self, name: &str) -> Vec<String> {
        match self.types.get(name) {
            Some(ExecutableType::Object(object)) => vec![object.name.clone()],
            Some(ExecutableType::Interface(a)) | Some(ExecutableType::Union(a)) => {
                a.possible_types.clone()
            }
            _ => Vec::new(),
        }
    }

    /// Concrete type of a record resolved as `declared`
    ///
    /// Abstract types ask their type resolver; the answer must be one of
    /// the possible types.
    pub fn concrete_type(&self, declared: &str, record: &Record) -> Option<String> {
        match self.types.get(declared) {
            Some(ExecutableType::Object(object)) => Some(object.name.clone()),
            Some(ExecutableType::Interface(a)) | Some(ExecutableType::Union(a)) => a
                .resolver
                .resolve_type(record)
                .filter(|concrete| a.possible_types.contains(concrete)),
            _ => None,
        }
    }

    /// Field used as the cache key of records of an object type
    pub fn cache_key(&self, type_name: &str) -> Option<&str> {
        self.object(type_name).and_then(|o| o.cache_key.as_deref())
    }

    /// Apply defaults, input coercion and argument transformers
    pub fn coerce_arguments(
        &self,
        field: &ExecutableField,
        provided: &IndexMap<String, Value>,
    ) -> Result<ResolverArgs> {
        let mut args = IndexMap::new();

        for argument in &field.arguments {
            let value = match provided.get(&argument.name) {
                Some(value) => Some(self.parse_input(&argument.ty, value)?),
                None => argument.default_value.clone(),
            };

            let Some(mut value) = value else {
                if argument.ty.is_non_null() {
                    bail!(
                        "Argument '{}' of type '{}' is required",
                        argument.name,
                        argument.ty
                    );
                }
                continue;
            };

            for transformer in &argument.transformers {
                value = transformer.transform_argument(value);
            }
            args.insert(argument.name.clone(), value);
        }

        Ok(ResolverArgs { args })
    }

    fn parse_input(&self, ty: &TypeRef, value: &Value) -> Result<Value> {
        match (ty, value) {
            (TypeRef::NonNull(_), Value::Null) => bail!("Expected non-null value of type '{}'", ty),
            (TypeRef::NonNull(inner), _) => self.parse_input(inner, value),
            (_, Value::Null) => Ok(Value::Null),
            (TypeRef::List(inner), Value::Array(items)) => items
                .iter()
                .map(|item| self.parse_input(inner, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            // A single value is coerced into a one-element list
            (TypeRef::List(inner), _) => Ok(Value::Array(vec![self.parse_input(inner, value)?])),
            (TypeRef::Named(name), _) => match self.types.get(name) {
                Some(ExecutableType::Scalar(scalar)) => scalar.parse_value(value),
                Some(ExecutableType::Enum(enumeration)) => enumeration.parse_value(value),
                _ => Ok(value.clone()),
            },
        }
    }

    /// Serialize a leaf value of the given type
    pub fn serialize_leaf(&self, ty: &TypeRef, value: Value) -> Result<Value> {
        match (ty, value) {
            (_, Value::Null) => Ok(Value::Null),
            (TypeRef::NonNull(inner), value) => self.serialize_leaf(inner, value),
            (TypeRef::List(inner), Value::Array(items)) => items
                .into_iter()
                .map(|item| self.serialize_leaf(inner, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            (TypeRef::List(_), value) => bail!("Expected a list, got {}", value),
            (TypeRef::Named(name), value) => match self.types.get(name) {
                Some(ExecutableType::Scalar(scalar)) => scalar.serialize(&value),
                Some(ExecutableType::Enum(enumeration)) => enumeration.serialize(&value),
                _ => bail!("Type '{}' is not a leaf type", name),
            },
        }
    }
}
