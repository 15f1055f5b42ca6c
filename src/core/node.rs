//! Schema nodes consumed by the resolution engine
//!
//! The engine does not parse schema text itself: it consumes a
//! `graphql_parser::schema::Document` and converts it into an owned,
//! read-only [`SchemaDocument`]. Type extensions are merged into their base
//! type during conversion.

use crate::core::directive::{ArgValue, Directive};
use crate::core::error::{DefinitionError, EngineError};
use graphql_parser::schema::{
    Definition, Document, EnumValue, Field, InputValue, Type, TypeDefinition, TypeExtension,
    parse_schema,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Names of the scalars every schema provides
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Kind of a type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl NodeKind {
    /// Whether values of this kind have a selection set
    pub fn is_composite(&self) -> bool {
        matches!(self, NodeKind::Object | NodeKind::Interface | NodeKind::Union)
    }

    /// Whether the concrete type must be resolved per record
    pub fn is_abstract(&self) -> bool {
        matches!(self, NodeKind::Interface | NodeKind::Union)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Object => "object type",
            NodeKind::Interface => "interface",
            NodeKind::Union => "union",
            NodeKind::Enum => "enum",
            NodeKind::InputObject => "input object",
        };
        write!(f, "{}", name)
    }
}

/// Reference to a type, with list and non-null wrappers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn from_ast(ty: &Type<'_, String>) -> Self {
        match ty {
            Type::NamedType(name) => TypeRef::Named(name.clone()),
            Type::ListType(inner) => TypeRef::List(Box::new(Self::from_ast(inner))),
            Type::NonNullType(inner) => TypeRef::NonNull(Box::new(Self::from_ast(inner))),
        }
    }

    /// The innermost named type
    pub fn named(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named(),
        }
    }

    /// Whether the type is a list once non-null wrappers are removed
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::Named(_) => false,
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// An argument definition on a field
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentNode {
    pub name: String,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
}

impl ArgumentNode {
    fn from_ast(input: &InputValue<'_, String>) -> Self {
        Self {
            name: input.name.clone(),
            ty: TypeRef::from_ast(&input.value_type),
            default_value: input
                .default_value
                .as_ref()
                .map(|v| ArgValue::from_ast(v).to_json()),
            directives: input.directives.iter().map(Directive::from_ast).collect(),
        }
    }
}

/// A field definition of an object, interface or input type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentNode>,
    pub ty: TypeRef,
    pub directives: Vec<Directive>,
}

impl FieldNode {
    fn from_ast(field: &Field<'_, String>) -> Self {
        Self {
            name: field.name.clone(),
            description: field.description.clone(),
            arguments: field.arguments.iter().map(ArgumentNode::from_ast).collect(),
            ty: TypeRef::from_ast(&field.field_type),
            directives: field.directives.iter().map(Directive::from_ast).collect(),
        }
    }

    fn from_input(input: &InputValue<'_, String>) -> Self {
        Self {
            name: input.name.clone(),
            description: input.description.clone(),
            arguments: Vec::new(),
            ty: TypeRef::from_ast(&input.value_type),
            directives: input.directives.iter().map(Directive::from_ast).collect(),
        }
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }
}

/// An enum value definition
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueNode {
    pub name: String,
    pub directives: Vec<Directive>,
}

impl EnumValueNode {
    fn from_ast(value: &EnumValue<'_, String>) -> Self {
        Self {
            name: value.name.clone(),
            directives: value.directives.iter().map(Directive::from_ast).collect(),
        }
    }
}

/// A type definition together with its attached directives
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub name: String,
    pub kind: NodeKind,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    /// Fields of objects, interfaces and input objects
    pub fields: Vec<Arc<FieldNode>>,
    /// Interfaces implemented by an object type
    pub interfaces: Vec<String>,
    /// Members of a union
    pub members: Vec<String>,
    /// Values of an enum
    pub values: Vec<EnumValueNode>,
}

impl TypeNode {
    fn new(name: &str, kind: NodeKind, description: Option<&String>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.cloned(),
            directives: Vec::new(),
            fields: Vec::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            values: Vec::new(),
        }
    }

    fn from_ast(definition: &TypeDefinition<'_, String>) -> Self {
        match definition {
            TypeDefinition::Scalar(scalar) => {
                let mut node = Self::new(&scalar.name, NodeKind::Scalar, scalar.description.as_ref());
                node.directives = scalar.directives.iter().map(Directive::from_ast).collect();
                node
            }
            TypeDefinition::Object(object) => {
                let mut node = Self::new(&object.name, NodeKind::Object, object.description.as_ref());
                node.directives = object.directives.iter().map(Directive::from_ast).collect();
                node.fields = object
                    .fields
                    .iter()
                    .map(|f| Arc::new(FieldNode::from_ast(f)))
                    .collect();
                node.interfaces = object.implements_interfaces.clone();
                node
            }
            TypeDefinition::Interface(interface) => {
                let mut node = Self::new(
                    &interface.name,
                    NodeKind::Interface,
                    interface.description.as_ref(),
                );
                node.directives = interface.directives.iter().map(Directive::from_ast).collect();
                node.fields = interface
                    .fields
                    .iter()
                    .map(|f| Arc::new(FieldNode::from_ast(f)))
                    .collect();
                node
            }
            TypeDefinition::Union(union) => {
                let mut node = Self::new(&union.name, NodeKind::Union, union.description.as_ref());
                node.directives = union.directives.iter().map(Directive::from_ast).collect();
                node.members = union.types.clone();
                node
            }
            TypeDefinition::Enum(enumeration) => {
                let mut node = Self::new(
                    &enumeration.name,
                    NodeKind::Enum,
                    enumeration.description.as_ref(),
                );
                node.directives = enumeration
                    .directives
                    .iter()
                    .map(Directive::from_ast)
                    .collect();
                node.values = enumeration.values.iter().map(EnumValueNode::from_ast).collect();
                node
            }
            TypeDefinition::InputObject(input) => {
                let mut node = Self::new(
                    &input.name,
                    NodeKind::InputObject,
                    input.description.as_ref(),
                );
                node.directives = input.directives.iter().map(Directive::from_ast).collect();
                node.fields = input
                    .fields
                    .iter()
                    .map(|f| Arc::new(FieldNode::from_input(f)))
                    .collect();
                node
            }
        }
    }

    fn extend(&mut self, extension: &TypeExtension<'_, String>) {
        match extension {
            TypeExtension::Scalar(ext) => {
                self.directives
                    .extend(ext.directives.iter().map(Directive::from_ast));
            }
            TypeExtension::Object(ext) => {
                self.directives
                    .extend(ext.directives.iter().map(Directive::from_ast));
                self.fields
                    .extend(ext.fields.iter().map(|f| Arc::new(FieldNode::from_ast(f))));
                self.interfaces.extend(ext.implements_interfaces.iter().cloned());
            }
            TypeExtension::Interface(ext) => {
                self.directives
                    .extend(ext.directives.iter().map(Directive::from_ast));
                self.fields
                    .extend(ext.fields.iter().map(|f| Arc::new(FieldNode::from_ast(f))));
            }
            TypeExtension::Union(ext) => {
                self.directives
                    .extend(ext.directives.iter().map(Directive::from_ast));
                self.members.extend(ext.types.iter().cloned());
            }
            TypeExtension::Enum(ext) => {
                self.directives
                    .extend(ext.directives.iter().map(Directive::from_ast));
                self.values
                    .extend(ext.values.iter().map(EnumValueNode::from_ast));
            }
            TypeExtension::InputObject(ext) => {
                self.directives
                    .extend(ext.directives.iter().map(Directive::from_ast));
                self.fields
                    .extend(ext.fields.iter().map(|f| Arc::new(FieldNode::from_input(f))));
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&Arc<FieldNode>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }
}

fn extension_name<'a>(extension: &'a TypeExtension<'_, String>) -> &'a str {
    match extension {
        TypeExtension::Scalar(ext) => &ext.name,
        TypeExtension::Object(ext) => &ext.name,
        TypeExtension::Interface(ext) => &ext.name,
        TypeExtension::Union(ext) => &ext.name,
        TypeExtension::Enum(ext) => &ext.name,
        TypeExtension::InputObject(ext) => &ext.name,
    }
}

/// A parsed schema: type definitions in declaration order plus root type names
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub types: IndexMap<String, TypeNode>,
    pub query_type: String,
    pub mutation_type: Option<String>,
}

impl SchemaDocument {
    /// Parse SDL with `graphql-parser` and convert it
    pub fn parse(sdl: &str) -> Result<Self, EngineError> {
        let document = parse_schema::<String>(sdl).map_err(|e| DefinitionError::InvalidSchema {
            message: e.to_string(),
        })?;
        Ok(Self::from_ast(&document)?)
    }

    /// Convert an already parsed schema document
    pub fn from_ast(document: &Document<'_, String>) -> Result<Self, DefinitionError> {
        let mut types: IndexMap<String, TypeNode> = IndexMap::new();
        let mut query_type = None;
        let mut mutation_type = None;

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema) => {
                    query_type = schema.query.clone();
                    mutation_type = schema.mutation.clone();
                }
                Definition::TypeDefinition(type_definition) => {
                    let node = TypeNode::from_ast(type_definition);
                    if types.contains_key(&node.name) {
                        return Err(DefinitionError::DuplicateType {
                            type_name: node.name,
                        });
                    }
                    types.insert(node.name.clone(), node);
                }
                Definition::TypeExtension(_) | Definition::DirectiveDefinition(_) => {}
            }
        }

        // Extensions may appear before the type they extend
        for definition in &document.definitions {
            if let Definition::TypeExtension(extension) = definition {
                let name = extension_name(extension);
                let node = types
                    .get_mut(name)
                    .ok_or_else(|| DefinitionError::UnknownType {
                        type_name: name.to_string(),
                        referenced_by: format!("extend {}", name),
                    })?;
                node.extend(extension);
            }
        }

        let mutation_type =
            mutation_type.or_else(|| types.contains_key("Mutation").then(|| "Mutation".to_string()));

        Ok(Self {
            types,
            query_type: query_type.unwrap_or_else(|| "Query".to_string()),
            mutation_type,
        })
    }

    pub fn get(&self, name: &str) -> Option<&TypeNode> {
        self.types.get(name)
    }

    /// Whether the name is a defined type or a built-in scalar
    pub fn is_defined(&self, name: &str) -> bool {
        self.types.contains_key(name) || BUILTIN_SCALARS.contains(&name)
    }

    /// Whether a field belongs to the query or mutation root type
    pub fn is_root_type(&self, name: &str) -> bool {
        self.query_type == name || self.mutation_type.as_deref() == Some(name)
    }

    /// Concrete object types that can stand in for `name`
    pub fn possible_types(&self, name: &str) -> Vec<String> {
        match self.types.get(name) {
            Some(node) if node.kind == NodeKind::Union => node.members.clone(),
            Some(node) if node.kind == NodeKind::Interface => self
                .types
                .values()
                .filter(|t| t.kind == NodeKind::Object && t.interfaces.iter().any(|i| i == name))
                .map(|t| t.name.clone())
                .collect(),
            Some(node) if node.kind == NodeKind::Object => vec![node.name.clone()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDL: &str = r#"
        type Query {
            users(first: Int = 10): [User!]! @all
        }

        interface Node {
            id: ID!
        }

        type User implements Node {
            id: ID!
            name: String
        }

        extend type User {
            email: String
        }

        union SearchResult = User

        enum Status { ACTIVE INACTIVE }
    "#;

    #[test]
    fn test_parse_schema_document() {
        let doc = SchemaDocument::parse(SDL).unwrap();

        assert_eq!(doc.query_type, "Query");
        assert_eq!(doc.mutation_type, None);
        assert_eq!(doc.types.len(), 5);

        let query = doc.get("Query").unwrap();
        let users = query.field("users").unwrap();
        assert_eq!(users.ty.to_string(), "[User!]!");
        assert_eq!(users.ty.named(), "User");
        assert!(users.ty.is_list());
        assert_eq!(users.arguments[0].default_value, Some(serde_json::json!(10)));
        assert_eq!(users.directives[0].name, "all");
    }

    #[test]
    fn test_extension_merges_fields() {
        let doc = SchemaDocument::parse(SDL).unwrap();
        let user = doc.get("User").unwrap();
        let names: Vec<_> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "email"]);
    }

    #[test]
    fn test_possible_types() {
        let doc = SchemaDocument::parse(SDL).unwrap();
        assert_eq!(doc.possible_types("Node"), vec!["User".to_string()]);
        assert_eq!(doc.possible_types("SearchResult"), vec!["User".to_string()]);
        assert_eq!(doc.possible_types("User"), vec!["User".to_string()]);
        assert!(doc.possible_types("Status").is_empty());
    }

    #[test]
    fn test_duplicate_type_fails() {
        let err = SchemaDocument::parse("type Query { a: Int } type Query { b: Int }").unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_TYPE");
    }

    #[test]
    fn test_extension_of_unknown_type_fails() {
        let err = SchemaDocument::parse("type Query { a: Int } extend type Ghost { b: Int }")
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_TYPE");
    }

    #[test]
    fn test_schema_definition_roots() {
        let doc = SchemaDocument::parse(
            "schema { query: Root mutation: Writes } type Root { a: Int } type Writes { b: Int }",
        )
        .unwrap();
        assert_eq!(doc.query_type, "Root");
        assert_eq!(doc.mutation_type.as_deref(), Some("Writes"));
        assert!(doc.is_root_type("Writes"));
        assert!(!doc.is_root_type("Query"));
    }
}
