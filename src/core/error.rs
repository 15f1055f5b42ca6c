//! Typed error handling for the eager-loading engine
//!
//! Errors fall in two groups. Build-time errors abort schema compilation
//! before any query is served, query-time errors become per-field GraphQL
//! errors attached to the response path that triggered them.
//!
//! # Error Categories
//!
//! - [`DirectiveResolutionError`]: a directive or class could not be bound (build time)
//! - [`DefinitionError`]: a directive or type is used in an invalid position (build time)
//! - [`LoadError`]: the data store failed a batched relation load (query time)
//! - [`ExecutionError`]: the query document itself could not be executed (query time)
//!
//! # Example
//!
//! ```rust,ignore
//! use this_eager::prelude::*;
//!
//! match SchemaBuilder::new(EngineConfig::default()).build_sdl(sdl) {
//!     Ok(schema) => serve(schema),
//!     Err(EngineError::Definition(DefinitionError::RootFieldRelation { field, .. })) => {
//!         eprintln!("relation directive on root field {}", field);
//!     }
//!     Err(e) => eprintln!("schema build failed: {}", e),
//! }
//! ```

use std::fmt;

/// The main error type of the engine
#[derive(Debug)]
pub enum EngineError {
    /// A directive handler or class binding could not be resolved
    Resolution(DirectiveResolutionError),

    /// A directive or type is structurally invalid where it is declared
    Definition(DefinitionError),

    /// A batched relation load failed
    Load(LoadError),

    /// The query could not be executed
    Execution(ExecutionError),

    /// Internal engine errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Resolution(e) => write!(f, "{}", e),
            EngineError::Definition(e) => write!(f, "{}", e),
            EngineError::Load(e) => write!(f, "{}", e),
            EngineError::Execution(e) => write!(f, "{}", e),
            EngineError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Resolution(e) => Some(e),
            EngineError::Definition(e) => Some(e),
            EngineError::Load(e) => Some(e),
            EngineError::Execution(e) => Some(e),
            EngineError::Internal(_) => None,
        }
    }
}

impl EngineError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Resolution(e) => e.error_code(),
            EngineError::Definition(e) => e.error_code(),
            EngineError::Load(e) => e.error_code(),
            EngineError::Execution(e) => e.error_code(),
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is raised while compiling the schema
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            EngineError::Resolution(_) | EngineError::Definition(_)
        )
    }
}

// =============================================================================
// Directive Resolution Errors
// =============================================================================

/// The capability a class is being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Directive handler factory
    Directive,
    /// Scalar type implementation
    Scalar,
    /// Union type resolver
    Union,
    /// Interface type resolver
    Interface,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Directive => write!(f, "directive"),
            Capability::Scalar => write!(f, "scalar"),
            Capability::Union => write!(f, "union"),
            Capability::Interface => write!(f, "interface"),
        }
    }
}

/// A named directive, class or method could not be bound
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveResolutionError {
    /// Neither the namespaced nor the bare class name is registered
    ClassNotFound {
        capability: Capability,
        class: String,
        node: String,
    },

    /// `@method` references a method that is not registered for the type
    MethodNotFound { type_name: String, method: String },
}

impl fmt::Display for DirectiveResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveResolutionError::ClassNotFound {
                capability,
                class,
                node,
            } => {
                write!(
                    f,
                    "Unable to find class [{}] assigned to {} {}",
                    class, node, capability
                )
            }
            DirectiveResolutionError::MethodNotFound { type_name, method } => {
                write!(
                    f,
                    "Method '{}' is not registered for type '{}'",
                    method, type_name
                )
            }
        }
    }
}

impl std::error::Error for DirectiveResolutionError {}

impl DirectiveResolutionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectiveResolutionError::ClassNotFound { .. } => "CLASS_NOT_FOUND",
            DirectiveResolutionError::MethodNotFound { .. } => "METHOD_NOT_FOUND",
        }
    }
}

impl From<DirectiveResolutionError> for EngineError {
    fn from(err: DirectiveResolutionError) -> Self {
        EngineError::Resolution(err)
    }
}

// =============================================================================
// Definition Errors
// =============================================================================

/// A schema element is structurally invalid
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// A relation directive is declared on a root field with no parent to load onto
    RootFieldRelation { directive: String, field: String },

    /// A directive is declared where none of its roles apply
    InvalidLocation {
        directive: String,
        node: String,
        location: String,
    },

    /// A directive argument is missing or has the wrong shape
    InvalidArgument {
        directive: String,
        node: String,
        message: String,
    },

    /// More than one directive tries to provide the field resolver
    MultipleResolvers { field: String, directives: Vec<String> },

    /// A type reference points to a type that is not defined
    UnknownType {
        type_name: String,
        referenced_by: String,
    },

    /// The schema has no query root type
    MissingQueryType { type_name: String },

    /// A type is defined twice
    DuplicateType { type_name: String },

    /// The schema document could not be parsed or is otherwise malformed
    InvalidSchema { message: String },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::RootFieldRelation { directive, field } => {
                write!(
                    f,
                    "Can not use @{} on root field '{}': there is no parent object to load relations onto",
                    directive, field
                )
            }
            DefinitionError::InvalidLocation {
                directive,
                node,
                location,
            } => {
                write!(
                    f,
                    "Directive @{} on '{}' can not be used on {}",
                    directive, node, location
                )
            }
            DefinitionError::InvalidArgument {
                directive,
                node,
                message,
            } => {
                write!(
                    f,
                    "Invalid arguments for @{} on '{}': {}",
                    directive, node, message
                )
            }
            DefinitionError::MultipleResolvers { field, directives } => {
                write!(
                    f,
                    "Field '{}' can only have one resolver directive, found: {}",
                    field,
                    directives
                        .iter()
                        .map(|d| format!("@{}", d))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            DefinitionError::UnknownType {
                type_name,
                referenced_by,
            } => {
                write!(
                    f,
                    "Type '{}' referenced by '{}' is not defined",
                    type_name, referenced_by
                )
            }
            DefinitionError::MissingQueryType { type_name } => {
                write!(f, "Query root type '{}' is not defined", type_name)
            }
            DefinitionError::DuplicateType { type_name } => {
                write!(f, "Type '{}' is defined more than once", type_name)
            }
            DefinitionError::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

impl DefinitionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DefinitionError::RootFieldRelation { .. } => "ROOT_FIELD_RELATION",
            DefinitionError::InvalidLocation { .. } => "INVALID_DIRECTIVE_LOCATION",
            DefinitionError::InvalidArgument { .. } => "INVALID_DIRECTIVE_ARGUMENT",
            DefinitionError::MultipleResolvers { .. } => "MULTIPLE_RESOLVERS",
            DefinitionError::UnknownType { .. } => "UNKNOWN_TYPE",
            DefinitionError::MissingQueryType { .. } => "MISSING_QUERY_TYPE",
            DefinitionError::DuplicateType { .. } => "DUPLICATE_TYPE",
            DefinitionError::InvalidSchema { .. } => "INVALID_SCHEMA",
        }
    }
}

impl From<DefinitionError> for EngineError {
    fn from(err: DefinitionError) -> Self {
        EngineError::Definition(err)
    }
}

// =============================================================================
// Load Errors
// =============================================================================

/// A batched relation load failed
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// The model has no relation with this name
    UnknownRelation { model: String, relation: String },

    /// A record points at a related record that does not exist
    BrokenReference {
        model: String,
        relation: String,
        key: String,
    },

    /// The store failed for another reason
    Store { message: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnknownRelation { model, relation } => {
                write!(
                    f,
                    "Relation '{}' is not defined on model '{}'",
                    relation, model
                )
            }
            LoadError::BrokenReference {
                model,
                relation,
                key,
            } => {
                write!(
                    f,
                    "Relation '{}' of model '{}' references missing record '{}'",
                    relation, model, key
                )
            }
            LoadError::Store { message } => write!(f, "Store error: {}", message),
        }
    }
}

impl std::error::Error for LoadError {}

impl LoadError {
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::UnknownRelation { .. } => "UNKNOWN_RELATION",
            LoadError::BrokenReference { .. } => "BROKEN_REFERENCE",
            LoadError::Store { .. } => "STORE_ERROR",
        }
    }
}

impl From<LoadError> for EngineError {
    fn from(err: LoadError) -> Self {
        EngineError::Load(err)
    }
}

// =============================================================================
// Execution Errors
// =============================================================================

/// A query could not be executed
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// The query document failed to parse
    Parse { message: String },

    /// The document contains no operation
    NoOperation,

    /// The requested operation name does not exist in the document
    UnknownOperation { name: String },

    /// The selected field does not exist on the type
    UnknownField { type_name: String, field: String },

    /// A record could not be mapped to a concrete type of an abstract type
    UnresolvedType { abstract_type: String, model: String },

    /// A variable is used but was not provided and has no default
    MissingVariable { name: String },

    /// A fragment references an unknown fragment
    UnknownFragment { name: String },

    /// Fragments spread each other in a cycle
    FragmentCycle { name: String },

    /// Operation kind is not supported
    UnsupportedOperation { kind: String },

    /// A non-null field resolved to null
    NonNullField { type_name: String, field: String },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Parse { message } => write!(f, "Failed to parse query: {}", message),
            ExecutionError::NoOperation => write!(f, "No operation found in query"),
            ExecutionError::UnknownOperation { name } => {
                write!(f, "Unknown operation named '{}'", name)
            }
            ExecutionError::UnknownField { type_name, field } => {
                write!(f, "Cannot query field '{}' on type '{}'", field, type_name)
            }
            ExecutionError::UnresolvedType {
                abstract_type,
                model,
            } => {
                write!(
                    f,
                    "Could not resolve a concrete type of '{}' for model '{}'",
                    abstract_type, model
                )
            }
            ExecutionError::MissingVariable { name } => {
                write!(f, "Variable '${}' was not provided", name)
            }
            ExecutionError::UnknownFragment { name } => {
                write!(f, "Unknown fragment '{}'", name)
            }
            ExecutionError::FragmentCycle { name } => {
                write!(f, "Fragment '{}' spreads itself", name)
            }
            ExecutionError::UnsupportedOperation { kind } => {
                write!(f, "{} operations are not supported", kind)
            }
            ExecutionError::NonNullField { type_name, field } => {
                write!(f, "Cannot return null for non-nullable field '{}.{}'", type_name, field)
            }
        }
    }
}

impl std::error::Error for ExecutionError {}

impl ExecutionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ExecutionError::Parse { .. } => "GRAPHQL_PARSE_FAILED",
            ExecutionError::NoOperation => "NO_OPERATION",
            ExecutionError::UnknownOperation { .. } => "UNKNOWN_OPERATION",
            ExecutionError::UnknownField { .. } => "UNKNOWN_FIELD",
            ExecutionError::UnresolvedType { .. } => "UNRESOLVED_TYPE",
            ExecutionError::MissingVariable { .. } => "MISSING_VARIABLE",
            ExecutionError::UnknownFragment { .. } => "UNKNOWN_FRAGMENT",
            ExecutionError::FragmentCycle { .. } => "FRAGMENT_CYCLE",
            ExecutionError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            ExecutionError::NonNullField { .. } => "NON_NULL_VIOLATION",
        }
    }
}

impl From<ExecutionError> for EngineError {
    fn from(err: ExecutionError) -> Self {
        EngineError::Execution(err)
    }
}
