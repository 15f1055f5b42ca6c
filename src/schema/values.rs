//! Values passed through directive pipelines
//!
//! A [`NodeValue`] wraps a type definition while its executable type is
//! being produced, a [`FieldValue`] wraps a field while its resolver is
//! being assembled. Both are owned by the pass that created them and are
//! transformed by value: every setter consumes the value and returns the
//! updated one.

use crate::core::node::{FieldNode, TypeNode};
use crate::core::relation::RelationPath;
use crate::schema::executable::{
    ExecutableArgument, ExecutableField, ExecutableType, FieldResolverFn,
};
use std::sync::Arc;

/// Resolution state of a type definition
pub struct NodeValue {
    node: Arc<TypeNode>,
    ty: Option<ExecutableType>,
    cache_key: Option<String>,
}

impl NodeValue {
    pub fn new(node: Arc<TypeNode>) -> Self {
        Self {
            node,
            ty: None,
            cache_key: None,
        }
    }

    pub fn node(&self) -> &TypeNode {
        &self.node
    }

    pub fn type_name(&self) -> &str {
        &self.node.name
    }

    /// Shared handle on the node, for the fields built from it
    pub fn shared_node(&self) -> Arc<TypeNode> {
        self.node.clone()
    }

    /// The resolved executable type, `None` until a generator or handler set it
    pub fn executable_type(&self) -> Option<&ExecutableType> {
        self.ty.as_ref()
    }

    pub fn has_type(&self) -> bool {
        self.ty.is_some()
    }

    pub fn with_type(mut self, ty: ExecutableType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = Some(cache_key.into());
        self
    }

    /// Finish resolution, returning the executable type
    pub fn into_type(self) -> Option<ExecutableType> {
        self.ty
    }
}

/// Resolution state of a field definition
pub struct FieldValue {
    parent: Arc<TypeNode>,
    field: Arc<FieldNode>,
    root: bool,
    resolver: FieldResolverFn,
    eager_loads: Vec<RelationPath>,
}

impl FieldValue {
    pub fn new(
        parent: Arc<TypeNode>,
        field: Arc<FieldNode>,
        root: bool,
        resolver: FieldResolverFn,
    ) -> Self {
        Self {
            parent,
            field,
            root,
            resolver,
            eager_loads: Vec::new(),
        }
    }

    pub fn parent(&self) -> &TypeNode {
        &self.parent
    }

    pub fn parent_name(&self) -> &str {
        &self.parent.name
    }

    pub fn field(&self) -> &FieldNode {
        &self.field
    }

    pub fn field_name(&self) -> &str {
        &self.field.name
    }

    /// `Type.field`, used in error messages
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.parent.name, self.field.name)
    }

    /// Whether the field belongs to the query or mutation root type
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn resolver(&self) -> &FieldResolverFn {
        &self.resolver
    }

    /// Replace the resolver
    pub fn with_resolver(mut self, resolver: FieldResolverFn) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the resolver with a wrapper around the current one
    pub fn wrap_resolver(mut self, wrap: impl FnOnce(FieldResolverFn) -> FieldResolverFn) -> Self {
        self.resolver = wrap(self.resolver);
        self
    }

    pub fn eager_loads(&self) -> &[RelationPath] {
        &self.eager_loads
    }

    /// Declare a relation path to eager load; duplicates are ignored
    pub fn with_eager_load(mut self, path: RelationPath) -> Self {
        if !self.eager_loads.contains(&path) {
            self.eager_loads.push(path);
        }
        self
    }

    /// Freeze the value into the field of the executable schema
    pub fn into_field(
        self,
        arguments: Vec<ExecutableArgument>,
        deprecation: Option<String>,
    ) -> ExecutableField {
        ExecutableField {
            name: self.field.name.clone(),
            ty: self.field.ty.clone(),
            arguments,
            resolver: self.resolver,
            eager_loads: self.eager_loads,
            deprecation,
        }
    }
}
