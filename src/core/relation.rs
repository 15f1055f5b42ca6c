//! Relation paths and eager-load requirements

use std::fmt;

/// A dot-separated relation path such as `posts.comments`
///
/// Nested paths are kept whole: the store honors dotted-path eager loading,
/// so the planner never splits a path into single-hop loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationPath(String);

impl RelationPath {
    /// Parse a relation path, rejecting empty segments
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        if path.is_empty() || path.split('.').any(|segment| segment.trim().is_empty()) {
            return None;
        }
        Some(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> Vec<&str> {
        self.0.split('.').collect()
    }

    /// The first hop of the path
    pub fn head(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    pub fn is_nested(&self) -> bool {
        self.0.contains('.')
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One relation load the dispatcher must issue for a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadRequirement {
    /// Relation path to eager load
    pub relation: RelationPath,

    /// Concrete model type of the records the relation is loaded onto
    pub model_type: String,

    /// Set when the collection is resolved through a union or interface:
    /// the concrete type this requirement is restricted to
    pub discriminator: Option<String>,
}

impl LoadRequirement {
    pub fn new(relation: RelationPath, model_type: impl Into<String>) -> Self {
        Self {
            relation,
            model_type: model_type.into(),
            discriminator: None,
        }
    }

    /// Restrict the requirement to one concrete type of a polymorphic collection
    pub fn polymorphic(mut self) -> Self {
        self.discriminator = Some(self.model_type.clone());
        self
    }
}

impl fmt::Display for LoadRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(discriminator) => write!(f, "{} on {}", self.relation, discriminator),
            None => write!(f, "{}", self.relation),
        }
    }
}
