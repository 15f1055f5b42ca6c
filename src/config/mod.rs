//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Namespaces searched before bare class names during convention lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamespaceConfig {
    /// Namespace of scalar implementations (e.g., "app::scalars")
    #[serde(default)]
    pub scalars: Option<String>,

    /// Namespace of union type resolvers
    #[serde(default)]
    pub unions: Option<String>,

    /// Namespace of interface type resolvers
    #[serde(default)]
    pub interfaces: Option<String>,

    /// Namespaces of custom directive handlers, searched in order
    #[serde(default)]
    pub directives: Vec<String>,
}

/// Kind of a relation between two models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Foreign key on the related model, many related records
    HasMany,
    /// Foreign key on the related model, at most one related record
    HasOne,
    /// Foreign key on this model
    BelongsTo,
    /// `{name}_type` + `{name}_id` on this model point at any model
    MorphTo,
    /// `{morph_name}_type` + `{morph_name}_id` on the related model point back
    MorphMany,
}

/// Definition of one relation of a model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationDefinition {
    /// Relation name (e.g., "posts")
    pub name: String,

    pub kind: RelationKind,

    /// Related model; not used by `morph_to`
    #[serde(default)]
    pub target: Option<String>,

    /// Foreign key column; defaults depend on the kind
    #[serde(default)]
    pub foreign_key: Option<String>,

    /// Key on the owning side (defaults to "id")
    #[serde(default)]
    pub owner_key: Option<String>,

    /// Morph name of `morph_many` (e.g., "imageable")
    #[serde(default)]
    pub morph_name: Option<String>,
}

/// Configuration for a model and its relations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Model name, equal to its GraphQL object type name
    pub name: String,

    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

/// Complete configuration of the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub namespaces: NamespaceConfig,

    /// Explicit directive name -> handler class overrides
    #[serde(default)]
    pub directive_bindings: HashMap<String, String>,

    /// Models known to the store
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Find a relation definition of a model
    pub fn find_relation(&self, model: &str, relation: &str) -> Option<&RelationDefinition> {
        self.models
            .iter()
            .find(|m| m.name == model)
            .and_then(|m| m.relations.iter().find(|r| r.name == relation))
    }

    /// Create a default configuration for testing
    ///
    /// Users own tasks and posts, posts have comments, activities point at
    /// a post or a task, posts and tasks carry images.
    pub fn default_config() -> Self {
        fn relation(name: &str, kind: RelationKind, target: Option<&str>) -> RelationDefinition {
            RelationDefinition {
                name: name.to_string(),
                kind,
                target: target.map(str::to_string),
                foreign_key: None,
                owner_key: None,
                morph_name: None,
            }
        }

        let images = RelationDefinition {
            morph_name: Some("imageable".to_string()),
            ..relation("images", RelationKind::MorphMany, Some("Image"))
        };

        Self {
            namespaces: NamespaceConfig {
                scalars: Some("app::scalars".to_string()),
                unions: Some("app::unions".to_string()),
                interfaces: Some("app::interfaces".to_string()),
                directives: vec!["app::directives".to_string()],
            },
            directive_bindings: HashMap::new(),
            models: vec![
                ModelConfig {
                    name: "User".to_string(),
                    relations: vec![
                        relation("tasks", RelationKind::HasMany, Some("Task")),
                        relation("posts", RelationKind::HasMany, Some("Post")),
                    ],
                },
                ModelConfig {
                    name: "Post".to_string(),
                    relations: vec![
                        relation("user", RelationKind::BelongsTo, Some("User")),
                        relation("comments", RelationKind::HasMany, Some("Comment")),
                        relation("task", RelationKind::BelongsTo, Some("Task")),
                        images.clone(),
                    ],
                },
                ModelConfig {
                    name: "Task".to_string(),
                    relations: vec![
                        relation("user", RelationKind::BelongsTo, Some("User")),
                        relation("post", RelationKind::HasOne, Some("Post")),
                        images,
                    ],
                },
                ModelConfig {
                    name: "Comment".to_string(),
                    relations: vec![relation("post", RelationKind::BelongsTo, Some("Post"))],
                },
                ModelConfig {
                    name: "Activity".to_string(),
                    relations: vec![relation("content", RelationKind::MorphTo, None)],
                },
                ModelConfig {
                    name: "Image".to_string(),
                    relations: Vec::new(),
                },
            ],
        }
    }
}
