//! Relation directives: `@with`, `@hasMany`, `@hasOne`, `@belongsTo`, `@morphTo`

use crate::core::directive::Directive;
use crate::core::error::{DefinitionError, EngineError};
use crate::core::record::Relation;
use crate::core::relation::RelationPath;
use crate::directives::handler::{DirectiveContext, DirectiveHandler, DirectiveRole, FieldNext};
use crate::schema::executable::{FieldFuture, FieldResolverFn, Resolved, ResolverContext};
use crate::schema::values::FieldValue;
use anyhow::bail;
use futures::FutureExt;
use std::sync::Arc;

fn reject_root_field(directive: &str, value: &FieldValue) -> Result<(), EngineError> {
    if value.is_root() {
        return Err(DefinitionError::RootFieldRelation {
            directive: directive.to_string(),
            field: value.qualified_name(),
        }
        .into());
    }
    Ok(())
}

/// `@with(relation: "posts.comments")`
///
/// Eager loads a (possibly nested) relation path on the collection owning
/// the field, leaving the resolver untouched.
pub struct WithDirective {
    relation: RelationPath,
}

impl WithDirective {
    pub fn create(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        let relation = directive
            .require_string("relation")
            .map_err(|e| context.invalid_argument(directive, e))?;
        let relation = RelationPath::parse(&relation).ok_or_else(|| {
            context.invalid_argument(directive, format!("'{}' is not a relation path", relation))
        })?;

        Ok(Arc::new(Self { relation }))
    }
}

impl DirectiveHandler for WithDirective {
    fn name(&self) -> &str {
        "with"
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::RelationLoader]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        reject_root_field(self.name(), &value)?;
        next.run(value.with_eager_load(self.relation.clone()))
    }
}

/// Whether the relation holds one record or many
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// `@hasMany`, `@hasOne`, `@belongsTo` and `@morphTo`
///
/// Eager loads the relation and resolves the field from the loaded data.
/// The relation name defaults to the field name.
pub struct RelationDirective {
    name: &'static str,
    cardinality: Cardinality,
    relation: Option<String>,
}

impl RelationDirective {
    fn create(
        name: &'static str,
        cardinality: Cardinality,
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        let relation = directive
            .string_arg("relation")
            .map_err(|e| context.invalid_argument(directive, e))?;

        if let Some(relation) = &relation
            && (relation.is_empty() || relation.contains('.'))
        {
            return Err(context.invalid_argument(
                directive,
                format!("'{}' must name a single relation, use @with for nested paths", relation),
            ));
        }

        Ok(Arc::new(Self {
            name,
            cardinality,
            relation,
        }))
    }

    pub fn has_many(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create("hasMany", Cardinality::Many, directive, context)
    }

    pub fn has_one(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create("hasOne", Cardinality::One, directive, context)
    }

    pub fn belongs_to(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create("belongsTo", Cardinality::One, directive, context)
    }

    pub fn morph_to(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create("morphTo", Cardinality::One, directive, context)
    }
}

/// Resolver reading an eager loaded relation from the parent record
pub fn loaded_relation_resolver(relation: String, cardinality: Cardinality) -> FieldResolverFn {
    Arc::new(move |ctx: ResolverContext| -> FieldFuture {
        let relation = relation.clone();
        async move {
            let parent = ctx.parent()?;
            match (parent.relation(&relation), cardinality) {
                (Some(Relation::Many(records)), Cardinality::Many) => {
                    Ok(Resolved::Records(records.clone()))
                }
                (Some(Relation::Many(records)), Cardinality::One) => {
                    Ok(Resolved::Record(records.first().cloned()))
                }
                (Some(Relation::One(record)), Cardinality::One) => {
                    Ok(Resolved::Record(record.as_deref().cloned()))
                }
                (Some(Relation::One(record)), Cardinality::Many) => Ok(Resolved::Records(
                    record.as_deref().cloned().into_iter().collect(),
                )),
                (None, _) => bail!(
                    "Relation '{}' of model '{}' was not eager loaded",
                    relation,
                    parent.model()
                ),
            }
        }
        .boxed()
    })
}

impl DirectiveHandler for RelationDirective {
    fn name(&self) -> &str {
        self.name
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::FieldResolver, DirectiveRole::RelationLoader]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        reject_root_field(self.name, &value)?;

        let relation = self
            .relation
            .clone()
            .unwrap_or_else(|| value.field_name().to_string());
        let path = RelationPath::parse(&relation).ok_or_else(|| {
            EngineError::from(DefinitionError::InvalidArgument {
                directive: self.name.to_string(),
                node: value.qualified_name(),
                message: format!("'{}' is not a relation name", relation),
            })
        })?;

        let value = value
            .with_resolver(loaded_relation_resolver(relation, self.cardinality))
            .with_eager_load(path);
        next.run(value)
    }
}
