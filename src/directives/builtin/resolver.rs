//! Resolver directives: `@method`, `@rename`, `@all`, `@first`, `@find`

use crate::core::directive::Directive;
use crate::core::error::{DefinitionError, DirectiveResolutionError, EngineError};
use crate::core::record::Record;
use crate::core::store::RecordQuery;
use crate::directives::handler::{
    DirectiveContext, DirectiveHandler, DirectiveLocation, DirectiveRole, FieldNext,
};
use crate::schema::executable::{FieldFuture, Resolved, ResolverArgs, ResolverContext};
use crate::schema::values::FieldValue;
use anyhow::{Result, bail};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A model method callable from `@method`
pub type MethodFn = Arc<dyn Fn(&Record, &ResolverArgs) -> Result<Value> + Send + Sync>;

/// Methods of model types, keyed by (type, method)
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<(String, String), MethodFn>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, type_name: impl Into<String>, method: impl Into<String>, f: F)
    where
        F: Fn(&Record, &ResolverArgs) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods
            .insert((type_name.into(), method.into()), Arc::new(f));
    }

    pub fn get(&self, type_name: &str, method: &str) -> Option<MethodFn> {
        self.methods
            .get(&(type_name.to_string(), method.to_string()))
            .cloned()
    }

    pub fn contains(&self, type_name: &str, method: &str) -> bool {
        self.methods
            .contains_key(&(type_name.to_string(), method.to_string()))
    }
}

fn field_of<'a>(
    directive: &Directive,
    context: &DirectiveContext<'a>,
) -> Result<&'a str, EngineError> {
    match (context.location, context.field) {
        (DirectiveLocation::Field, Some(field)) => Ok(field),
        (location, _) => Err(DefinitionError::InvalidLocation {
            directive: directive.name.clone(),
            node: context.node.to_string(),
            location: location.to_string(),
        }
        .into()),
    }
}

/// `@method(name: "tasksLoaded")`
///
/// Calls a registered method of the parent model. The method name defaults
/// to the field name; an unknown method fails the build.
pub struct MethodDirective {
    method: MethodFn,
}

impl MethodDirective {
    pub fn create(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        let field = field_of(directive, context)?;
        let name = directive
            .string_arg_or("name", field)
            .map_err(|e| context.invalid_argument(directive, e))?;

        let method = context.methods.get(context.type_name, &name).ok_or_else(|| {
            DirectiveResolutionError::MethodNotFound {
                type_name: context.type_name.to_string(),
                method: name.clone(),
            }
        })?;

        Ok(Arc::new(Self { method }))
    }
}

impl DirectiveHandler for MethodDirective {
    fn name(&self) -> &str {
        "method"
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::FieldResolver]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        let method = self.method.clone();
        let value = value.with_resolver(Arc::new(move |ctx: ResolverContext| -> FieldFuture {
            let method = method.clone();
            async move {
                let parent = ctx.parent()?;
                Ok(Resolved::Value(method(parent, &ctx.args)?))
            }
            .boxed()
        }));
        next.run(value)
    }
}

/// `@rename(attribute: "created_at")`
pub struct RenameDirective {
    attribute: String,
}

impl RenameDirective {
    pub fn create(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        let attribute = directive
            .require_string("attribute")
            .map_err(|e| context.invalid_argument(directive, e))?;
        Ok(Arc::new(Self { attribute }))
    }
}

impl DirectiveHandler for RenameDirective {
    fn name(&self) -> &str {
        "rename"
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::FieldResolver]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        let attribute = self.attribute.clone();
        let value = value.with_resolver(Arc::new(move |ctx: ResolverContext| -> FieldFuture {
            let attribute = attribute.clone();
            async move {
                let parent = ctx.parent()?;
                Ok(Resolved::Value(
                    parent.attribute(&attribute).cloned().unwrap_or(Value::Null),
                ))
            }
            .boxed()
        }));
        next.run(value)
    }
}

/// Which records a query directive returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Every record of the model
    All,
    /// The first record matching the arguments
    First,
    /// The single record matching the arguments
    Find,
}

/// `@all`, `@first` and `@find`
///
/// Fetch records from the store. The model defaults to the field's return
/// type; `@first` and `@find` filter on the field arguments.
pub struct QueryDirective {
    mode: QueryMode,
    model: Option<String>,
}

impl QueryDirective {
    fn create(
        mode: QueryMode,
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        let model = directive
            .string_arg("model")
            .map_err(|e| context.invalid_argument(directive, e))?;
        Ok(Arc::new(Self { mode, model }))
    }

    pub fn all(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create(QueryMode::All, directive, context)
    }

    pub fn first(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create(QueryMode::First, directive, context)
    }

    pub fn find(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create(QueryMode::Find, directive, context)
    }
}

fn filters(args: &ResolverArgs) -> RecordQuery {
    args.all()
        .iter()
        .filter(|(_, value)| !value.is_null())
        .fold(RecordQuery::new(), |query, (name, value)| {
            query.filter(name.clone(), value.clone())
        })
}

impl DirectiveHandler for QueryDirective {
    fn name(&self) -> &str {
        match self.mode {
            QueryMode::All => "all",
            QueryMode::First => "first",
            QueryMode::Find => "find",
        }
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::FieldResolver]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        let mode = self.mode;
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| value.field().ty.named().to_string());

        let value = value.with_resolver(Arc::new(move |ctx: ResolverContext| -> FieldFuture {
            let model = model.clone();
            async move {
                match mode {
                    QueryMode::All => {
                        let records = ctx.store.fetch(&model, &RecordQuery::new()).await?;
                        Ok(Resolved::Records(records))
                    }
                    QueryMode::First => {
                        let query = filters(&ctx.args).limit(1);
                        let records = ctx.store.fetch(&model, &query).await?;
                        Ok(Resolved::Record(records.into_iter().next()))
                    }
                    QueryMode::Find => {
                        let query = filters(&ctx.args).limit(2);
                        let records = ctx.store.fetch(&model, &query).await?;
                        if records.len() > 1 {
                            bail!("The query returned more than one result.");
                        }
                        Ok(Resolved::Record(records.into_iter().next()))
                    }
                }
            }
            .boxed()
        }));
        next.run(value)
    }
}
