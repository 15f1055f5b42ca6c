//! Field middleware and argument transformers: `@upperCase`, `@lowerCase`, `@trim`

use crate::core::directive::Directive;
use crate::core::error::EngineError;
use crate::directives::handler::{DirectiveContext, DirectiveHandler, DirectiveRole, FieldNext};
use crate::schema::executable::{FieldFuture, ResolverArgs, ResolverContext};
use crate::schema::values::FieldValue;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
}

/// `@upperCase` / `@lowerCase`: transform string results of the wrapped resolver
pub struct CaseDirective {
    case: Case,
}

impl CaseDirective {
    pub fn upper(
        _directive: &Directive,
        _context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Ok(Arc::new(Self { case: Case::Upper }))
    }

    pub fn lower(
        _directive: &Directive,
        _context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Ok(Arc::new(Self { case: Case::Lower }))
    }
}

impl DirectiveHandler for CaseDirective {
    fn name(&self) -> &str {
        match self.case {
            Case::Upper => "upperCase",
            Case::Lower => "lowerCase",
        }
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::FieldMiddleware]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        let case = self.case;
        let value = value.wrap_resolver(|inner| {
            Arc::new(move |ctx: ResolverContext| -> FieldFuture {
                let inner = inner.clone();
                async move {
                    let resolved = inner(ctx).await?;
                    Ok(resolved.map_strings(|s| match case {
                        Case::Upper => s.to_uppercase(),
                        Case::Lower => s.to_lowercase(),
                    }))
                }
                .boxed()
            })
        });
        next.run(value)
    }
}

/// Trim strings, recursing into lists and input objects
fn trim(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(trim).collect()),
        Value::Object(fields) => {
            Value::Object(fields.into_iter().map(|(k, v)| (k, trim(v))).collect())
        }
        other => other,
    }
}

/// `@trim`
///
/// On an argument, trims that argument. On a field, trims every argument
/// before the resolver runs.
pub struct TrimDirective;

impl TrimDirective {
    pub fn create(
        _directive: &Directive,
        _context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Ok(Arc::new(Self))
    }
}

impl DirectiveHandler for TrimDirective {
    fn name(&self) -> &str {
        "trim"
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        &[DirectiveRole::ArgTransformer]
    }

    fn handle_field(
        &self,
        value: FieldValue,
        next: FieldNext<'_>,
    ) -> Result<FieldValue, EngineError> {
        let value = value.wrap_resolver(|inner| {
            Arc::new(move |mut ctx: ResolverContext| -> FieldFuture {
                ctx.args = ResolverArgs::from_pairs(
                    ctx.args
                        .all()
                        .iter()
                        .map(|(name, value)| (name.clone(), trim(value.clone()))),
                );
                inner(ctx)
            })
        });
        next.run(value)
    }

    fn transform_argument(&self, value: Value) -> Value {
        trim(value)
    }
}
