//! Directives carrying metadata read by the generators
//!
//! `@scalar`, `@union` and `@interface` name the class bound to a type,
//! `@cacheKey`, `@enum` and `@deprecated` annotate fields and enum values.

use crate::core::directive::Directive;
use crate::core::error::EngineError;
use crate::directives::handler::{DirectiveContext, DirectiveHandler, DirectiveRole};
use std::sync::Arc;

const TYPE_HINT: &[DirectiveRole] = &[DirectiveRole::TypeResolver];
const ANNOTATION: &[DirectiveRole] = &[DirectiveRole::Annotation];

pub struct AnnotationDirective {
    name: String,
    roles: &'static [DirectiveRole],
}

impl AnnotationDirective {
    fn create(
        roles: &'static [DirectiveRole],
        required: Option<&str>,
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        if let Some(argument) = required {
            directive
                .require_string(argument)
                .map_err(|e| context.invalid_argument(directive, e))?;
        }
        Ok(Arc::new(Self {
            name: directive.name.clone(),
            roles,
        }))
    }

    /// `@scalar(class: "app::scalars::Email")`
    pub fn scalar(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create(TYPE_HINT, Some("class"), directive, context)
    }

    /// `@union(resolveType: "SearchResult")` and `@interface(resolveType: ...)`
    pub fn type_resolver(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create(TYPE_HINT, Some("resolveType"), directive, context)
    }

    /// `@enum(value: ...)`; any literal is accepted as the internal value
    pub fn enum_value(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        if directive.argument("value").is_none() {
            return Err(context.invalid_argument(directive, "argument 'value' is required"));
        }
        Self::create(ANNOTATION, None, directive, context)
    }

    /// `@cacheKey`, `@deprecated(reason: ...)`
    pub fn marker(
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        Self::create(ANNOTATION, None, directive, context)
    }
}

impl DirectiveHandler for AnnotationDirective {
    fn name(&self) -> &str {
        &self.name
    }

    fn roles(&self) -> &'static [DirectiveRole] {
        self.roles
    }
}
