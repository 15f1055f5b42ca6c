//! Class and directive registries
//!
//! Classes are registered explicitly under a (possibly namespaced) name and
//! constructed by name at build time. Lookups follow one convention for
//! every capability: take the explicit class name if the schema gave one,
//! otherwise derive it from the annotated node; try it inside each configured
//! namespace, then bare; fail with the attempted class and node otherwise.

use crate::core::directive::Directive;
use crate::core::error::{Capability, DirectiveResolutionError, EngineError};
use crate::core::naming::Naming;
use crate::directives::handler::{DirectiveContext, DirectiveHandler};
use std::collections::HashMap;
use std::sync::Arc;

/// Construct-by-name capability
pub trait ClassResolver<T>: Send + Sync {
    /// Construct the class registered as `class` inside `namespace` (or bare)
    fn resolve_class(&self, namespace: Option<&str>, class: &str) -> Option<T>;
}

type Constructor<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Registry of named constructors
pub struct ClassRegistry<T> {
    classes: HashMap<String, Constructor<T>>,
}

impl<T> Default for ClassRegistry<T> {
    fn default() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }
}

impl<T> Clone for ClassRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            classes: self.classes.clone(),
        }
    }
}

impl<T> ClassRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under its bare name
    pub fn register<F>(&mut self, class: impl Into<String>, constructor: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.classes.insert(class.into(), Arc::new(constructor));
    }

    /// Register a class inside a namespace
    pub fn register_in<F>(&mut self, namespace: &str, class: &str, constructor: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(Naming::qualify(namespace, class), constructor);
    }

    /// Whether a fully qualified class name is registered
    pub fn contains(&self, qualified: &str) -> bool {
        self.classes.contains_key(qualified)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl<T> ClassResolver<T> for ClassRegistry<T> {
    fn resolve_class(&self, namespace: Option<&str>, class: &str) -> Option<T> {
        let key = match namespace {
            Some(namespace) => Naming::qualify(namespace, class),
            None => class.to_string(),
        };
        self.classes.get(&key).map(|constructor| constructor())
    }
}

/// One class lookup following the naming convention
pub struct ClassLookup<'a> {
    pub capability: Capability,
    /// Class named by a directive argument or a binding, used verbatim
    pub explicit: Option<&'a str>,
    /// Class derived from the annotated node
    pub conventional: &'a str,
    pub namespaces: &'a [String],
    /// Name of the annotated node, for error messages
    pub node: &'a str,
}

impl ClassLookup<'_> {
    /// The class name that will be looked up
    pub fn class(&self) -> &str {
        self.explicit.unwrap_or(self.conventional)
    }

    /// Resolve through the namespaces, then the bare name
    pub fn resolve<T>(&self, resolver: &dyn ClassResolver<T>) -> Result<T, DirectiveResolutionError> {
        let class = self.class();

        for namespace in self.namespaces {
            if let Some(instance) = resolver.resolve_class(Some(namespace), class) {
                tracing::debug!(
                    capability = %self.capability,
                    class = %Naming::qualify(namespace, class),
                    node = %self.node,
                    "Resolved namespaced class"
                );
                return Ok(instance);
            }
        }

        if let Some(instance) = resolver.resolve_class(None, class) {
            tracing::debug!(
                capability = %self.capability,
                class = %class,
                node = %self.node,
                "Resolved bare class"
            );
            return Ok(instance);
        }

        Err(DirectiveResolutionError::ClassNotFound {
            capability: self.capability,
            class: class.to_string(),
            node: self.node.to_string(),
        })
    }
}

/// Creates the handler for one directive instance
pub type DirectiveFactory = Arc<
    dyn Fn(&Directive, &DirectiveContext<'_>) -> Result<Arc<dyn DirectiveHandler>, EngineError>
        + Send
        + Sync,
>;

/// Maps directive names to handler factories
///
/// The class of a directive is its binding when one is configured, else
/// `{Name}Directive`. Built-in handlers are registered under bare names so
/// a class of the same name inside a configured namespace takes precedence.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    classes: ClassRegistry<DirectiveFactory>,
    bindings: HashMap<String, String>,
    namespaces: Vec<String>,
}

impl DirectiveRegistry {
    /// Create an empty registry searching the given namespaces
    pub fn new(namespaces: Vec<String>) -> Self {
        Self {
            classes: ClassRegistry::new(),
            bindings: HashMap::new(),
            namespaces,
        }
    }

    /// Register a handler factory under a bare class name
    pub fn register<F>(&mut self, class: impl Into<String>, factory: F)
    where
        F: Fn(&Directive, &DirectiveContext<'_>) -> Result<Arc<dyn DirectiveHandler>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        let factory: DirectiveFactory = Arc::new(factory);
        self.classes.register(class, move || factory.clone());
    }

    /// Register a handler factory inside a namespace
    pub fn register_in<F>(&mut self, namespace: &str, class: &str, factory: F)
    where
        F: Fn(&Directive, &DirectiveContext<'_>) -> Result<Arc<dyn DirectiveHandler>, EngineError>
            + Send
            + Sync
            + 'static,
    {
        self.register(Naming::qualify(namespace, class), factory);
    }

    /// Bind a directive name to an explicit class, overriding the convention
    pub fn bind(&mut self, directive: impl Into<String>, class: impl Into<String>) {
        self.bindings.insert(directive.into(), class.into());
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Resolve the factory of a directive declared on `node`
    pub fn factory(
        &self,
        directive: &str,
        node: &str,
    ) -> Result<DirectiveFactory, DirectiveResolutionError> {
        let conventional = Naming::directive_class(directive);
        ClassLookup {
            capability: Capability::Directive,
            explicit: self.bindings.get(directive).map(String::as_str),
            conventional: &conventional,
            namespaces: &self.namespaces,
            node,
        }
        .resolve(&self.classes)
    }

    /// Create the handler of one directive instance
    pub fn create(
        &self,
        directive: &Directive,
        context: &DirectiveContext<'_>,
    ) -> Result<Arc<dyn DirectiveHandler>, EngineError> {
        let factory = self.factory(&directive.name, context.node)?;
        factory(directive, context)
    }
}
