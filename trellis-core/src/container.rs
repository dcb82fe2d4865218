// Dependency injection container with constructor autowiring

use crate::logging::{debug, trace};
use crate::reflection::{
    instance, Arguments, ClassRegistry, Instance, MethodDescriptor, ParameterSpec, TypeRegistry,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default ceiling for nested resolutions before reporting a cycle.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A factory invoked once with the container; its result is cached.
pub type FactoryFn = Arc<dyn Fn(&mut Container) -> Result<Instance> + Send + Sync>;

/// How an identifier is satisfied.
#[derive(Clone)]
pub enum Definition {
    /// Returned verbatim.
    Value(Instance),
    /// Called on first `get`, then cached.
    Factory(FactoryFn),
}

impl Definition {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Definition::Value(instance(value))
    }

    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut Container) -> Result<T> + Send + Sync + 'static,
    {
        Definition::Factory(Arc::new(move |container: &mut Container| {
            factory(container).map(instance)
        }))
    }

    /// Convert a configuration value into a definition.
    ///
    /// Strings, booleans, numbers and arrays become values (`String`, `bool`,
    /// `i64` or `f64`, `Vec<serde_json::Value>`). `null` and tables are
    /// rejected; tables are flattened by [`Container::load_definitions`].
    pub fn from_json(id: &str, value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(Definition::value(s)),
            Value::Bool(b) => Ok(Definition::value(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Definition::value(i)),
                None => n.as_f64().map(Definition::value).ok_or_else(|| {
                    Error::InvalidDefinition {
                        id: id.to_string(),
                        reason: format!("number {} is out of range", n),
                    }
                }),
            },
            Value::Array(items) => Ok(Definition::value(items)),
            Value::Null => Err(Error::InvalidDefinition {
                id: id.to_string(),
                reason: "null is neither a value nor a factory".to_string(),
            }),
            Value::Object(_) => Err(Error::InvalidDefinition {
                id: id.to_string(),
                reason: "tables must be loaded through load_definitions".to_string(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Definition::Value(_) => "value",
            Definition::Factory(_) => "factory",
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Container tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Nested resolutions allowed before failing with `CyclicDependency`
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The dependency injection container.
///
/// Holds built instances and definitions for one request lifecycle.
/// Identifiers without a definition are constructed from the
/// [`TypeRegistry`], resolving constructor parameters recursively.
pub struct Container {
    instances: HashMap<String, Instance>,
    definitions: HashMap<String, Definition>,
    registry: Arc<dyn TypeRegistry>,
    options: ContainerOptions,
    resolving: Vec<String>,
}

impl Container {
    /// A container with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(ClassRegistry::new())
    }

    pub fn with_registry(registry: impl TypeRegistry + 'static) -> Self {
        Self::from_shared_registry(Arc::new(registry))
    }

    /// Build over a registry shared with other containers (one per request).
    pub fn from_shared_registry(registry: Arc<dyn TypeRegistry>) -> Self {
        debug!("Creating new DI container");
        Self {
            instances: HashMap::new(),
            definitions: HashMap::new(),
            registry,
            options: ContainerOptions::default(),
            resolving: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ContainerOptions {
        self.options
    }

    pub fn registry(&self) -> &dyn TypeRegistry {
        self.registry.as_ref()
    }

    /// True if `id` is built or has a definition.
    pub fn has(&self, id: &str) -> bool {
        let exists = self.instances.contains_key(id) || self.definitions.contains_key(id);
        trace!(service = id, exists = exists, "Checked service existence");
        exists
    }

    /// Register or overwrite the definition for `id`.
    ///
    /// An instance already built for `id` keeps priority over the new
    /// definition until it is removed.
    pub fn set(&mut self, id: impl Into<String>, definition: Definition) -> Result<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidDefinition {
                id,
                reason: "identifier must not be empty".to_string(),
            });
        }

        debug!(service = %id, kind = definition.kind(), "Definition registered");
        self.definitions.insert(id, definition);
        Ok(())
    }

    pub fn set_value<T: Any + Send + Sync>(&mut self, id: impl Into<String>, value: T) -> Result<()> {
        self.set(id, Definition::value(value))
    }

    pub fn set_factory<T, F>(&mut self, id: impl Into<String>, factory: F) -> Result<()>
    where
        T: Any + Send + Sync,
        F: Fn(&mut Container) -> Result<T> + Send + Sync + 'static,
    {
        self.set(id, Definition::factory(factory))
    }

    /// Register a definition from a configuration value, see [`Definition::from_json`].
    pub fn set_json(&mut self, id: impl Into<String>, value: serde_json::Value) -> Result<()> {
        let id = id.into();
        let definition = Definition::from_json(&id, value)?;
        self.set(id, definition)
    }

    /// Load a configuration table as definitions.
    ///
    /// Nested tables are flattened: every leaf is registered under its own
    /// key, so `{"database": {"host": "db"}}` defines `host`. Later leaves
    /// overwrite earlier ones with the same key. Returns the number of leaves.
    pub fn load_definitions(&mut self, table: &serde_json::Value) -> Result<usize> {
        let serde_json::Value::Object(map) = table else {
            return Err(Error::InvalidDefinition {
                id: "<root>".to_string(),
                reason: "definitions must be a table".to_string(),
            });
        };

        let mut leaves = Vec::new();
        flatten(map, &mut leaves);

        let count = leaves.len();
        for (id, value) in leaves {
            self.set_json(id, value)?;
        }

        debug!(count = count, "Loaded definitions from configuration");
        Ok(count)
    }

    /// Resolve `id`.
    ///
    /// Order: cached instance, then definition, then construction from the
    /// registry. Whatever is produced is cached, so later calls return the
    /// same `Arc`.
    pub fn get(&mut self, id: &str) -> Result<Instance> {
        if let Some(existing) = self.instances.get(id) {
            trace!(service = id, "Resolved cached instance");
            return Ok(Arc::clone(existing));
        }

        if self.resolving.len() >= self.options.max_depth {
            let mut path = self.resolving.join(" -> ");
            path.push_str(" -> ");
            path.push_str(id);
            return Err(Error::CyclicDependency {
                id: id.to_string(),
                limit: self.options.max_depth,
                path,
            });
        }

        self.resolving.push(id.to_string());
        let built = self.build(id);
        self.resolving.pop();

        let built = built?;
        self.instances.insert(id.to_string(), Arc::clone(&built));
        debug!(service = id, "Service built and cached");
        Ok(built)
    }

    /// Resolve `id` and downcast it to `T`.
    pub fn get_as<T: Any + Send + Sync>(&mut self, id: &str) -> Result<Arc<T>> {
        self.get(id)?
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Evict the instance and definition for `id`.
    ///
    /// Removing an unknown id is a no-op; returns whether anything was evicted.
    pub fn remove(&mut self, id: &str) -> bool {
        let had_instance = self.instances.remove(id).is_some();
        let had_definition = self.definitions.remove(id).is_some();
        let removed = had_instance || had_definition;
        debug!(service = id, removed = removed, "Removed service");
        removed
    }

    /// Evict everything, returning to the initial state.
    pub fn clear(&mut self) {
        let count = self.len();
        self.instances.clear();
        self.definitions.clear();
        debug!(service_count = count, "Cleared all services from container");
    }

    /// Number of distinct identifiers with an instance or a definition.
    pub fn len(&self) -> usize {
        self.definitions.len()
            + self
                .instances
                .keys()
                .filter(|id| !self.definitions.contains_key(*id))
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.definitions.is_empty()
    }

    /// Expose route captures as values named after their placeholders.
    ///
    /// Stale instances of the same name are evicted so the capture wins.
    pub fn bind_route_parameters<'a, I>(&mut self, params: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in params {
            self.instances.remove(name);
            self.definitions
                .insert(name.to_string(), Definition::value(value.to_string()));
            trace!(parameter = name, value = value, "Bound route parameter");
        }
    }

    /// Resolve and invoke `method` on the `controller` type.
    ///
    /// The controller instance comes from the container; the method's
    /// arguments from [`resolve_method_parameters`](Self::resolve_method_parameters).
    pub fn call_action(
        &mut self,
        controller: &str,
        method: &str,
        captures: &[String],
    ) -> Result<Instance> {
        let registry = Arc::clone(&self.registry);
        let descriptor = registry
            .describe(controller)
            .ok_or_else(|| Error::ControllerNotFound(controller.to_string()))?;
        let action = descriptor
            .method(method)
            .ok_or_else(|| Error::MethodNotFound {
                controller: controller.to_string(),
                method: method.to_string(),
            })?;

        let receiver = self.get(controller)?;
        let arguments = self.resolve_method_parameters(controller, action, captures)?;

        debug!(
            controller = controller,
            method = method,
            arguments = arguments.len(),
            "Invoking action"
        );
        action.invoke(&receiver, arguments)
    }

    /// Resolve a method's arguments from positional captures.
    ///
    /// Per parameter: the capture at the same index, else the container's
    /// instance of a declared class type, else the default.
    pub fn resolve_method_parameters(
        &mut self,
        owner: &str,
        method: &MethodDescriptor,
        captures: &[String],
    ) -> Result<Arguments> {
        let mut resolved = Vec::with_capacity(method.parameters().len());

        for (index, parameter) in method.parameters().iter().enumerate() {
            let value = if let Some(capture) = captures.get(index) {
                instance(capture.clone())
            } else if let Some(class) = parameter.class_type() {
                self.get(class)?
            } else if let Some(default) = parameter.default_value() {
                Arc::clone(default)
            } else {
                return Err(Error::UnresolvableParameter {
                    parameter: parameter.name().to_string(),
                    method: format!("{}::{}", owner, method.name()),
                });
            };
            resolved.push(value);
        }

        Ok(Arguments::new(resolved))
    }

    fn build(&mut self, id: &str) -> Result<Instance> {
        if let Some(definition) = self.definitions.get(id).cloned() {
            trace!(service = id, kind = definition.kind(), "Building from definition");
            return match definition {
                Definition::Value(value) => Ok(value),
                Definition::Factory(factory) => factory(self),
            };
        }

        let registry = Arc::clone(&self.registry);
        let descriptor = registry
            .describe(id)
            .ok_or_else(|| Error::ServiceNotFound(id.to_string()))?;

        let Some(parameters) = descriptor.constructor() else {
            trace!(service = id, "No constructor, building without arguments");
            return descriptor.construct(Arguments::default());
        };

        let mut arguments = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            arguments.push(self.resolve_parameter(descriptor.name(), parameter)?);
        }

        descriptor.construct(Arguments::new(arguments))
    }

    fn resolve_parameter(&mut self, owner: &str, parameter: &ParameterSpec) -> Result<Instance> {
        if let Some(class) = parameter.class_type() {
            trace!(parameter = parameter.name(), class = class, "Autowiring class parameter");
            return self.get(class);
        }

        // Primitive or untyped: looked up by the parameter's own name.
        if self.has(parameter.name()) {
            return self.get(parameter.name());
        }

        if let Some(default) = parameter.default_value() {
            return Ok(Arc::clone(default));
        }

        Err(Error::CannotResolveParameter {
            parameter: parameter.name().to_string(),
            owner: owner.to_string(),
        })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("instances", &self.instances.len())
            .field("definitions", &self.definitions)
            .field("options", &self.options)
            .finish()
    }
}

fn flatten(
    map: &serde_json::Map<String, serde_json::Value>,
    leaves: &mut Vec<(String, serde_json::Value)>,
) {
    for (key, value) in map {
        match value {
            serde_json::Value::Object(nested) => flatten(nested, leaves),
            leaf => leaves.push((key.clone(), leaf.clone())),
        }
    }
}
