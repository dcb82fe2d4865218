//! Type descriptions the container builds from.
//!
//! Rust has no runtime reflection, so constructors and controller methods are
//! described up front in a [`TypeRegistry`]. The container only ever asks a
//! registry for a [`TypeDescriptor`]; how the table is filled (by hand, by a
//! build script, by a macro) is up to the application.
//!
//! ```
//! use trellis_core::reflection::*;
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let registry = ClassRegistry::new().with(
//!     TypeDescriptor::new("Greeter", |args| {
//!         Ok(Greeter { greeting: args.cloned::<String>(0)? })
//!     })
//!     .with_constructor(vec![ParameterSpec::untyped("greeting")]),
//! );
//!
//! assert!(registry.describe("Greeter").is_some());
//! ```

use crate::{Error, Result};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A value handed out by the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wrap a value as an [`Instance`].
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// Declared type names that never go through type construction.
pub const PRIMITIVE_TYPES: [&str; 8] = [
    "int", "float", "double", "string", "array", "bool", "callable", "object",
];

/// Whether `type_name` belongs to the closed primitive set.
pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

/// One constructor or method parameter.
#[derive(Clone)]
pub struct ParameterSpec {
    name: String,
    declared_type: Option<String>,
    optional: bool,
    default: Option<Instance>,
}

impl ParameterSpec {
    /// A parameter without a type declaration.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            optional: false,
            default: None,
        }
    }

    /// A parameter with a declared type, primitive (`"string"`) or class
    /// (`"Database"`).
    pub fn typed(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            declared_type: Some(declared_type.into()),
            ..Self::untyped(name)
        }
    }

    /// Mark optional and attach a default value.
    pub fn with_default<T: Any + Send + Sync>(self, value: T) -> Self {
        self.with_default_instance(instance(value))
    }

    pub fn with_default_instance(mut self, value: Instance) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }

    /// Mark optional without a default; resolution still fails when nothing
    /// else supplies a value.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn is_primitive(&self) -> bool {
        self.declared_type.as_deref().is_some_and(is_primitive)
    }

    /// The declared type if it names a class rather than a primitive.
    pub fn class_type(&self) -> Option<&str> {
        self.declared_type.as_deref().filter(|ty| !is_primitive(ty))
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The default, only when the parameter is optional.
    pub fn default_value(&self) -> Option<&Instance> {
        if self.optional {
            self.default.as_ref()
        } else {
            None
        }
    }
}

impl fmt::Debug for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSpec")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("optional", &self.optional)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Resolved arguments passed to constructors and actions, in declaration order.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<Instance>,
}

impl Arguments {
    pub fn new(values: Vec<Instance>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn instance(&self, index: usize) -> Result<&Instance> {
        self.values
            .get(index)
            .ok_or_else(|| Error::handler(format!("missing argument #{}", index)))
    }

    /// Borrow argument `index` as `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<&T> {
        let value = self.instance(index)?;
        (**value).downcast_ref::<T>().ok_or_else(|| Error::TypeMismatch {
            id: format!("argument #{}", index),
            expected: type_name::<T>(),
        })
    }

    pub fn cloned<T: Any + Send + Sync + Clone>(&self, index: usize) -> Result<T> {
        self.get::<T>(index).cloned()
    }

    /// Share argument `index` as `Arc<T>`, keeping identity with the container's copy.
    pub fn arc<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        self.instance(index)?
            .clone()
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch {
                id: format!("argument #{}", index),
                expected: type_name::<T>(),
            })
    }

    pub fn into_inner(self) -> Vec<Instance> {
        self.values
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

pub type ConstructFn = Arc<dyn Fn(Arguments) -> Result<Instance> + Send + Sync>;
pub type InvokeFn = Arc<dyn Fn(&Instance, Arguments) -> Result<Instance> + Send + Sync>;

/// A callable method on a registered type.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    parameters: Vec<ParameterSpec>,
    invoke: InvokeFn,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Call the method on `receiver` with already-resolved arguments.
    pub fn invoke(&self, receiver: &Instance, arguments: Arguments) -> Result<Instance> {
        (self.invoke)(receiver, arguments)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Constructor signature, factory and methods of one type.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    constructor: Option<Vec<ParameterSpec>>,
    construct: ConstructFn,
    methods: HashMap<String, MethodDescriptor>,
}

impl TypeDescriptor {
    /// Describe a type built by `construct`. Without
    /// [`with_constructor`](Self::with_constructor) the type has no
    /// constructor and is built with empty arguments.
    pub fn new<T, F>(name: impl Into<String>, construct: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: None,
            construct: Arc::new(move |args| construct(args).map(instance)),
            methods: HashMap::new(),
        }
    }

    /// Declare the constructor's parameters, in order.
    pub fn with_constructor(mut self, parameters: Vec<ParameterSpec>) -> Self {
        self.constructor = Some(parameters);
        self
    }

    /// Declare a method callable on instances of `C`.
    pub fn with_method<C, R, F>(
        mut self,
        name: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        action: F,
    ) -> Self
    where
        C: Any + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&C, Arguments) -> Result<R> + Send + Sync + 'static,
    {
        let name = name.into();
        let owner = self.name.clone();
        let invoke: InvokeFn = Arc::new(move |receiver: &Instance, args: Arguments| {
            let controller =
                (**receiver)
                    .downcast_ref::<C>()
                    .ok_or_else(|| Error::TypeMismatch {
                        id: owner.clone(),
                        expected: type_name::<C>(),
                    })?;
            action(controller, args).map(instance)
        });

        self.methods.insert(
            name.clone(),
            MethodDescriptor {
                name,
                parameters,
                invoke,
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor parameters; `None` when the type has no constructor.
    pub fn constructor(&self) -> Option<&[ParameterSpec]> {
        self.constructor.as_deref()
    }

    pub fn construct(&self, arguments: Arguments) -> Result<Instance> {
        (self.construct)(arguments)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("constructor", &self.constructor)
            .field("methods", &methods)
            .finish()
    }
}

/// Source of type descriptions for autowiring.
pub trait TypeRegistry: Send + Sync {
    /// Describe `type_id`, or `None` if the type is unknown.
    fn describe(&self, type_id: &str) -> Option<&TypeDescriptor>;
}

/// A [`TypeRegistry`] backed by an explicit registration table.
#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any earlier one of the same name.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeRegistry for ClassRegistry {
    fn describe(&self, type_id: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        start: i64,
    }

    #[test]
    fn test_primitive_set() {
        for ty in PRIMITIVE_TYPES {
            assert!(is_primitive(ty));
        }
        assert!(!is_primitive("String"));
        assert!(!is_primitive("Database"));
    }

    #[test]
    fn test_parameter_spec_classification() {
        let name = ParameterSpec::typed("name", "string");
        assert!(name.is_primitive());
        assert_eq!(name.class_type(), None);

        let db = ParameterSpec::typed("db", "Database");
        assert!(!db.is_primitive());
        assert_eq!(db.class_type(), Some("Database"));

        let loose = ParameterSpec::untyped("anything");
        assert!(!loose.is_primitive());
        assert_eq!(loose.declared_type(), None);
    }

    #[test]
    fn test_default_requires_optional() {
        let spec = ParameterSpec::untyped("limit").with_default(10i64);
        assert!(spec.is_optional());
        let default = spec.default_value().unwrap();
        assert_eq!(default.downcast_ref::<i64>(), Some(&10));

        let bare = ParameterSpec::untyped("limit").optional();
        assert!(bare.is_optional());
        assert!(bare.default_value().is_none());
    }

    #[test]
    fn test_arguments_downcast() {
        let args = Arguments::new(vec![instance("42".to_string()), instance(7i64)]);
        assert_eq!(args.cloned::<String>(0).unwrap(), "42");
        assert_eq!(*args.get::<i64>(1).unwrap(), 7);
        assert!(matches!(
            args.get::<bool>(1),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(args.get::<bool>(5), Err(Error::Handler(_))));
    }

    #[test]
    fn test_descriptor_construct_and_invoke() {
        let descriptor = TypeDescriptor::new("Counter", |args| {
            Ok(Counter {
                start: args.cloned::<i64>(0)?,
            })
        })
        .with_constructor(vec![ParameterSpec::typed("start", "int")])
        .with_method("next", vec![], |counter: &Counter, _args| Ok(counter.start + 1));

        let built = descriptor
            .construct(Arguments::new(vec![instance(41i64)]))
            .unwrap();
        let method = descriptor.method("next").unwrap();
        let result = method.invoke(&built, Arguments::default()).unwrap();

        assert_eq!(result.downcast_ref::<i64>(), Some(&42));
        assert_eq!(descriptor.constructor().map(|c| c.len()), Some(1));
        assert!(!descriptor.has_method("previous"));
    }

    #[test]
    fn test_invoke_on_wrong_receiver() {
        let descriptor = TypeDescriptor::new("Counter", |_args| Ok(Counter { start: 0 }))
            .with_method("next", vec![], |counter: &Counter, _args| Ok(counter.start + 1));

        let wrong = instance("not a counter".to_string());
        let result = descriptor
            .method("next")
            .unwrap()
            .invoke(&wrong, Arguments::default());

        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_registry_replaces_by_name() {
        let mut registry = ClassRegistry::new();
        registry.register(TypeDescriptor::new("Counter", |_args| Ok(Counter { start: 1 })));
        registry.register(
            TypeDescriptor::new("Counter", |_args| Ok(Counter { start: 2 }))
                .with_constructor(vec![]),
        );

        assert_eq!(registry.len(), 1);
        assert!(registry.describe("Counter").unwrap().constructor().is_some());
        assert!(registry.describe("Missing").is_none());
    }
}
