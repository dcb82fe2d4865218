// Mock controllers for dispatch tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use trellis_core::{ClassRegistry, Instance, ParameterSpec, TypeDescriptor};

/// One recorded action call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    /// Arguments rendered as strings, see [`render_argument`].
    pub arguments: Vec<String>,
}

type CallLog = Arc<Mutex<Vec<RecordedCall>>>;

#[derive(Clone)]
struct MockAction {
    parameters: Vec<ParameterSpec>,
    returns: Option<String>,
}

/// Receiver handed out by the container for a mock controller.
#[derive(Debug)]
pub struct MockInstance {
    name: String,
}

impl MockInstance {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A controller that records every action call.
///
/// Actions return their configured value, or `Name::method(arg, ..)` when
/// none was set.
///
/// ```
/// use trellis_core::{ClassRegistry, Container, ParameterSpec, Router};
/// use trellis_testing::MockController;
///
/// let users = MockController::new("UserController")
///     .with_action("show", vec![ParameterSpec::typed("id", "string")]);
///
/// let mut registry = ClassRegistry::new();
/// users.register(&mut registry);
///
/// let mut router = Router::with_container(Container::with_registry(registry));
/// router.get("users/{id}", "UserController#show");
/// router.dispatch("GET", "users/42").unwrap();
///
/// assert!(users.was_called("show"));
/// assert_eq!(users.last_call().unwrap().arguments, ["42"]);
/// ```
#[derive(Clone)]
pub struct MockController {
    name: String,
    constructor: Option<Vec<ParameterSpec>>,
    actions: HashMap<String, MockAction>,
    calls: CallLog,
    constructions: Arc<AtomicUsize>,
}

impl MockController {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            constructor: None,
            actions: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            constructions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare constructor parameters; they are resolved but not kept.
    pub fn with_constructor(mut self, parameters: Vec<ParameterSpec>) -> Self {
        self.constructor = Some(parameters);
        self
    }

    /// Declare an action and its parameters.
    pub fn with_action(mut self, method: &str, parameters: Vec<ParameterSpec>) -> Self {
        let returns = self
            .actions
            .remove(method)
            .and_then(|action| action.returns);
        self.actions
            .insert(method.to_string(), MockAction { parameters, returns });
        self
    }

    /// Fix the value `method` returns, declaring it without parameters if
    /// it was not declared yet.
    pub fn returning(mut self, method: &str, value: impl Into<String>) -> Self {
        self.actions
            .entry(method.to_string())
            .or_insert_with(|| MockAction {
                parameters: Vec::new(),
                returns: None,
            })
            .returns = Some(value.into());
        self
    }

    /// Describe the mock for a registry. Every descriptor shares this
    /// mock's call log.
    pub fn descriptor(&self) -> TypeDescriptor {
        let name = self.name.clone();
        let constructions = Arc::clone(&self.constructions);
        let mut descriptor = TypeDescriptor::new(self.name.clone(), move |_args| {
            constructions.fetch_add(1, Ordering::SeqCst);
            Ok(MockInstance { name: name.clone() })
        });

        if let Some(parameters) = &self.constructor {
            descriptor = descriptor.with_constructor(parameters.clone());
        }

        for (method, action) in &self.actions {
            let calls = Arc::clone(&self.calls);
            let method_name = method.clone();
            let returns = action.returns.clone();

            descriptor = descriptor.with_method(
                method.clone(),
                action.parameters.clone(),
                move |receiver: &MockInstance, args| {
                    let arguments: Vec<String> =
                        args.into_inner().iter().map(render_argument).collect();
                    let result = returns.clone().unwrap_or_else(|| {
                        format!("{}::{}({})", receiver.name, method_name, arguments.join(", "))
                    });

                    lock(&calls).push(RecordedCall {
                        method: method_name.clone(),
                        arguments,
                    });
                    Ok(result)
                },
            );
        }

        descriptor
    }

    /// Add [`descriptor`](Self::descriptor) to `registry`.
    pub fn register(&self, registry: &mut ClassRegistry) {
        registry.register(self.descriptor());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn method_call_count(&self, method: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.method_call_count(method) > 0
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        lock(&self.calls).last().cloned()
    }

    /// How many times the container built this controller.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
        self.constructions.store(0, Ordering::SeqCst);
    }
}

/// Render a resolved argument for the call log.
///
/// Strings, string slices, integers, floats and booleans print their value;
/// anything else prints `<opaque>`.
pub fn render_argument(argument: &Instance) -> String {
    let any = argument.as_ref();
    if let Some(s) = any.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(s) = any.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    if let Some(n) = any.downcast_ref::<i64>() {
        return n.to_string();
    }
    if let Some(n) = any.downcast_ref::<usize>() {
        return n.to_string();
    }
    if let Some(n) = any.downcast_ref::<f64>() {
        return n.to_string();
    }
    if let Some(b) = any.downcast_ref::<bool>() {
        return b.to_string();
    }
    "<opaque>".to_string()
}

fn lock(calls: &CallLog) -> MutexGuard<'_, Vec<RecordedCall>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}
