// Route registration and dispatch

use crate::container::Container;
use crate::http::{HttpMethod, RequestContext};
use crate::logging::{debug, debug_span, trace, warn};
use crate::reflection::Instance;
use crate::route::Route;
use crate::target::Target;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Method invoked for a `"Controller"` descriptor without `#method`.
pub const DEFAULT_ACTION: &str = "invoke";

/// Router tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Prefix for controller identifiers, joined as `namespace::Controller`
    pub controller_namespace: Option<String>,
    /// Method used when a descriptor names no method
    pub default_action: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            controller_namespace: None,
            default_action: DEFAULT_ACTION.to_string(),
        }
    }
}

/// Routes keyed by HTTP method, dispatching into a [`Container`].
///
/// Routes for a method are tried in registration order and the first match
/// wins; no specificity ranking is applied.
///
/// ```
/// use trellis_core::{Router, Target};
///
/// let mut router = Router::new();
/// router.get("hello/{name}", Target::callable(|captures: &[String]| {
///     Ok(format!("Hello, {}!", captures[0]))
/// }));
///
/// let result = router.dispatch("GET", "/hello/ada").unwrap();
/// assert_eq!(result.downcast_ref::<String>().unwrap(), "Hello, ada!");
/// ```
#[derive(Debug)]
pub struct Router {
    routes: HashMap<HttpMethod, Vec<Route>>,
    container: Container,
    options: RouterOptions,
}

impl Router {
    pub fn new() -> Self {
        Self::with_container(Container::new())
    }

    pub fn with_container(container: Container) -> Self {
        Self {
            routes: HashMap::new(),
            container,
            options: RouterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RouterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn into_container(self) -> Container {
        self.container
    }

    /// Register a route, returning it for constraint chaining.
    ///
    /// Registering the same path string twice under one method replaces the
    /// earlier route in place.
    pub fn register(
        &mut self,
        method: HttpMethod,
        path: &str,
        target: impl Into<Target>,
    ) -> &mut Route {
        let route = Route::new(path, target.into());
        let routes = self.routes.entry(method).or_default();

        let index = match routes.iter().position(|existing| existing.path() == path) {
            Some(index) => {
                debug!(method = %method, path = path, "Route overwritten");
                routes[index] = route;
                index
            }
            None => {
                debug!(method = %method, path = path, "Route registered");
                routes.push(route);
                routes.len() - 1
            }
        };

        &mut routes[index]
    }

    pub fn get(&mut self, path: &str, target: impl Into<Target>) -> &mut Route {
        self.register(HttpMethod::GET, path, target)
    }

    pub fn post(&mut self, path: &str, target: impl Into<Target>) -> &mut Route {
        self.register(HttpMethod::POST, path, target)
    }

    pub fn put(&mut self, path: &str, target: impl Into<Target>) -> &mut Route {
        self.register(HttpMethod::PUT, path, target)
    }

    pub fn patch(&mut self, path: &str, target: impl Into<Target>) -> &mut Route {
        self.register(HttpMethod::PATCH, path, target)
    }

    pub fn delete(&mut self, path: &str, target: impl Into<Target>) -> &mut Route {
        self.register(HttpMethod::DELETE, path, target)
    }

    /// Routes registered for `method`, in registration order.
    pub fn routes(&self, method: HttpMethod) -> &[Route] {
        self.routes.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Dispatch the request described by `context`.
    pub fn run(&mut self, context: &RequestContext) -> Result<Instance> {
        let method = context.method.as_deref().unwrap_or_default();
        self.dispatch(method, context.path_only())
    }

    /// Match `path` against the routes for `method` and invoke the first hit.
    pub fn dispatch(&mut self, method: &str, path: &str) -> Result<Instance> {
        let method = method.trim();
        if method.is_empty() {
            warn!(path = path, "Dispatch without a request method");
            return Err(Error::RequestMethodNotFound);
        }

        let span = debug_span!("dispatch", method = method, path = path);
        let _enter = span.enter();

        let no_route = || Error::NoRouteFound {
            method: method.to_uppercase(),
            path: path.to_string(),
        };

        let Some(http_method) = HttpMethod::from_str(method) else {
            warn!("Unknown request method");
            return Err(no_route());
        };

        let Some(routes) = self
            .routes
            .get_mut(&http_method)
            .filter(|routes| !routes.is_empty())
        else {
            warn!("No routes registered for method");
            return Err(no_route());
        };

        for route in routes.iter_mut() {
            if route.matches(path)? {
                debug!(pattern = route.pattern(), "Route matched");
                return invoke(&mut self.container, &self.options, route);
            }
        }

        warn!("No route matched");
        Err(no_route())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Call a matched route's target with its captures.
fn invoke(container: &mut Container, options: &RouterOptions, route: &Route) -> Result<Instance> {
    container.bind_route_parameters(
        route
            .params()
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );

    match route.target() {
        Target::Callable(callable) => {
            trace!(captures = route.captures().len(), "Invoking callable target");
            callable(route.captures())
        }
        Target::Action { controller, method } => {
            let controller = controller_id(options, controller);
            let method = method.as_deref().unwrap_or(&options.default_action);
            container.call_action(&controller, method, route.captures())
        }
    }
}

/// Registry identifier for a descriptor's controller part.
fn controller_id(options: &RouterOptions, controller: &str) -> String {
    let mut chars = controller.chars();
    let name = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    match options.controller_namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => format!("{}::{}", namespace, name),
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Target {
        Target::callable(|captures: &[String]| Ok(captures.to_vec()))
    }

    fn captures_of(result: Instance) -> Vec<String> {
        result
            .downcast_ref::<Vec<String>>()
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_dispatch_callable() {
        let mut router = Router::new();
        router.get("users/{id}", echo());

        let result = router.dispatch("GET", "/users/42").unwrap();
        assert_eq!(captures_of(result), ["42"]);
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let mut router = Router::new();
        router.post("items", echo());
        assert!(router.dispatch("post", "items").is_ok());
    }

    #[test]
    fn test_missing_method() {
        let mut router = Router::new();
        router.get("/", echo());
        assert!(matches!(
            router.dispatch("", "/"),
            Err(Error::RequestMethodNotFound)
        ));
        assert!(matches!(
            router.run(&RequestContext::without_method("/")),
            Err(Error::RequestMethodNotFound)
        ));
    }

    #[test]
    fn test_no_routes_for_method() {
        let mut router = Router::new();
        router.get("users", echo());

        assert!(matches!(
            router.dispatch("POST", "users"),
            Err(Error::NoRouteFound { .. })
        ));
        assert!(matches!(
            router.dispatch("BREW", "users"),
            Err(Error::NoRouteFound { .. })
        ));
    }

    #[test]
    fn test_no_route_matches() {
        let mut router = Router::new();
        router.get("users/{id}", echo());
        let err = router.dispatch("GET", "posts/1").unwrap_err();
        assert_eq!(err.to_string(), "No route matches GET posts/1");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_first_registered_wins() {
        let mut router = Router::new();
        router.get("a/{x}", Target::callable(|_c: &[String]| Ok("general")));
        router.get("a/fixed", Target::callable(|_c: &[String]| Ok("fixed")));

        let result = router.dispatch("GET", "a/fixed").unwrap();
        assert_eq!(result.downcast_ref::<&str>(), Some(&"general"));
    }

    #[test]
    fn test_same_path_overwrites_in_place() {
        let mut router = Router::new();
        router.get("a", Target::callable(|_c: &[String]| Ok(1i64)));
        router.get("b", Target::callable(|_c: &[String]| Ok(2i64)));
        router.get("a", Target::callable(|_c: &[String]| Ok(3i64)));

        let routes = router.routes(HttpMethod::GET);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path(), "a");

        let result = router.dispatch("GET", "a").unwrap();
        assert_eq!(result.downcast_ref::<i64>(), Some(&3));
    }

    #[test]
    fn test_register_returns_route_for_constraints() {
        let mut router = Router::new();
        router.get("users/{id}", echo()).with_constraint("id", "\\d+");

        assert!(router.dispatch("GET", "users/12").is_ok());
        assert!(router.dispatch("GET", "users/ab").is_err());
    }

    #[test]
    fn test_captures_bound_into_container() {
        let mut router = Router::new();
        router.get("orders/{order_id}", echo());
        router.dispatch("GET", "orders/77").unwrap();

        let bound = router.container_mut().get_as::<String>("order_id").unwrap();
        assert_eq!(bound.as_str(), "77");
    }

    #[test]
    fn test_run_strips_query() {
        let mut router = Router::new();
        router.get("search/{term}", echo());

        let result = router
            .run(&RequestContext::new("GET", "/search/rust?page=2"))
            .unwrap();
        assert_eq!(captures_of(result), ["rust"]);
    }

    #[test]
    fn test_controller_id() {
        let options = RouterOptions::default();
        assert_eq!(controller_id(&options, "userController"), "UserController");

        let options = RouterOptions {
            controller_namespace: Some("app".to_string()),
            ..RouterOptions::default()
        };
        assert_eq!(controller_id(&options, "Home"), "app::Home");
    }
}
