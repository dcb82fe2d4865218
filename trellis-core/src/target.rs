// What a route dispatches to

use crate::reflection::{instance, Instance};
use crate::Result;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Closure target, called with the route's ordered captures.
pub type CallableFn = Arc<dyn Fn(&[String]) -> Result<Instance> + Send + Sync>;

/// A route target: either a closure or a `Controller#method` action.
#[derive(Clone)]
pub enum Target {
    Callable(CallableFn),
    /// `method` is `None` when the descriptor had no `#method` part; the
    /// router's default action applies.
    Action {
        controller: String,
        method: Option<String>,
    },
}

impl Target {
    pub fn callable<R, F>(callable: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&[String]) -> Result<R> + Send + Sync + 'static,
    {
        Target::Callable(Arc::new(move |captures: &[String]| {
            callable(captures).map(instance)
        }))
    }

    /// Parse a `"Controller#method"` descriptor.
    pub fn action(descriptor: &str) -> Self {
        let mut segments = descriptor.split('#');
        let controller = segments.next().unwrap_or_default().trim().to_string();
        let method = segments
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Target::Action { controller, method }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Target::Callable(_))
    }
}

impl From<&str> for Target {
    fn from(descriptor: &str) -> Self {
        Target::action(descriptor)
    }
}

impl From<String> for Target {
    fn from(descriptor: String) -> Self {
        Target::action(&descriptor)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Callable(_) => f.write_str("Callable"),
            Target::Action { controller, method } => match method {
                Some(method) => write!(f, "Action({}#{})", controller, method),
                None => write!(f, "Action({})", controller),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor() {
        match Target::action("UserController#show") {
            Target::Action { controller, method } => {
                assert_eq!(controller, "UserController");
                assert_eq!(method.as_deref(), Some("show"));
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_without_method() {
        let target: Target = "HomeController".into();
        assert!(matches!(
            target,
            Target::Action { ref method, .. } if method.is_none()
        ));

        let target = Target::action("HomeController#");
        assert!(matches!(
            target,
            Target::Action { ref method, .. } if method.is_none()
        ));
    }

    #[test]
    fn test_callable_wraps_result() {
        let target = Target::callable(|captures: &[String]| Ok(captures.join(",")));
        let Target::Callable(callable) = target else {
            panic!("expected a callable");
        };

        let captures = vec!["a".to_string(), "b".to_string()];
        let result = callable(captures.as_slice()).unwrap();
        assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("a,b"));
    }
}
