//! Testing utilities for the Trellis framework.
//!
//! - **MockController** - a registrable controller that records its calls
//! - **Assertions** - dispatch result, error and route capture checks
//!
//! ## Mock Controllers
//!
//! ```
//! use trellis_core::{ClassRegistry, Container, Router};
//! use trellis_testing::*;
//!
//! let home = MockController::new("HomeController").returning("invoke", "welcome");
//!
//! let mut registry = ClassRegistry::new();
//! home.register(&mut registry);
//!
//! let mut router = Router::with_container(Container::with_registry(registry));
//! router.get("/", "HomeController");
//!
//! let result = router.dispatch("GET", "/");
//! assert_result(&result, &"welcome".to_string());
//! assert_eq!(home.method_call_count("invoke"), 1);
//! ```
//!
//! ## Assertions
//!
//! ```
//! use trellis_core::Router;
//! use trellis_testing::*;
//!
//! let mut router = Router::new();
//! let result = router.dispatch("GET", "/missing");
//! assert_dispatch_error(&result, 404);
//! ```

mod assertions;
mod mock;

pub use assertions::{
    assert_captures, assert_dispatch_error, assert_error_matches, assert_param, assert_result,
};
pub use mock::{render_argument, MockController, MockInstance, RecordedCall};
