// Core library for the Trellis MVC micro-framework
// Autowiring container, route compiler and dispatcher

pub mod container;
pub mod error;
pub mod http;
pub mod logging;
pub mod reflection;
pub mod route;
pub mod router;
pub mod target;

// Re-export commonly used types
pub use container::*;
pub use error::*;
pub use http::*;
pub use reflection::*;
pub use route::Route;
pub use router::*;
pub use target::*;
