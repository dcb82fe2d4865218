// Trellis - a minimal MVC micro-framework for Rust
//
// An autowiring dependency injection container and a regex path router that
// dispatches matched requests to controller methods resolved by the container.

// Re-export core functionality
pub use trellis_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use trellis_config;

#[cfg(feature = "testing")]
pub use trellis_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Arguments, ClassRegistry, Container, ContainerOptions, Definition, Error, HttpMethod,
        Instance, ParameterSpec, RequestContext, Result, Route, Router, RouterOptions, Target,
        TypeDescriptor, TypeRegistry,
    };

    #[cfg(feature = "config")]
    pub use trellis_config::{ConfigManager, FrameworkSettings};
}
