// Error types for the Trellis framework

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid definition for '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Cannot resolve parameter '{parameter}' of {owner}")]
    CannotResolveParameter { parameter: String, owner: String },

    #[error("Unable to resolve the parameter '{parameter}' for the method {method}")]
    UnresolvableParameter { parameter: String, method: String },

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Resolution of '{id}' exceeded the depth limit of {limit} (path: {path})")]
    CyclicDependency {
        id: String,
        limit: usize,
        path: String,
    },

    #[error("Service '{id}' is not a {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    #[error("Request method not found")]
    RequestMethodNotFound,

    #[error("No route matches {method} {path}")]
    NoRouteFound { method: String, path: String },

    #[error("Controller class {0} not found")]
    ControllerNotFound(String),

    #[error("Method {controller}::{method}() not found")]
    MethodNotFound { controller: String, method: String },

    #[error("Invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Handler error: {0}")]
    Handler(String),
}

impl Error {
    /// Build a `Handler` error from anything displayable.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Error::Handler(message.to_string())
    }

    /// Get the HTTP status code an adapter should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NoRouteFound { .. }
            | Error::ControllerNotFound(_)
            | Error::MethodNotFound { .. } => 404,
            Error::RequestMethodNotFound => 400,
            _ => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

pub type Result<T> = std::result::Result<T, Error>;
