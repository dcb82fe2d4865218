// Test assertions for dispatch results and routes

use std::any::{type_name, Any};
use std::fmt::Debug;
use trellis_core::{Error, Instance, Result, Route};

/// Assert that a dispatch succeeded with a `T` equal to `expected`.
pub fn assert_result<T>(result: &Result<Instance>, expected: &T)
where
    T: Any + PartialEq + Debug,
{
    let value = match result {
        Ok(value) => value,
        Err(err) => panic!("Expected {:?}, dispatch failed: {}", expected, err),
    };

    let actual = value.downcast_ref::<T>().unwrap_or_else(|| {
        panic!(
            "Expected a result of type {}, got a different type",
            type_name::<T>()
        )
    });
    assert_eq!(actual, expected, "Dispatch results do not match");
}

/// Assert that a dispatch failed with the given HTTP status.
pub fn assert_dispatch_error(result: &Result<Instance>, expected_status: u16) {
    match result {
        Ok(_) => panic!("Expected an error with status {}, dispatch succeeded", expected_status),
        Err(err) => assert_eq!(
            err.status_code(),
            expected_status,
            "Expected status {}, got {} ({})",
            expected_status,
            err.status_code(),
            err
        ),
    }
}

/// Assert that a dispatch failed and the error satisfies `predicate`.
pub fn assert_error_matches<F>(result: &Result<Instance>, description: &str, predicate: F)
where
    F: FnOnce(&Error) -> bool,
{
    match result {
        Ok(_) => panic!("Expected {}, dispatch succeeded", description),
        Err(err) => assert!(predicate(err), "Expected {}, got: {}", description, err),
    }
}

/// Assert the captures of a route's last successful match, in order.
pub fn assert_captures(route: &Route, expected: &[&str]) {
    assert_eq!(
        route.captures(),
        expected,
        "Unexpected captures for route '{}'",
        route.pattern()
    );
}

/// Assert one named parameter of a route's last successful match.
pub fn assert_param(route: &Route, name: &str, expected: &str) {
    let actual = route.param(name);
    assert_eq!(
        actual,
        Some(expected),
        "Expected parameter '{}' to be '{}', got {:?}",
        name,
        expected,
        actual
    );
}
