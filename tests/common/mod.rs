//! Common test utilities for audioflow integration tests

#[allow(dead_code)]
pub mod executor;
#[cfg(unix)]
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use executor::*;
#[cfg(unix)]
#[allow(unused_imports)]
pub use fixtures::*;
