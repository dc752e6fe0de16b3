//! Fixture builders shared with the unit tests.

#[allow(dead_code)]
#[path = "../../src/test_helpers.rs"]
mod helpers;

#[allow(unused_imports)]
pub use helpers::*;
