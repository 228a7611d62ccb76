#![forbid(unsafe_code)]

pub mod config;
pub mod datamodel;
pub mod incidents;
pub mod polling;
pub mod query;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
