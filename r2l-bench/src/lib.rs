pub mod aggregate;
pub mod env_factory;
pub mod error;
pub mod executor;
pub mod experiment;
pub mod launcher;
pub mod learners;
pub mod logging;
pub mod method;
pub mod modules;
pub mod plot;
pub mod registry;
pub mod resolver;
pub mod storage;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::{BenchError, ResolveError, Result};
