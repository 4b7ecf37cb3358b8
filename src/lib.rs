pub mod config;
pub mod errors;
pub mod models;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{DataPrepError, Result};
pub use services::repository::{DataContent, SessionContext};
