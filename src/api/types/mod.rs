//! Wire-level types shared across the gate's endpoints

pub mod error;
pub mod json;

pub use error::{ApiError, ErrorBody, ValidationIssue};
pub use json::Json;
