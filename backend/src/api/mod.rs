//! REST API modules.

pub mod declarations;
pub mod error;
pub mod health;
pub mod identity;
pub mod jobs;
pub mod packages;
pub mod reports;
pub mod users;

pub use error::{ApiError, ApiResult};
