//! HTTP API module: routes, handlers, and error responses.

mod error;
pub mod handlers;
mod routes;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
