//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID set and echoed)
//!     → GET /health → health aggregator
//!     → anything else → controllers.rs (conventional route dispatch)
//!     → response.rs (failures mapped to status codes)
//!     → middleware/status_pages.rs (empty error bodies rendered)
//!     → Send to client
//! ```

pub mod controllers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use response::{AppError, ErrorDocument};
pub use server::{AppState, HttpServer, ServerSettings};
