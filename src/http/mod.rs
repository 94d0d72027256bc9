//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → request.rs (request ID, cookies, client IP)
//!     → routing::Dispatcher::resolve (current snapshot)
//!     → response.rs (redirect / failure / descriptor JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{app, AppState, HttpServer};
