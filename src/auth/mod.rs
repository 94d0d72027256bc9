//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Login (application code):
//!     SessionStore::start(session, tag, ip) → token
//!     → application sets cookie `<tag>=<token>` and `<session_cookie>=<session>`
//!
//! Per request (http layer):
//!     cookies + client IP
//!     → SessionStore::credentials() → SessionCredentials
//!     → Dispatcher::resolve() consults it at every gate
//! ```
//!
//! # Design Decisions
//! - Grants live in memory; a restart logs everyone out
//! - A grant is only valid together with its cookie token

pub mod session;

pub use session::{SessionCredentials, SessionError, SessionStore};
