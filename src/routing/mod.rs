//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → tokenizer.rs (segments: raw text + case-folded key)
//!     → matcher.rs (descend tree, fold policy, run gates, pick method)
//!         ↳ policy.rs (inheritance accumulator)
//!         ↳ gate.rs (Authenticator collaborator, sticky block)
//!     → binder.rs (positional parameters, arity policy)
//!     → descriptor.rs (assemble RouteDescriptor)
//!     → Return: Resolved | NotFound | Redirect
//!
//! Route tree construction (at load):
//!     [routes] TOML table
//!     → tree.rs (classify keys, typed nodes, structural errors)
//!     → config::validation (semantic checks)
//!     → Freeze inside an immutable Dispatcher (router.rs)
//! ```
//!
//! # Design Decisions
//! - Tree built at load, immutable at runtime
//! - All per-request state lives in one stack-local walk
//! - Deterministic: same path and grants always give the same outcome
//! - Client mistakes are outcomes, not errors

pub mod binder;
pub mod descriptor;
pub mod gate;
pub mod matcher;
pub mod policy;
pub mod router;
pub mod tokenizer;
pub mod tree;

pub use binder::{ArityViolation, Bound, BoundParameters};
pub use descriptor::{Resolution, RouteDescriptor};
pub use gate::{Authenticator, GrantedTags};
pub use router::Dispatcher;
pub use tree::{RouteTree, TreeError};
