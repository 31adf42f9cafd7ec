//! Scoped resource container for Arbor
//!
//! A tree of scopes, each holding a type-keyed table of values, factories and
//! field-setters. Lookups walk toward the root; writes stay on the scope that
//! makes them. Scopes are reference counted: a scope finalizes once its owner
//! has let go and every child forked from it has finalized, at which point its
//! disposal hooks run, its node returns to the pool and it releases its own
//! parent.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use arbor_scope::Scope;
//!
//! struct Config(&'static str);
//! struct RequestId(u64);
//!
//! let root = Scope::root();
//! root.set(Config("production"));
//!
//! // one child per unit of work
//! let request = root.fork();
//! request.set(RequestId(17));
//!
//! assert_eq!(request.resolve::<Config>().unwrap().0, "production");
//! assert!(root.resolve::<RequestId>().is_none());
//!
//! // dropping the handle disposes the scope
//! drop(request);
//! ```
//!
//! See [`inject`] for field injection and [`provider`] for bootstrap-time
//! registration.

pub mod builder;
pub mod config;
pub mod entry;
pub mod error;
pub mod inject;
pub mod key;
pub mod logging;
pub mod provider;
pub mod registration;
pub mod work;

mod lifecycle;
mod pool;
mod resolver;
mod scope;
mod table;

pub use builder::ScopeBuilder;
pub use config::{ConfigLoader, LoggingConfig, NodePoolConfig, ObjectPoolConfig, ScopeConfig};
pub use entry::{Dispose, DisposeHook, Entry, EntryKind};
pub use error::{ScopeError, ScopeResult};
pub use inject::{FieldInjector, InjectReport, Injectable};
pub use key::CapabilityKey;
pub use logging::{init_logging, LogLevel};
pub use pool::PoolStats;
pub use provider::{ProviderRegistry, ScopeProvider};
pub use registration::{
    discovered_registration_count, list_discovered_registrations, register_discovered,
    ScopeRegistration,
};
pub use scope::Scope;
pub use work::{run_unit, UnitOfWork};
