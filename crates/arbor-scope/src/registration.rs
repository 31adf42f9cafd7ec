//! Link-time registration discovery using the `inventory` crate
//!
//! A collaborating crate can submit a [`ScopeRegistration`] so that any root
//! built with [`ScopeBuilder::discover`](crate::ScopeBuilder::discover) picks
//! its capabilities up without being listed explicitly:
//!
//! ```rust,ignore
//! use arbor_scope::{Scope, ScopeRegistration, ScopeResult};
//!
//! fn register_views(root: &Scope) -> ScopeResult<()> {
//!     root.set(ViewRenderer::new());
//!     Ok(())
//! }
//!
//! inventory::submit! {
//!     ScopeRegistration::new("views", register_views)
//! }
//! ```

use tracing::{debug, info};

use crate::error::ScopeResult;
use crate::Scope;

/// A registration function discovered at link time
pub struct ScopeRegistration {
    /// Name of the capability group (e.g. "sessions", "views")
    pub name: &'static str,

    /// Registers capabilities on the root scope
    pub register_fn: fn(&Scope) -> ScopeResult<()>,

    /// Registration order (lower = earlier, default = 100)
    pub priority: u32,
}

impl ScopeRegistration {
    /// Registration with the default priority
    pub const fn new(name: &'static str, register_fn: fn(&Scope) -> ScopeResult<()>) -> Self {
        Self {
            name,
            register_fn,
            priority: 100,
        }
    }

    /// Registration with an explicit priority
    pub const fn with_priority(
        name: &'static str,
        register_fn: fn(&Scope) -> ScopeResult<()>,
        priority: u32,
    ) -> Self {
        Self {
            name,
            register_fn,
            priority,
        }
    }
}

inventory::collect!(ScopeRegistration);

/// Run every discovered registration against `root`, lowest priority first.
/// Equal priorities keep discovery order.
pub fn register_discovered(root: &Scope) -> ScopeResult<()> {
    let mut registrations: Vec<&ScopeRegistration> =
        inventory::iter::<ScopeRegistration>().collect();
    registrations.sort_by_key(|r| r.priority);

    info!(
        "Discovered {} scope registrations via inventory",
        registrations.len()
    );

    for registration in registrations {
        debug!(
            "Running registration '{}' (priority: {})",
            registration.name, registration.priority
        );
        (registration.register_fn)(root)?;
    }
    Ok(())
}

/// Number of registrations linked into the binary
pub fn discovered_registration_count() -> usize {
    inventory::iter::<ScopeRegistration>().count()
}

/// Names of the registrations linked into the binary
pub fn list_discovered_registrations() -> Vec<&'static str> {
    inventory::iter::<ScopeRegistration>()
        .map(|r| r.name)
        .collect()
}
