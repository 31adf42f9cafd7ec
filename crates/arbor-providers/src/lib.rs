//! Standard capability providers for arbor scopes
//!
//! - [`ObjectPool`] and [`pooled_entry`]: values borrowed from a pool by a
//!   field-setter and handed back when the injecting scope finalizes
//! - [`PooledBuffer`]: pooled byte buffers sized from [`ObjectPoolConfig`]
//! - [`Sequence`]: a factory producing a fresh [`SequenceNumber`] per resolve
//! - [`Clock`]: wall-clock time, overridable per scope
//!
//! [`StandardProviders`] registers all of them on a root scope. The same
//! registration is submitted through `inventory`, so a root built with
//! `ScopeBuilder::discover(true)` picks it up automatically.

pub mod buffer;
pub mod clock;
pub mod object_pool;
pub mod sequence;

use std::sync::Arc;

use arbor_scope::{
    ObjectPoolConfig, Scope, ScopeError, ScopeProvider, ScopeRegistration, ScopeResult,
};
use tracing::debug;

pub use buffer::{buffer_pool, PooledBuffer};
pub use clock::{now_entry, Clock, ManualClock, Now, SharedClock, SystemClock};
pub use object_pool::{pooled_entry, ObjectPool, ObjectPoolStats};
pub use sequence::{Sequence, SequenceNumber};

/// Registers buffers, sequence numbers and the clock on a root scope
#[derive(Debug, Clone, Default)]
pub struct StandardProviders {
    pool: ObjectPoolConfig,
}

impl StandardProviders {
    /// Providers whose buffer pool is sized from `pool`
    pub fn new(pool: ObjectPoolConfig) -> Self {
        Self { pool }
    }
}

impl ScopeProvider for StandardProviders {
    fn name(&self) -> &'static str {
        "standard-providers"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn register(&self, root: &Scope) -> ScopeResult<()> {
        let buffers = buffer_pool(&self.pool);
        root.insert(pooled_entry(&buffers));
        root.set_shared(buffers);

        let sequence = Arc::new(Sequence::default());
        root.insert(sequence.entry());
        root.set_shared(sequence);

        root.set(SharedClock::new(SystemClock));
        root.insert(now_entry());

        debug!(
            scope_id = root.id(),
            buffer_capacity = self.pool.buffer_capacity,
            "registered standard providers"
        );
        Ok(())
    }

    fn validate(&self, root: &Scope) -> ScopeResult<()> {
        let missing = if !root.contains::<PooledBuffer>() {
            Some("PooledBuffer")
        } else if !root.contains::<SequenceNumber>() {
            Some("SequenceNumber")
        } else if !root.contains::<Now>() {
            Some("Now")
        } else {
            None
        };

        match missing {
            Some(capability) => Err(ScopeError::ProviderFailed {
                provider: self.name().to_string(),
                message: format!("{} is not resolvable from the root", capability),
            }),
            None => Ok(()),
        }
    }
}

fn register_standard(root: &Scope) -> ScopeResult<()> {
    StandardProviders::default().register(root)
}

inventory::submit! {
    ScopeRegistration::with_priority("standard-providers", register_standard, 10)
}
