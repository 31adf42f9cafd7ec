//! Field injection
//!
//! Records opt in by implementing [`Injectable`] (by hand or with the
//! [`injectable!`](crate::injectable) macro) and listing each field with the
//! matching [`FieldInjector`] method:
//!
//! - [`FieldInjector::field`] for `Option<Arc<T>>` fields keyed by `T`. A
//!   field-setter entry writes the field itself; a value or factory result is
//!   assigned; when nothing is registered the field is left as it was.
//! - [`FieldInjector::scope`] for `Option<Scope>` fields, which receive a
//!   handle to the scope doing the injection.
//! - [`FieldInjector::walk`] for nested records whose own fields should be
//!   injected.
//!
//! ```rust
//! use std::sync::Arc;
//! use arbor_scope::{injectable, Scope};
//!
//! struct Greeting(&'static str);
//!
//! #[derive(Default)]
//! struct Handler {
//!     greeting: Option<Arc<Greeting>>,
//!     owner: Option<Scope>,
//! }
//!
//! injectable!(Handler { field greeting, scope owner });
//!
//! let root = Scope::root();
//! root.set(Greeting("hello"));
//! let handler: Handler = root.build();
//! assert_eq!(handler.greeting.unwrap().0, "hello");
//! assert!(handler.owner.is_some());
//! ```

use std::any::Any;
use std::sync::Arc;

use tracing::warn;

use crate::key::CapabilityKey;
use crate::resolver::{self, Resolved};
use crate::Scope;

/// A record whose fields can be populated from a scope
pub trait Injectable {
    fn inject_fields(&mut self, fields: &mut FieldInjector<'_>);
}

/// What a single [`Scope::inject`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectReport {
    /// Fields assigned from a value or factory
    pub resolved: usize,
    /// Fields written by a field-setter
    pub produced: usize,
    /// Fields that received the injecting scope
    pub self_injected: usize,
    /// Nested records descended into
    pub walked: usize,
    /// Fields left untouched because nothing was registered
    pub missing: usize,
}

/// Per-call injection state handed to [`Injectable::inject_fields`]
pub struct FieldInjector<'s> {
    scope: &'s Scope,
    report: InjectReport,
}

impl<'s> FieldInjector<'s> {
    pub(crate) fn new(scope: &'s Scope) -> Self {
        Self {
            scope,
            report: InjectReport::default(),
        }
    }

    pub(crate) fn finish(self) -> InjectReport {
        self.report
    }

    /// The scope being injected from
    pub fn active_scope(&self) -> &'s Scope {
        self.scope
    }

    /// Inject a field keyed by its capability type `T`
    pub fn field<T: Send + Sync + 'static>(&mut self, slot: &mut Option<Arc<T>>) -> &mut Self {
        let key = CapabilityKey::of::<T>();
        match resolver::resolve(self.scope, &key) {
            Some(Resolved::Setter(setter)) => {
                setter(self.scope, slot as &mut dyn Any);
                self.report.produced += 1;
            }
            Some(Resolved::Value(value)) => match value.downcast::<T>() {
                Ok(value) => {
                    *slot = Some(value);
                    self.report.resolved += 1;
                }
                Err(_) => {
                    warn!(capability = key.name(), "skipping field with mismatched value type");
                    self.report.missing += 1;
                }
            },
            None => self.report.missing += 1,
        }
        self
    }

    /// Hand the injecting scope itself to the field
    pub fn scope(&mut self, slot: &mut Option<Scope>) -> &mut Self {
        *slot = Some(self.scope.clone());
        self.report.self_injected += 1;
        self
    }

    /// Descend into a nested injectable record
    pub fn walk<R: Injectable + ?Sized>(&mut self, nested: &mut R) -> &mut Self {
        self.report.walked += 1;
        nested.inject_fields(self);
        self
    }
}

/// Implement [`Injectable`] for a struct by listing its fields.
///
/// Each item is `field name`, `scope name` or `walk name`, matching the
/// [`FieldInjector`] method used for that field.
///
/// ```rust
/// use std::sync::Arc;
/// use arbor_scope::injectable;
///
/// struct Database;
///
/// #[derive(Default)]
/// struct Repository {
///     db: Option<Arc<Database>>,
/// }
///
/// #[derive(Default)]
/// struct Service {
///     repository: Repository,
/// }
///
/// injectable!(Repository { field db });
/// injectable!(Service { walk repository });
/// ```
#[macro_export]
macro_rules! injectable {
    ($ty:ty { $($kind:ident $field:ident),* $(,)? }) => {
        impl $crate::Injectable for $ty {
            fn inject_fields(&mut self, fields: &mut $crate::FieldInjector<'_>) {
                $( fields.$kind(&mut self.$field); )*
            }
        }
    };
}
