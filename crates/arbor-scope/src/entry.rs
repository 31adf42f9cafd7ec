//! Table entries
//!
//! An [`Entry<T>`] is built with the type it will be stored under, so a value,
//! factory or setter can never be registered under the wrong capability key.
//! Inside the table the type is erased into a [`Producer`].

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::Scope;

pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;
pub(crate) type FactoryFn = dyn Fn(&Scope) -> AnyValue + Send + Sync;
pub(crate) type SetterFn = dyn Fn(&Scope, &mut dyn Any) + Send + Sync;

/// Hook invoked once when the owning scope finalizes
pub type DisposeHook = Box<dyn FnOnce() + Send + Sync>;

/// Values that release resources when the scope holding them finalizes
pub trait Dispose: Send + Sync {
    fn dispose(&self);
}

/// Category of a stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Returned verbatim on every resolution
    Value,
    /// Invoked with the resolving scope on every resolution
    Factory,
    /// Writes straight into an injected field
    Setter,
}

#[derive(Clone)]
pub(crate) enum Producer {
    Value(AnyValue),
    Factory(Arc<FactoryFn>),
    Setter(Arc<SetterFn>),
}

impl Producer {
    pub(crate) fn kind(&self) -> EntryKind {
        match self {
            Producer::Value(_) => EntryKind::Value,
            Producer::Factory(_) => EntryKind::Factory,
            Producer::Setter(_) => EntryKind::Setter,
        }
    }
}

/// A value, factory or field-setter for capability `T`, optionally carrying a
/// disposal hook.
pub struct Entry<T: ?Sized> {
    producer: Producer,
    dispose: Option<DisposeHook>,
    _capability: PhantomData<fn() -> Box<T>>,
}

impl<T: Send + Sync + 'static> Entry<T> {
    /// Concrete value
    pub fn value(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// Concrete value that is already shared
    pub fn shared(value: Arc<T>) -> Self {
        Self::from_producer(Producer::Value(value as AnyValue))
    }

    /// Factory invoked with the originating scope on each resolution
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Scope) -> Arc<T> + Send + Sync + 'static,
    {
        let erased = move |scope: &Scope| -> AnyValue { factory(scope) as AnyValue };
        Self::from_producer(Producer::Factory(Arc::new(erased)))
    }

    /// Field-setter that decides what lands in the injected field
    pub fn setter<F>(setter: F) -> Self
    where
        F: Fn(&Scope, &mut Option<Arc<T>>) + Send + Sync + 'static,
    {
        let erased = move |scope: &Scope, slot: &mut dyn Any| {
            if let Some(slot) = slot.downcast_mut::<Option<Arc<T>>>() {
                setter(scope, slot);
            }
        };
        Self::from_producer(Producer::Setter(Arc::new(erased)))
    }
}

impl<T: Dispose + 'static> Entry<T> {
    /// Concrete value whose [`Dispose::dispose`] runs at finalization
    pub fn disposable(value: T) -> Self {
        let value = Arc::new(value);
        let hook_target = Arc::clone(&value);
        Self::shared(value).on_dispose(move || hook_target.dispose())
    }
}

impl<T: ?Sized> Entry<T> {
    fn from_producer(producer: Producer) -> Self {
        Self {
            producer,
            dispose: None,
            _capability: PhantomData,
        }
    }

    /// Attach a disposal hook. Replaces any hook set earlier.
    pub fn on_dispose<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        self.dispose = Some(Box::new(hook));
        self
    }

    pub fn kind(&self) -> EntryKind {
        self.producer.kind()
    }

    pub fn is_disposable(&self) -> bool {
        self.dispose.is_some()
    }

    pub(crate) fn into_erased(self) -> ErasedEntry {
        ErasedEntry {
            producer: self.producer,
            dispose: self.dispose,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("kind", &self.kind())
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

/// Entry as stored in a value table
pub(crate) struct ErasedEntry {
    pub(crate) producer: Producer,
    pub(crate) dispose: Option<DisposeHook>,
}
