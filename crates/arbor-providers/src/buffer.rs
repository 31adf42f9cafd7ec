//! Pooled byte buffers

use std::sync::Arc;

use arbor_scope::ObjectPoolConfig;
use parking_lot::Mutex;

use crate::object_pool::ObjectPool;

/// Growable byte buffer shared through a scope
#[derive(Debug, Default)]
pub struct PooledBuffer {
    bytes: Mutex<Vec<u8>>,
}

impl PooledBuffer {
    /// Empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Append `data` to the buffer
    pub fn write(&self, data: &[u8]) {
        self.bytes.lock().extend_from_slice(data);
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    /// Allocated capacity in bytes
    pub fn capacity(&self) -> usize {
        self.bytes.lock().capacity()
    }

    /// Copy of the written bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Run `f` with exclusive access to the underlying bytes
    pub fn with_bytes<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        f(&mut self.bytes.lock())
    }

    fn clear(&mut self) {
        self.bytes.get_mut().clear();
    }
}

/// Pool of buffers sized from `config`; recycled buffers come back empty
/// with their capacity kept.
pub fn buffer_pool(config: &ObjectPoolConfig) -> Arc<ObjectPool<PooledBuffer>> {
    let capacity = config.buffer_capacity;
    Arc::new(
        ObjectPool::new(move || PooledBuffer::with_capacity(capacity))
            .with_max_idle(config.max_idle)
            .with_reset(PooledBuffer::clear),
    )
}
