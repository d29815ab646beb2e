use std::any::Any;
use std::sync::Arc;

use jiff::Timestamp;

/// An opaque value held by [`super::Storage`] alongside its expiration.
///
/// `expiresAt` is the sole eviction criterion: [`StorageValue::is_expired`]
/// is the only thing that decides whether an entry is still live.
#[derive(Clone)]
pub struct StorageValue {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Timestamp,
}

impl StorageValue {
    /// Wraps `value`, expiring at `expires_at`.
    pub fn new(value: impl Any + Send + Sync, expires_at: Timestamp) -> Self {
        Self { value: Arc::new(value), expires_at }
    }

    /// Returns the stored value downcast to `T`, or `None` if it holds some
    /// other type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns the underlying value handle, for identity comparison in
    /// [`super::Storage::compare_and_remove`].
    #[must_use]
    pub(super) fn value_arc(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.value
    }

    /// Returns the moment this entry stops being considered live.
    #[must_use]
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Returns whether this entry has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}
