//! An expiring key/value store shared by [`crate::cache::CacheComponent`]
//! and [`crate::session::SessionManager`], plus a background sweeper that
//! reclaims expired entries.
//!
//! [`Storage`] is the one piece of shared-mutable state in the crate;
//! everything else passes a [`crate::job::Job`] by ownership along a
//! channel. It's backed by [`dashmap`] rather than a `Mutex<HashMap<_>>`
//! because both the cache and the cleaner hit it concurrently from many
//! tasks and neither needs a whole-map lock to do so.

mod cleaner;
mod memory;
mod value;

pub use cleaner::StorageCleaner;
pub use memory::Storage;
pub use value::StorageValue;
