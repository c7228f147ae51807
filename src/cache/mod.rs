//! Audio cache keyed by voice + normalized text.

mod audio_cache;
mod key;
mod store;

pub use audio_cache::{AudioCache, CacheStats};
pub use key::CacheKey;
pub use store::{DiskStore, DurableStore, StoredEntry};
