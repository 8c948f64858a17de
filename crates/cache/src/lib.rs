//! Bounded in-memory caching with combined LRU and TTL eviction.
//!
//! [`EvictingCache`] is a key-value store that bounds its contents two
//! ways, both optional and configured through [`CachePolicy`]:
//!
//! * **LRU**: at most `capacity` entries; inserting past the bound evicts
//!   the least-recently-used entry.
//! * **TTL**: entries expire a fixed duration after their last read or
//!   write; reading an entry renews it.
//!
//! Every value the cache releases — eviction, expiry, overwrite, explicit
//! removal, or bulk clear — is passed to a caller-supplied disposal
//! callback exactly once, making the cache suitable for values that own
//! resources.

#![warn(missing_docs)]

mod cache;
mod policy;

pub use cache::{Disposer, EvictingCache};
pub use policy::CachePolicy;
