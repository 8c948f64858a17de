//! Capacity and expiry configuration for [`EvictingCache`](crate::EvictingCache).

use std::num::NonZeroUsize;
use std::time::Duration;

/// Eviction configuration for an [`EvictingCache`](crate::EvictingCache).
///
/// Both knobs are independent and default to "disabled":
/// - `capacity`: maximum entry count; exceeding it evicts the
///   least-recently-used entry. `None` means unbounded.
/// - `ttl`: relative expiry applied from an entry's last read or write.
///   `None` means entries never expire.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use strand_cache::CachePolicy;
///
/// // Pure LRU, at most 1000 entries.
/// let policy = CachePolicy::lru(1000);
///
/// // Pure TTL, entries live 5 minutes past their last access.
/// let policy = CachePolicy::ttl(Duration::from_secs(300));
///
/// // Combined bound.
/// let policy = CachePolicy::unbounded()
///     .with_capacity(1000)
///     .with_ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
	capacity: Option<NonZeroUsize>,
	ttl: Option<Duration>,
}

impl CachePolicy {
	/// Creates a policy with no capacity bound and no expiry.
	#[must_use]
	pub const fn unbounded() -> Self {
		Self {
			capacity: None,
			ttl: None,
		}
	}

	/// Creates a pure LRU policy bounded to `capacity` entries.
	///
	/// A `capacity` of zero is treated as unbounded.
	#[must_use]
	pub fn lru(capacity: usize) -> Self {
		Self::unbounded().with_capacity(capacity)
	}

	/// Creates a pure TTL policy where entries expire `ttl` after their
	/// last read or write.
	#[must_use]
	pub fn ttl(ttl: Duration) -> Self {
		Self::unbounded().with_ttl(ttl)
	}

	/// Sets the maximum entry count. Zero is treated as unbounded.
	#[must_use]
	pub fn with_capacity(mut self, capacity: usize) -> Self {
		self.capacity = NonZeroUsize::new(capacity);
		self
	}

	/// Sets the relative expiry applied from each entry's last access.
	///
	/// A zero duration disables expiry, matching the "no timer overhead
	/// for pure-LRU use" contract.
	#[must_use]
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = if ttl.is_zero() { None } else { Some(ttl) };
		self
	}

	/// Returns the configured capacity bound, if any.
	#[must_use]
	pub fn capacity(&self) -> Option<NonZeroUsize> {
		self.capacity
	}

	/// Returns the configured time-to-live, if any.
	#[must_use]
	pub fn time_to_live(&self) -> Option<Duration> {
		self.ttl
	}

	/// Returns true if either eviction mechanism is active.
	#[must_use]
	pub fn bounds_entries(&self) -> bool {
		self.capacity.is_some() || self.ttl.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_policy_is_unbounded() {
		let policy = CachePolicy::default();
		assert_eq!(policy, CachePolicy::unbounded());
		assert_eq!(policy.capacity(), None);
		assert_eq!(policy.time_to_live(), None);
		assert!(!policy.bounds_entries());
	}

	#[test]
	fn lru_builder() {
		let policy = CachePolicy::lru(100);
		assert_eq!(policy.capacity(), NonZeroUsize::new(100));
		assert_eq!(policy.time_to_live(), None);
		assert!(policy.bounds_entries());
	}

	#[test]
	fn ttl_builder() {
		let ttl = Duration::from_secs(300);
		let policy = CachePolicy::ttl(ttl);
		assert_eq!(policy.capacity(), None);
		assert_eq!(policy.time_to_live(), Some(ttl));
		assert!(policy.bounds_entries());
	}

	#[test]
	fn zero_capacity_means_unbounded() {
		let policy = CachePolicy::lru(0);
		assert_eq!(policy.capacity(), None);
		assert!(!policy.bounds_entries());
	}

	#[test]
	fn zero_ttl_disables_expiry() {
		let policy = CachePolicy::ttl(Duration::ZERO);
		assert_eq!(policy.time_to_live(), None);
	}

	#[test]
	fn fluent_builder_combines_bounds() {
		let policy = CachePolicy::unbounded()
			.with_capacity(500)
			.with_ttl(Duration::from_secs(120));
		assert_eq!(policy.capacity(), NonZeroUsize::new(500));
		assert_eq!(policy.time_to_live(), Some(Duration::from_secs(120)));
	}
}
