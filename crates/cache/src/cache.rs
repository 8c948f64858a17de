//! The evicting cache itself.

use std::borrow::Borrow;
use std::hash::Hash;

use lru::LruCache;
use tokio::time::Instant;
use tracing::trace;

use crate::CachePolicy;

/// Disposal callback invoked with each value the cache lets go of.
pub type Disposer<V> = Box<dyn FnMut(V) + Send>;

/// A stored value plus its expiry deadline, if the cache has a TTL.
struct Slot<V> {
	value: V,
	expires_at: Option<Instant>,
}

impl<V> Slot<V> {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| now >= at)
	}
}

/// A key-value store combining least-recently-used eviction with
/// time-to-live expiry, both optional (see [`CachePolicy`]).
///
/// Every value the cache removes — by explicit [`remove`](Self::remove),
/// capacity eviction, TTL expiry, overwrite, or [`clear`](Self::clear) —
/// is handed to the disposal callback exactly once. A value is never
/// observable as both stored and disposed: removal from the map always
/// happens before its disposer runs.
///
/// Expiry is deadline-based: each read or write of an entry resets its
/// deadline to `now + ttl`, and entries past their deadline are reclaimed
/// on the next touch of the cache (a `get` of that key, any `insert`, or
/// an explicit [`purge_expired`](Self::purge_expired)). Time is read
/// through [`tokio::time::Instant`], so tests can drive expiry with the
/// paused tokio clock.
///
/// Operations are serialized by the caller (`&mut self`); the cache holds
/// no interior locks and spawns no tasks.
pub struct EvictingCache<K: Hash + Eq, V> {
	entries: LruCache<K, Slot<V>>,
	policy: CachePolicy,
	dispose: Option<Disposer<V>>,
}

impl<K: Hash + Eq, V> EvictingCache<K, V> {
	/// Creates a cache with the given policy and no disposal callback.
	pub fn new(policy: CachePolicy) -> Self {
		Self {
			entries: LruCache::unbounded(),
			policy,
			dispose: None,
		}
	}

	/// Creates a cache that hands every removed or overwritten value to
	/// `dispose`.
	pub fn with_dispose(policy: CachePolicy, dispose: impl FnMut(V) + Send + 'static) -> Self {
		Self {
			entries: LruCache::unbounded(),
			policy,
			dispose: Some(Box::new(dispose)),
		}
	}

	/// Returns the eviction policy this cache was built with.
	pub fn policy(&self) -> CachePolicy {
		self.policy
	}

	/// Returns the number of stored entries.
	///
	/// Entries past their TTL deadline still count until they are
	/// reclaimed; call [`purge_expired`](Self::purge_expired) first for an
	/// exact live count.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the cache holds no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Looks up `key`, promoting the entry to most-recently-used and
	/// resetting its TTL deadline on a hit.
	///
	/// An entry past its deadline is removed, disposed, and reported as a
	/// miss. A miss has no side effects.
	pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		if self.reclaim_if_expired(key) {
			return None;
		}
		let deadline = self.fresh_deadline();
		let slot = self.entries.get_mut(key)?;
		slot.expires_at = deadline;
		Some(&slot.value)
	}

	/// Looks up `key` without promoting recency or resetting the TTL
	/// deadline. Expired entries report as absent but are not reclaimed.
	pub fn peek<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		let slot = self.entries.peek(key)?;
		if self.policy.time_to_live().is_some() && slot.is_expired(Instant::now()) {
			return None;
		}
		Some(&slot.value)
	}

	/// Returns true if a live entry exists for `key`, without touching
	/// recency or expiry.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		self.peek(key).is_some()
	}

	/// Inserts or overwrites `key`.
	///
	/// Expired entries are reclaimed first. Overwriting disposes the old
	/// value once; the entry keeps a single identity (promoted, deadline
	/// reset). A genuinely new entry that pushes the cache over capacity
	/// evicts and disposes exactly one least-recently-used entry.
	pub fn insert(&mut self, key: K, value: V) {
		self.purge_expired();

		let slot = Slot {
			value,
			expires_at: self.fresh_deadline(),
		};
		if let Some(old) = self.entries.put(key, slot) {
			self.dispose_value(old.value);
			return;
		}

		if let Some(capacity) = self.policy.capacity()
			&& self.entries.len() > capacity.get()
			&& let Some((_, evicted)) = self.entries.pop_lru()
		{
			trace!(len = self.entries.len(), "capacity eviction");
			self.dispose_value(evicted.value);
		}
	}

	/// Removes `key` if present, disposing its value. Returns whether an
	/// entry was removed; removing an absent key is a no-op.
	pub fn remove<Q>(&mut self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		match self.entries.pop_entry(key) {
			Some((_, slot)) => {
				self.dispose_value(slot.value);
				true
			}
			None => false,
		}
	}

	/// Removes every entry, then invokes the configured disposer once per
	/// drained value.
	///
	/// The map is emptied before any disposer runs, so a panicking
	/// disposer aborts the remaining disposal calls but cannot leave an
	/// entry half-removed or reachable twice. Calling `clear` again
	/// disposes nothing.
	pub fn clear(&mut self) {
		let drained = self.drain();
		for value in drained {
			self.dispose_value(value);
		}
	}

	/// Like [`clear`](Self::clear), but hands the drained values to
	/// `dispose` instead of the configured disposer.
	pub fn clear_with(&mut self, mut dispose: impl FnMut(V)) {
		for value in self.drain() {
			dispose(value);
		}
	}

	/// Removes and disposes every entry past its TTL deadline, returning
	/// how many were reclaimed.
	///
	/// Both `get` and `insert` reset deadline and recency together and the
	/// TTL is uniform, so deadline order equals LRU order: the sweep pops
	/// from the LRU end and stops at the first live entry.
	pub fn purge_expired(&mut self) -> usize {
		if self.policy.time_to_live().is_none() {
			return 0;
		}
		let now = Instant::now();
		let mut removed = 0;
		loop {
			let oldest_expired = match self.entries.peek_lru() {
				Some((_, slot)) => slot.is_expired(now),
				None => false,
			};
			if !oldest_expired {
				break;
			}
			if let Some((_, slot)) = self.entries.pop_lru() {
				self.dispose_value(slot.value);
				removed += 1;
			}
		}
		if removed > 0 {
			trace!(removed, "expired entries reclaimed");
		}
		removed
	}

	/// Iterates stored live entries in least-recently-used to
	/// most-recently-used order.
	///
	/// Iteration does not promote recency or reset deadlines; it is not
	/// equivalent to `get`. Entries past their deadline are skipped.
	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		let now = Instant::now();
		self.entries
			.iter()
			.rev()
			.filter(move |(_, slot)| !slot.is_expired(now))
			.map(|(key, slot)| (key, &slot.value))
	}

	/// Iterates live keys in least-recently-used to most-recently-used
	/// order, without touching recency.
	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.iter().map(|(key, _)| key)
	}

	/// Iterates live values in least-recently-used to most-recently-used
	/// order, without touching recency.
	pub fn values(&self) -> impl Iterator<Item = &V> {
		self.iter().map(|(_, value)| value)
	}

	fn fresh_deadline(&self) -> Option<Instant> {
		self.policy.time_to_live().map(|ttl| Instant::now() + ttl)
	}

	/// Removes and disposes `key` if its deadline has passed. Returns
	/// whether the entry was reclaimed.
	fn reclaim_if_expired<Q>(&mut self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Hash + Eq + ?Sized,
	{
		if self.policy.time_to_live().is_none() {
			return false;
		}
		let expired = match self.entries.peek(key) {
			Some(slot) => slot.is_expired(Instant::now()),
			None => false,
		};
		if expired && let Some((_, slot)) = self.entries.pop_entry(key) {
			trace!("expired entry reclaimed on access");
			self.dispose_value(slot.value);
		}
		expired
	}

	fn drain(&mut self) -> Vec<V> {
		let mut drained = Vec::with_capacity(self.entries.len());
		while let Some((_, slot)) = self.entries.pop_lru() {
			drained.push(slot.value);
		}
		drained
	}

	fn dispose_value(&mut self, value: V) {
		if let Some(dispose) = self.dispose.as_mut() {
			dispose(value);
		}
	}
}
