//! Weak identity association between shared values and transfer hints.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Best-effort side table mapping a value's identity to the transferable
/// resources that should accompany it on the wire.
///
/// Keys are `Arc` allocation identities, held weakly: the table never
/// extends a value's lifetime, and slots whose value has been dropped are
/// pruned opportunistically, so the table cannot grow without bound. A
/// lost association only costs a copy instead of a transfer — it never
/// affects correctness.
pub struct TransferTable<H> {
	slots: Mutex<HashMap<usize, Slot<H>>>,
}

struct Slot<H> {
	live: Weak<dyn Any + Send + Sync>,
	hints: Vec<H>,
}

impl<H> TransferTable<H> {
	/// Creates an empty table.
	#[must_use]
	pub fn new() -> Self {
		Self {
			slots: Mutex::new(HashMap::new()),
		}
	}

	/// Associates `hints` with the identity of `value`, replacing any
	/// previous association. Dead slots are pruned on the way in.
	pub fn mark<V: Send + Sync + 'static>(&self, value: &Arc<V>, hints: Vec<H>) {
		let erased: Arc<dyn Any + Send + Sync> = Arc::clone(value) as _;
		let mut slots = self.slots.lock();
		slots.retain(|_, slot| slot.live.strong_count() > 0);
		slots.insert(
			Arc::as_ptr(value) as usize,
			Slot {
				live: Arc::downgrade(&erased),
				hints,
			},
		);
	}

	/// Removes the association for `value`, if any.
	pub fn unmark<V: Send + Sync + 'static>(&self, value: &Arc<V>) {
		self.slots.lock().remove(&(Arc::as_ptr(value) as usize));
	}

	/// Returns the number of live associations.
	#[must_use]
	pub fn len(&self) -> usize {
		self.slots
			.lock()
			.values()
			.filter(|slot| slot.live.strong_count() > 0)
			.count()
	}

	/// Returns true if no live associations exist.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<H: Clone> TransferTable<H> {
	/// Returns the hints associated with the identity of `value`, or an
	/// empty list if none were marked or the marked value has since been
	/// dropped and its address reused.
	#[must_use]
	pub fn hints_for<V: Send + Sync + 'static>(&self, value: &Arc<V>) -> Vec<H> {
		let key = Arc::as_ptr(value) as usize;
		let mut slots = self.slots.lock();
		match slots.get(&key) {
			Some(slot) if slot.live.strong_count() > 0 => slot.hints.clone(),
			Some(_) => {
				// Stale slot whose address was reused by a new value.
				slots.remove(&key);
				Vec::new()
			}
			None => Vec::new(),
		}
	}
}

impl<H> Default for TransferTable<H> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hints_are_keyed_by_identity_not_content() {
		let table = TransferTable::<u32>::new();
		let marked = Arc::new(vec![1u8, 2, 3]);
		let twin = Arc::new(vec![1u8, 2, 3]);

		table.mark(&marked, vec![7, 8]);

		assert_eq!(table.hints_for(&marked), vec![7, 8]);
		assert_eq!(table.hints_for(&twin), Vec::<u32>::new());
	}

	#[test]
	fn clones_of_the_same_arc_share_hints() {
		let table = TransferTable::<u32>::new();
		let value = Arc::new(String::from("buffer"));
		let alias = Arc::clone(&value);

		table.mark(&value, vec![1]);
		assert_eq!(table.hints_for(&alias), vec![1]);
	}

	#[test]
	fn marking_again_replaces_hints() {
		let table = TransferTable::<u32>::new();
		let value = Arc::new(0u8);

		table.mark(&value, vec![1]);
		table.mark(&value, vec![2, 3]);
		assert_eq!(table.hints_for(&value), vec![2, 3]);
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn dropped_values_free_their_slots() {
		let table = TransferTable::<u32>::new();
		let value = Arc::new(1u64);
		table.mark(&value, vec![9]);
		assert_eq!(table.len(), 1);

		drop(value);
		assert_eq!(table.len(), 0);

		// The next mark prunes the dead slot from the map entirely.
		let other = Arc::new(2u64);
		table.mark(&other, vec![1]);
		assert_eq!(table.slots.lock().len(), 1);
	}

	#[test]
	fn unmark_removes_the_association() {
		let table = TransferTable::<u32>::new();
		let value = Arc::new(1u64);
		table.mark(&value, vec![9]);
		table.unmark(&value);
		assert_eq!(table.hints_for(&value), Vec::<u32>::new());
		assert!(table.is_empty());
	}
}
