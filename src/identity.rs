//! The identity table shared by readers and writers to track object identity and back-references.
//!
//! On write, `register` is called with a writer-assigned id for every reference-eligible value
//! before that value's body is emitted (spec invariant: identity precedes its subject). On read,
//! decoding a `T_IDENTITY` registers the decoded value under the id the writer chose, and a later
//! `T_REFERENCE` looks it up.

use std::collections::HashMap;

/// A decoded value kept alive so that later `T_REFERENCE` tokens in the same stream can resolve to
/// it. Readers store an [`std::rc::Rc`]-wrapped value here so that multiple references observe the
/// same underlying allocation, matching spec S3's "mutating through one is visible through the
/// others" requirement for hosts that support sharing.
pub type SharedSlot<V> = std::rc::Rc<std::cell::RefCell<Option<V>>>;

/// Per-stream identity table, generic over the decoded value representation `V`.
///
/// Decoders that need cycle support allocate a placeholder slot for an id *before* decoding the
/// referenced value's body (spec §9 "Cyclic object graphs"), register it, and only then populate
/// it; a child that refers back to an ancestor resolves to that still-empty placeholder, which is
/// filled in by the time the ancestor's own decode returns.
#[derive(Debug)]
pub struct IdentityTable<V> {
    entries: HashMap<u64, SharedSlot<V>>,
}

impl<V> Default for IdentityTable<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> IdentityTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates (or returns the existing) placeholder slot for `id`, without requiring the value
    /// to be known yet. Used to support cycles: register the slot, then decode the body, then fill
    /// it with [`fill`](Self::fill).
    pub fn placeholder(&mut self, id: u64) -> SharedSlot<V> {
        self.entries
            .entry(id)
            .or_insert_with(|| std::rc::Rc::new(std::cell::RefCell::new(None)))
            .clone()
    }

    /// Registers `value` under `id`. Returns `Err(())` if `id` was already registered with a
    /// *different* value (spec `duplicate_identity`); re-registering an empty placeholder, or the
    /// same id with an equal value, is not an error.
    pub fn fill(&mut self, id: u64, value: V) -> Result<SharedSlot<V>, ()>
    where
        V: PartialEq,
    {
        let slot = self.placeholder(id);
        {
            let mut guard = slot.borrow_mut();
            match guard.as_ref() {
                Some(existing) if *existing != value => return Err(()),
                _ => *guard = Some(value),
            }
        }
        Ok(slot)
    }

    /// Looks up the slot registered for `id`, if any.
    pub fn get(&self, id: u64) -> Option<SharedSlot<V>> {
        self.entries.get(&id).cloned()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writer-side identity assignment: hands out fresh, strictly increasing ids to reference-eligible
/// values and remembers which already-emitted values have an id, so the writer can emit
/// `T_REFERENCE` instead of re-encoding an object it has seen before.
#[derive(Debug, Default)]
pub struct IdentityAssigner {
    next_id: u64,
}

impl IdentityAssigner {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    pub fn assign(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_then_fill_supports_cycles() {
        let mut table: IdentityTable<i32> = IdentityTable::new();
        let slot = table.placeholder(100);
        assert!(slot.borrow().is_none());
        table.fill(100, 7).unwrap();
        assert_eq!(*slot.borrow(), Some(7));
    }

    #[test]
    fn duplicate_identity_with_different_value_is_an_error() {
        let mut table: IdentityTable<i32> = IdentityTable::new();
        table.fill(1, 7).unwrap();
        assert!(table.fill(1, 8).is_err());
        assert!(table.fill(1, 7).is_ok());
    }

    #[test]
    fn missing_identity_lookup_returns_none() {
        let table: IdentityTable<i32> = IdentityTable::new();
        assert!(table.get(42).is_none());
    }
}
