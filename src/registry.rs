//! [MapRegistry]: a thin, hash-map-backed mapping from wire type ids to descriptors and
//! serializer plug-ins.
//!
//! This crate does not dictate how an application decides which Rust type a `type_id` means; it
//! only needs a place to look that decision up once a [crate::reader::Reader] has told it which
//! `type_id` is on the wire. [TypeDescriptor] is the minimal shape that lookup requires.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::serializer::Serializer;

/// What a registry needs to know about a user type beyond its wire id.
pub trait TypeDescriptor {
    fn type_id(&self) -> i32;

    /// Evolvable types preserve properties they don't recognize (via
    /// [crate::reader::Reader::read_remainder]) across a decode/re-encode cycle. Per the identity
    /// sharing rules, an evolvable type's values are never eligible for `T_REFERENCE` sharing,
    /// since a later writer might re-encode it with additional properties a shared reference would
    /// then silently miss.
    fn is_evolvable(&self) -> bool {
        false
    }
}

struct Entry<D> {
    descriptor: D,
    serializer: Rc<dyn Serializer>,
}

/// A `HashMap`-backed [TypeDescriptor] + [Serializer] registry, keyed by wire type id.
pub struct MapRegistry<D> {
    entries: HashMap<i32, Entry<D>>,
}

impl<D> Default for MapRegistry<D> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<D: TypeDescriptor> MapRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` under its own `type_id()`, along with the serializer that knows how
    /// to encode/decode its properties. Replaces any existing registration for that id.
    pub fn register(&mut self, descriptor: D, serializer: Rc<dyn Serializer>) {
        let type_id = descriptor.type_id();
        self.entries.insert(
            type_id,
            Entry {
                descriptor,
                serializer,
            },
        );
    }

    pub fn unregister(&mut self, type_id: i32) -> Option<D> {
        self.entries.remove(&type_id).map(|e| e.descriptor)
    }

    pub fn type_for(&self, type_id: i32) -> Result<&D> {
        self.entries
            .get(&type_id)
            .map(|e| &e.descriptor)
            .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_id), Default::default()))
    }

    pub fn serializer_for(&self, type_id: i32) -> Result<Rc<dyn Serializer>> {
        self.entries
            .get(&type_id)
            .map(|e| e.serializer.clone())
            .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_id), Default::default()))
    }

    pub fn type_id_for(&self, descriptor: &D) -> i32 {
        descriptor.type_id()
    }

    /// Whether values of `type_id` may be registered for `T_REFERENCE` sharing (spec §9: disabled
    /// for evolvable types).
    pub fn reference_enabled(&self, type_id: i32) -> Result<bool> {
        Ok(!self.type_for(type_id)?.is_evolvable())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::value::Value;

    struct NoopSerializer(i32);

    impl Serializer for NoopSerializer {
        fn type_id(&self) -> i32 {
            self.0
        }

        fn encode(&self, _value: &Value, _w: &mut dyn Handler) -> Result<()> {
            Ok(())
        }

        fn decode(&self, properties: &[(i32, Value)]) -> Result<Value> {
            Ok(Value::UserType(self.0, 0, properties.to_vec()))
        }
    }

    #[derive(Clone, Copy)]
    struct Descriptor {
        id: i32,
        evolvable: bool,
    }

    impl TypeDescriptor for Descriptor {
        fn type_id(&self) -> i32 {
            self.id
        }

        fn is_evolvable(&self) -> bool {
            self.evolvable
        }
    }

    #[test]
    fn unknown_type_id_is_an_error() {
        let registry: MapRegistry<Descriptor> = MapRegistry::new();
        assert!(matches!(
            registry.type_for(7).unwrap_err().kind(),
            ErrorKind::UnknownType(7)
        ));
    }

    #[test]
    fn registered_type_is_found_and_unregisters_cleanly() {
        let mut registry = MapRegistry::new();
        registry.register(
            Descriptor {
                id: 4,
                evolvable: false,
            },
            Rc::new(NoopSerializer(4)),
        );
        assert_eq!(registry.type_for(4).unwrap().id, 4);
        assert!(registry.serializer_for(4).is_ok());
        assert!(registry.unregister(4).is_some());
        assert!(registry.type_for(4).is_err());
    }

    #[test]
    fn evolvable_types_disable_reference_sharing() {
        let mut registry = MapRegistry::new();
        registry.register(
            Descriptor {
                id: 1,
                evolvable: true,
            },
            Rc::new(NoopSerializer(1)),
        );
        registry.register(
            Descriptor {
                id: 2,
                evolvable: false,
            },
            Rc::new(NoopSerializer(2)),
        );
        assert!(!registry.reference_enabled(1).unwrap());
        assert!(registry.reference_enabled(2).unwrap());
    }
}
