//! Plug-in points between this crate's byte-level machinery and concrete application types.
//!
//! Two distinct trait families cover the two ways code ends up decoding a user type:
//!
//! - [PofSerialize]/[PofDeserialize]: the static, generic path. The concrete Rust type is known at
//!   compile time, so these traits are plain generic functions under the hood — cheap, no registry
//!   lookup, no indirection. Most application code wants this.
//! - [Serializer]: the dynamic, object-safe path a [crate::registry::MapRegistry] stores as
//!   `Rc<dyn Serializer>` and dispatches through at runtime, for tooling that only learns which
//!   type it is looking at once the wire `type_id` has already been read (a pretty-printer, a
//!   generic gateway that forwards bytes between two registries). It trades the concrete type for
//!   the registry-free [crate::value::Value] shape, which keeps it dyn-compatible: a generic
//!   `encode<W: Write>` method could not be, since trait objects cannot have generic methods.

use std::io::Read;

use crate::error::Result;
use crate::handler::Handler;
use crate::reader::Reader;
use crate::value::Value;
use crate::writer::WritingHandler;

/// Implemented by a concrete Rust type that knows how to write its own properties.
pub trait PofSerialize {
    /// The non-negative wire type id this type is registered under.
    const TYPE_ID: i32;

    /// The schema version this implementation writes. Defaults to 0; override when a type has
    /// evolved and newer code must keep writing a version older readers understand, or to bump the
    /// version alongside a property layout change.
    fn version_id(&self) -> u32 {
        0
    }

    /// Writes this value's properties (but not its `type_id`/`version_id` header) to `w`. Called
    /// with a user-type frame already open; see [write_user_type].
    fn encode_properties(&self, w: &mut dyn Handler) -> Result<()>;
}

/// Implemented by a concrete Rust type that knows how to read its own properties back.
pub trait PofDeserialize: Sized {
    const TYPE_ID: i32;

    /// Reads this value's properties from an already-open user-type frame on `r`. `version_id` is
    /// whatever the writer declared, letting an implementation interpret older property layouts.
    fn decode_properties<R: Read>(r: &mut Reader<R>, version_id: u32) -> Result<Self>;
}

/// Writes `value` as a complete user-type value: opens the frame with `T::TYPE_ID` and
/// `value.version_id()`, writes its properties, and closes the frame.
pub fn write_user_type<T: PofSerialize, W: std::io::Write>(
    value: &T,
    w: &mut WritingHandler<W>,
    pos: Option<i32>,
    id: Option<u64>,
) -> Result<()> {
    w.begin_user_type(pos, id, T::TYPE_ID, value.version_id())?;
    value.encode_properties(w)?;
    w.end_complex_value()
}

/// Reads a complete user-type value at `pos` (or the current position if `pos` is `None`) and
/// decodes it as `T`. Returns `Ok(None)` if the value was absent (sparse default) or an explicit
/// null; resolving a `T_REFERENCE` found instead is the caller's responsibility, since only the
/// caller knows what object graph an earlier identity belongs to.
pub fn read_user_type<T: PofDeserialize, R: Read>(
    r: &mut Reader<R>,
    pos: Option<i32>,
) -> Result<Option<T>> {
    use crate::frame::UserTypeSlot;
    match r.begin_user_type(pos)? {
        UserTypeSlot::Null => Ok(None),
        UserTypeSlot::Reference(_id) => Err(crate::error::Error::new(
            crate::error::ErrorKind::Unsupported(
                "read_user_type cannot resolve a T_REFERENCE on its own; use begin_user_type directly",
            ),
            Default::default(),
        )),
        UserTypeSlot::Value(frame) => {
            let value = T::decode_properties(r, frame.version_id)?;
            r.end_complex_value()?;
            Ok(Some(value))
        }
    }
}

/// The dynamic, registry-driven counterpart of [PofSerialize]/[PofDeserialize]: operates over
/// [Value] and `&mut dyn Handler` instead of a concrete Rust type, so it can be stored behind
/// `Rc<dyn Serializer>` in a [crate::registry::MapRegistry].
pub trait Serializer {
    /// The wire type id this serializer handles.
    fn type_id(&self) -> i32;

    /// Writes `value`'s properties (already known to be a `Value::UserType` for this `type_id`) to
    /// an already-open user-type frame on `w`.
    fn encode(&self, value: &Value, w: &mut dyn Handler) -> Result<()>;

    /// Builds a [Value::UserType] from a decoded property list (as returned by
    /// [crate::reader::Reader::read_root_value] / `decode_user_type_body`).
    fn decode(&self, properties: &[(i32, Value)]) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WritingHandler;

    struct Point {
        x: i32,
        y: i32,
    }

    impl PofSerialize for Point {
        const TYPE_ID: i32 = 10;

        fn encode_properties(&self, w: &mut dyn Handler) -> Result<()> {
            w.on_int32(Some(0), self.x)?;
            w.on_int32(Some(1), self.y)
        }
    }

    impl PofDeserialize for Point {
        const TYPE_ID: i32 = 10;

        fn decode_properties<R: Read>(r: &mut Reader<R>, _version_id: u32) -> Result<Self> {
            Ok(Point {
                x: r.read_int32(0)?,
                y: r.read_int32(1)?,
            })
        }
    }

    #[test]
    fn typed_round_trip_via_write_user_type_and_read_user_type() {
        let mut buf = Vec::new();
        let mut w = WritingHandler::new(&mut buf);
        write_user_type(&Point { x: 3, y: -4 }, &mut w, None, None).unwrap();

        let mut r = Reader::new(buf.as_slice());
        let decoded: Point = read_user_type(&mut r, None).unwrap().unwrap();
        assert_eq!((decoded.x, decoded.y), (3, -4));
    }
}
