//! [WritingHandler]: the [Handler] implementation that turns events into encoded bytes, and the
//! typed write API built on top of it.
//!
//! This is the write-side counterpart of [crate::reader::Reader]. It tracks one stack of
//! [Complex] frames — one per currently-open collection/array/map/user-type body — which records
//! enough state (sparse vs. dense, a possible uniform element/key/value type, map key/value
//! parity) to make the three compression rules from the format's design notes fall out of a
//! single `prepare` call shared by every event: default-value skipping in sparse frames, tiny
//! value compaction via one-byte `V_*` tags, and type-tag elision inside uniform containers.

use std::io::Write;

use crate::decimal::Decimal;
use crate::error::Result;
use crate::handler::Handler;
use crate::packed::{self, RawInt128};
use crate::tags;
use crate::temporal::{
    RawDate, RawDateTime, RawDayTimeInterval, RawTime, RawTimeInterval, RawYearMonthInterval,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Collection,
    Array,
    SparseArray,
    Map,
    UserType,
}

#[derive(Debug)]
struct Complex {
    kind: FrameKind,
    sparse: bool,
    /// Declared element type for Collection/Array/SparseArray frames, or declared value type for
    /// Map frames (`uniform_key_tag` holds the key type in that case).
    uniform_elem_tag: Option<i32>,
    uniform_key_tag: Option<i32>,
    next_is_key: bool,
    /// False when this frame is a degenerate empty container (written via its compact tag, or
    /// entirely skipped by a sparse parent's default-value rule) — no elements will be, or may
    /// legally be, written into it, and `end_complex_value` must not emit a sparse terminator.
    active: bool,
}

/// What `prepare` decided to do with the value it was asked to write.
enum Decision {
    /// A sparse parent omitted this value entirely because it is the default and carries no
    /// identity.
    Skip,
    /// A one-byte compact tag fully describes the value; no further payload follows.
    Done,
    /// The tag was written (or elided by a uniform frame); the caller must still write the
    /// payload bytes.
    Payload,
}

/// Writes a stream of values to `W` by driving a [WritingHandler] through the typed methods
/// below, which is also the only [Handler] implementation in this crate.
pub struct WritingHandler<W: Write> {
    dst: W,
    frames: Vec<Complex>,
    pending_identity: Option<u64>,
}

impl<W: Write> WritingHandler<W> {
    pub fn new(dst: W) -> Self {
        Self {
            dst,
            frames: Vec::new(),
            pending_identity: None,
        }
    }

    /// Returns the underlying writer, which must have no open complex values left on it.
    pub fn into_inner(self) -> W {
        debug_assert!(self.frames.is_empty(), "unbalanced begin_*/end_complex_value calls");
        self.dst
    }

    fn frame_uniform_tag(&self) -> Option<i32> {
        match self.frames.last() {
            None => None,
            Some(f) if f.kind == FrameKind::Map => {
                if f.next_is_key {
                    f.uniform_key_tag
                } else {
                    f.uniform_elem_tag
                }
            }
            Some(f) => f.uniform_elem_tag,
        }
    }

    fn frame_is_sparse(&self) -> bool {
        self.frames.last().map(|f| f.sparse).unwrap_or(false)
    }

    /// Toggles the enclosing map frame's key/value parity. Must be called exactly once per value
    /// written into a frame (scalar, or the `begin_*` of a nested composite), regardless of
    /// whether that value was skipped.
    fn after_value(&mut self) {
        if let Some(top) = self.frames.last_mut() {
            if top.kind == FrameKind::Map {
                top.next_is_key = !top.next_is_key;
            }
        }
    }

    /// Shared prelude for every scalar and `begin_*` event: applies sparse default-skipping,
    /// writes the sparse position prefix, writes any pending identity, and then either writes the
    /// value's compact tag, elides its tag (uniform frame), or writes its full tag.
    fn prepare(
        &mut self,
        pos: Option<i32>,
        tag: i32,
        is_default: bool,
        compact: Option<i32>,
    ) -> Result<Decision> {
        let identity = self.pending_identity.take();
        if self.frame_is_sparse() && is_default && identity.is_none() {
            return Ok(Decision::Skip);
        }
        if self.frame_is_sparse() {
            let pos = pos.expect("sparse frame requires a position for every written value");
            packed::encode_i32(pos, &mut self.dst)?;
        }
        if let Some(id) = identity {
            packed::encode_i32(tags::T_IDENTITY, &mut self.dst)?;
            packed::encode_i64(id as i64, &mut self.dst)?;
        }
        if self.frame_uniform_tag() == Some(tag) {
            return Ok(Decision::Payload);
        }
        if let Some(c) = compact {
            packed::encode_i32(c, &mut self.dst)?;
            Ok(Decision::Done)
        } else {
            packed::encode_i32(tag, &mut self.dst)?;
            Ok(Decision::Payload)
        }
    }

    fn push_container(
        &mut self,
        pos: Option<i32>,
        tag: i32,
        is_empty: bool,
        kind: FrameKind,
        sparse: bool,
        uniform_elem_tag: Option<i32>,
        uniform_key_tag: Option<i32>,
    ) -> Result<Decision> {
        let compact = is_empty.then_some(tags::V_COLLECTION_EMPTY);
        let decision = self.prepare(pos, tag, is_empty, compact)?;
        self.after_value();
        self.frames.push(Complex {
            kind,
            sparse,
            uniform_elem_tag,
            uniform_key_tag,
            // a map's first entry is always a key.
            next_is_key: kind == FrameKind::Map,
            active: matches!(decision, Decision::Payload),
        });
        Ok(decision)
    }
}

impl<W: Write> Handler for WritingHandler<W> {
    fn on_null(&mut self, pos: Option<i32>) -> Result<()> {
        let _ = self.prepare(pos, tags::V_REFERENCE_NULL, true, Some(tags::V_REFERENCE_NULL))?;
        self.after_value();
        Ok(())
    }

    fn on_boolean(&mut self, pos: Option<i32>, v: bool) -> Result<()> {
        let compact = Some(if v {
            tags::V_BOOLEAN_TRUE
        } else {
            tags::V_BOOLEAN_FALSE
        });
        let decision = self.prepare(pos, tags::T_BOOLEAN, !v, compact)?;
        if let Decision::Payload = decision {
            self.dst.write_all(&[v as u8])?;
        }
        self.after_value();
        Ok(())
    }

    fn on_octet(&mut self, pos: Option<i32>, v: u8) -> Result<()> {
        let decision = self.prepare(pos, tags::T_OCTET, v == 0, None)?;
        if let Decision::Payload = decision {
            self.dst.write_all(&[v])?;
        }
        self.after_value();
        Ok(())
    }

    fn on_int16(&mut self, pos: Option<i32>, v: i16) -> Result<()> {
        let compact = tags::compact_int_tag(v as i64);
        let decision = self.prepare(pos, tags::T_INT16, v == 0, compact)?;
        if let Decision::Payload = decision {
            packed::encode_i32(v as i32, &mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_int32(&mut self, pos: Option<i32>, v: i32) -> Result<()> {
        let compact = tags::compact_int_tag(v as i64);
        let decision = self.prepare(pos, tags::T_INT32, v == 0, compact)?;
        if let Decision::Payload = decision {
            packed::encode_i32(v, &mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_int64(&mut self, pos: Option<i32>, v: i64) -> Result<()> {
        let compact = tags::compact_int_tag(v);
        let decision = self.prepare(pos, tags::T_INT64, v == 0, compact)?;
        if let Decision::Payload = decision {
            packed::encode_i64(v, &mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_int128(&mut self, pos: Option<i32>, v: i128) -> Result<()> {
        let compact = i64::try_from(v).ok().and_then(tags::compact_int_tag);
        let decision = self.prepare(pos, tags::T_INT128, v == 0, compact)?;
        if let Decision::Payload = decision {
            RawInt128(v).write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_float32(&mut self, pos: Option<i32>, v: f32) -> Result<()> {
        let compact = float_compact_tag(v.is_nan(), v == f32::INFINITY, v == f32::NEG_INFINITY);
        let is_default = v.to_bits() == 0; // +0.0 only; -0.0 is not the default
        let decision = self.prepare(pos, tags::T_FLOAT32, is_default, compact)?;
        if let Decision::Payload = decision {
            self.dst.write_all(&v.to_be_bytes())?;
        }
        self.after_value();
        Ok(())
    }

    fn on_float64(&mut self, pos: Option<i32>, v: f64) -> Result<()> {
        let compact = float_compact_tag(v.is_nan(), v == f64::INFINITY, v == f64::NEG_INFINITY);
        let is_default = v.to_bits() == 0;
        let decision = self.prepare(pos, tags::T_FLOAT64, is_default, compact)?;
        if let Decision::Payload = decision {
            self.dst.write_all(&v.to_be_bytes())?;
        }
        self.after_value();
        Ok(())
    }

    fn on_float128(&mut self, pos: Option<i32>, v: [u8; 16]) -> Result<()> {
        let is_default = v == [0u8; 16];
        let decision = self.prepare(pos, tags::T_FLOAT128, is_default, None)?;
        if let Decision::Payload = decision {
            self.dst.write_all(&v)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_decimal(&mut self, pos: Option<i32>, v: Decimal) -> Result<()> {
        let tag = match v {
            Decimal::D32(_) => tags::T_DECIMAL32,
            Decimal::D64(_) => tags::T_DECIMAL64,
            Decimal::D128(_) => tags::T_DECIMAL128,
        };
        let is_default = v.unscaled() == 0 && v.scale() == 0;
        let decision = self.prepare(pos, tag, is_default, None)?;
        if let Decision::Payload = decision {
            packed::encode_i32(v.scale(), &mut self.dst)?;
            match v {
                Decimal::D32(d) => packed::encode_i32(d.unscaled, &mut self.dst)?,
                Decimal::D64(d) => packed::encode_i64(d.unscaled, &mut self.dst)?,
                Decimal::D128(d) => RawInt128(d.unscaled).write(&mut self.dst)?,
            };
        }
        self.after_value();
        Ok(())
    }

    fn on_char(&mut self, pos: Option<i32>, v: char) -> Result<()> {
        let decision = self.prepare(pos, tags::T_CHAR, v == '\0', None)?;
        if let Decision::Payload = decision {
            packed::encode_i32(v as i32, &mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_char_string(&mut self, pos: Option<i32>, v: &str) -> Result<()> {
        let compact = v.is_empty().then_some(tags::V_STRING_ZERO_LENGTH);
        let decision = self.prepare(pos, tags::T_CHAR_STRING, v.is_empty(), compact)?;
        if let Decision::Payload = decision {
            packed::encode_i32(v.len() as i32, &mut self.dst)?;
            self.dst.write_all(v.as_bytes())?;
        }
        self.after_value();
        Ok(())
    }

    fn on_octet_string(&mut self, pos: Option<i32>, v: &[u8]) -> Result<()> {
        let compact = v.is_empty().then_some(tags::V_STRING_ZERO_LENGTH);
        let decision = self.prepare(pos, tags::T_OCTET_STRING, v.is_empty(), compact)?;
        if let Decision::Payload = decision {
            packed::encode_i32(v.len() as i32, &mut self.dst)?;
            self.dst.write_all(v)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_date(&mut self, pos: Option<i32>, v: RawDate) -> Result<()> {
        let decision = self.prepare(pos, tags::T_DATE, false, None)?;
        if let Decision::Payload = decision {
            v.write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_time(&mut self, pos: Option<i32>, v: RawTime) -> Result<()> {
        let decision = self.prepare(pos, tags::T_TIME, false, None)?;
        if let Decision::Payload = decision {
            v.write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_datetime(&mut self, pos: Option<i32>, v: RawDateTime) -> Result<()> {
        let decision = self.prepare(pos, tags::T_DATETIME, false, None)?;
        if let Decision::Payload = decision {
            v.write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_year_month_interval(&mut self, pos: Option<i32>, v: RawYearMonthInterval) -> Result<()> {
        let is_default = v.years == 0 && v.months == 0;
        let decision = self.prepare(pos, tags::T_YEAR_MONTH_INTERVAL, is_default, None)?;
        if let Decision::Payload = decision {
            v.write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_time_interval(&mut self, pos: Option<i32>, v: RawTimeInterval) -> Result<()> {
        let is_default =
            v.hours == 0 && v.minutes == 0 && v.seconds == 0 && v.nanoseconds == 0;
        let decision = self.prepare(pos, tags::T_TIME_INTERVAL, is_default, None)?;
        if let Decision::Payload = decision {
            v.write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn on_day_time_interval(&mut self, pos: Option<i32>, v: RawDayTimeInterval) -> Result<()> {
        let is_default = v.days == 0
            && v.hours == 0
            && v.minutes == 0
            && v.seconds == 0
            && v.nanoseconds == 0;
        let decision = self.prepare(pos, tags::T_DAY_TIME_INTERVAL, is_default, None)?;
        if let Decision::Payload = decision {
            v.write(&mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn register_identity(&mut self, id: u64) -> Result<()> {
        self.pending_identity = Some(id);
        Ok(())
    }

    fn write_reference(&mut self, pos: Option<i32>, id: u64) -> Result<()> {
        let decision = self.prepare(pos, tags::T_REFERENCE, false, None)?;
        if let Decision::Payload = decision {
            packed::encode_i64(id as i64, &mut self.dst)?;
        }
        self.after_value();
        Ok(())
    }

    fn begin_collection(&mut self, pos: Option<i32>, n: u32) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_COLLECTION,
            n == 0,
            FrameKind::Collection,
            false,
            None,
            None,
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_uniform_collection(&mut self, pos: Option<i32>, n: u32, elem_tag: i32) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_UNIFORM_COLLECTION,
            n == 0,
            FrameKind::Collection,
            false,
            Some(elem_tag),
            None,
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
            packed::encode_i32(elem_tag, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_array(&mut self, pos: Option<i32>, n: u32) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_ARRAY,
            n == 0,
            FrameKind::Array,
            false,
            None,
            None,
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_uniform_array(&mut self, pos: Option<i32>, n: u32, elem_tag: i32) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_UNIFORM_ARRAY,
            n == 0,
            FrameKind::Array,
            false,
            Some(elem_tag),
            None,
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
            packed::encode_i32(elem_tag, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_sparse_array(&mut self, pos: Option<i32>, n_logical: u32) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_SPARSE_ARRAY,
            n_logical == 0,
            FrameKind::SparseArray,
            true,
            None,
            None,
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n_logical as i32, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_uniform_sparse_array(
        &mut self,
        pos: Option<i32>,
        n_logical: u32,
        elem_tag: i32,
    ) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_UNIFORM_SPARSE_ARRAY,
            n_logical == 0,
            FrameKind::SparseArray,
            true,
            Some(elem_tag),
            None,
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n_logical as i32, &mut self.dst)?;
            packed::encode_i32(elem_tag, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_map(&mut self, pos: Option<i32>, n: u32) -> Result<()> {
        let decision =
            self.push_container(pos, tags::T_MAP, n == 0, FrameKind::Map, false, None, None)?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_uniform_keys_map(&mut self, pos: Option<i32>, n: u32, key_tag: i32) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_UNIFORM_KEYS_MAP,
            n == 0,
            FrameKind::Map,
            false,
            None,
            Some(key_tag),
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
            packed::encode_i32(key_tag, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_uniform_map(
        &mut self,
        pos: Option<i32>,
        n: u32,
        key_tag: i32,
        val_tag: i32,
    ) -> Result<()> {
        let decision = self.push_container(
            pos,
            tags::T_UNIFORM_MAP,
            n == 0,
            FrameKind::Map,
            false,
            Some(val_tag),
            Some(key_tag),
        )?;
        if let Decision::Payload = decision {
            packed::encode_i32(n as i32, &mut self.dst)?;
            packed::encode_i32(key_tag, &mut self.dst)?;
            packed::encode_i32(val_tag, &mut self.dst)?;
        }
        Ok(())
    }

    fn begin_user_type(
        &mut self,
        pos: Option<i32>,
        id: Option<u64>,
        type_id: i32,
        version_id: u32,
    ) -> Result<()> {
        if let Some(id) = id {
            self.pending_identity = Some(id);
        }
        let decision = self.prepare(pos, type_id, false, None)?;
        debug_assert!(
            matches!(decision, Decision::Payload),
            "user-type headers are never skipped or compacted"
        );
        self.after_value();
        packed::encode_i32(version_id as i32, &mut self.dst)?;
        self.frames.push(Complex {
            kind: FrameKind::UserType,
            sparse: true,
            uniform_elem_tag: None,
            uniform_key_tag: None,
            next_is_key: false,
            active: true,
        });
        Ok(())
    }

    fn end_complex_value(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .expect("end_complex_value called with no open frame");
        if frame.active && frame.sparse {
            packed::encode_i32(-1, &mut self.dst)?;
        }
        Ok(())
    }
}

fn float_compact_tag(is_nan: bool, is_pos_inf: bool, is_neg_inf: bool) -> Option<i32> {
    if is_nan {
        Some(tags::V_FP_NAN)
    } else if is_pos_inf {
        Some(tags::V_FP_POS_INFINITY)
    } else if is_neg_inf {
        Some(tags::V_FP_NEG_INFINITY)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_writer() -> WritingHandler<Vec<u8>> {
        WritingHandler::new(Vec::new())
    }

    #[test]
    fn tiny_ints_compact_to_a_single_byte() {
        let mut w = new_writer();
        w.on_int32(None, 7).unwrap();
        assert_eq!(w.into_inner().len(), 1);
    }

    #[test]
    fn sparse_array_skips_default_valued_entries() {
        let mut w = new_writer();
        w.begin_sparse_array(None, 3).unwrap();
        w.on_int32(Some(0), 0).unwrap(); // default, skipped
        w.on_int32(Some(1), 5).unwrap();
        w.end_complex_value().unwrap();
        let buf = w.into_inner();

        // header: T_SPARSE_ARRAY tag, n_logical=3; then pos=1, compact int(5); then terminator -1.
        let mut cur = std::io::Cursor::new(&buf);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_SPARSE_ARRAY);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 3);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 1); // position
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::compact_int_tag(5).unwrap());
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), -1); // terminator
    }

    #[test]
    fn uniform_collection_elides_element_type_tags() {
        let mut w = new_writer();
        w.begin_uniform_collection(None, 2, tags::T_INT32).unwrap();
        w.on_int32(None, 1000).unwrap(); // too big for compact int, but tag still elided
        w.on_int32(None, 2000).unwrap();
        w.end_complex_value().unwrap();
        let buf = w.into_inner();

        let mut cur = std::io::Cursor::new(&buf);
        assert_eq!(
            packed::decode_i32(&mut cur).unwrap(),
            tags::T_UNIFORM_COLLECTION
        );
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 2); // n
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_INT32); // elem type
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 1000); // no per-element tag
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 2000);
    }

    #[test]
    fn empty_collection_collapses_to_a_compact_tag() {
        let mut w = new_writer();
        w.begin_collection(None, 0).unwrap();
        w.end_complex_value().unwrap();
        let buf = w.into_inner();
        let mut cur = std::io::Cursor::new(&buf);
        assert_eq!(
            packed::decode_i32(&mut cur).unwrap(),
            tags::V_COLLECTION_EMPTY
        );
        // nothing else: no count, no terminator.
        assert_eq!(cur.position() as usize, buf.len());
    }

    #[test]
    fn identity_precedes_the_value_it_registers() {
        let mut w = new_writer();
        w.register_identity(42).unwrap();
        w.on_int32(None, 9).unwrap();
        let buf = w.into_inner();
        let mut cur = std::io::Cursor::new(&buf);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_IDENTITY);
        assert_eq!(packed::decode_i64(&mut cur).unwrap(), 42);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_INT32);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 9);
    }

    #[test]
    fn uniform_map_elides_both_key_and_value_tags() {
        let mut w = new_writer();
        w.begin_uniform_map(None, 1, tags::T_CHAR_STRING, tags::T_INT32)
            .unwrap();
        w.on_char_string(None, "k").unwrap();
        w.on_int32(None, 1).unwrap();
        w.end_complex_value().unwrap();
        let buf = w.into_inner();

        let mut cur = std::io::Cursor::new(&buf);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_UNIFORM_MAP);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 1); // n
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_CHAR_STRING);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), tags::T_INT32);
        assert_eq!(packed::decode_i32(&mut cur).unwrap(), 1); // key length ("k")
    }
}
