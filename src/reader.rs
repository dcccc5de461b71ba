//! Reader (pull API, property cursor): the read-side counterpart to [crate::writer::WritingHandler].
//!
//! A [Reader] wraps a byte source and exposes two complementary ways to pull values out of it:
//!
//! - Index-based typed getters (`read_int32`, `read_string`, ...) that operate against whichever
//!   sparse frame (a user-type body or a sparse array) is currently open, advancing a property
//!   cursor forward and returning each property's wire default if the requested index was never
//!   written.
//! - `begin_*`/`next_*`/`end_complex_value`, mirroring [crate::handler::Handler]'s own
//!   `begin_*`/`end_complex_value` one-to-one, for walking dense collections/arrays/maps and for
//!   opening nested user types.
//!
//! There is no separate "nested reader" type: opening a user type or array just pushes one more
//! frame onto this `Reader`'s own stack (see [crate::frame]).

use std::collections::HashSet;
use std::io::Read;

use crate::config::Config;
use crate::decimal::{Decimal, Decimal128, Decimal32, Decimal64};
use crate::error::{ByteOffset, Error, ErrorKind, ErrorLocation, Result};
use crate::frame::{UserTypeFrame, UserTypeSlot, UserTypeView};
use crate::packed::{self, RawInt128};
use crate::tags::*;
use crate::temporal::{
    RawDate, RawDateTime, RawDayTimeInterval, RawTime, RawTimeInterval, RawYearMonthInterval,
    ZoneType,
};
use crate::value::Value;

// --- Tracked ---------------------------------------------------------------------------------

/// Wraps a byte source, counting bytes consumed and, while a capture is active, mirroring every
/// byte read into a side buffer. Backs [Reader::read_remainder].
struct Tracked<R> {
    inner: R,
    offset: u64,
    capture: Option<Vec<u8>>,
}

impl<R> Tracked<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            capture: None,
        }
    }

    fn begin_capture(&mut self) {
        self.capture = Some(Vec::new());
    }

    fn end_capture(&mut self) -> Vec<u8> {
        self.capture.take().unwrap_or_default()
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        if let Some(capture) = self.capture.as_mut() {
            capture.extend_from_slice(&buf[..n]);
        }
        Ok(n)
    }
}

// --- ReadFrame -------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Collection,
    Array,
    SparseArray,
    Map,
    UserType,
}

/// One entry on [Reader]'s frame stack: an open collection, array, sparse array, map, or
/// user-type body.
struct ReadFrame {
    kind: FrameKind,
    /// True for [FrameKind::SparseArray] and [FrameKind::UserType]: positions are explicit and
    /// ascending-only, terminated by `-1`. False for dense collections/arrays/maps, whose elements
    /// are counted up front and have no position prefix.
    sparse: bool,
    /// The uniform element type tag, for collections/arrays/sparse arrays declared uniform.
    uniform_elem_tag: Option<i32>,
    /// Reused for a map's value type tag (a map frame never needs both an element tag and a key
    /// tag at once, so `uniform_elem_tag` doubles as "value tag" there).
    uniform_key_tag: Option<i32>,
    /// Remaining element count, for dense frames.
    remaining: u32,
    /// The last property index successfully advanced to, for order-violation checking.
    last_index: Option<i32>,
    /// A position that has already been read off the wire (while checking for overshoot) but not
    /// yet consumed by the caller.
    pending_pos: Option<i32>,
    /// True once a `-1` terminator has been seen, for sparse frames.
    terminated: bool,
    type_id: i32,
    version_id: u32,
}

impl ReadFrame {
    fn dense(kind: FrameKind, remaining: u32, elem_tag: Option<i32>, key_tag: Option<i32>) -> Self {
        Self {
            kind,
            sparse: false,
            uniform_elem_tag: elem_tag,
            uniform_key_tag: key_tag,
            remaining,
            last_index: None,
            pending_pos: None,
            terminated: false,
            type_id: -1,
            version_id: 0,
        }
    }

    fn sparse_array(elem_tag: Option<i32>) -> Self {
        Self {
            kind: FrameKind::SparseArray,
            sparse: true,
            uniform_elem_tag: elem_tag,
            uniform_key_tag: None,
            remaining: 0,
            last_index: None,
            pending_pos: None,
            terminated: false,
            type_id: -1,
            version_id: 0,
        }
    }

    fn user_type(type_id: i32, version_id: u32) -> Self {
        Self {
            kind: FrameKind::UserType,
            sparse: true,
            uniform_elem_tag: None,
            uniform_key_tag: None,
            remaining: 0,
            last_index: None,
            pending_pos: None,
            terminated: false,
            type_id,
            version_id,
        }
    }
}

/// Either a decoded integer or a decoded float, the common shape [Reader]'s numeric getters
/// coerce every numeric wire tag into before doing a final lossy cast to the requested width.
enum Numeric {
    Int(i128),
    Float(f64),
}

// --- Reader ------------------------------------------------------------------------------------

/// A pull-style reader over a Packed Object Format byte stream.
pub struct Reader<R> {
    src: Tracked<R>,
    frames: Vec<ReadFrame>,
    config: Config,
    /// Identities seen via `T_IDENTITY` so far in this stream, for `T_REFERENCE` validation. This
    /// is presence-only: it does not materialize or share the referenced value itself. A host that
    /// wants full object-graph sharing can build that on top using [crate::identity::IdentityTable].
    identities: HashSet<u64>,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, Config::default())
    }

    pub fn with_config(inner: R, config: Config) -> Self {
        Self {
            src: Tracked::new(inner),
            frames: Vec::new(),
            config,
            identities: HashSet::new(),
        }
    }

    /// Unwraps the underlying byte source. Panics in debug builds if any frame is still open.
    pub fn into_inner(self) -> R {
        debug_assert!(self.frames.is_empty(), "dropping a Reader with open frames");
        self.src.inner
    }

    fn location(&self) -> ErrorLocation {
        let type_path: Vec<i32> = self
            .frames
            .iter()
            .filter(|f| f.kind == FrameKind::UserType)
            .map(|f| f.type_id)
            .collect();
        ErrorLocation::at(ByteOffset(self.src.offset)).with_type_path(&type_path)
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.location())
    }

    fn mismatch(&self, found: i32, wanted: &'static str) -> Error {
        self.err(ErrorKind::TypeMismatch {
            found: TypeTag(found),
            wanted,
        })
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.src.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        self.src.read_exact(&mut b)?;
        Ok(b)
    }

    fn push_frame(&mut self, frame: ReadFrame) -> Result<()> {
        if self.frames.len() >= self.config.max_nesting_depth {
            return Err(self.err(ErrorKind::Range(format!(
                "nesting depth exceeds configured limit of {}",
                self.config.max_nesting_depth
            ))));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn check_collection_len(&self, n: u32) -> Result<()> {
        if n > self.config.max_collection_len {
            return Err(self.err(ErrorKind::Range(format!(
                "collection length {} exceeds configured limit of {}",
                n, self.config.max_collection_len
            ))));
        }
        Ok(())
    }

    fn check_string_len(&self, n: u32) -> Result<()> {
        if n > self.config.max_string_len {
            return Err(self.err(ErrorKind::Range(format!(
                "string length {} exceeds configured limit of {}",
                n, self.config.max_string_len
            ))));
        }
        Ok(())
    }

    // --- Tag and property cursor -----------------------------------------------------------

    /// Reads the next wire tag, transparently peeling off a leading `T_IDENTITY` and registering
    /// its id. Does not resolve `T_REFERENCE` at this level; see [Self::open_user_type] and
    /// [Self::decode_uniform_value] for the only places a bare reference is resolved.
    fn next_tag(&mut self) -> Result<i32> {
        let tag = packed::decode_i32(&mut self.src)?;
        if tag == T_IDENTITY {
            let id = packed::decode_i64(&mut self.src)? as u64;
            self.identities.insert(id);
            return self.next_tag();
        }
        Ok(tag)
    }

    /// Advances the property cursor of the current sparse frame to `want`, skipping over any
    /// unread properties in between. Returns `false` (without erroring) if `want` was never
    /// written, in which case the caller substitutes that property's wire default.
    fn advance_to(&mut self, want: i32) -> Result<bool> {
        {
            let frame = self
                .frames
                .last()
                .expect("advance_to called with no open sparse frame");
            debug_assert!(frame.sparse, "advance_to called on a dense frame");
            if let Some(prev) = frame.last_index {
                if want <= prev {
                    return Err(self.err(ErrorKind::OrderViolation {
                        requested: want,
                        previous: prev,
                    }));
                }
            }
            if frame.terminated {
                return Ok(false);
            }
        }
        loop {
            let pending = self.frames.last_mut().unwrap().pending_pos.take();
            let pos = match pending {
                Some(p) => p,
                None => packed::decode_i32(&mut self.src)?,
            };
            if pos == -1 {
                let frame = self.frames.last_mut().unwrap();
                frame.terminated = true;
                frame.last_index = Some(want);
                return Ok(false);
            }
            if pos == want {
                self.frames.last_mut().unwrap().last_index = Some(want);
                return Ok(true);
            }
            if pos > want {
                let frame = self.frames.last_mut().unwrap();
                frame.pending_pos = Some(pos);
                frame.last_index = Some(want);
                return Ok(false);
            }
            self.skip_value()?;
        }
    }

    // --- Coercion ---------------------------------------------------------------------------

    fn decode_numeric(&mut self, tag: i32) -> Result<Numeric> {
        if let Some(n) = compact_int_value(tag) {
            return Ok(Numeric::Int(n as i128));
        }
        match tag {
            V_BOOLEAN_FALSE | V_REFERENCE_NULL => Ok(Numeric::Int(0)),
            V_BOOLEAN_TRUE => Ok(Numeric::Int(1)),
            V_FP_POS_INFINITY => Ok(Numeric::Float(f64::INFINITY)),
            V_FP_NEG_INFINITY => Ok(Numeric::Float(f64::NEG_INFINITY)),
            V_FP_NAN => Ok(Numeric::Float(f64::NAN)),
            T_INT16 => Ok(Numeric::Int(packed::decode_i32(&mut self.src)? as i128)),
            T_INT32 => Ok(Numeric::Int(packed::decode_i32(&mut self.src)? as i128)),
            T_INT64 => Ok(Numeric::Int(packed::decode_i64(&mut self.src)? as i128)),
            T_INT128 => Ok(Numeric::Int(RawInt128::read(&mut self.src)?.0)),
            T_BOOLEAN => Ok(Numeric::Int(self.read_u8()? as i128)),
            T_OCTET => Ok(Numeric::Int(self.read_u8()? as i128)),
            T_CHAR => Ok(Numeric::Int(packed::decode_i32(&mut self.src)? as i128)),
            T_FLOAT32 => Ok(Numeric::Float(f32::from_be_bytes(self.read_bytes()?) as f64)),
            T_FLOAT64 => Ok(Numeric::Float(f64::from_be_bytes(self.read_bytes()?))),
            T_DECIMAL32 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = packed::decode_i32(&mut self.src)?;
                Ok(Numeric::Float(unscaled as f64 / 10f64.powi(scale)))
            }
            T_DECIMAL64 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = packed::decode_i64(&mut self.src)?;
                Ok(Numeric::Float(unscaled as f64 / 10f64.powi(scale)))
            }
            T_DECIMAL128 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = RawInt128::read(&mut self.src)?.0;
                Ok(Numeric::Float(unscaled as f64 / 10f64.powi(scale)))
            }
            _ => Err(self.mismatch(tag, "numeric")),
        }
    }

    fn decode_binary_payload(&mut self) -> Result<Vec<u8>> {
        let len = packed::decode_i32(&mut self.src)?;
        if len < 0 {
            return Err(self.err(ErrorKind::Truncated));
        }
        let len = len as u32;
        self.check_string_len(len)?;
        let mut buf = vec![0u8; len as usize];
        self.src.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn decode_char_payload(&mut self) -> Result<char> {
        let codepoint = packed::decode_i32(&mut self.src)?;
        char::from_u32(codepoint as u32)
            .ok_or_else(|| self.err(ErrorKind::Range(format!("invalid char codepoint {}", codepoint))))
    }

    fn decode_string_payload(&mut self) -> Result<String> {
        let bytes = self.decode_binary_payload()?;
        String::from_utf8(bytes)
            .map_err(|_| self.err(ErrorKind::Range("char string payload is not valid utf-8".into())))
    }

    // --- Generic (registry-free) decode -----------------------------------------------------

    fn decode_value(&mut self, tag: i32) -> Result<Value> {
        match tag {
            V_REFERENCE_NULL => Ok(Value::Null),
            V_STRING_ZERO_LENGTH => Ok(Value::CharString(String::new())),
            V_COLLECTION_EMPTY => Ok(Value::Collection(Vec::new())),
            V_BOOLEAN_FALSE => Ok(Value::Boolean(false)),
            V_BOOLEAN_TRUE => Ok(Value::Boolean(true)),
            V_FP_POS_INFINITY => Ok(Value::Float64(f64::INFINITY)),
            V_FP_NEG_INFINITY => Ok(Value::Float64(f64::NEG_INFINITY)),
            V_FP_NAN => Ok(Value::Float64(f64::NAN)),
            _ if compact_int_value(tag).is_some() => {
                Ok(Value::Int32(compact_int_value(tag).unwrap() as i32))
            }
            T_INT16 => Ok(Value::Int16(packed::decode_i32(&mut self.src)? as i16)),
            T_INT32 => Ok(Value::Int32(packed::decode_i32(&mut self.src)?)),
            T_INT64 => Ok(Value::Int64(packed::decode_i64(&mut self.src)?)),
            T_INT128 => Ok(Value::Int128(RawInt128::read(&mut self.src)?.0)),
            T_FLOAT32 => Ok(Value::Float32(f32::from_be_bytes(self.read_bytes()?))),
            T_FLOAT64 => Ok(Value::Float64(f64::from_be_bytes(self.read_bytes()?))),
            T_FLOAT128 => Ok(Value::Float128(self.read_bytes()?)),
            T_DECIMAL32 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = packed::decode_i32(&mut self.src)?;
                Ok(Value::Decimal(Decimal::D32(Decimal32::new(unscaled, scale)?)))
            }
            T_DECIMAL64 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = packed::decode_i64(&mut self.src)?;
                Ok(Value::Decimal(Decimal::D64(Decimal64::new(unscaled, scale)?)))
            }
            T_DECIMAL128 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = RawInt128::read(&mut self.src)?.0;
                Ok(Value::Decimal(Decimal::D128(Decimal128::new(unscaled, scale)?)))
            }
            T_BOOLEAN => Ok(Value::Boolean(self.read_u8()? != 0)),
            T_OCTET => Ok(Value::Octet(self.read_u8()?)),
            T_OCTET_STRING => Ok(Value::OctetString(self.decode_binary_payload()?)),
            T_CHAR => Ok(Value::Char(self.decode_char_payload()?)),
            T_CHAR_STRING => Ok(Value::CharString(self.decode_string_payload()?)),
            T_DATE => Ok(Value::Date(RawDate::read(&mut self.src)?)),
            T_YEAR_MONTH_INTERVAL => Ok(Value::YearMonthInterval(RawYearMonthInterval::read(
                &mut self.src,
            )?)),
            T_TIME => Ok(Value::Time(RawTime::read(&mut self.src)?)),
            T_TIME_INTERVAL => Ok(Value::TimeInterval(RawTimeInterval::read(&mut self.src)?)),
            T_DATETIME => Ok(Value::DateTime(RawDateTime::read(&mut self.src)?)),
            T_DAY_TIME_INTERVAL => Ok(Value::DayTimeInterval(RawDayTimeInterval::read(
                &mut self.src,
            )?)),
            T_COLLECTION => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                Ok(Value::Collection(self.decode_seq_body(n, None)?))
            }
            T_UNIFORM_COLLECTION => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                let elem_tag = packed::decode_i32(&mut self.src)?;
                Ok(Value::Collection(self.decode_seq_body(n, Some(elem_tag))?))
            }
            T_ARRAY => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                Ok(Value::Array(self.decode_seq_body(n, None)?))
            }
            T_UNIFORM_ARRAY => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                let elem_tag = packed::decode_i32(&mut self.src)?;
                Ok(Value::Array(self.decode_seq_body(n, Some(elem_tag))?))
            }
            T_SPARSE_ARRAY => {
                let n_logical = packed::decode_i32(&mut self.src)? as u32;
                Ok(Value::SparseArray(
                    self.decode_sparse_array_body(n_logical, None)?,
                ))
            }
            T_UNIFORM_SPARSE_ARRAY => {
                let n_logical = packed::decode_i32(&mut self.src)? as u32;
                let elem_tag = packed::decode_i32(&mut self.src)?;
                Ok(Value::SparseArray(
                    self.decode_sparse_array_body(n_logical, Some(elem_tag))?,
                ))
            }
            T_MAP => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                Ok(Value::Map(self.decode_map_body(n, None, None)?))
            }
            T_UNIFORM_KEYS_MAP => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                let key_tag = packed::decode_i32(&mut self.src)?;
                Ok(Value::Map(self.decode_map_body(n, Some(key_tag), None)?))
            }
            T_UNIFORM_MAP => {
                let n = packed::decode_i32(&mut self.src)? as u32;
                let key_tag = packed::decode_i32(&mut self.src)?;
                let val_tag = packed::decode_i32(&mut self.src)?;
                Ok(Value::Map(
                    self.decode_map_body(n, Some(key_tag), Some(val_tag))?,
                ))
            }
            T_REFERENCE => {
                let id = packed::decode_i64(&mut self.src)? as u64;
                if !self.identities.contains(&id) {
                    return Err(self.err(ErrorKind::MissingIdentity(id)));
                }
                Ok(Value::Reference(id))
            }
            _ if tag >= 0 => {
                let version_id = packed::decode_i32(&mut self.src)? as u32;
                self.decode_user_type_body(tag, version_id)
            }
            _ => Err(self.mismatch(tag, "value")),
        }
    }

    /// Decodes one element of a uniform container. User-type elements (`elem_tag >= 0`) may still
    /// carry per-element identity/reference/null: a leading packed int is peeked and, since a
    /// `version_id` is always non-negative while the sentinel tags (`T_IDENTITY`, `T_REFERENCE`,
    /// `V_REFERENCE_NULL`) are always negative, the two cannot be confused. Primitive elements
    /// (`elem_tag < 0`) do not support this: a legitimate primitive value could collide numerically
    /// with a sentinel, so uniform primitive runs are decoded as bare payloads only (see DESIGN.md).
    fn decode_uniform_value(&mut self, elem_tag: i32) -> Result<Value> {
        if elem_tag < 0 {
            return self.decode_value(elem_tag);
        }
        let peek = packed::decode_i32(&mut self.src)?;
        match peek {
            V_REFERENCE_NULL => Ok(Value::Null),
            T_REFERENCE => {
                let id = packed::decode_i64(&mut self.src)? as u64;
                if !self.identities.contains(&id) {
                    return Err(self.err(ErrorKind::MissingIdentity(id)));
                }
                Ok(Value::Reference(id))
            }
            T_IDENTITY => {
                let id = packed::decode_i64(&mut self.src)? as u64;
                self.identities.insert(id);
                let version_id = packed::decode_i32(&mut self.src)? as u32;
                self.decode_user_type_body(elem_tag, version_id)
            }
            version_id if version_id >= 0 => {
                self.decode_user_type_body(elem_tag, version_id as u32)
            }
            _ => Err(self.mismatch(peek, "user-type version id")),
        }
    }

    fn decode_seq_body(&mut self, n: u32, elem_tag: Option<i32>) -> Result<Vec<Value>> {
        self.check_collection_len(n)?;
        let mut items = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let value = match elem_tag {
                Some(t) => self.decode_uniform_value(t)?,
                None => {
                    let tag = self.next_tag()?;
                    self.decode_value(tag)?
                }
            };
            items.push(value);
        }
        Ok(items)
    }

    fn decode_sparse_array_body(
        &mut self,
        n_logical: u32,
        elem_tag: Option<i32>,
    ) -> Result<Vec<(i32, Value)>> {
        self.check_collection_len(n_logical)?;
        let mut entries = Vec::new();
        loop {
            let idx = packed::decode_i32(&mut self.src)?;
            if idx == -1 {
                break;
            }
            let value = match elem_tag {
                Some(t) => self.decode_uniform_value(t)?,
                None => {
                    let tag = self.next_tag()?;
                    self.decode_value(tag)?
                }
            };
            entries.push((idx, value));
        }
        Ok(entries)
    }

    fn decode_map_body(
        &mut self,
        n: u32,
        key_tag: Option<i32>,
        val_tag: Option<i32>,
    ) -> Result<Vec<(Value, Value)>> {
        self.check_collection_len(n)?;
        let mut entries = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let key = match key_tag {
                Some(t) => self.decode_uniform_value(t)?,
                None => {
                    let tag = self.next_tag()?;
                    self.decode_value(tag)?
                }
            };
            let value = match val_tag {
                Some(t) => self.decode_uniform_value(t)?,
                None => {
                    let tag = self.next_tag()?;
                    self.decode_value(tag)?
                }
            };
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn decode_user_type_body(&mut self, type_id: i32, version_id: u32) -> Result<Value> {
        self.push_frame(ReadFrame::user_type(type_id, version_id))?;
        let mut props = Vec::new();
        loop {
            let idx = packed::decode_i32(&mut self.src)?;
            if idx == -1 {
                break;
            }
            let tag = self.next_tag()?;
            let value = self.decode_value(tag)?;
            props.push((idx, value));
        }
        self.frames.pop();
        tracing::trace!(type_id, version_id, n_props = props.len(), "decoded user type body");
        Ok(Value::UserType(type_id, version_id, props))
    }

    /// Reads a single value with no enclosing frame: the entry point for a stream whose top level
    /// is not itself a property of something else.
    pub fn read_root_value(&mut self) -> Result<Value> {
        let tag = self.next_tag()?;
        self.decode_value(tag)
    }

    /// Discards the next value without materializing it. Implemented as decode-and-discard rather
    /// than a dedicated byte-counting fast path, which makes the "skip then read the next token"
    /// / "fully decode then discard" equivalence hold by construction.
    pub fn skip_value(&mut self) -> Result<()> {
        let tag = self.next_tag()?;
        self.decode_value(tag).map(|_| ())
    }

    fn skip_uniform_value(&mut self, elem_tag: i32) -> Result<()> {
        self.decode_uniform_value(elem_tag).map(|_| ())
    }

    // --- read_remainder ----------------------------------------------------------------------

    /// Captures the raw, still-undecoded bytes of every remaining property in the current sparse
    /// frame, up to but excluding the `-1` terminator, without interpreting them. Evolvable types
    /// use this to preserve properties they don't understand across a decode/re-encode cycle.
    pub fn read_remainder(&mut self) -> Result<Vec<u8>> {
        {
            let frame = self
                .frames
                .last()
                .expect("read_remainder called outside a sparse frame");
            debug_assert!(frame.sparse, "read_remainder called outside a sparse frame");
        }
        self.src.begin_capture();
        loop {
            let pending = self.frames.last_mut().unwrap().pending_pos.take();
            let (pos, reemit) = match pending {
                Some(p) => (p, true),
                None => (packed::decode_i32(&mut self.src)?, false),
            };
            if reemit {
                // these bytes were already consumed (and captured) by a prior advance_to's
                // overshoot detection, before this capture began; packed-int encoding is
                // canonical, so re-encoding `pos` reproduces the original bytes exactly.
                let buf = self.src.capture.as_mut().expect("capture was just begun");
                packed::encode_i32(pos, buf).expect("encoding to a Vec cannot fail");
            }
            if pos == -1 {
                self.frames.last_mut().unwrap().terminated = true;
                break;
            }
            self.skip_value()?;
        }
        let mut bytes = self.src.end_capture();
        let terminator_len = packed::encoded_len_i32(-1);
        bytes.truncate(bytes.len().saturating_sub(terminator_len));
        Ok(bytes)
    }

    // --- Typed, index-based getters ----------------------------------------------------------

    pub fn read_boolean(&mut self, index: i32) -> Result<bool> {
        if !self.advance_to(index)? {
            return Ok(false);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Int(n) => n != 0,
            Numeric::Float(f) => f != 0.0,
        })
    }

    pub fn read_octet(&mut self, index: i32) -> Result<u8> {
        if !self.advance_to(index)? {
            return Ok(0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Int(n) => n as u8,
            Numeric::Float(f) => f as u8,
        })
    }

    pub fn read_int16(&mut self, index: i32) -> Result<i16> {
        if !self.advance_to(index)? {
            return Ok(0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Int(n) => n as i16,
            Numeric::Float(f) => f as i16,
        })
    }

    pub fn read_int32(&mut self, index: i32) -> Result<i32> {
        if !self.advance_to(index)? {
            return Ok(0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Int(n) => n as i32,
            Numeric::Float(f) => f as i32,
        })
    }

    pub fn read_int64(&mut self, index: i32) -> Result<i64> {
        if !self.advance_to(index)? {
            return Ok(0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Int(n) => n as i64,
            Numeric::Float(f) => f as i64,
        })
    }

    pub fn read_int128(&mut self, index: i32) -> Result<i128> {
        if !self.advance_to(index)? {
            return Ok(0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Int(n) => n,
            Numeric::Float(f) => f as i128,
        })
    }

    pub fn read_float32(&mut self, index: i32) -> Result<f32> {
        if !self.advance_to(index)? {
            return Ok(0.0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Float(f) => f as f32,
            Numeric::Int(n) => n as f32,
        })
    }

    pub fn read_float64(&mut self, index: i32) -> Result<f64> {
        if !self.advance_to(index)? {
            return Ok(0.0);
        }
        let tag = self.next_tag()?;
        Ok(match self.decode_numeric(tag)? {
            Numeric::Float(f) => f,
            Numeric::Int(n) => n as f64,
        })
    }

    pub fn read_float128(&mut self, index: i32) -> Result<[u8; 16]> {
        if !self.advance_to(index)? {
            return Ok([0u8; 16]);
        }
        let tag = self.next_tag()?;
        if tag != T_FLOAT128 {
            return Err(self.mismatch(tag, "float128"));
        }
        self.read_bytes()
    }

    pub fn read_decimal(&mut self, index: i32) -> Result<Decimal> {
        if !self.advance_to(index)? {
            return Ok(Decimal::D32(Decimal32::new(0, 0).expect("0 is always in range")));
        }
        let tag = self.next_tag()?;
        match tag {
            T_DECIMAL32 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = packed::decode_i32(&mut self.src)?;
                Ok(Decimal::D32(Decimal32::new(unscaled, scale)?))
            }
            T_DECIMAL64 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = packed::decode_i64(&mut self.src)?;
                Ok(Decimal::D64(Decimal64::new(unscaled, scale)?))
            }
            T_DECIMAL128 => {
                let scale = packed::decode_i32(&mut self.src)?;
                let unscaled = RawInt128::read(&mut self.src)?.0;
                Ok(Decimal::D128(Decimal128::new(unscaled, scale)?))
            }
            _ => match self.decode_numeric(tag)? {
                Numeric::Int(n) => Decimal::smallest_fit(n, 0),
                Numeric::Float(_) => Err(self.mismatch(tag, "decimal")),
            },
        }
    }

    pub fn read_char(&mut self, index: i32) -> Result<char> {
        if !self.advance_to(index)? {
            return Ok('\0');
        }
        let tag = self.next_tag()?;
        if tag != T_CHAR {
            return Err(self.mismatch(tag, "char"));
        }
        self.decode_char_payload()
    }

    pub fn read_string(&mut self, index: i32) -> Result<String> {
        if !self.advance_to(index)? {
            return Ok(String::new());
        }
        let tag = self.next_tag()?;
        match tag {
            V_STRING_ZERO_LENGTH => Ok(String::new()),
            T_CHAR_STRING => self.decode_string_payload(),
            _ => Err(self.mismatch(tag, "char string")),
        }
    }

    pub fn read_binary(&mut self, index: i32) -> Result<Vec<u8>> {
        if !self.advance_to(index)? {
            return Ok(Vec::new());
        }
        let tag = self.next_tag()?;
        match tag {
            V_STRING_ZERO_LENGTH => Ok(Vec::new()),
            T_OCTET_STRING => self.decode_binary_payload(),
            _ => Err(self.mismatch(tag, "octet string")),
        }
    }

    pub fn read_date(&mut self, index: i32) -> Result<RawDate> {
        if !self.advance_to(index)? {
            return Ok(RawDate::new(0, 1, 1).expect("0000-01-01 is always valid"));
        }
        let tag = self.next_tag()?;
        if tag != T_DATE {
            return Err(self.mismatch(tag, "date"));
        }
        RawDate::read(&mut self.src)
    }

    pub fn read_time(&mut self, index: i32) -> Result<RawTime> {
        if !self.advance_to(index)? {
            return Ok(RawTime::new(0, 0, 0, 0, ZoneType::None).expect("midnight is always valid"));
        }
        let tag = self.next_tag()?;
        if tag != T_TIME {
            return Err(self.mismatch(tag, "time"));
        }
        RawTime::read(&mut self.src)
    }

    pub fn read_datetime(&mut self, index: i32) -> Result<RawDateTime> {
        if !self.advance_to(index)? {
            return Ok(RawDateTime {
                date: RawDate::new(0, 1, 1).expect("0000-01-01 is always valid"),
                time: RawTime::new(0, 0, 0, 0, ZoneType::None).expect("midnight is always valid"),
            });
        }
        let tag = self.next_tag()?;
        if tag != T_DATETIME {
            return Err(self.mismatch(tag, "datetime"));
        }
        RawDateTime::read(&mut self.src)
    }

    pub fn read_year_month_interval(&mut self, index: i32) -> Result<RawYearMonthInterval> {
        if !self.advance_to(index)? {
            return Ok(RawYearMonthInterval { years: 0, months: 0 });
        }
        let tag = self.next_tag()?;
        if tag != T_YEAR_MONTH_INTERVAL {
            return Err(self.mismatch(tag, "year-month interval"));
        }
        RawYearMonthInterval::read(&mut self.src)
    }

    pub fn read_time_interval(&mut self, index: i32) -> Result<RawTimeInterval> {
        if !self.advance_to(index)? {
            return Ok(RawTimeInterval {
                hours: 0,
                minutes: 0,
                seconds: 0,
                nanoseconds: 0,
            });
        }
        let tag = self.next_tag()?;
        if tag != T_TIME_INTERVAL {
            return Err(self.mismatch(tag, "time interval"));
        }
        RawTimeInterval::read(&mut self.src)
    }

    pub fn read_day_time_interval(&mut self, index: i32) -> Result<RawDayTimeInterval> {
        if !self.advance_to(index)? {
            return Ok(RawDayTimeInterval {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                nanoseconds: 0,
            });
        }
        let tag = self.next_tag()?;
        if tag != T_DAY_TIME_INTERVAL {
            return Err(self.mismatch(tag, "day-time interval"));
        }
        RawDayTimeInterval::read(&mut self.src)
    }

    // --- Composite open/iterate/close, mirroring Handler's begin_*/end_complex_value --------

    fn begin_seq(&mut self, pos: Option<i32>, kind: FrameKind, uniform: bool) -> Result<Option<u32>> {
        if let Some(idx) = pos {
            if !self.advance_to(idx)? {
                return Ok(None);
            }
        }
        let tag = self.next_tag()?;
        if tag == V_COLLECTION_EMPTY {
            self.push_frame(ReadFrame::dense(kind, 0, None, None))?;
            return Ok(Some(0));
        }
        let expected_tag = match (kind, uniform) {
            (FrameKind::Collection, false) => T_COLLECTION,
            (FrameKind::Collection, true) => T_UNIFORM_COLLECTION,
            (FrameKind::Array, false) => T_ARRAY,
            (FrameKind::Array, true) => T_UNIFORM_ARRAY,
            _ => unreachable!("begin_seq only handles Collection/Array frames"),
        };
        if tag != expected_tag {
            return Err(self.mismatch(tag, "collection"));
        }
        let n = packed::decode_i32(&mut self.src)? as u32;
        self.check_collection_len(n)?;
        let elem_tag = if uniform {
            Some(packed::decode_i32(&mut self.src)?)
        } else {
            None
        };
        self.push_frame(ReadFrame::dense(kind, n, elem_tag, None))?;
        Ok(Some(n))
    }

    pub fn begin_collection(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_seq(pos, FrameKind::Collection, false)
    }

    pub fn begin_uniform_collection(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_seq(pos, FrameKind::Collection, true)
    }

    pub fn begin_array(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_seq(pos, FrameKind::Array, false)
    }

    pub fn begin_uniform_array(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_seq(pos, FrameKind::Array, true)
    }

    fn begin_sparse(&mut self, pos: Option<i32>, uniform: bool) -> Result<Option<u32>> {
        if let Some(idx) = pos {
            if !self.advance_to(idx)? {
                return Ok(None);
            }
        }
        let tag = self.next_tag()?;
        if tag == V_COLLECTION_EMPTY {
            let mut frame = ReadFrame::sparse_array(None);
            frame.terminated = true;
            self.push_frame(frame)?;
            return Ok(Some(0));
        }
        let expected_tag = if uniform {
            T_UNIFORM_SPARSE_ARRAY
        } else {
            T_SPARSE_ARRAY
        };
        if tag != expected_tag {
            return Err(self.mismatch(tag, "sparse array"));
        }
        let n_logical = packed::decode_i32(&mut self.src)? as u32;
        self.check_collection_len(n_logical)?;
        let elem_tag = if uniform {
            Some(packed::decode_i32(&mut self.src)?)
        } else {
            None
        };
        self.push_frame(ReadFrame::sparse_array(elem_tag))?;
        Ok(Some(n_logical))
    }

    pub fn begin_sparse_array(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_sparse(pos, false)
    }

    pub fn begin_uniform_sparse_array(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_sparse(pos, true)
    }

    fn begin_map_inner(
        &mut self,
        pos: Option<i32>,
        uniform_keys: bool,
        uniform_values: bool,
    ) -> Result<Option<u32>> {
        if let Some(idx) = pos {
            if !self.advance_to(idx)? {
                return Ok(None);
            }
        }
        let tag = self.next_tag()?;
        if tag == V_COLLECTION_EMPTY {
            self.push_frame(ReadFrame::dense(FrameKind::Map, 0, None, None))?;
            return Ok(Some(0));
        }
        let expected_tag = match (uniform_keys, uniform_values) {
            (false, false) => T_MAP,
            (true, false) => T_UNIFORM_KEYS_MAP,
            (true, true) => T_UNIFORM_MAP,
            (false, true) => unreachable!("uniform values without uniform keys is not a wire shape"),
        };
        if tag != expected_tag {
            return Err(self.mismatch(tag, "map"));
        }
        let n = packed::decode_i32(&mut self.src)? as u32;
        self.check_collection_len(n)?;
        let key_tag = if uniform_keys {
            Some(packed::decode_i32(&mut self.src)?)
        } else {
            None
        };
        let val_tag = if uniform_values {
            Some(packed::decode_i32(&mut self.src)?)
        } else {
            None
        };
        self.push_frame(ReadFrame::dense(FrameKind::Map, n, val_tag, key_tag))?;
        Ok(Some(n))
    }

    pub fn begin_map(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_map_inner(pos, false, false)
    }

    pub fn begin_uniform_keys_map(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_map_inner(pos, true, false)
    }

    pub fn begin_uniform_map(&mut self, pos: Option<i32>) -> Result<Option<u32>> {
        self.begin_map_inner(pos, true, true)
    }

    fn open_user_type(&mut self) -> Result<UserTypeSlot> {
        let tag = packed::decode_i32(&mut self.src)?;
        match tag {
            V_REFERENCE_NULL => Ok(UserTypeSlot::Null),
            T_REFERENCE => {
                let id = packed::decode_i64(&mut self.src)? as u64;
                if !self.identities.contains(&id) {
                    return Err(self.err(ErrorKind::MissingIdentity(id)));
                }
                Ok(UserTypeSlot::Reference(id))
            }
            T_IDENTITY => {
                let id = packed::decode_i64(&mut self.src)? as u64;
                self.identities.insert(id);
                let type_id = packed::decode_i32(&mut self.src)?;
                if type_id < 0 {
                    return Err(self.mismatch(type_id, "user type"));
                }
                let version_id = packed::decode_i32(&mut self.src)? as u32;
                self.push_frame(ReadFrame::user_type(type_id, version_id))?;
                tracing::trace!(type_id, version_id, identity = id, "begin_user_type");
                Ok(UserTypeSlot::Value(UserTypeFrame {
                    type_id,
                    version_id,
                    identity: Some(id),
                }))
            }
            _ if tag >= 0 => {
                let version_id = packed::decode_i32(&mut self.src)? as u32;
                self.push_frame(ReadFrame::user_type(tag, version_id))?;
                tracing::trace!(type_id = tag, version_id, "begin_user_type");
                Ok(UserTypeSlot::Value(UserTypeFrame {
                    type_id: tag,
                    version_id,
                    identity: None,
                }))
            }
            _ => Err(self.mismatch(tag, "user type")),
        }
    }

    /// Opens the user-type value at `pos` (or, if `pos` is `None`, at the stream's current
    /// position with no enclosing frame).
    pub fn begin_user_type(&mut self, pos: Option<i32>) -> Result<UserTypeSlot> {
        if let Some(idx) = pos {
            if !self.advance_to(idx)? {
                return Ok(UserTypeSlot::Null);
            }
        }
        self.open_user_type()
    }

    /// Wraps an already-open user-type body (as returned by [Self::begin_user_type]) in a
    /// borrowing view with delegating per-property getters and a consuming `end()`.
    pub fn view(&mut self, header: UserTypeFrame) -> UserTypeView<'_, R> {
        UserTypeView::new(self, header)
    }

    /// The next element of an open dense collection/array, or `None` once exhausted.
    pub fn next_value(&mut self) -> Result<Option<Value>> {
        let (remaining, elem_tag) = {
            let frame = self
                .frames
                .last()
                .expect("next_value called with no open collection/array frame");
            (frame.remaining, frame.uniform_elem_tag)
        };
        if remaining == 0 {
            return Ok(None);
        }
        let value = match elem_tag {
            Some(t) => self.decode_uniform_value(t)?,
            None => {
                let tag = self.next_tag()?;
                self.decode_value(tag)?
            }
        };
        self.frames.last_mut().unwrap().remaining -= 1;
        Ok(Some(value))
    }

    /// The next `(index, value)` pair of an open sparse array, or `None` at the `-1` terminator.
    pub fn next_sparse_entry(&mut self) -> Result<Option<(i32, Value)>> {
        let (terminated, elem_tag) = {
            let frame = self
                .frames
                .last()
                .expect("next_sparse_entry called with no open sparse-array frame");
            (frame.terminated, frame.uniform_elem_tag)
        };
        if terminated {
            return Ok(None);
        }
        let idx = packed::decode_i32(&mut self.src)?;
        if idx == -1 {
            self.frames.last_mut().unwrap().terminated = true;
            return Ok(None);
        }
        let value = match elem_tag {
            Some(t) => self.decode_uniform_value(t)?,
            None => {
                let tag = self.next_tag()?;
                self.decode_value(tag)?
            }
        };
        Ok(Some((idx, value)))
    }

    /// The next `(key, value)` pair of an open dense map, or `None` once exhausted.
    pub fn next_map_entry(&mut self) -> Result<Option<(Value, Value)>> {
        let (remaining, key_tag, val_tag) = {
            let frame = self
                .frames
                .last()
                .expect("next_map_entry called with no open map frame");
            (frame.remaining, frame.uniform_key_tag, frame.uniform_elem_tag)
        };
        if remaining == 0 {
            return Ok(None);
        }
        let key = match key_tag {
            Some(t) => self.decode_uniform_value(t)?,
            None => {
                let tag = self.next_tag()?;
                self.decode_value(tag)?
            }
        };
        let value = match val_tag {
            Some(t) => self.decode_uniform_value(t)?,
            None => {
                let tag = self.next_tag()?;
                self.decode_value(tag)?
            }
        };
        self.frames.last_mut().unwrap().remaining -= 1;
        Ok(Some((key, value)))
    }

    /// Closes the innermost open frame, draining any un-consumed trailing sparse entries first.
    pub fn end_complex_value(&mut self) -> Result<()> {
        let (sparse, terminated) = {
            let frame = self
                .frames
                .last()
                .expect("end_complex_value called with no open frame");
            (frame.sparse, frame.terminated)
        };
        if sparse && !terminated {
            loop {
                let pending = self.frames.last_mut().unwrap().pending_pos.take();
                let idx = match pending {
                    Some(p) => p,
                    None => packed::decode_i32(&mut self.src)?,
                };
                if idx == -1 {
                    break;
                }
                tracing::warn!(idx, "skipping unread sparse property during end_complex_value");
                let elem_tag = self.frames.last().unwrap().uniform_elem_tag;
                match elem_tag {
                    Some(t) => self.skip_uniform_value(t)?,
                    None => self.skip_value()?,
                }
            }
        }
        self.frames.pop();
        tracing::trace!("end_complex_value");
        Ok(())
    }

    // --- Generic (registry-free) convenience wrappers ---------------------------------------

    pub fn read_collection(&mut self, pos: Option<i32>) -> Result<Vec<Value>> {
        match self.begin_collection(pos)? {
            None => Ok(Vec::new()),
            Some(_) => {
                let mut items = Vec::new();
                while let Some(v) = self.next_value()? {
                    items.push(v);
                }
                self.end_complex_value()?;
                Ok(items)
            }
        }
    }

    pub fn read_array(&mut self, pos: Option<i32>) -> Result<Vec<Value>> {
        match self.begin_array(pos)? {
            None => Ok(Vec::new()),
            Some(_) => {
                let mut items = Vec::new();
                while let Some(v) = self.next_value()? {
                    items.push(v);
                }
                self.end_complex_value()?;
                Ok(items)
            }
        }
    }

    pub fn read_map(&mut self, pos: Option<i32>) -> Result<Vec<(Value, Value)>> {
        match self.begin_map(pos)? {
            None => Ok(Vec::new()),
            Some(_) => {
                let mut entries = Vec::new();
                while let Some(e) = self.next_map_entry()? {
                    entries.push(e);
                }
                self.end_complex_value()?;
                Ok(entries)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::writer::WritingHandler;

    #[test]
    fn sparse_properties_fill_in_defaults_for_skipped_indices() {
        let mut buf = Vec::new();
        {
            let mut w = WritingHandler::new(&mut buf);
            w.begin_user_type(None, None, 7, 1).unwrap();
            w.on_int32(Some(0), 42).unwrap();
            w.on_char_string(Some(2), "hi").unwrap();
            w.end_complex_value().unwrap();
        }
        let mut r = Reader::new(buf.as_slice());
        match r.begin_user_type(None).unwrap() {
            UserTypeSlot::Value(frame) => {
                assert_eq!(frame.type_id, 7);
                assert_eq!(frame.version_id, 1);
            }
            other => panic!("expected a value, got {:?}", std::mem::discriminant(&other)),
        }
        assert_eq!(r.read_int32(0).unwrap(), 42);
        assert_eq!(r.read_int32(1).unwrap(), 0);
        assert_eq!(r.read_string(2).unwrap(), "hi");
        r.end_complex_value().unwrap();
    }

    #[test]
    fn requesting_a_property_at_or_before_the_last_one_read_is_an_order_violation() {
        let mut buf = Vec::new();
        {
            let mut w = WritingHandler::new(&mut buf);
            w.begin_user_type(None, None, 1, 0).unwrap();
            w.on_int32(Some(0), 1).unwrap();
            w.on_int32(Some(1), 2).unwrap();
            w.end_complex_value().unwrap();
        }
        let mut r = Reader::new(buf.as_slice());
        r.begin_user_type(None).unwrap();
        assert_eq!(r.read_int32(1).unwrap(), 2);
        match r.read_int32(0) {
            Err(e) => assert!(matches!(e.kind(), ErrorKind::OrderViolation { .. })),
            Ok(_) => panic!("expected an order violation"),
        }
    }

    #[test]
    fn reference_resolves_against_a_previously_registered_identity() {
        let mut buf = Vec::new();
        {
            let mut w = WritingHandler::new(&mut buf);
            w.begin_collection(None, 2).unwrap();
            w.begin_user_type(None, Some(100), 9, 0).unwrap();
            w.on_int32(Some(0), 5).unwrap();
            w.end_complex_value().unwrap();
            w.write_reference(None, 100).unwrap();
            w.end_complex_value().unwrap();
        }
        let mut r = Reader::new(buf.as_slice());
        r.begin_collection(None).unwrap();
        match r.next_value().unwrap().unwrap() {
            Value::UserType(type_id, _, props) => {
                assert_eq!(type_id, 9);
                assert_eq!(props, vec![(0, Value::Int32(5))]);
            }
            other => panic!("expected a user type, got {:?}", other),
        }
        match r.next_value().unwrap().unwrap() {
            Value::Reference(id) => assert_eq!(id, 100),
            other => panic!("expected a reference, got {:?}", other),
        }
        assert!(r.next_value().unwrap().is_none());
        r.end_complex_value().unwrap();
    }

    #[test]
    fn missing_identity_reference_is_an_error() {
        let mut buf = Vec::new();
        {
            let mut w = WritingHandler::new(&mut buf);
            w.write_reference(None, 42).unwrap();
        }
        let mut r = Reader::new(buf.as_slice());
        match r.read_root_value() {
            Err(e) => assert!(matches!(e.kind(), ErrorKind::MissingIdentity(42))),
            Ok(v) => panic!("expected a missing-identity error, got {:?}", v),
        }
    }

    #[test]
    fn read_remainder_captures_unread_properties_verbatim() {
        let mut buf = Vec::new();
        {
            let mut w = WritingHandler::new(&mut buf);
            w.begin_user_type(None, None, 3, 0).unwrap();
            w.on_int32(Some(0), 1).unwrap();
            w.on_int32(Some(1), 2).unwrap();
            w.on_int32(Some(2), 3).unwrap();
            w.end_complex_value().unwrap();
        }
        let mut r = Reader::new(buf.as_slice());
        r.begin_user_type(None).unwrap();
        assert_eq!(r.read_int32(0).unwrap(), 1);
        let remainder = r.read_remainder().unwrap();
        r.end_complex_value().unwrap();

        let mut tail = Reader::new(remainder.as_slice());
        tail.frames.push(ReadFrame::user_type(3, 0));
        assert_eq!(tail.read_int32(1).unwrap(), 2);
        assert_eq!(tail.read_int32(2).unwrap(), 3);
    }

    #[test]
    fn uniform_collection_of_user_types_supports_identity_and_reference() {
        let mut buf = Vec::new();
        {
            let mut w = WritingHandler::new(&mut buf);
            w.begin_uniform_collection(None, 2, 4).unwrap();
            w.begin_user_type(None, Some(1), 4, 0).unwrap();
            w.on_int32(Some(0), 9).unwrap();
            w.end_complex_value().unwrap();
            w.write_reference(None, 1).unwrap();
            w.end_complex_value().unwrap();
        }
        let mut r = Reader::new(buf.as_slice());
        r.begin_uniform_collection(None).unwrap();
        match r.next_value().unwrap().unwrap() {
            Value::UserType(4, 0, props) => assert_eq!(props, vec![(0, Value::Int32(9))]),
            other => panic!("expected a user type, got {:?}", other),
        }
        match r.next_value().unwrap().unwrap() {
            Value::Reference(1) => {}
            other => panic!("expected a reference, got {:?}", other),
        }
        r.end_complex_value().unwrap();
    }
}
