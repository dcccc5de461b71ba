//! Metadata about an open user-type body, as returned by [crate::reader::Reader::begin_user_type].
//!
//! All of the actual property-index bookkeeping lives on [crate::reader::Reader] itself (it is
//! the thing that owns the byte source), so a "nested reader" is not a distinct type: it is the
//! same `Reader`, now positioned inside one more frame on its internal stack. This struct is just
//! the declared header of that frame (its wire type id, schema version, and optional identity),
//! handed back to the caller so it can pick the right concrete type and constructor.

/// The header of a user-type value that was actually present on the wire (as opposed to being
/// `null` or a `T_REFERENCE` to a previously-seen one).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserTypeFrame {
    /// The non-negative wire type id, as assigned by a [crate::registry::TypeRegistry].
    pub type_id: i32,
    /// The schema version the writer used to encode this value's properties.
    pub version_id: u32,
    /// Present if the writer registered this value for possible later sharing via `T_REFERENCE`.
    pub identity: Option<u64>,
}

/// What [crate::reader::Reader::begin_user_type] found at the requested position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserTypeSlot {
    /// The property was absent (sparse default) or explicitly `V_REFERENCE_NULL`.
    Null,
    /// A `T_REFERENCE` to a previously registered identity. The caller is responsible for
    /// resolving `id` against whatever host-side map it populated while reading earlier values —
    /// this crate only guarantees that the id was seen before this reference (see
    /// [crate::error::ErrorKind::MissingIdentity]).
    Reference(u64),
    /// A user-type body is open; call the per-property getters, then
    /// [crate::reader::Reader::end_complex_value] (or wrap it with [crate::reader::Reader::view]
    /// and call [UserTypeView::end]).
    Value(UserTypeFrame),
}

/// A borrowing, ownership-enforcing handle onto an already-open user-type body.
///
/// [crate::reader::Reader::begin_user_type] returns a bare [UserTypeFrame] header because the
/// reader itself, not this struct, holds the property cursor; [crate::reader::Reader::view] wraps
/// that header together with a `&mut Reader` so callers who would rather pass one value around
/// than thread both the reader and the header through their own decode functions can do so. It
/// adds nothing the reader's own methods don't already do directly — just a smaller, scoped
/// borrow and a consuming `end()` that can't be forgotten without a compiler warning from the
/// unused `Result`.
pub struct UserTypeView<'r, R> {
    reader: &'r mut crate::reader::Reader<R>,
    /// The header this view was opened with.
    pub header: UserTypeFrame,
}

impl<'r, R: std::io::Read> UserTypeView<'r, R> {
    pub(crate) fn new(reader: &'r mut crate::reader::Reader<R>, header: UserTypeFrame) -> Self {
        Self { reader, header }
    }

    pub fn read_boolean(&mut self, index: i32) -> crate::error::Result<bool> {
        self.reader.read_boolean(index)
    }

    pub fn read_octet(&mut self, index: i32) -> crate::error::Result<u8> {
        self.reader.read_octet(index)
    }

    pub fn read_int16(&mut self, index: i32) -> crate::error::Result<i16> {
        self.reader.read_int16(index)
    }

    pub fn read_int32(&mut self, index: i32) -> crate::error::Result<i32> {
        self.reader.read_int32(index)
    }

    pub fn read_int64(&mut self, index: i32) -> crate::error::Result<i64> {
        self.reader.read_int64(index)
    }

    pub fn read_int128(&mut self, index: i32) -> crate::error::Result<i128> {
        self.reader.read_int128(index)
    }

    pub fn read_float32(&mut self, index: i32) -> crate::error::Result<f32> {
        self.reader.read_float32(index)
    }

    pub fn read_float64(&mut self, index: i32) -> crate::error::Result<f64> {
        self.reader.read_float64(index)
    }

    pub fn read_float128(&mut self, index: i32) -> crate::error::Result<[u8; 16]> {
        self.reader.read_float128(index)
    }

    pub fn read_decimal(&mut self, index: i32) -> crate::error::Result<crate::decimal::Decimal> {
        self.reader.read_decimal(index)
    }

    pub fn read_char(&mut self, index: i32) -> crate::error::Result<char> {
        self.reader.read_char(index)
    }

    pub fn read_string(&mut self, index: i32) -> crate::error::Result<String> {
        self.reader.read_string(index)
    }

    pub fn read_binary(&mut self, index: i32) -> crate::error::Result<Vec<u8>> {
        self.reader.read_binary(index)
    }

    pub fn read_date(&mut self, index: i32) -> crate::error::Result<crate::temporal::RawDate> {
        self.reader.read_date(index)
    }

    pub fn read_time(&mut self, index: i32) -> crate::error::Result<crate::temporal::RawTime> {
        self.reader.read_time(index)
    }

    pub fn read_datetime(&mut self, index: i32) -> crate::error::Result<crate::temporal::RawDateTime> {
        self.reader.read_datetime(index)
    }

    pub fn read_year_month_interval(
        &mut self,
        index: i32,
    ) -> crate::error::Result<crate::temporal::RawYearMonthInterval> {
        self.reader.read_year_month_interval(index)
    }

    pub fn read_time_interval(
        &mut self,
        index: i32,
    ) -> crate::error::Result<crate::temporal::RawTimeInterval> {
        self.reader.read_time_interval(index)
    }

    pub fn read_day_time_interval(
        &mut self,
        index: i32,
    ) -> crate::error::Result<crate::temporal::RawDayTimeInterval> {
        self.reader.read_day_time_interval(index)
    }

    /// Captures the raw bytes of every property not yet read, for types that preserve unknown
    /// properties across a decode/re-encode cycle.
    pub fn read_remainder(&mut self) -> crate::error::Result<Vec<u8>> {
        self.reader.read_remainder()
    }

    /// Closes the user-type body, discarding any properties that were never read.
    pub fn end(self) -> crate::error::Result<()> {
        self.reader.end_complex_value()
    }
}
