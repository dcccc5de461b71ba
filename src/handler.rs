//! The event interface that mediates between the typed write API and the byte stream.
//!
//! A [Handler] implementation receives one call per token written: a scalar event for each
//! primitive/temporal/decimal kind, `begin_*`/`end_complex_value` pairs around composites, and
//! `register_identity`/`write_reference` for object sharing. [crate::writer::WritingHandler] is
//! the only implementation in this crate; the indirection exists so that the typed write API
//! (also on `WritingHandler`, see its doc comment) is decoupled from the byte-level encoding
//! rules (default-skipping, tiny-int compression, uniform elision) described in spec §4.2.
//!
//! `pos` is `Some(index)` when the enclosing frame is sparse (a property index or sparse-array
//! index must accompany the value) and `None` in a dense frame (position is implicit from write
//! order).

use crate::decimal::Decimal;
use crate::error::Result;
use crate::temporal::{
    RawDate, RawDateTime, RawDayTimeInterval, RawTime, RawTimeInterval, RawYearMonthInterval,
};

pub trait Handler {
    fn on_null(&mut self, pos: Option<i32>) -> Result<()>;
    fn on_boolean(&mut self, pos: Option<i32>, v: bool) -> Result<()>;
    fn on_octet(&mut self, pos: Option<i32>, v: u8) -> Result<()>;
    fn on_int16(&mut self, pos: Option<i32>, v: i16) -> Result<()>;
    fn on_int32(&mut self, pos: Option<i32>, v: i32) -> Result<()>;
    fn on_int64(&mut self, pos: Option<i32>, v: i64) -> Result<()>;
    fn on_int128(&mut self, pos: Option<i32>, v: i128) -> Result<()>;
    fn on_float32(&mut self, pos: Option<i32>, v: f32) -> Result<()>;
    fn on_float64(&mut self, pos: Option<i32>, v: f64) -> Result<()>;
    fn on_float128(&mut self, pos: Option<i32>, v: [u8; 16]) -> Result<()>;
    fn on_decimal(&mut self, pos: Option<i32>, v: Decimal) -> Result<()>;
    fn on_char(&mut self, pos: Option<i32>, v: char) -> Result<()>;
    fn on_char_string(&mut self, pos: Option<i32>, v: &str) -> Result<()>;
    fn on_octet_string(&mut self, pos: Option<i32>, v: &[u8]) -> Result<()>;
    fn on_date(&mut self, pos: Option<i32>, v: RawDate) -> Result<()>;
    fn on_time(&mut self, pos: Option<i32>, v: RawTime) -> Result<()>;
    fn on_datetime(&mut self, pos: Option<i32>, v: RawDateTime) -> Result<()>;
    fn on_year_month_interval(&mut self, pos: Option<i32>, v: RawYearMonthInterval) -> Result<()>;
    fn on_time_interval(&mut self, pos: Option<i32>, v: RawTimeInterval) -> Result<()>;
    fn on_day_time_interval(&mut self, pos: Option<i32>, v: RawDayTimeInterval) -> Result<()>;

    /// Writes `T_IDENTITY` + `id` ahead of the value that follows, which must be emitted via
    /// exactly one subsequent call on this handler (not itself skippable by default-value rules).
    fn register_identity(&mut self, id: u64) -> Result<()>;

    /// Writes `T_REFERENCE` + `id` in place of a value.
    fn write_reference(&mut self, pos: Option<i32>, id: u64) -> Result<()>;

    fn begin_collection(&mut self, pos: Option<i32>, n: u32) -> Result<()>;
    fn begin_uniform_collection(&mut self, pos: Option<i32>, n: u32, elem_tag: i32) -> Result<()>;
    fn begin_array(&mut self, pos: Option<i32>, n: u32) -> Result<()>;
    fn begin_uniform_array(&mut self, pos: Option<i32>, n: u32, elem_tag: i32) -> Result<()>;
    fn begin_sparse_array(&mut self, pos: Option<i32>, n_logical: u32) -> Result<()>;
    fn begin_uniform_sparse_array(
        &mut self,
        pos: Option<i32>,
        n_logical: u32,
        elem_tag: i32,
    ) -> Result<()>;
    fn begin_map(&mut self, pos: Option<i32>, n: u32) -> Result<()>;
    fn begin_uniform_keys_map(&mut self, pos: Option<i32>, n: u32, key_tag: i32) -> Result<()>;
    fn begin_uniform_map(
        &mut self,
        pos: Option<i32>,
        n: u32,
        key_tag: i32,
        val_tag: i32,
    ) -> Result<()>;
    /// `id` is `Some` when the user type is reference-eligible, in which case an identity is
    /// registered before the `type_id`/`version_id` header is written.
    fn begin_user_type(
        &mut self,
        pos: Option<i32>,
        id: Option<u64>,
        type_id: i32,
        version_id: u32,
    ) -> Result<()>;

    /// Closes the innermost open complex value, writing a `-1` terminator if it is sparse.
    fn end_complex_value(&mut self) -> Result<()>;
}
