//! [PrettyPrinter]: renders a Packed Object Format byte stream as an indented diagnostic tree,
//! without requiring a [crate::registry::MapRegistry] or knowledge of any concrete Rust type.
//!
//! Scalar values are mostly redacted, since a stream handed to a log or bug report may carry
//! sensitive application data; only shapes useful for recognizing structure (small integers,
//! booleans, counts) are shown verbatim.

use std::fmt::Write as _;

use crate::decimal::Decimal;
use crate::error::Result;
use crate::reader::Reader;
use crate::value::Value;

pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Decodes one root value from `bytes` and renders it as an indented diagnostic string.
    pub fn to_diag_string(bytes: &[u8]) -> Result<String> {
        let mut r = Reader::new(bytes);
        let value = r.read_root_value()?;
        let mut out = String::new();
        render(&value, 0, &mut out);
        Ok(out)
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn render(value: &Value, depth: usize, out: &mut String) {
    indent(out, depth);
    match value {
        Value::Null => {
            let _ = writeln!(out, "null");
        }
        Value::Boolean(b) => {
            let _ = writeln!(out, "boolean {}", b);
        }
        Value::Octet(n) => {
            let _ = writeln!(out, "octet {}", n);
        }
        Value::Int16(n) => {
            let _ = writeln!(out, "int16 {}", n);
        }
        Value::Int32(n) => {
            let _ = writeln!(out, "int32 {}", n);
        }
        Value::Int64(n) if small_enough_to_show(*n) => {
            let _ = writeln!(out, "int64 {}", n);
        }
        Value::Int64(_) => {
            let _ = writeln!(out, "int64 <redacted>");
        }
        Value::Int128(n) => match i64::try_from(*n) {
            Ok(n64) if small_enough_to_show(n64) => {
                let _ = writeln!(out, "int128 {}", n);
            }
            _ => {
                let _ = writeln!(out, "int128 <redacted>");
            }
        },
        Value::Float32(_) | Value::Float64(_) => {
            let _ = writeln!(out, "{} <redacted float>", float_kind(value));
        }
        Value::Float128(bytes) => {
            let _ = writeln!(out, "float128 {}", hex::encode(bytes));
        }
        Value::Decimal(d) => {
            let _ = writeln!(out, "decimal <redacted, scale {}>", decimal_scale(d));
        }
        Value::Char(_) => {
            let _ = writeln!(out, "char <redacted>");
        }
        Value::CharString(s) => {
            let _ = writeln!(out, "string <redacted ({} bytes)>", s.len());
        }
        Value::OctetString(bytes) => {
            let _ = writeln!(out, "octet string <redacted ({} bytes)>", bytes.len());
        }
        Value::Date(d) => {
            let _ = writeln!(out, "date {:04}-{:02}-{:02}", d.year, d.month, d.day);
        }
        Value::Time(t) => {
            let _ = writeln!(out, "time {:02}:{:02}:{:02}", t.hour, t.minute, t.second);
        }
        Value::DateTime(dt) => {
            let _ = writeln!(
                out,
                "datetime {:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                dt.date.year, dt.date.month, dt.date.day, dt.time.hour, dt.time.minute, dt.time.second
            );
        }
        Value::YearMonthInterval(v) => {
            let _ = writeln!(out, "year-month interval {}y{}m", v.years, v.months);
        }
        Value::TimeInterval(v) => {
            let _ = writeln!(
                out,
                "time interval {}h{}m{}s",
                v.hours, v.minutes, v.seconds
            );
        }
        Value::DayTimeInterval(v) => {
            let _ = writeln!(
                out,
                "day-time interval {}d{}h{}m{}s",
                v.days, v.hours, v.minutes, v.seconds
            );
        }
        Value::Collection(items) => {
            let _ = writeln!(out, "collection ({} items)", items.len());
            for item in items {
                render(item, depth + 1, out);
            }
        }
        Value::Array(items) => {
            let _ = writeln!(out, "array ({} items)", items.len());
            for item in items {
                render(item, depth + 1, out);
            }
        }
        Value::SparseArray(entries) => {
            let _ = writeln!(out, "sparse array ({} entries)", entries.len());
            for (idx, item) in entries {
                indent(out, depth + 1);
                let _ = writeln!(out, "[{}]", idx);
                render(item, depth + 2, out);
            }
        }
        Value::Map(entries) => {
            let _ = writeln!(out, "map ({} entries)", entries.len());
            for (k, v) in entries {
                indent(out, depth + 1);
                let _ = writeln!(out, "key:");
                render(k, depth + 2, out);
                indent(out, depth + 1);
                let _ = writeln!(out, "value:");
                render(v, depth + 2, out);
            }
        }
        Value::UserType(type_id, version_id, props) => {
            let _ = writeln!(
                out,
                "user type {} v{} ({} properties)",
                type_id,
                version_id,
                props.len()
            );
            for (idx, v) in props {
                indent(out, depth + 1);
                let _ = writeln!(out, "[{}]", idx);
                render(v, depth + 2, out);
            }
        }
        Value::Reference(id) => {
            let _ = writeln!(out, "-> #{}", id);
        }
    }
}

/// Small integers are likely enum/discriminant-shaped, not sensitive payload data, so they are
/// shown directly; anything else is redacted.
fn small_enough_to_show(n: i64) -> bool {
    (-1_000..=1_000).contains(&n)
}

fn float_kind(value: &Value) -> &'static str {
    match value {
        Value::Float32(_) => "float32",
        Value::Float64(_) => "float64",
        _ => unreachable!(),
    }
}

fn decimal_scale(d: &Decimal) -> i32 {
    d.scale()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::writer::WritingHandler;

    #[test]
    fn renders_a_simple_user_type_tree() {
        let mut buf = Vec::new();
        let mut w = WritingHandler::new(&mut buf);
        w.begin_user_type(None, None, 1, 0).unwrap();
        w.on_int32(Some(0), 3).unwrap();
        w.on_char_string(Some(1), "secret").unwrap();
        w.end_complex_value().unwrap();

        let rendered = PrettyPrinter::to_diag_string(&buf).unwrap();
        assert!(rendered.contains("user type 1 v0"));
        assert!(rendered.contains("int32 3"));
        assert!(rendered.contains("<redacted (6 bytes)>"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn large_integers_are_redacted_but_small_ones_are_not() {
        let mut buf = Vec::new();
        let mut w = WritingHandler::new(&mut buf);
        w.on_int64(None, 5_000_000_000).unwrap();
        let rendered = PrettyPrinter::to_diag_string(&buf).unwrap();
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("5000000000"));
    }
}
