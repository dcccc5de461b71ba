//! Consumer-facing integration tests, one per scenario a host application is expected to exercise
//! against the public API rather than crate-internal state. These complement the inline
//! `#[cfg(test)]` modules beside each implementation file, which check internal invariants the
//! public API doesn't expose directly (frame bookkeeping, coercion tables, wire byte layout).

use pof::handler::Handler;
use pof::reader::Reader;
use pof::writer::WritingHandler;

/// S1: packed integers round-trip through the typed scalar API at the lengths the format
/// guarantees (see `packed::tests` for the exact byte-length table).
#[test]
fn packed_integers_round_trip_through_typed_reads() {
    let inputs = [
        0i64, 1, -1, 22, 23, -22, 63, 64, -64, 127, 128, 8191, 8192, -2_147_483_648,
    ];
    for &n in &inputs {
        let mut buf = Vec::new();
        let mut w = WritingHandler::new(&mut buf);
        w.on_int64(None, n).unwrap();
        let mut r = Reader::new(buf.as_slice());
        assert_eq!(r.read_int64(0).unwrap(), n);
    }
}

/// S2: a primitive user type with a null property round-trips to the same values.
#[test]
fn primitive_user_type_round_trips() {
    let mut buf = Vec::new();
    let mut w = WritingHandler::new(&mut buf);
    w.begin_user_type(None, None, 1000, 0).unwrap();
    w.on_int32(Some(0), 42).unwrap();
    w.on_char_string(Some(1), "hi").unwrap();
    w.on_boolean(Some(2), true).unwrap();
    w.on_null(Some(5)).unwrap();
    w.end_complex_value().unwrap();

    let mut r = Reader::new(buf.as_slice());
    let header = match r.begin_user_type(None).unwrap() {
        pof::frame::UserTypeSlot::Value(h) => h,
        other => panic!("expected a value, got {:?}", other),
    };
    assert_eq!(header.type_id, 1000);
    assert_eq!(header.version_id, 0);
    assert_eq!(r.read_int32(0).unwrap(), 42);
    assert_eq!(r.read_string(1).unwrap(), "hi");
    assert_eq!(r.read_boolean(2).unwrap(), true);
    r.end_complex_value().unwrap();
}

/// S3: three references into an array all resolve to the same registered identity.
#[test]
fn shared_identity_resolves_at_every_reference_site() {
    let mut buf = Vec::new();
    let mut w = WritingHandler::new(&mut buf);
    w.begin_array(None, 3).unwrap();
    w.begin_user_type(None, Some(100), 5, 0).unwrap();
    w.on_int32(Some(0), 7).unwrap();
    w.end_complex_value().unwrap();
    w.write_reference(None, 100).unwrap();
    w.write_reference(None, 100).unwrap();
    w.end_complex_value().unwrap();

    let mut r = Reader::new(buf.as_slice());
    r.begin_array(None).unwrap();

    let first = match r.begin_user_type(None).unwrap() {
        pof::frame::UserTypeSlot::Value(h) => h,
        other => panic!("expected a value, got {:?}", other),
    };
    assert_eq!(r.read_int32(0).unwrap(), 7);
    r.end_complex_value().unwrap();

    for _ in 0..2 {
        match r.begin_user_type(None).unwrap() {
            pof::frame::UserTypeSlot::Reference(id) => assert_eq!(id, 100),
            other => panic!("expected a reference, got {:?}", other),
        }
    }
    let _ = first;
    r.end_complex_value().unwrap();
}

/// S4: reading forward through a sparse array fills in defaults for skipped indices, and
/// requesting an index at or before one already read is an order violation.
#[test]
fn sparse_array_fills_defaults_and_enforces_order() {
    let mut buf = Vec::new();
    let mut w = WritingHandler::new(&mut buf);
    w.begin_sparse_array(None, 1000).unwrap();
    w.on_char_string(Some(0), "A").unwrap();
    w.on_char_string(Some(999), "B").unwrap();
    w.end_complex_value().unwrap();

    let mut r = Reader::new(buf.as_slice());
    r.begin_sparse_array(None).unwrap();
    assert_eq!(r.read_string(500).unwrap(), "");
    assert_eq!(r.read_string(999).unwrap(), "B");
    assert!(r.read_string(0).is_err());
}

/// S5: a property untouched by an older decoder is preserved verbatim via `read_remainder` and
/// can be spliced back into a freshly-written stream alongside an updated earlier property.
#[test]
fn read_remainder_preserves_properties_an_older_decoder_does_not_understand() {
    let mut original = Vec::new();
    let mut w = WritingHandler::new(&mut original);
    w.begin_user_type(None, None, 1, 1).unwrap();
    w.on_char_string(Some(0), "a").unwrap();
    w.on_char_string(Some(1), "b").unwrap();
    w.on_char_string(Some(2), "c").unwrap();
    w.end_complex_value().unwrap();

    let mut r = Reader::new(original.as_slice());
    let header = match r.begin_user_type(None).unwrap() {
        pof::frame::UserTypeSlot::Value(h) => h,
        other => panic!("expected a value, got {:?}", other),
    };
    let first = r.read_string(0).unwrap();
    assert_eq!(first, "a");
    let remainder = r.read_remainder().unwrap();
    r.end_complex_value().unwrap();

    let mut rewritten = Vec::new();
    let mut w2 = WritingHandler::new(&mut rewritten);
    w2.begin_user_type(None, None, header.type_id, header.version_id)
        .unwrap();
    w2.on_char_string(Some(0), "replaced").unwrap();
    w2.end_complex_value().unwrap();
    rewritten.extend_from_slice(&remainder);

    let mut r2 = Reader::new(rewritten.as_slice());
    r2.begin_user_type(None).unwrap();
    assert_eq!(r2.read_string(0).unwrap(), "replaced");
    assert_eq!(r2.read_string(1).unwrap(), "b");
    assert_eq!(r2.read_string(2).unwrap(), "c");
}

/// S6: identity and reference markers are recognized inside a uniform array of user types
/// without needing a per-element type tag.
#[test]
fn uniform_array_of_user_types_supports_identity_and_reference() {
    let mut buf = Vec::new();
    let mut w = WritingHandler::new(&mut buf);
    w.begin_uniform_array(None, 4, 5).unwrap();
    w.begin_user_type(None, Some(1), 5, 0).unwrap();
    w.on_int32(Some(0), 1).unwrap();
    w.end_complex_value().unwrap();
    w.write_reference(None, 1).unwrap();
    w.begin_user_type(None, None, 5, 0).unwrap();
    w.on_int32(Some(0), 2).unwrap();
    w.end_complex_value().unwrap();
    w.begin_user_type(None, None, 5, 0).unwrap();
    w.on_int32(Some(0), 3).unwrap();
    w.end_complex_value().unwrap();
    w.end_complex_value().unwrap();

    let mut r = Reader::new(buf.as_slice());
    let values = r.read_array(None).unwrap();
    assert_eq!(values.len(), 4);
    assert!(matches!(values[1], pof::value::Value::Reference(1)));
}
