//! A crate to (de)serialize Rust data types to/from bytes in the Packed Object Format (POF).
//!
//! This is the detailed API documentation. For a higher level introduction see the [README].
//!
//! [README]: https://crates.io/crates/pof-codec/
//!
//! # Format
//!
//! POF is a compact, versioned, self-describing binary encoding: every value on the wire carries
//! its own type tag, so a stream can be decoded without an external schema, while a
//! [`MapRegistry`](registry::MapRegistry) plug-in lets application code attach concrete Rust
//! types to the non-negative "user type" tags the format reserves for that purpose.
//!
//! - Integers are encoded with a variable-length, sign-in-first-byte scheme ([packed]) so that
//!   small values (the overwhelming majority in practice) cost a single byte.
//! - A handful of common shapes (booleans, the empty string, empty collections, a null reference,
//!   tiny integers in `-1..=22`, and the non-finite floats) collapse to a single compact tag byte
//!   with no payload at all ([tags]).
//! - Structures are sparse by default: a writer may omit any property whose value equals that
//!   property's wire default, and a reader asking for a property that was never written simply
//!   gets the default back. This is the same idea as "unknown fields compare as optional" in other
//!   self-describing formats, but it is a first-class, required behaviour here, not an ergonomic
//!   add-on.
//! - Values may be registered under a small integer identity and later referred to again by that
//!   identity instead of being re-encoded, so that object graphs with shared or cyclic structure
//!   round-trip without duplication.
//!
//! # Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pof-codec = "0.1"
//! ```
//!
//! ## Typed read/write
//!
//! Implement [`serializer::PofSerialize`] and [`serializer::PofDeserialize`] for your own types and
//! drive them directly over a [`writer::WritingHandler`]/[`reader::Reader`] pair:
//!
//! ```ignore
//! use pof::reader::Reader;
//! use pof::writer::WritingHandler;
//!
//! let mut buf = Vec::new();
//! let mut w = WritingHandler::new(&mut buf);
//! my_value.encode_properties(&mut w)?;
//!
//! let mut r = Reader::new(buf.as_slice());
//! let decoded = MyType::decode_properties(&mut r, 0)?;
//! ```
//!
//! ## Registry-driven read/write
//!
//! Code that does not know the concrete Rust type at compile time (generic tooling, a polymorphic
//! dispatch table keyed by wire type id) goes through [`registry::MapRegistry`] and the
//! registry-free [`value::Value`] shape instead.
//!
//! ## Async support
//!
//! The `async-with-async-std` and `async-with-tokio` feature flags are reserved for decoding from
//! an async reader; only one of these flags can be enabled at once, and neither can be mixed with
//! the default `sync` feature. [reader::Reader] and [writer::WritingHandler] are built against
//! `std::io::Read`/`Write` today regardless of which feature is active.
//!
//! # Resource limits
//!
//! This crate does not try to be clone free or to support `no_std` scenarios. Memory is allocated
//! to decode into. When decoding bytes received from an untrusted source, construct your
//! [reader::Reader] with a [config::Config] that bounds nesting depth and collection/string length
//! (see [crate::error::ErrorKind::Range]) to avoid unbounded allocation or recursion.
//!
//! # Error handling
//!
//! If (de)serialization fails this crate tries to return sufficient contextual information to aid
//! diagnosing where the problem in the data is and why; see [error::Error] and
//! [error::ErrorLocation].
//!
//! For logging or storing of streams for later diagnostic purposes use
//! [util::PrettyPrinter::to_diag_string] to render POF bytes as a compact textual tree with most
//! scalar values redacted.
#[cfg(all(
    feature = "sync",
    any(feature = "async-with-async-std", feature = "async-with-tokio")
))]
compile_error!("feature \"sync\" cannot be enabled at the same time as either of the \"async-with-async-std\" or \"async-with-tokio\" features");

#[cfg(all(feature = "async-std", not(feature = "async-with-async-std")))]
compile_error!("do not enable the \"async-std\" feature directly, instead enable the \"async-with-async-std\" feature");

#[cfg(all(feature = "tokio", not(feature = "async-with-tokio")))]
compile_error!("do not enable the \"tokio\" feature directly, instead enable the \"async-with-tokio\" feature");

pub mod config;
pub mod decimal;
pub mod error;
pub mod frame;
pub mod handler;
pub mod identity;
pub mod packed;
pub mod reader;
pub mod registry;
pub mod serializer;
pub mod tags;
pub mod temporal;
pub mod util;
pub mod value;
pub mod writer;

#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use error::{Error, ErrorKind};
#[doc(inline)]
pub use reader::Reader;
#[doc(inline)]
pub use util::PrettyPrinter;
#[doc(inline)]
pub use value::Value;
#[doc(inline)]
pub use writer::WritingHandler;
