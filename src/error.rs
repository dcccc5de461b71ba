//! Details about (de)serialization failures and where in the stream they occurred.

use std::fmt::{Debug, Display};

use crate::tags::TypeTag;

pub type Result<T> = std::result::Result<T, Error>;

// --- Error ------------------------------------------------------------------------------------------------------

/// Details of a (de)serialization failure and the location in the data where the problem occurred.
///
/// An error consists of an [ErrorKind] that identifies the kind of error that occurred, and an [ErrorLocation] that
/// describes where in the data the problem occurred.
#[derive(Debug)]
#[non_exhaustive]
pub struct Error {
    kind: ErrorKind,
    location: ErrorLocation,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, location: ErrorLocation) -> Self {
        Self { kind, location }
    }

    pub(crate) fn at(kind: ErrorKind, offset: ByteOffset) -> Self {
        Self::new(kind, ErrorLocation::at(offset))
    }

    /// Get details about the kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Get details about where in the data the error occurred.
    pub fn location(&self) -> &ErrorLocation {
        &self.location
    }

    pub(crate) fn with_property_index(mut self, index: i32) -> Self {
        self.location = self.location.with_property_index(index);
        self
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at {})", self.kind, self.location)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(e), ErrorLocation::unknown())
    }
}

// --- ErrorKind --------------------------------------------------------------------------------------------------

/// Details about the kind of error that occurred.
///
/// These correspond 1:1 to the error kinds enumerated in the format specification: errors while
/// reading/writing the underlying byte source (`Io`), errors detected by the property-order
/// discipline (`OrderViolation`), errors while coercing a decoded tag to a requested kind
/// (`TypeMismatch`), and so on.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The underlying byte source or sink failed.
    Io(std::io::Error),

    /// A host-supplied size limit (see [crate::config::Config]) was exceeded while buffering an
    /// async byte source into memory prior to parsing.
    ResponseSizeExceedsLimit(usize),

    /// The reader was asked to advance to a property index at or before the previously read index.
    OrderViolation { requested: i32, previous: i32 },

    /// The wire tag found cannot be coerced to the requested kind.
    TypeMismatch { found: TypeTag, wanted: &'static str },

    /// A user type id has no registered serializer.
    UnknownType(i32),

    /// A `T_REFERENCE` pointed at an identity id that was never registered in this stream.
    MissingIdentity(u64),

    /// An identity id was registered twice with different values.
    DuplicateIdentity(u64),

    /// A decoded temporal or decimal value violates its range invariants.
    Range(String),

    /// The byte source was exhausted while a token was only partially read.
    Truncated,

    /// A wire feature this crate does not (yet) implement, e.g. 128-bit float arithmetic.
    Unsupported(&'static str),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Io(e) => write!(f, "io error: {}", e),
            ErrorKind::ResponseSizeExceedsLimit(size) => write!(
                f,
                "response size {} exceeds the configured limit",
                size
            ),
            ErrorKind::OrderViolation { requested, previous } => write!(
                f,
                "order violation: requested property {} at or before previously read property {}",
                requested, previous
            ),
            ErrorKind::TypeMismatch { found, wanted } => {
                write!(f, "type mismatch: found tag {:?}, wanted {}", found, wanted)
            }
            ErrorKind::UnknownType(id) => write!(f, "unknown user type id {}", id),
            ErrorKind::MissingIdentity(id) => write!(f, "missing identity {}", id),
            ErrorKind::DuplicateIdentity(id) => write!(f, "duplicate identity {}", id),
            ErrorKind::Range(msg) => write!(f, "range error: {}", msg),
            ErrorKind::Truncated => write!(f, "truncated: byte source exhausted mid-token"),
            ErrorKind::Unsupported(what) => write!(f, "unsupported: {}", what),
        }
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(e: std::io::Error) -> Self {
        ErrorKind::Io(e)
    }
}

impl From<crate::packed::Error> for ErrorKind {
    fn from(e: crate::packed::Error) -> Self {
        match e {
            crate::packed::Error::Io(e) => ErrorKind::Io(e),
            crate::packed::Error::Truncated => ErrorKind::Truncated,
            crate::packed::Error::Overflow => {
                ErrorKind::Range("packed integer exceeds the width limit".into())
            }
        }
    }
}

impl From<crate::packed::Error> for Error {
    fn from(e: crate::packed::Error) -> Self {
        Error::new(ErrorKind::from(e), ErrorLocation::unknown())
    }
}

// --- ErrorLocation ----------------------------------------------------------------------------------------------

/// Details about where in the data the error occurred.
#[derive(Clone, Debug, Default)]
pub struct ErrorLocation {
    offset: Option<ByteOffset>,
    /// Type id of each open user-type frame, outermost first.
    type_path: Vec<i32>,
    /// Property index within the innermost open frame, if known.
    property_index: Option<i32>,
}

impl ErrorLocation {
    pub(crate) fn at(offset: ByteOffset) -> Self {
        Self {
            offset: Some(offset),
            ..Default::default()
        }
    }

    pub(crate) fn unknown() -> Self {
        Self::default()
    }

    pub(crate) fn with_offset(mut self, offset: ByteOffset) -> Self {
        let _ = self.offset.get_or_insert(offset);
        self
    }

    pub(crate) fn with_type_path(mut self, type_path: &[i32]) -> Self {
        if self.type_path.is_empty() {
            self.type_path.extend_from_slice(type_path);
        }
        self
    }

    pub(crate) fn with_property_index(mut self, index: i32) -> Self {
        let _ = self.property_index.get_or_insert(index);
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.offset.is_none() && self.type_path.is_empty() && self.property_index.is_none()
    }

    pub fn offset(&self) -> Option<ByteOffset> {
        self.offset
    }

    pub fn type_path(&self) -> &[i32] {
        &self.type_path
    }

    pub fn property_index(&self) -> Option<i32> {
        self.property_index
    }
}

impl Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }

        let mut sep_str = "";
        let mut sep = || {
            let s = sep_str;
            sep_str = ", ";
            s
        };

        if let Some(offset) = self.offset {
            write!(f, "{}pos: {} bytes", sep(), *offset)?;
        }
        if !self.type_path.is_empty() {
            write!(f, "{}type path: ", sep())?;
            let mut iter = self.type_path.iter();
            write!(f, "{}", iter.next().unwrap())?;
            for t in iter {
                write!(f, " > {}", t)?;
            }
        }
        if let Some(index) = self.property_index {
            write!(f, "{}property: {}", sep(), index)?;
        }
        Ok(())
    }
}

// --- ByteOffset -------------------------------------------------------------------------------------------------

/// An offset into a stream of Packed Object Format bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteOffset(pub u64);

impl std::ops::Deref for ByteOffset {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u64> for ByteOffset {
    fn from(v: u64) -> Self {
        ByteOffset(v)
    }
}

impl From<usize> for ByteOffset {
    fn from(v: usize) -> Self {
        ByteOffset(v as u64)
    }
}
