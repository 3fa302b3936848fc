//! Error types.
//!
//! One error value per failure, carrying a kind tag and a message, per the
//! error handling design: no global error state, no exceptions, and no
//! silent wrapping. Higher layers may add a path (see [`Error::with_path`])
//! but never replace the kind.

use std::fmt::{self, Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind {
    /// An argument violates a precondition (bounds, cardinality, schema
    /// state).
    InvalidValue,
    /// The platform/provider is not initialized, or a view is operated on
    /// without its prerequisite region.
    InvalidState,
    /// Encode failure: length mismatch, value-type mismatch, invalid UTF-8.
    Encoding,
    /// Decode failure: truncated, overlong varint, bad tag, invalid UTF-8,
    /// bool not in {0, 1}.
    Decoding,
    /// Region/buffer access outside the valid range.
    OutOfBounds,
    /// A received frame's schema id does not match the expected one.
    SchemaMismatch,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::InvalidValue => "invalid value",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Encoding => "encoding error",
            ErrorKind::Decoding => "decoding error",
            ErrorKind::OutOfBounds => "out of bounds",
            ErrorKind::SchemaMismatch => "schema mismatch",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// Dotted path through the schema, when the failure can be localized
    /// (validation errors per spec §4.3, view errors per §4.8).
    path: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Decoding, e.to_string())
    }
}

macro_rules! error {
    ($k:ident, $($e:tt)*) => {
        $crate::error::Error::new(
            $crate::error::ErrorKind::$k,
            format!($($e)*),
        )
    };
}

macro_rules! bail {
    ($($e:tt)*) => {
        return Err(error!($($e)*))
    };
}

macro_rules! ensure {
    ($c:expr, $($e:tt)*) => {
        if !$c {
            bail!($($e)*);
        }
    };
}

pub(crate) use bail;
pub(crate) use ensure;
pub(crate) use error;
