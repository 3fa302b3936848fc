//! Error type for the framing/provider layer. Wraps [`barewire::Error`]
//! rather than re-deriving its kind enum, plus the handful of failure
//! modes specific to this layer (an unexpected response, a stale
//! connection).

use std::fmt::{self, Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The collaborator (pipe/shared-memory provider) is gone or was
    /// never connected.
    NotConnected,
    /// A frame's schema id did not match what the protocol layer expected.
    SchemaMismatch,
    /// A response frame arrived whose correlation id has no matching
    /// in-flight request.
    UnexpectedResponse,
    /// Frame header or payload failed to parse.
    Framing,
    /// The underlying codec/layout layer failed.
    Codec,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::NotConnected => "not connected",
            ErrorKind::SchemaMismatch => "schema mismatch",
            ErrorKind::UnexpectedResponse => "unexpected response",
            ErrorKind::Framing => "framing error",
            ErrorKind::Codec => "codec error",
        })
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    source: Option<barewire::Error>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<barewire::Error> for Error {
    fn from(e: barewire::Error) -> Self {
        Error {
            kind: ErrorKind::Codec,
            message: e.to_string(),
            source: Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::new(ErrorKind::Framing, e.to_string())
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
