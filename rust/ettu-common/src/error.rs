use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn out_of_bounds(element: impl Into<String>, position: usize, len: usize) -> Error {
        Error(
            ErrorKind::OutOfBounds {
                element: element.into(),
                position,
                len,
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn size_limit(size: usize, limit: usize) -> Error {
        Error(ErrorKind::SizeLimit { size, limit }.into())
    }

    pub fn verifier_limit(limit: &'static str, value: usize) -> Error {
        Error(ErrorKind::VerifierLimit { limit, value }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` if this error was caused by a read past the end of the buffer.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfBounds { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("buffer of {size} bytes exceeds the size limit of {limit} bytes")]
    SizeLimit { size: usize, limit: usize },

    #[error("'{element}' at position {position} is out of bounds (buffer length {len})")]
    OutOfBounds {
        element: String,
        position: usize,
        len: usize,
    },

    #[error("invalid buffer format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("invalid utf-8 in '{element}'")]
    InvalidUtf8 {
        element: String,
        source: std::str::Utf8Error,
    },

    #[error("verifier limit '{limit}' exceeded ({value})")]
    VerifierLimit { limit: &'static str, value: usize },

    #[error("checksum mismatch for '{element}'")]
    ChecksumMismatch { element: String },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        ErrorKind::InvalidUtf8 {
            element: String::new(),
            source: e,
        }
        .into()
    }
}
