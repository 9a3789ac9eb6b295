//! Error taxonomy for the read, validation, and write paths.

use thiserror::Error;

/// Why a byte buffer could not be viewed as a document.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    /// The buffer is shorter than five bytes, or shorter than the length the
    /// header declares.
    #[error("buffer is shorter than the declared document length")]
    ShortRead,
    /// The header declares a length outside the representable range.
    #[error("document header declares an invalid length")]
    InvalidHeader,
    /// The byte at the declared end of the document is not zero.
    #[error("document is missing its zero terminator")]
    InvalidTerminator,
}

/// Why iteration stopped at a malformed element.
///
/// An iterator carrying one of these is terminal: advancing it further is a
/// no-op that returns the same errant iterator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IterError {
    /// The element's declared or implied value size overruns the bytes that
    /// remain in the document.
    #[error("element value overruns the document")]
    ShortRead,
    /// The element's type tag is outside the known set.
    #[error("unknown element type tag")]
    InvalidType,
    /// The element is structurally malformed.
    #[error("malformed element")]
    Invalid,
}

/// The union of [`ViewError`] and [`IterError`], as reported by the eager
/// validator for failures at any nesting depth.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidateErrorKind {
    /// See [`ViewError::ShortRead`] and [`IterError::ShortRead`].
    #[error("short read")]
    ShortRead,
    /// See [`ViewError::InvalidHeader`].
    #[error("invalid document header")]
    InvalidHeader,
    /// See [`ViewError::InvalidTerminator`].
    #[error("invalid document terminator")]
    InvalidTerminator,
    /// See [`IterError::InvalidType`].
    #[error("unknown element type tag")]
    InvalidType,
    /// See [`IterError::Invalid`].
    #[error("malformed element")]
    Invalid,
}

impl From<ViewError> for ValidateErrorKind {
    fn from(e: ViewError) -> Self {
        match e {
            ViewError::ShortRead => Self::ShortRead,
            ViewError::InvalidHeader => Self::InvalidHeader,
            ViewError::InvalidTerminator => Self::InvalidTerminator,
        }
    }
}

impl From<IterError> for ValidateErrorKind {
    fn from(e: IterError) -> Self {
        match e {
            IterError::ShortRead => Self::ShortRead,
            IterError::InvalidType => Self::InvalidType,
            IterError::Invalid => Self::Invalid,
        }
    }
}

/// An eager-validation failure, located within the input buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at offset {offset}")]
pub struct ValidateError {
    /// Byte offset, within the validated buffer, of the first violation.
    pub offset: usize,
    /// What went wrong there.
    pub kind: ValidateErrorKind,
}

/// Why a mutation was rejected. The document is left unchanged in every case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// The resulting document would exceed the maximum encodable size.
    #[error("document would exceed the maximum encodable size")]
    TooLarge,
    /// The allocator could not provide the requested capacity.
    #[error("allocator failed to provide the requested capacity")]
    AllocFailed,
    /// Element keys are NUL-terminated on the wire and cannot contain NUL.
    #[error("element key contains an embedded NUL byte")]
    KeyContainsNul,
    /// Regex and dbpointer strings are NUL-terminated on the wire and cannot
    /// contain NUL.
    #[error("string value contains an embedded NUL byte")]
    StringContainsNul,
    /// The element at the given position is not a document or array.
    #[error("element is not a document or array")]
    NotADocument,
    /// `reserve` is only meaningful on a root mutator; children do not own a
    /// buffer.
    #[error("cannot reserve through a child document")]
    ChildReserve,
    /// The position token does not refer to an element boundary of this
    /// document.
    #[error("position does not refer to an element of this document")]
    InvalidPosition,
}
