use crate::Code;

/// The error kind after unsuccessful decoding.
///
/// Encoding itself can not fail, only the streams it reads from and writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LzwError {
    /// A code refers to an entry that can not exist in the dictionary at this point.
    ///
    /// Either the stream was not produced by a conforming encoder, or it was corrupted on the
    /// way, or it was written with a different dictionary reset schedule.
    #[error("invalid code {code:#06x} for a dictionary of {size} entries")]
    InvalidCode {
        /// The offending code.
        code: Code,
        /// The size of the dictionary when the code was read.
        size: usize,
    },
    /// The stream ended in the middle of a code word.
    #[error("code stream ends with {trailing} byte(s) of an incomplete code")]
    CorruptedStream {
        /// The number of bytes after the last complete code.
        trailing: usize,
    },
}

/// The error of a coding operation over readers and writers.
#[cfg(feature = "std")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the input or writing the output failed.
    #[error("stream failure: {0}")]
    Stream(#[from] std::io::Error),
    /// See [`LzwError::InvalidCode`].
    #[error("invalid code {code:#06x} for a dictionary of {size} entries")]
    InvalidCode { code: Code, size: usize },
    /// See [`LzwError::CorruptedStream`].
    #[error("code stream ends with {trailing} byte(s) of an incomplete code")]
    CorruptedStream { trailing: usize },
}

#[cfg(feature = "std")]
impl From<LzwError> for Error {
    fn from(err: LzwError) -> Self {
        match err {
            LzwError::InvalidCode { code, size } => Error::InvalidCode { code, size },
            LzwError::CorruptedStream { trailing } => Error::CorruptedStream { trailing },
        }
    }
}

#[cfg(feature = "std")]
impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Stream(err) => err,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
