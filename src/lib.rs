//! # LZW decoder and encoder with fixed 16-bit codes
//!
//! This crate provides an [`Encoder`] and a [`Decoder`] for a self-contained LZW format. Every
//! code word occupies exactly 16 bits and is written as two bytes in one consistent byte order,
//! the host order unless configured otherwise. There is no header and no end code, the code
//! stream simply ends with the underlying byte stream.
//!
//! Both sides start from a dictionary of the 256 single byte sequences, where the code of each
//! entry equals its byte value. Every new sequence receives the next free code. Once the
//! dictionary holds `1 << 16` entries it is reset to its initial state before it would grow
//! again, on both sides at the same logical position of the stream.
//!
//! Exemplary use of the encoder:
//!
//! ```
//! use lzw16::{ByteOrder, encode::Encoder};
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//! let mut compressed = vec![];
//!
//! let mut enc = Encoder::with_byte_order(ByteOrder::Little);
//! let result = enc.into_stream(&mut compressed).encode_all(&data[..]);
//! result.status.unwrap();
//! assert_eq!(compressed.len(), 2 * 16);
//! ```
//!
//! And the matching decoder:
//!
//! ```
//! use lzw16::{decode_to_vec, encode_to_vec};
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//! let compressed = encode_to_vec(data);
//! assert_eq!(decode_to_vec(&compressed).unwrap(), data);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std as alloc;

/// The width of every code word in bits.
pub const CODE_WIDTH: u8 = 16;
/// The maximum number of entries a dictionary holds before it is reset.
pub const MAX_ENTRIES: usize = 1 << CODE_WIDTH;
/// The number of entries in a freshly reset dictionary, one for each byte value.
pub const INITIAL_ENTRIES: usize = 1 << 8;

/// Alias for a LZW code point
pub type Code = u16;

/// The order of the two bytes of each code word in the stream.
///
/// Encoder and decoder must agree on the order. The default is the order of the host, which
/// makes streams interchangeable between programs on the same platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// The least significant byte is written first.
    Little,
    /// The most significant byte is written first.
    Big,
}

/// The status after successful coding of some bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LzwStatus {
    /// Some progress was made, there may be more to come.
    Ok,
    /// No bytes could be consumed or produced.
    ///
    /// Either the output buffer was too small, or the input was empty before the coder was told
    /// that the stream has ended.
    NoProgress,
    /// The stream has been completely coded and flushed.
    Done,
}

/// The result of a coding operation on a pair of buffers.
#[must_use = "Contains a status with potential error information"]
#[derive(Debug)]
pub struct StreamResult {
    /// The number of bytes consumed from the input buffer.
    pub consumed_in: usize,
    /// The number of bytes written into the output buffer.
    pub consumed_out: usize,
    /// The status after returning from the operation.
    pub status: Result<LzwStatus, LzwError>,
}

/// The result of coding into a vector.
#[cfg(feature = "alloc")]
#[must_use = "Contains a status with potential error information"]
#[derive(Debug)]
pub struct VectorResult {
    /// The number of bytes consumed from the input buffer.
    pub consumed_in: usize,
    /// The status after returning from the operation.
    pub status: Result<LzwStatus, LzwError>,
}

/// The result of coding a whole stream from a reader into a writer.
#[cfg(feature = "std")]
#[must_use = "Contains a status with potential error information"]
#[derive(Debug)]
pub struct AllResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    /// The overall status of the operation.
    pub status: Result<(), Error>,
}

mod error;

#[cfg(feature = "alloc")]
pub mod dictionary;
#[cfg(feature = "alloc")]
pub mod decode;
#[cfg(feature = "alloc")]
pub mod encode;

pub use self::error::LzwError;
#[cfg(feature = "std")]
pub use self::error::Error;

#[cfg(feature = "alloc")]
pub use self::{decode::Decoder, encode::Encoder};

impl ByteOrder {
    /// The byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub(crate) fn to_bytes(self, code: Code) -> [u8; 2] {
        match self {
            ByteOrder::Little => code.to_le_bytes(),
            ByteOrder::Big => code.to_be_bytes(),
        }
    }

    pub(crate) fn from_bytes(self, bytes: [u8; 2]) -> Code {
        match self {
            ByteOrder::Little => Code::from_le_bytes(bytes),
            ByteOrder::Big => Code::from_be_bytes(bytes),
        }
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::native()
    }
}

/// Compress a complete buffer with the host byte order.
#[cfg(feature = "alloc")]
pub fn encode_to_vec(data: &[u8]) -> alloc::vec::Vec<u8> {
    let mut compressed = alloc::vec::Vec::with_capacity(data.len() / 2 + 2);
    let result = Encoder::new().into_vec(&mut compressed).encode_all(data);
    debug_assert!(matches!(result.status, Ok(LzwStatus::Done)));
    compressed
}

/// Decompress a complete code stream written in the host byte order.
///
/// Fails if the stream contains a code that can not have been produced by the encoder, or if it
/// ends in the middle of a code.
#[cfg(feature = "alloc")]
pub fn decode_to_vec(data: &[u8]) -> Result<alloc::vec::Vec<u8>, LzwError> {
    let mut decompressed = alloc::vec::Vec::with_capacity(2 * data.len());
    Decoder::new()
        .into_vec(&mut decompressed)
        .decode_all(data)
        .status?;
    Ok(decompressed)
}
