//! A module for all encoding needs.
use crate::alloc::{boxed::Box, vec::Vec};
use crate::dictionary::{CodeTree, Dictionary};
use crate::{ByteOrder, Code, LzwStatus, StreamResult, VectorResult, INITIAL_ENTRIES};

#[cfg(feature = "std")]
use crate::{AllResult, Error};
#[cfg(feature = "std")]
use std::io::{self, BufRead, Write};

/// The state for encoding data with the fixed 16-bit LZW format.
///
/// The same structure can be utilized with streams as well as your own buffers and driver logic.
/// It may even be possible to mix them if you are sufficiently careful not to lose any written
/// data in the process.
pub struct Encoder {
    state: Box<EncodeState>,
}

/// An encoding stream sink.
///
/// See [`Encoder::into_stream`] on how to create this type.
///
/// [`Encoder::into_stream`]: struct.Encoder.html#method.into_stream
#[cfg(feature = "std")]
pub struct IntoStream<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

/// An async encoding sink.
///
/// See [`Encoder::into_async`] on how to create this type.
///
/// [`Encoder::into_async`]: struct.Encoder.html#method.into_async
#[cfg(feature = "async")]
pub struct IntoAsync<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

/// An encoding sink into a vector.
///
/// See [`Encoder::into_vec`] on how to create this type.
///
/// [`Encoder::into_vec`]: struct.Encoder.html#method.into_vec
pub struct IntoVec<'d> {
    encoder: &'d mut Encoder,
    vector: &'d mut Vec<u8>,
}

struct EncodeState {
    /// The order of the bytes of each written code.
    order: ByteOrder,
    /// The current encoding symbol tree.
    tree: CodeTree,
    /// The code of the currently matched sequence, `None` while nothing has been read.
    current_code: Option<Code>,
    /// If the caller has marked the input as complete.
    has_ended: bool,
    /// If the pending code has been written after the end of input.
    is_done: bool,
    /// Number of codes written so far.
    codes: u64,
    /// Number of dictionary resets so far.
    resets: u64,
}

/// The size of the intermediate buffer of the stream adapters.
#[cfg(feature = "std")]
const STREAM_BUF_SIZE: usize = 1 << 16;

impl Encoder {
    /// Create a new encoder writing codes in the byte order of the host.
    pub fn new() -> Self {
        Encoder::with_byte_order(ByteOrder::native())
    }

    /// Create a new encoder writing codes in the specified byte order.
    pub fn with_byte_order(order: ByteOrder) -> Self {
        Encoder {
            state: Box::new(EncodeState::new(order)),
        }
    }

    /// Encode some bytes from `inp` into `out`.
    ///
    /// Every code takes two bytes of output, so an output buffer of less than two bytes never
    /// makes progress. The code of the currently matched sequence is held back until the match
    /// can not be extended any further, or until [`finish`] has been called and the input is
    /// exhausted.
    ///
    /// See [`into_stream`] for high-level functions (this interface is only available with the
    /// `std` feature).
    ///
    /// [`into_stream`]: #method.into_stream
    /// [`finish`]: #method.finish
    pub fn encode_bytes(&mut self, inp: &[u8], out: &mut [u8]) -> StreamResult {
        self.state.advance(inp, out)
    }

    /// Construct an encoder into a writer.
    #[cfg(feature = "std")]
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            encoder: self,
            writer,
        }
    }

    /// Construct an encoder into an async writer.
    #[cfg(feature = "async")]
    pub fn into_async<W: futures::io::AsyncWrite>(&mut self, writer: W) -> IntoAsync<'_, W> {
        IntoAsync {
            encoder: self,
            writer,
        }
    }

    /// Construct an encoder into a vector.
    ///
    /// All encoded data is appended and the vector is __not__ cleared.
    pub fn into_vec<'lt>(&'lt mut self, vec: &'lt mut Vec<u8>) -> IntoVec<'lt> {
        IntoVec {
            encoder: self,
            vector: vec,
        }
    }

    /// Mark the encoding as finished.
    ///
    /// Once the input runs dry in following calls to `encode_bytes`, the encoder writes the code
    /// of the pending match and reports `Done`. There is no end code in the stream.
    pub fn finish(&mut self) {
        self.state.has_ended = true;
    }

    /// Check if the final code has been written.
    pub fn is_done(&self) -> bool {
        self.state.is_done
    }

    /// The number of codes written so far.
    pub fn codes(&self) -> u64 {
        self.state.codes
    }

    /// The number of times the dictionary has been reset so far.
    pub fn resets(&self) -> u64 {
        self.state.resets
    }

    /// The current number of dictionary entries.
    pub fn dictionary_len(&self) -> usize {
        self.state.tree.len()
    }

    /// The byte order of written codes.
    pub fn byte_order(&self) -> ByteOrder {
        self.state.order
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new()
    }
}

#[cfg(feature = "std")]
impl<W: Write> IntoStream<'_, W> {
    /// Encode data from a reader.
    ///
    /// This will drain the supplied reader. It will not write the code of the pending match
    /// after all data has been processed, so more data can follow in another call.
    pub fn encode(&mut self, read: impl BufRead) -> AllResult {
        self.encode_part(read, false)
    }

    /// Encode data from a reader and finish the code stream.
    pub fn encode_all(mut self, read: impl BufRead) -> AllResult {
        self.encode_part(read, true)
    }

    fn encode_part(&mut self, mut read: impl BufRead, finish: bool) -> AllResult {
        let IntoStream { encoder, writer } = self;
        enum Progress {
            Ok,
            Done,
        }

        let mut bytes_read = 0;
        let mut bytes_written = 0;

        let read_bytes = &mut bytes_read;
        let write_bytes = &mut bytes_written;

        let mut outbuf = vec![0; STREAM_BUF_SIZE];
        let once = || -> Result<Progress, Error> {
            let data = read.fill_buf()?;

            if data.is_empty() {
                if finish {
                    encoder.finish();
                } else {
                    return Ok(Progress::Done);
                }
            }

            let result = encoder.encode_bytes(data, &mut outbuf[..]);
            *read_bytes += result.consumed_in;
            *write_bytes += result.consumed_out;
            read.consume(result.consumed_in);

            writer.write_all(&outbuf[..result.consumed_out])?;
            let done = result.status?;

            match done {
                LzwStatus::Done => Ok(Progress::Done),
                LzwStatus::NoProgress => Err(Error::Stream(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "encoder made no progress",
                ))),
                LzwStatus::Ok => Ok(Progress::Ok),
            }
        };

        let status: Result<(), Error> = core::iter::repeat_with(once)
            // scan+fuse can be replaced with map_while
            .scan((), |(), result| match result {
                Ok(Progress::Ok) => Some(Ok(())),
                Err(err) => Some(Err(err)),
                Ok(Progress::Done) => None,
            })
            .fuse()
            .collect();

        // Flush on every exit path, the first error wins.
        let flushed = writer.flush();
        let status = status.and_then(|()| flushed.map_err(Error::from));

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }
}

impl IntoVec<'_> {
    /// Encode data from a slice.
    pub fn encode(&mut self, read: &[u8]) -> VectorResult {
        self.encode_part(read, false)
    }

    /// Encode data from a slice and finish the code stream.
    pub fn encode_all(mut self, read: &[u8]) -> VectorResult {
        self.encode_part(read, true)
    }

    fn grab_buffer(&mut self) -> (&mut [u8], &mut Encoder) {
        const CHUNK_SIZE: usize = 1 << 12;
        let encoder = &mut self.encoder;
        let length = self.vector.len();

        // Use the vector to do overflow checks and w/e.
        self.vector.reserve(CHUNK_SIZE);
        // FIXME: encoding into uninit buffer?
        self.vector.resize(length + CHUNK_SIZE, 0u8);

        (&mut self.vector[length..], encoder)
    }

    fn encode_part(&mut self, part: &[u8], finish: bool) -> VectorResult {
        let mut result = VectorResult {
            consumed_in: 0,
            status: Ok(LzwStatus::Ok),
        };

        enum Progress {
            Ok,
            Done(LzwStatus),
        }

        // Converting to mutable refs to move into the `once` closure.
        let read_bytes = &mut result.consumed_in;
        let mut data = part;

        if finish {
            self.encoder.finish();
        }

        let once = move || {
            // Grab the empty portion of the vector.
            let (outbuf, encoder) = self.grab_buffer();
            let written_len = outbuf.len();
            let result = encoder.encode_bytes(data, outbuf);
            *read_bytes += result.consumed_in;
            data = &data[result.consumed_in..];

            let unfilled = written_len - result.consumed_out;
            let new_len = self.vector.len() - unfilled;
            self.vector.truncate(new_len);

            match result.status {
                Ok(LzwStatus::Ok) if data.is_empty() && !finish => {
                    Ok(Progress::Done(LzwStatus::Ok))
                }
                Ok(LzwStatus::Ok) => Ok(Progress::Ok),
                Ok(status) => Ok(Progress::Done(status)),
                Err(err) => Err(err),
            }
        };

        // Stop on first error or done.
        let status = core::iter::repeat_with(once).find_map(|result| match result {
            Ok(Progress::Ok) => None,
            Ok(Progress::Done(status)) => Some(Ok(status)),
            Err(err) => Some(Err(err)),
        });

        if let Some(status) = status {
            result.status = status;
        }

        result
    }
}

#[cfg(feature = "async")]
impl<W: futures::io::AsyncWrite + core::marker::Unpin> IntoAsync<'_, W> {
    /// Encode data from an async reader.
    ///
    /// This will drain the supplied reader. It will not write the code of the pending match
    /// after all data has been processed.
    pub async fn encode(
        &mut self,
        read: impl futures::io::AsyncBufRead + core::marker::Unpin,
    ) -> AllResult {
        self.encode_part(read, false).await
    }

    /// Encode data from an async reader and finish the code stream.
    pub async fn encode_all(
        mut self,
        read: impl futures::io::AsyncBufRead + core::marker::Unpin,
    ) -> AllResult {
        self.encode_part(read, true).await
    }

    async fn encode_part(
        &mut self,
        mut read: impl futures::io::AsyncBufRead + core::marker::Unpin,
        finish: bool,
    ) -> AllResult {
        use futures::io::{AsyncBufReadExt, AsyncWriteExt};

        let IntoAsync { encoder, writer } = self;
        let mut bytes_read = 0;
        let mut bytes_written = 0;
        let mut outbuf = vec![0; STREAM_BUF_SIZE];

        let status = loop {
            let data = match read.fill_buf().await {
                Ok(data) => data,
                Err(err) => break Err(Error::from(err)),
            };

            if data.is_empty() {
                if finish {
                    encoder.finish();
                } else {
                    break Ok(());
                }
            }

            let result = encoder.encode_bytes(data, &mut outbuf[..]);
            bytes_read += result.consumed_in;
            bytes_written += result.consumed_out;
            read.consume_unpin(result.consumed_in);

            if let Err(err) = writer.write_all(&outbuf[..result.consumed_out]).await {
                break Err(Error::from(err));
            }

            let done = match result.status {
                Ok(done) => done,
                Err(err) => break Err(Error::from(err)),
            };

            match done {
                LzwStatus::Done => break Ok(()),
                LzwStatus::NoProgress => {
                    break Err(Error::Stream(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "encoder made no progress",
                    )))
                }
                LzwStatus::Ok => {}
            }
        };

        let flushed = writer.flush().await;
        let status = status.and_then(|()| flushed.map_err(Error::from));

        AllResult {
            bytes_read,
            bytes_written,
            status,
        }
    }
}

impl EncodeState {
    fn new(order: ByteOrder) -> Self {
        EncodeState {
            order,
            tree: CodeTree::new(),
            current_code: None,
            has_ended: false,
            is_done: false,
            codes: 0,
            resets: 0,
        }
    }

    fn advance(&mut self, mut inp: &[u8], mut out: &mut [u8]) -> StreamResult {
        let c_in = inp.len();
        let c_out = out.len();

        if self.is_done {
            return StreamResult {
                consumed_in: 0,
                consumed_out: 0,
                status: Ok(LzwStatus::Done),
            };
        }

        while out.len() >= 2 {
            let mut next_code = None;
            let mut bytes = inp.iter();
            while let Some(&byte) = bytes.next() {
                if self.tree.is_full() {
                    self.reset_tree();
                }

                match self.current_code {
                    None => self.current_code = Some(Code::from(byte)),
                    Some(code) => match self.tree.iterate(code, byte) {
                        Ok(next) => self.current_code = Some(next),
                        Err(_) => {
                            next_code = Some(code);
                            self.current_code = Some(Code::from(byte));
                            break;
                        }
                    },
                }
            }

            inp = bytes.as_slice();
            match next_code {
                // No more bytes, no code produced.
                None => break,
                Some(code) => self.write_code(code, &mut out),
            }
        }

        if inp.is_empty() && self.has_ended && out.len() >= 2 {
            if let Some(code) = self.current_code.take() {
                self.write_code(code, &mut out);
            }
            self.is_done = true;
            tracing::trace!(codes = self.codes, resets = self.resets, "encoder finished");
        }

        let consumed_in = c_in - inp.len();
        let consumed_out = c_out - out.len();
        let status = if self.is_done {
            Ok(LzwStatus::Done)
        } else if consumed_in == 0 && consumed_out == 0 {
            Ok(LzwStatus::NoProgress)
        } else {
            Ok(LzwStatus::Ok)
        };

        StreamResult {
            consumed_in,
            consumed_out,
            status,
        }
    }

    fn reset_tree(&mut self) {
        // The tree only fills up right after an insertion, which leaves a single byte match.
        debug_assert!(self
            .current_code
            .map_or(true, |code| usize::from(code) < INITIAL_ENTRIES));
        self.tree.reset();
        self.resets += 1;
        tracing::debug!(
            codes = self.codes,
            resets = self.resets,
            "encoder dictionary reset"
        );
    }

    fn write_code(&mut self, code: Code, out: &mut &mut [u8]) {
        let (bytes, tail) = core::mem::take(out).split_at_mut(2);
        bytes.copy_from_slice(&self.order.to_bytes(code));
        *out = tail;
        self.codes += 1;
    }
}
