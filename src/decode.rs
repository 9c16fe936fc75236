//! A module for all decoding needs.
use crate::alloc::{boxed::Box, vec::Vec};
use crate::dictionary::{CodeTable, Dictionary};
use crate::{ByteOrder, Code, LzwError, LzwStatus, StreamResult, VectorResult, MAX_ENTRIES};

#[cfg(feature = "std")]
use crate::{AllResult, Error};
#[cfg(feature = "std")]
use std::io::{self, BufRead, Write};

/// The state for decoding data with the fixed 16-bit LZW format.
///
/// The same structure can be utilized with streams as well as your own buffers and driver logic.
/// It may even be possible to mix them if you are sufficiently careful not to lose or skip any
/// already decoded data in the process.
pub struct Decoder {
    state: Box<DecodeState>,
}

/// A decoding stream sink.
///
/// See [`Decoder::into_stream`] on how to create this type.
///
/// [`Decoder::into_stream`]: struct.Decoder.html#method.into_stream
#[cfg(feature = "std")]
pub struct IntoStream<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

/// An async decoding sink.
///
/// See [`Decoder::into_async`] on how to create this type.
///
/// [`Decoder::into_async`]: struct.Decoder.html#method.into_async
#[cfg(feature = "async")]
pub struct IntoAsync<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

/// A decoding sink into a vector.
///
/// See [`Decoder::into_vec`] on how to create this type.
///
/// [`Decoder::into_vec`]: struct.Decoder.html#method.into_vec
pub struct IntoVec<'d> {
    decoder: &'d mut Decoder,
    vector: &'d mut Vec<u8>,
}

struct DecodeState {
    /// The order of the bytes of each read code.
    order: ByteOrder,

    /// The table of decoded codes.
    table: CodeTable,

    /// The buffer of decoded data that did not fit the output.
    buffer: Buffer,

    /// The previously decoded code, `None` until the first code has been read.
    last: Option<Code>,

    /// The first byte of a code whose second byte has not arrived yet.
    partial: Option<u8>,

    /// If the caller has marked the input as complete.
    has_ended: bool,

    /// If all input has been decoded and written.
    is_done: bool,

    /// The first error, repeated on all following calls.
    error: Option<LzwError>,

    /// Number of codes decoded so far.
    codes: u64,

    /// Number of dictionary resets so far.
    resets: u64,
}

struct Buffer {
    bytes: Vec<u8>,
    read_mark: usize,
    write_mark: usize,
}

/// The size of the intermediate buffer of the stream adapters.
#[cfg(feature = "std")]
const STREAM_BUF_SIZE: usize = 1 << 16;

impl Decoder {
    /// Create a new decoder reading codes in the byte order of the host.
    pub fn new() -> Self {
        Decoder::with_byte_order(ByteOrder::native())
    }

    /// Create a new decoder reading codes in the specified byte order.
    pub fn with_byte_order(order: ByteOrder) -> Self {
        Decoder {
            state: Box::new(DecodeState::new(order)),
        }
    }

    /// Decode some bytes from `inp` and write result to `out`.
    ///
    /// This will consume a prefix of the input buffer and write decoded output into a prefix of
    /// the output buffer. See the respective fields of the return value for the count of consumed
    /// and written bytes. A code split between two calls is carried over. Decoded data that does
    /// not fit into `out` is kept and written first on the next call.
    ///
    /// The stream has no end marker. Call [`finish`] once all input has been supplied, the
    /// following calls then report `Done` after all data has been written, or an error when the
    /// input stopped in the middle of a code.
    ///
    /// [`finish`]: #method.finish
    pub fn decode_bytes(&mut self, inp: &[u8], out: &mut [u8]) -> StreamResult {
        self.state.advance(inp, out)
    }

    /// Construct a decoder into a writer.
    #[cfg(feature = "std")]
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            decoder: self,
            writer,
        }
    }

    /// Construct a decoder into an async writer.
    #[cfg(feature = "async")]
    pub fn into_async<W: futures::io::AsyncWrite>(&mut self, writer: W) -> IntoAsync<'_, W> {
        IntoAsync {
            decoder: self,
            writer,
        }
    }

    /// Construct a decoder into a vector.
    ///
    /// All decoded data is appended and the vector is __not__ cleared.
    pub fn into_vec<'lt>(&'lt mut self, vec: &'lt mut Vec<u8>) -> IntoVec<'lt> {
        IntoVec {
            decoder: self,
            vector: vec,
        }
    }

    /// Mark the input as complete.
    pub fn finish(&mut self) {
        self.state.has_ended = true;
    }

    /// Check if all input has been decoded and written.
    pub fn is_done(&self) -> bool {
        self.state.is_done
    }

    /// The number of codes decoded so far.
    pub fn codes(&self) -> u64 {
        self.state.codes
    }

    /// The number of times the dictionary has been reset so far.
    pub fn resets(&self) -> u64 {
        self.state.resets
    }

    /// The current number of dictionary entries.
    pub fn dictionary_len(&self) -> usize {
        self.state.table.len()
    }

    /// The byte order of read codes.
    pub fn byte_order(&self) -> ByteOrder {
        self.state.order
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

#[cfg(feature = "std")]
impl<W: Write> IntoStream<'_, W> {
    /// Decode data from a reader.
    ///
    /// This will read data until the stream is empty. A trailing partial code is kept for a
    /// following call and not reported.
    pub fn decode(&mut self, read: impl BufRead) -> AllResult {
        self.decode_part(read, false)
    }

    /// Decode data from a reader, requiring the stream to end on a code boundary.
    ///
    /// On an error, all data decoded before the offending code has been written.
    pub fn decode_all(mut self, read: impl BufRead) -> AllResult {
        self.decode_part(read, true)
    }

    fn decode_part(&mut self, mut read: impl BufRead, finish: bool) -> AllResult {
        let IntoStream { decoder, writer } = self;

        #[derive(Clone, Copy)]
        enum Progress {
            Ok,
            Done,
        }

        let mut bytes_read = 0;
        let mut bytes_written = 0;

        // Converting to mutable refs to move into the `once` closure.
        let read_bytes = &mut bytes_read;
        let write_bytes = &mut bytes_written;

        let mut outbuf = vec![0; STREAM_BUF_SIZE];
        let once = || -> Result<Progress, Error> {
            // Try to grab one buffer of input data.
            let data = read.fill_buf()?;

            if data.is_empty() {
                if finish {
                    decoder.finish();
                } else {
                    return Ok(Progress::Done);
                }
            }

            // Decode as much of the buffer as fits.
            let result = decoder.decode_bytes(data, &mut outbuf[..]);
            // Do the bookkeeping and consume the buffer.
            *read_bytes += result.consumed_in;
            *write_bytes += result.consumed_out;
            read.consume(result.consumed_in);

            // Handle the status in the result.
            // Decoded data is written even when the rest of the input is invalid.
            writer.write_all(&outbuf[..result.consumed_out])?;
            let done = result.status?;

            match done {
                LzwStatus::Done => Ok(Progress::Done),
                LzwStatus::NoProgress => Err(Error::Stream(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "decoder made no progress",
                ))),
                LzwStatus::Ok => Ok(Progress::Ok),
            }
        };

        // Decode chunks of input data until we're done.
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
    /// Decode data from a slice.
    pub fn decode(&mut self, read: &[u8]) -> VectorResult {
        self.decode_part(read, false)
    }

    /// Decode data from a slice, requiring the stream to end on a code boundary.
    pub fn decode_all(mut self, read: &[u8]) -> VectorResult {
        self.decode_part(read, true)
    }

    fn grab_buffer(&mut self) -> (&mut [u8], &mut Decoder) {
        const CHUNK_SIZE: usize = 1 << 12;
        let decoder = &mut self.decoder;
        let length = self.vector.len();

        // Use the vector to do overflow checks and w/e.
        self.vector.reserve(CHUNK_SIZE);
        // FIXME: decoding into uninit buffer?
        self.vector.resize(length + CHUNK_SIZE, 0u8);

        (&mut self.vector[length..], decoder)
    }

    fn decode_part(&mut self, part: &[u8], finish: bool) -> VectorResult {
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
            self.decoder.finish();
        }

        let once = move || {
            // Grab the empty portion of the vector.
            let (outbuf, decoder) = self.grab_buffer();
            let written_len = outbuf.len();

            // Decode as much of the buffer as fits.
            let result = decoder.decode_bytes(data, outbuf);
            // Do the bookkeeping and consume the buffer.
            *read_bytes += result.consumed_in;
            data = &data[result.consumed_in..];

            let unfilled = written_len - result.consumed_out;
            // Shrink the vector back down to the valid portion.
            let new_len = self.vector.len() - unfilled;
            self.vector.truncate(new_len);

            // Handle the status in the result.
            match result.status {
                Ok(LzwStatus::Ok) if data.is_empty() && !finish && unfilled > 0 => {
                    Ok(Progress::Done(LzwStatus::Ok))
                }
                Ok(LzwStatus::Ok) => Ok(Progress::Ok),
                // Everything pending has been written, more input is needed.
                Ok(LzwStatus::NoProgress) if !finish => Ok(Progress::Done(LzwStatus::Ok)),
                Ok(status) => Ok(Progress::Done(status)),
                Err(err) => Err(err),
            }
        };

        // Decode chunks of input data until we're done.
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
    /// Decode data from an async reader.
    ///
    /// A trailing partial code is kept for a following call and not reported.
    pub async fn decode(
        &mut self,
        read: impl futures::io::AsyncBufRead + core::marker::Unpin,
    ) -> AllResult {
        self.decode_part(read, false).await
    }

    /// Decode data from an async reader, requiring the stream to end on a code boundary.
    ///
    /// On an error, all data decoded before the offending code has been written.
    pub async fn decode_all(
        mut self,
        read: impl futures::io::AsyncBufRead + core::marker::Unpin,
    ) -> AllResult {
        self.decode_part(read, true).await
    }

    async fn decode_part(
        &mut self,
        mut read: impl futures::io::AsyncBufRead + core::marker::Unpin,
        finish: bool,
    ) -> AllResult {
        use futures::io::{AsyncBufReadExt, AsyncWriteExt};

        let IntoAsync { decoder, writer } = self;
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
                    decoder.finish();
                } else {
                    break Ok(());
                }
            }

            let result = decoder.decode_bytes(data, &mut outbuf[..]);
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
                        "decoder made no progress",
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

impl DecodeState {
    fn new(order: ByteOrder) -> Self {
        DecodeState {
            order,
            table: CodeTable::new(),
            buffer: Buffer::new(),
            last: None,
            partial: None,
            has_ended: false,
            is_done: false,
            error: None,
            codes: 0,
            resets: 0,
        }
    }

    fn advance(&mut self, mut inp: &[u8], mut out: &mut [u8]) -> StreamResult {
        let o_in = inp.len();
        let o_out = out.len();

        if let Some(err) = self.error {
            return StreamResult {
                consumed_in: 0,
                consumed_out: 0,
                status: Err(err),
            };
        }

        let mut status = Ok(LzwStatus::Ok);

        loop {
            // Previously decoded data goes first.
            self.buffer.drain_into(&mut out);
            if !self.buffer.is_empty() {
                break;
            }

            let code = match self.next_code(&mut inp) {
                Some(code) => code,
                None => break,
            };

            if let Err(err) = self.push_code(code) {
                status = Err(err);
                break;
            }

            // Reconstruct straight into the output when it fits.
            let depth = self.table.depth(code);
            if out.len() >= depth {
                let (target, tail) = core::mem::take(&mut out).split_at_mut(depth);
                self.table.reconstruct(code, target);
                out = tail;
            } else {
                self.buffer.fill(&self.table, code);
            }
        }

        if status.is_ok() && inp.is_empty() && self.has_ended && self.buffer.is_empty() {
            if self.partial.is_some() {
                status = Err(LzwError::CorruptedStream { trailing: 1 });
            } else {
                self.is_done = true;
                tracing::trace!(codes = self.codes, resets = self.resets, "decoder finished");
            }
        }

        let consumed_in = o_in - inp.len();
        let consumed_out = o_out - out.len();

        if let Err(err) = status {
            self.error = Some(err);
        } else if self.is_done {
            status = Ok(LzwStatus::Done);
        } else if consumed_in == 0 && consumed_out == 0 {
            status = Ok(LzwStatus::NoProgress);
        }

        StreamResult {
            consumed_in,
            consumed_out,
            status,
        }
    }

    /// Assemble the next code from the input and a carried byte.
    fn next_code(&mut self, inp: &mut &[u8]) -> Option<Code> {
        let first = match self.partial.take() {
            Some(byte) => byte,
            None => {
                let (&byte, rest) = inp.split_first()?;
                *inp = rest;
                byte
            }
        };

        match inp.split_first() {
            Some((&second, rest)) => {
                *inp = rest;
                Some(self.order.from_bytes([first, second]))
            }
            None => {
                self.partial = Some(first);
                None
            }
        }
    }

    /// Grow the table for a newly read code, after which the code is assigned.
    fn push_code(&mut self, code: Code) -> Result<(), LzwError> {
        // The previous sequence survives a reset, single bytes keep their code.
        let mut carried = None;
        if self.table.is_full() {
            if let Some(last) = self.last.filter(|&last| self.table.depth(last) > 1) {
                carried = self.table.get(last);
            }

            self.table.reset();
            self.resets += 1;
            tracing::debug!(
                codes = self.codes,
                resets = self.resets,
                "decoder dictionary reset"
            );
        }

        let size = self.table.len();
        if usize::from(code) > size {
            return Err(LzwError::InvalidCode { code, size });
        }

        // The code of the entry the encoder created right before writing it.
        let is_next = usize::from(code) == size;
        match (self.last, carried) {
            // The first code can only refer to one of the initial entries.
            (None, _) if is_next => {
                return Err(LzwError::InvalidCode { code, size });
            }
            (None, _) => {}
            (Some(_), Some(sequence)) => {
                let first = if is_next {
                    sequence[0]
                } else {
                    self.table.first_byte(code)
                };
                self.table.derive_carried(&sequence, first);
            }
            (Some(last), None) => {
                let first = if is_next {
                    self.table.first_byte(last)
                } else {
                    self.table.first_byte(code)
                };
                self.table.derive(last, first);
            }
        }

        self.last = Some(code);
        self.codes += 1;
        Ok(())
    }
}

impl Buffer {
    fn new() -> Self {
        Buffer {
            bytes: Vec::with_capacity(MAX_ENTRIES),
            read_mark: 0,
            write_mark: 0,
        }
    }

    /// Replace the content with the sequence of an assigned code.
    fn fill(&mut self, table: &CodeTable, code: Code) {
        debug_assert!(self.is_empty());
        let depth = table.depth(code);
        // Sequences extending one from before a reset can outgrow the table size.
        self.bytes.clear();
        self.bytes.resize(depth, 0);
        table.reconstruct(code, &mut self.bytes);
        self.read_mark = 0;
        self.write_mark = depth;
    }

    fn drain_into(&mut self, out: &mut &mut [u8]) {
        let remain = &self.bytes[self.read_mark..self.write_mark];
        let count = remain.len().min(out.len());
        let (target, tail) = core::mem::take(out).split_at_mut(count);
        target.copy_from_slice(&remain[..count]);
        *out = tail;
        self.read_mark += count;
    }

    fn is_empty(&self) -> bool {
        self.read_mark == self.write_mark
    }
}
