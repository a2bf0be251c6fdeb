//! Streaming hexadecimal encoding and decoding.
//!
//! The adapters buffer up to 1024 characters and run the block codec
//! over each chunk. Constant-time behavior therefore holds *per chunk*,
//! not across the entire stream: the first chunk containing malformed
//! data is the last chunk processed.

use super::{DecodeError, ErrorKind};
use zeroize::Zeroize;

/// Number of hexadecimal characters buffered by the encoder and the
/// decoder.
const BUFFER_SIZE: usize = 1024;

/// End state of the read side, surfaced once buffered output is drained.
#[derive(Copy, Clone, Debug)]
enum Pending {
    Eof,
    UnexpectedEof,
    Decode(DecodeError),
}

struct Buf {
    arr: [u8; BUFFER_SIZE],
    start: usize,
    end: usize,
}

impl Buf {
    const fn new() -> Self {
        Self {
            arr: [0; BUFFER_SIZE],
            start: 0,
            end: 0,
        }
    }

    const fn len(&self) -> usize {
        self.end - self.start
    }

    fn compact(&mut self) {
        self.arr.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }
}

impl Drop for Buf {
    fn drop(&mut self) {
        self.arr.zeroize();
    }
}

struct OutBuf {
    arr: [u8; BUFFER_SIZE],
}

impl Drop for OutBuf {
    fn drop(&mut self) {
        self.arr.zeroize();
    }
}

/// Writer adapter that encodes everything written to it as lowercase
/// hexadecimal.
pub struct Encoder<W> {
    w: W,
    out: OutBuf,
}

impl<W> Encoder<W> {
    /// Returns a writer that emits lowercase hexadecimal characters
    /// to `w`.
    pub fn new(w: W) -> Self {
        Self {
            w,
            out: OutBuf {
                arr: [0; BUFFER_SIZE],
            },
        }
    }
}

/// Reader adapter that decodes hexadecimal characters read from an
/// upstream reader.
///
/// The stream must contain an even number of hexadecimal characters.
/// If it ends with half a pair, the final read reports the trailing
/// byte as invalid when it is not a hexadecimal character, and an
/// unexpected end of stream otherwise.
pub struct Decoder<R> {
    r: R,
    pending: Option<Pending>,
    buf: Buf,
}

impl<R> Decoder<R> {
    /// Returns a reader that decodes hexadecimal characters from `r`.
    pub fn new(r: R) -> Self {
        Self {
            r,
            pending: None,
            buf: Buf::new(),
        }
    }

    fn eof_state(&self) -> Pending {
        if self.buf.len() % 2 == 1 {
            let last = self.buf.arr[self.buf.end - 1];
            if super::valid_hex_char(last) {
                Pending::UnexpectedEof
            } else {
                Pending::Decode(DecodeError::new(0, ErrorKind::InvalidByte(last)))
            }
        } else {
            Pending::Eof
        }
    }

    /// Decodes as many buffered pairs as fit in `p`, recording a decode
    /// failure for later. On failure the undecoded remainder of the
    /// buffer is discarded.
    fn drain_into(&mut self, p: &mut [u8]) -> usize {
        let want = p.len().min(self.buf.len() / 2);
        let src = &self.buf.arr[self.buf.start..self.buf.start + want * 2];
        match super::decode(&mut p[..want], src) {
            Ok(nd) => {
                self.buf.start += 2 * nd;
                nd
            }
            Err(e) => {
                self.buf.start = self.buf.end;
                self.pending = Some(Pending::Decode(e));
                e.written()
            }
        }
    }
}

std! {
    use std::io;

    impl<W: io::Write> io::Write for Encoder<W> {
        /// Encodes `p` and writes it downstream, returning the number of
        /// source bytes consumed.
        ///
        /// The count is derived from the downstream write as
        /// `written / 2`, so a short write downstream can undercount by
        /// one source byte.
        fn write(&mut self, p: &[u8]) -> io::Result<usize> {
            let mut n = 0;
            let mut p = p;
            while !p.is_empty() {
                let chunk = p.len().min(BUFFER_SIZE / 2);
                let encoded = super::encode(&mut self.out.arr, &p[..chunk]);
                let written = self.w.write(&self.out.arr[..encoded])?;
                n += written / 2;
                if written < encoded {
                    return Ok(n);
                }
                p = &p[chunk..];
            }
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.w.flush()
        }
    }

    impl<R: io::Read> io::Read for Decoder<R> {
        fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
            // top up the buffer until a full pair (or the end of the
            // stream) is available
            if self.buf.len() < 2 && self.pending.is_none() {
                self.buf.compact();
                while self.buf.end < 2 {
                    match self.r.read(&mut self.buf.arr[self.buf.end..])? {
                        0 => {
                            self.pending = Some(self.eof_state());
                            break;
                        }
                        nr => self.buf.end += nr,
                    }
                }
            }

            let n = self.drain_into(p);

            // only expose errors once the buffer is fully consumed
            if self.buf.len() < 2 && n == 0 {
                return match self.pending {
                    None | Some(Pending::Eof) => Ok(0),
                    Some(Pending::UnexpectedEof) => Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "hex: stream ended with half a character pair",
                    )),
                    Some(Pending::Decode(e)) => {
                        Err(io::Error::new(io::ErrorKind::InvalidData, e))
                    }
                };
            }
            Ok(n)
        }
    }
}

no_std_io! {
    use embedded_io::{self as eio, ErrorType};

    /// Error of the no_std stream adapters.
    #[derive(Debug)]
    pub enum StreamError<E> {
        /// Error from the wrapped reader or writer.
        Io(E),
        /// Malformed hexadecimal input.
        Decode(DecodeError),
        /// The stream ended with half a character pair.
        UnexpectedEof,
    }

    impl<E: eio::Error> eio::Error for StreamError<E> {
        fn kind(&self) -> eio::ErrorKind {
            match self {
                Self::Io(e) => e.kind(),
                Self::Decode(_) | Self::UnexpectedEof => eio::ErrorKind::InvalidData,
            }
        }
    }

    impl<W: ErrorType> ErrorType for Encoder<W> {
        type Error = StreamError<W::Error>;
    }

    impl<W: eio::Write> eio::Write for Encoder<W> {
        fn write(&mut self, p: &[u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            let mut p = p;
            while !p.is_empty() {
                let chunk = p.len().min(BUFFER_SIZE / 2);
                let encoded = super::encode(&mut self.out.arr, &p[..chunk]);
                let written = self
                    .w
                    .write(&self.out.arr[..encoded])
                    .map_err(StreamError::Io)?;
                n += written / 2;
                if written < encoded {
                    return Ok(n);
                }
                p = &p[chunk..];
            }
            Ok(n)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.w.flush().map_err(StreamError::Io)
        }
    }

    impl<R: ErrorType> ErrorType for Decoder<R> {
        type Error = StreamError<R::Error>;
    }

    impl<R: eio::Read> eio::Read for Decoder<R> {
        fn read(&mut self, p: &mut [u8]) -> Result<usize, Self::Error> {
            if self.buf.len() < 2 && self.pending.is_none() {
                self.buf.compact();
                while self.buf.end < 2 {
                    match self
                        .r
                        .read(&mut self.buf.arr[self.buf.end..])
                        .map_err(StreamError::Io)?
                    {
                        0 => {
                            self.pending = Some(self.eof_state());
                            break;
                        }
                        nr => self.buf.end += nr,
                    }
                }
            }

            let n = self.drain_into(p);
            if self.buf.len() < 2 && n == 0 {
                return match self.pending {
                    None | Some(Pending::Eof) => Ok(0),
                    Some(Pending::UnexpectedEof) => Err(StreamError::UnexpectedEof),
                    Some(Pending::Decode(e)) => Err(StreamError::Decode(e)),
                };
            }
            Ok(n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read as _, Write as _};
    use std::vec::Vec;

    /// Reader that feeds out one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl std::io::Read for Trickle<'_> {
        fn read(&mut self, p: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() || p.is_empty() {
                return Ok(0);
            }
            p[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn encoder_matches_block_encode() {
        let mut sink = Vec::new();
        let mut enc = Encoder::new(&mut sink);
        enc.write_all(b"hello ").unwrap();
        enc.write_all(b"world").unwrap();
        enc.flush().unwrap();
        assert_eq!(sink, b"68656c6c6f20776f726c64");
    }

    #[test]
    fn encoder_large_input_chunks() {
        let src: Vec<u8> = (0..4096u32).map(|i| i as u8).collect();
        let mut sink = Vec::new();
        Encoder::new(&mut sink).write_all(&src).unwrap();
        assert_eq!(sink, super::super::encode_to_string(&src).into_bytes());
    }

    #[test]
    fn decoder_round_trip() {
        let mut dec = Decoder::new(Cursor::new(b"68656c6c6f20776f726c64"));
        let mut out = Vec::new();
        dec.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn decoder_survives_trickle_reads() {
        let mut dec = Decoder::new(Trickle(b"0001feff"));
        let mut out = Vec::new();
        dec.read_to_end(&mut out).unwrap();
        assert_eq!(out, [0x00, 0x01, 0xfe, 0xff]);
    }

    #[test]
    fn decoder_small_destination() {
        let mut dec = Decoder::new(Cursor::new(b"deadbeef"));
        let mut one = [0u8; 1];
        for want in [0xdeu8, 0xad, 0xbe, 0xef] {
            dec.read_exact(&mut one).unwrap();
            assert_eq!(one[0], want);
        }
        assert_eq!(dec.read(&mut one).unwrap(), 0);
    }

    #[test]
    fn decoder_invalid_byte_mid_stream() {
        let mut dec = Decoder::new(Cursor::new(b"00z1"));
        let mut out = Vec::new();
        let err = dec.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn decoder_odd_valid_terminator_is_unexpected_eof() {
        let mut dec = Decoder::new(Cursor::new(b"00f"));
        let mut out = Vec::new();
        let err = dec.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        // the complete leading pair still decoded
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn decoder_odd_invalid_terminator_is_invalid_data() {
        let mut dec = Decoder::new(Cursor::new(b"00!"));
        let mut out = Vec::new();
        let err = dec.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn decoder_empty_stream() {
        let mut dec = Decoder::new(Cursor::new(b""));
        let mut out = Vec::new();
        assert_eq!(dec.read_to_end(&mut out).unwrap(), 0);
    }
}
