//! Streaming Base64 encoding and decoding.
//!
//! The adapters run the block codec over buffered chunks, so
//! constant-time behavior holds per chunk rather than across the whole
//! stream: the first chunk containing malformed data is the last chunk
//! processed.

use super::{Corrupt, Encoding};
use crate::ct;
use zeroize::Zeroize;

/// Input buffer size of the decoder, in encoded characters.
const BUFFER_SIZE: usize = 1024;
/// Source bytes encoded per interior chunk; fills the output buffer
/// exactly.
const CHUNK: usize = BUFFER_SIZE / 4 * 3;

struct EncBuf {
    group: [u8; 3],
    ngroup: usize,
    out: [u8; BUFFER_SIZE],
}

impl Drop for EncBuf {
    fn drop(&mut self) {
        self.group.zeroize();
        self.out.zeroize();
    }
}

/// Writer adapter that Base64-encodes everything written to it.
///
/// Base64 operates in three byte groups, so the encoder buffers up to
/// two trailing source bytes between writes. When done, call
/// [`finish`](Self::finish) to flush the final partial group; dropping
/// the encoder without finishing it loses those bytes.
pub struct Encoder<W> {
    enc: Encoding,
    w: W,
    buf: EncBuf,
}

impl<W> Encoder<W> {
    /// Returns a writer that encodes with `enc` and writes to `w`.
    pub fn new(enc: Encoding, w: W) -> Self {
        Self {
            enc,
            w,
            buf: EncBuf {
                group: [0; 3],
                ngroup: 0,
                out: [0; BUFFER_SIZE],
            },
        }
    }
}

/// End state of the decoder, surfaced once buffered output is drained.
#[derive(Copy, Clone, Debug)]
enum Pending {
    Eof,
    UnexpectedEof,
    Corrupt(Corrupt),
}

struct DecBuf {
    buf: [u8; BUFFER_SIZE],
    nbuf: usize,
    out: [u8; CHUNK],
    ostart: usize,
    oend: usize,
}

impl Drop for DecBuf {
    fn drop(&mut self) {
        self.buf.zeroize();
        self.out.zeroize();
    }
}

/// Reader adapter that Base64-decodes everything read from an upstream
/// reader.
///
/// The upstream data must not contain newlines; wrap the reader in a
/// [`NewlineFilter`] first if it might. Unpadded encodings may end in a
/// partial group, which is decoded when the stream ends.
pub struct Decoder<R> {
    enc: Encoding,
    r: R,
    eof: bool,
    pending: Option<Pending>,
    buf: DecBuf,
}

impl<R> Decoder<R> {
    /// Returns a reader that decodes data from `r` with `enc`.
    pub fn new(enc: Encoding, r: R) -> Self {
        Self {
            enc,
            r,
            eof: false,
            pending: None,
            buf: DecBuf {
                buf: [0; BUFFER_SIZE],
                nbuf: 0,
                out: [0; CHUNK],
                ostart: 0,
                oend: 0,
            },
        }
    }

    /// Copies buffered decoded output into `p`.
    fn serve(&mut self, p: &mut [u8]) -> usize {
        let avail = self.buf.oend - self.buf.ostart;
        let n = p.len().min(avail);
        p[..n].copy_from_slice(&self.buf.out[self.buf.ostart..self.buf.ostart + n]);
        self.buf.ostart += n;
        n
    }

    /// Handles the end of the stream: decodes an unpadded tail if there
    /// is one, records the end state, and returns any bytes served.
    fn eof_step(&mut self, p: &mut [u8]) -> usize {
        if self.enc.pad.is_none() && self.buf.nbuf > 0 {
            let nbuf = self.buf.nbuf;
            self.buf.nbuf = 0;
            self.buf.ostart = 0;
            match self.enc.decode(&mut self.buf.out, &self.buf.buf[..nbuf]) {
                Ok(nw) => {
                    self.buf.oend = nw;
                    self.pending = Some(Pending::Eof);
                }
                Err(e) => {
                    self.buf.oend = e.written();
                    self.pending = Some(Pending::Corrupt(e));
                }
            }
            return self.serve(p);
        }
        self.pending = Some(if self.buf.nbuf > 0 {
            Pending::UnexpectedEof
        } else {
            Pending::Eof
        });
        0
    }

    /// Decodes the buffered whole groups, directly into `p` when it is
    /// large enough and through the output buffer otherwise. Returns the
    /// bytes placed in `p`.
    fn drain(&mut self, p: &mut [u8]) -> usize {
        let nr = self.buf.nbuf / 4 * 4;
        let nw = nr / 4 * 3;

        let n = if nw > p.len() {
            self.buf.ostart = 0;
            match self.enc.decode(&mut self.buf.out, &self.buf.buf[..nr]) {
                Ok(got) => self.buf.oend = got,
                Err(e) => {
                    self.buf.oend = e.written();
                    self.pending = Some(Pending::Corrupt(e));
                }
            }
            self.serve(p)
        } else {
            match self.enc.decode(p, &self.buf.buf[..nr]) {
                Ok(got) => got,
                Err(e) => {
                    self.pending = Some(Pending::Corrupt(e));
                    e.written()
                }
            }
        };

        self.buf.nbuf -= nr;
        self.buf.buf.copy_within(nr..nr + self.buf.nbuf, 0);
        n
    }
}

/// Reader adapter that removes the newline characters `'\r'` and `'\n'`
/// from an upstream reader.
///
/// The compaction is branchless: every byte is copied, and the write
/// cursor simply does not advance over newlines.
pub struct NewlineFilter<R> {
    r: R,
}

impl<R> NewlineFilter<R> {
    /// Returns a reader that yields the bytes of `r` with CR and LF
    /// removed.
    pub fn new(r: R) -> Self {
        Self { r }
    }

    fn compact(p: &mut [u8]) -> usize {
        let mut offset = 0;
        for i in 0..p.len() {
            let b = p[i];
            p[offset] = b;
            let nl = ct::byte_eq(b, b'\r') | ct::byte_eq(b, b'\n');
            offset += nl ^ 1;
        }
        offset
    }
}

std! {
    use std::io;

    impl<W: io::Write> Encoder<W> {
        /// Flushes any buffered partial group, emitting padding if the
        /// encoding is padded, and returns the underlying writer.
        pub fn finish(self) -> io::Result<W> {
            let Self { enc, mut w, mut buf } = self;
            if buf.ngroup > 0 {
                let n = enc.encode(&mut buf.out, &buf.group[..buf.ngroup]);
                w.write_all(&buf.out[..n])?;
                buf.ngroup = 0;
            }
            Ok(w)
        }
    }

    impl<W: io::Write> io::Write for Encoder<W> {
        fn write(&mut self, p: &[u8]) -> io::Result<usize> {
            let mut p = p;
            let mut n = 0;

            // top up a partial group left over from the previous write
            if self.buf.ngroup > 0 {
                let take = p.len().min(3 - self.buf.ngroup);
                self.buf.group[self.buf.ngroup..self.buf.ngroup + take]
                    .copy_from_slice(&p[..take]);
                self.buf.ngroup += take;
                n += take;
                p = &p[take..];
                if self.buf.ngroup < 3 {
                    return Ok(n);
                }
                let m = self.enc.encode(&mut self.buf.out, &self.buf.group);
                self.w.write_all(&self.buf.out[..m])?;
                self.buf.ngroup = 0;
            }

            // interior whole groups
            while p.len() >= 3 {
                let mut nn = CHUNK;
                if nn > p.len() {
                    nn = p.len() - p.len() % 3;
                }
                let m = self.enc.encode(&mut self.buf.out, &p[..nn]);
                self.w.write_all(&self.buf.out[..m])?;
                n += nn;
                p = &p[nn..];
            }

            // stash the trailing fringe
            self.buf.group[..p.len()].copy_from_slice(p);
            self.buf.ngroup = p.len();
            n += p.len();
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.w.flush()
        }
    }

    fn surface(pending: Option<Pending>) -> io::Result<usize> {
        match pending {
            None | Some(Pending::Eof) => Ok(0),
            Some(Pending::UnexpectedEof) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "base64: stream ended mid group",
            )),
            Some(Pending::Corrupt(e)) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }

    impl<R: io::Read> io::Read for Decoder<R> {
        fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
            // leftover decoded output from the previous call
            if self.buf.ostart < self.buf.oend {
                return Ok(self.serve(p));
            }
            if self.pending.is_some() {
                return surface(self.pending);
            }

            // refill until a whole group (or the end) is buffered
            while self.buf.nbuf < 4 && !self.eof {
                let cap = (p.len() / 3 * 4).clamp(4, BUFFER_SIZE);
                match self.r.read(&mut self.buf.buf[self.buf.nbuf..cap])? {
                    0 => self.eof = true,
                    nr => self.buf.nbuf += nr,
                }
            }

            let n = if self.buf.nbuf < 4 {
                self.eof_step(p)
            } else {
                self.drain(p)
            };
            if n > 0 {
                return Ok(n);
            }
            surface(self.pending)
        }
    }

    impl<R: io::Read> io::Read for NewlineFilter<R> {
        fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
            let mut n = self.r.read(p)?;
            while n > 0 {
                let offset = Self::compact(&mut p[..n]);
                if offset > 0 {
                    return Ok(offset);
                }
                // previous chunk was entirely newlines, read again
                n = self.r.read(p)?;
            }
            Ok(0)
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
        /// Malformed Base64 input.
        Corrupt(Corrupt),
        /// The stream ended in the middle of a group.
        UnexpectedEof,
    }

    impl<E: eio::Error> eio::Error for StreamError<E> {
        fn kind(&self) -> eio::ErrorKind {
            match self {
                Self::Io(e) => e.kind(),
                Self::Corrupt(_) | Self::UnexpectedEof => eio::ErrorKind::InvalidData,
            }
        }
    }

    impl<W: ErrorType> ErrorType for Encoder<W> {
        type Error = StreamError<W::Error>;
    }

    impl<W: eio::Write> Encoder<W> {
        /// Flushes any buffered partial group, emitting padding if the
        /// encoding is padded, and returns the underlying writer.
        pub fn finish(self) -> Result<W, StreamError<W::Error>> {
            let Self { enc, mut w, mut buf } = self;
            if buf.ngroup > 0 {
                let n = enc.encode(&mut buf.out, &buf.group[..buf.ngroup]);
                w.write_all(&buf.out[..n]).map_err(StreamError::Io)?;
                buf.ngroup = 0;
            }
            Ok(w)
        }
    }

    impl<W: eio::Write> eio::Write for Encoder<W> {
        fn write(&mut self, p: &[u8]) -> Result<usize, Self::Error> {
            let mut p = p;
            let mut n = 0;

            if self.buf.ngroup > 0 {
                let take = p.len().min(3 - self.buf.ngroup);
                self.buf.group[self.buf.ngroup..self.buf.ngroup + take]
                    .copy_from_slice(&p[..take]);
                self.buf.ngroup += take;
                n += take;
                p = &p[take..];
                if self.buf.ngroup < 3 {
                    return Ok(n);
                }
                let m = self.enc.encode(&mut self.buf.out, &self.buf.group);
                self.w
                    .write_all(&self.buf.out[..m])
                    .map_err(StreamError::Io)?;
                self.buf.ngroup = 0;
            }

            while p.len() >= 3 {
                let mut nn = CHUNK;
                if nn > p.len() {
                    nn = p.len() - p.len() % 3;
                }
                let m = self.enc.encode(&mut self.buf.out, &p[..nn]);
                self.w
                    .write_all(&self.buf.out[..m])
                    .map_err(StreamError::Io)?;
                n += nn;
                p = &p[nn..];
            }

            self.buf.group[..p.len()].copy_from_slice(p);
            self.buf.ngroup = p.len();
            n += p.len();
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
            if self.buf.ostart < self.buf.oend {
                return Ok(self.serve(p));
            }
            match self.pending {
                None => {}
                Some(Pending::Eof) => return Ok(0),
                Some(Pending::UnexpectedEof) => return Err(StreamError::UnexpectedEof),
                Some(Pending::Corrupt(e)) => return Err(StreamError::Corrupt(e)),
            }

            while self.buf.nbuf < 4 && !self.eof {
                let cap = (p.len() / 3 * 4).clamp(4, BUFFER_SIZE);
                match self
                    .r
                    .read(&mut self.buf.buf[self.buf.nbuf..cap])
                    .map_err(StreamError::Io)?
                {
                    0 => self.eof = true,
                    nr => self.buf.nbuf += nr,
                }
            }

            let n = if self.buf.nbuf < 4 {
                self.eof_step(p)
            } else {
                self.drain(p)
            };
            if n > 0 {
                return Ok(n);
            }
            match self.pending {
                None | Some(Pending::Eof) => Ok(0),
                Some(Pending::UnexpectedEof) => Err(StreamError::UnexpectedEof),
                Some(Pending::Corrupt(e)) => Err(StreamError::Corrupt(e)),
            }
        }
    }

    impl<R: ErrorType> ErrorType for NewlineFilter<R> {
        type Error = R::Error;
    }

    impl<R: eio::Read> eio::Read for NewlineFilter<R> {
        fn read(&mut self, p: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = self.r.read(p)?;
            while n > 0 {
                let offset = Self::compact(&mut p[..n]);
                if offset > 0 {
                    return Ok(offset);
                }
                n = self.r.read(p)?;
            }
            Ok(0)
        }
    }
}
