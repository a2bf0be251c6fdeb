//! Constant-Time Base64 Encoding and Decoding
//!
//! Implements the two RFC 4648 alphabets, padded and unpadded, without
//! data-dependent branches or table lookups. The alphabet mappings are
//! computed with masked arithmetic, and the bulk paths transform 6
//! source bytes into 8 characters per step inside a single integer
//! register.
//!
//! # Differences from typical Base64 decoders
//!
//! The newline characters `'\r'` and `'\n'` are rejected; wrap a reader
//! in [`io::NewlineFilter`] to strip them beforehand.
//!
//! Decoding never returns partially decoded data. Given `"aGVsb?8="`, a
//! typical decoder stops at the `'?'` and reports the three bytes before
//! it; [`Encoding::decode`] scans the whole input, writes five bytes,
//! and reports the failure only at the end. Anything written to the
//! destination must be discarded on error.

mod lookup;

#[cfg(any(feature = "std", feature = "embedded-io"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "std", feature = "embedded-io"))))]
pub mod io;

use crate::ct;
use core::fmt;
use lookup::Alphabet;

/// Error returned when Base64 input is malformed.
///
/// Deliberately carries no position: reporting where decoding failed
/// would leak through the error what a constant-time scan worked to
/// hide.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Corrupt {
    written: usize,
}

impl Corrupt {
    /// The number of destination bytes written before the failure was
    /// reported. The destination must be treated as compromised.
    pub const fn written(&self) -> usize {
        self.written
    }
}

impl fmt::Display for Corrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("base64: input is corrupt")
    }
}

std! { impl std::error::Error for Corrupt {} }

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    Std,
    Url,
}

/// A Base64 encoding scheme.
///
/// An `Encoding` is an immutable value; [`with_padding`] and [`strict`]
/// return modified copies. Four canonical encodings cover RFC 4648:
/// [`STANDARD`], [`STANDARD_NO_PAD`], [`URL_SAFE`] and
/// [`URL_SAFE_NO_PAD`].
///
/// [`with_padding`]: Self::with_padding
/// [`strict`]: Self::strict
#[derive(Copy, Clone)]
pub struct Encoding {
    kind: Kind,
    pad: Option<u8>,
    strict: bool,
}

/// The standard Base64 alphabet (`A-Za-z0-9+/`), padded with `'='`.
pub const STANDARD: Encoding = Encoding {
    kind: Kind::Std,
    pad: Some(b'='),
    strict: false,
};

/// The standard Base64 alphabet without padding.
pub const STANDARD_NO_PAD: Encoding = Encoding {
    kind: Kind::Std,
    pad: None,
    strict: false,
};

/// The URL-safe Base64 alphabet (`A-Za-z0-9-_`), padded with `'='`.
pub const URL_SAFE: Encoding = Encoding {
    kind: Kind::Url,
    pad: Some(b'='),
    strict: false,
};

/// The URL-safe Base64 alphabet without padding.
pub const URL_SAFE_NO_PAD: Encoding = Encoding {
    kind: Kind::Url,
    pad: None,
    strict: false,
};

impl Encoding {
    // The alphabet selection is public configuration, so the branch is
    // harmless.
    const fn alphabet(&self) -> &'static Alphabet {
        match self.kind {
            Kind::Std => &lookup::STD,
            Kind::Url => &lookup::URL,
        }
    }

    /// Returns an identical encoding that decodes in strict mode, where
    /// the padding bits trailing a partial final group must be zero
    /// (RFC 4648 section 3.5).
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Returns an identical encoding that uses the specified padding
    /// character.
    ///
    /// # Panics
    ///
    /// If `pad` is `'\r'`, `'\n'`, not ASCII, or a character of either
    /// Base64 alphabet. A pad drawn from the *other* alphabet would
    /// still be unambiguous, but accepting it invites trouble the first
    /// time two encodings meet, so both are ruled out.
    #[must_use]
    pub const fn with_padding(mut self, pad: char) -> Self {
        let p = pad as u32;
        assert!(
            p != '\r' as u32 && p != '\n' as u32 && p < 0x80,
            "base64: invalid padding"
        );
        assert!(
            lookup::rev_lookup(&lookup::STD, p) == 0xff
                && lookup::rev_lookup(&lookup::URL, p) == 0xff,
            "base64: padding contained in alphabet"
        );
        self.pad = Some(p as u8);
        self
    }

    /// Returns the size in bytes of the Base64 encoding of `n` source
    /// bytes.
    #[must_use]
    pub const fn encoded_len(&self, n: usize) -> usize {
        match self.pad {
            None => (n * 8 + 5) / 6,
            Some(_) => (n + 2) / 3 * 4,
        }
    }

    /// Returns the maximum size in bytes of the decoding of `n` bytes of
    /// Base64 data.
    #[must_use]
    pub const fn decoded_len(&self, n: usize) -> usize {
        match self.pad {
            None => n * 6 / 8,
            Some(_) => n / 4 * 3,
        }
    }

    /// Encodes `src` into `dst`, returning the number of bytes written.
    /// That number is always [`encoded_len(src.len())`](Self::encoded_len).
    ///
    /// Encode runs in constant time for the length of `src`.
    ///
    /// # Panics
    ///
    /// If `dst` is shorter than `encoded_len(src.len())`.
    ///
    /// # Example
    ///
    /// ```
    /// use subtle_codecs::base64::STANDARD;
    ///
    /// let mut dst = [0u8; 8];
    /// let n = STANDARD.encode(&mut dst, b"hello");
    /// assert_eq!(&dst[..n], b"aGVsbG8=");
    /// ```
    pub fn encode(&self, dst: &mut [u8], src: &[u8]) -> usize {
        let n = self.encoded_len(src.len());
        assert!(dst.len() >= n, "base64: destination too short");
        encode_parts(self.alphabet(), self.pad, &mut dst[..n], src);
        n
    }

    /// Decodes `src` into `dst`, returning the number of bytes written.
    ///
    /// Decode runs in constant time for the length of `src`: the whole
    /// input is scanned even when it contains bytes outside the
    /// alphabet, and the returned [`Corrupt`] carries the count of
    /// destination bytes written along the way. The destination must be
    /// discarded on error.
    ///
    /// `dst` must be large enough for the decoded output;
    /// [`decoded_len(src.len())`](Self::decoded_len) is always
    /// sufficient.
    ///
    /// # Example
    ///
    /// ```
    /// use subtle_codecs::base64::STANDARD;
    ///
    /// let mut dst = [0u8; 6];
    /// let n = STANDARD.decode(&mut dst, b"aGVsbG8=").unwrap();
    /// assert_eq!(&dst[..n], b"hello");
    /// ```
    pub fn decode(&self, dst: &mut [u8], src: &[u8]) -> Result<usize, Corrupt> {
        decode_parts(self.alphabet(), self.pad, self.strict, dst, src)
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoding")
            .field("alphabet", &self.kind)
            .field("pad", &self.pad.map(char::from))
            .field("strict", &self.strict)
            .finish()
    }
}

alloc! {
    impl Encoding {
        /// Returns the Base64 encoding of `src`.
        ///
        /// Runs in constant time for the length of `src`.
        pub fn encode_to_string(&self, src: &[u8]) -> alloc::string::String {
            let mut dst = alloc::vec![0u8; self.encoded_len(src.len())];
            self.encode(dst.as_mut_slice(), src);
            // SAFETY: every byte written is either an alphabet character
            // or the pad, and with_padding only admits ASCII pads.
            unsafe { alloc::string::String::from_utf8_unchecked(dst) }
        }

        /// Returns the bytes represented by the Base64 input `src`.
        ///
        /// Runs in constant time for the length of `src`. On error the
        /// partially decoded output is discarded.
        pub fn decode_string(
            &self,
            src: impl AsRef<[u8]>,
        ) -> Result<alloc::vec::Vec<u8>, Corrupt> {
            let src = src.as_ref();
            let mut dst = alloc::vec![0u8; self.decoded_len(src.len())];
            let n = self.decode(dst.as_mut_slice(), src)?;
            dst.truncate(n);
            Ok(dst)
        }
    }
}

#[inline(always)]
fn load_be64(b: &[u8]) -> u64 {
    let mut w = [0u8; 8];
    w.copy_from_slice(&b[..8]);
    u64::from_be_bytes(w)
}

fn encode_parts(a: &Alphabet, pad: Option<u8>, dst: &mut [u8], src: &[u8]) {
    if src.is_empty() {
        return;
    }

    let mut i = 0;
    let mut j = 0;

    // 6 -> 8 while at least 8 source bytes remain: the 64-bit load reads
    // two bytes past the six it consumes.
    while src.len() - i >= 8 && dst.len() - j >= 8 {
        let u = load_be64(&src[i..]);
        dst[j..j + 8].copy_from_slice(&lookup::lookup_swar6(a, u).to_le_bytes());
        i += 6;
        j += 8;
    }

    // 3 -> 4 on exact loads.
    while src.len() - i >= 3 {
        let v = u32::from(src[i]) << 16 | u32::from(src[i + 1]) << 8 | u32::from(src[i + 2]);
        dst[j..j + 4].copy_from_slice(&lookup::lookup_swar3(a, v << 8).to_le_bytes());
        i += 3;
        j += 4;
    }

    match src.len() - i {
        2 => {
            let v = u32::from(src[i]) << 16 | u32::from(src[i + 1]) << 8;
            dst[j] = lookup::lookup(a, v >> 18 & 0x3f);
            dst[j + 1] = lookup::lookup(a, v >> 12 & 0x3f);
            dst[j + 2] = lookup::lookup(a, v >> 6 & 0x3f);
            if let Some(p) = pad {
                dst[j + 3] = p;
            }
        }
        1 => {
            let v = u32::from(src[i]) << 16;
            dst[j] = lookup::lookup(a, v >> 18 & 0x3f);
            dst[j + 1] = lookup::lookup(a, v >> 12 & 0x3f);
            if let Some(p) = pad {
                dst[j + 2] = p;
                dst[j + 3] = p;
            }
        }
        _ => {}
    }
}

fn decode_parts(
    a: &Alphabet,
    pad: Option<u8>,
    strict: bool,
    dst: &mut [u8],
    src: &[u8],
) -> Result<usize, Corrupt> {
    if src.is_empty() {
        return Ok(0);
    }
    match src.len() % 4 {
        0 => {}
        // unpadded data may end in a 2 or 3 character partial group
        2 | 3 if pad.is_none() => {}
        _ => return Err(Corrupt { written: 0 }),
    }

    let mut len = src.len();
    if let Some(p) = pad {
        // strip 0, 1 or 2 trailing pad characters without branching on
        // their presence
        let t = ct::byte_eq(src[len - 1], p) + ct::byte_eq(src[len - 2], p);
        len -= t;
    }
    let src = &src[..len];

    let mut failed = 0u8;
    let mut i = 0;
    let mut n = 0;

    // 8 -> 6: pack eight sextets into the top of a 64-bit word and store
    // its six significant bytes (the store covers eight).
    while src.len() - i >= 8 && dst.len() - n >= 8 {
        let c0 = lookup::rev_lookup(a, u32::from(src[i]));
        let c1 = lookup::rev_lookup(a, u32::from(src[i + 1]));
        let c2 = lookup::rev_lookup(a, u32::from(src[i + 2]));
        let c3 = lookup::rev_lookup(a, u32::from(src[i + 3]));
        let c4 = lookup::rev_lookup(a, u32::from(src[i + 4]));
        let c5 = lookup::rev_lookup(a, u32::from(src[i + 5]));
        let c6 = lookup::rev_lookup(a, u32::from(src[i + 6]));
        let c7 = lookup::rev_lookup(a, u32::from(src[i + 7]));

        let c = u64::from(c0) << 58
            | u64::from(c1) << 52
            | u64::from(c2) << 46
            | u64::from(c3) << 40
            | u64::from(c4) << 34
            | u64::from(c5) << 28
            | u64::from(c6) << 22
            | u64::from(c7) << 16;
        dst[n..n + 8].copy_from_slice(&c.to_be_bytes());

        failed |= c0 | c1 | c2 | c3 | c4 | c5 | c6 | c7;
        i += 8;
        n += 6;
    }

    // 4 -> 3 with a full 32-bit store.
    while src.len() - i >= 4 && dst.len() - n >= 4 {
        let c0 = lookup::rev_lookup(a, u32::from(src[i]));
        let c1 = lookup::rev_lookup(a, u32::from(src[i + 1]));
        let c2 = lookup::rev_lookup(a, u32::from(src[i + 2]));
        let c3 = lookup::rev_lookup(a, u32::from(src[i + 3]));

        let c = u32::from(c0) << 26 | u32::from(c1) << 20 | u32::from(c2) << 14 | u32::from(c3) << 8;
        dst[n..n + 4].copy_from_slice(&c.to_be_bytes());

        failed |= c0 | c1 | c2 | c3;
        i += 4;
        n += 3;
    }

    // 4 -> 3 when the destination is too tight for the wide store.
    while src.len() - i >= 4 {
        let c0 = lookup::rev_lookup(a, u32::from(src[i]));
        let c1 = lookup::rev_lookup(a, u32::from(src[i + 1]));
        let c2 = lookup::rev_lookup(a, u32::from(src[i + 2]));
        let c3 = lookup::rev_lookup(a, u32::from(src[i + 3]));

        dst[n] = c0 << 2 | c1 >> 4;
        dst[n + 1] = c1 << 4 | c2 >> 2;
        dst[n + 2] = c2 << 6 | c3;

        failed |= c0 | c1 | c2 | c3;
        i += 4;
        n += 3;
    }

    match src.len() - i {
        3 => {
            let c0 = lookup::rev_lookup(a, u32::from(src[i]));
            let c1 = lookup::rev_lookup(a, u32::from(src[i + 1]));
            let c2 = lookup::rev_lookup(a, u32::from(src[i + 2]));

            dst[n] = c0 << 2 | c1 >> 4;
            dst[n + 1] = c1 << 4 | c2 >> 2;

            failed |= c0 | c1 | c2;
            if strict {
                // fail if any bit in [1:0] of the last sextet is set
                failed |= (0u32.wrapping_sub(u32::from(c2 & 0x3)) >> 8) as u8;
            }
            n += 2;
        }
        2 => {
            let c0 = lookup::rev_lookup(a, u32::from(src[i]));
            let c1 = lookup::rev_lookup(a, u32::from(src[i + 1]));

            dst[n] = c0 << 2 | c1 >> 4;

            failed |= c0 | c1;
            if strict {
                // fail if any bit in [3:0] of the last sextet is set
                failed |= (0u32.wrapping_sub(u32::from(c1 & 0xf)) >> 8) as u8;
            }
            n += 1;
        }
        0 => {}
        _ => failed |= 0xff,
    }

    if failed == 0xff {
        return Err(Corrupt { written: n });
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_canonical() {
        let mut dst = [0u8; 16];
        let n = STANDARD.encode(&mut dst, b"hello");
        assert_eq!(&dst[..n], b"aGVsbG8=");

        let n = STANDARD_NO_PAD.encode(&mut dst, b"hello");
        assert_eq!(&dst[..n], b"aGVsbG8");

        let n = URL_SAFE.encode(&mut dst, &[0xff, 0xff]);
        assert_eq!(&dst[..n], b"__8=");

        let n = URL_SAFE_NO_PAD.encode(&mut dst, &[0xff, 0xff]);
        assert_eq!(&dst[..n], b"__8");
    }

    #[test]
    fn decode_canonical() {
        let mut dst = [0u8; 8];
        let n = STANDARD.decode(&mut dst, b"aGVsbG8=").unwrap();
        assert_eq!(&dst[..n], b"hello");

        let n = STANDARD_NO_PAD.decode(&mut dst, b"aGVsbG8").unwrap();
        assert_eq!(&dst[..n], b"hello");

        let n = URL_SAFE.decode(&mut dst, b"__8=").unwrap();
        assert_eq!(&dst[..n], [0xff, 0xff]);
    }

    #[test]
    fn decode_counts_writes_on_error() {
        // the invalid '?' does not stop the scan; five bytes have been
        // written by the time the error is reported
        let mut dst = [0u8; 8];
        let err = STANDARD.decode(&mut dst, b"aGVsb?8=").unwrap_err();
        assert_eq!(err.written(), 5);
    }

    #[test]
    fn decode_rejects_newlines() {
        let mut dst = [0u8; 8];
        assert!(STANDARD.decode(&mut dst, b"aG\r\n").is_err());
        assert!(STANDARD_NO_PAD.decode(&mut dst, b"aG\n").is_err());
    }

    #[test]
    fn length_gate() {
        let mut dst = [0u8; 8];
        // length 7 is a valid unpadded tail but not a padded one
        assert_eq!(
            STANDARD.decode(&mut dst, b"aGVsbG8"),
            Err(Corrupt { written: 0 })
        );
        assert_eq!(
            STANDARD.decode(&mut dst, b"aGVsbG9"),
            Err(Corrupt { written: 0 })
        );
        // length % 4 == 1 is never valid
        assert_eq!(
            STANDARD_NO_PAD.decode(&mut dst, b"aGVsb"),
            Err(Corrupt { written: 0 })
        );
    }

    #[test]
    fn decode_tight_destination() {
        // "aGVsbG8=" decodes to 5 bytes; decoded_len reports 6
        let mut dst = [0u8; 5];
        let n = STANDARD.decode(&mut dst, b"aGVsbG8=").unwrap();
        assert_eq!(&dst[..n], b"hello");
    }

    #[test]
    fn strict_trailing_bits() {
        let mut dst = [0u8; 4];

        // 'Q' is sextet 16: low four bits clear, so "AQ" is canonical
        let n = STANDARD_NO_PAD.strict().decode(&mut dst, b"AQ").unwrap();
        assert_eq!((n, dst[0]), (1, 0x01));

        // 'B' is sextet 1: low bits set, rejected in strict mode only
        assert!(STANDARD_NO_PAD.strict().decode(&mut dst, b"AB").is_err());
        assert!(STANDARD_NO_PAD.decode(&mut dst, b"AB").is_ok());

        // three character tail: last two bits of the final sextet
        assert!(STANDARD_NO_PAD.strict().decode(&mut dst, b"AAB").is_err());
        assert!(STANDARD_NO_PAD.strict().decode(&mut dst, b"AAE").is_ok());

        // same through the padded form
        assert!(STANDARD.strict().decode(&mut dst, b"AB==").is_err());
        assert!(STANDARD.strict().decode(&mut dst, b"AQ==").is_ok());
    }

    #[test]
    fn pad_only_variants() {
        let mut dst = [0u8; 4];
        // stripping only ever removes the trailing two characters
        assert!(STANDARD.decode(&mut dst, b"A===").is_err());
        assert!(STANDARD.decode(&mut dst, b"====").is_err());
        assert!(STANDARD.decode(&mut dst, b"AA==").is_ok());
    }

    #[test]
    fn custom_padding_round_trip() {
        let enc = STANDARD.with_padding('~');
        let mut dst = [0u8; 8];
        let n = enc.encode(&mut dst, b"hi");
        assert_eq!(&dst[..n], b"aGk~");
        let mut out = [0u8; 4];
        let n = enc.decode(&mut out, &dst[..n]).unwrap();
        assert_eq!(&out[..n], b"hi");
    }

    #[test]
    #[should_panic(expected = "invalid padding")]
    fn carriage_return_padding_rejected() {
        let _ = STANDARD.with_padding('\r');
    }

    #[test]
    #[should_panic(expected = "invalid padding")]
    fn non_ascii_padding_rejected() {
        let _ = STANDARD.with_padding('ÿ');
    }

    #[test]
    #[should_panic(expected = "contained in alphabet")]
    fn alphabet_padding_rejected() {
        let _ = STANDARD.with_padding('A');
    }

    #[test]
    #[should_panic(expected = "contained in alphabet")]
    fn other_alphabet_padding_rejected() {
        // '-' only appears in the url alphabet, but is rejected for the
        // standard encoding too
        let _ = STANDARD.with_padding('-');
    }

    #[test]
    fn length_helpers() {
        for (n, padded, raw) in [
            (0, 0, 0),
            (1, 4, 2),
            (2, 4, 3),
            (3, 4, 4),
            (4, 8, 6),
            (5, 8, 7),
            (6, 8, 8),
        ] {
            assert_eq!(STANDARD.encoded_len(n), padded);
            assert_eq!(STANDARD_NO_PAD.encoded_len(n), raw);
        }
        assert_eq!(STANDARD.decoded_len(8), 6);
        assert_eq!(STANDARD_NO_PAD.decoded_len(7), 5);
    }

    #[test]
    fn empty_round_trip() {
        let mut dst = [0u8; 1];
        assert_eq!(STANDARD.encode(&mut dst, b""), 0);
        assert_eq!(STANDARD.decode(&mut dst, b""), Ok(0));
    }
}
