//! Constant-Time Hexadecimal Encoding and Decoding
//!
//! The encoder always emits lowercase characters; the decoder accepts
//! both cases. Neither direction ever branches on, or indexes a table
//! with, an input byte.
//!
//! Unlike most hex decoders, [`decode`] scans its entire input even
//! after encountering an invalid character, recording only the *first*
//! failure. Bailing out early would leak the position of the invalid
//! byte through timing.

use crate::ct;
use core::fmt;

#[cfg(any(feature = "std", feature = "embedded-io"))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "std", feature = "embedded-io"))))]
pub mod io;

/// Returns the length of an encoding of `n` source bytes, `n * 2`.
#[must_use]
pub const fn encoded_len(n: usize) -> usize {
    n * 2
}

/// Returns the length of the decoding of `n` encoded bytes, `n / 2`.
#[must_use]
pub const fn decoded_len(n: usize) -> usize {
    n / 2
}

/// The reason a decode failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input contained a byte outside `0-9A-Fa-f`.
    InvalidByte(u8),
    /// The input had odd length.
    OddLength,
}

/// Error returned by [`decode`].
///
/// An invalid byte takes precedence over an odd length, matching the
/// standard library codecs callers are likely porting from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    written: usize,
    kind: ErrorKind,
}

impl DecodeError {
    pub(crate) const fn new(written: usize, kind: ErrorKind) -> Self {
        Self { written, kind }
    }

    /// The number of destination bytes written when the error was
    /// detected. The destination past this index may still have been
    /// overwritten; treat the whole buffer as compromised.
    pub const fn written(&self) -> usize {
        self.written
    }

    /// What went wrong.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::InvalidByte(b) => write!(f, "hex: invalid byte {b:#04x}"),
            ErrorKind::OddLength => f.write_str("hex: odd length input"),
        }
    }
}

std! { impl std::error::Error for DecodeError {} }

// nibble in [0, 15] -> '0'..'9' for values below ten, 'a'..'f' above.
// (n - 10) >> 8 is all ones in the low byte exactly for the digit range,
// and !38 turns the +87 alphabetic offset into +48.
#[inline(always)]
const fn enc_nibble(n: u32) -> u8 {
    (87 + n).wrapping_add(n.wrapping_sub(10) >> 8 & !38u32) as u8
}

/// Encodes `src` into `dst` as lowercase hexadecimal, returning the
/// number of bytes written. That number is always
/// [`encoded_len(src.len())`](encoded_len).
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
/// use subtle_codecs::hex;
///
/// let mut dst = [0u8; 8];
/// let n = hex::encode(&mut dst, &[0x00, 0x01, 0xfe, 0xff]);
/// assert_eq!(&dst[..n], b"0001feff");
/// ```
pub fn encode(dst: &mut [u8], src: &[u8]) -> usize {
    let n = encoded_len(src.len());
    assert!(dst.len() >= n, "hex: destination too short");

    for (chunk, &v) in dst[..n].chunks_exact_mut(2).zip(src.iter()) {
        chunk[0] = enc_nibble(u32::from(v >> 4));
        chunk[1] = enc_nibble(u32::from(v & 0x0f));
    }
    n
}

/// Decodes `src` into `dst`, returning the number of bytes written.
///
/// `src` must contain only hexadecimal characters and have even length.
/// If it is malformed, the returned [`DecodeError`] carries the number
/// of bytes decoded before the error; the rest of `dst` may still have
/// been written and must be treated as compromised.
///
/// Decode runs in constant time for the length of `src`: the full input
/// is scanned regardless of where (or whether) an invalid byte occurs.
///
/// # Panics
///
/// If `dst` is shorter than `decoded_len(src.len())`.
///
/// # Example
///
/// ```
/// use subtle_codecs::hex;
///
/// let mut dst = [0u8; 4];
/// let n = hex::decode(&mut dst, b"0001feFF").unwrap();
/// assert_eq!(&dst[..n], &[0x00, 0x01, 0xfe, 0xff]);
/// ```
pub fn decode(dst: &mut [u8], src: &[u8]) -> Result<usize, DecodeError> {
    assert!(
        dst.len() >= decoded_len(src.len()),
        "hex: destination too short"
    );

    // set to 1 once malformed data has been found
    let mut failed = 0usize;
    // dst index and source byte of the first failure; meaningful only
    // when failed != 0
    let mut bad_idx = 0usize;
    let mut bad_char = 0usize;
    // accumulator between the halves of a character pair
    let mut acc = 0u8;
    // index into dst
    let mut i = 0usize;

    for (j, &b) in src.iter().enumerate() {
        let c = u32::from(b);

        // Is c in '0' ..= '9'? c ^ '0' maps exactly the digits into
        // [0, 10), so the borrow of (num - 10) floods the low byte of
        // num0 with ones iff c is a digit.
        let num = c ^ u32::from(b'0');
        let num0 = num.wrapping_sub(10) >> 8;

        // Is c in 'A' ..= 'F' or 'a' ..= 'f'? Masking off bit 5 folds
        // lowercase onto uppercase, and subtracting 55 maps 'A' -> 10.
        // For alpha in [10, 16) the two subtractions disagree in every
        // bit above the nibble, so their xor floods alpha0's low byte.
        let alpha = (c & !0x20).wrapping_sub(55);
        let alpha0 = (alpha.wrapping_sub(10) ^ alpha.wrapping_sub(16)) >> 8;

        // neither mask matched: invalid character
        let bad = ct::byte_eq((num0 | alpha0) as u8, 0);

        // if failed == 0 && bad == 1 { bad_idx = i; bad_char = c }
        bad_idx = ct::select(failed, bad_idx, ct::select(bad, i, bad_idx));
        bad_char = ct::select(failed, bad_char, ct::select(bad, c as usize, bad_char));
        failed |= bad;

        // only the matching mask leaves its value standing
        let val = ((num0 & num) | (alpha0 & alpha)) as u8;
        if j & 1 == 0 {
            acc = val << 4;
        } else {
            dst[i] = acc | val;
            i += 1;
        }
    }

    if failed != 0 {
        return Err(DecodeError::new(
            bad_idx,
            ErrorKind::InvalidByte(bad_char as u8),
        ));
    }
    if src.len() % 2 == 1 {
        return Err(DecodeError::new(i, ErrorKind::OddLength));
    }
    Ok(i)
}

/// Reports, in constant time, whether `c` is a valid hexadecimal
/// character.
pub fn valid_hex_char(c: u8) -> bool {
    let c = u32::from(c);
    let num = c ^ u32::from(b'0');
    let num0 = num.wrapping_sub(10) >> 8;
    let alpha = (c & !0x20).wrapping_sub(55);
    let alpha0 = (alpha.wrapping_sub(10) ^ alpha.wrapping_sub(16)) >> 8;
    ct::byte_eq((num0 | alpha0) as u8, 0) == 0
}

alloc! {
    /// Returns the hexadecimal encoding of `src`.
    ///
    /// Runs in constant time for the length of `src`.
    ///
    /// # Example
    ///
    /// ```
    /// use subtle_codecs::hex;
    ///
    /// assert_eq!(hex::encode_to_string(b"hello world"), "68656c6c6f20776f726c64");
    /// ```
    pub fn encode_to_string(src: &[u8]) -> alloc::string::String {
        let mut dst = alloc::vec![0u8; encoded_len(src.len())];
        encode(dst.as_mut_slice(), src);
        // SAFETY: encode writes nothing but ASCII hex digits. Validating
        // with from_utf8 would scan the (possibly sensitive) output with
        // data-dependent branches.
        unsafe { alloc::string::String::from_utf8_unchecked(dst) }
    }

    /// Returns the bytes represented by the hexadecimal `src`.
    ///
    /// Runs in constant time for the length of `src`. On error the
    /// partially decoded output is discarded; the count of bytes decoded
    /// before the error is available via [`DecodeError::written`].
    pub fn decode_string(src: impl AsRef<[u8]>) -> Result<alloc::vec::Vec<u8>, DecodeError> {
        let src = src.as_ref();
        let mut dst = alloc::vec![0u8; decoded_len(src.len())];
        let n = decode(dst.as_mut_slice(), src)?;
        dst.truncate(n);
        Ok(dst)
    }
}



#[cfg(kani)]
mod verify {
    use super::*;
    use kani::proof;

    #[proof]
    fn check_enc_nibble_is_hex() {
        let n: u32 = kani::any();
        kani::assume(n < 16);
        let c = enc_nibble(n);
        ensure!((n < 10) <==> (c == b'0' + n as u8));
        ensure!((n >= 10) <==> (c == b'a' + (n as u8 - 10)));
    }

    #[proof]
    fn check_valid_hex_char() {
        let c: u8 = kani::any();
        ensure!((valid_hex_char(c)) <==> (c.is_ascii_hexdigit()));
    }
}
