//! Branchless alphabet lookups.
//!
//! Forward lookups map a 6-bit value to its alphabet character by
//! chaining range-masked shifts instead of indexing a table; reverse
//! lookups invert any byte to its 6-bit value, or 0xff for bytes outside
//! the alphabet. The bulk paths process 3 or 6 source bytes at a time
//! with the same masks replicated across the byte lanes of an ordinary
//! integer register.
//!
//! The scalar shift chains follow
//! <http://0x80.pl/notesen/2016-01-12-sse-base64-encoding.html>, and the
//! lane layout of the packed paths follows
//! <http://0x80.pl/articles/avx512-foundation-base64.html>.
//!
//! The two RFC 4648 alphabets agree on the first 62 characters, so
//! everything below is parameterized over the handful of constants that
//! cover sextets 62 and 63.

/// Per-alphabet constants.
///
/// `sub62`/`add63` adjust the scalar shift chain at the last two range
/// boundaries. `m62`/`m63` are the corresponding lane masks in the
/// packed transforms. `row62`/`row63` are the reverse-lookup ranges
/// `(below, above, add)`, activating for `below < c < above`.
pub(crate) struct Alphabet {
    sub62: u32,
    add63: u32,
    m62: u8,
    m63: u8,
    row62: (u32, u32, u32),
    row63: (u32, u32, u32),
}

/// `A-Za-z0-9+/`
pub(crate) const STD: Alphabet = Alphabet {
    sub62: 15,
    add63: 3,
    m62: 0x11,
    m63: 0x1d,
    row62: (42, 44, 19), // '+'
    row63: (46, 48, 16), // '/'
};

/// `A-Za-z0-9-_`
pub(crate) const URL: Alphabet = Alphabet {
    sub62: 13,
    add63: 49,
    m62: 0x13,
    m63: 0xcf,
    row62: (44, 46, 17), // '-'
    row63: (94, 96, 32), // '_'
};

/// Converts the 6-bit value `c` to its alphabet character.
///
/// `c` must be in `[0, 63]`.
pub(crate) const fn lookup(a: &Alphabet, c: u32) -> u8 {
    // Start with the guess that c is in [0, 25], making the shift 'A',
    // then adjust at each range boundary. (k - c - 1) >> 8 floods the
    // low byte with ones exactly when c >= k.
    let mut s = b'A' as u32;
    s = s.wrapping_add(26u32.wrapping_sub(c).wrapping_sub(1) >> 8 & 6);
    s = s.wrapping_sub(52u32.wrapping_sub(c).wrapping_sub(1) >> 8 & 75);
    s = s.wrapping_sub(62u32.wrapping_sub(c).wrapping_sub(1) >> 8 & a.sub62);
    s = s.wrapping_add(63u32.wrapping_sub(c).wrapping_sub(1) >> 8 & a.add63);
    c.wrapping_add(s) as u8
}

/// Converts the alphabet character `c` to its 6-bit value.
///
/// If `c` is not in the alphabet the result is 0xff.
pub(crate) const fn rev_lookup(a: &Alphabet, c: u32) -> u8 {
    // Five disjoint ranges. ((lo - c) & (c - hi)) >> 8 floods the low
    // byte exactly when lo < c < hi, selecting that range's additive
    // constant; the constants are combined by xor, which is fine since
    // at most one mask is active.
    let s = (64u32.wrapping_sub(c) & c.wrapping_sub(91)) >> 8 & 191
        ^ (96u32.wrapping_sub(c) & c.wrapping_sub(123)) >> 8 & 185
        ^ (47u32.wrapping_sub(c) & c.wrapping_sub(58)) >> 8 & 4
        ^ (a.row62.0.wrapping_sub(c) & c.wrapping_sub(a.row62.1)) >> 8 & a.row62.2
        ^ (a.row63.0.wrapping_sub(c) & c.wrapping_sub(a.row63.1)) >> 8 & a.row63.2;
    // s == 0 marks a byte outside every range. Every in-range constant
    // is non-zero, so (0 - s) >> 8 distinguishes the two cases and the
    // trailing or floods invalid results to 0xff.
    (s.wrapping_add(c) & 0x3f | ((0u32.wrapping_sub(s) >> 8 & 0xff) ^ 0xff)) as u8
}

const MSB64: u64 = 0x8080_8080_8080_8080;
const MSB32: u32 = 0x8080_8080;

const fn rep8(b: u8) -> u64 {
    b as u64 * 0x0101_0101_0101_0101
}

const fn rep4(b: u8) -> u32 {
    b as u32 * 0x0101_0101
}

// Mask with 0xff in every lane holding a value >= k, 0x00 elsewhere.
// Lane values stay below 0x80 (they are sextets), so adding k sets a
// lane's high bit exactly when the threshold is met, and no lane sum
// can carry into its neighbor.
#[inline(always)]
const fn ge_mask8(c: u64, k: u8) -> u64 {
    let t = c.wrapping_add(rep8(k)) & MSB64;
    t | (t - (t >> 7))
}

#[inline(always)]
const fn ge_mask4(c: u32, k: u8) -> u32 {
    let t = c.wrapping_add(rep4(k)) & MSB32;
    t | (t - (t >> 7))
}

// Per-lane shift for the packed forward transforms.
//
// Every lane shift is biased by 0x80 (the base is 'A' + 0x80 and the
// range masks are chosen against the biased values), which keeps each
// lane's character + shift inside [0x80, 0xff]: large enough that no
// lane ever borrows from its neighbor, small enough that none carries
// into it. The store xors the bias back out.
//
// Lane thresholds mirror the scalar chain: >= 26 ('a'), >= 52 ('0'),
// >= 62 and >= 63 for the alphabet-specific tail characters.
#[inline(always)]
const fn lane_shift8(a: &Alphabet, c: u64) -> u64 {
    rep8(0xc1)
        ^ (ge_mask8(c, 0x66) & rep8(0x06))
        ^ (ge_mask8(c, 0x4c) & rep8(0xbb))
        ^ (ge_mask8(c, 0x42) & rep8(a.m62))
        ^ (ge_mask8(c, 0x41) & rep8(a.m63))
}

#[inline(always)]
const fn lane_shift4(a: &Alphabet, c: u32) -> u32 {
    rep4(0xc1)
        ^ (ge_mask4(c, 0x66) & rep4(0x06))
        ^ (ge_mask4(c, 0x4c) & rep4(0xbb))
        ^ (ge_mask4(c, 0x42) & rep4(a.m62))
        ^ (ge_mask4(c, 0x41) & rep4(a.m63))
}

/// Converts the 6 source bytes in bits `[63:16]` of `u` into 8 alphabet
/// characters, first character in the lowest byte.
pub(crate) const fn lookup_swar6(a: &Alphabet, u: u64) -> u64 {
    // Split ABCDEF into two 24-bit blocks, mirrored around the register
    // center:
    //
    //   AAAAAAAA BBBBBBBB CCCCCCCC DDDDDDDD EEEEEEEE FFFFFFFF ........ ........
    // becomes
    //   DDDDDDDD EEEEEEEE FFFFFFFF ........ AAAAAAAA BBBBBBBB CCCCCCCC ........
    let v = (u << 24) & 0xffff_ff00_0000_0000 | (u >> 32) & 0x0000_0000_ffff_ff00;

    // Deposit one 6-bit group in the low bits of each byte lane:
    //
    //   ..FFFFFF ..EEEEFF ..DDEEEE ..DDDDDD ..CCCCCC ..BBBBCC ..AABBBB ..AAAAAA
    let mut c = (v >> 26) & 0x0000_003f_0000_003f;
    c |= (v >> 12) & 0x0000_3f00_0000_3f00;
    c |= (v << 2) & 0x003f_0000_003f_0000;
    c |= (v << 16) & 0x3f00_0000_3f00_0000;

    c.wrapping_add(lane_shift8(a, c)) ^ MSB64
}

/// Converts the 3 source bytes in bits `[31:8]` of `u` into 4 alphabet
/// characters, first character in the lowest byte.
pub(crate) const fn lookup_swar3(a: &Alphabet, u: u32) -> u32 {
    //   ..CCCCCC ..BBBBCC ..AABBBB ..AAAAAA
    let mut c = (u >> 26) & 0x0000_003f;
    c |= (u >> 12) & 0x0000_3f00;
    c |= (u << 2) & 0x003f_0000;
    c |= (u << 16) & 0x3f00_0000;

    c.wrapping_add(lane_shift4(a, c)) ^ MSB32
}



#[cfg(kani)]
mod verify {
    use super::*;
    use kani::proof;

    #[proof]
    fn check_rev_lookup_range() {
        let c: u32 = kani::any();
        kani::assume(c < 256);
        for a in [&STD, &URL] {
            let r = rev_lookup(a, c);
            kani::assert(
                r == 0xff || r < 64,
                "reverse lookup is a sextet or the invalid sentinel",
            );
        }
    }

    #[proof]
    fn check_lookup_round_trip() {
        let c: u32 = kani::any();
        kani::assume(c < 64);
        for a in [&STD, &URL] {
            let r = rev_lookup(a, u32::from(lookup(a, c)));
            kani::assert(r as u32 == c, "forward then reverse is the identity");
        }
    }
}
