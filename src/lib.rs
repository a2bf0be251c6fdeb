#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(
    clippy::pedantic,
    clippy::nursery,
    clippy::all
)]
// the bit manipulation below truncates on purpose, everywhere
#![allow(clippy::cast_possible_truncation)]
// wrapping arithmetic on "negative" unsigned values is the whole point
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
// stupid lint IMO
#![allow(clippy::module_name_repetitions)]
// this devalues things which actually require the must-use attribute
#![allow(clippy::must_use_candidate)]
// I don't need a linter lecturing me on performance
#![allow(clippy::inline_always)]

//! Constant-time codecs.
//!
//! Everything in this crate executes in time that depends only on the
//! *lengths* of its inputs, never on their contents: no data-dependent
//! branches, no data-dependent table indexing. That covers the comparison
//! and selection primitives in [`ct`], the hexadecimal codec in [`hex`],
//! and the RFC 4648 Base64 codec in [`base64`].
//!
//! The price of admission is that the codecs never bail out early. A
//! decoder scans its whole input even after finding an invalid byte, and
//! only reports the failure at the end.

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

pub mod base64;
pub mod ct;
pub mod hex;

#[cfg(test)]
pub(crate) mod test_utils;
