//! Internal RLP decode error detail.
//!
//! These variants are collapsed into [`crate::Error::MalformedRlp`] at the crate
//! boundary; they exist here so the codec's own tests can assert on the
//! specific canonicalization rule that rejected an input.

/// RLP result type, specialized with this module's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Reasons a byte string fails to decode as canonical RLP.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The buffer ended before the declared payload length was satisfied.
    #[error("input too short for declared length")]
    InputTooShort,
    /// A long-form length header began with a zero byte.
    #[error("leading zero in length header")]
    LeadingZero,
    /// A long-form header encoded a length that should have used the short form,
    /// or a long-form length-of-length byte was zero.
    #[error("non-canonical length encoding")]
    NonCanonicalSize,
    /// A single-byte string whose byte is `< 0x80` was wrapped in a string header.
    #[error("non-canonical single byte encoding")]
    NonCanonicalSingleByte,
    /// A declared length does not fit in `usize` on this platform.
    #[error("length header overflows usize")]
    Overflow,
    /// Expected a string item but found a list.
    #[error("expected a string item, found a list")]
    UnexpectedList,
    /// Expected a list item but found a string.
    #[error("expected a list item, found a string")]
    UnexpectedString,
    /// The input was empty where at least one byte was required.
    #[error("input is empty")]
    InputEmpty,
    /// Bytes remained after the single item they were expected to hold exactly.
    #[error("trailing bytes after a single RLP item")]
    TrailingBytes,
}
