//! The engine's public error type: the five structural failures a proof or
//! its encoding can exhibit. Semantic outcomes (value present/absent/differs)
//! are never errors — they come back as `bool` from the verify functions.

/// Errors returned by this crate's entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// RLP decoding encountered an inconsistent or non-canonical length.
    #[error("malformed RLP encoding: {0}")]
    MalformedRlp(#[from] crate::rlp::Error),
    /// A proof node has neither 2 nor 17 decoded items, or a child slot holds
    /// a reference that isn't a short inline encoding or an exact 32-byte hash.
    #[error("malformed proof: a node or node reference has an invalid shape")]
    MalformedProof,
    /// A 2-item node's path has a first nibble outside {0,1,2,3}.
    #[error("invalid node path prefix nibble")]
    InvalidNodePrefix,
    /// The first proof node does not hash to the supplied root.
    #[error("proof root does not match the supplied root")]
    InvalidRoot,
    /// A non-root proof node's reference check against its parent failed.
    #[error("proof reference check failed")]
    InvalidProof,
}
