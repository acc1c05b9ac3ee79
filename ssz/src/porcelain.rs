//! The small set of traits every SSZ type implements.
//!
//! Kept deliberately narrower than upstream consensus-spec-tooling: no `typenum`-driven
//! type-level arithmetic (see `DESIGN.md`), just plain const generics and a handful of traits
//! mirroring the shape of the real encode/decode/hash-tree-root algorithms.

use ethereum_types::H256;
use thiserror::Error;

/// Whether a type's SSZ encoding has a fixed byte length or depends on its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Size {
    Fixed(usize),
    Variable,
}

impl Size {
    #[must_use]
    pub const fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("SSZ byte string too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("SSZ byte string has wrong fixed length: expected {expected}, got {actual}")]
    WrongFixedLength { expected: usize, actual: usize },
    #[error("SSZ offset out of order or out of range (offset {offset}, bytes length {length})")]
    InvalidOffset { offset: usize, length: usize },
    #[error("SSZ list exceeds maximum length {maximum}")]
    ListTooLong { maximum: usize },
    #[error("invalid bitlist: {0}")]
    InvalidBitlist(&'static str),
    #[error("invalid union selector {selector}")]
    InvalidSelector { selector: u8 },
    #[error("invalid enum/union discriminant {0}")]
    InvalidDiscriminant(u64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A type whose SSZ encoding has a statically known [`Size`].
pub trait SszSize {
    const SIZE: Size;
}

/// SSZ serialization.
///
/// `write_variable` appends this value's own encoding to `bytes`: the fixed-width bytes
/// themselves for a [`Size::Fixed`] type, or the full variable-length payload otherwise.
/// Callers that need the length up front (to build an offset table) use [`ssz_bytes_len`].
///
/// [`ssz_bytes_len`]: SszWrite::ssz_bytes_len
pub trait SszWrite: SszSize {
    fn write_variable(&self, bytes: &mut Vec<u8>);

    fn ssz_bytes_len(&self) -> usize {
        match Self::SIZE {
            Size::Fixed(length) => length,
            Size::Variable => {
                let mut bytes = Vec::new();
                self.write_variable(&mut bytes);
                bytes.len()
            }
        }
    }

    fn to_ssz(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.ssz_bytes_len());
        self.write_variable(&mut bytes);
        bytes
    }
}

/// SSZ deserialization. `C` is a decode-time context (e.g. [`types::config::Config`]) needed
/// by fork-dependent container types; most leaf types ignore it via `C = ()`.
pub trait SszRead<C = ()>: Sized + SszSize {
    fn from_ssz_unchecked(context: &C, bytes: &[u8]) -> Result<Self, ReadError>;
}

/// Convenience for types that decode without any external context.
pub trait SszReadDefault: SszRead<()> {
    fn from_ssz_default(bytes: &[u8]) -> Result<Self, ReadError>;
}

impl<T: SszRead<()>> SszReadDefault for T {
    fn from_ssz_default(bytes: &[u8]) -> Result<Self, ReadError> {
        Self::from_ssz_unchecked(&(), bytes)
    }
}

/// Hash-tree-root per the Merkleization rules: chunk, pad to a power of two, combine with
/// SHA-256, mix in a length suffix for lists/bitlists.
pub trait SszHash {
    fn hash_tree_root(&self) -> H256;
}

/// Blanket supertrait bundling the four facets most call sites actually want.
pub trait Ssz: SszSize + SszWrite + SszHash {}

impl<T: SszSize + SszWrite + SszHash> Ssz for T {}
