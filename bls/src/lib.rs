//! BLS12-381 signatures over the `blst` crate, using the proof-of-possession ciphersuite
//! (`BLS_SIG_BLS12381G2_XMD:SHA-256_SSZ_RO_POP_`) that the Ethereum consensus spec requires.
//!
//! `state_transition`'s `skip_bls` flag (spec.md §4.2) exists precisely so callers that already
//! trust a block (replay, era-archive import, test fixtures) can skip the expensive pairing
//! checks below; every signature check in `helper_functions`/`transition_functions` is gated on
//! that flag rather than being unconditionally called from deep inside the STF.

use std::sync::Arc;

use blst::min_pk as blst_core;
use blst::BLST_ERROR;
use ssz::{ReadError, Size, SszHash, SszRead, SszSize, SszWrite};
use thiserror::Error;

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSZ_RO_POP_";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid BLS secret key bytes")]
    InvalidSecretKey,
    #[error("invalid BLS public key bytes")]
    InvalidPublicKey,
    #[error("invalid BLS signature bytes")]
    InvalidSignature,
    #[error("BLS signature verification failed")]
    VerificationFailed,
    #[error("aggregation of zero signatures is not allowed")]
    EmptyAggregation,
}

#[derive(Clone)]
pub struct SecretKey(Arc<blst_core::SecretKey>);

impl SecretKey {
    /// Deterministically derives a key from a seed. Real deployments load this from a keystore
    /// (out of scope per spec.md §1); this is the path test fixtures and `eth2_testnet_genesis`
    /// style tooling use instead.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        let ikm = [seed, &[0; 32]].concat();
        let key = blst_core::SecretKey::key_gen(&ikm, &[])
            .expect("key_gen only fails when ikm is shorter than 32 bytes");

        Self(Arc::new(key))
    }

    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.sk_to_pk())
    }

    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message, DST, &[]))
    }
}

#[derive(Clone, Copy)]
pub struct PublicKey(blst_core::PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        blst_core::PublicKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidPublicKey)
    }

    #[must_use]
    pub fn to_bytes(self) -> PublicKeyBytes {
        PublicKeyBytes(self.0.compress())
    }
}

#[derive(Clone, Copy)]
pub struct Signature(blst_core::Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        blst_core::Signature::from_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }

    #[must_use]
    pub fn to_bytes(self) -> SignatureBytes {
        SignatureBytes(self.0.compress())
    }

    pub fn verify(self, public_key: PublicKey, message: &[u8]) -> Result<(), Error> {
        match self
            .0
            .verify(true, message, DST, &[], &public_key.0, true)
        {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            _ => Err(Error::VerificationFailed),
        }
    }

    /// All signers sign the same message (the common case for sync committee / attestation
    /// aggregates): one pairing check instead of one per signer.
    pub fn fast_aggregate_verify(
        self,
        public_keys: impl IntoIterator<Item = PublicKey>,
        message: &[u8],
    ) -> Result<(), Error> {
        let keys = public_keys.into_iter().map(|key| key.0).collect::<Vec<_>>();
        let refs = keys.iter().collect::<Vec<_>>();

        match self.0.fast_aggregate_verify(true, message, DST, &refs) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            _ => Err(Error::VerificationFailed),
        }
    }

    /// Each signer signed a distinct message (proposer/attester slashing double-vote proofs,
    /// indexed attestations with differing data are not our case, but batch block-signature
    /// verification uses this with one public key/message pair per block).
    pub fn aggregate_verify(
        self,
        pairs: impl IntoIterator<Item = (PublicKey, impl AsRef<[u8]>)>,
    ) -> Result<(), Error> {
        let (keys, messages): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .map(|(key, message)| (key.0, message.as_ref().to_vec()))
            .unzip();

        let key_refs = keys.iter().collect::<Vec<_>>();
        let message_refs = messages.iter().map(Vec::as_slice).collect::<Vec<_>>();

        match self.0.aggregate_verify(true, &message_refs, DST, &key_refs, true) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            _ => Err(Error::VerificationFailed),
        }
    }
}

pub fn aggregate_signatures(signatures: &[Signature]) -> Result<Signature, Error> {
    let first = signatures.first().ok_or(Error::EmptyAggregation)?;
    let mut aggregate = blst_core::AggregateSignature::from_signature(&first.0);

    for signature in &signatures[1..] {
        aggregate
            .add_signature(&signature.0, true)
            .map_err(|_| Error::InvalidSignature)?;
    }

    Ok(Signature(aggregate.to_signature()))
}

pub fn aggregate_public_keys(public_keys: &[PublicKey]) -> Result<PublicKey, Error> {
    let first = public_keys.first().ok_or(Error::EmptyAggregation)?;
    let mut aggregate = blst_core::AggregatePublicKey::from_public_key(&first.0);

    for key in &public_keys[1..] {
        aggregate
            .add_public_key(&key.0, true)
            .map_err(|_| Error::InvalidPublicKey)?;
    }

    Ok(PublicKey(aggregate.to_public_key()))
}

/// Compressed, on-the-wire, SSZ-encoded form. Kept distinct from [`PublicKey`] because most
/// containers (`Validator`, `IndexedAttestation`) only ever need to store/transmit bytes; the
/// projective `PublicKey` is reconstructed lazily wherever a pairing check is actually performed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; 48]);

impl PublicKeyBytes {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    pub fn try_into_public_key(self) -> Result<PublicKey, Error> {
        PublicKey::from_bytes(&self.0)
    }
}

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self([0; 48])
    }
}

impl core::fmt::Debug for PublicKeyBytes {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(formatter, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 48]> for PublicKeyBytes {
    fn from(bytes: [u8; 48]) -> Self {
        Self(bytes)
    }
}

impl SszSize for PublicKeyBytes {
    const SIZE: Size = Size::Fixed(48);
}

impl SszWrite for PublicKeyBytes {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.0);
    }
}

impl SszRead<()> for PublicKeyBytes {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        let array: [u8; 48] = bytes.try_into().map_err(|_| ReadError::WrongFixedLength {
            expected: 48,
            actual: bytes.len(),
        })?;

        Ok(Self(array))
    }
}

impl SszHash for PublicKeyBytes {
    fn hash_tree_root(&self) -> ethereum_types::H256 {
        self.0.hash_tree_root()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignatureBytes([u8; 96]);

impl SignatureBytes {
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 96] {
        &self.0
    }

    pub fn try_into_signature(self) -> Result<Signature, Error> {
        Signature::from_bytes(&self.0)
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self([0; 96])
    }
}

impl core::fmt::Debug for SignatureBytes {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(formatter, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 96]> for SignatureBytes {
    fn from(bytes: [u8; 96]) -> Self {
        Self(bytes)
    }
}

impl SszSize for SignatureBytes {
    const SIZE: Size = Size::Fixed(96);
}

impl SszWrite for SignatureBytes {
    fn write_variable(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.0);
    }
}

impl SszRead<()> for SignatureBytes {
    fn from_ssz_unchecked(_context: &(), bytes: &[u8]) -> Result<Self, ReadError> {
        let array: [u8; 96] = bytes.try_into().map_err(|_| ReadError::WrongFixedLength {
            expected: 96,
            actual: bytes.len(),
        })?;

        Ok(Self(array))
    }
}

impl SszHash for SignatureBytes {
    fn hash_tree_root(&self) -> ethereum_types::H256 {
        self.0.hash_tree_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let secret_key = SecretKey::from_seed(b"test-seed-aaaaaaaaaaaaaaaaaaaaaa");
        let public_key = secret_key.public_key();
        let message = b"attestation data root";

        let signature = secret_key.sign(message);

        assert!(signature.verify(public_key, message).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let secret_key = SecretKey::from_seed(b"test-seed-bbbbbbbbbbbbbbbbbbbbbb");
        let public_key = secret_key.public_key();
        let signature = secret_key.sign(b"correct message");

        assert!(signature.verify(public_key, b"wrong message").is_err());
    }

    #[test]
    fn fast_aggregate_verify_multiple_signers() {
        let secret_keys = [
            SecretKey::from_seed(b"seed-one-aaaaaaaaaaaaaaaaaaaaaaa"),
            SecretKey::from_seed(b"seed-two-aaaaaaaaaaaaaaaaaaaaaaa"),
            SecretKey::from_seed(b"seed-three-aaaaaaaaaaaaaaaaaaaaa"),
        ];

        let message = b"sync committee root";
        let signatures = secret_keys
            .iter()
            .map(|key| key.sign(message))
            .collect::<Vec<_>>();

        let aggregate = aggregate_signatures(&signatures).unwrap();
        let public_keys = secret_keys.iter().map(SecretKey::public_key);

        assert!(aggregate.fast_aggregate_verify(public_keys, message).is_ok());
    }
}
