//! Batch signature verification (spec.md §5: "CPU-heavy batch BLS verification MAY be offloaded
//! to a fixed-size worker pool").
//!
//! Every place in the workspace that would otherwise call [`bls::Signature::verify`] or
//! [`bls::Signature::fast_aggregate_verify`] inline instead pushes the (public key, message,
//! signature) triple onto a `Verifier` and lets the caller decide how to check them: one pairing
//! per triple as soon as it's pushed ([`SingleVerifier`]), one aggregate pairing over everything
//! pushed during a whole block's worth of operations ([`MultiVerifier`]), or not at all
//! ([`NullVerifier`], for `skip_bls` paths — replay, era-archive import, test fixtures).

use bls::{PublicKey, Signature};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Bls(#[from] bls::Error),
    #[error("batch signature verification failed")]
    BatchVerificationFailed,
}

/// One signature check to be performed, deferred or otherwise.
pub struct VerifierItem {
    pub public_key: PublicKey,
    pub message: Vec<u8>,
    pub signature: Signature,
}

impl VerifierItem {
    #[must_use]
    pub fn new(public_key: PublicKey, message: impl AsRef<[u8]>, signature: Signature) -> Self {
        Self {
            public_key,
            message: message.as_ref().to_vec(),
            signature,
        }
    }
}

/// Accepts signature checks one at a time (or in same-message groups), and decides when to
/// actually run the pairing(s). Callers that `push` a block's worth of operation signatures must
/// call [`Verifier::finish`] before trusting that the block is fully verified: some
/// implementations (`MultiVerifier`) do no work until then.
pub trait Verifier {
    /// A single signer over a single message, e.g. a block's own proposer signature.
    fn verify_singular(
        &mut self,
        message: impl AsRef<[u8]>,
        signature: Signature,
        public_key: PublicKey,
    ) -> Result<(), Error>;

    /// Several signers over the same message, e.g. an attestation's aggregate signature.
    fn verify_aggregate(
        &mut self,
        message: impl AsRef<[u8]>,
        signature: Signature,
        public_keys: impl IntoIterator<Item = PublicKey>,
    ) -> Result<(), Error> {
        let Some(public_key) = bls::aggregate_public_keys(
            &public_keys.into_iter().collect::<Vec<_>>(),
        )
        .ok() else {
            return Err(Error::BatchVerificationFailed);
        };

        self.verify_singular(message, signature, public_key)
    }

    /// Runs whatever pairing checks were deferred. Implementations that verify eagerly (
    /// `SingleVerifier`, `NullVerifier`) have nothing left to do here.
    fn finish(self) -> Result<(), Error>
    where
        Self: Sized;
}

/// Verifies every signature the moment it's pushed. Simplest to reason about; pays one pairing
/// per item rather than one pairing for the whole batch.
#[derive(Default)]
pub struct SingleVerifier;

impl Verifier for SingleVerifier {
    fn verify_singular(
        &mut self,
        message: impl AsRef<[u8]>,
        signature: Signature,
        public_key: PublicKey,
    ) -> Result<(), Error> {
        signature.verify(public_key, message.as_ref()).map_err(Error::from)
    }

    fn finish(self) -> Result<(), Error> {
        Ok(())
    }
}

/// Collects every (message, signature, public key) triple pushed to it and verifies them all in
/// one `aggregate_verify` pairing check in [`Verifier::finish`]. The batch worker pool spec.md §5
/// describes runs one `MultiVerifier` per block (or per gossip validation) and drains it at the
/// end of processing, rather than paying a pairing per operation.
#[derive(Default)]
pub struct MultiVerifier {
    items: Vec<VerifierItem>,
}

impl Verifier for MultiVerifier {
    fn verify_singular(
        &mut self,
        message: impl AsRef<[u8]>,
        signature: Signature,
        public_key: PublicKey,
    ) -> Result<(), Error> {
        self.items.push(VerifierItem::new(public_key, message, signature));
        Ok(())
    }

    fn finish(self) -> Result<(), Error> {
        if self.items.is_empty() {
            return Ok(());
        }

        let aggregate = bls::aggregate_signatures(
            &self.items.iter().map(|item| item.signature).collect::<Vec<_>>(),
        )?;

        aggregate
            .aggregate_verify(
                self.items
                    .iter()
                    .map(|item| (item.public_key, item.message.as_slice())),
            )
            .map_err(Error::from)
    }
}

/// Accepts every signature unconditionally. Used wherever `skip_bls` applies (spec.md §4.2):
/// trusted replay, era-archive import, test fixtures that construct states directly.
#[derive(Default)]
pub struct NullVerifier;

impl Verifier for NullVerifier {
    fn verify_singular(
        &mut self,
        _message: impl AsRef<[u8]>,
        _signature: Signature,
        _public_key: PublicKey,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn finish(self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bls::SecretKey;

    use super::*;

    #[test]
    fn single_verifier_accepts_valid_signature() {
        let secret_key = SecretKey::from_seed(b"verifier-seed-aaaaaaaaaaaaaaaaaa");
        let message = b"block root";
        let signature = secret_key.sign(message);

        let mut verifier = SingleVerifier;
        verifier
            .verify_singular(message, signature, secret_key.public_key())
            .unwrap();
        verifier.finish().unwrap();
    }

    #[test]
    fn single_verifier_rejects_invalid_signature() {
        let secret_key = SecretKey::from_seed(b"verifier-seed-bbbbbbbbbbbbbbbbbb");
        let other = SecretKey::from_seed(b"verifier-seed-cccccccccccccccccc");
        let signature = secret_key.sign(b"message");

        let mut verifier = SingleVerifier;
        let error = verifier
            .verify_singular(b"message", signature, other.public_key())
            .unwrap_err();

        assert!(matches!(error, Error::Bls(_)));
    }

    #[test]
    fn multi_verifier_defers_until_finish() {
        let secret_key_a = SecretKey::from_seed(b"verifier-seed-dddddddddddddddddd");
        let secret_key_b = SecretKey::from_seed(b"verifier-seed-eeeeeeeeeeeeeeeeee");

        let mut verifier = MultiVerifier::default();

        verifier
            .verify_singular(b"message a", secret_key_a.sign(b"message a"), secret_key_a.public_key())
            .unwrap();
        verifier
            .verify_singular(b"message b", secret_key_b.sign(b"message b"), secret_key_b.public_key())
            .unwrap();

        verifier.finish().unwrap();
    }

    #[test]
    fn multi_verifier_finish_fails_given_any_wrong_signature() {
        let secret_key_a = SecretKey::from_seed(b"verifier-seed-ffffffffffffffffff");
        let secret_key_b = SecretKey::from_seed(b"verifier-seed-gggggggggggggggggg");

        let mut verifier = MultiVerifier::default();

        verifier
            .verify_singular(b"message a", secret_key_a.sign(b"message a"), secret_key_a.public_key())
            .unwrap();
        verifier
            .verify_singular(b"message b", secret_key_a.sign(b"wrong message"), secret_key_b.public_key())
            .unwrap();

        assert!(verifier.finish().is_err());
    }

    #[test]
    fn null_verifier_accepts_anything() {
        let secret_key = SecretKey::from_seed(b"verifier-seed-hhhhhhhhhhhhhhhhhh");
        let mut verifier = NullVerifier;

        verifier
            .verify_singular(b"message", secret_key.sign(b"different message"), secret_key.public_key())
            .unwrap();
        verifier.finish().unwrap();
    }
}
