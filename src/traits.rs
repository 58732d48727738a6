//! Traits that define the seams of a cascade: the signature scheme it is built from and
//! the entities that carry one.
use crate::cascade::Ring;
use crate::errors::Error;
use std::fmt::Debug;
use std::hash::Hash;

/// A public key that can take part in a cascade.
///
/// Any scheme with fixed-size public keys and deterministic verification fits. Equality,
/// ordering and hashing must agree with the raw bytes returned by [`CascadeKey::as_bytes`].
pub trait CascadeKey: Clone + Eq + Ord + Hash + Debug {
    /// Signature produced by the matching [`CascadeSigner`]
    type Sig: Clone + Eq + Debug;

    /// Raw public key bytes
    fn as_bytes(&self) -> &[u8];

    /// Verify `signature` over `m` under `self`
    fn verify(&self, signature: &Self::Sig, m: &[u8]) -> Result<(), Error>;

    /// Hex fingerprint used in errors and logs
    fn fingerprint(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

/// A private key able to vouch for other keys.
pub trait CascadeSigner {
    /// Public half of the key
    type Key: CascadeKey;

    /// Public key corresponding to this signer
    fn public_key(&self) -> Self::Key;

    /// Sign the given message bytes
    fn sign(&self, m: &[u8]) -> <Self::Key as CascadeKey>::Sig;
}

/// An entity that may own a cascade, such as a manifest.
///
/// The slot is doubly optional: `None` from [`CascadeHolder::cascade_slot`] means the
/// entity cannot hold a cascade at all, while `Some(None)` means it can but holds none yet.
pub trait CascadeHolder<K: CascadeKey> {
    /// The cascade slot, or `None` if this entity does not support cascades
    fn cascade_slot(&self) -> Option<&Option<Ring<K>>>;

    /// Mutable access to the cascade slot
    fn cascade_slot_mut(&mut self) -> Option<&mut Option<Ring<K>>>;

    /// The held ring.
    ///
    /// # Errors
    /// * `NotACascadeHolder` if the entity has no slot
    /// * `UninitializedCascade` if the slot is empty
    fn cascade(&self) -> Result<&Ring<K>, Error> {
        self.cascade_slot()
            .ok_or(Error::NotACascadeHolder)?
            .as_ref()
            .ok_or(Error::UninitializedCascade)
    }
}

/// An entity whose payload is signed by a single key.
pub trait Keyholder<K: CascadeKey> {
    /// The key the payload is signed with, if any
    fn key(&self) -> Option<&K>;

    /// Verify the payload signature under [`Keyholder::key`]
    fn verify_payload(&self) -> Result<(), Error>;
}
