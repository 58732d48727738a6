//! A single signed statement in which a voucher key vouches for a vouchee key.
use crate::common::{PublicKey, SecretKey};
use crate::errors::Error;
use crate::traits::{CascadeKey, CascadeSigner};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// `voucher` vouches that `vouchee` is a legitimate successor key.
///
/// The signature covers `voucher || vouchee` and is made by the voucher. A `Trust` is
/// immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde_enabled",
    serde(bound(
        serialize = "K: Serialize, K::Sig: Serialize",
        deserialize = "K: Deserialize<'de>, K::Sig: Deserialize<'de>"
    ))
)]
pub struct Trust<K: CascadeKey = PublicKey> {
    voucher: K,
    vouchee: K,
    signature: K::Sig,
}

impl<K: CascadeKey> Trust<K> {
    /// Create a trust in which `authority` vouches for `target`.
    ///
    /// # Example
    /// ```
    /// use key_cascade::common::SecretKey;
    /// use key_cascade::trust::Trust;
    /// use key_cascade::traits::CascadeSigner;
    ///
    /// let authority = SecretKey::from_bytes(&[1u8; 32]).unwrap();
    /// let successor = SecretKey::from_bytes(&[2u8; 32]).unwrap();
    /// let trust = Trust::create(&authority, successor.public_key());
    ///
    /// assert_eq!(trust.voucher(), &authority.public_key());
    /// assert!(trust.verify().is_ok());
    /// ```
    pub fn create<S>(authority: &S, target: K) -> Self
    where
        S: CascadeSigner<Key = K>,
    {
        let voucher = authority.public_key();
        let signature = authority.sign(&Self::message_for(&voucher, &target));
        Trust {
            voucher,
            vouchee: target,
            signature,
        }
    }

    /// Reassemble a trust from its parts, e.g. after loading it from storage. Nothing is
    /// verified here.
    pub fn from_parts(voucher: K, vouchee: K, signature: K::Sig) -> Self {
        Trust {
            voucher,
            vouchee,
            signature,
        }
    }

    /// The vouching key
    pub fn voucher(&self) -> &K {
        &self.voucher
    }

    /// The key being vouched for
    pub fn vouchee(&self) -> &K {
        &self.vouchee
    }

    /// The voucher's signature
    pub fn signature(&self) -> &K::Sig {
        &self.signature
    }

    /// The byte-exact message the signature covers
    pub fn message(&self) -> Vec<u8> {
        Self::message_for(&self.voucher, &self.vouchee)
    }

    /// Check the signature against the voucher key.
    pub fn verify(&self) -> Result<(), Error> {
        self.voucher.verify(&self.signature, &self.message())
    }

    /// Split the trust into `(voucher, vouchee, signature)`
    pub fn into_parts(self) -> (K, K, K::Sig) {
        (self.voucher, self.vouchee, self.signature)
    }

    fn message_for(voucher: &K, vouchee: &K) -> Vec<u8> {
        let mut m = Vec::with_capacity(voucher.as_bytes().len() + vouchee.as_bytes().len());
        m.extend_from_slice(voucher.as_bytes());
        m.extend_from_slice(vouchee.as_bytes());
        m
    }
}

/// Create a trust in which `authority` vouches for `target`, using the default Ed25519 scheme.
pub fn create(authority: &SecretKey, target: PublicKey) -> Trust {
    Trust::create(authority, target)
}
