//! Structures common to every cascade: the Ed25519 keys and signatures trusts are made of.
use crate::errors::Error;
use crate::traits::{CascadeKey, CascadeSigner};
use ed25519_dalek as ed25519;
use ed25519_dalek::Signer;
use rand_core::{OsRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// ED25519 secret key size
pub const SECRET_KEY_SIZE: usize = ed25519::SECRET_KEY_LENGTH;
/// ED25519 public key size
pub const PUBLIC_KEY_SIZE: usize = ed25519::PUBLIC_KEY_LENGTH;
/// ED25519 signature size
pub const SIGNATURE_SIZE: usize = ed25519::SIGNATURE_LENGTH;

/// Ed25519 public key, kept as its raw compressed bytes. Equality is byte equality.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct PublicKey(pub(crate) [u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Wrap an already decoded ed25519 verifying key.
    pub fn from_ed25519(public: &ed25519::VerifyingKey) -> Self {
        PublicKey(public.to_bytes())
    }

    pub(crate) fn to_ed25519(&self) -> Result<ed25519::VerifyingKey, Error> {
        ed25519::VerifyingKey::from_bytes(&self.0).or(Err(Error::Ed25519InvalidCompressedFormat))
    }

    /// Return `Self` as its byte representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Tries to convert a slice of `bytes` as `Self`.
    ///
    /// # Errors
    /// This function returns an error if the length of `bytes` is not equal to
    /// `PUBLIC_KEY_SIZE`. The bytes are not checked to be a valid curve point here;
    /// that happens at verification time.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() == PUBLIC_KEY_SIZE {
            let mut v = [0u8; PUBLIC_KEY_SIZE];
            v.copy_from_slice(bytes);
            Ok(PublicKey(v))
        } else {
            Err(Error::InvalidPublicKeySize(bytes.len()))
        }
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl CascadeKey for PublicKey {
    type Sig = Signature;

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn verify(&self, signature: &Signature, m: &[u8]) -> Result<(), Error> {
        let ed_pk = self.to_ed25519()?;
        ed_pk
            .verify_strict(m, &signature.to_ed25519())
            .map_err(Error::from)
    }
}

/// Ed25519 signature over a trust or a manifest payload.
#[cfg_attr(feature = "serde_enabled", serde_with::serde_as)]
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct Signature(
    #[cfg_attr(feature = "serde_enabled", serde(with = "serde_with::As::<serde_with::Bytes>"))]
    pub(crate)  [u8; SIGNATURE_SIZE],
);

impl Signature {
    /// Byte size of a signature
    pub const SIZE: usize = SIGNATURE_SIZE;

    /// Convert a byte slice into a signature
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidSignatureSize(bytes.len()));
        }

        let mut signature = [0u8; Self::SIZE];
        signature.copy_from_slice(bytes);
        Ok(Self(signature))
    }

    /// Return `Self` as a byte array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.0
    }

    fn to_ed25519(self) -> ed25519::Signature {
        ed25519::Signature::from_bytes(&self.0)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// Ed25519 secret key seed. Only ever held while a trust or manifest is being signed;
/// it is never stored inside a ring.
#[derive(Zeroize, ZeroizeOnDrop)]
#[cfg_attr(feature = "sk_clone_enabled", derive(Clone))]
pub struct SecretKey([u8; SECRET_KEY_SIZE]);

impl SecretKey {
    /// Size of the secret key seed
    pub const SIZE: usize = SECRET_KEY_SIZE;

    /// Generate a fresh key from the operating system's randomness.
    pub fn generate() -> Self {
        let mut seed = [0u8; Self::SIZE];
        OsRng.fill_bytes(&mut seed);
        let key = Self(seed);
        seed.zeroize();
        key
    }

    /// Convert a byte slice into a key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidSecretKeySize(bytes.len()));
        }

        let mut key = [0u8; Self::SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Return the seed as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn signing_key(&self) -> ed25519::SigningKey {
        ed25519::SigningKey::from_bytes(&self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("public_key", &CascadeSigner::public_key(self))
            .finish_non_exhaustive()
    }
}

impl CascadeSigner for SecretKey {
    type Key = PublicKey;

    fn public_key(&self) -> PublicKey {
        PublicKey::from_ed25519(&self.signing_key().verifying_key())
    }

    fn sign(&self, m: &[u8]) -> Signature {
        Signature(self.signing_key().sign(m).to_bytes())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let sk = SecretKey::from_bytes(&[7u8; 32]).unwrap();
        let pk = sk.public_key();
        let sigma = sk.sign(b"tilin");

        assert!(pk.verify(&sigma, b"tilin").is_ok());
        assert!(pk.verify(&sigma, b"tolon").is_err());
    }

    #[test]
    fn sizes_are_checked() {
        assert!(matches!(
            PublicKey::from_bytes(&[0u8; 31]),
            Err(Error::InvalidPublicKeySize(31))
        ));
        assert!(matches!(
            Signature::from_bytes(&[0u8; 65]),
            Err(Error::InvalidSignatureSize(65))
        ));
        assert!(matches!(
            SecretKey::from_bytes(&[0u8; 16]),
            Err(Error::InvalidSecretKeySize(16))
        ));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let sk = SecretKey::from_bytes(&[42u8; 32]).unwrap();
        let debug_str = format!("{:?}", sk);

        assert!(debug_str.contains("public_key"));
        assert!(!debug_str.contains("2a2a2a"));
    }

    #[test]
    fn generated_keys_differ() {
        let a = SecretKey::generate();
        let b = SecretKey::generate();
        assert_ne!(a.public_key(), b.public_key());
    }
}
