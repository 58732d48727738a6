//! Errors raised while building, walking and migrating cascades
use ed25519_dalek as ed25519;
use thiserror::Error as ThisError;

/// Classification of a failed cascade walk. Key fingerprints are hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum WalkError {
    /// The walk reached a key with no further trust before reaching the target.
    #[error("cascade is broken: no trust leads on from {0}")]
    BrokenCascade(String),
    /// A trust's signature failed verification.
    #[error("cascade trust vouched by {0} failed signature verification")]
    InvalidCascade(String),
    /// The walk revisited a key, so the target cannot be reached by a finite path.
    #[error("cascade is circular at {0}")]
    CircularCascade(String),
    /// A trust is indexed under a key that is not its voucher; the ring is corrupt.
    #[error("insane cascade: trust indexed at {index} is vouched by {voucher}")]
    InsaneCascade {
        /// The ring index the trust was found under
        index: String,
        /// The voucher recorded in the trust itself
        voucher: String,
    },
    /// Branching on divergent trusts went deeper than the configured ceiling.
    #[error("cascade splits deeper than {0} levels")]
    CascadeTooDeep(usize),
    /// The walk visited more keys than the configured budget allows.
    #[error("cascade walk exhausted its budget of {0} visits")]
    VisitBudgetExhausted(usize),
}

/// Enum of errors associated with cascades and the manifests holding them
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// A cascade operation was attempted on something that cannot hold a cascade.
    #[error("not a cascade holder")]
    NotACascadeHolder,
    /// The holder supports cascades, but none has been created yet.
    #[error("holder has an uninitialized cascade")]
    UninitializedCascade,
    /// Insertion would replace an existing voucher entry without permission.
    #[error("key {0} has already vouched for another key")]
    KeyAlreadyInCascade(String),
    /// Migration between differing keys with no cascade usable on either side.
    #[error("keys differ and no cascade was allowed to bridge them")]
    KeyMismatch,
    /// Resilient dual walks must be run in return-code form.
    #[error("resilient dual walks require the return-code form")]
    ResilientRequiresReturnCode,
    /// The holder has no key to verify against.
    #[error("not a keyholder")]
    NotAKeyholder,
    /// The holder has a key but its payload carries no signature.
    #[error("payload is unsigned")]
    Unsigned,
    /// The payload signature does not verify under the holder's key.
    #[error("payload signature is invalid")]
    InvalidPayloadSignature,
    /// A walk between keys failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// This error occurs when a base signature (ed25519) is invalid.
    #[error("ed25519 signature error: {0}")]
    Ed25519Signature(String),
    /// Public key bytes do not decode to a curve point.
    #[error("invalid compressed ed25519 point")]
    Ed25519InvalidCompressedFormat,
    /// Error occurs when the size of the secret key is not the expected.
    #[error("invalid secret key size {0}")]
    InvalidSecretKeySize(usize),
    /// Error occurs when the size of the public key is not the expected.
    #[error("invalid public key size {0}")]
    InvalidPublicKeySize(usize),
    /// Error occurs when the size of the signature is not the expected.
    #[error("invalid signature size {0}")]
    InvalidSignatureSize(usize),
}

impl From<ed25519::SignatureError> for Error {
    fn from(sig: ed25519::SignatureError) -> Error {
        Error::Ed25519Signature(format!("{:?}", sig))
    }
}
