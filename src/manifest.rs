//! A minimal signed manifest: a content-addressed set of files under one key, optionally
//! carrying a cascade to vouch for key changes.
use crate::cascade::Ring;
use crate::common::{PublicKey, SecretKey, Signature};
use crate::errors::Error;
use crate::migrate::Migration;
use crate::traits::{CascadeHolder, CascadeKey, CascadeSigner, Keyholder};
use blake2::digest::{Update, VariableOutput};
use blake2::VarBlake2b;
use std::collections::BTreeMap;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Digest size of a file entry (Blake2b-256)
pub const FILE_DIGEST_SIZE: usize = 32;

/// Blake2b-256 digest of a file's content
pub type FileDigest = [u8; FILE_DIGEST_SIZE];

/// Hash file content for a manifest entry
pub fn digest(content: &[u8]) -> FileDigest {
    let mut out = [0u8; FILE_DIGEST_SIZE];
    let mut h = VarBlake2b::new(FILE_DIGEST_SIZE).expect("valid size");
    h.update(content);
    h.finalize_variable(|res| out.copy_from_slice(res));
    out
}

/// A release of a file set, signed by a single key.
///
/// The payload signature covers the id, release number, file digests and key. The
/// cascade is not part of the payload; each of its trusts carries its own signature.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct Manifest {
    /// Identifier shared by every release of the same file set
    pub id: String,
    /// Release number
    pub rel: u64,
    /// File names and their content digests
    pub files: BTreeMap<String, FileDigest>,
    /// Trusts vouching for the keys this manifest has been signed with
    pub cascade: Option<Ring>,
    key: Option<PublicKey>,
    sig: Option<Signature>,
}

impl Manifest {
    /// An empty, unsigned manifest without a cascade
    pub fn new(id: impl Into<String>, rel: u64) -> Self {
        Manifest {
            id: id.into(),
            rel,
            files: BTreeMap::new(),
            cascade: None,
            key: None,
            sig: None,
        }
    }

    /// Record `content` under `name`, returning its digest. Invalidates any signature.
    pub fn add_file(&mut self, name: impl Into<String>, content: &[u8]) -> FileDigest {
        let d = digest(content);
        self.files.insert(name.into(), d);
        d
    }

    /// Check `content` against the recorded digest for `name`
    pub fn matches(&self, name: &str, content: &[u8]) -> bool {
        self.files.get(name) == Some(&digest(content))
    }

    /// The signing key, if signed
    pub fn key(&self) -> Option<&PublicKey> {
        self.key.as_ref()
    }

    /// The payload signature, if signed
    pub fn signature(&self) -> Option<&Signature> {
        self.sig.as_ref()
    }

    /// The byte-exact payload covered by the signature. In particular, the encoding is
    /// ( len(id) || id || rel || #files || { len(name) || name || digest }* || key )
    /// with lengths and counts as big-endian `u32`, `rel` as big-endian `u64`, files in
    /// name order, and the key omitted while unsigned.
    pub fn compile(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_bytes(&mut out, self.id.as_bytes());
        out.extend_from_slice(&self.rel.to_be_bytes());
        out.extend_from_slice(&(self.files.len() as u32).to_be_bytes());
        for (name, d) in self.files.iter() {
            push_bytes(&mut out, name.as_bytes());
            out.extend_from_slice(d);
        }
        if let Some(key) = &self.key {
            out.extend_from_slice(key.as_bytes());
        }
        out
    }

    /// Sign the manifest with `sk`, replacing its key and signature.
    pub fn sign(&mut self, sk: &SecretKey) {
        self.key = Some(sk.public_key());
        self.sig = Some(sk.sign(&self.compile()));
    }

    /// Verify the payload signature under the manifest's own key.
    pub fn verify(&self) -> Result<(), Error> {
        let key = self.key.as_ref().ok_or(Error::NotAKeyholder)?;
        let sig = self.sig.as_ref().ok_or(Error::Unsigned)?;
        key.verify(sig, &self.compile())
            .map_err(|_| Error::InvalidPayloadSignature)
    }

    /// Replace `self` with `update` if `update` is trusted through the cascades of both.
    /// On failure `self` is left untouched.
    pub fn adopt(&mut self, update: Manifest) -> Result<(), Error> {
        self.adopt_with(update, &mut Migration::new())
    }

    /// [`Manifest::adopt`] with a configured migration
    pub fn adopt_with(
        &mut self,
        update: Manifest,
        migration: &mut Migration<'_>,
    ) -> Result<(), Error> {
        migration.run(&update, self)?;
        tracing::info!(
            id = %update.id,
            from = self.rel,
            to = update.rel,
            "adopted manifest update"
        );
        *self = update;
        Ok(())
    }
}

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

impl CascadeHolder<PublicKey> for Manifest {
    fn cascade_slot(&self) -> Option<&Option<Ring>> {
        Some(&self.cascade)
    }

    fn cascade_slot_mut(&mut self) -> Option<&mut Option<Ring>> {
        Some(&mut self.cascade)
    }
}

impl Keyholder<PublicKey> for Manifest {
    fn key(&self) -> Option<&PublicKey> {
        self.key.as_ref()
    }

    fn verify_payload(&self) -> Result<(), Error> {
        self.verify()
    }
}
